use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("non-existent domain")]
    NxDomain,
    #[error("lookup timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("lookup cancelled")]
    Cancelled,
    #[error("invalid DNS server address {0:?}: {1}")]
    InvalidServer(String, String),
}

impl DnsError {
    /// Authoritative "no such name", as opposed to a transport failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NxDomain)
    }
}
