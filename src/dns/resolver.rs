use std::net::{IpAddr, Ipv6Addr, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf,
};

use super::error::DnsError;

const DNS_PORT: u16 = 53;
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);
const LOOKUP_ATTEMPTS: usize = 2;

/// Capability for PTR lookups. Implementations must be safe to share across
/// concurrent workers.
#[async_trait]
pub trait PtrResolver: Send + Sync {
    /// Returns the candidate names for `ip`, most-preferred first, with any
    /// trailing dots intact. NXDOMAIN surfaces as [`DnsError::NxDomain`] so
    /// callers can tell it apart from transport failures. Dropping the
    /// returned future cancels the lookup.
    async fn lookup_ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError>;
}

/// PTR resolution backed by hickory-dns.
#[derive(Debug)]
pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl HickoryResolver {
    /// A resolver using the system DNS configuration.
    pub fn from_system() -> Result<Self, DnsError> {
        let (config, opts) = system_conf::read_system_conf()
            .map_err(|e| DnsError::Network(format!("cannot read system DNS configuration: {e}")))?;
        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, tuned(opts)),
        })
    }

    /// A resolver querying `server`, given as `host[:port]` with the port
    /// defaulting to 53. A hostname is resolved to its addresses up front;
    /// malformed input fails synchronously.
    pub fn with_server(server: &str) -> Result<Self, DnsError> {
        let (host, port) = split_server(server)?;
        let ips = resolve_server_host(server, &host, port)?;

        let group = NameServerConfigGroup::from_ips_clear(&ips, port, true);
        let config = ResolverConfig::from_parts(None, Vec::new(), group);
        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, tuned(ResolverOpts::default())),
        })
    }
}

#[async_trait]
impl PtrResolver for HickoryResolver {
    async fn lookup_ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
        let lookup = self
            .inner
            .reverse_lookup(ip)
            .await
            .map_err(map_resolve_error)?;
        Ok(lookup.iter().map(ToString::to_string).collect())
    }
}

fn tuned(mut opts: ResolverOpts) -> ResolverOpts {
    opts.timeout = LOOKUP_TIMEOUT;
    opts.attempts = LOOKUP_ATTEMPTS;
    opts
}

fn map_resolve_error(err: ResolveError) -> DnsError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match response_code {
            ResponseCode::NXDomain => DnsError::NxDomain,
            // NODATA: the name exists but carries no PTR record
            ResponseCode::NoError => DnsError::NxDomain,
            code => DnsError::Lookup(format!("server answered {code}")),
        },
        ResolveErrorKind::Timeout => DnsError::Timeout,
        _ => DnsError::Network(err.to_string()),
    }
}

/// Splits `host[:port]` with a default port of 53. Accepts bare and
/// bracketed IPv6 literals.
fn split_server(server: &str) -> Result<(String, u16), DnsError> {
    let invalid =
        |reason: String| DnsError::InvalidServer(server.to_string(), reason);

    let trimmed = server.trim();
    let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("unterminated '['".to_string()))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => parse_port(server, p)?,
            None if tail.is_empty() => DNS_PORT,
            None => return Err(invalid("unexpected characters after ']'".to_string())),
        };
        (host, port)
    } else if trimmed.parse::<Ipv6Addr>().is_ok() {
        // A bare IPv6 literal; its colons are not a port separator.
        (trimmed, DNS_PORT)
    } else if let Some((host, p)) = trimmed.rsplit_once(':') {
        (host, parse_port(server, p)?)
    } else {
        (trimmed, DNS_PORT)
    };

    let host = host.trim();
    if host.is_empty() {
        return Err(invalid("empty hostname".to_string()));
    }
    Ok((host.to_string(), port))
}

fn parse_port(server: &str, raw: &str) -> Result<u16, DnsError> {
    if raw.is_empty() {
        return Ok(DNS_PORT);
    }
    raw.parse().map_err(|_| {
        DnsError::InvalidServer(server.to_string(), format!("unparseable port {raw:?}"))
    })
}

fn resolve_server_host(server: &str, host: &str, port: u16) -> Result<Vec<IpAddr>, DnsError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let ips: Vec<IpAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            DnsError::InvalidServer(server.to_string(), format!("cannot resolve {host:?}: {e}"))
        })?
        .map(|sock_addr| sock_addr.ip())
        .collect();
    if ips.is_empty() {
        return Err(DnsError::InvalidServer(
            server.to_string(),
            format!("no addresses for {host:?}"),
        ));
    }
    Ok(ips)
}
