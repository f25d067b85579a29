use std::net::IpAddr;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tokio::sync::{broadcast, mpsc};

use super::{error::DnsError, resolver::PtrResolver};

/// Outcome of a single PTR lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    /// A PTR record exists; the trailing dot is already stripped.
    Resolved(String),
    /// Authoritative absence of a record.
    NxDomain,
    /// Transport or server failure.
    Failed(DnsError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupResult {
    pub ip: IpAddr,
    pub outcome: LookupOutcome,
}

impl LookupResult {
    /// The resolved name, if any.
    #[must_use]
    pub fn ptr(&self) -> Option<&str> {
        match &self.outcome {
            LookupOutcome::Resolved(name) => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&DnsError> {
        match &self.outcome {
            LookupOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_nxdomain(&self) -> bool {
        matches!(self.outcome, LookupOutcome::NxDomain)
    }
}

/// Fans `ips` across `concurrency` workers and streams exactly one result
/// per input address, in completion order. Callers that need input order
/// must sort after collecting.
///
/// A message on `shutdown` cancels the in-flight lookups; those and any
/// not-yet-started jobs are reported as [`DnsError::Cancelled`] failures,
/// and the stream still closes only after every worker has drained.
pub fn lookup_all(
    ips: Vec<IpAddr>,
    concurrency: usize,
    resolver: Arc<dyn PtrResolver>,
    shutdown: &broadcast::Sender<()>,
) -> mpsc::Receiver<LookupResult> {
    // Both queues are sized to the input so neither producer side ever
    // blocks while the consumer is alive.
    let (results_tx, results_rx) = mpsc::channel(ips.len().max(1));

    let jobs = Arc::new(ips);
    let next_job = Arc::new(AtomicUsize::new(0));
    let cancelled = Arc::new(AtomicBool::new(false));

    for _ in 0..concurrency.max(1) {
        let jobs = Arc::clone(&jobs);
        let next_job = Arc::clone(&next_job);
        let cancelled = Arc::clone(&cancelled);
        let resolver = Arc::clone(&resolver);
        let results = results_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                let index = next_job.fetch_add(1, Ordering::Relaxed);
                let Some(&ip) = jobs.get(index) else { break };

                let outcome = if cancelled.load(Ordering::SeqCst) {
                    LookupOutcome::Failed(DnsError::Cancelled)
                } else {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => {
                            cancelled.store(true, Ordering::SeqCst);
                            LookupOutcome::Failed(DnsError::Cancelled)
                        }
                        outcome = lookup_ip(resolver.as_ref(), ip) => outcome,
                    }
                };

                if results.send(LookupResult { ip, outcome }).await.is_err() {
                    break; // consumer is gone
                }
            }
        });
    }

    // The workers hold the remaining senders; the channel closes when the
    // last of them exits.
    results_rx
}

async fn lookup_ip(resolver: &dyn PtrResolver, ip: IpAddr) -> LookupOutcome {
    match resolver.lookup_ptr(ip).await {
        Ok(names) => match names.into_iter().next() {
            Some(name) => {
                let name = name.strip_suffix('.').unwrap_or(&name).to_string();
                LookupOutcome::Resolved(name)
            }
            None => LookupOutcome::NxDomain,
        },
        Err(err) if err.is_not_found() => LookupOutcome::NxDomain,
        Err(err) => LookupOutcome::Failed(err),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Scripted resolver: unknown addresses answer NXDOMAIN.
    #[derive(Default)]
    struct MockResolver {
        answers: HashMap<IpAddr, Result<Vec<String>, DnsError>>,
    }

    impl MockResolver {
        fn add_names(&mut self, ip: &str, names: &[&str]) {
            self.answers.insert(
                ip.parse().unwrap(),
                Ok(names.iter().map(ToString::to_string).collect()),
            );
        }

        fn add_error(&mut self, ip: &str, err: DnsError) {
            self.answers.insert(ip.parse().unwrap(), Err(err));
        }
    }

    #[async_trait]
    impl PtrResolver for MockResolver {
        async fn lookup_ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
            self.answers
                .get(&ip)
                .cloned()
                .unwrap_or(Err(DnsError::NxDomain))
        }
    }

    /// Never answers; lookups finish only through cancellation.
    struct StallResolver;

    #[async_trait]
    impl PtrResolver for StallResolver {
        async fn lookup_ptr(&self, _ip: IpAddr) -> Result<Vec<String>, DnsError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    fn ips(strs: &[&str]) -> Vec<IpAddr> {
        strs.iter().map(|s| s.parse().unwrap()).collect()
    }

    async fn collect(mut rx: mpsc::Receiver<LookupResult>) -> Vec<LookupResult> {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test]
    async fn one_result_per_address() {
        let mut resolver = MockResolver::default();
        resolver.add_names("192.168.1.1", &["host1.example.com."]);
        resolver.add_names("192.168.1.2", &["host2.example.com."]);
        resolver.add_error("192.168.1.3", DnsError::NxDomain);
        resolver.add_error("192.168.1.4", DnsError::Timeout);

        let (shutdown_tx, _) = broadcast::channel(1);
        let rx = lookup_all(
            ips(&["192.168.1.1", "192.168.1.2", "192.168.1.3", "192.168.1.4"]),
            2,
            Arc::new(resolver),
            &shutdown_tx,
        );

        let by_ip: HashMap<IpAddr, LookupResult> =
            collect(rx).await.into_iter().map(|r| (r.ip, r)).collect();
        assert_eq!(by_ip.len(), 4);

        assert_eq!(
            by_ip[&"192.168.1.1".parse().unwrap()].ptr(),
            Some("host1.example.com")
        );
        assert!(by_ip[&"192.168.1.3".parse().unwrap()].is_nxdomain());
        assert_eq!(
            by_ip[&"192.168.1.4".parse().unwrap()].error(),
            Some(&DnsError::Timeout)
        );
    }

    #[tokio::test]
    async fn uses_first_name_and_strips_trailing_dot() {
        let mut resolver = MockResolver::default();
        resolver.add_names("10.0.0.1", &["first.example.com.", "second.example.com."]);

        let (shutdown_tx, _) = broadcast::channel(1);
        let rx = lookup_all(ips(&["10.0.0.1"]), 1, Arc::new(resolver), &shutdown_tx);

        let results = collect(rx).await;
        assert_eq!(results[0].ptr(), Some("first.example.com"));
    }

    #[tokio::test]
    async fn empty_name_list_is_nxdomain() {
        let mut resolver = MockResolver::default();
        resolver.add_names("10.0.0.1", &[]);

        let (shutdown_tx, _) = broadcast::channel(1);
        let rx = lookup_all(ips(&["10.0.0.1"]), 1, Arc::new(resolver), &shutdown_tx);

        assert!(collect(rx).await[0].is_nxdomain());
    }

    #[tokio::test]
    async fn handles_more_addresses_than_workers() {
        let addrs: Vec<IpAddr> = (0..100)
            .map(|i| format!("192.168.1.{i}").parse().unwrap())
            .collect();

        let (shutdown_tx, _) = broadcast::channel(1);
        let rx = lookup_all(
            addrs.clone(),
            10,
            Arc::new(MockResolver::default()),
            &shutdown_tx,
        );

        let results = collect(rx).await;
        assert_eq!(results.len(), 100);

        let mut seen: Vec<IpAddr> = results.iter().map(|r| r.ip).collect();
        seen.sort_unstable();
        let mut want = addrs;
        want.sort_unstable();
        assert_eq!(seen, want);
    }

    #[tokio::test]
    async fn cancellation_drains_every_job() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let rx = lookup_all(
            ips(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]),
            2,
            Arc::new(StallResolver),
            &shutdown_tx,
        );

        shutdown_tx.send(()).unwrap();

        let results = collect(rx).await;
        assert_eq!(results.len(), 4);
        for result in &results {
            assert_eq!(result.error(), Some(&DnsError::Cancelled));
        }
    }
}
