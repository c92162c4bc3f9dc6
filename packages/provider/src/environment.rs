//! The provider environment: configured destinations plus selection policy.

use std::sync::Arc;
use std::time::Duration;

use treeline_core::NamingError;
use treeline_wire::Destination;

use crate::{Blacklist, Clock, SystemClock};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the ordered candidate destinations, the shared blacklist, and the
/// retry/timeout knobs. One environment is shared (via `Arc`) by every
/// context derived from the same root; the destination list is immutable
/// after construction.
pub struct ProviderEnvironment {
    destinations: Vec<Destination>,
    blacklist: Blacklist,
    retry_limit: usize,
    connect_timeout: Duration,
    strict: bool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ProviderEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEnvironment")
            .field("destinations", &self.destinations)
            .field("blacklist", &self.blacklist)
            .field("retry_limit", &self.retry_limit)
            .field("connect_timeout", &self.connect_timeout)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl ProviderEnvironment {
    pub fn builder() -> ProviderEnvironmentBuilder {
        ProviderEnvironmentBuilder::new()
    }

    /// The configured destinations, in configured order.
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// The shared blacklist.
    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Maximum destinations tried per operation.
    pub fn retry_limit(&self) -> usize {
        self.retry_limit
    }

    /// Timeout covering connect plus handshake.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Current time on the environment's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Record a connectivity failure against a destination, returning the
    /// new failure count.
    pub fn record_failure(&self, destination: &Destination) -> u64 {
        self.blacklist.record_failure(destination, self.clock.now_ms())
    }

    /// Pick the destination to try next, skipping `already_tried`.
    ///
    /// Destinations are considered in configured order; any destination
    /// currently in backoff is passed over. When every remaining candidate
    /// is blacklisted the environment fails open, returning the one whose
    /// backoff expires soonest - unless configured strict, in which case
    /// selection fails.
    pub fn select(&self, already_tried: &[Destination]) -> Result<Destination, NamingError> {
        let now = self.clock.now_ms();
        let mut blocked: Vec<&Destination> = Vec::new();

        for destination in &self.destinations {
            if already_tried.contains(destination) {
                continue;
            }
            if self.blacklist.is_blocked(destination, now) {
                blocked.push(destination);
                continue;
            }
            return Ok(destination.clone());
        }

        if blocked.is_empty() {
            // Nothing left to try at all.
            return Err(NamingError::NoAvailableProviders);
        }
        if self.strict {
            return Err(NamingError::NoAvailableProviders);
        }

        // Fail open: the soonest-expiring candidate. Sweeping here is the
        // opportunistic GC point; the hot path above never takes the
        // write lock.
        let soonest = blocked
            .into_iter()
            .min_by_key(|destination| self.blacklist.deadline(destination).unwrap_or(0))
            .cloned();
        self.blacklist.sweep_expired(now);
        match soonest {
            Some(destination) => {
                log::debug!(
                    "all candidates blacklisted, failing open to {}",
                    destination
                );
                Ok(destination)
            }
            None => Err(NamingError::NoAvailableProviders),
        }
    }
}

/// Builder for [`ProviderEnvironment`].
pub struct ProviderEnvironmentBuilder {
    destinations: Vec<Destination>,
    retry_limit: Option<usize>,
    connect_timeout: Duration,
    strict: bool,
    clock: Option<Arc<dyn Clock>>,
}

impl ProviderEnvironmentBuilder {
    pub fn new() -> Self {
        ProviderEnvironmentBuilder {
            destinations: Vec::new(),
            retry_limit: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            strict: false,
            clock: None,
        }
    }

    /// Add one candidate destination. Order is selection order.
    pub fn destination(mut self, destination: Destination) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Add several candidate destinations.
    pub fn destinations(mut self, destinations: impl IntoIterator<Item = Destination>) -> Self {
        self.destinations.extend(destinations);
        self
    }

    /// Maximum destinations tried per operation. Defaults to the number of
    /// configured destinations.
    pub fn retry_limit(mut self, limit: usize) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Timeout covering connect plus handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Fail selection instead of failing open when every destination is
    /// blacklisted.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Use a custom clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<ProviderEnvironment, NamingError> {
        if self.destinations.is_empty() {
            return Err(NamingError::Other {
                message: "provider environment needs at least one destination".to_string(),
            });
        }
        let retry_limit = self.retry_limit.unwrap_or(self.destinations.len());
        Ok(ProviderEnvironment {
            retry_limit,
            connect_timeout: self.connect_timeout,
            strict: self.strict,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            blacklist: Blacklist::new(),
            destinations: self.destinations,
        })
    }
}

impl Default for ProviderEnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    fn destination(name: &str) -> Destination {
        Destination::parse(&format!("remote://{}:7000", name)).unwrap()
    }

    fn environment(strict: bool) -> (ProviderEnvironment, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let env = ProviderEnvironment::builder()
            .destination(destination("a"))
            .destination(destination("b"))
            .destination(destination("c"))
            .strict(strict)
            .clock(Arc::clone(&clock) as Arc<dyn Clock>)
            .build()
            .unwrap();
        (env, clock)
    }

    #[test]
    fn selects_in_configured_order() {
        let (env, _clock) = environment(false);
        assert_eq!(env.select(&[]).unwrap(), destination("a"));
    }

    #[test]
    fn skips_already_tried() {
        let (env, _clock) = environment(false);
        let tried = vec![destination("a"), destination("b")];
        assert_eq!(env.select(&tried).unwrap(), destination("c"));
    }

    #[test]
    fn skips_blacklisted_destinations() {
        let (env, _clock) = environment(false);
        env.record_failure(&destination("a"));
        assert_eq!(env.select(&[]).unwrap(), destination("b"));
    }

    #[test]
    fn blacklisted_destination_returns_after_backoff() {
        let (env, clock) = environment(false);
        env.record_failure(&destination("a"));
        clock.advance(65_536);
        assert_eq!(env.select(&[]).unwrap(), destination("a"));
    }

    #[test]
    fn fails_open_to_soonest_expiring() {
        let (env, clock) = environment(false);
        // "b" fails twice, so it expires later than "a" and "c".
        env.record_failure(&destination("b"));
        clock.advance(10);
        env.record_failure(&destination("b"));
        env.record_failure(&destination("a"));
        clock.advance(10);
        env.record_failure(&destination("c"));

        let picked = env.select(&[]).unwrap();
        assert_eq!(picked, destination("a"));
    }

    #[test]
    fn strict_mode_fails_closed() {
        let (env, _clock) = environment(true);
        env.record_failure(&destination("a"));
        env.record_failure(&destination("b"));
        env.record_failure(&destination("c"));
        assert!(matches!(env.select(&[]), Err(NamingError::NoAvailableProviders)));
    }

    #[test]
    fn exhausted_candidates_fail() {
        let (env, _clock) = environment(false);
        let tried = vec![destination("a"), destination("b"), destination("c")];
        assert!(matches!(env.select(&tried), Err(NamingError::NoAvailableProviders)));
    }

    #[test]
    fn build_requires_a_destination() {
        let err = ProviderEnvironment::builder().build().unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn retry_limit_defaults_to_destination_count() {
        let (env, _clock) = environment(false);
        assert_eq!(env.retry_limit(), 3);

        let env = ProviderEnvironment::builder()
            .destination(destination("a"))
            .retry_limit(7)
            .build()
            .unwrap();
        assert_eq!(env.retry_limit(), 7);
    }
}
