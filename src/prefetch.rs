//! Idle-time image prefetching with deduplication.
//!
//! Warming an image means asking the host to load it off-screen with low
//! priority, so that the browser's resource cache already holds it when a
//! card later cycles to it. This is strictly best-effort:
//!
//! - the work is deferred until the host is idle (or a fallback delay
//!   elapses), so it never competes with user interaction,
//! - every probe failure is swallowed; the image simply loads on demand later,
//! - there are no retries and no cancellation.
//!
//! ## Deduplication
//!
//! The [`PrefetchCache`] remembers every base URL ever handed to the
//! scheduler. The insert happens synchronously in [`PrefetchScheduler::schedule`],
//! *before* the deferred probe runs, so two calls in the same turn for URLs
//! that normalize to the same base produce at most one probe.
//!
//! ## Deferral
//!
//! How work is deferred is a single injectable [`Defer`] capability chosen
//! once at startup by [`select_defer`]:
//!
//! | Host supports idle callbacks | Implementation | Runs |
//! |---|---|---|
//! | yes | [`IdleDefer`] | at the next idle period, at most `idle_timeout` later |
//! | no  | [`DelayDefer`] | after a fixed `fallback_delay` (150 ms) |

use crate::config::GridConfig;
use crate::runtime::{DeferError, EventLoop, Task};
use crate::variant::{VariantSettings, strip_size_params};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// Append-only set of base URLs already handed to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct PrefetchCache {
    seen: HashSet<String>,
}

impl PrefetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, base_url: &str) -> bool {
        self.seen.contains(base_url)
    }

    /// Record a base URL. Returns `false` if it was already present.
    pub fn insert(&mut self, base_url: String) -> bool {
        self.seen.insert(base_url)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    /// Forget everything. The scheduler itself never shrinks the cache;
    /// this exists so a harness can start a fresh session.
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

/// What [`PrefetchScheduler::schedule`] did with a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefetchOutcome {
    /// A probe was deferred.
    Scheduled,
    /// The base URL was already in the cache.
    Deduplicated,
    /// The URL normalized to nothing.
    Ignored,
    /// The defer capability refused the probe. The URL stays cached.
    FailedSilently,
}

/// Capability to run a task later, without blocking.
pub trait Defer {
    fn defer(&self, task: Task) -> Result<(), DeferError>;

    /// Short name for logs and CLI output.
    fn name(&self) -> &'static str;
}

/// Runs tasks at the next idle period, or after `timeout` at the latest.
#[derive(Debug, Clone)]
pub struct IdleDefer {
    pub host: EventLoop,
    pub timeout: Duration,
}

impl Defer for IdleDefer {
    fn defer(&self, task: Task) -> Result<(), DeferError> {
        self.host.request_idle(task, self.timeout)
    }

    fn name(&self) -> &'static str {
        "idle"
    }
}

/// Runs tasks after a fixed delay.
#[derive(Debug, Clone)]
pub struct DelayDefer {
    pub host: EventLoop,
    pub delay: Duration,
}

impl Defer for DelayDefer {
    fn defer(&self, task: Task) -> Result<(), DeferError> {
        self.host.set_timeout(task, self.delay)
    }

    fn name(&self) -> &'static str {
        "delay"
    }
}

/// Features the host environment offers, detected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Idle-time callbacks are available.
    pub idle_callback: bool,
    /// Image loads accept a fetch priority hint.
    pub fetch_priority: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            idle_callback: true,
            fetch_priority: true,
        }
    }
}

/// Pick the defer implementation for this host.
pub fn select_defer(host: &EventLoop, caps: HostCapabilities, config: &GridConfig) -> Rc<dyn Defer> {
    if caps.idle_callback {
        Rc::new(IdleDefer {
            host: host.clone(),
            timeout: Duration::from_millis(config.prefetch.idle_timeout_ms),
        })
    } else {
        Rc::new(DelayDefer {
            host: host.clone(),
            delay: Duration::from_millis(config.prefetch.fallback_delay_ms),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPriority {
    Low,
}

/// An off-screen image load, as handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRequest {
    pub base_url: String,
    /// Immediately requested resource: the smallest breakpoint variant.
    pub src: String,
    pub srcset: String,
    pub sizes: String,
    pub decode_async: bool,
    /// `None` when the host does not support priority hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_priority: Option<FetchPriority>,
}

impl ProbeRequest {
    pub fn new(base_url: &str, settings: &VariantSettings, fetch_priority: Option<FetchPriority>) -> Self {
        let candidates = settings.candidates(base_url);
        let src = candidates
            .smallest()
            .map(|c| c.url.clone())
            .unwrap_or_else(|| base_url.to_string());
        Self {
            base_url: base_url.to_string(),
            src,
            srcset: candidates.to_srcset(),
            sizes: settings.sizes.clone(),
            decode_async: true,
            fetch_priority,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("image probes are not supported: {0}")]
    Unsupported(String),
    #[error("probe failed: {0}")]
    Failed(String),
}

/// The host's resource loader.
///
/// Failures should be reported as `Err`. A panic inside `load` is caught
/// by the scheduler and treated as [`ProbeError::Failed`].
pub trait ImageProbe {
    fn load(&self, request: &ProbeRequest) -> Result<(), ProbeError>;
}

fn load_contained(probe: &dyn ImageProbe, request: &ProbeRequest) -> Result<(), ProbeError> {
    panic::catch_unwind(AssertUnwindSafe(|| probe.load(request)))
        .unwrap_or_else(|_| Err(ProbeError::Failed("probe panicked".to_string())))
}

/// Probe that records every request it receives. Used by the CLI session
/// simulator and by tests as a probe-issuance counter.
#[derive(Debug, Default)]
pub struct ProbeJournal {
    requests: RefCell<Vec<ProbeRequest>>,
}

impl ProbeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ImageProbe for ProbeJournal {
    fn load(&self, request: &ProbeRequest) -> Result<(), ProbeError> {
        self.requests.borrow_mut().push(request.clone());
        Ok(())
    }
}

/// Deduplicating, deferred, best-effort image warmer.
pub struct PrefetchScheduler {
    cache: PrefetchCache,
    defer: Rc<dyn Defer>,
    probe: Rc<dyn ImageProbe>,
    variants: VariantSettings,
    fetch_priority: Option<FetchPriority>,
}

impl PrefetchScheduler {
    pub fn new(
        defer: Rc<dyn Defer>,
        probe: Rc<dyn ImageProbe>,
        variants: VariantSettings,
        fetch_priority: Option<FetchPriority>,
    ) -> Self {
        Self {
            cache: PrefetchCache::new(),
            defer,
            probe,
            variants,
            fetch_priority,
        }
    }

    /// Wire a scheduler to a host loop: defer capability from the host's
    /// capabilities, low priority when both host and config allow it.
    pub fn for_host(
        host: &EventLoop,
        caps: HostCapabilities,
        probe: Rc<dyn ImageProbe>,
        config: &GridConfig,
    ) -> Self {
        let priority = (caps.fetch_priority && config.prefetch.low_priority)
            .then_some(FetchPriority::Low);
        Self::new(
            select_defer(host, caps, config),
            probe,
            VariantSettings::from_config(config),
            priority,
        )
    }

    /// Schedule a low-priority warm-up of `maybe_url`.
    pub fn schedule(&mut self, maybe_url: &str) -> PrefetchOutcome {
        let base = strip_size_params(maybe_url);
        if base.is_empty() {
            return PrefetchOutcome::Ignored;
        }
        if !self.cache.insert(base.clone()) {
            tracing::debug!(url = %base, "prefetch deduplicated");
            return PrefetchOutcome::Deduplicated;
        }

        let probe = Rc::clone(&self.probe);
        let variants = self.variants.clone();
        let priority = self.fetch_priority;
        let url = base.clone();
        let task: Task = Box::new(move || {
            let request = ProbeRequest::new(&url, &variants, priority);
            match load_contained(probe.as_ref(), &request) {
                Ok(()) => tracing::debug!(url = %request.src, "prefetch probe issued"),
                Err(err) => tracing::debug!(url = %request.src, error = %err, "prefetch probe failed"),
            }
        });

        match self.defer.defer(task) {
            Ok(()) => {
                tracing::debug!(url = %base, via = self.defer.name(), "prefetch scheduled");
                PrefetchOutcome::Scheduled
            }
            Err(err) => {
                tracing::debug!(url = %base, error = %err, "prefetch not deferred");
                PrefetchOutcome::FailedSilently
            }
        }
    }

    pub fn cache(&self) -> &PrefetchCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut PrefetchCache {
        &mut self.cache
    }

    pub fn defer_name(&self) -> &'static str {
        self.defer.name()
    }
}

impl std::fmt::Debug for PrefetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchScheduler")
            .field("cache", &self.cache.len())
            .field("defer", &self.defer.name())
            .field("fetch_priority", &self.fetch_priority)
            .finish()
    }
}
