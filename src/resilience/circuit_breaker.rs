//! Circuit breaker for the upstream provider.
//!
//! # States
//! - Closed: normal operation, calls pass through and fill the rolling window
//! - Open: provider assumed down, calls are rejected without touching the network
//! - Half-Open: one trial call decides between Closed and Open
//!
//! # State Transitions
//! ```text
//! Closed → Open: window holds >= request_volume_threshold calls and
//!                failures / calls > failure_ratio
//! Open → Half-Open: open_duration elapsed (checked lazily on the next call)
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per currency by default; `shared` scope uses a single breaker
//! - Single trial in Half-Open; concurrent callers are rejected meanwhile
//! - A permit dropped without an outcome (cancelled caller) records nothing
//!   and frees the trial slot
//! - State lives behind a `Mutex`, never held across an await

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{BreakerScope, CircuitBreakerSettings};
use crate::observability::metrics;
use crate::rates::{CurrencyCode, Quote};
use crate::upstream::{RateSource, RetryClass, UpstreamError};

/// Breaker name used when all currencies share one breaker.
pub const SHARED_BREAKER: &str = "upstream";

/// Externally visible breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0 closed, 1 open, 2 half-open.
    pub fn as_gauge(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Window size, and the minimum number of calls before the breaker may open.
    pub request_volume_threshold: usize,
    /// Failure ratio that must be exceeded to open.
    pub failure_ratio: f64,
    /// How long the breaker stays open before allowing a trial.
    pub open_duration: Duration,
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            request_volume_threshold: settings.request_volume_threshold as usize,
            failure_ratio: settings.failure_ratio,
            open_duration: settings.open_duration(),
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&CircuitBreakerSettings::default())
    }
}

#[derive(Debug)]
enum Phase {
    Closed,
    Open { since: Instant },
    HalfOpen { trial_in_flight: bool },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Self::Closed => CircuitState::Closed,
            Self::Open { .. } => CircuitState::Open,
            Self::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    /// Outcomes of the most recent calls, `true` meaning failure.
    window: VecDeque<bool>,
}

/// Point-in-time view of one breaker.
#[derive(Clone, Debug, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub window_calls: usize,
    pub window_failures: usize,
}

/// A rolling-window circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = VecDeque::with_capacity(config.request_volume_threshold);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                window,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lock the state, recovering from poison; a slightly stale window beats
    /// taking the whole service down.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(breaker = %self.name, "Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Ask permission for one call. `None` means the call must be rejected.
    pub fn try_acquire(self: &Arc<Self>) -> Option<CallPermit> {
        let mut inner = self.lock();

        let trial = match &mut inner.phase {
            Phase::Closed => false,
            Phase::Open { since } => {
                if since.elapsed() < self.config.open_duration {
                    return None;
                }
                self.transition(&mut inner, Phase::HalfOpen { trial_in_flight: true });
                true
            }
            Phase::HalfOpen { trial_in_flight } => {
                if *trial_in_flight {
                    return None;
                }
                *trial_in_flight = true;
                true
            }
        };

        Some(CallPermit {
            breaker: Arc::clone(self),
            trial,
            settled: false,
        })
    }

    pub fn state(&self) -> CircuitState {
        self.lock().phase.state()
    }

    /// True while `try_acquire` would return `None`.
    pub fn is_rejecting(&self) -> bool {
        match self.lock().phase {
            Phase::Closed => false,
            Phase::Open { since } => since.elapsed() < self.config.open_duration,
            Phase::HalfOpen { trial_in_flight } => trial_in_flight,
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.phase.state(),
            window_calls: inner.window.len(),
            window_failures: inner.window.iter().filter(|failed| **failed).count(),
        }
    }

    /// Force the breaker closed and forget the window.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.window.clear();
        if !matches!(inner.phase, Phase::Closed) {
            self.transition(&mut inner, Phase::Closed);
        }
    }

    fn record(&self, trial: bool, failed: bool) {
        let mut inner = self.lock();

        match inner.phase.state() {
            CircuitState::Closed => {
                inner.window.push_back(failed);
                while inner.window.len() > self.config.request_volume_threshold {
                    inner.window.pop_front();
                }
                if self.should_open(&inner.window) {
                    let failures = inner.window.iter().filter(|f| **f).count();
                    tracing::warn!(
                        breaker = %self.name,
                        failures,
                        calls = inner.window.len(),
                        "Failure ratio exceeded, opening circuit"
                    );
                    self.transition(&mut inner, Phase::Open { since: Instant::now() });
                }
            }
            CircuitState::HalfOpen if trial => {
                let next = if failed {
                    Phase::Open { since: Instant::now() }
                } else {
                    Phase::Closed
                };
                self.transition(&mut inner, next);
            }
            // Stale outcome from a call admitted before the last transition.
            _ => {}
        }
    }

    fn should_open(&self, window: &VecDeque<bool>) -> bool {
        if window.is_empty() || window.len() < self.config.request_volume_threshold {
            return false;
        }
        let failures = window.iter().filter(|f| **f).count();
        failures as f64 / window.len() as f64 > self.config.failure_ratio
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        if let Phase::HalfOpen { trial_in_flight } = &mut inner.phase {
            *trial_in_flight = false;
        }
    }

    fn transition(&self, inner: &mut Inner, to: Phase) {
        let from = inner.phase.state();
        let state = to.state();
        inner.phase = to;
        if state != CircuitState::HalfOpen {
            inner.window.clear();
        }

        tracing::info!(breaker = %self.name, from = %from, to = %state, "Circuit state changed");
        metrics::record_circuit_state(&self.name, state.as_gauge());
    }
}

/// Permission for exactly one call, to be settled with its outcome.
#[derive(Debug)]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    trial: bool,
    settled: bool,
}

impl CallPermit {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record(self.trial, false);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record(self.trial, true);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial();
        }
    }
}

/// Hands out breakers according to the configured scope.
#[derive(Debug)]
pub struct BreakerRegistry {
    scope: BreakerScope,
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(scope: BreakerScope, config: CircuitBreakerConfig) -> Self {
        Self {
            scope,
            config,
            breakers: DashMap::new(),
        }
    }

    pub fn from_settings(settings: &CircuitBreakerSettings) -> Self {
        Self::new(settings.scope, CircuitBreakerConfig::from(settings))
    }

    pub fn for_currency(&self, currency: &CurrencyCode) -> Arc<CircuitBreaker> {
        let name = match self.scope {
            BreakerScope::PerCurrency => currency.to_string(),
            BreakerScope::Shared => SHARED_BREAKER.to_string(),
        };

        let entry = self
            .breakers
            .entry(name.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.config.clone())));
        Arc::clone(entry.value())
    }

    /// Snapshots of every breaker created so far, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Reset every breaker; returns how many were reset.
    pub fn reset_all(&self) -> usize {
        let mut count = 0;
        for breaker in self.breakers.iter() {
            breaker.reset();
            count += 1;
        }
        tracing::info!(count, "Circuit breakers reset");
        count
    }
}

/// Wraps a source with the breaker for the requested currency.
///
/// Transient failures count against the window; a not-found answer is a
/// healthy provider response and counts as success.
pub struct WithCircuitBreaker<S> {
    inner: S,
    breakers: Arc<BreakerRegistry>,
}

impl<S> WithCircuitBreaker<S> {
    pub fn new(inner: S, breakers: Arc<BreakerRegistry>) -> Self {
        Self { inner, breakers }
    }
}

#[async_trait]
impl<S: RateSource> RateSource for WithCircuitBreaker<S> {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<Quote, UpstreamError> {
        let breaker = self.breakers.for_currency(currency);
        let Some(permit) = breaker.try_acquire() else {
            tracing::debug!(currency = %currency, breaker = %breaker.name(), "Circuit open, call rejected");
            return Err(UpstreamError::CircuitOpen {
                currency: currency.clone(),
            });
        };

        let result = self.inner.fetch(currency).await;
        match &result {
            Err(e) if e.retry_class() == RetryClass::Transient => permit.failure(),
            _ => permit.success(),
        }
        result
    }

    fn supports(&self, currency: &CurrencyCode) -> bool {
        self.inner.supports(currency)
    }

    fn rejects(&self, currency: &CurrencyCode) -> bool {
        self.breakers.for_currency(currency).is_rejecting() || self.inner.rejects(currency)
    }
}
