//! # Circuit Breaker Command
//!
//! One-shot execution wrapper combining timeout enforcement, fallback
//! substitution, bounded per-group concurrency, and circuit breaker
//! admission. A command is created fresh for every invocation and consumed
//! by `execute` or `queue`.
//!
//! The work future runs on its own spawned task. On timeout the caller
//! unblocks immediately with the fallback while the task keeps running
//! detached; its late result is dropped and never reaches the caller.

use crate::resilience::circuit_breaker::Admission;
use crate::resilience::registry::{CircuitBreakerRegistry, CommandKey};
use crate::resilience::window::Outcome;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lifecycle of a single command invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Created,
    Running,
    Success,
    Failure,
    TimedOut,
    ShortCircuited,
    Rejected,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommandState::Created => "CREATED",
            CommandState::Running => "RUNNING",
            CommandState::Success => "SUCCESS",
            CommandState::Failure => "FAILURE",
            CommandState::TimedOut => "TIMED_OUT",
            CommandState::ShortCircuited => "SHORT_CIRCUITED",
            CommandState::Rejected => "REJECTED",
        };
        write!(f, "{label}")
    }
}

/// Classification hook for work errors.
///
/// Caller errors (the downstream rejected the call as malformed, HTTP 4xx)
/// bypass the fallback and never trip the circuit breaker.
pub trait FailureClass {
    fn is_caller_error(&self) -> bool {
        false
    }
}

impl FailureClass for String {}

/// The only error a command surfaces to its caller.
///
/// Every other failure mode (timeout, rejection, short circuit, dependency
/// failure) is masked behind the fallback value.
#[derive(Debug, thiserror::Error)]
pub enum CommandError<E: fmt::Debug> {
    #[error("unsuccessful outgoing request: {0:?}")]
    BadRequest(E),
}

impl<E: fmt::Debug> CommandError<E> {
    /// Unwrap the caller error that caused the bad-request classification
    pub fn into_inner(self) -> E {
        match self {
            CommandError::BadRequest(inner) => inner,
        }
    }
}

/// One-shot unit of work protected by a circuit breaker.
///
/// Not reusable: both `execute` and `queue` consume the command.
#[derive(Debug)]
pub struct CircuitCommand {
    registry: Arc<CircuitBreakerRegistry>,
    key: CommandKey,
    timeout: Duration,
}

impl CircuitCommand {
    /// Default per-command timeout when none is configured explicitly
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(registry: Arc<CircuitBreakerRegistry>, key: CommandKey) -> Self {
        Self {
            registry,
            key,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn key(&self) -> &CommandKey {
        &self.key
    }

    /// Run the work synchronously from the caller's point of view.
    ///
    /// Blocks until a terminal state is reached: the work completed, timed
    /// out, was rejected by the saturated pool, or was short-circuited by an
    /// open breaker. All of those except a caller error resolve to `Ok`,
    /// either with the work's result or with the fallback value.
    pub async fn execute<T, E, W, Fut, F>(self, work: W, fallback: F) -> Result<T, CommandError<E>>
    where
        T: Send + 'static,
        E: FailureClass + fmt::Debug + Send + 'static,
        W: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        F: FnOnce() -> T + Send,
    {
        let started = Instant::now();
        let enabled = self.registry.is_enabled();
        let breaker = self.registry.breaker(&self.key).await;

        let permit = if enabled {
            match breaker.try_acquire() {
                Admission::Allowed(permit) => Some(permit),
                Admission::ShortCircuited => {
                    self.finish(CommandState::ShortCircuited, started);
                    return Ok(fallback());
                }
            }
        } else {
            None
        };

        let pool = self.registry.pool(&self.key).await;
        let execution_slot = match Arc::clone(&pool).try_acquire_owned() {
            Ok(slot) => slot,
            Err(_) => {
                if let Some(permit) = permit {
                    breaker.record(permit, Outcome::Rejected, started.elapsed());
                }
                self.finish(CommandState::Rejected, started);
                return Ok(fallback());
            }
        };

        debug!(command = %self.key, state = %CommandState::Running, "executing command");

        // The work gets its own task so a timeout unblocks the caller
        // without cancelling a non-interruptible call mid-flight.
        let handle = tokio::spawn(work());
        let raced = tokio::time::timeout(self.timeout, handle).await;
        drop(execution_slot);

        match raced {
            Err(_elapsed) => {
                // Work continues detached; its eventual result is dropped
                if let Some(permit) = permit {
                    breaker.record(permit, Outcome::Timeout, started.elapsed());
                }
                self.finish(CommandState::TimedOut, started);
                Ok(fallback())
            }
            Ok(Err(join_error)) => {
                warn!(command = %self.key, error = %join_error, "command task aborted");
                if let Some(permit) = permit {
                    breaker.record(permit, Outcome::Failure, started.elapsed());
                }
                self.finish(CommandState::Failure, started);
                Ok(fallback())
            }
            Ok(Ok(Ok(value))) => {
                if let Some(permit) = permit {
                    breaker.record(permit, Outcome::Success, started.elapsed());
                }
                self.finish(CommandState::Success, started);
                Ok(value)
            }
            Ok(Ok(Err(error))) => {
                if error.is_caller_error() {
                    // Bad request: no fallback, no window bookkeeping
                    if let Some(permit) = permit {
                        breaker.abandon(permit);
                    }
                    warn!(
                        command = %self.key,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "bad request propagated to caller"
                    );
                    Err(CommandError::BadRequest(error))
                } else {
                    if let Some(permit) = permit {
                        breaker.record(permit, Outcome::Failure, started.elapsed());
                    }
                    warn!(command = %self.key, error = ?error, "command work failed");
                    self.finish(CommandState::Failure, started);
                    Ok(fallback())
                }
            }
        }
    }

    /// Submit the command for asynchronous execution and return immediately.
    ///
    /// The returned handle resolves once the command reaches a terminal
    /// state; callers that do not care may simply drop it.
    pub fn queue<T, E, W, Fut, F>(
        self,
        work: W,
        fallback: F,
    ) -> JoinHandle<Result<T, CommandError<E>>>
    where
        T: Send + 'static,
        E: FailureClass + fmt::Debug + Send + 'static,
        W: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        tokio::spawn(async move { self.execute(work, fallback).await })
    }

    fn finish(&self, state: CommandState, started: Instant) {
        let latency_ms = started.elapsed().as_millis() as u64;
        match state {
            CommandState::Success => {
                debug!(command = %self.key, state = %state, latency_ms, "command finished");
            }
            _ => {
                warn!(command = %self.key, state = %state, latency_ms, "command finished");
            }
        }
    }
}
