//! Concurrent fan-out of operations under an admission-control policy
//!
//! Whatever the policy, `run_concurrently` is a hard barrier: it returns only
//! once every operation it was given has produced an outcome, or after every
//! still-running operation has been aborted and reaped.

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Serialize, Serializer};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bench::core::{BenchError, OperationOutcome, OperationSpec, Result};
use crate::bench::executor;
use crate::bench::transport::TransportRegistry;

/// How many operations of a batch may be in flight at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Start everything immediately, driven inside the caller's task
    #[default]
    Unbounded,
    /// Start everything immediately as tasks owned by one scope
    StructuredGroup,
    /// At most `limit` operations run at a time
    BoundedCapacity { limit: usize },
}

impl fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyPolicy::Unbounded => f.write_str("unbounded"),
            ConcurrencyPolicy::StructuredGroup => f.write_str("structured"),
            ConcurrencyPolicy::BoundedCapacity { limit } => write!(f, "bounded:{}", limit),
        }
    }
}

impl FromStr for ConcurrencyPolicy {
    type Err = BenchError;

    /// Parses `unbounded`, `structured` or `bounded:<limit>`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "unbounded" => Ok(ConcurrencyPolicy::Unbounded),
            "structured" => Ok(ConcurrencyPolicy::StructuredGroup),
            _ => {
                let limit = s
                    .strip_prefix("bounded:")
                    .ok_or_else(|| {
                        BenchError::config(
                            "policy",
                            format!("unknown policy '{}' (expected unbounded, structured or bounded:<n>)", s),
                        )
                    })?
                    .parse::<usize>()
                    .map_err(|e| BenchError::config("policy", format!("invalid capacity limit: {}", e)))?;
                if limit == 0 {
                    return Err(BenchError::config("policy", "bounded capacity limit must be positive"));
                }
                Ok(ConcurrencyPolicy::BoundedCapacity { limit })
            }
        }
    }
}

impl Serialize for ConcurrencyPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Schedules batches of operations against a transport registry
#[derive(Clone)]
pub struct ConcurrencyController {
    registry: Arc<TransportRegistry>,
    cancel: CancellationToken,
}

impl ConcurrencyController {
    pub fn new(registry: Arc<TransportRegistry>) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight batches when `token` is cancelled
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run every spec under `policy` and return all outcomes in completion order
    pub async fn run_concurrently(
        &self,
        specs: Vec<OperationSpec>,
        policy: ConcurrencyPolicy,
    ) -> Result<Vec<OperationOutcome>> {
        if self.cancel.is_cancelled() {
            return Err(cancelled());
        }

        let expected = specs.len();
        debug!("Scheduling {} operations with policy {}", expected, policy);

        let outcomes = match policy {
            ConcurrencyPolicy::Unbounded => self.run_unbounded(&specs).await?,
            ConcurrencyPolicy::StructuredGroup => self.run_group(specs, None).await?,
            ConcurrencyPolicy::BoundedCapacity { limit } => {
                if limit == 0 {
                    return Err(BenchError::config("policy", "bounded capacity limit must be positive"));
                }
                self.run_group(specs, Some(Arc::new(Semaphore::new(limit)))).await?
            }
        };

        if outcomes.len() != expected {
            return Err(BenchError::scheduling(format!(
                "collected {} outcomes for {} operations",
                outcomes.len(),
                expected
            )));
        }

        Ok(outcomes)
    }

    async fn run_unbounded(&self, specs: &[OperationSpec]) -> Result<Vec<OperationOutcome>> {
        let registry = self.registry.as_ref();
        let mut pending: FuturesUnordered<_> = specs
            .iter()
            .map(|spec| {
                AssertUnwindSafe(executor::execute(registry, spec))
                    .catch_unwind()
                    .map(move |result| result.unwrap_or_else(|payload| panicked(spec, payload)))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(specs.len());
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    // Returning drops every unfinished operation at its await point
                    return Err(cancelled());
                }
                next = pending.next() => match next {
                    Some(outcome) => outcomes.push(outcome),
                    None => break,
                },
            }
        }

        Ok(outcomes)
    }

    async fn run_group(
        &self,
        specs: Vec<OperationSpec>,
        capacity: Option<Arc<Semaphore>>,
    ) -> Result<Vec<OperationOutcome>> {
        let expected = specs.len();
        let mut set: JoinSet<Result<OperationOutcome>> = JoinSet::new();
        let mut spawned: HashMap<Id, OperationSpec> = HashMap::with_capacity(expected);

        for spec in specs {
            let registry = self.registry.clone();
            let capacity = capacity.clone();
            let task_spec = spec.clone();

            let handle = set.spawn(async move {
                // Held until the operation finishes; the timer starts after admission
                let _permit = match capacity {
                    Some(semaphore) => Some(semaphore.acquire_owned().await?),
                    None => None,
                };
                Ok::<_, BenchError>(executor::execute(&registry, &task_spec).await)
            });
            spawned.insert(handle.id(), spec);
        }

        let mut outcomes = Vec::with_capacity(expected);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    shutdown(&mut set).await;
                    return Err(cancelled());
                }
                joined = set.join_next_with_id() => match joined {
                    None => break,
                    Some(Ok((_, Ok(outcome)))) => outcomes.push(outcome),
                    Some(Ok((_, Err(e)))) => {
                        shutdown(&mut set).await;
                        return Err(e);
                    }
                    Some(Err(join_error)) if join_error.is_panic() => {
                        let id = join_error.id();
                        let payload = join_error.into_panic();
                        match spawned.get(&id) {
                            Some(spec) => outcomes.push(panicked(spec, payload)),
                            None => {
                                shutdown(&mut set).await;
                                return Err(BenchError::scheduling("panicked task has no operation"));
                            }
                        }
                    }
                    Some(Err(join_error)) => {
                        // Only the runtime can cancel a task we did not abort
                        shutdown(&mut set).await;
                        return Err(BenchError::Scheduling {
                            reason: "operation task cancelled by the runtime".to_string(),
                            source: Some(Box::new(join_error)),
                        });
                    }
                },
            }
        }

        Ok(outcomes)
    }
}

/// Abort every task in the scope and wait until each one is gone
async fn shutdown<T: 'static>(set: &mut JoinSet<T>) {
    set.abort_all();
    let mut reaped = 0usize;
    while set.join_next().await.is_some() {
        reaped += 1;
    }
    debug!("Reaped {} operation tasks", reaped);
}

fn cancelled() -> BenchError {
    BenchError::Cancelled {
        reason: "batch aborted through cancellation token".to_string(),
    }
}

fn panicked(spec: &OperationSpec, payload: Box<dyn Any + Send>) -> OperationOutcome {
    let reason = if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };
    warn!("Operation on {} panicked: {}", spec.target(), reason);

    OperationOutcome::failed(
        spec,
        Duration::ZERO,
        BenchError::OperationPanicked {
            target: spec.target().to_string(),
            reason,
        },
    )
}
