//! Hook dispatcher: runs collected handlers concurrently and merges results
//!
//! Every handler is spawned before any is awaited. Two strategies:
//! - fail-fast (`strict`): the first failure aborts the dispatch; handlers
//!   already started keep running to completion in their own tasks
//! - settle-all: every outcome is collected, failures are logged and left out
//!   of the merge

use futures::future::{join_all, try_join_all};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::merge::merge_results;
use super::types::{DetailedOutcome, DispatchNotice, DispatchOptions, HandlerFailure, HookContext, HookName};
use super::value::ResolvedHook;
use crate::{Error, HookError, Result};

/// Notice channel capacity
const CHANNEL_CAPACITY: usize = 64;

/// A handler collected for one dispatch
#[derive(Debug, Clone)]
pub struct PendingHandler {
    /// Owner name (module, host or dynamic registrant)
    pub owner: String,
    /// What to run
    pub hook: ResolvedHook,
}

/// Handlers and collection-time failures for one dispatch
#[derive(Debug, Default)]
pub struct Collected {
    /// Handlers to run, in collection order
    pub handlers: Vec<PendingHandler>,
    /// Owners whose handler could not be loaded
    pub failures: Vec<HandlerFailure>,
}

type Spawned = (String, JoinHandle<std::result::Result<Value, HookError>>);

/// Runs handlers and publishes lifecycle notices
#[derive(Debug)]
pub struct Dispatcher {
    tx: broadcast::Sender<DispatchNotice>,
}

impl Dispatcher {
    /// Create a dispatcher with no subscribers
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to lifecycle notices
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchNotice> {
        self.tx.subscribe()
    }

    /// Publish a notice
    pub fn notify(&self, notice: DispatchNotice) {
        // No subscribers is fine
        let _ = self.tx.send(notice);
    }

    /// Publish that a dispatch was aborted and return the error
    pub fn abort(&self, name: &HookName, error: Error) -> Error {
        tracing::warn!(hook = %name, error = %error, "hook dispatch aborted");
        self.notify(DispatchNotice::Aborted {
            hook: name.to_string(),
            error: error.to_string(),
        });
        error
    }

    /// Fail-fast dispatch
    ///
    /// # Errors
    ///
    /// Returns `Error::Handler` for the first handler to fail
    pub async fn run_strict(
        &self,
        name: &HookName,
        options: &DispatchOptions,
        collected: Collected,
    ) -> Result<Value> {
        if let Some(failure) = collected.failures.into_iter().next() {
            self.failed(name, &failure);
            return Err(self.abort(
                name,
                Error::Handler {
                    owner: failure.owner,
                    message: failure.error,
                },
            ));
        }

        let spawned = spawn_all(name, options, collected.handlers);
        let outcome = try_join_all(spawned.into_iter().map(|(owner, handle)| async move {
            match settle(handle).await {
                Ok(value) => Ok((owner, value)),
                Err(error) => Err(HandlerFailure { owner, error }),
            }
        }))
        .await;

        match outcome {
            Ok(results) => Ok(self.finish(name, options, results)),
            Err(failure) => {
                self.failed(name, &failure);
                Err(self.abort(
                    name,
                    Error::Handler {
                        owner: failure.owner,
                        message: failure.error,
                    },
                ))
            }
        }
    }

    /// Settle-all dispatch: never fails, reports every failure
    pub async fn run_settled(
        &self,
        name: &HookName,
        options: &DispatchOptions,
        collected: Collected,
    ) -> DetailedOutcome {
        let mut failures = collected.failures;
        for failure in &failures {
            self.failed(name, failure);
        }

        let spawned = spawn_all(name, options, collected.handlers);
        let outcomes = join_all(
            spawned
                .into_iter()
                .map(|(owner, handle)| async move { (owner, settle(handle).await) }),
        )
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (owner, outcome) in outcomes {
            match outcome {
                Ok(value) => results.push((owner, value)),
                Err(error) => {
                    let failure = HandlerFailure { owner, error };
                    self.failed(name, &failure);
                    failures.push(failure);
                }
            }
        }

        let result = self.finish(name, options, results);
        DetailedOutcome { result, failures }
    }

    fn failed(&self, name: &HookName, failure: &HandlerFailure) {
        tracing::warn!(
            hook = %name,
            owner = %failure.owner,
            error = %failure.error,
            "hook handler failed"
        );
        self.notify(DispatchNotice::HandlerFailed {
            hook: name.to_string(),
            owner: failure.owner.clone(),
            error: failure.error.clone(),
        });
    }

    fn finish(&self, name: &HookName, options: &DispatchOptions, results: Vec<(String, Value)>) -> Value {
        tracing::debug!(hook = %name, mode = %options.mode, results = results.len(), "merging hook results");
        let merged = merge_results(options.mode, results);
        self.notify(DispatchNotice::After {
            hook: name.to_string(),
            result: merged.clone(),
        });
        merged
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Start every handler in its own task
fn spawn_all(name: &HookName, options: &DispatchOptions, handlers: Vec<PendingHandler>) -> Vec<Spawned> {
    handlers
        .into_iter()
        .map(|pending| {
            let ctx = HookContext {
                event: name.event().to_string(),
                namespace: name.namespace().map(str::to_string),
                owner: pending.owner.clone(),
                context: options.context.clone(),
            };
            let handle = tokio::spawn(pending.hook.run(ctx));
            (pending.owner, handle)
        })
        .collect()
}

async fn settle(handle: JoinHandle<std::result::Result<Value, HookError>>) -> std::result::Result<Value, String> {
    match handle.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("handler task failed: {e}")),
    }
}
