//! Execution coordinator.
//!
//! Every selected handler is spawned as its own task before anything is
//! awaited, so fire-and-forget handlers are never skipped because an
//! awaited sibling failed. The call returns only once every awaited handler
//! has finished (successfully, with an error, or by panicking).

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info_span, trace};

use crate::app::AppContext;
use crate::error::BoxError;
use crate::handler::{HandlerEntry, HandlerId, HandlerResult};
use crate::reply::Reply;

/// Which awaited handler's reply becomes the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPolicy {
    /// The earliest-registered handler that replied wins.
    #[default]
    FirstRegistered,
    /// The handler that completed last with a reply wins.
    LastCompleted,
}

/// One scheduled invocation: a handler and the payload it receives.
pub struct Job<T> {
    pub entry: HandlerEntry<T>,
    pub input: Arc<T>,
}

impl<T> Job<T> {
    pub fn new(entry: HandlerEntry<T>, input: Arc<T>) -> Self {
        Self { entry, input }
    }
}

/// A failed awaited handler.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub id: HandlerId,
    pub error: String,
}

/// Result of dispatching one payload.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Handlers started, awaited or not.
    pub invoked: usize,
    /// Handlers the dispatch waited for.
    pub awaited: usize,
    /// Reply chosen by the policy.
    pub reply: Option<Reply>,
    /// Awaited handlers that failed.
    pub failures: Vec<HandlerFailure>,
}

impl DispatchOutcome {
    /// True when no awaited handler failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs resolved handlers with wait / fire-and-forget semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    policy: ReplyPolicy,
}

impl Executor {
    pub fn new(policy: ReplyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ReplyPolicy {
        self.policy
    }

    /// Runs every entry on the same payload.
    pub async fn execute_all<T>(
        &self,
        label: &str,
        input: Arc<T>,
        entries: Vec<HandlerEntry<T>>,
        app: &AppContext,
    ) -> DispatchOutcome
    where
        T: Send + Sync + 'static,
    {
        let jobs = entries
            .into_iter()
            .map(|entry| Job::new(entry, Arc::clone(&input)))
            .collect();
        self.execute(label, jobs, app).await
    }

    /// Starts all jobs, then waits for the awaited ones.
    pub async fn execute<T>(&self, label: &str, jobs: Vec<Job<T>>, app: &AppContext) -> DispatchOutcome
    where
        T: Send + Sync + 'static,
    {
        let span = info_span!("dispatch", route = %label, handlers = jobs.len());
        self.run(label, jobs, app).instrument(span).await
    }

    async fn run<T>(&self, label: &str, jobs: Vec<Job<T>>, app: &AppContext) -> DispatchOutcome
    where
        T: Send + Sync + 'static,
    {
        let mut outcome = DispatchOutcome {
            invoked: jobs.len(),
            ..Default::default()
        };
        let mut awaited = FuturesUnordered::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let id = job.entry.id();
            let task = tokio::spawn(job.entry.handler().call(job.input, app.clone()));

            if job.entry.options().wait {
                awaited.push(async move { (index, id, task.await) });
                continue;
            }

            let label = label.to_owned();
            tokio::spawn(async move {
                match task.await {
                    Ok(Ok(_)) => trace!(route = %label, handler = %id, "Background handler finished"),
                    Ok(Err(e)) => {
                        error!(route = %label, handler = %id, error = %e, "Background handler failed")
                    }
                    Err(e) => {
                        error!(route = %label, handler = %id, error = %e, "Background handler panicked")
                    }
                }
            });
        }

        outcome.awaited = awaited.len();

        // Completion order.
        let mut finished: Vec<(usize, HandlerId, HandlerResult)> = Vec::with_capacity(outcome.awaited);
        while let Some((index, id, joined)) = awaited.next().await {
            let result = joined.map_err(BoxError::from).and_then(|r| r);
            finished.push((index, id, result));
        }

        if self.policy == ReplyPolicy::FirstRegistered {
            finished.sort_by_key(|(index, _, _)| *index);
        }

        for (_, id, result) in finished {
            match result {
                Ok(Some(reply)) => {
                    let take = match self.policy {
                        ReplyPolicy::FirstRegistered => outcome.reply.is_none(),
                        ReplyPolicy::LastCompleted => true,
                    };
                    if take {
                        outcome.reply = Some(reply);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(route = %label, handler = %id, error = %e, "Handler failed");
                    outcome.failures.push(HandlerFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(
            route = %label,
            invoked = outcome.invoked,
            awaited = outcome.awaited,
            failed = outcome.failures.len(),
            "Dispatch complete"
        );
        outcome
    }
}
