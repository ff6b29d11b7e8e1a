//! Async operation controller.
//!
//! Wraps one logical operation in an idle -> pending -> succeeded | failed
//! lifecycle and publishes every transition on a `watch` channel. Each
//! invocation takes a ticket from a monotonically increasing sequence; an
//! outcome whose ticket is no longer the latest is dropped instead of
//! overwriting the state of a newer invocation.

use crate::error::OperationError;
use crate::types::{OperationKind, OperationState};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct Operation<T> {
    kind: OperationKind,
    state: watch::Sender<OperationState<T>>,
    sequence: AtomicU64,
}

impl<T: Clone> Operation<T> {
    pub fn new(kind: OperationKind) -> Self {
        let (state, _) = watch::channel(OperationState::Idle);
        Self {
            kind,
            state,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Receiver that observes every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<OperationState<T>> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> OperationState<T> {
        self.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().is_pending()
    }

    /// Number of invocations started so far.
    pub fn invocations(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Run `work` as a fresh invocation of this operation.
    ///
    /// The state moves to `Pending` (dropping any previous value or error)
    /// before `work` is polled, and to exactly one terminal state afterwards.
    /// If another invocation started in the meantime, the outcome is not
    /// recorded and `OperationError::Superseded` is returned instead.
    pub async fn run<F>(&self, work: F) -> Result<T, OperationError>
    where
        F: Future<Output = Result<T, OperationError>>,
    {
        self.complete(work).await.into_result()
    }

    /// Like [`Operation::run`], but hands back the outcome of `work` even when
    /// it arrived too late to be recorded.
    ///
    /// Mutations use this so a change the backend already applied still
    /// triggers its follow-ups.
    pub async fn complete<F>(&self, work: F) -> Completion<T>
    where
        F: Future<Output = Result<T, OperationError>>,
    {
        let ticket = self.begin();
        let outcome = work.await;
        let stale = !self.record(ticket, &outcome);
        Completion { outcome, stale }
    }

    fn begin(&self) -> u64 {
        let ticket = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(OperationState::Pending);
        debug!("{} pending (#{})", self.kind, ticket);
        ticket
    }

    /// Publish `outcome` if `ticket` is still the latest invocation.
    fn record(&self, ticket: u64, outcome: &Result<T, OperationError>) -> bool {
        let latest = self.sequence.load(Ordering::SeqCst);
        if latest != ticket {
            debug!(
                "{} #{} settled after #{} started, discarding",
                self.kind, ticket, latest
            );
            return false;
        }

        match outcome {
            Ok(value) => {
                info!("{} succeeded", self.kind);
                self.state.send_replace(OperationState::Succeeded(value.clone()));
            }
            Err(e) => {
                warn!("{} failed: {}", self.kind, e);
                self.state.send_replace(OperationState::Failed(e.to_string()));
            }
        }
        true
    }
}

/// What one invocation produced, and whether a newer one overtook it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<T> {
    pub outcome: Result<T, OperationError>,
    /// Set when the outcome was not recorded because a newer invocation started.
    pub stale: bool,
}

impl<T> Completion<T> {
    /// Caller-facing result: a stale outcome becomes `Superseded`.
    pub fn into_result(self) -> Result<T, OperationError> {
        if self.stale {
            Err(OperationError::Superseded)
        } else {
            self.outcome
        }
    }
}
