// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drain worker: owns the drain state and schedules passes
//!
//! Triggers arrive over an `mpsc` channel from the appender, the tail ticker
//! and explicit requests. Each pass runs as its own task so the worker keeps
//! receiving triggers while it is in flight; those set the pending flag and
//! collapse into a single follow-up pass.

use crate::drain::{DrainEngine, PassOutcome};
use crate::error::DrainError;
use crate::state::DrainState;
use evlog_adapters::BatchPersister;
use evlog_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Queued triggers beyond this are dropped; one queued trigger already
/// guarantees a pass.
const TRIGGER_CAPACITY: usize = 64;

/// What asked for a drain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Append,
    Tick,
    Explicit,
}

/// Sending half of the trigger channel
#[derive(Debug, Clone)]
pub struct DrainTrigger {
    tx: mpsc::Sender<TriggerSource>,
}

impl DrainTrigger {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TriggerSource>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Fire-and-forget. Returns `false` only if the worker is gone.
    pub fn request(&self, source: TriggerSource) -> bool {
        match self.tx.try_send(source) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Counters published by the worker after every state change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainStatus {
    /// Completed passes, including no-op ones
    pub passes: u64,
    pub failures: u64,
    pub draining: bool,
    pub pending: bool,
    pub triggers_received: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub corrupt: u64,
    /// Error of the most recent pass, cleared by a successful one
    pub last_error: Option<String>,
}

/// Handle to a running drain worker
pub struct DrainHandle {
    trigger: DrainTrigger,
    status: watch::Receiver<DrainStatus>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl DrainHandle {
    /// A trigger sender for producers such as the appender
    pub fn trigger(&self) -> DrainTrigger {
        self.trigger.clone()
    }

    /// Ask for a pass explicitly
    pub fn request(&self) -> bool {
        self.trigger.request(TriggerSource::Explicit)
    }

    pub fn status(&self) -> DrainStatus {
        self.status.borrow().clone()
    }

    /// A status receiver that outlives borrows of the handle
    pub fn subscribe(&self) -> watch::Receiver<DrainStatus> {
        self.status.clone()
    }

    /// Wait until the published status satisfies `pred`. Returns `None` if
    /// the worker exited first.
    pub async fn wait_for(&self, pred: impl FnMut(&DrainStatus) -> bool) -> Option<DrainStatus> {
        let mut rx = self.status.clone();
        let status = rx.wait_for(pred).await.ok()?;
        Some(status.clone())
    }

    /// Stop the worker, waiting for an in-flight pass to finish
    pub async fn shutdown(self) -> Result<DrainStatus, DrainError> {
        let _ = self.stop.send(());
        self.task
            .await
            .map_err(|e| DrainError::Task(e.to_string()))?;
        Ok(self.status.borrow().clone())
    }
}

/// Spawn the drain worker for `engine`
pub fn spawn<P: BatchPersister, C: Clock>(engine: Arc<DrainEngine<P, C>>) -> DrainHandle {
    let (trigger, triggers) = DrainTrigger::channel(TRIGGER_CAPACITY);
    let (status_tx, status) = watch::channel(DrainStatus::default());
    let (stop, stop_rx) = oneshot::channel();

    let task = tokio::spawn(run(engine, triggers, stop_rx, status_tx));

    DrainHandle {
        trigger,
        status,
        stop,
        task,
    }
}

type PassResult = Result<PassOutcome, DrainError>;

async fn run<P: BatchPersister, C: Clock>(
    engine: Arc<DrainEngine<P, C>>,
    mut triggers: mpsc::Receiver<TriggerSource>,
    mut stop: oneshot::Receiver<()>,
    status: watch::Sender<DrainStatus>,
) {
    let mut state = DrainState::new();
    let mut active: Option<JoinHandle<PassResult>> = None;
    let mut ticker = tail_ticker(engine.config().tail_interval);

    info!(
        tail_interval_ms = engine.config().tail_interval.as_millis() as u64,
        max_batch = engine.config().max_batch,
        "drain worker started"
    );

    loop {
        let source = tokio::select! {
            _ = &mut stop => break,
            Some(source) = triggers.recv() => source,
            _ = next_tick(&mut ticker) => TriggerSource::Tick,
            result = join_active(&mut active) => {
                active = None;
                record(&status, result);
                if state.complete() {
                    debug!("running coalesced follow-up pass");
                    active = Some(start_pass(&engine));
                }
                publish(&status, &state);
                continue;
            }
        };

        status.send_modify(|s| s.triggers_received += 1);
        if state.request() {
            debug!(?source, "starting drain pass");
            active = Some(start_pass(&engine));
        } else {
            debug!(?source, "drain in progress, marking pending");
        }
        publish(&status, &state);
    }

    if let Some(task) = active.take() {
        debug!("waiting for in-flight drain pass");
        record(&status, task.await);
    }
    status.send_modify(|s| {
        s.draining = false;
        s.pending = false;
    });
    info!("drain worker stopped");
}

fn start_pass<P: BatchPersister, C: Clock>(
    engine: &Arc<DrainEngine<P, C>>,
) -> JoinHandle<PassResult> {
    let engine = Arc::clone(engine);
    tokio::spawn(async move { engine.run_pass().await })
}

fn record(status: &watch::Sender<DrainStatus>, result: Result<PassResult, JoinError>) {
    let result = result.unwrap_or_else(|e| Err(DrainError::Task(e.to_string())));
    if let Err(e) = &result {
        error!(error = %e, "drain pass failed");
    }

    status.send_modify(|s| {
        s.passes += 1;
        match &result {
            Ok(outcome) => {
                if let PassOutcome::Drained(report) = outcome {
                    s.inserted += report.outcome.inserted as u64;
                    s.duplicates += report.outcome.duplicates as u64;
                    s.corrupt += report.corrupt as u64;
                }
                s.last_error = None;
            }
            Err(e) => {
                s.failures += 1;
                s.last_error = Some(e.to_string());
            }
        }
    });
}

fn publish(status: &watch::Sender<DrainStatus>, state: &DrainState) {
    status.send_modify(|s| {
        s.draining = state.is_draining();
        s.pending = state.is_pending();
    });
}

fn tail_ticker(interval: Duration) -> Option<Interval> {
    if interval.is_zero() {
        return None;
    }
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn join_active(
    active: &mut Option<JoinHandle<PassResult>>,
) -> Result<PassResult, JoinError> {
    match active {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
