//! Failure signalling between validators and the single aggregation task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Sending half handed to every validator. Carries no data, only "a failure occurred".
#[derive(Clone, Debug)]
pub struct FailureSignal {
    tx: mpsc::Sender<()>,
}

impl FailureSignal {
    /// Capacity 1 is the closest tokio gets to an unbuffered channel.
    pub(crate) fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Raises the signal from a blocking worker thread.
    ///
    /// Must not be called from inside an async task.
    pub fn raise(&self) {
        if self.tx.blocking_send(()).is_err() {
            log::warn!("failure signal dropped: aggregation task already stopped");
        }
    }
}

/// What the aggregation task observed once every sender was gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateReport {
    pub failures: usize,
}

impl AggregateReport {
    pub fn failed(&self) -> bool {
        self.failures > 0
    }
}

/// Owns the aggregation task. It is the only writer of the failure state, which is read once
/// in [`AggregateStatus::finish`] after the channel has been drained.
#[derive(Debug)]
pub struct AggregateStatus {
    signal: FailureSignal,
    drain: JoinHandle<AggregateReport>,
}

impl AggregateStatus {
    /// Starts the aggregation task on the current tokio runtime.
    pub fn spawn() -> Self {
        let (signal, mut rx) = FailureSignal::channel();
        let drain = tokio::spawn(async move {
            let mut report = AggregateReport::default();
            while rx.recv().await.is_some() {
                report.failures += 1;
            }
            report
        });
        Self { signal, drain }
    }

    pub fn signal(&self) -> FailureSignal {
        self.signal.clone()
    }

    /// Closes the channel from this side and waits for the drain to finish.
    ///
    /// Call only after every [`FailureSignal`] clone handed out has been dropped.
    pub async fn finish(self) -> Result<AggregateReport> {
        let AggregateStatus { signal, drain } = self;
        drop(signal);
        Ok(drain.await?)
    }
}
