use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use super::adapter::SyncAdapter;
use super::intent::{MutationIntent, SyncResponse};
use crate::error::SyncError;

struct Envelope {
    seq: u64,
    intent: MutationIntent,
}

/// A finished adapter call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub seq: u64,
    pub intent: MutationIntent,
    pub result: Result<SyncResponse, SyncError>,
}

type Notify = Box<dyn Fn() + Send + 'static>;

/// Runs a [`SyncAdapter`] on a background thread so commits never wait for
/// the store.
pub struct SyncClient {
    tx: Option<Sender<Envelope>>,
    rx: Receiver<Completion>,
    worker: Option<JoinHandle<()>>,
}

impl SyncClient {
    pub fn spawn(adapter: impl SyncAdapter) -> Self {
        Self::spawn_with_notify(adapter, Box::new(|| {}))
    }

    /// Like [`SyncClient::spawn`], calling `notify` after every completion
    /// (e.g. to request a repaint).
    pub fn spawn_with_notify(mut adapter: impl SyncAdapter, notify: Notify) -> Self {
        let (tx, jobs) = crossbeam_channel::unbounded::<Envelope>();
        let (done, rx) = crossbeam_channel::unbounded::<Completion>();

        let worker = std::thread::Builder::new()
            .name("sync-worker".into())
            .spawn(move || {
                for Envelope { seq, intent } in jobs.iter() {
                    debug!(seq, intent = intent.label(), "applying");
                    let result = adapter.apply(&intent);
                    if done.send(Completion { seq, intent, result }).is_err() {
                        break;
                    }
                    notify();
                }
                debug!("sync worker stopped");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(%err, "could not start sync worker");
                None
            }
        };
        Self {
            tx: Some(tx),
            rx,
            worker,
        }
    }

    pub fn submit(&self, seq: u64, intent: MutationIntent) -> Result<(), SyncError> {
        let tx = self.tx.as_ref().ok_or(SyncError::Disconnected)?;
        if self.worker.is_none() {
            return Err(SyncError::Disconnected);
        }
        tx.send(Envelope { seq, intent })
            .map_err(|_| SyncError::Disconnected)
    }

    pub fn try_recv(&self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Completion> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn completions_come_back_in_order() {
        let client = SyncClient::spawn(|intent: &MutationIntent| match intent {
            MutationIntent::DeleteCard { .. } => Err(SyncError::Rejected("locked".into())),
            _ => Ok(SyncResponse::Ack),
        });
        let lane = Uuid::new_v4();
        client
            .submit(1, MutationIntent::RemoveLane { lane })
            .unwrap();
        client
            .submit(2, MutationIntent::DeleteCard { card: Uuid::new_v4() })
            .unwrap();

        let first = client.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(first.result, Ok(SyncResponse::Ack));
        let second = client.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.seq, 2);
        assert!(second.result.is_err());
    }
}
