use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::error::LeashError;
use super::state::{LeashState, LeashUpdate, TickSnapshot};

const ACTION_BUFFER: usize = 256;

/// Requests served by the leash worker.
#[derive(Debug)]
pub enum LeashAction {
    Apply(LeashUpdate),
    Observe {
        response_tx: oneshot::Sender<TickSnapshot>,
    },
    Inspect {
        response_tx: oneshot::Sender<LeashState>,
    },
}

/// Cloneable access to the state owned by a [`LeashWorker`].
#[derive(Clone, Debug)]
pub struct LeashHandle {
    tx: mpsc::Sender<LeashAction>,
}

impl LeashHandle {
    pub async fn apply(&self, update: LeashUpdate) -> Result<(), LeashError> {
        self.tx
            .send(LeashAction::Apply(update))
            .await
            .map_err(|_| LeashError::WorkerStopped)
    }

    /// Atomic read-and-derive for one control tick.
    pub async fn observe(&self) -> Result<TickSnapshot, LeashError> {
        // Queue behind any pending updates, then wait for the reply
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(LeashAction::Observe { response_tx })
            .await
            .map_err(|_| LeashError::WorkerStopped)?;
        response_rx.await.map_err(|_| LeashError::WorkerStopped)
    }

    /// Copy of the current state without touching the edge memory.
    pub async fn inspect(&self) -> Result<LeashState, LeashError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(LeashAction::Inspect { response_tx })
            .await
            .map_err(|_| LeashError::WorkerStopped)?;
        response_rx.await.map_err(|_| LeashError::WorkerStopped)
    }
}

/// Sole owner of the [`LeashState`].
pub struct LeashWorker {
    state: LeashState,
    rx: mpsc::Receiver<LeashAction>,
}

impl LeashWorker {
    pub fn create() -> (Self, LeashHandle) {
        let (tx, rx) = mpsc::channel(ACTION_BUFFER);
        let worker = Self {
            state: LeashState::default(),
            rx,
        };
        (worker, LeashHandle { tx })
    }

    /// Spawns the worker on the tokio runtime. It runs until `cancel` fires or
    /// every handle has been dropped.
    pub fn spawn(cancel: CancellationToken) -> (LeashHandle, JoinHandle<LeashState>) {
        let (worker, handle) = Self::create();
        let task = tokio::spawn(worker.run(cancel));
        (handle, task)
    }

    /// Processes actions one at a time and returns the final state.
    pub async fn run(mut self, cancel: CancellationToken) -> LeashState {
        info!("Leash worker started");
        loop {
            // Cancellation wins over queued actions, the state is final then
            let action = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Leash worker cancelled");
                    break;
                }
                action = self.rx.recv() => action,
            };

            // Channel closed: nobody can send or observe anymore
            let Some(action) = action else {
                debug!("All leash handles dropped");
                break;
            };

            // One action at a time, so an observation never sees half an update
            self.handle(action);
        }
        info!("Leash worker stopped: {}", self.state);
        self.state
    }

    fn handle(&mut self, action: LeashAction) {
        match action {
            LeashAction::Apply(update) => {
                trace!("Applying {:?}", update);
                self.state.apply(update);
            }
            LeashAction::Observe { response_tx } => {
                // Read values and advance the edge memory in one step
                let snapshot = self.state.observe();
                debug!("Observed {}", self.state);
                // the tick may have been cancelled while waiting
                let _ = response_tx.send(snapshot);
            }
            LeashAction::Inspect { response_tx } => {
                // Read only, was_grabbed stays untouched
                let _ = response_tx.send(self.state.clone());
            }
        }
    }
}
