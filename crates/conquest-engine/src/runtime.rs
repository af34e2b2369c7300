//! Actor wrapper around [`GameController`].
//!
//! The controller runs on one task and drains a request queue, so commands, undo/redo, and
//! recording loads are applied strictly one at a time. Callers hold a cloneable
//! [`ControllerHandle`]; replies come back on oneshot channels.

use conquest_core::{InvalidCommand, NothingToRedo, NothingToUndo, RecordingError};
use conquest_protocol::{GameCommand, Intent, PlayerId, TerritoryId, UiState};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::publish::{EventBus, EventSubscription, StateUpdate};
use crate::recording::RecordingFilePicker;
use crate::{ControllerError, GameController};

const REQUEST_QUEUE: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum Request {
    Start(Reply<()>),
    Submit(Intent, Reply<Result<(), InvalidCommand>>),
    Execute(GameCommand, Reply<Result<(), InvalidCommand>>),
    Undo(Reply<Result<(), NothingToUndo>>),
    Redo(Reply<Result<(), NothingToRedo>>),
    Select(TerritoryId, Reply<Result<(), InvalidCommand>>),
    CancelSelection(Reply<Result<(), InvalidCommand>>),
    BotDecision {
        player: PlayerId,
        revision: u64,
        intent: Intent,
        reply: Reply<Result<(), ControllerError>>,
    },
    ForfeitBotTurn {
        player: PlayerId,
        revision: u64,
        reply: Reply<Result<(), ControllerError>>,
    },
    Export(Reply<Result<Vec<u8>, RecordingError>>),
    Import(Vec<u8>, Reply<Result<(), RecordingError>>),
}

/// Move `controller` onto its own task.
///
/// The task ends when every handle is dropped and returns the controller.
pub fn spawn(controller: GameController) -> (ControllerHandle, JoinHandle<GameController>) {
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
    let handle = ControllerHandle {
        tx,
        state: controller.watch_state(),
        ui: controller.watch_ui(),
        events: controller.event_bus().clone(),
    };
    let task = tokio::spawn(run(controller, rx));
    (handle, task)
}

async fn run(mut controller: GameController, mut rx: mpsc::Receiver<Request>) -> GameController {
    while let Some(request) = rx.recv().await {
        // A caller that stopped waiting for its reply is not an error.
        match request {
            Request::Start(reply) => {
                controller.start();
                let _ = reply.send(());
            }
            Request::Submit(intent, reply) => {
                let _ = reply.send(controller.submit(intent));
            }
            Request::Execute(command, reply) => {
                let _ = reply.send(controller.execute(command));
            }
            Request::Undo(reply) => {
                let _ = reply.send(controller.undo());
            }
            Request::Redo(reply) => {
                let _ = reply.send(controller.redo());
            }
            Request::Select(territory, reply) => {
                let _ = reply.send(controller.select_territory(territory));
            }
            Request::CancelSelection(reply) => {
                let _ = reply.send(controller.cancel_selection());
            }
            Request::BotDecision {
                player,
                revision,
                intent,
                reply,
            } => {
                let result = check_revision(&controller, player, revision).and_then(|()| {
                    match controller.submit_bot_decision(player, intent) {
                        Err(err @ InvalidCommand::NotBotTurn { .. }) => Err(err.into()),
                        Err(err) => {
                            warn!(player = %player, error = %err, "illegal bot decision; forfeiting turn");
                            controller.forfeit_bot_turn(player)?;
                            Err(err.into())
                        }
                        Ok(()) => Ok(()),
                    }
                });
                let _ = reply.send(result);
            }
            Request::ForfeitBotTurn {
                player,
                revision,
                reply,
            } => {
                let result = check_revision(&controller, player, revision)
                    .and_then(|()| controller.forfeit_bot_turn(player).map_err(Into::into));
                let _ = reply.send(result);
            }
            Request::Export(reply) => {
                let _ = reply.send(controller.export_recording());
            }
            Request::Import(bytes, reply) => {
                let _ = reply.send(controller.import_recording(&bytes));
            }
        }
    }
    info!(revision = controller.revision(), "controller stopped");
    controller
}

fn check_revision(
    controller: &GameController,
    player: PlayerId,
    computed: u64,
) -> Result<(), ControllerError> {
    let current = controller.revision();
    if computed != current {
        warn!(player = %player, computed, current, "stale bot decision rejected");
        return Err(ControllerError::StaleDecision { computed, current });
    }
    Ok(())
}

/// Cloneable access to a spawned controller.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Request>,
    state: watch::Receiver<StateUpdate>,
    ui: watch::Receiver<UiState>,
    events: EventBus,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Latest published state.
    pub fn state(&self) -> StateUpdate {
        self.state.borrow().clone()
    }

    pub fn ui_state(&self) -> UiState {
        self.ui.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<StateUpdate> {
        self.state.clone()
    }

    pub fn watch_ui(&self) -> watch::Receiver<UiState> {
        self.ui.clone()
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    pub async fn start(&self) -> Result<(), ControllerError> {
        self.request(Request::Start).await
    }

    pub async fn submit(&self, intent: Intent) -> Result<(), ControllerError> {
        Ok(self.request(|reply| Request::Submit(intent, reply)).await??)
    }

    pub async fn execute(&self, command: GameCommand) -> Result<(), ControllerError> {
        Ok(self.request(|reply| Request::Execute(command, reply)).await??)
    }

    pub async fn undo(&self) -> Result<(), ControllerError> {
        Ok(self.request(Request::Undo).await??)
    }

    pub async fn redo(&self) -> Result<(), ControllerError> {
        Ok(self.request(Request::Redo).await??)
    }

    pub async fn select_territory(&self, territory: TerritoryId) -> Result<(), ControllerError> {
        Ok(self
            .request(|reply| Request::Select(territory, reply))
            .await??)
    }

    pub async fn cancel_selection(&self) -> Result<(), ControllerError> {
        Ok(self.request(Request::CancelSelection).await??)
    }

    /// Submit a bot move computed against state `revision`.
    ///
    /// Rejected with [`ControllerError::StaleDecision`] if the state has moved on. An illegal
    /// move forfeits the turn and is reported as [`ControllerError::Invalid`].
    pub async fn submit_bot_decision(
        &self,
        player: PlayerId,
        revision: u64,
        intent: Intent,
    ) -> Result<(), ControllerError> {
        self.request(|reply| Request::BotDecision {
            player,
            revision,
            intent,
            reply,
        })
        .await?
    }

    /// Forfeit `player`'s turn if the state is still at `revision`.
    pub async fn forfeit_bot_turn(
        &self,
        player: PlayerId,
        revision: u64,
    ) -> Result<(), ControllerError> {
        self.request(|reply| Request::ForfeitBotTurn {
            player,
            revision,
            reply,
        })
        .await?
    }

    pub async fn export_recording(&self) -> Result<Vec<u8>, ControllerError> {
        Ok(self.request(Request::Export).await??)
    }

    pub async fn import_recording(&self, bytes: Vec<u8>) -> Result<(), ControllerError> {
        Ok(self.request(|reply| Request::Import(bytes, reply)).await??)
    }

    /// Encode inside the controller, then hand the bytes to `picker` outside it.
    pub async fn save_recording(
        &self,
        picker: &dyn RecordingFilePicker,
    ) -> Result<(), ControllerError> {
        let bytes = self.export_recording().await?;
        if !picker.save_recording(bytes).await {
            return Err(ControllerError::RecordingIoFailure(
                "picker did not save the recording".into(),
            ));
        }
        Ok(())
    }

    /// Ask `picker` for bytes and load them. The match is untouched on any failure.
    pub async fn load_recording(
        &self,
        picker: &dyn RecordingFilePicker,
    ) -> Result<(), ControllerError> {
        let bytes = picker.load_recording().await.ok_or_else(|| {
            ControllerError::RecordingIoFailure("picker returned no recording".into())
        })?;
        self.import_recording(bytes).await
    }
}
