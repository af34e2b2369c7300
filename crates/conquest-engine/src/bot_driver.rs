//! Plays one bot seat against a spawned controller.

use std::sync::Arc;
use std::time::Duration;

use conquest_core::BotDecisionSupplier;
use conquest_protocol::PlayerId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::publish::StateUpdate;
use crate::{ControllerError, ControllerHandle};

/// Watches the state slot and moves for `player` whenever it is that bot's turn.
///
/// Decisions run on the blocking pool. A decision is abandoned if the state changes before it
/// finishes, and the turn is forfeited if it takes longer than the timeout or is illegal.
pub struct BotDriver {
    handle: ControllerHandle,
    player: PlayerId,
    bot: Arc<dyn BotDecisionSupplier>,
    timeout: Duration,
}

enum Flow {
    Continue,
    Stop,
}

impl BotDriver {
    pub fn new(
        handle: ControllerHandle,
        player: PlayerId,
        bot: Arc<dyn BotDecisionSupplier>,
        timeout: Duration,
    ) -> Self {
        Self {
            handle,
            player,
            bot,
            timeout,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Play until the match ends or the controller goes away.
    pub async fn run(self) {
        let mut updates = self.handle.watch_state();
        let mut handled: Option<u64> = None;

        loop {
            let update = updates.borrow_and_update().clone();
            if update.state.is_over() {
                debug!(player = %self.player, "match over; bot driver stopping");
                return;
            }

            let our_move = update.state.current_player() == self.player
                && update.state.current_is_bot()
                && handled != Some(update.revision);
            if our_move {
                handled = Some(update.revision);
                if let Flow::Stop = self.take_turn(&mut updates, update).await {
                    return;
                }
            } else if updates.changed().await.is_err() {
                return;
            }
        }
    }

    async fn take_turn(
        &self,
        updates: &mut watch::Receiver<StateUpdate>,
        update: StateUpdate,
    ) -> Flow {
        let bot = Arc::clone(&self.bot);
        let state = Arc::clone(&update.state);
        let decision = tokio::task::spawn_blocking(move || bot.decide(&state));

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Flow::Stop;
                }
                debug!(player = %self.player, revision = update.revision, "state moved on; decision abandoned");
                Flow::Continue
            }
            result = tokio::time::timeout(self.timeout, decision) => {
                let intent = match result {
                    Ok(Ok(intent)) => intent,
                    Ok(Err(err)) => {
                        warn!(player = %self.player, error = %err, "bot decision task failed");
                        return self.forfeit(update.revision).await;
                    }
                    Err(_) => {
                        warn!(player = %self.player, timeout = ?self.timeout, "bot decision timed out");
                        return self.forfeit(update.revision).await;
                    }
                };
                match self.handle.submit_bot_decision(self.player, update.revision, intent).await {
                    Ok(()) => Flow::Continue,
                    Err(ControllerError::Closed) => Flow::Stop,
                    Err(err) => {
                        debug!(player = %self.player, error = %err, "bot decision not applied");
                        Flow::Continue
                    }
                }
            }
        }
    }

    async fn forfeit(&self, revision: u64) -> Flow {
        match self.handle.forfeit_bot_turn(self.player, revision).await {
            Ok(()) => Flow::Continue,
            Err(ControllerError::Closed) => Flow::Stop,
            Err(err) => {
                debug!(player = %self.player, error = %err, "forfeit not applied");
                Flow::Continue
            }
        }
    }
}
