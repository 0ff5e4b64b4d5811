//! Arena actor: an isolated Tokio task that owns one arena.
//!
//! The task exclusively owns the [`Arena`], its [`TickScheduler`] and a
//! bounded command channel. Its loop selects over three sources:
//!
//! - commands from [`ArenaHandle`]s, each answered on a oneshot reply
//!   channel
//! - the next tick of the arena's clock
//! - completion of the in-flight world snapshot
//!
//! Nothing else can touch the arena, so tick processing, commands and
//! snapshot completions never interleave. On shutdown the actor waits for
//! the in-flight snapshot before it exits, so a world is never worked on by
//! a stopped arena and its replacement at once.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use skyarena_tick::ClockConfig;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::arena::{Arena, ArenaInfo};
use crate::config::ArenaConfig;
use crate::error::{ArenaError, Rejection};
use crate::roster::PlayerRecord;
use crate::scheduler::TickScheduler;
use crate::types::{PlayerId, SpawnPoint};

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to an arena actor through its channel.
pub(crate) enum ArenaCommand {
    Join {
        player: PlayerId,
        reply: Reply<Result<SpawnPoint, Rejection>>,
    },
    Leave {
        player: PlayerId,
        forced: bool,
        reply: Reply<Result<PlayerRecord, Rejection>>,
    },
    PlayerDied {
        victim: PlayerId,
        killer: Option<PlayerId>,
        reply: Reply<Result<(), Rejection>>,
    },
    Start {
        reply: Reply<Result<(), Rejection>>,
    },
    Stop {
        reply: Reply<()>,
    },
    Reset {
        reply: Reply<()>,
    },
    SetEnabled {
        enabled: bool,
        reply: Reply<()>,
    },
    BeginEdit {
        reply: Reply<Result<(), Rejection>>,
    },
    FinishEdit {
        reply: Reply<Result<(), Rejection>>,
    },
    Reload {
        config: Box<ArenaConfig>,
        reply: Reply<Result<(), ArenaError>>,
    },
    GetInfo {
        reply: Reply<ArenaInfo>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Handle to a running arena actor.
///
/// Cheap to clone. When the last handle is dropped the arena shuts itself
/// down.
#[derive(Clone)]
pub struct ArenaHandle {
    name: String,
    sender: mpsc::Sender<ArenaCommand>,
}

impl ArenaHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `false` once the actor has stopped.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    pub async fn join(&self, player: PlayerId) -> Result<SpawnPoint, ArenaError> {
        Ok(self.request(|reply| ArenaCommand::Join { player, reply }).await??)
    }

    pub async fn leave(&self, player: PlayerId, forced: bool) -> Result<PlayerRecord, ArenaError> {
        Ok(self
            .request(|reply| ArenaCommand::Leave {
                player,
                forced,
                reply,
            })
            .await??)
    }

    pub async fn player_died(
        &self,
        victim: PlayerId,
        killer: Option<PlayerId>,
    ) -> Result<(), ArenaError> {
        Ok(self
            .request(|reply| ArenaCommand::PlayerDied {
                victim,
                killer,
                reply,
            })
            .await??)
    }

    pub async fn start_game(&self) -> Result<(), ArenaError> {
        Ok(self.request(|reply| ArenaCommand::Start { reply }).await??)
    }

    pub async fn stop_game(&self) -> Result<(), ArenaError> {
        self.request(|reply| ArenaCommand::Stop { reply }).await
    }

    pub async fn reset(&self) -> Result<(), ArenaError> {
        self.request(|reply| ArenaCommand::Reset { reply }).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<(), ArenaError> {
        self.request(|reply| ArenaCommand::SetEnabled { enabled, reply })
            .await
    }

    /// Enter setup mode. The arena stops ticking until the edit finishes.
    pub async fn begin_edit(&self) -> Result<(), ArenaError> {
        Ok(self.request(|reply| ArenaCommand::BeginEdit { reply }).await??)
    }

    pub async fn finish_edit(&self) -> Result<(), ArenaError> {
        Ok(self.request(|reply| ArenaCommand::FinishEdit { reply }).await??)
    }

    pub async fn reload(&self, config: ArenaConfig) -> Result<(), ArenaError> {
        let config = Box::new(config);
        self.request(|reply| ArenaCommand::Reload { config, reply })
            .await?
    }

    pub async fn info(&self) -> Result<ArenaInfo, ArenaError> {
        self.request(|reply| ArenaCommand::GetInfo { reply }).await
    }

    /// Force-shutdown the arena and wait until it has happened, including
    /// any world snapshot the shutdown left running.
    pub async fn shutdown(&self) -> Result<(), ArenaError> {
        self.request(|reply| ArenaCommand::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> ArenaCommand,
    ) -> Result<T, ArenaError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> ArenaError {
        ArenaError::Unavailable(self.name.clone())
    }
}

enum Flow {
    Continue,
    /// Leave the loop. The reply, if any, is sent once the world is settled.
    Stop(Option<Reply<()>>),
}

struct ArenaActor {
    arena: Arena,
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<ArenaCommand>,
}

impl ArenaActor {
    async fn run(mut self) {
        info!(arena = %self.arena.name(), "arena actor started");

        let shutdown_reply = loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        info!(arena = %self.arena.name(), "all handles dropped");
                        self.arena.force_shutdown();
                        break None;
                    };
                    if let Flow::Stop(reply) = self.handle(cmd) {
                        break reply;
                    }
                }
                tick = self.scheduler.next_tick() => {
                    self.tick(tick.dt);
                }
                outcome = self.arena.snapshot_completed() => {
                    self.arena.on_snapshot_complete(outcome);
                }
            }
        };

        // The world directory must be quiet before anyone may load it again.
        self.receiver.close();
        if self.arena.is_busy() {
            debug!(arena = %self.arena.name(), "waiting for world snapshot");
        }
        self.arena.settle_snapshot().await;
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }

        info!(arena = %self.arena.name(), "arena actor stopped");
    }

    fn handle(&mut self, cmd: ArenaCommand) -> Flow {
        let arena = &mut self.arena;
        match cmd {
            ArenaCommand::Join { player, reply } => {
                let _ = reply.send(arena.join(player));
            }
            ArenaCommand::Leave {
                player,
                forced,
                reply,
            } => {
                let _ = reply.send(arena.leave(player, forced));
            }
            ArenaCommand::PlayerDied {
                victim,
                killer,
                reply,
            } => {
                let _ = reply.send(arena.player_died(victim, killer));
            }
            ArenaCommand::Start { reply } => {
                let _ = reply.send(arena.start_game());
            }
            ArenaCommand::Stop { reply } => {
                arena.stop_game();
                let _ = reply.send(());
            }
            ArenaCommand::Reset { reply } => {
                arena.reset_arena();
                let _ = reply.send(());
            }
            ArenaCommand::SetEnabled { enabled, reply } => {
                arena.set_enabled(enabled);
                let _ = reply.send(());
            }
            ArenaCommand::BeginEdit { reply } => {
                let result = arena.begin_edit();
                if result.is_ok() {
                    self.scheduler.pause();
                }
                let _ = reply.send(result);
            }
            ArenaCommand::FinishEdit { reply } => {
                let result = arena.finish_edit();
                if result.is_ok() {
                    self.scheduler.resume();
                }
                let _ = reply.send(result);
            }
            ArenaCommand::Reload { config, reply } => {
                let _ = reply.send(arena.reload(*config));
            }
            ArenaCommand::GetInfo { reply } => {
                let _ = reply.send(arena.info());
            }
            ArenaCommand::Shutdown { reply } => {
                info!(arena = %arena.name(), "arena shutting down");
                arena.force_shutdown();
                return Flow::Stop(Some(reply));
            }
        }
        Flow::Continue
    }

    fn tick(&mut self, dt: Duration) {
        let Self {
            arena, scheduler, ..
        } = self;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| scheduler.run_tick(arena, dt)));
        if outcome.is_err() {
            error!(arena = %arena.name(), "arena tick panicked, continuing");
            arena.log("[Tick]: tick aborted by a panic");
        }
        scheduler.finish_tick();
    }
}

/// Spawns an arena actor on the current runtime and returns its handle.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub fn spawn_arena(
    arena: Arena,
    clock: ClockConfig,
    channel_size: usize,
) -> (ArenaHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(channel_size.max(1));
    let handle = ArenaHandle {
        name: arena.name().to_string(),
        sender: tx,
    };
    let actor = ArenaActor {
        arena,
        scheduler: TickScheduler::new(clock),
        receiver: rx,
    };
    let task = tokio::spawn(actor.run());
    (handle, task)
}
