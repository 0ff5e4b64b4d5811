//! `ArenaServer` builder: loads every arena definition on disk and runs
//! them in an [`ArenaManager`].

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use skyarena_arena::{
    Arena, ArenaConfig, ArenaDisplay, ArenaEnv, ArenaHandle, ArenaHost, ArenaManager,
    ArenaServices, GameRules,
};
use skyarena_snapshot::{Archiver, ZipArchiver};
use skyarena_tick::ClockConfig;
use tokio::runtime::Handle;

use crate::SkyArenaError;

/// Builds the game rules for one arena from its definition.
pub type RulesFactory = Arc<dyn Fn(&ArenaConfig) -> Box<dyn GameRules> + Send + Sync>;

/// Builder for configuring and starting a Skyarena server.
///
/// # Example
///
/// ```rust,ignore
/// use skyarena::prelude::*;
///
/// let server = ArenaServer::builder()
///     .data_folder("plugins/SkyArena")
///     .server_data_path(".")
///     .build(host, display, |_config| Box::new(MyRules::default()))
///     .await?;
/// server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await;
/// ```
pub struct ArenaServerBuilder {
    data_folder: PathBuf,
    server_data_path: PathBuf,
    utc_offset_minutes: i32,
    clock: ClockConfig,
    archiver: Arc<dyn Archiver>,
    skip_invalid: bool,
}

impl ArenaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            data_folder: PathBuf::from("skyarena"),
            server_data_path: PathBuf::from("."),
            utc_offset_minutes: 0,
            clock: ClockConfig::default(),
            archiver: Arc::new(ZipArchiver::default()),
            skip_invalid: true,
        }
    }

    /// Where arena definitions, world archives and logs live.
    pub fn data_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_folder = path.into();
        self
    }

    /// The game server's own directory; worlds are under `worlds/`.
    pub fn server_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_data_path = path.into();
        self
    }

    /// Offset applied to debugger log timestamps.
    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Tick cadence shared by every arena.
    pub fn clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    pub fn archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// When `true` (the default) a broken arena file is logged and skipped;
    /// otherwise it aborts the build.
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    /// Reads every `*.json` in `{data_folder}/arenas/` and starts an arena
    /// actor for each. Must be called from inside a Tokio runtime.
    pub async fn build<F>(
        self,
        host: Arc<dyn ArenaHost>,
        display: Arc<dyn ArenaDisplay>,
        rules: F,
    ) -> Result<ArenaServer, SkyArenaError>
    where
        F: Fn(&ArenaConfig) -> Box<dyn GameRules> + Send + Sync + 'static,
    {
        let env = ArenaEnv::new(self.data_folder.clone(), self.server_data_path.clone())
            .with_utc_offset(self.utc_offset_minutes);
        let arenas_dir = env.arenas_dir();
        fs::create_dir_all(&arenas_dir).map_err(|source| SkyArenaError::Io {
            path: arenas_dir.clone(),
            source,
        })?;

        let mut server = ArenaServer {
            manager: ArenaManager::new(self.clock),
            env,
            host,
            display,
            archiver: self.archiver,
            rules: Arc::new(rules),
        };

        for path in arena_files(&arenas_dir)? {
            let loaded = read_arena_file(&path).and_then(|config| server.load_arena(config));
            match loaded {
                Ok(handle) => {
                    tracing::info!(arena = %handle.name(), file = %path.display(), "arena loaded");
                }
                Err(e) if self.skip_invalid => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping arena");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(arenas = server.manager.arena_count(), "Skyarena server ready");
        Ok(server)
    }
}

impl Default for ArenaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running set of arenas.
pub struct ArenaServer {
    manager: ArenaManager,
    env: ArenaEnv,
    host: Arc<dyn ArenaHost>,
    display: Arc<dyn ArenaDisplay>,
    archiver: Arc<dyn Archiver>,
    rules: RulesFactory,
}

impl ArenaServer {
    /// Creates a new builder.
    pub fn builder() -> ArenaServerBuilder {
        ArenaServerBuilder::new()
    }

    /// Build an arena from `config` with the server's collaborators and
    /// hand it to the manager.
    pub fn load_arena(&mut self, config: ArenaConfig) -> Result<ArenaHandle, SkyArenaError> {
        let services = ArenaServices {
            rules: (self.rules)(&config),
            host: Arc::clone(&self.host),
            display: Arc::clone(&self.display),
            archiver: Arc::clone(&self.archiver),
            runtime: Handle::current(),
        };
        let arena = Arena::new(config, self.env.clone(), services)?;
        Ok(self.manager.load(arena)?)
    }

    /// Re-read one arena's file and apply it to the running arena, or load
    /// it if it is not running yet.
    pub async fn reload_arena(&mut self, name: &str) -> Result<(), SkyArenaError> {
        let path = self.env.arenas_dir().join(format!("{name}.json"));
        let config = read_arena_file(&path)?;
        match self.manager.handle(&config.arena_name) {
            Ok(handle) => handle.reload(config).await?,
            Err(_) => {
                self.load_arena(config)?;
            }
        }
        Ok(())
    }

    pub fn manager(&self) -> &ArenaManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ArenaManager {
        &mut self.manager
    }

    pub fn env(&self) -> &ArenaEnv {
        &self.env
    }

    /// Runs until `signal` resolves, then shuts every arena down.
    pub async fn run_until(mut self, signal: impl Future<Output = ()>) {
        tracing::info!("Skyarena server running");
        signal.await;
        self.shutdown().await;
    }

    /// Force-shutdown every arena.
    pub async fn shutdown(&mut self) {
        tracing::info!(arenas = self.manager.arena_count(), "shutting down arenas");
        self.manager.shutdown_all().await;
    }
}

/// The `*.json` files in `dir`, sorted by name.
fn arena_files(dir: &Path) -> Result<Vec<PathBuf>, SkyArenaError> {
    let io_err = |source: std::io::Error| SkyArenaError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_arena_file(path: &Path) -> Result<ArenaConfig, SkyArenaError> {
    let json = fs::read_to_string(path).map_err(|source| SkyArenaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ArenaConfig::from_json(&json).map_err(|source| SkyArenaError::InvalidArenaFile {
        path: path.to_path_buf(),
        source,
    })
}
