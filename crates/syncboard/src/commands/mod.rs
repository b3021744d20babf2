//! Command dispatch: bridges CLI args -> workspace operations -> output.

pub mod config_cmd;
pub mod records;

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use syncboard_core::{
    AdditionalTask, ChannelSink, CoreError, Deviation, EntityId, Notification, Project,
    SyncConfig, Workspace,
};

use crate::cli::{ColorMode, Command, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::data::LocalStore;
use crate::error::CliError;
use crate::output;

/// Everything a record command needs: the loaded workspace, the file it
/// persists to, and the resolved output settings.
pub struct Context {
    pub workspace: Workspace,
    pub format: OutputFormat,
    pub quiet: bool,
    color: ColorMode,
    store: LocalStore,
    notifications: UnboundedReceiver<Notification>,
}

impl Context {
    /// Open the data file and load every kind.
    pub async fn open(
        global: &GlobalOpts,
        cfg: &Config,
        config_file: &std::path::Path,
    ) -> Result<Self, CliError> {
        let store = LocalStore::open(&config::data_path(global, cfg, config_file))?;
        debug!(path = %store.path().display(), "data file opened");

        let (sink, notifications) = ChannelSink::new();
        // One-shot process: load once, never poll.
        let sync = SyncConfig {
            refresh_interval_secs: 0,
            load_on_start: true,
        };
        let workspace = Workspace::new(sync, store.remotes(), Arc::new(sink));
        workspace.start().await?;

        Ok(Self {
            workspace,
            format: config::output_format(global, cfg),
            quiet: global.quiet,
            color: config::color_mode(global, cfg),
            store,
            notifications,
        })
    }

    /// Write the stores back after a mutation, whatever its outcome; a
    /// failed mutation leaves them unchanged.
    pub async fn persist<T>(&self, result: Result<T, CoreError>) -> Result<T, CliError> {
        self.store.save().await?;
        Ok(result?)
    }

    /// Print and discard pending notifications.
    pub fn report(&mut self) {
        let mut pending = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            pending.push(n);
        }
        output::print_notifications(&pending, self.quiet, output::should_color(self.color));
    }

    pub async fn close(mut self) {
        self.report();
        self.workspace.shutdown().await;
    }
}

/// Dispatch a data-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Projects(args) => records::handle::<Project>(ctx, args.command).await,
        Command::Deviations(args) => records::handle::<Deviation>(ctx, args.command).await,
        Command::Tasks(args) => records::handle::<AdditionalTask>(ctx, args.command).await,
        Command::Convert { deviation } => convert(ctx, &EntityId::from(deviation)).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

async fn convert(ctx: &Context, deviation: &EntityId) -> Result<(), CliError> {
    let task = ctx
        .persist(ctx.workspace.convert_deviation_to_task(deviation).await)
        .await?;
    records::show::<AdditionalTask>(ctx, &task);
    Ok(())
}
