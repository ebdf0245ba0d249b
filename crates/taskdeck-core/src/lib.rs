pub mod app;
pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod render;
pub mod store;
pub mod task;
pub mod theme;
pub mod ui;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

pub use app::{App, DeleteOutcome};
pub use backend::{BackendConfig, HttpBackend, TaskBackend};
pub use error::ClientError;
pub use filter::{FilterCriteria, Selection, SortKey, Tab, derive_display};
pub use store::TaskStore;
pub use task::{Priority, Task, TaskDraft, TaskId};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskdeck"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );
    if let Some(api) = cli.api {
        cfg.set("api.url", api);
    }

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    let theme = theme::ThemeFile::open(&data_dir)?;

    let backend_cfg = cfg.backend_config()?;
    let base_url = backend_cfg.base_url.clone();
    let backend = HttpBackend::new(backend_cfg)
        .with_context(|| format!("failed to set up backend client for {base_url}"))?;

    let renderer = render::Renderer::new(&cfg)?;
    let mut app = App::new(backend);
    let mut confirm = ui::PromptConfirm::stdio();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let mut session = commands::Session {
        cfg: &cfg,
        renderer: &renderer,
        theme: &theme,
        confirm: &mut confirm,
        out: io::stdout().lock(),
    };
    runtime.block_on(commands::dispatch(&mut app, &mut session, cli.command))?;

    info!("done");
    Ok(())
}
