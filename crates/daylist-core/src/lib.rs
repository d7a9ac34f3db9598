//! Core of a day-scoped to-do list: a persisted task table, a day-range
//! query, and an async view-model that publishes the selected day's tasks
//! to whatever presentation layer embeds it.

pub mod config;
pub mod datetime;
pub mod observe;
pub mod store;
pub mod task;
pub mod viewmodel;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::store::TaskStore;
use crate::viewmodel::TaskViewModel;

/// Wires configuration, store, and view-model together. The store is built
/// here and injected; nothing in the crate reaches for a global instance.
#[tracing::instrument(skip(data_dir_override))]
pub fn open(data_dir_override: Option<&Path>) -> anyhow::Result<TaskViewModel> {
    let cfg = config::Config::load(None)?;
    let data_dir = config::resolve_data_dir(&cfg, data_dir_override)
        .context("failed to resolve data directory")?;

    let store = TaskStore::open(&data_dir)
        .with_context(|| format!("failed to open task store at {}", data_dir.display()))?;

    info!(data_dir = %data_dir.display(), "daylist core ready");
    Ok(TaskViewModel::new(Arc::new(store)))
}

/// Optional tracing setup for embedding applications. `RUST_LOG` wins over
/// `default_filter`.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        tracing::debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
