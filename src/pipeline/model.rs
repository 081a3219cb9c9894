use anyhow::{Context, Result};
use ort::execution_providers;
use ort::session::builder::GraphOptimizationLevel;
pub use ort::session::Session;
use std::path::Path;
use tracing::debug;

/// Registers the execution providers shared by every session. Falls back to
/// the default CPU provider when XNNPACK is unavailable.
pub fn initialize_runtime() -> Result<()> {
    ort::init()
        .with_name("eymo-nose")
        .with_execution_providers([execution_providers::XNNPACKExecutionProvider::default().build()])
        .commit()?;

    Ok(())
}

pub fn initialize_model(models_dir: &Path, filename: &str, threads: usize) -> Result<Session> {
    let path = models_dir.join(filename);
    debug!("Loading model {path:?} with {threads} threads");

    let model = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(threads.max(1))?
        .commit_from_file(&path)
        .with_context(|| format!("failed to load model {}", path.display()))?;

    Ok(model)
}
