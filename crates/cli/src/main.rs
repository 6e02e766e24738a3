use anyhow::{bail, Context, Result};
use clap::Parser;
use repoatlas_cache::staleness::compute_staleness;
use repoatlas_cache::store::{load_cache, save_cache, snapshot_repos};
use repoatlas_cli::{discovery, passes, NAME, VERSION};
use repoatlas_core::config::AtlasConfig;
use repoatlas_core::logging::ScopedLogger;
use repoatlas_core::model::WorkspaceModel;
use repoatlas_pipeline::{model_handle, ParallelRunner, SequentialRunner};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "repoatlas",
    version,
    about = "Map a multi-repository workspace into context artifacts for AI coding assistants"
)]
struct CliArgs {
    /// Workspace root to analyze (defaults to the current directory)
    path: Option<PathBuf>,

    /// Run passes strictly one after another instead of level-parallel
    #[arg(long)]
    sequential: bool,

    /// Re-scan every repository even when fingerprints are unchanged
    #[arg(long)]
    force: bool,

    /// Only run the named passes (applied to the resolved schedule)
    #[arg(long = "only", value_name = "PASS")]
    only: Vec<String>,

    /// Where to write the workspace map (defaults to <root>/.repoatlas/workspace-map.json)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(&args);

    debug!("{} v{} starting", NAME, VERSION);

    let exit_code = match map_workspace(&args).await {
        Ok(()) => 0,
        Err(err) => {
            error!("{err:#}");
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("REPOATLAS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let mut filter = EnvFilter::from_default_env();
    if env::var("RUST_LOG").is_err() {
        filter = filter.add_directive(format!("repoatlas={level}").parse().unwrap());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{level_str}', defaulting to INFO. Valid levels: trace, debug, info, warn, error"
            );
            Level::INFO
        }
    }
}

/// Operator-supplied answers survive across runs in a plain JSON map next to
/// the emitted artifact; a bad file is ignored, not fatal.
fn load_answers(root: &Path) -> BTreeMap<String, String> {
    let path = root.join(".repoatlas/answers.json");
    let Ok(bytes) = fs::read(&path) else {
        return BTreeMap::new();
    };
    match serde_json::from_slice(&bytes) {
        Ok(answers) => {
            debug!("loaded operator answers from {}", path.display());
            answers
        }
        Err(err) => {
            warn!("ignoring malformed answers file {}: {err}", path.display());
            BTreeMap::new()
        }
    }
}

async fn map_workspace(args: &CliArgs) -> Result<()> {
    let config = AtlasConfig::default();
    config.validate()?;

    let root = match &args.path {
        Some(path) => path.clone(),
        None => env::current_dir().context("failed to resolve current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("workspace root `{}` not accessible", root.display()))?;
    let workspace_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workspace".to_string());

    info!(root = %root.display(), "analyzing workspace");

    let repos = discovery::discover_repos(&root, &config);
    if repos.is_empty() {
        bail!(
            "no repositories found under `{}` (looked {} levels deep)",
            root.display(),
            config.discovery_depth
        );
    }
    info!("{} repositories discovered", repos.len());

    let cache_file = config.cache_path(&workspace_name);
    let cache = load_cache(&cache_file);

    if !args.force {
        let report = compute_staleness(&repos, cache.as_ref());
        if report.is_fully_fresh() {
            info!(
                "all {} repositories unchanged since last scan, nothing to do (use --force to re-scan)",
                repos.len()
            );
            return Ok(());
        }
        for stale in report.stale() {
            debug!(repo = %stale.name, "re-scan needed: {:?}", stale.freshness);
        }
    }

    let mut model = WorkspaceModel::new(VERSION);
    model.repos = repos;
    model.answers = load_answers(&root);
    let model = model_handle(model);

    let registry = passes::builtin_registry(&config)?;
    debug!("schedule:\n{}", registry.execution_plan());

    let logger = ScopedLogger::new("pipeline");
    let filter = (!args.only.is_empty()).then_some(args.only.as_slice());
    if args.sequential {
        SequentialRunner
            .run(&registry, &model, &logger, filter)
            .await?;
    } else {
        ParallelRunner
            .run(&registry, &model, &logger, filter)
            .await?;
    }

    let model = model.lock().await.clone();

    let snapshot = snapshot_repos(model.repos.iter());
    save_cache(&cache_file, &snapshot)
        .with_context(|| format!("failed to write cache snapshot `{}`", cache_file.display()))?;
    debug!(
        "cache snapshot saved with {} entries to {}",
        snapshot.repos.len(),
        cache_file.display()
    );

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| root.join(".repoatlas/workspace-map.json"));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, serde_json::to_vec_pretty(&model)?)
        .with_context(|| format!("failed to write workspace map `{}`", output.display()))?;

    info!(
        "workspace map written to {} ({} repos, {} env vars, {} relationships, {} conventions)",
        output.display(),
        model.repos.len(),
        model.env_vars.len(),
        model.relationships.len(),
        model.conventions.len()
    );
    Ok(())
}
