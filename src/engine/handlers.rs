//! Driver: validate flags, wire the pipeline, drain errors, print the
//! summary.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use crate::engine::arg_parser::{split_csv, Cli};
use crate::errors::PipelineError;
use crate::pipeline::{
    run_pipeline, shutdown_pipeline, ApiShipper, CancelToken, DedupEngine, FileWalker, HashStage,
};
use crate::types::{AuthMethod, Credentials, DedupMode};
use crate::utils::config::{ChannelCaps, SHUTDOWN_DEADLINE};
use crate::utils::setup_logging;

/// Resolve `--auth-method` / `--token` into typed credentials. Basic auth
/// expects `user:pass`; anything else is a bootstrap failure, not a
/// per-batch one.
pub fn build_credentials(method: AuthMethod, token: &str) -> Result<Credentials> {
    match method {
        AuthMethod::Bearer => Ok(Credentials::Bearer(token.to_string())),
        AuthMethod::ApiKey => Ok(Credentials::ApiKey(token.to_string())),
        AuthMethod::Basic => match token.split_once(':') {
            Some((username, password)) => Ok(Credentials::Basic {
                username: username.to_string(),
                password: password.to_string(),
            }),
            None => bail!("basic auth requires --token in user:pass form"),
        },
    }
}

/// Cancel the token on SIGINT/SIGTERM, then force-exit if the graceful
/// shutdown overruns the deadline.
#[cfg(unix)]
fn install_signal_handlers(cancel: CancelToken) -> Result<()> {
    use anyhow::Context;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            log::info!("Received signal {}, initiating shutdown...", sig);
            cancel.cancel();
            thread::spawn(|| {
                thread::sleep(SHUTDOWN_DEADLINE);
                log::error!("Graceful shutdown timed out, forcing exit");
                std::process::exit(1);
            });
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers(_cancel: CancelToken) -> Result<()> {
    Ok(())
}

/// Run one full scan per the CLI flags.
///
/// Fatal errors (bad flags, unreachable log file, malformed credentials)
/// return `Err` before any stage starts; walk and delivery errors only show
/// up in the summary counters.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.log_level.into(), cli.log_file.as_deref())?;

    let roots: Vec<PathBuf> = split_csv(&cli.paths).into_iter().map(PathBuf::from).collect();
    if roots.is_empty() {
        bail!("at least one path must be specified");
    }
    let credentials = build_credentials(cli.auth_method, &cli.token)?;

    let cancel = CancelToken::new();
    install_signal_handlers(cancel.clone())?;

    log::info!("Initializing file scanner with {} paths", roots.len());
    let mut walker = FileWalker::new(roots);
    walker.exclude_patterns = split_csv(&cli.exclude);
    walker.max_depth = cli.depth;
    walker.max_file_size = cli.max_size;
    walker.skip_hidden = !cli.include_hidden;
    walker.skip_symlinks = !cli.follow_symlinks;

    log::info!(
        "Initializing hash stage with algorithm {} and {} workers",
        cli.algorithm,
        cli.workers
    );
    let mut hasher = HashStage::new(cli.algorithm, cli.workers);
    hasher.extract_strings = cli.strings;
    hasher.string_min_length = cli.string_min;
    hasher.max_file_size = cli.max_size;

    log::info!("Initializing deduplication engine");
    let deduper = DedupEngine::new(DedupMode::parse(&cli.dedup));

    log::info!("Initializing API shipper with endpoint {}", cli.api);
    let mut shipper = ApiShipper::new(cli.api.clone(), credentials);
    shipper.batch_size = cli.batch.max(1);
    shipper.max_retries = cli.max_retries;
    shipper.user_agent = cli.user_agent.clone();

    log::info!("Starting file scan...");
    let start = Instant::now();

    let handles = run_pipeline(
        &walker,
        &hasher,
        &deduper,
        &shipper,
        ChannelCaps::ERRORS,
        &cancel,
    );

    // Drain stage errors concurrently; the channel closes when the walker
    // and shipper are both done, so this thread always terminates.
    let error_rx = handles.error_rx.clone();
    let error_counter = thread::spawn(move || {
        let mut scan_errors: u64 = 0;
        let mut api_errors: u64 = 0;
        for err in error_rx.iter() {
            match &err {
                PipelineError::Scan(e) => {
                    scan_errors += 1;
                    log::error!("Scan error: {}", e);
                }
                PipelineError::Api(e) => {
                    api_errors += 1;
                    log::error!("API error: {}", e);
                }
            }
        }
        (scan_errors, api_errors)
    });

    shutdown_pipeline(handles)?;
    let (scan_errors, api_errors) = error_counter
        .join()
        .map_err(|_| anyhow::anyhow!("error drain thread panicked"))?;

    let elapsed = start.elapsed();
    let (total_files, unique_files) = deduper.stats();

    log::info!("Scan completed in {:.2?}", elapsed);
    log::info!("Total files processed: {}", total_files);
    log::info!("Unique files found: {}", unique_files);
    log::info!("Duplicate files: {}", total_files - unique_files);
    log::info!("Scan errors: {}", scan_errors);
    log::info!("API errors: {}", api_errors);

    println!("\nScan completed in {:.2?}", elapsed);
    println!("Total files processed: {}", total_files);
    println!("Unique files found: {}", unique_files);
    println!("Duplicate files: {}", total_files - unique_files);

    Ok(())
}
