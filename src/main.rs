/*
 * Thin command-line front end for the classification pipeline. This layer
 * owns the interactive concerns the core deliberately excludes: argument
 * parsing, persisted defaults, logging setup, progress printing, and the
 * single summary (or single error) shown at the end of a run.
 */
mod core;
mod logging;

use crate::core::{
    AppSettings, ClassificationPipeline, CoreCsvReportFactory, CoreEpubReader, CoreFileCatalog,
    CoreSettingsManager, CoreTikTokenCounter, ProgressObserverOperations, RunOutcome, RunRequest,
    SettingsManagerOperations,
};
use clap::Parser;
use logging::LogDestination;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const APP_NAME: &str = "EpubSieve";

#[derive(Parser, Debug)]
#[command(
    name = "epub-sieve",
    version,
    about = "Counts language-model tokens in EPUB files and moves small ones to a destination folder."
)]
struct Cli {
    /// Folder scanned (non-recursively) for .epub files.
    /// Defaults to the last-used folder.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Folder receiving qualifying files and the CSV report.
    /// Defaults to the last-used folder.
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Token threshold; files counting strictly below it are moved.
    /// Thousands separators are allowed (e.g. "1,000").
    #[arg(long = "max-tokens")]
    max_tokens: Option<String>,

    /// Echo log output to the terminal as well as the log file.
    #[arg(long)]
    verbose: bool,
}

/* Prints one progress line per processed file. */
struct ConsoleProgress;

impl ProgressObserverOperations for ConsoleProgress {
    fn on_file_processed(&self, current: usize, total: usize) {
        println!("Processed {current}/{total}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(if cli.verbose {
        LogDestination::Both
    } else {
        LogDestination::File
    });

    let settings_manager = CoreSettingsManager::new();
    let mut settings = match settings_manager.load_settings(APP_NAME) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Could not load settings, starting from defaults: {e}");
            AppSettings::default()
        }
    };

    if let Some(source) = &cli.source {
        settings.source_folder = source.to_string_lossy().into_owned();
    }
    if let Some(destination) = &cli.destination {
        settings.destination_folder = destination.to_string_lossy().into_owned();
    }
    if let Some(max_tokens) = &cli.max_tokens {
        settings.token_threshold = max_tokens.clone();
    }

    // Inputs are remembered before validation, so the next run sees them
    // even if this one aborts.
    if let Err(e) = settings_manager.save_settings(APP_NAME, &settings) {
        log::warn!("Could not save settings: {e}");
    }

    let request = RunRequest {
        source_dir: PathBuf::from(&settings.source_folder),
        destination_dir: PathBuf::from(&settings.destination_folder),
        token_threshold: settings.token_threshold.clone(),
    };

    let mut pipeline = ClassificationPipeline::new(
        Arc::new(CoreEpubReader::new()),
        Arc::new(CoreTikTokenCounter::new()),
        Arc::new(CoreFileCatalog::new()),
        Arc::new(CoreCsvReportFactory::new()),
    );

    match pipeline.execute(&request, &ConsoleProgress) {
        Ok(RunOutcome::NothingToDo) => {
            println!("No EPUB files found in {}", request.source_dir.display());
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Completed {
            processed,
            report_path,
        }) => {
            println!("Processing completed!");
            println!("Processed: {processed} files");
            println!("CSV saved to {}", report_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Run aborted: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
