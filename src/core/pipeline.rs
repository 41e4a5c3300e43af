/*
 * This module orchestrates one classification run: validate inputs, scan the
 * source directory, and for each candidate archive extract text, count
 * tokens, append an audit record, and relocate the file when its count is
 * strictly below the threshold.
 *
 * Only two failures abort a run: invalid inputs (before any side effect) and
 * an unusable report artifact (without it there is no audit trail). Every
 * other failure is recovered at file granularity: the file is logged,
 * marked processed so it is not retried within the run, counted toward
 * progress, and the run continues.
 */
use crate::core::archive_reader::ArchiveReaderOperations;
use crate::core::catalog::FileCatalogOperations;
use crate::core::models::{ClassificationRecord, RunOutcome, RunRequest};
use crate::core::report::{ReportError, ReportSinkFactoryOperations};
use crate::core::tokenizer_utils::TokenCounterOperations;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum PipelineError {
    InvalidThreshold(String),
    ThresholdNotPositive(i64),
    SourceDirMissing(PathBuf),
    DestinationDirMissing(PathBuf),
    Report(ReportError),
}

impl From<ReportError> for PipelineError {
    fn from(err: ReportError) -> Self {
        PipelineError::Report(err)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::InvalidThreshold(input) => {
                write!(f, "Invalid token count: '{input}'")
            }
            PipelineError::ThresholdNotPositive(value) => {
                write!(f, "Token count must be positive (got {value})")
            }
            PipelineError::SourceDirMissing(p) => {
                write!(f, "Source folder does not exist: {p:?}")
            }
            PipelineError::DestinationDirMissing(p) => {
                write!(f, "Destination folder does not exist: {p:?}")
            }
            PipelineError::Report(e) => write!(f, "Report artifact error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Report(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/*
 * Receives one notification per processed file, in processing order. The
 * callback doubles as the cooperative yield point of the otherwise strictly
 * sequential run loop, keeping an external observer responsive without any
 * shared mutable state crossing threads.
 */
pub trait ProgressObserverOperations: Send + Sync {
    fn on_file_processed(&self, current: usize, total: usize);
}

/*
 * Parses the user-supplied threshold string. Thousands separators are
 * stripped before parsing; the result must be a strictly positive integer.
 */
pub fn parse_token_threshold(input: &str) -> Result<usize> {
    let cleaned = input.trim().replace(',', "");
    let value: i64 = cleaned
        .parse()
        .map_err(|_| PipelineError::InvalidThreshold(input.to_string()))?;
    if value <= 0 {
        return Err(PipelineError::ThresholdNotPositive(value));
    }
    Ok(value as usize)
}

/*
 * Moves `source` into `destination_dir`, preserving its base name. An
 * existing file of the same name at the destination is removed first, so
 * the last mover wins. A plain rename: cross-device moves fail and are
 * handled by the caller as a non-fatal relocation failure.
 */
fn relocate_file(source: &Path, destination_dir: &Path) -> io::Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name")
    })?;
    let target = destination_dir.join(file_name);
    if target.exists() {
        fs::remove_file(&target)?;
    }
    fs::rename(source, &target)?;
    Ok(target)
}

/*
 * Drives a full run over one source directory. Collaborators are injected
 * behind their operation traits so the decision logic can be tested with
 * scripted readers and counters. The processed set is owned by the pipeline
 * instance and cleared at the start of every run; nothing persists across
 * runs.
 */
pub struct ClassificationPipeline {
    archive_reader: Arc<dyn ArchiveReaderOperations>,
    token_counter: Arc<dyn TokenCounterOperations>,
    catalog: Arc<dyn FileCatalogOperations>,
    report_factory: Arc<dyn ReportSinkFactoryOperations>,
    processed: HashSet<PathBuf>,
}

impl ClassificationPipeline {
    pub fn new(
        archive_reader: Arc<dyn ArchiveReaderOperations>,
        token_counter: Arc<dyn TokenCounterOperations>,
        catalog: Arc<dyn FileCatalogOperations>,
        report_factory: Arc<dyn ReportSinkFactoryOperations>,
    ) -> Self {
        ClassificationPipeline {
            archive_reader,
            token_counter,
            catalog,
            report_factory,
            processed: HashSet::new(),
        }
    }

    /*
     * Executes one run: Validating -> Scanning -> Processing(i) -> Completed.
     * Validation failures abort with zero side effects. An empty scan ends
     * the run with `NothingToDo` and creates no artifact. The report sink is
     * opened before the first file is touched; records are appended before
     * relocation is attempted, so the artifact always reflects every attempt.
     */
    pub fn execute(
        &mut self,
        request: &RunRequest,
        observer: &dyn ProgressObserverOperations,
    ) -> Result<RunOutcome> {
        // Validation order mirrors the input form: threshold, source, destination.
        let threshold = parse_token_threshold(&request.token_threshold)?;
        if !request.source_dir.is_dir() {
            return Err(PipelineError::SourceDirMissing(request.source_dir.clone()));
        }
        if !request.destination_dir.is_dir() {
            return Err(PipelineError::DestinationDirMissing(
                request.destination_dir.clone(),
            ));
        }

        self.processed.clear();
        let candidates = self.catalog.list_candidates(&request.source_dir);
        if candidates.is_empty() {
            log::info!(
                "ClassificationPipeline: No candidate archives in {:?}; nothing to do.",
                request.source_dir
            );
            return Ok(RunOutcome::NothingToDo);
        }

        let mut sink = self.report_factory.open(&request.destination_dir)?;
        log::info!(
            "ClassificationPipeline: Starting run over {} candidate(s), threshold {threshold}, report {:?}.",
            candidates.len(),
            sink.artifact_path()
        );

        let total = candidates.len();
        let mut processed_count = 0usize;
        for path in &candidates {
            if self.processed.contains(path) {
                continue;
            }

            if let Some(record) = self.classify(path) {
                // The audit row is persisted before the move is attempted, so
                // a failed relocation can never erase the attempt.
                sink.append(&record)?;
                if record.token_count < threshold {
                    match relocate_file(path, &request.destination_dir) {
                        Ok(target) => log::info!(
                            "ClassificationPipeline: Moved {path:?} ({} tokens) to {target:?}",
                            record.token_count
                        ),
                        Err(e) => log::error!(
                            "ClassificationPipeline: Error moving file {path:?}: {e}"
                        ),
                    }
                }
            }

            self.processed.insert(path.clone());
            processed_count += 1;
            observer.on_file_processed(processed_count, total);
        }

        let report_path = sink.artifact_path().to_path_buf();
        log::info!(
            "ClassificationPipeline: Run complete. Processed {processed_count} file(s); report at {report_path:?}."
        );
        Ok(RunOutcome::Completed {
            processed: processed_count,
            report_path,
        })
    }

    /*
     * Extracts and counts one archive. Returns `None` for any per-file
     * failure (unreadable archive, counting failure, empty title, zero
     * tokens); the caller still marks the file processed and counts it
     * toward progress.
     */
    fn classify(&self, path: &Path) -> Option<ClassificationRecord> {
        let content = match self.archive_reader.read(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("ClassificationPipeline: Skipping {path:?}: {e}");
                return None;
            }
        };
        let token_count = match self.token_counter.count_tokens(&content.text) {
            Ok(count) => count,
            Err(e) => {
                log::error!("ClassificationPipeline: Token counting failed for {path:?}: {e}");
                return None;
            }
        };
        if content.title.is_empty() || token_count == 0 {
            log::debug!(
                "ClassificationPipeline: No record for {path:?} (title empty: {}, tokens: {token_count}).",
                content.title.is_empty()
            );
            return None;
        }
        Some(ClassificationRecord {
            title: content.title,
            token_count,
            original_path: path.to_path_buf(),
        })
    }
}
