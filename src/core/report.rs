/*
 * This module writes the per-run audit artifact: one CSV file inside the
 * destination directory, named with the run's start timestamp, carrying one
 * row per successfully classified file. It defines `ReportSinkOperations`
 * for the open handle, `ReportSinkFactoryOperations` for creating it (the
 * pipeline opens the sink only once a non-empty scan is in hand), and the
 * concrete CSV implementations.
 *
 * Rows are flushed synchronously after every append so the artifact is a
 * strict prefix of processing attempts even if the run is interrupted.
 */
use crate::core::models::ClassificationRecord;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub const REPORT_FILE_PREFIX: &str = "epub_token_counts_";
const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const REPORT_HEADER: [&str; 3] = ["Title", "Token Count", "File Path"];

#[derive(Debug)]
pub enum ReportError {
    Io(io::Error),
    Csv(csv::Error),
}

impl From<io::Error> for ReportError {
    fn from(err: io::Error) -> Self {
        ReportError::Io(err)
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Csv(err)
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "Report I/O error: {e}"),
            ReportError::Csv(e) => write!(f, "Report CSV error: {e}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io(e) => Some(e),
            ReportError::Csv(e) => Some(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

/*
 * An open report artifact for one run. `append` must persist the row before
 * returning so that a later relocation failure can never un-write it.
 */
pub trait ReportSinkOperations {
    fn append(&mut self, record: &ClassificationRecord) -> Result<()>;
    fn artifact_path(&self) -> &Path;
}

/*
 * Creates report sinks. Failure to open the artifact is the one fatal
 * failure this layer can produce: without it there is no audit trail, so
 * the pipeline aborts the run before touching any file.
 */
pub trait ReportSinkFactoryOperations: Send + Sync {
    fn open(&self, destination_dir: &Path) -> Result<Box<dyn ReportSinkOperations>>;
}

/*
 * CSV-backed report sink. The artifact lands in the destination directory
 * as `epub_token_counts_<YYYYMMDD_HHMMSS>.csv`; runs started in different
 * seconds can never collide.
 */
pub struct CoreCsvReportSink {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CoreCsvReportSink {
    /*
     * Creates the artifact and writes the header row immediately, so even a
     * run that classifies zero files successfully leaves a well-formed file.
     */
    pub fn create(destination_dir: &Path) -> Result<Self> {
        let timestamp = chrono::Local::now().format(REPORT_TIMESTAMP_FORMAT);
        let path = destination_dir.join(format!("{REPORT_FILE_PREFIX}{timestamp}.csv"));
        log::debug!("CoreCsvReportSink: Creating report artifact at {path:?}");
        let file = File::create(&path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(REPORT_HEADER)?;
        writer.flush()?;
        Ok(CoreCsvReportSink { writer, path })
    }
}

impl ReportSinkOperations for CoreCsvReportSink {
    fn append(&mut self, record: &ClassificationRecord) -> Result<()> {
        let token_count = record.token_count.to_string();
        let original_path = record.original_path.to_string_lossy();
        self.writer.write_record([
            record.title.as_str(),
            token_count.as_str(),
            original_path.as_ref(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    fn artifact_path(&self) -> &Path {
        &self.path
    }
}

pub struct CoreCsvReportFactory {}

impl CoreCsvReportFactory {
    pub fn new() -> Self {
        CoreCsvReportFactory {}
    }
}

impl Default for CoreCsvReportFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSinkFactoryOperations for CoreCsvReportFactory {
    fn open(&self, destination_dir: &Path) -> Result<Box<dyn ReportSinkOperations>> {
        CoreCsvReportSink::create(destination_dir)
            .map(|sink| Box::new(sink) as Box<dyn ReportSinkOperations>)
    }
}
