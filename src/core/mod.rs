/*
 * This module consolidates the core, platform-agnostic logic of the
 * application: the batch classification pipeline and its collaborators. It
 * re-exports the key data structures and the abstractions
 * (`ArchiveReaderOperations`, `TokenCounterOperations`,
 * `FileCatalogOperations`, `ReportSinkFactoryOperations`,
 * `SettingsManagerOperations`, `ProgressObserverOperations`) behind which
 * the concrete implementations live, so callers can wire real or mock
 * collaborators interchangeably.
 */
pub mod archive_reader;
pub mod catalog;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod tokenizer_utils;

// Re-export key structures and enums
pub use models::{ArchiveContent, ClassificationRecord, RunOutcome, RunRequest};

// Re-export archive reader related items
pub use archive_reader::{ArchiveError, ArchiveReaderOperations, CoreEpubReader, MAX_ARCHIVE_SIZE};

// Re-export tokenizer related items
pub use tokenizer_utils::{
    CoreTikTokenCounter, SimpleWhitespaceTokenCounter, TokenCounterOperations, TokenizerError,
};

// Re-export catalog related items
pub use catalog::{ARCHIVE_EXTENSION, CoreFileCatalog, FileCatalogOperations};

// Re-export report related items
pub use report::{
    CoreCsvReportFactory, CoreCsvReportSink, REPORT_FILE_PREFIX, ReportError,
    ReportSinkFactoryOperations, ReportSinkOperations,
};

// Re-export pipeline related items
pub use pipeline::{
    ClassificationPipeline, PipelineError, ProgressObserverOperations, parse_token_threshold,
};

// Re-export settings related items
pub use settings::{AppSettings, CoreSettingsManager, SettingsError, SettingsManagerOperations};
