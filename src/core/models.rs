use std::path::PathBuf;

/*
 * Transient value produced by the archive reader for a single e-book:
 * the display title and the concatenated text of every markup document
 * in the container. Owned by the processing step for one file and
 * discarded after token counting.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveContent {
    pub title: String,
    pub text: String,
}

/*
 * One row of the per-run audit trail. A record is only ever built for a
 * file whose title is non-empty and whose token count is positive; the
 * pipeline enforces that invariant before appending to the report sink.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    pub title: String,
    pub token_count: usize,
    pub original_path: PathBuf,
}

/*
 * Everything the pipeline needs to start a run. The threshold is carried
 * as the raw user-supplied string (possibly with thousands separators);
 * validation and parsing happen inside the pipeline so that the caller
 * sees exactly one error for bad input.
 */
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub token_threshold: String,
}

/*
 * Terminal outcome of a run. `NothingToDo` means the scan found no
 * candidate archives and no report artifact was created. `Completed`
 * carries the number of files counted toward progress and the location
 * of the report artifact for the summary surface.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NothingToDo,
    Completed {
        processed: usize,
        report_path: PathBuf,
    },
}
