use std::path::PathBuf;

use engine_logging::engine_info;

use crate::archive::{unpack_first_entry, ArchiveError};
use crate::decode::{decode_xml, DecodeError};
use crate::export::{write_output_table, ExportError};
use crate::feed::{locate_download_link, FeedError, DLTINS_FILE_TYPE};
use crate::fetch::{Fetcher, ProgressSink};
use crate::persist::{PersistError, WorkingDir};
use crate::records::{extract_records, ExtractError};
use crate::types::{FetchError, PipelineEvent, RunSummary, Stage, StageProgress};

/// Working file the unpacked archive payload is persisted to.
pub const WORKING_XML_FILENAME: &str = "input.xml";
/// File the output table is serialized to.
pub const OUTPUT_TABLE_FILENAME: &str = "output.csv";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub feed_url: String,
    pub file_type: String,
    pub working_dir: PathBuf,
}

impl PipelineConfig {
    pub fn new(feed_url: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            feed_url: feed_url.into(),
            file_type: DLTINS_FILE_TYPE.to_string(),
            working_dir: working_dir.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("feed query failed: {0}")]
    FeedFetch(#[source] FetchError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("archive download failed: {0}")]
    ArchiveFetch(#[source] FetchError),
    #[error("archive extraction failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error("payload decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to persist working file: {0}")]
    Persist(#[from] PersistError),
    #[error("record extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("output serialization failed: {0}")]
    Export(#[from] ExportError),
}

/// Run the four stages in order: query the feed, locate the download
/// link, fetch and unpack the archive, extract records and serialize
/// the table. The first failing stage aborts the run; nothing is
/// retried.
pub async fn run_pipeline(
    fetcher: &dyn Fetcher,
    config: &PipelineConfig,
    sink: &dyn ProgressSink,
) -> Result<RunSummary, PipelineError> {
    sink.emit(PipelineEvent::Progress(StageProgress {
        stage: Stage::QueryingFeed,
        bytes: None,
    }));
    let feed = fetcher
        .fetch(&config.feed_url, Stage::QueryingFeed, sink)
        .await
        .map_err(PipelineError::FeedFetch)?;
    engine_info!(
        "feed query returned {} bytes from {}",
        feed.metadata.byte_len,
        feed.metadata.final_url
    );

    sink.emit(PipelineEvent::Progress(StageProgress {
        stage: Stage::LocatingLink,
        bytes: None,
    }));
    let feed_xml = decode_xml(&feed.bytes)?;
    let download_link = locate_download_link(&feed_xml.text, &config.file_type)?;
    engine_info!("located {} download link: {}", config.file_type, download_link);

    sink.emit(PipelineEvent::Progress(StageProgress {
        stage: Stage::Downloading,
        bytes: None,
    }));
    let archive = fetcher
        .fetch(&download_link, Stage::Downloading, sink)
        .await
        .map_err(PipelineError::ArchiveFetch)?;
    engine_info!("downloaded archive ({} bytes)", archive.metadata.byte_len);

    sink.emit(PipelineEvent::Progress(StageProgress {
        stage: Stage::Unpacking,
        bytes: None,
    }));
    let entry = unpack_first_entry(&archive.bytes)?;
    engine_info!("unpacked entry {} ({} bytes)", entry.name, entry.bytes.len());
    let payload = decode_xml(&entry.bytes)?;
    let working_dir = WorkingDir::new(&config.working_dir);
    let input_path = working_dir.write(WORKING_XML_FILENAME, &payload.text)?;

    sink.emit(PipelineEvent::Progress(StageProgress {
        stage: Stage::Extracting,
        bytes: None,
    }));
    let records = extract_records(&input_path)?;
    engine_info!("extracted {} instrument records", records.len());

    sink.emit(PipelineEvent::Progress(StageProgress {
        stage: Stage::Writing,
        bytes: None,
    }));
    let export = write_output_table(&working_dir, OUTPUT_TABLE_FILENAME, &records)?;

    sink.emit(PipelineEvent::Completed {
        record_count: export.record_count,
    });
    Ok(RunSummary {
        download_link,
        record_count: export.record_count,
        input_path,
        output_path: export.output_path,
    })
}
