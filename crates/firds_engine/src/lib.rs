//! FIRDS harvester engine: the query, locate, fetch-unpack, extract pipeline.
mod archive;
mod decode;
mod export;
mod feed;
mod fetch;
mod persist;
mod pipeline;
mod records;
mod types;

pub use archive::{unpack_first_entry, ArchiveEntry, ArchiveError};
pub use decode::{decode_xml, DecodeError, DecodedXml};
pub use export::{
    read_output_table, write_output_table, ExportError, ExportSummary, OUTPUT_COLUMNS,
};
pub use feed::{locate_download_link, FeedDocument, FeedError, DLTINS_FILE_TYPE};
pub use fetch::{FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
pub use persist::{PersistError, WorkingDir};
pub use pipeline::{
    run_pipeline, PipelineConfig, PipelineError, OUTPUT_TABLE_FILENAME, WORKING_XML_FILENAME,
};
pub use records::{
    extract_records, extract_records_from_str, ExtractError, InstrumentRecord, RecordKind,
    GENERAL_ATTRIBUTES_TAG, ISSUER_TAG,
};
pub use types::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, PipelineEvent, RunSummary, Stage,
    StageProgress,
};
