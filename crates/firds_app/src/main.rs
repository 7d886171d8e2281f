mod config;
mod logging;

use std::path::Path;
use std::process::ExitCode;

use engine_logging::{engine_debug, engine_error, engine_info};
use firds_engine::{
    run_pipeline, PipelineConfig, PipelineEvent, ProgressSink, ReqwestFetcher, StageProgress,
};

use crate::config::AppConfig;
use crate::logging::LogDestination;

/// Forwards pipeline progress to the global logger.
struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Progress(StageProgress {
                stage,
                bytes: Some(bytes),
            }) => {
                engine_debug!("{stage:?}: {bytes} bytes");
            }
            PipelineEvent::Progress(StageProgress { stage, bytes: None }) => {
                engine_info!("stage {stage:?}");
            }
            PipelineEvent::Completed { record_count } => {
                engine_info!("pipeline completed with {record_count} records");
            }
        }
    }
}

fn main() -> ExitCode {
    let config = match AppConfig::load(Path::new(".")) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("firds_harvester: {err}");
            return ExitCode::FAILURE;
        }
    };

    logging::initialize(if config.log_to_terminal {
        LogDestination::Both
    } else {
        LogDestination::File
    });

    let query_url = match config.query_url() {
        Ok(url) => url,
        Err(err) => {
            engine_error!("invalid configuration: {err}");
            eprintln!("firds_harvester: {err}");
            return ExitCode::FAILURE;
        }
    };
    engine_info!("querying feed: {query_url}");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            engine_error!("failed to start runtime: {err}");
            eprintln!("firds_harvester: {err}");
            return ExitCode::FAILURE;
        }
    };

    let fetcher = ReqwestFetcher::new(config.fetch_settings());
    let pipeline_config = PipelineConfig::new(query_url, config.working_dir());

    match runtime.block_on(run_pipeline(&fetcher, &pipeline_config, &LogSink)) {
        Ok(summary) => {
            engine_info!(
                "wrote {} records to {}",
                summary.record_count,
                summary.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            engine_error!("pipeline aborted: {err}");
            eprintln!("firds_harvester: {err}");
            ExitCode::FAILURE
        }
    }
}
