//! mixscan - recognition reconciliation for long recordings
//!
//! Runs the given steps left to right:
//! `mixscan [--debug] [--threshold N] [--config PATH] <steps...>`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use mixscan::config::{resolve_api_token, ScanConfig};
use mixscan::services::{
    is_url, AudioSegmenter, Downloader, HttpRecognitionClient, RetryPolicy, RetryingRecognizer,
};
use mixscan::workflow::{self, parse_steps, PassKind, Step, Workflow};
use mixscan_common::config::{ConfigResolver, TomlConfig};
use mixscan_common::logging::init_logging;

/// Command-line arguments for mixscan
#[derive(Parser, Debug)]
#[command(name = "mixscan")]
#[command(about = "Recognize and reconcile tracklists of long recordings")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Occurrence count at or below which tracks are validated
    #[arg(long)]
    threshold: Option<usize>,

    /// Config file (overrides MIXSCAN_CONFIG and the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Steps: scan, rescan, validate [file], merge-gaps [file],
    /// migrate [file], download <url>, recognize <file|url>
    #[arg(required = true, num_args = 1..)]
    steps: Vec<String>,
}

/// Everything a step needs
struct App {
    toml: TomlConfig,
    workflow: Option<Workflow>,
    downloader: Downloader,
}

impl App {
    fn workflow(&self) -> Result<&Workflow> {
        self.workflow
            .as_ref()
            .context("Recognition is not configured")
    }

    async fn run_step(&self, step: &Step) -> Result<()> {
        info!(step = ?step, "Running step");
        match step {
            Step::Scan => self.batch(PassKind::Scan).await,
            Step::Rescan => self.batch(PassKind::Rescan).await,
            Step::Validate(file) => self.single_or_batch(PassKind::Validate, file.as_deref()).await,
            Step::MergeGaps(file) => self.single_or_batch(PassKind::MergeGaps, file.as_deref()).await,
            Step::Migrate(file) => self.migrate(file.as_deref()),
            Step::Download(url) => {
                self.downloader
                    .download(url)
                    .await
                    .with_context(|| format!("Failed to download {}", url))?;
                self.batch(PassKind::Scan).await
            }
            Step::Recognize(target) if is_url(target) => {
                self.downloader
                    .download(target)
                    .await
                    .with_context(|| format!("Failed to download {}", target))?;
                self.batch(PassKind::Scan).await
            }
            Step::Recognize(target) => {
                self.single_or_batch(PassKind::Scan, Some(Path::new(target))).await
            }
        }
    }

    async fn batch(&self, kind: PassKind) -> Result<()> {
        let summary = self
            .workflow()?
            .run_batch(kind, &self.toml.downloads_dir, &self.toml.results_dir)
            .await
            .with_context(|| format!("{} failed", kind))?;
        if summary.failed > 0 {
            warn!(pass = %kind, failed = summary.failed, "Some files failed");
        }
        Ok(())
    }

    async fn single_or_batch(&self, kind: PassKind, file: Option<&Path>) -> Result<()> {
        match file {
            Some(source) => {
                self.workflow()?
                    .run_file(kind, source, &self.toml.results_dir)
                    .await
                    .with_context(|| format!("{} failed for {}", kind, source.display()))?;
                Ok(())
            }
            None => self.batch(kind).await,
        }
    }

    fn migrate(&self, file: Option<&Path>) -> Result<()> {
        let files = match file {
            Some(path) => vec![path.to_path_buf()],
            None => workflow::result_files(&self.toml.results_dir)?,
        };

        let mut migrated = 0;
        for path in &files {
            if workflow::migrate(path)
                .with_context(|| format!("Failed to migrate {}", path.display()))?
            {
                migrated += 1;
            }
        }
        info!(files = files.len(), migrated, "Migration complete");
        Ok(())
    }
}

fn build_workflow(toml: &TomlConfig, config: ScanConfig) -> Result<Workflow> {
    let token = resolve_api_token(toml)?;
    let client = HttpRecognitionClient::from_config(&toml.recognizer, token)
        .context("Failed to create recognition client")?;
    let recognizer = RetryingRecognizer::new(client, RetryPolicy::from_config(&toml.recognizer));
    let segmenter = AudioSegmenter::new(
        toml.segments_dir.clone(),
        toml.segment_length_seconds,
        toml.export_workers,
    );
    Ok(Workflow::new(Arc::new(recognizer), Arc::new(segmenter), config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = ConfigResolver::new(args.config.clone()).resolve();
    init_logging(args.debug, Some(&toml.logs_dir)).context("Failed to initialize logging")?;

    info!(
        "Starting mixscan v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let steps = parse_steps(&args.steps)?;
    let config = ScanConfig::from_toml(&toml).with_validation_threshold(args.threshold);

    let workflow = if steps.iter().any(Step::needs_recognizer) {
        Some(build_workflow(&toml, config)?)
    } else {
        None
    };

    let app = App {
        downloader: Downloader::new(toml.downloads_dir.clone()),
        workflow,
        toml,
    };

    for step in &steps {
        app.run_step(step).await?;
    }

    info!("All steps complete");
    Ok(())
}
