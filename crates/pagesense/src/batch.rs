use std::path::{Path, PathBuf};

use pagesense_core::outline::{write_json, BATCH_TITLE_CHARS};
use pagesense_core::AggregateOptions;

use crate::extract::{analyze_bytes, document_stem, is_pdf_path, output_path};
use crate::prelude::{eprintln, *};

pub const DEFAULT_PROCESSES: usize = 4;

#[derive(Debug, clap::Args, Clone)]
pub struct App {
    /// Directory containing input PDF files
    #[arg(short, long, env = "PAGESENSE_INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory to save output JSON files
    #[arg(short, long, env = "PAGESENSE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Number of parallel workers
    #[arg(short, long, env = "PAGESENSE_PROCESSES", default_value_t = DEFAULT_PROCESSES)]
    pub processes: usize,
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Written(PathBuf),
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Written(_) => self.written += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    fn merge(&mut self, other: Summary) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        eprintln!(
            "Extracting outlines from {} into {} ({} workers)",
            app.input_dir.display(),
            app.output_dir.display(),
            app.processes
        );
    }

    let summary = process_directory(&app.input_dir, &app.output_dir, app.processes).await?;
    log::info!(
        "Done: {} written, {} skipped, {} failed",
        summary.written,
        summary.skipped,
        summary.failed
    );

    Ok(())
}

/// Every `.pdf` directly inside `dir`, sorted by name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_pdf_path(&path) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Process every PDF in `input_dir` on `processes` workers fed by a bounded
/// queue.  Per-file failures are logged and counted, never propagated.
pub async fn process_directory(
    input_dir: &Path,
    output_dir: &Path,
    processes: usize,
) -> Result<Summary> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let files = list_pdfs(input_dir)?;
    if files.is_empty() {
        log::error!("No PDF files found in {}", input_dir.display());
        return Ok(Summary::default());
    }

    let workers = processes.clamp(1, files.len());
    log::info!("Processing {} files with {} workers", files.len(), workers);

    let (tx, rx) = async_channel::bounded::<PathBuf>(workers);

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let rx = rx.clone();
            let output_dir = output_dir.to_path_buf();
            tokio::spawn(async move {
                let mut summary = Summary::default();
                while let Ok(path) = rx.recv().await {
                    let output_dir = output_dir.clone();
                    // The pipeline is CPU-bound; keep it off the async workers.
                    let outcome =
                        tokio::task::spawn_blocking(move || process_file(&path, &output_dir))
                            .await
                            .unwrap_or_else(|e| {
                                log::error!("Worker panicked: {e}");
                                Outcome::Failed
                            });
                    summary.record(&outcome);
                }
                summary
            })
        })
        .collect();
    drop(rx);

    for path in files {
        tx.send(path).await.map_err(|e| eyre!("Task queue closed: {e}"))?;
    }
    tx.close();

    let mut total = Summary::default();
    for handle in handles {
        total.merge(handle.await?);
    }

    Ok(total)
}

/// Extract one file and write `<output_dir>/<stem>.json`.
pub fn process_file(path: &Path, output_dir: &Path) -> Outcome {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::info!("Processing {name}");

    match extract_one(path, output_dir) {
        Ok(Some(written)) => {
            log::info!("Wrote {}", written.display());
            Outcome::Written(written)
        }
        Ok(None) => {
            log::warn!("No text blocks found in {name}, skipping");
            Outcome::Skipped
        }
        Err(e) => {
            log::error!("Failed to process {name}: {e}");
            Outcome::Failed
        }
    }
}

fn extract_one(path: &Path, output_dir: &Path) -> std::result::Result<Option<PathBuf>, Error> {
    let bytes = std::fs::read(path)?;
    let stem = document_stem(path);

    let Some(outline) = analyze_bytes(&bytes, AggregateOptions::default())?
        .into_outline(&stem, BATCH_TITLE_CHARS)
    else {
        return Ok(None);
    };

    Ok(Some(write_json(&outline, &output_path(output_dir, &stem))?))
}
