use std::path::{Path, PathBuf};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct App {
    /// Directory holding previously written outline files
    #[arg(short, long, env = "PAGESENSE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// List the files that would be removed without deleting them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(app: App, _global: crate::Global) -> Result<()> {
    let removed = tokio::task::spawn_blocking({
        let app = app.clone();
        move || clean_dir(&app.output_dir, app.dry_run)
    })
    .await??;

    for path in &removed {
        println!("{}", path.display());
    }

    let verb = if app.dry_run { "Would remove" } else { "Removed" };
    log::info!("{verb} {} outline files", removed.len());

    Ok(())
}

/// Remove every `.json` file directly inside `dir`, returning the paths.
/// A missing directory has nothing to clean.
pub fn clean_dir(dir: &Path, dry_run: bool) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        log::warn!("{} does not exist, nothing to clean", dir.display());
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read output directory {}", dir.display()))?;

    let mut targets = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if path.is_file() && is_json {
            targets.push(path);
        }
    }
    targets.sort();

    if !dry_run {
        for path in &targets {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            log::debug!("Removed {}", path.display());
        }
    }

    Ok(targets)
}
