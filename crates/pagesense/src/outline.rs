use std::io::IsTerminal;
use std::path::PathBuf;

use colored::Colorize;
use pagesense_core::outline::BATCH_TITLE_CHARS;
use pagesense_core::{analyze, AggregateOptions, CharRecord, HeadingEntry, HeadingLevel, Outline};

use crate::extract::{analyze_bytes, document_stem};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct App {
    /// Path to the PDF file (a JSON array of character records with --chars)
    pub path: PathBuf,

    /// Output format: indented, markdown, or json (default: indented)
    #[arg(long, env = "PAGESENSE_OUTPUT", default_value = "indented")]
    pub output: OutputFormat,

    /// Output as JSON (alias for --output json)
    #[arg(long)]
    pub json: bool,

    /// Read character records from JSON instead of parsing a PDF
    #[arg(long)]
    pub chars: bool,

    /// Do not derive bold/italic from font names
    #[arg(long)]
    pub no_style: bool,
}

#[derive(Debug, Clone, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented text format (2 spaces per level)
    Indented,
    /// Markdown nested list format
    Markdown,
    /// The outline JSON document
    Json,
}

pub async fn run(app: App, _global: crate::Global) -> Result<()> {
    let outline = tokio::task::spawn_blocking({
        let app = app.clone();
        move || load_outline(&app)
    })
    .await??;

    // --json takes precedence over --output
    let format = if app.json {
        OutputFormat::Json
    } else {
        app.output.clone()
    };

    match format {
        OutputFormat::Json => println!("{}", outline.to_json_pretty()?),
        _ => output_formatted(&outline, &format, &app),
    }

    Ok(())
}

/// Build the outline for `app.path`.  Empty documents are an error here.
pub fn load_outline(app: &App) -> Result<Outline> {
    let options = AggregateOptions {
        detect_style: !app.no_style,
    };

    let analysis = if app.chars {
        let raw = std::fs::read_to_string(&app.path)
            .with_context(|| format!("Failed to read {}", app.path.display()))?;
        let chars: Vec<CharRecord> =
            serde_json::from_str(&raw).context("Invalid character record JSON")?;
        analyze(&chars, options)
    } else {
        let bytes = std::fs::read(&app.path)
            .with_context(|| format!("Failed to read {}", app.path.display()))?;
        analyze_bytes(&bytes, options)?
    };

    analysis
        .into_outline(&document_stem(&app.path), BATCH_TITLE_CHARS)
        .ok_or_else(|| Error::NoTextBlocks.into())
}

fn indent(level: HeadingLevel) -> String {
    "  ".repeat(usize::from(level.as_u8().saturating_sub(1)))
}

/// Format the outline as indented text (2 spaces per level).
fn format_outline_indented(entries: &[HeadingEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}{}  [page {}]", indent(e.level), e.text, e.page))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the outline as a markdown nested list.
fn format_outline_markdown(entries: &[HeadingEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}* {}  [page {}]", indent(e.level), e.text, e.page))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Title and per-level counts, decorated for a terminal.
fn format_header(outline: &Outline, app: &App) -> String {
    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&format!("{}\n", "OUTLINE".bright_cyan().bold()));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_cyan()));

    result.push_str(&format!(
        "\n{}: {}\n",
        "File".green(),
        app.path.display().to_string().cyan().underline()
    ));
    result.push_str(&format!(
        "{}: {}\n",
        "Title".green(),
        outline.title.bright_white().bold()
    ));

    for level in [HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3] {
        result.push_str(&format!(
            "{}: {}\n",
            level.to_string().green(),
            outline.count(level).to_string().bright_yellow().bold()
        ));
    }
    result.push('\n');

    result
}

fn output_formatted(outline: &Outline, format: &OutputFormat, app: &App) {
    let content = match format {
        OutputFormat::Markdown => format_outline_markdown(&outline.outline),
        _ => format_outline_indented(&outline.outline),
    };

    if std::io::stdout().is_terminal() {
        // Terminal output: metadata to stderr, content to stdout
        eprintln!("{}", format_header(outline, app));
        for line in content.lines() {
            println!("{}", line.white());
        }
    } else {
        println!("{}", content);
    }
}
