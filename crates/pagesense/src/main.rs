use crate::prelude::*;
use clap::Parser;

mod batch;
mod clean;
mod error;
mod extract;
mod outline;
mod prelude;
mod serve;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract heading outlines (title, H1-H3) from PDF documents"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "PAGESENSE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Print the outline of a single PDF
    Outline(crate::outline::App),

    /// Extract outlines for every PDF in a directory
    Batch(crate::batch::App),

    /// HTTP extraction service
    Serve(crate::serve::App),

    /// Remove outline files from an output directory
    Clean(crate::clean::App),
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    init_logger(app.global.verbose);
    color_eyre::install()?;

    match app.command {
        SubCommands::Outline(sub_app) => crate::outline::run(sub_app, app.global).await,
        SubCommands::Batch(sub_app) => crate::batch::run(sub_app, app.global).await,
        SubCommands::Serve(sub_app) => crate::serve::run(sub_app, app.global).await,
        SubCommands::Clean(sub_app) => crate::clean::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
