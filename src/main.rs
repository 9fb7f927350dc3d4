use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "fixloop")]
#[command(version, about = "Analyze, apply and verify code edits against a model backend")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Backend base URL. Overrides FIXLOOP_SERVER and fixloop.toml.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Model forwarded to the backend. Overrides fixloop.toml and FAST_MODEL.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Request timeout in seconds, forwarded to the backend (minimum 1)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Do not write the resulting code back to the source file
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the code under edit comes from.
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Source file. Defaults to the code saved in the session.
    pub file: Option<PathBuf>,
}

/// Screenshot for vision requests.
#[derive(Args, Clone, Debug)]
pub struct ImageArgs {
    /// Describe what the screenshot should show
    #[arg(short, long)]
    pub prompt: String,

    /// Use an image already reachable by URL
    #[arg(long, conflicts_with_all = ["capture", "image"])]
    pub image_url: Option<String>,

    /// Capture the screen before sending
    #[arg(long, conflicts_with = "image")]
    pub capture: bool,

    /// Use an existing image file
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask for edits, apply them and cross-check the result
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Apply an edit set from a file ("-" reads stdin), then cross-check
    Apply {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        edits: PathBuf,
    },
    /// Cross-check the code and show the report
    Crosscheck {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Repair the code against the last cross-check report
    Fix {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Compare the code against a screenshot and take the suggested code
    Vision {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Run the code, then apply vision edits and cross-check
    Submit {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Run the code in the backend sandbox
    Run {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Capture a screenshot to a file
    Capture {
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Inspect or clear the saved session
    Session {
        #[command(subcommand)]
        command: Option<SessionCommands>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum SessionCommands {
    /// Show the saved code and last report
    Show,
    /// Delete the saved session
    Clear,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default fixloop.toml file
    Init,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "fixloop=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    init_logging(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Analyze { source } => cmd::cmd_analyze(&cli, &project_dir, source).await?,
        Commands::Apply { source, edits } => {
            cmd::cmd_apply(&cli, &project_dir, source, edits).await?
        }
        Commands::Crosscheck { source } => cmd::cmd_crosscheck(&cli, &project_dir, source).await?,
        Commands::Fix { source } => cmd::cmd_fix(&cli, &project_dir, source).await?,
        Commands::Vision { source, image } => {
            cmd::cmd_vision(&cli, &project_dir, source, image).await?
        }
        Commands::Submit { source, image } => {
            cmd::cmd_submit(&cli, &project_dir, source, image).await?
        }
        Commands::Run { source } => cmd::cmd_run(&cli, &project_dir, source).await?,
        Commands::Capture { out } => cmd::cmd_capture(&cli, &project_dir, out).await?,
        Commands::Session { command } => cmd::cmd_session(&cli, &project_dir, command.clone())?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
