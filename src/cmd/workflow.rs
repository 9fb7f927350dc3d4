//! Workflow actions: `analyze`, `apply`, `crosscheck`, `fix`, `vision`,
//! `submit` and `run`.

use anyhow::{Context, Result};
use console::style;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fixloop::capture::{CapturedImage, ImageInput};
use fixloop::config::FixloopConfig;
use fixloop::orchestrator::{Orchestrator, RunSummary, StepOutcome, Verification};
use fixloop::services::HttpServices;
use fixloop::session::SessionStore;
use fixloop::status::StatusSignal;
use fixloop::ui::TerminalOperator;
use fixloop::ui::icons::{CHECK, CROSS, WARN};

use super::super::{Cli, ImageArgs, SourceArgs};

/// Load configuration for `project_dir` with the global CLI overrides applied.
pub fn load_config(cli: &Cli, project_dir: &Path) -> Result<FixloopConfig> {
    let mut config = FixloopConfig::new(project_dir.to_path_buf())?;
    config.cli_server = cli.server.clone();
    config.cli_model = cli.model.clone();
    config.cli_timeout = cli.timeout;
    config.verbose = cli.verbose;
    config.dry_run = cli.dry_run;
    Ok(config)
}

/// An orchestrator wired to the configured backend, plus where its code came
/// from.
struct Workspace {
    orchestrator: Orchestrator,
    source_path: Option<PathBuf>,
    initial: String,
    dry_run: bool,
}

impl Workspace {
    fn open(cli: &Cli, project_dir: &Path, source: &SourceArgs) -> Result<Self> {
        let config = load_config(cli, project_dir)?;
        let store = SessionStore::new(config.session_file());

        let source_path = source.file.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                project_dir.join(p)
            }
        });
        let initial = match &source_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read source file: {}", path.display()))?,
            None => store.code().context(
                "No source file given and no code saved in the session. Pass a file to work on.",
            )?,
        };

        let services = HttpServices::new(&config.base_url(), config.connect_timeout())
            .context("Failed to create HTTP client")?;
        let status = StatusSignal::new();
        let operator = Arc::new(TerminalOperator::new(status.clone()));
        let orchestrator = Orchestrator::new(
            Arc::new(services),
            operator,
            status,
            initial.clone(),
            config.workflow_settings(source_path.as_deref()),
        )
        .with_session(store);

        Ok(Self {
            orchestrator,
            source_path,
            initial,
            dry_run: config.dry_run,
        })
    }

    /// Write the resulting code back and report how the run went.
    fn finish(&self, summary: &RunSummary) -> Result<()> {
        let code = self.orchestrator.source();
        if code != self.initial {
            match (&self.source_path, self.dry_run) {
                (Some(path), false) => {
                    std::fs::write(path, &code)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{}Updated {}", CHECK, style(path.display()).bold());
                }
                (Some(_), true) => {
                    println!("{}", style("Dry run: source file left unchanged").dim());
                    print!("{}", code);
                }
                (None, _) => print!("{}", code),
            }
        }

        match summary.verification {
            Verification::Verified(overall) => {
                println!("{}Cross-check: {}", CHECK, style(overall).bold())
            }
            Verification::Failed => println!("{}{}", WARN, style("Not verified").yellow()),
            Verification::NotRun => {}
        }

        // The operator has already seen the failure notice.
        if let Some(StepOutcome::Failed { step, .. }) = summary
            .outcomes
            .iter()
            .find(|o| matches!(o, StepOutcome::Failed { .. }))
        {
            eprintln!("{}{}", CROSS, style(format!("Stopped at {}", step)).red());
            anyhow::bail!("Workflow run {} did not complete", summary.id);
        }
        if summary.verification == Verification::Failed {
            anyhow::bail!("Cross-check did not complete");
        }
        Ok(())
    }
}

fn read_edits(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read edits from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read edits file: {}", path.display()))
    }
}

async fn resolve_image(
    cli: &Cli,
    project_dir: &Path,
    args: &ImageArgs,
) -> Result<Option<ImageInput>> {
    if let Some(url) = &args.image_url {
        return Ok(Some(ImageInput::Url(url.clone())));
    }
    if let Some(path) = &args.image {
        let image = CapturedImage::from_path(path)
            .await
            .with_context(|| format!("Failed to load image: {}", path.display()))?;
        return Ok(Some(ImageInput::Inline(image)));
    }
    if args.capture {
        let image = super::capture::capture_interactive(cli, project_dir).await?;
        return Ok(Some(ImageInput::Inline(image)));
    }
    Ok(None)
}

pub async fn cmd_analyze(cli: &Cli, project_dir: &Path, source: &SourceArgs) -> Result<()> {
    let workspace = Workspace::open(cli, project_dir, source)?;
    let summary = workspace.orchestrator.analyze().await?;
    workspace.finish(&summary)
}

pub async fn cmd_apply(
    cli: &Cli,
    project_dir: &Path,
    source: &SourceArgs,
    edits: &Path,
) -> Result<()> {
    let text = read_edits(edits)?;
    let workspace = Workspace::open(cli, project_dir, source)?;
    let summary = workspace.orchestrator.apply_text(&text).await?;
    workspace.finish(&summary)
}

pub async fn cmd_crosscheck(cli: &Cli, project_dir: &Path, source: &SourceArgs) -> Result<()> {
    let workspace = Workspace::open(cli, project_dir, source)?;
    let summary = workspace.orchestrator.cross_check().await?;
    workspace.finish(&summary)
}

pub async fn cmd_fix(cli: &Cli, project_dir: &Path, source: &SourceArgs) -> Result<()> {
    let workspace = Workspace::open(cli, project_dir, source)?;
    let summary = workspace.orchestrator.fix_from_cross_check().await?;
    workspace.finish(&summary)
}

pub async fn cmd_vision(
    cli: &Cli,
    project_dir: &Path,
    source: &SourceArgs,
    image: &ImageArgs,
) -> Result<()> {
    let workspace = Workspace::open(cli, project_dir, source)?;
    let input = resolve_image(cli, project_dir, image).await?;
    let summary = workspace
        .orchestrator
        .vision_analyze(&image.prompt, input)
        .await?;
    workspace.finish(&summary)
}

pub async fn cmd_submit(
    cli: &Cli,
    project_dir: &Path,
    source: &SourceArgs,
    image: &ImageArgs,
) -> Result<()> {
    let workspace = Workspace::open(cli, project_dir, source)?;
    let input = resolve_image(cli, project_dir, image).await?;
    let summary = workspace
        .orchestrator
        .vision_submit(&image.prompt, input)
        .await?;
    workspace.finish(&summary)
}

pub async fn cmd_run(cli: &Cli, project_dir: &Path, source: &SourceArgs) -> Result<()> {
    let workspace = Workspace::open(cli, project_dir, source)?;
    let summary = workspace.orchestrator.run_code().await?;
    workspace.finish(&summary)
}
