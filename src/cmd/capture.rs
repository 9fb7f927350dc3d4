//! Screen capture: `fixloop capture` and `--capture` on vision commands.

use anyhow::{Context, Result};
use console::{Term, style};
use dialoguer::{Select, theme::ColorfulTheme};
use std::path::Path;

use fixloop::capture::{CaptureTarget, CaptureTool, CapturedImage, CommandCapture, ScreenCapture};
use fixloop::ui::icons::{CAMERA, CHECK};

use super::super::Cli;
use super::workflow::load_config;

/// Ask which surface to capture. Without a terminal the whole display is used.
fn choose_target() -> Result<CaptureTarget> {
    if !Term::stderr().is_term() {
        return Ok(CaptureTarget::Display);
    }

    let options = &["Whole display", "A single window"];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What should be captured?")
        .items(options)
        .default(0)
        .interact()?;

    match selection {
        0 => Ok(CaptureTarget::Display),
        1 => Ok(CaptureTarget::Window),
        _ => unreachable!(),
    }
}

/// Pick a target and grab one frame with the configured or detected tool.
pub async fn capture_interactive(cli: &Cli, project_dir: &Path) -> Result<CapturedImage> {
    let config = load_config(cli, project_dir)?;
    let tool = CaptureTool::from_config(config.toml.capture.tool.as_deref());
    let capture = CommandCapture::new(tool);
    let target = choose_target()?;

    eprintln!("{}Capturing {}...", CAMERA, target);
    let image = capture
        .capture(target)
        .await
        .context("Screen capture failed")?;
    Ok(image)
}

pub async fn cmd_capture(cli: &Cli, project_dir: &Path, out: &Path) -> Result<()> {
    let image = capture_interactive(cli, project_dir).await?;
    std::fs::write(out, &image.bytes)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!(
        "{}Saved {} ({}, {} bytes)",
        CHECK,
        style(out.display()).bold(),
        image.mime_type,
        image.bytes.len()
    );
    Ok(())
}
