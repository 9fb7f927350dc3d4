//! Saved session inspection: `fixloop session`.

use anyhow::Result;
use console::{Term, style};
use std::path::Path;

use fixloop::presenter::Presenter;
use fixloop::session::{CODE_KEY, SessionStore};

use super::super::{Cli, SessionCommands};
use super::workflow::load_config;

pub fn cmd_session(cli: &Cli, project_dir: &Path, command: Option<SessionCommands>) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let store = SessionStore::new(config.session_file());

    match command {
        None | Some(SessionCommands::Show) => {
            if !store.path().exists() {
                println!("No session saved at {}", store.path().display());
                return Ok(());
            }
            let data = store.load();

            println!();
            println!("Session: {}", store.path().display());
            if let Some(updated) = data.updated_at {
                println!("Updated: {}", updated.to_rfc3339());
            }
            println!();

            match data.entries.get(CODE_KEY) {
                Some(code) => {
                    println!("{}", style("Code").bold());
                    for line in code.lines() {
                        println!("  {}", line);
                    }
                }
                None => println!("{}", style("No code saved").dim()),
            }
            println!();

            match (data.surface, data.report) {
                (Some(surface), _) => {
                    let width = Term::stdout().size_checked().map(|(_, w)| w as usize);
                    for line in surface.lines(width) {
                        println!("{}", line);
                    }
                }
                (None, Some(report)) => {
                    let mut presenter = Presenter::new();
                    presenter.render(&report);
                    for line in presenter.surface().lines(None) {
                        println!("{}", line);
                    }
                }
                (None, None) => println!("{}", style("No cross-check report saved").dim()),
            }
            println!();
        }
        Some(SessionCommands::Clear) => {
            store.clear()?;
            println!("Cleared session at {}", store.path().display());
        }
    }

    Ok(())
}
