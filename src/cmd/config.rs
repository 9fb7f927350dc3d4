//! Configuration view and validation commands: `fixloop config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use fixloop::config::{CONFIG_FILE, DEFAULT_SERVER, FixloopConfig, FixloopToml, config_dir};

    let config_dir = config_dir(project_dir);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Fixloop Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();

                let toml = FixloopToml::load(&config_path)?;

                println!("[service]");
                if let Some(url) = &toml.service.base_url {
                    println!("  base_url = \"{}\"", url);
                }
                println!(
                    "  connect_timeout_secs = {}",
                    toml.service.connect_timeout_secs
                );
                println!();

                println!("[defaults]");
                if let Some(model) = &toml.defaults.model {
                    println!("  model = \"{}\"", model);
                }
                println!("  timeout_secs = {}", toml.defaults.timeout_secs);
                if let Some(filename) = &toml.defaults.filename {
                    println!("  filename = \"{}\"", filename);
                }
                println!();

                if let Some(tool) = &toml.capture.tool {
                    println!("[capture]");
                    println!("  tool = \"{}\"", tool);
                    println!();
                }
            } else {
                println!("No fixloop.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                println!("  base_url = \"{}\"", DEFAULT_SERVER);
                println!("  timeout_secs = {}", FixloopToml::default().defaults.timeout_secs);
                println!();
                println!("Run 'fixloop config init' to create a fixloop.toml file.");
                println!();
            }

            // Effective values include FIXLOOP_SERVER / FAST_MODEL and the user config file.
            println!("Effective values (with env overrides):");
            let config = FixloopConfig::new(project_dir.to_path_buf())?;
            println!("  base_url = \"{}\"", config.base_url());
            println!("  model = \"{}\"", config.model());
            println!("  timeout_secs = {}", config.timeout_secs());
            println!("  session = \"{}\"", config.session_file().display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No fixloop.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = FixloopToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("fixloop.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)?;
            }

            let toml = FixloopToml::default();
            toml.save(&config_path)?;

            println!("Created fixloop.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [service] base_url, connect_timeout_secs");
            println!("  - [defaults] model, timeout_secs, filename");
            println!("  - [capture] tool");
            println!();
        }
    }

    Ok(())
}
