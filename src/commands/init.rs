use std::io::{self, Write};

use crate::config::Config;
use crate::error::{HelpdeskError, Result};

pub async fn run() -> Result<()> {
    let config_path = Config::config_path()?;

    if config_path.exists() {
        print!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("Helpdesk CLI Configuration");
    println!("==========================\n");

    print!("Enter the API base URL (e.g. https://soporte.example.com/api): ");
    io::stdout().flush()?;

    let mut api_url = String::new();
    io::stdin().read_line(&mut api_url)?;
    let api_url = api_url.trim();

    if api_url.is_empty() {
        return Err(HelpdeskError::MissingApiUrl);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HelpdeskError::ConfigRead {
            path: config_path.clone(),
            source: e,
        })?;
    }

    let config_content = format!("api_url = \"{api_url}\"\n");
    std::fs::write(&config_path, config_content).map_err(|e| HelpdeskError::ConfigRead {
        path: config_path.clone(),
        source: e,
    })?;

    println!("\nConfig saved to {}", config_path.display());
    println!("Sign in with 'helpdesk sign-in <username>'.");

    Ok(())
}
