use clap::{Args, Subcommand};

use crate::config::AppConfig;
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the configuration read from the environment (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Show => run_show(),
    }
}

fn run_show() -> AppResult<()> {
    let cfg = AppConfig::load()?;

    println!("Listen address: {}", cfg.listen_addr);
    println!("Outbound timeout: {}s", cfg.http_timeout.as_secs());
    println!("Max body size: {} bytes", cfg.max_body_bytes);
    println!("Validate file paths: {}", cfg.repository.validate_file_paths);
    println!();
    println!("Branch: {}", display_value(&cfg.repository.branch));
    println!("Folder: {}", display_str(&cfg.repository.folder_path));
    println!();
    println!("GitHub API: {}", cfg.github.base_url);
    println!("GitHub owner: {}", display_value(&cfg.github.owner));
    println!("GitHub repository: {}", display_value(&cfg.github.repo));
    println!("GitHub token: {}", mask_secret(&cfg.github.access_token));
    println!();
    println!("Bitbucket API: {}", cfg.bitbucket.base_url);
    println!("Bitbucket workspace: {}", display_value(&cfg.bitbucket.workspace));
    println!("Bitbucket repository: {}", display_value(&cfg.bitbucket.repo_slug));
    println!("Bitbucket token: {}", mask_secret(&cfg.bitbucket.access_token));
    println!();
    let service_now = &cfg.service_now;
    println!("ServiceNow instance: {}", display_value(&service_now.instance_url));
    println!("ServiceNow OAuth path: {}", service_now.oauth_path);
    println!("ServiceNow ticket path: {}", service_now.ticket_path);
    println!(
        "ServiceNow client id: {}",
        display_value(&service_now.credentials.client_id)
    );
    println!(
        "ServiceNow client secret: {}",
        mask_secret(&service_now.credentials.client_secret)
    );
    println!(
        "ServiceNow username: {}",
        display_value(&service_now.credentials.username)
    );
    println!(
        "ServiceNow password: {}",
        mask_secret(&service_now.credentials.password)
    );

    Ok(())
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(display_str)
        .unwrap_or_else(|| "<not set>".to_string())
}

fn display_str(value: &str) -> String {
    if value.is_empty() {
        "<not set>".to_string()
    } else {
        value.to_string()
    }
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let chars: Vec<char> = token.chars().collect();
            let prefix: String = chars[..3].iter().collect();
            let suffix: String = chars[chars.len() - 3..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}
