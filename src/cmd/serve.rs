use clap::Args;

use crate::api;
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Override RELAY_LISTEN_ADDR.
    #[arg(short, long)]
    pub listen: Option<String>,
}

pub async fn run(args: ServeArgs) -> AppResult<()> {
    let config = AppConfig::load()?;

    for setting in config.missing_settings() {
        tracing::warn!(setting, "not configured; calls that need it will fail");
    }

    let addr = args.listen.unwrap_or_else(|| config.listen_addr.clone());
    let context = AppContext::from_config(config)?;

    api::serve(context, &addr).await
}
