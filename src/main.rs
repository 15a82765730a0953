use env_logger::Env;

use obdash::app;
use obdash::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::load().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    app::run(config).await?;

    Ok(())
}
