use anyhow::{Result, bail};

use taskboard::board::server;
use taskboard::config::ServiceConfig;

pub async fn cmd_serve(config: ServiceConfig) -> Result<()> {
    check(&config)?;
    server::start_server(config).await
}

pub fn cmd_init_db(config: &ServiceConfig) -> Result<()> {
    check(config)?;
    server::open_database(config)?;
    println!(
        "Taskboard database initialized at {}",
        config.database.path.display()
    );
    Ok(())
}

fn check(config: &ServiceConfig) -> Result<()> {
    let problems = config.validate();
    if !problems.is_empty() {
        bail!("Invalid configuration: {}", problems.join("; "));
    }
    Ok(())
}
