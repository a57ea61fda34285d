//! Configuration view and validation: `taskboard config`.

use anyhow::{Result, bail};

use taskboard::config::ServiceConfig;

pub fn cmd_config(config: &ServiceConfig, validate: bool) -> Result<()> {
    let problems = config.validate();

    if validate {
        if problems.is_empty() {
            println!("Configuration is valid.");
            return Ok(());
        }
        for problem in &problems {
            println!("  - {}", problem);
        }
        bail!("Configuration has {} problem(s)", problems.len());
    }

    print!("{}", config.to_toml()?);
    for problem in &problems {
        eprintln!("warning: {}", problem);
    }
    Ok(())
}
