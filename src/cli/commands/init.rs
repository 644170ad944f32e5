use anyhow::{bail, Result};
use std::path::Path;

use crate::cli::config::{Config, CONFIG_FILENAME};
use crate::cli::InitArgs;

pub fn execute_init(args: InitArgs) -> Result<()> {
    if Path::new(CONFIG_FILENAME).exists() && !args.force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            CONFIG_FILENAME
        );
    }

    let config = Config::new(args.url, args.database);
    config.validate()?;
    config.save_to(CONFIG_FILENAME)?;

    eprintln!("Created {}", CONFIG_FILENAME);
    eprintln!("  url: {}", config.influx.url);
    eprintln!("  database: {}", config.influx.database);
    eprintln!();
    eprintln!("Next: build2influx serve");

    Ok(())
}
