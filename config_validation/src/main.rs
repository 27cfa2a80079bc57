use std::{env, fs, process};

use anyhow::Context;
use log::{error, info};

use config_validation::validate_config;

const SKIP_AUXILIARY_FLAG: &str = "--skip-auxiliary";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let include_auxiliary = !args.iter().any(|a| a == SKIP_AUXILIARY_FLAG);
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("Usage: validate <config.json> [{SKIP_AUXILIARY_FLAG}]");
        process::exit(2);
    };

    let raw = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let config = serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    match validate_config(&config, include_auxiliary) {
        Ok(upgraded) => {
            info!("{path} is valid");
            println!("{}", serde_json::to_string_pretty(&upgraded)?);
            Ok(())
        }
        Err(e) => {
            error!("{path} is invalid");
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
