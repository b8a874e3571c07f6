use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use inkpost::config::{read_config, Config};

use crate::config_data::write_sample_cfg;
use crate::CFG_FILE_NAME;

fn get_config_path() -> Option<PathBuf> {
    let candidates = [
        env::current_exe().ok().and_then(|exe| exe.parent().map(|dir| dir.join(CFG_FILE_NAME))),
        env::current_dir().ok().map(|dir| dir.join(CFG_FILE_NAME)),
        dirs::config_dir().map(|dir| dir.join(CFG_FILE_NAME)),
    ];

    candidates.into_iter()
        .flatten()
        .find(|path| path.exists())
}

pub(crate) fn open_config(cfg_path: Option<PathBuf>) -> Result<Config> {
    let config_path = cfg_path.or_else(get_config_path)
        .ok_or_else(|| anyhow!("Could not find inkpost configuration. Please run inkpost --help"))?;

    println!("Reading config from {}", config_path.display());
    let mut config = read_config(&config_path)?;

    if let Some(ref mut log) = config.log {
        if let Some(ref location) = log.location {
            println!("Log enabled. Files will be written in {}", location.display());
        } else if !log.log_to_console {
            let location = dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join("inkpost").join("log").join("server.log");
            println!("Log enabled. Files will be written in {}", location.display());
            log.location = Some(location);
        }
    } else {
        println!("Log disabled. Using stdout");
    }

    Ok(config)
}

pub(crate) fn generate_cfg(config_path: Option<PathBuf>) -> Result<PathBuf> {
    let path = config_path.or_else(|| dirs::config_dir().map(|dir| dir.join(CFG_FILE_NAME)))
        .ok_or_else(|| anyhow!("Could not find user config dir"))?;

    println!("Writing sample config to {}", path.display());
    write_sample_cfg(&path).with_context(|| format!("Error writing {}", path.display()))?;

    Ok(path)
}
