use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    config::{ClientConfig, default_storage_path},
    runtime::Runtime,
};

/// Values collected from the command line and environment.
#[derive(Debug, Clone)]
pub struct Options {
    pub api_url: String,
    pub storage: Option<PathBuf>,
    pub success_code: i64,
    pub expired_code: i64,
    pub timeout_secs: u64,
}

pub struct Config {
    pub client: ClientConfig,
    pub storage_path: PathBuf,
}

impl Config {
    pub fn load<R: Runtime>(runtime: &R, options: Options) -> Result<Self> {
        let client = ClientConfig::new(options.api_url)
            .with_success_code(options.success_code)
            .with_expired_code(options.expired_code)
            .with_timeout(Duration::from_secs(options.timeout_secs));
        client.validate()?;

        let storage_path = match options.storage {
            Some(path) => path,
            None => default_storage_path(runtime)?,
        };
        debug!("Using credential storage {:?}", storage_path);

        Ok(Self {
            client,
            storage_path,
        })
    }
}
