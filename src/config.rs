use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Classification, Year};
use crate::error::GhgError;
use crate::exiobase::DEFAULT_SOURCE_URL;
use crate::geo::DEFAULT_GEOJSON_URL;
use crate::store::Store;

pub const DEFAULT_CONFIG_FILE: &str = "exio-ghg.json";
pub const DEFAULT_YEAR: u16 = 2017;
pub const DEFAULT_BATCH_FIRST_YEAR: u16 = 1999;
pub const DEFAULT_BATCH_LAST_YEAR: u16 = 2020;
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub classification: Option<Classification>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub geojson_url: Option<String>,
    #[serde(default)]
    pub correspondence: Option<String>,
    #[serde(default)]
    pub batch: Option<BatchSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BatchSection {
    #[serde(default)]
    pub first_year: Option<u16>,
    #[serde(default)]
    pub last_year: Option<u16>,
    #[serde(default)]
    pub classification: Option<Classification>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default)]
    pub bind: Option<String>,
}

/// Settings every pipeline stage receives explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub folder: Utf8PathBuf,
    pub year: Year,
    pub classification: Classification,
    pub source_url: String,
    pub geojson_url: String,
    pub correspondence: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub first_year: Year,
    pub last_year: Year,
    pub classification: Classification,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub pipeline: PipelineConfig,
    pub batch: BatchConfig,
    pub server: ServerConfig,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `exio-ghg.json` from the working directory when it
    /// exists; built-in defaults otherwise.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GhgError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GhgError::ConfigRead(config_path.clone()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|err| GhgError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GhgError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let folder = match config.folder {
            Some(folder) => Utf8PathBuf::from(folder),
            None => Store::default_root()?,
        };
        let pipeline = PipelineConfig {
            folder,
            year: Year::new(config.year.unwrap_or(DEFAULT_YEAR))?,
            classification: config.classification.unwrap_or(Classification::Ixi),
            source_url: config
                .source_url
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            geojson_url: config
                .geojson_url
                .unwrap_or_else(|| DEFAULT_GEOJSON_URL.to_string()),
            correspondence: config.correspondence.map(Utf8PathBuf::from),
        };

        let batch_section = config.batch.unwrap_or_default();
        let batch = BatchConfig {
            first_year: Year::new(batch_section.first_year.unwrap_or(DEFAULT_BATCH_FIRST_YEAR))?,
            last_year: Year::new(batch_section.last_year.unwrap_or(DEFAULT_BATCH_LAST_YEAR))?,
            classification: batch_section.classification.unwrap_or(Classification::Pxp),
        };
        if batch.first_year > batch.last_year {
            return Err(GhgError::ConfigParse(format!(
                "batch range {}..={} is empty",
                batch.first_year, batch.last_year
            )));
        }

        let bind = config
            .server
            .and_then(|server| server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let server = ServerConfig {
            bind: bind
                .parse()
                .map_err(|_| GhgError::ConfigParse(format!("invalid bind address: {bind}")))?,
        };

        Ok(ResolvedConfig {
            schema_version,
            pipeline,
            batch,
            server,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_batch_script() {
        let config = Config {
            folder: Some("/tmp/exio".to_string()),
            ..Config::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.pipeline.year.value(), 2017);
        assert_eq!(resolved.pipeline.classification, Classification::Ixi);
        assert_eq!(resolved.batch.first_year.value(), 1999);
        assert_eq!(resolved.batch.last_year.value(), 2020);
        assert_eq!(resolved.batch.classification, Classification::Pxp);
        assert_eq!(resolved.server.bind.port(), 8000);
    }
}
