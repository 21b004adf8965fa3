use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GhgError {
    #[error("invalid year: {0} (EXIOBASE 3 covers 1995-2022)")]
    InvalidYear(String),

    #[error("invalid classification: {0} (expected ixi, pxp, industry-by-industry or product-by-product)")]
    InvalidClassification(String),

    #[error("invalid region code: {0}")]
    InvalidRegion(String),

    #[error("invalid ISO3 country code: {0}")]
    InvalidCountry(String),

    #[error("region {region} not found in {context}")]
    #[diagnostic(help("region codes are two-letter EXIOBASE codes such as AT, US or WA"))]
    UnknownRegion { region: String, context: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("EXIOBASE request failed: {0}")]
    ExiobaseHttp(String),

    #[error("EXIOBASE returned status {status}: {message}")]
    ExiobaseStatus { status: u16, message: String },

    #[error("GeoJSON request failed: {0}")]
    GeoJsonHttp(String),

    #[error("GeoJSON returned status {status}: {message}")]
    GeoJsonStatus { status: u16, message: String },

    #[error("invalid GeoJSON: {0}")]
    GeoJsonParse(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("failed to parse transaction table: {0}")]
    TableParse(String),

    #[error("cache artifact format error: {0}")]
    CacheFormat(String),

    #[error("cache artifact failed integrity check: {0}")]
    #[diagnostic(help("rebuild it with `exio-ghg matrix --force`"))]
    CacheIntegrity(String),

    #[error("invalid correspondence table: {0}")]
    Correspondence(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("server error: {0}")]
    Server(String),
}

impl GhgError {
    pub fn unknown_region(region: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownRegion {
            region: region.into(),
            context: context.into(),
        }
    }
}
