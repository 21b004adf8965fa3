use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{Classification, Year};
use crate::error::GhgError;

/// Files of the EXIOBASE 3.8.2 monetary release.
pub const DEFAULT_SOURCE_URL: &str = "https://zenodo.org/records/5589597/files";

pub trait ExiobaseClient: Send + Sync {
    /// Downloads `IOT_<year>_<classification>.zip` to `destination`.
    fn download_archive(
        &self,
        year: Year,
        classification: Classification,
        destination: &Path,
    ) -> Result<(), GhgError>;

    fn archive_url(&self, year: Year, classification: Classification) -> String;
}

pub fn archive_file_name(year: Year, classification: Classification) -> String {
    format!("IOT_{year}_{classification}.zip")
}

#[derive(Clone)]
pub struct ExiobaseHttpClient {
    client: Client,
    base_url: String,
}

impl ExiobaseHttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GhgError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("exio-ghg/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GhgError::ExiobaseHttp(err.to_string()))?,
        );
        // Full archives run to several hundred megabytes.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60 * 30))
            .build()
            .map_err(|err| GhgError::ExiobaseHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn write_response_to_file(
        &self,
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<(), GhgError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "EXIOBASE request failed".to_string());
            return Err(GhgError::ExiobaseStatus { status, message });
        }
        let mut file =
            File::create(destination).map_err(|err| GhgError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| GhgError::ExiobaseHttp(err.to_string()))?;
        Ok(())
    }
}

impl ExiobaseClient for ExiobaseHttpClient {
    fn download_archive(
        &self,
        year: Year,
        classification: Classification,
        destination: &Path,
    ) -> Result<(), GhgError> {
        let url = self.archive_url(year, classification);
        tracing::info!(%url, "downloading EXIOBASE archive");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| GhgError::ExiobaseHttp(err.to_string()))?;
        self.write_response_to_file(response, destination)
    }

    fn archive_url(&self, year: Year, classification: Classification) -> String {
        format!(
            "{}/{}?download=1",
            self.base_url,
            archive_file_name(year, classification)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_url_layout() {
        let client = ExiobaseHttpClient::new("https://example.org/files/").unwrap();
        let year: Year = "2017".parse().unwrap();
        assert_eq!(
            client.archive_url(year, Classification::Pxp),
            "https://example.org/files/IOT_2017_pxp.zip?download=1"
        );
    }
}
