use std::time::Duration;

use geojson::GeoJson;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::error::GhgError;

/// World country outlines keyed by ISO3 feature id.
pub const DEFAULT_GEOJSON_URL: &str =
    "https://raw.githubusercontent.com/johan/world.geo.json/refs/heads/master/countries.geo.json";

pub trait GeoJsonClient: Send + Sync {
    fn fetch_countries(&self) -> Result<String, GhgError>;
}

#[derive(Clone)]
pub struct GeoJsonHttpClient {
    client: Client,
    url: String,
}

impl GeoJsonHttpClient {
    pub fn new(url: impl Into<String>) -> Result<Self, GhgError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("exio-ghg/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GhgError::GeoJsonHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GhgError::GeoJsonHttp(err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl GeoJsonClient for GeoJsonHttpClient {
    fn fetch_countries(&self) -> Result<String, GhgError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|err| GhgError::GeoJsonHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GeoJSON request failed".to_string());
            return Err(GhgError::GeoJsonStatus { status, message });
        }
        response
            .text()
            .map_err(|err| GhgError::GeoJsonHttp(err.to_string()))
    }
}

/// Checks that `text` is a GeoJSON feature collection and returns it as a
/// JSON value ready to embed in a figure.
pub fn parse_countries(text: &str) -> Result<Value, GhgError> {
    let geojson = text
        .parse::<GeoJson>()
        .map_err(|err| GhgError::GeoJsonParse(err.to_string()))?;
    match geojson {
        GeoJson::FeatureCollection(collection) => {
            let missing_id = collection
                .features
                .iter()
                .filter(|feature| feature.id.is_none())
                .count();
            if missing_id > 0 {
                tracing::warn!(missing_id, "GeoJSON features without id will not be matched");
            }
            serde_json::to_value(&collection).map_err(|err| GhgError::GeoJsonParse(err.to_string()))
        }
        _ => Err(GhgError::GeoJsonParse(
            "expected a FeatureCollection".to_string(),
        )),
    }
}
