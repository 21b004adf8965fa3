use std::fs;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;
use serde_json::Value;

use crate::correspondence::{CorrespondenceTable, CountrySeries, expand_region, expand_to_countries};
use crate::domain::{Classification, Selection, Year};
use crate::error::GhgError;
use crate::exiobase::ExiobaseClient;
use crate::geo::{GeoJsonClient, parse_countries};
use crate::matrix::{RegionSeries, TradeMatrix};
use crate::render::render_map_page;
use crate::store::{CachedMatrix, MatrixMetadata, Store};

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterializeOptions {
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixResult {
    pub year: Year,
    pub classification: Classification,
    pub path: String,
    pub regions: usize,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedList {
    pub folder: String,
    pub matrices: Vec<CachedMatrix>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn phase(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress events to the `tracing` subscriber.
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message)
            }
            None => tracing::info!("{}", event.message),
        }
    }
}

pub struct App<E: ExiobaseClient, G: GeoJsonClient> {
    store: Store,
    exiobase: E,
    geojson: G,
    correspondence: CorrespondenceTable,
}

impl<E: ExiobaseClient, G: GeoJsonClient> App<E, G> {
    pub fn new(store: Store, exiobase: E, geojson: G, correspondence: CorrespondenceTable) -> Self {
        Self {
            store,
            exiobase,
            geojson,
            correspondence,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn correspondence(&self) -> &CorrespondenceTable {
        &self.correspondence
    }

    /// Returns the trade matrix for `(year, classification)`, building and
    /// caching it on first use.
    pub fn ensure_matrix(
        &self,
        year: Year,
        classification: Classification,
        options: MaterializeOptions,
        sink: &dyn ProgressSink,
    ) -> Result<(TradeMatrix, MatrixResult), GhgError> {
        let matrix_path = self.store.matrix_path(year, classification);
        sink.event(ProgressEvent::phase(format!(
            "phase=Resolve; IOT {year} {}",
            classification.long_name()
        )));

        if !options.force && Store::exists(&matrix_path) {
            sink.event(ProgressEvent::phase("phase=Store; using cached matrix"));
            let matrix = self.load_matrix(year, classification)?;
            let result = self.matrix_result(year, classification, &matrix, "cache");
            return Ok((matrix, result));
        }

        self.store.ensure_root()?;
        let archive_path = self.store.archive_path(year, classification);

        sink.event(ProgressEvent::phase(format!(
            "phase=Download; {}",
            self.exiobase.archive_url(year, classification)
        )));
        let start = Instant::now();
        Store::write_atomic(&archive_path, |temp| {
            self.exiobase.download_archive(year, classification, temp)
        })?;
        sink.event(ProgressEvent {
            message: "exiobase.response".to_string(),
            elapsed: Some(start.elapsed()),
        });

        let start = Instant::now();
        let matrix = match read_downloaded_archive(&archive_path, sink) {
            Ok(matrix) => matrix,
            Err(err) => {
                // No unreadable archive is left in the folder.
                if let Err(remove_err) = Store::remove_file(&archive_path) {
                    tracing::warn!(path = %archive_path, "failed to remove archive: {remove_err}");
                }
                return Err(err);
            }
        };
        sink.event(ProgressEvent {
            message: format!("phase=Aggregate; {} regions", matrix.size()),
            elapsed: Some(start.elapsed()),
        });

        sink.event(ProgressEvent::phase("phase=Store; writing matrix"));
        Store::write_atomic(&matrix_path, |temp| matrix.write_feather(temp))?;
        let metadata = MatrixMetadata {
            year,
            classification,
            regions: matrix.regions().to_vec(),
            source_url: self.exiobase.archive_url(year, classification),
            created_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("exio-ghg/{}", env!("CARGO_PKG_VERSION")),
        };
        Store::write_metadata(&self.store.metadata_path(year, classification), &metadata)?;

        sink.event(ProgressEvent::phase("phase=Store; deleting archive"));
        Store::remove_file(&archive_path)?;

        let result = self.matrix_result(year, classification, &matrix, "download");
        Ok((matrix, result))
    }

    /// Loads a cached matrix and checks it against its metadata sidecar.
    pub fn load_matrix(
        &self,
        year: Year,
        classification: Classification,
    ) -> Result<TradeMatrix, GhgError> {
        let matrix_path = self.store.matrix_path(year, classification);
        let matrix = TradeMatrix::read_feather(matrix_path.as_std_path())?;

        let metadata_path = self.store.metadata_path(year, classification);
        match Store::read_metadata(&metadata_path)? {
            Some(metadata) => {
                if metadata.year != year || metadata.classification != classification {
                    return Err(GhgError::CacheIntegrity(format!(
                        "{matrix_path} was recorded as IOT {} {}",
                        metadata.year, metadata.classification
                    )));
                }
                if metadata.regions.as_slice() != matrix.regions() {
                    return Err(GhgError::CacheIntegrity(format!(
                        "{matrix_path} holds {} regions, metadata lists {}",
                        matrix.size(),
                        metadata.regions.len()
                    )));
                }
            }
            None => {
                tracing::warn!(path = %matrix_path, "no metadata sidecar; trusting cached matrix");
            }
        }
        Ok(matrix)
    }

    pub fn list_cached(&self) -> Result<CachedList, GhgError> {
        Ok(CachedList {
            folder: self.store.root().to_string(),
            matrices: self.store.list_matrices()?,
        })
    }

    pub fn region_series(
        &self,
        year: Year,
        classification: Classification,
        selection: &Selection,
        sink: &dyn ProgressSink,
    ) -> Result<RegionSeries, GhgError> {
        let (matrix, _) =
            self.ensure_matrix(year, classification, MaterializeOptions::default(), sink)?;
        sink.event(ProgressEvent::phase(format!(
            "phase=Slice; {}",
            selection.label()
        )));
        matrix.extract_series(selection)
    }

    pub fn country_series(
        &self,
        year: Year,
        classification: Classification,
        selection: &Selection,
        sink: &dyn ProgressSink,
    ) -> Result<CountrySeries, GhgError> {
        let series = self.region_series(year, classification, selection, sink)?;
        self.expand(&series, selection)
    }

    /// Country view of `series`; a single flow only covers its target region.
    pub fn expand(
        &self,
        series: &RegionSeries,
        selection: &Selection,
    ) -> Result<CountrySeries, GhgError> {
        match selection {
            Selection::Flow { target, .. } => {
                let value = series
                    .get(target)
                    .ok_or_else(|| GhgError::unknown_region(target.as_str(), "emission series"))?;
                expand_region(target, value, &self.correspondence)
            }
            _ => expand_to_countries(series, &self.correspondence),
        }
    }

    pub fn map_page(
        &self,
        year: Year,
        classification: Classification,
        selection: &Selection,
        sink: &dyn ProgressSink,
    ) -> Result<String, GhgError> {
        let countries = self.country_series(year, classification, selection, sink)?;
        let geojson = self.countries_geojson(sink)?;
        sink.event(ProgressEvent::phase("phase=Render; choropleth"));
        render_map_page(year, &countries, &geojson)
    }

    /// Country outlines, downloaded once and kept next to the matrices.
    pub fn countries_geojson(&self, sink: &dyn ProgressSink) -> Result<Value, GhgError> {
        let path = self.store.geojson_path();
        if Store::exists(&path) {
            let text = fs::read_to_string(path.as_std_path())
                .map_err(|err| GhgError::Filesystem(err.to_string()))?;
            return parse_countries(&text);
        }

        sink.event(ProgressEvent::phase("phase=Download; country outlines"));
        let text = self.geojson.fetch_countries()?;
        let value = parse_countries(&text)?;
        Store::write_bytes_atomic(&path, text.as_bytes())?;
        Ok(value)
    }

    fn matrix_result(
        &self,
        year: Year,
        classification: Classification,
        matrix: &TradeMatrix,
        action: &str,
    ) -> MatrixResult {
        MatrixResult {
            year,
            classification,
            path: self.store.matrix_path(year, classification).to_string(),
            regions: matrix.size(),
            action: action.to_string(),
        }
    }
}

fn read_downloaded_archive(
    archive_path: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<TradeMatrix, GhgError> {
    sink.event(ProgressEvent::phase("phase=Verify; validating archive"));
    crate::fs_util::validate_zip(archive_path.as_std_path())?;
    sink.event(ProgressEvent::phase("phase=Aggregate; summing flows by region"));
    crate::iot::read_archive(archive_path.as_std_path())
}
