use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::{Classification, RegionCode, Year};
use crate::error::GhgError;

pub const GEOJSON_FILE: &str = "countries.geo.json";

/// Directory layout of cached matrices and generated outputs under one root
/// folder.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn default_root() -> Result<Utf8PathBuf, GhgError> {
        BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().join("exio-ghg")).ok())
            .ok_or_else(|| GhgError::Filesystem("unable to resolve data directory".to_string()))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn artifact_stem(year: Year, classification: Classification) -> String {
        format!("IOT_{year}_{classification}")
    }

    pub fn matrix_path(&self, year: Year, classification: Classification) -> Utf8PathBuf {
        self.root
            .join(format!("{}.feather", Self::artifact_stem(year, classification)))
    }

    pub fn metadata_path(&self, year: Year, classification: Classification) -> Utf8PathBuf {
        self.root
            .join(format!("{}.meta.json", Self::artifact_stem(year, classification)))
    }

    pub fn archive_path(&self, year: Year, classification: Classification) -> Utf8PathBuf {
        self.root
            .join(format!("{}.zip", Self::artifact_stem(year, classification)))
    }

    pub fn geojson_path(&self) -> Utf8PathBuf {
        self.root.join(GEOJSON_FILE)
    }

    pub fn year_dir(&self, year: Year) -> Utf8PathBuf {
        self.root.join(year.to_string())
    }

    pub fn internal_csv_path(&self, year: Year) -> Utf8PathBuf {
        self.year_dir(year).join("internal.csv")
    }

    pub fn imports_dir(&self, year: Year) -> Utf8PathBuf {
        self.year_dir(year).join("imports")
    }

    pub fn exports_dir(&self, year: Year) -> Utf8PathBuf {
        self.year_dir(year).join("exports")
    }

    pub fn import_csv_path(&self, year: Year, region: &RegionCode) -> Utf8PathBuf {
        self.imports_dir(year).join(format!("{region}.csv"))
    }

    pub fn export_csv_path(&self, year: Year, region: &RegionCode) -> Utf8PathBuf {
        self.exports_dir(year).join(format!("{region}.csv"))
    }

    pub fn ensure_root(&self) -> Result<(), GhgError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| GhgError::Filesystem(err.to_string()))
    }

    pub fn ensure_year_dirs(&self, year: Year) -> Result<(), GhgError> {
        for dir in [self.imports_dir(year), self.exports_dir(year)] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| GhgError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }

    pub fn exists(path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    pub fn remove_file(path: &Utf8Path) -> Result<(), GhgError> {
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| GhgError::Filesystem(format!("remove {path}: {err}")))?;
        }
        Ok(())
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &MatrixMetadata) -> Result<(), GhgError> {
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| GhgError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn read_metadata(path: &Utf8Path) -> Result<Option<MatrixMetadata>, GhgError> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| GhgError::Filesystem(err.to_string()))?;
        let metadata = serde_json::from_str(&content)
            .map_err(|err| GhgError::CacheIntegrity(format!("{path}: {err}")))?;
        Ok(Some(metadata))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), GhgError> {
        Self::write_atomic(path, |temp| {
            fs::write(temp, content).map_err(|err| GhgError::Filesystem(err.to_string()))
        })
    }

    /// Runs `write` against a temporary file next to `path`, then moves it
    /// into place.
    pub fn write_atomic(
        path: &Utf8Path,
        write: impl FnOnce(&std::path::Path) -> Result<(), GhgError>,
    ) -> Result<(), GhgError> {
        let parent = path
            .parent()
            .ok_or_else(|| GhgError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| GhgError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix("exio-ghg")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| GhgError::Filesystem(err.to_string()))?;
        write(temp.path())?;
        temp.persist(path.as_std_path())
            .map_err(|err| GhgError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Cached matrices found directly under the root, sorted by year.
    pub fn list_matrices(&self) -> Result<Vec<CachedMatrix>, GhgError> {
        if !self.root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let pattern = Regex::new(r"^IOT_(\d{4})_(ixi|pxp)\.feather$")
            .map_err(|err| GhgError::Filesystem(err.to_string()))?;
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| GhgError::Filesystem(err.to_string()))?;

        let mut items = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| GhgError::Filesystem(err.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(captures) = pattern.captures(&name) else {
                continue;
            };
            let Ok(year) = captures[1].parse::<Year>() else {
                continue;
            };
            let classification = captures[2].parse::<Classification>()?;
            items.push(CachedMatrix {
                year,
                classification,
                path: self.root.join(&name).to_string(),
                has_metadata: self.metadata_path(year, classification).exists(),
            });
        }
        items.sort_by_key(|item| (item.year, item.classification.as_str()));
        Ok(items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixMetadata {
    pub year: Year,
    pub classification: Classification,
    pub regions: Vec<RegionCode>,
    pub source_url: String,
    pub created_at: String,
    pub tool: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedMatrix {
    pub year: Year,
    pub classification: Classification,
    pub path: String,
    pub has_metadata: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new(Utf8PathBuf::from("/data/exio"));
        let year: Year = "2017".parse().unwrap();
        let at: RegionCode = "AT".parse().unwrap();

        assert_eq!(
            store.matrix_path(year, Classification::Ixi),
            Utf8PathBuf::from("/data/exio/IOT_2017_ixi.feather")
        );
        assert!(store
            .metadata_path(year, Classification::Pxp)
            .ends_with("IOT_2017_pxp.meta.json"));
        assert!(store.archive_path(year, Classification::Pxp).ends_with("IOT_2017_pxp.zip"));
        assert!(store.geojson_path().ends_with("countries.geo.json"));
        assert!(store.internal_csv_path(year).ends_with("2017/internal.csv"));
        assert!(store.import_csv_path(year, &at).ends_with("2017/imports/AT.csv"));
        assert!(store.export_csv_path(year, &at).ends_with("2017/exports/AT.csv"));
    }
}
