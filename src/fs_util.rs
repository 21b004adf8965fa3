use std::fs;
use std::io::{self, BufReader};
use std::path::Path;

use zip::ZipArchive;

use crate::error::GhgError;

/// Name of the inter-sector transaction table inside an EXIOBASE archive.
pub const TRANSACTION_TABLE: &str = "Z.txt";

pub fn validate_zip(zip_path: &Path) -> Result<(), GhgError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| GhgError::Archive(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| GhgError::Archive(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| GhgError::Archive(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink()).map_err(|err| GhgError::Archive(err.to_string()))?;
    }
    Ok(())
}

/// Streams the archive member whose file name is `file_name` (at any depth)
/// into `read`.
pub fn with_zip_entry<T>(
    zip_path: &Path,
    file_name: &str,
    read: impl FnOnce(&mut dyn io::BufRead) -> Result<T, GhgError>,
) -> Result<T, GhgError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| GhgError::Archive(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| GhgError::Archive(err.to_string()))?;

    let mut found = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|err| GhgError::Archive(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let Some(path) = entry.enclosed_name() else {
            return Err(GhgError::Archive(
                "zip entry path traversal detected".to_string(),
            ));
        };
        if path.file_name().map(|name| name == file_name).unwrap_or(false) {
            found = Some(i);
            break;
        }
    }

    let index = found.ok_or_else(|| {
        GhgError::Archive(format!(
            "{} does not contain {file_name}",
            zip_path.display()
        ))
    })?;
    let entry = archive
        .by_index(index)
        .map_err(|err| GhgError::Archive(err.to_string()))?;
    let mut reader = BufReader::new(entry);
    read(&mut reader)
}
