use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::app::{CachedList, MatrixResult};
use crate::batch::BatchReport;
use crate::correspondence::CountrySeries;
use crate::error::GhgError;
use crate::matrix::RegionSeries;
use crate::store::Store;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_matrix(result: &MatrixResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_cached(result: &CachedList) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_batch(result: &BatchReport) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, _event: crate::app::ProgressEvent) {}
}

/// Writes `country,emission` rows.
pub fn write_country_csv(writer: impl Write, series: &CountrySeries) -> Result<(), GhgError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in series.rows() {
        csv_writer
            .serialize(row)
            .map_err(|err| GhgError::Csv(err.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|err| GhgError::Csv(err.to_string()))
}

/// Writes `region,emission` rows.
pub fn write_region_csv(writer: impl Write, series: &RegionSeries) -> Result<(), GhgError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in series.rows() {
        csv_writer
            .serialize(row)
            .map_err(|err| GhgError::Csv(err.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|err| GhgError::Csv(err.to_string()))
}

pub fn save_country_csv(path: &Utf8Path, series: &CountrySeries) -> Result<(), GhgError> {
    Store::write_atomic(path, |temp| {
        let file =
            std::fs::File::create(temp).map_err(|err| GhgError::Filesystem(err.to_string()))?;
        write_country_csv(file, series)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CountryCode;

    #[test]
    fn country_csv_has_header_and_rows() {
        let usa: CountryCode = "USA".parse().unwrap();
        let can: CountryCode = "CAN".parse().unwrap();
        let series = CountrySeries::new(vec![(usa, 10), (can, 10)]);
        let mut buffer = Vec::new();
        write_country_csv(&mut buffer, &series).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "country,emission\nUSA,10\nCAN,10\n"
        );
    }
}
