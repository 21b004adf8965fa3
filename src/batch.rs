use camino::Utf8Path;
use serde::Serialize;

use crate::app::{App, MaterializeOptions, ProgressEvent, ProgressSink};
use crate::config::BatchConfig;
use crate::domain::{Classification, Selection, Year};
use crate::error::GhgError;
use crate::exiobase::ExiobaseClient;
use crate::geo::GeoJsonClient;
use crate::matrix::TradeMatrix;
use crate::output::save_country_csv;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub classification: Classification,
    pub years: Vec<YearReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct YearReport {
    pub year: u16,
    pub matrix_action: String,
    pub written: usize,
    pub skipped: usize,
}

/// Produces `internal.csv` plus one import and one export CSV per region for
/// every year of the batch range. Existing per-region files are kept.
pub fn run_batch<E: ExiobaseClient, G: GeoJsonClient>(
    app: &App<E, G>,
    batch: &BatchConfig,
    sink: &dyn ProgressSink,
) -> Result<BatchReport, GhgError> {
    let mut years = Vec::new();
    for year in Year::range(batch.first_year, batch.last_year) {
        years.push(run_year(app, year, batch.classification, sink)?);
    }
    Ok(BatchReport {
        classification: batch.classification,
        years,
    })
}

pub fn run_year<E: ExiobaseClient, G: GeoJsonClient>(
    app: &App<E, G>,
    year: Year,
    classification: Classification,
    sink: &dyn ProgressSink,
) -> Result<YearReport, GhgError> {
    let store = app.store();
    store.ensure_year_dirs(year)?;

    let (matrix, result) =
        app.ensure_matrix(year, classification, MaterializeOptions::default(), sink)?;
    let mut report = YearReport {
        year: year.value(),
        matrix_action: result.action,
        ..YearReport::default()
    };

    write_selection(app, &matrix, &Selection::Internal, &store.internal_csv_path(year))?;
    report.written += 1;

    for region in matrix.regions() {
        let outputs = [
            (
                Selection::Imports {
                    target: region.clone(),
                },
                store.import_csv_path(year, region),
            ),
            (
                Selection::Exports {
                    origin: region.clone(),
                },
                store.export_csv_path(year, region),
            ),
        ];
        for (selection, path) in outputs {
            if Store::exists(&path) {
                tracing::debug!(%path, "output exists; skipping");
                report.skipped += 1;
                continue;
            }
            write_selection(app, &matrix, &selection, &path)?;
            report.written += 1;
        }
    }

    sink.event(ProgressEvent::phase(format!(
        "phase=Batch; {year}: {} written, {} skipped",
        report.written, report.skipped
    )));
    Ok(report)
}

fn write_selection<E: ExiobaseClient, G: GeoJsonClient>(
    app: &App<E, G>,
    matrix: &TradeMatrix,
    selection: &Selection,
    path: &Utf8Path,
) -> Result<(), GhgError> {
    let series = matrix.extract_series(selection)?;
    let countries = app.expand(&series, selection)?;
    save_country_csv(path, &countries)
}
