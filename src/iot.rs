//! Reader for the `Z` transaction table shipped in EXIOBASE 3 archives.
//!
//! The table is tab separated with multi-level headers. The first record
//! carries the column regions; further column-level records (sectors) leave
//! the row index fields after the first one blank; an optional index-names
//! record fills the index fields and leaves every value field blank. All
//! records after the header are data: a row region, the remaining index
//! fields, then one value per column. Only the region levels are kept; sector
//! detail is summed away.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIter, Trim};

use crate::domain::RegionCode;
use crate::error::GhgError;
use crate::fs_util::{TRANSACTION_TABLE, with_zip_entry};
use crate::matrix::TradeMatrix;

/// Aggregates the `Z.txt` member of an archive into a region trade matrix.
pub fn read_archive(zip_path: &Path) -> Result<TradeMatrix, GhgError> {
    with_zip_entry(zip_path, TRANSACTION_TABLE, |reader| {
        aggregate_transactions(reader)
    })
}

/// Column layout decoded from the first header record.
struct Layout {
    index_width: usize,
    regions: Vec<RegionCode>,
    positions: HashMap<RegionCode, usize>,
    column_region: Vec<usize>,
}

impl Layout {
    fn from_header(header: &StringRecord) -> Result<Self, GhgError> {
        let labels = header
            .iter()
            .skip(1)
            .filter(|field| !field.is_empty())
            .collect::<Vec<_>>();
        if labels.is_empty() {
            return Err(GhgError::TableParse("header carries no regions".to_string()));
        }
        let index_width = header.len() - labels.len();

        let mut regions: Vec<RegionCode> = Vec::new();
        let mut positions: HashMap<RegionCode, usize> = HashMap::new();
        let mut column_region = Vec::with_capacity(labels.len());
        for label in labels {
            let region: RegionCode = label.parse()?;
            let position = match positions.get(&region) {
                Some(position) => *position,
                None => {
                    positions.insert(region.clone(), regions.len());
                    regions.push(region);
                    regions.len() - 1
                }
            };
            column_region.push(position);
        }

        Ok(Self {
            index_width,
            regions,
            positions,
            column_region,
        })
    }

    fn width(&self) -> usize {
        self.index_width + self.column_region.len()
    }

    fn index_fields<'r>(&self, record: &'r StringRecord) -> impl Iterator<Item = &'r str> {
        record.iter().take(self.index_width)
    }

    fn value_fields<'r>(&self, record: &'r StringRecord) -> impl Iterator<Item = &'r str> {
        record.iter().skip(self.index_width)
    }

    /// Sector-style column header: first field set, other index fields blank,
    /// every value field a non-numeric label.
    fn is_column_header(&self, record: &StringRecord) -> bool {
        record.len() == self.width()
            && record.get(0).is_some_and(|field| !field.is_empty())
            && self.index_fields(record).skip(1).all(str::is_empty)
            && self
                .value_fields(record)
                .all(|field| !field.is_empty() && field.parse::<f64>().is_err())
    }

    /// Index-names record closing the header: index fields set, values blank.
    fn is_index_names(&self, record: &StringRecord) -> bool {
        record.len() == self.width()
            && self.index_fields(record).all(|field| !field.is_empty())
            && self.value_fields(record).all(str::is_empty)
    }
}

pub fn aggregate_transactions(reader: &mut dyn BufRead) -> Result<TradeMatrix, GhgError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let mut records = csv_reader.records();

    let header = next_record(&mut records)?
        .ok_or_else(|| GhgError::TableParse("empty table".to_string()))?;
    let layout = Layout::from_header(&header)?;

    let size = layout.regions.len();
    let mut sums = vec![0f64; size * size];
    let mut rows = 0usize;

    let mut pending = None;
    while let Some(record) = next_record(&mut records)? {
        if layout.is_column_header(&record) {
            continue;
        }
        if !layout.is_index_names(&record) {
            pending = Some(record);
        }
        break;
    }

    let mut record = match pending {
        Some(record) => Some(record),
        None => next_record(&mut records)?,
    };
    while let Some(current) = record {
        add_row(&layout, &current, &mut sums)?;
        rows += 1;
        record = next_record(&mut records)?;
    }

    if rows == 0 {
        return Err(GhgError::TableParse("table has no data rows".to_string()));
    }

    let values = sums.into_iter().map(|sum| sum.trunc() as i64).collect();
    TradeMatrix::new(layout.regions, values)
}

fn next_record<R: std::io::Read>(
    records: &mut StringRecordsIter<'_, R>,
) -> Result<Option<StringRecord>, GhgError> {
    records
        .next()
        .transpose()
        .map_err(|err| GhgError::TableParse(err.to_string()))
}

fn add_row(layout: &Layout, record: &StringRecord, sums: &mut [f64]) -> Result<(), GhgError> {
    let line = record
        .position()
        .map(|position| position.line())
        .unwrap_or_default();
    if record.len() != layout.width() {
        return Err(GhgError::TableParse(format!(
            "line {line}: expected {} fields, found {}",
            layout.width(),
            record.len()
        )));
    }
    if layout.index_fields(record).any(str::is_empty) {
        return Err(GhgError::TableParse(format!(
            "line {line}: blank row index"
        )));
    }

    let row_region: RegionCode = record
        .get(0)
        .unwrap_or_default()
        .parse()
        .map_err(|_| GhgError::TableParse(format!("line {line}: invalid row region")))?;
    let row = *layout.positions.get(&row_region).ok_or_else(|| {
        GhgError::TableParse(format!(
            "line {line}: row region {row_region} is not a column region"
        ))
    })?;

    let size = layout.regions.len();
    let base = row * size;
    for (column, field) in layout.value_fields(record).enumerate() {
        let value = field.parse::<f64>().map_err(|_| {
            GhgError::TableParse(format!("line {line}: `{field}` is not a number"))
        })?;
        sums[base + layout.column_region[column]] += value;
    }
    Ok(())
}
