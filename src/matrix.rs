use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;

use crate::domain::{RegionCode, Selection};
use crate::error::GhgError;

pub const REGION_COLUMN: &str = "region";

/// Square region-by-region flow table. Cell (i, j) is the flow from region i
/// to region j.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeMatrix {
    regions: Vec<RegionCode>,
    index: HashMap<RegionCode, usize>,
    values: Vec<i64>,
}

impl TradeMatrix {
    /// `values` is row-major and must hold `regions.len()^2` cells.
    pub fn new(regions: Vec<RegionCode>, values: Vec<i64>) -> Result<Self, GhgError> {
        let size = regions.len();
        if values.len() != size * size {
            return Err(GhgError::CacheIntegrity(format!(
                "expected {} cells for {size} regions, found {}",
                size * size,
                values.len()
            )));
        }
        let mut index = HashMap::with_capacity(size);
        for (position, region) in regions.iter().enumerate() {
            if index.insert(region.clone(), position).is_some() {
                return Err(GhgError::CacheIntegrity(format!(
                    "duplicate region label {region}"
                )));
            }
        }
        Ok(Self {
            regions,
            index,
            values,
        })
    }

    pub fn from_rows(regions: Vec<RegionCode>, rows: Vec<Vec<i64>>) -> Result<Self, GhgError> {
        if let Some(row) = rows.iter().find(|row| row.len() != regions.len()) {
            return Err(GhgError::CacheIntegrity(format!(
                "row of width {} in a matrix of {} regions",
                row.len(),
                regions.len()
            )));
        }
        Self::new(regions, rows.into_iter().flatten().collect())
    }

    pub fn regions(&self) -> &[RegionCode] {
        &self.regions
    }

    pub fn size(&self) -> usize {
        self.regions.len()
    }

    pub fn position(&self, region: &RegionCode) -> Option<usize> {
        self.index.get(region).copied()
    }

    pub fn cell(&self, row: usize, column: usize) -> i64 {
        self.values[row * self.size() + column]
    }

    pub fn get(&self, origin: &RegionCode, target: &RegionCode) -> Result<i64, GhgError> {
        let row = self.require(origin, "matrix rows")?;
        let column = self.require(target, "matrix columns")?;
        Ok(self.cell(row, column))
    }

    fn require(&self, region: &RegionCode, context: &str) -> Result<usize, GhgError> {
        self.position(region)
            .ok_or_else(|| GhgError::unknown_region(region.as_str(), context))
    }

    /// Slices the matrix into a region series according to `selection`.
    pub fn extract_series(&self, selection: &Selection) -> Result<RegionSeries, GhgError> {
        let entries = match selection {
            Selection::Internal => self
                .regions
                .iter()
                .enumerate()
                .map(|(i, region)| (region.clone(), self.cell(i, i)))
                .collect(),
            Selection::Exports { origin } => {
                let row = self.require(origin, "matrix rows")?;
                self.regions
                    .iter()
                    .enumerate()
                    .map(|(column, region)| (region.clone(), self.cell(row, column)))
                    .collect()
            }
            Selection::Imports { target } => {
                let column = self.require(target, "matrix columns")?;
                self.regions
                    .iter()
                    .enumerate()
                    .map(|(row, region)| (region.clone(), self.cell(row, column)))
                    .collect()
            }
            Selection::Flow { origin, target } => {
                vec![(target.clone(), self.get(origin, target)?)]
            }
        };
        Ok(RegionSeries::new(entries))
    }

    pub fn to_dataframe(&self) -> Result<DataFrame, GhgError> {
        let size = self.size();
        let labels = self
            .regions
            .iter()
            .map(|region| region.as_str())
            .collect::<Vec<_>>();
        let mut columns: Vec<Column> = Vec::with_capacity(size + 1);
        columns.push(Series::new(REGION_COLUMN.into(), labels).into());
        for (column, region) in self.regions.iter().enumerate() {
            let values = (0..size)
                .map(|row| self.cell(row, column))
                .collect::<Vec<i64>>();
            columns.push(Series::new(region.as_str().into(), values).into());
        }
        DataFrame::new(columns).map_err(|err| GhgError::CacheFormat(err.to_string()))
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self, GhgError> {
        let names = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        if names.first().map(String::as_str) != Some(REGION_COLUMN) {
            return Err(GhgError::CacheIntegrity(format!(
                "first column must be `{REGION_COLUMN}`"
            )));
        }

        let labels = df
            .column(REGION_COLUMN)
            .and_then(|column| column.str())
            .map_err(|err| GhgError::CacheFormat(err.to_string()))?;
        let regions = labels
            .into_iter()
            .map(|label| {
                label
                    .ok_or_else(|| GhgError::CacheIntegrity("null region label".to_string()))?
                    .parse::<RegionCode>()
            })
            .collect::<Result<Vec<_>, GhgError>>()?;

        let header = &names[1..];
        let is_square = header.len() == regions.len()
            && header
                .iter()
                .zip(&regions)
                .all(|(name, region)| name == region.as_str());
        if !is_square {
            return Err(GhgError::CacheIntegrity(format!(
                "row labels ({}) do not match column labels ({})",
                regions.len(),
                header.len()
            )));
        }

        let size = regions.len();
        let mut values = vec![0i64; size * size];
        for (column, name) in header.iter().enumerate() {
            let chunked = df
                .column(name)
                .and_then(|column| column.i64())
                .map_err(|err| GhgError::CacheFormat(err.to_string()))?;
            for (row, value) in chunked.into_iter().enumerate() {
                let value = value.ok_or_else(|| {
                    GhgError::CacheIntegrity(format!("null cell in column {name}"))
                })?;
                values[row * size + column] = value;
            }
        }
        Self::new(regions, values)
    }

    /// Writes the matrix as an Arrow IPC (Feather v2) file.
    pub fn write_feather(&self, path: &Path) -> Result<(), GhgError> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)
            .map_err(|err| GhgError::Filesystem(format!("create {}: {err}", path.display())))?;
        IpcWriter::new(&mut file)
            .finish(&mut df)
            .map_err(|err| GhgError::CacheFormat(err.to_string()))?;
        file.sync_all()
            .map_err(|err| GhgError::Filesystem(err.to_string()))
    }

    pub fn read_feather(path: &Path) -> Result<Self, GhgError> {
        let file = File::open(path)
            .map_err(|err| GhgError::Filesystem(format!("open {}: {err}", path.display())))?;
        let df = IpcReader::new(file)
            .finish()
            .map_err(|err| GhgError::CacheFormat(err.to_string()))?;
        Self::from_dataframe(&df)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesEntry<'a> {
    pub region: &'a str,
    pub emission: i64,
}

/// Ordered region -> value mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionSeries {
    entries: Vec<(RegionCode, i64)>,
}

impl RegionSeries {
    pub fn new(entries: Vec<(RegionCode, i64)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, region: &RegionCode) -> Option<i64> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == region)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionCode, i64)> {
        self.entries.iter().map(|(region, value)| (region, *value))
    }

    pub fn rows(&self) -> impl Iterator<Item = SeriesEntry<'_>> {
        self.entries.iter().map(|(region, emission)| SeriesEntry {
            region: region.as_str(),
            emission: *emission,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(values: &[&str]) -> Vec<RegionCode> {
        values.iter().map(|value| value.parse().unwrap()).collect()
    }

    #[test]
    fn dataframe_layout_is_region_then_columns() {
        let matrix =
            TradeMatrix::from_rows(codes(&["A", "B"]), vec![vec![10, 20], vec![5, 15]]).unwrap();
        let df = matrix.to_dataframe().unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(df.height(), 2);
        let names = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["region", "A", "B"]);
        assert_eq!(TradeMatrix::from_dataframe(&df).unwrap(), matrix);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = TradeMatrix::from_rows(codes(&["A", "B"]), vec![vec![1, 2], vec![3]]);
        assert!(matches!(err, Err(GhgError::CacheIntegrity(_))));
    }

    #[test]
    fn rejects_mismatched_labels() {
        let df = DataFrame::new(vec![
            Series::new("region".into(), vec!["A", "B"]).into(),
            Series::new("A".into(), vec![1i64, 2]).into(),
            Series::new("C".into(), vec![3i64, 4]).into(),
        ])
        .unwrap();
        let err = TradeMatrix::from_dataframe(&df).unwrap_err();
        assert!(matches!(err, GhgError::CacheIntegrity(_)));
    }
}
