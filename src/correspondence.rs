use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CountryCode, RegionCode};
use crate::error::GhgError;
use crate::matrix::RegionSeries;

/// EXIO3 region -> ISO3 country table compiled into the binary.
const BUNDLED_EXIO3_ISO3: &str = include_str!("../data/exio3_iso3.csv");

#[derive(Debug, Deserialize)]
struct CorrespondenceRow {
    region: String,
    iso3: String,
}

/// Many-to-one mapping from ISO3 countries to source regions, stored per
/// region in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrespondenceTable {
    regions: Vec<(RegionCode, Vec<CountryCode>)>,
}

impl CorrespondenceTable {
    pub fn new(regions: Vec<(RegionCode, Vec<CountryCode>)>) -> Result<Self, GhgError> {
        let mut seen_regions = HashSet::new();
        let mut seen_countries = HashSet::new();
        for (region, countries) in &regions {
            if !seen_regions.insert(region.clone()) {
                return Err(GhgError::Correspondence(format!(
                    "region {region} listed twice"
                )));
            }
            for country in countries {
                if !seen_countries.insert(country.clone()) {
                    return Err(GhgError::Correspondence(format!(
                        "country {country} mapped to more than one region"
                    )));
                }
            }
        }
        Ok(Self { regions })
    }

    pub fn exio3() -> Result<Self, GhgError> {
        Self::from_csv_reader(BUNDLED_EXIO3_ISO3.as_bytes())
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, GhgError> {
        let file = fs::File::open(path)
            .map_err(|err| GhgError::Filesystem(format!("open {}: {err}", path.display())))?;
        Self::from_csv_reader(file)
    }

    /// Reads `region,iso3` rows; regions keep the order of their first row.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self, GhgError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut regions: Vec<(RegionCode, Vec<CountryCode>)> = Vec::new();
        for row in csv_reader.deserialize::<CorrespondenceRow>() {
            let row = row.map_err(|err| GhgError::Correspondence(err.to_string()))?;
            let region: RegionCode = row.region.parse()?;
            let country: CountryCode = row.iso3.parse()?;
            match regions.iter_mut().find(|(candidate, _)| *candidate == region) {
                Some((_, countries)) => countries.push(country),
                None => regions.push((region, vec![country])),
            }
        }
        Self::new(regions)
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionCode> {
        self.regions.iter().map(|(region, _)| region)
    }

    pub fn countries_of(&self, region: &RegionCode) -> Result<&[CountryCode], GhgError> {
        self.regions
            .iter()
            .find(|(candidate, _)| candidate == region)
            .map(|(_, countries)| countries.as_slice())
            .ok_or_else(|| GhgError::unknown_region(region.as_str(), "correspondence table"))
    }

    pub fn country_count(&self) -> usize {
        self.regions.iter().map(|(_, countries)| countries.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountryEntry<'a> {
    pub country: &'a str,
    pub emission: i64,
}

/// Ordered ISO3 -> value mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountrySeries {
    entries: Vec<(CountryCode, i64)>,
}

impl CountrySeries {
    pub fn new(entries: Vec<(CountryCode, i64)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, country: &CountryCode) -> Option<i64> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == country)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountryCode, i64)> {
        self.entries.iter().map(|(country, value)| (country, *value))
    }

    pub fn rows(&self) -> impl Iterator<Item = CountryEntry<'_>> {
        self.entries.iter().map(|(country, emission)| CountryEntry {
            country: country.as_str(),
            emission: *emission,
        })
    }
}

/// Broadcasts each region value to every country mapped from that region.
/// Every region of the table must be present in `series`.
pub fn expand_to_countries(
    series: &RegionSeries,
    table: &CorrespondenceTable,
) -> Result<CountrySeries, GhgError> {
    let mut entries = Vec::with_capacity(table.country_count());
    for (region, countries) in &table.regions {
        let value = series
            .get(region)
            .ok_or_else(|| GhgError::unknown_region(region.as_str(), "emission series"))?;
        entries.extend(countries.iter().map(|country| (country.clone(), value)));
    }
    Ok(CountrySeries::new(entries))
}

/// Broadcasts one region value to that region's countries only.
pub fn expand_region(
    region: &RegionCode,
    value: i64,
    table: &CorrespondenceTable,
) -> Result<CountrySeries, GhgError> {
    let countries = table.countries_of(region)?;
    Ok(CountrySeries::new(
        countries
            .iter()
            .map(|country| (country.clone(), value))
            .collect(),
    ))
}
