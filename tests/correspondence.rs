use std::io::Cursor;

use assert_matches::assert_matches;

use exio_ghg::correspondence::{CorrespondenceTable, expand_region, expand_to_countries};
use exio_ghg::domain::{CountryCode, RegionCode};
use exio_ghg::error::GhgError;
use exio_ghg::matrix::RegionSeries;

fn region(code: &str) -> RegionCode {
    code.parse().unwrap()
}

fn country(code: &str) -> CountryCode {
    code.parse().unwrap()
}

fn table() -> CorrespondenceTable {
    CorrespondenceTable::new(vec![
        (region("A"), vec![country("USA"), country("CAN")]),
        (region("B"), vec![country("MEX")]),
    ])
    .unwrap()
}

#[test]
fn region_value_is_broadcast_to_its_countries() {
    let series = RegionSeries::new(vec![(region("A"), 10), (region("B"), 7)]);
    let countries = expand_to_countries(&series, &table()).unwrap();

    assert_eq!(countries.len(), 3);
    assert_eq!(countries.get(&country("USA")), Some(10));
    assert_eq!(countries.get(&country("CAN")), Some(10));
    assert_eq!(countries.get(&country("MEX")), Some(7));
}

#[test]
fn missing_region_in_series_is_an_error() {
    let series = RegionSeries::new(vec![(region("A"), 10)]);
    let err = expand_to_countries(&series, &table()).unwrap_err();
    assert_matches!(err, GhgError::UnknownRegion { ref region, .. } if region == "B");
}

#[test]
fn single_region_expansion() {
    let countries = expand_region(&region("A"), 42, &table()).unwrap();
    let rows: Vec<(String, i64)> = countries
        .iter()
        .map(|(country, value)| (country.to_string(), value))
        .collect();
    assert_eq!(rows, vec![("USA".to_string(), 42), ("CAN".to_string(), 42)]);

    let err = expand_region(&region("C"), 1, &table()).unwrap_err();
    assert_matches!(err, GhgError::UnknownRegion { .. });
}

#[test]
fn table_reads_region_iso3_csv() {
    let csv = "region,iso3\nA,usa\nA,CAN\nB,MEX\n";
    let table = CorrespondenceTable::from_csv_reader(Cursor::new(csv)).unwrap();
    assert_eq!(table.regions().count(), 2);
    assert_eq!(table.countries_of(&region("A")).unwrap().len(), 2);
    assert_eq!(table.country_count(), 3);
}

#[test]
fn bundled_table_expands_every_region() {
    let table = CorrespondenceTable::exio3().unwrap();
    let series = RegionSeries::new(table.regions().map(|region| (region.clone(), 1)).collect());
    let countries = expand_to_countries(&series, &table).unwrap();
    assert_eq!(countries.len(), table.country_count());
    assert_eq!(countries.get(&country("DEU")), Some(1));
}
