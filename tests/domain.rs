use assert_matches::assert_matches;

use exio_ghg::domain::{Classification, CountryCode, RegionCode, Selection, Year};
use exio_ghg::error::GhgError;

#[test]
fn parse_year_valid() {
    let year: Year = "2017".parse().unwrap();
    assert_eq!(year.value(), 2017);
    assert!(!year.is_even());
}

#[test]
fn parse_year_outside_release() {
    let err = "1994".parse::<Year>().unwrap_err();
    assert_matches!(err, GhgError::InvalidYear(_));
    let err = "20x7".parse::<Year>().unwrap_err();
    assert_matches!(err, GhgError::InvalidYear(_));
}

#[test]
fn year_range_is_inclusive() {
    let years: Vec<u16> = Year::range(Year::new(1999).unwrap(), Year::new(2001).unwrap())
        .map(|year| year.value())
        .collect();
    assert_eq!(years, vec![1999, 2000, 2001]);
}

#[test]
fn parse_classification_aliases() {
    assert_eq!("ixi".parse::<Classification>().unwrap(), Classification::Ixi);
    assert_eq!("PXP".parse::<Classification>().unwrap(), Classification::Pxp);
    let err = "sxs".parse::<Classification>().unwrap_err();
    assert_matches!(err, GhgError::InvalidClassification(_));
}

#[test]
fn region_and_country_codes_normalize() {
    let region: RegionCode = " us ".parse().unwrap();
    assert_eq!(region.as_str(), "US");
    let country: CountryCode = "usa".parse().unwrap();
    assert_eq!(country.as_str(), "USA");

    assert_matches!("".parse::<RegionCode>(), Err(GhgError::InvalidRegion(_)));
    assert_matches!("US".parse::<CountryCode>(), Err(GhgError::InvalidCountry(_)));
}

#[test]
fn filters_choose_selection() {
    let us: RegionCode = "US".parse().unwrap();
    let cn: RegionCode = "CN".parse().unwrap();

    assert_eq!(Selection::from_filters(None, None), Selection::Internal);
    assert_matches!(
        Selection::from_filters(Some(us.clone()), None),
        Selection::Exports { .. }
    );
    assert_matches!(
        Selection::from_filters(None, Some(cn.clone())),
        Selection::Imports { .. }
    );
    assert_eq!(
        Selection::from_filters(Some(us), Some(cn)).label(),
        "flow US -> CN"
    );
}
