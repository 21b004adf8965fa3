use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GhgError;

pub const FIRST_YEAR: u16 = 1995;
pub const LAST_YEAR: u16 = 2022;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    #[value(alias = "industry-by-industry")]
    #[serde(alias = "industry-by-industry")]
    Ixi,
    #[value(alias = "product-by-product")]
    #[serde(alias = "product-by-product")]
    Pxp,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Ixi => "ixi",
            Classification::Pxp => "pxp",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Classification::Ixi => "industry-by-industry",
            Classification::Pxp => "product-by-product",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Classification {
    type Err = GhgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "ixi" | "industry-by-industry" => Ok(Classification::Ixi),
            "pxp" | "product-by-product" => Ok(Classification::Pxp),
            _ => Err(GhgError::InvalidClassification(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Year(u16);

impl Year {
    pub fn new(value: u16) -> Result<Self, GhgError> {
        if !(FIRST_YEAR..=LAST_YEAR).contains(&value) {
            return Err(GhgError::InvalidYear(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }

    /// Inclusive range of validated years.
    pub fn range(first: Year, last: Year) -> impl Iterator<Item = Year> {
        (first.0..=last.0).map(Year)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Year {
    type Err = GhgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u16>()
            .map_err(|_| GhgError::InvalidYear(value.to_string()))?;
        Self::new(parsed)
    }
}

impl TryFrom<u16> for Year {
    type Error = GhgError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Year> for u16 {
    fn from(value: Year) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RegionCode {
    type Err = GhgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let is_valid = !normalized.is_empty()
            && normalized.len() <= 3
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(GhgError::InvalidRegion(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// ISO 3166-1 alpha-3 country code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CountryCode {
    type Err = GhgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_uppercase());
        if !is_valid {
            return Err(GhgError::InvalidCountry(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Which slice of the trade matrix a pipeline run looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Self-flows of every region (the diagonal).
    Internal,
    /// Flows from `origin` to every region (one row).
    Exports { origin: RegionCode },
    /// Flows from every region to `target` (one column).
    Imports { target: RegionCode },
    /// The single flow `origin` -> `target`.
    Flow {
        origin: RegionCode,
        target: RegionCode,
    },
}

impl Selection {
    pub fn from_filters(origin: Option<RegionCode>, target: Option<RegionCode>) -> Self {
        match (origin, target) {
            (None, None) => Selection::Internal,
            (Some(origin), None) => Selection::Exports { origin },
            (None, Some(target)) => Selection::Imports { target },
            (Some(origin), Some(target)) => Selection::Flow { origin, target },
        }
    }

    pub fn label(&self) -> String {
        match self {
            Selection::Internal => "internal".to_string(),
            Selection::Exports { origin } => format!("exports from {origin}"),
            Selection::Imports { target } => format!("imports to {target}"),
            Selection::Flow { origin, target } => format!("flow {origin} -> {target}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_classification_long_and_short() {
        assert_eq!(
            "industry-by-industry".parse::<Classification>().unwrap(),
            Classification::Ixi
        );
        assert_eq!("PXP".parse::<Classification>().unwrap(), Classification::Pxp);
        let err = "sxs".parse::<Classification>().unwrap_err();
        assert_matches!(err, GhgError::InvalidClassification(_));
    }

    #[test]
    fn parse_year_bounds() {
        assert_eq!("2017".parse::<Year>().unwrap().value(), 2017);
        assert_matches!("1994".parse::<Year>(), Err(GhgError::InvalidYear(_)));
        assert_matches!("2023".parse::<Year>(), Err(GhgError::InvalidYear(_)));
        assert_matches!("twenty".parse::<Year>(), Err(GhgError::InvalidYear(_)));
    }

    #[test]
    fn parse_region_normalizes_case() {
        let region: RegionCode = " wa ".parse().unwrap();
        assert_eq!(region.as_str(), "WA");
        assert_matches!("".parse::<RegionCode>(), Err(GhgError::InvalidRegion(_)));
        assert_matches!("U-S".parse::<RegionCode>(), Err(GhgError::InvalidRegion(_)));
    }

    #[test]
    fn parse_country_code() {
        let code: CountryCode = "usa".parse().unwrap();
        assert_eq!(code.as_str(), "USA");
        assert_matches!("US".parse::<CountryCode>(), Err(GhgError::InvalidCountry(_)));
    }

    #[test]
    fn selection_from_filters() {
        let at: RegionCode = "AT".parse().unwrap();
        let us: RegionCode = "US".parse().unwrap();
        assert_eq!(Selection::from_filters(None, None), Selection::Internal);
        assert_matches!(
            Selection::from_filters(Some(at.clone()), None),
            Selection::Exports { .. }
        );
        assert_matches!(
            Selection::from_filters(None, Some(us.clone())),
            Selection::Imports { .. }
        );
        assert_matches!(
            Selection::from_filters(Some(at), Some(us)),
            Selection::Flow { .. }
        );
    }
}
