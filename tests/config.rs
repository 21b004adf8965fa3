use assert_matches::assert_matches;

use exio_ghg::config::{BatchSection, Config, ConfigLoader, ServerSection};
use exio_ghg::domain::Classification;
use exio_ghg::error::GhgError;

#[test]
fn parse_full_config() {
    let json = r#"{
        "schema_version": 1,
        "folder": "/data/exio",
        "year": 2018,
        "classification": "pxp",
        "correspondence": "regions.csv",
        "batch": { "first_year": 2000, "last_year": 2002, "classification": "ixi" },
        "server": { "bind": "0.0.0.0:9000" }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.pipeline.folder.as_str(), "/data/exio");
    assert_eq!(resolved.pipeline.year.value(), 2018);
    assert_eq!(resolved.pipeline.classification, Classification::Pxp);
    assert_eq!(
        resolved.pipeline.correspondence.as_ref().map(|path| path.as_str()),
        Some("regions.csv")
    );
    assert_eq!(resolved.batch.first_year.value(), 2000);
    assert_eq!(resolved.batch.last_year.value(), 2002);
    assert_eq!(resolved.batch.classification, Classification::Ixi);
    assert_eq!(resolved.server.bind.port(), 9000);
}

#[test]
fn invalid_year_is_rejected() {
    let config = Config {
        folder: Some("/tmp/exio".to_string()),
        year: Some(1990),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, GhgError::InvalidYear(_));
}

#[test]
fn reversed_batch_range_is_rejected() {
    let config = Config {
        folder: Some("/tmp/exio".to_string()),
        batch: Some(BatchSection {
            first_year: Some(2010),
            last_year: Some(2005),
            classification: None,
        }),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, GhgError::ConfigParse(_));
}

#[test]
fn bad_bind_address_is_rejected() {
    let config = Config {
        folder: Some("/tmp/exio".to_string()),
        server: Some(ServerSection {
            bind: Some("localhost".to_string()),
        }),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, GhgError::ConfigParse(_));
}

#[test]
fn explicit_missing_file_is_a_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, GhgError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("exio-ghg.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, GhgError::ConfigParse(_));
}
