use assert_matches::assert_matches;

use exio_ghg::domain::{RegionCode, Selection};
use exio_ghg::error::GhgError;
use exio_ghg::matrix::TradeMatrix;

fn region(code: &str) -> RegionCode {
    code.parse().unwrap()
}

fn sample() -> TradeMatrix {
    TradeMatrix::from_rows(vec![region("A"), region("B")], vec![vec![10, 20], vec![5, 15]])
        .unwrap()
}

fn values(matrix: &TradeMatrix, selection: Selection) -> Vec<(String, i64)> {
    matrix
        .extract_series(&selection)
        .unwrap()
        .iter()
        .map(|(region, value)| (region.to_string(), value))
        .collect()
}

#[test]
fn diagonal_series() {
    assert_eq!(
        values(&sample(), Selection::Internal),
        vec![("A".to_string(), 10), ("B".to_string(), 15)]
    );
}

#[test]
fn row_extraction_by_origin() {
    let selection = Selection::Exports {
        origin: region("A"),
    };
    assert_eq!(
        values(&sample(), selection),
        vec![("A".to_string(), 10), ("B".to_string(), 20)]
    );
}

#[test]
fn column_extraction_by_target() {
    let selection = Selection::Imports {
        target: region("B"),
    };
    assert_eq!(
        values(&sample(), selection),
        vec![("A".to_string(), 20), ("B".to_string(), 15)]
    );
}

#[test]
fn single_flow_is_keyed_by_target() {
    let selection = Selection::Flow {
        origin: region("B"),
        target: region("A"),
    };
    assert_eq!(values(&sample(), selection), vec![("A".to_string(), 5)]);
}

#[test]
fn series_length_matches_region_count() {
    let matrix = sample();
    for selection in [
        Selection::Internal,
        Selection::Exports {
            origin: region("B"),
        },
        Selection::Imports {
            target: region("A"),
        },
    ] {
        assert_eq!(matrix.extract_series(&selection).unwrap().len(), matrix.size());
    }
}

#[test]
fn unknown_region_is_reported() {
    let err = sample()
        .extract_series(&Selection::Exports {
            origin: region("ZZ"),
        })
        .unwrap_err();
    assert_matches!(err, GhgError::UnknownRegion { ref region, .. } if region == "ZZ");

    let err = sample().get(&region("A"), &region("ZZ")).unwrap_err();
    assert_matches!(err, GhgError::UnknownRegion { .. });
}

#[test]
fn non_square_input_is_rejected() {
    let err = TradeMatrix::from_rows(vec![region("A"), region("B")], vec![vec![1, 2], vec![3]])
        .unwrap_err();
    assert_matches!(err, GhgError::CacheIntegrity(_));

    let err = TradeMatrix::new(vec![region("A"), region("A")], vec![0; 4]).unwrap_err();
    assert_matches!(err, GhgError::CacheIntegrity(_));
}

#[test]
fn feather_file_preserves_labels_and_values() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("IOT_2017_ixi.feather");
    let matrix = sample();

    matrix.write_feather(&path).unwrap();
    let loaded = TradeMatrix::read_feather(&path).unwrap();

    assert_eq!(loaded, matrix);
    assert_eq!(loaded.get(&region("B"), &region("A")).unwrap(), 5);
}
