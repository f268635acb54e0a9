//! Integration tests for reading, normalizing and writing a table.

use approx::assert_relative_eq;
use scale2d::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_two_by_two_end_to_end() {
    let input = write_csv(&["a,b", "1,2", "3,4"]);
    let matrix = DataMatrix::from_csv(input.path()).unwrap();

    let config = ScaleConfig {
        max_iterations: 1,
        ..Default::default()
    };
    let result = norm_scale2d_with_config(&matrix, &config).unwrap();

    assert_eq!(result.initial.alpha, vec![1.5, 3.5]);
    assert_eq!(result.initial.beta, vec![2.0, 3.0]);
    assert_relative_eq!(result.initial.tao[0], 0.5, epsilon = 1e-12);
    assert_relative_eq!(result.initial.gamma[1], 1.0, epsilon = 1e-12);

    let output = NamedTempFile::new().unwrap();
    result.data.to_csv(output.path()).unwrap();
    let text = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(text, "-5,-5\n-5,-5\n");
}

#[test]
fn test_missing_cell_end_to_end() {
    let input = write_csv(&["a,b", "1,", "3,4"]);
    let matrix = DataMatrix::from_csv(input.path()).unwrap();

    let params = fit_initial(&matrix, ZeroVariancePolicy::Unit).unwrap();
    assert_eq!(params.alpha[0], 1.0);
    assert!(!params.alpha[0].is_nan());

    let config = ScaleConfig {
        max_iterations: 3,
        ..Default::default()
    };
    let result = norm_scale2d_with_config(&matrix, &config).unwrap();

    let output = NamedTempFile::new().unwrap();
    result.data.to_csv(output.path()).unwrap();
    let text = std::fs::read_to_string(output.path()).unwrap();
    let first_line = text.lines().next().unwrap();
    assert!(first_line.ends_with(','), "missing cell should stay empty: {first_line}");
}

#[test]
fn test_converging_table_with_header_and_report() {
    let input = write_csv(&["x,y,z", "1,5,2", "9,2,7", "4,8,1"]);
    let matrix = DataMatrix::from_csv(input.path()).unwrap();

    let profile = profile_missing(&matrix);
    assert!(profile.is_normalizable());

    let result = norm_scale2d(&matrix).unwrap();
    assert_eq!(result.n_rows(), 3);
    assert_eq!(result.n_cols(), 3);
    assert_eq!(result.heuristics.len(), result.iterations + 1);

    let output = NamedTempFile::new().unwrap();
    let options = WriteOptions {
        write_header: true,
        ..Default::default()
    };
    result.data.to_csv_with_options(output.path(), &options).unwrap();
    let reloaded = DataMatrix::from_csv(output.path()).unwrap();
    assert_eq!(reloaded.header().unwrap(), &["x", "y", "z"]);
    for i in 0..3 {
        for j in 0..3 {
            assert_relative_eq!(reloaded.get(i, j), result.get(i, j), max_relative = 1e-7);
        }
    }

    let report: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(report["iterations"], result.iterations);
}

#[test]
fn test_empty_column_is_rejected() {
    let input = write_csv(&["a,b", "1,", "3,"]);
    let matrix = DataMatrix::from_csv(input.path()).unwrap();

    assert!(!profile_missing(&matrix).is_normalizable());
    assert!(matches!(
        norm_scale2d(&matrix),
        Err(ScaleError::EmptyAggregate {
            axis: Axis::Column,
            index: 1
        })
    ));
}

#[test]
fn test_malformed_field_substituted_as_missing() {
    let input = write_csv(&["a,b", "1,oops", "3,4"]);

    assert!(matches!(
        DataMatrix::from_csv(input.path()),
        Err(ScaleError::MalformedField { .. })
    ));

    let options = ReadOptions {
        malformed: MalformedPolicy::Missing,
        ..Default::default()
    };
    let matrix = DataMatrix::from_csv_with_options(input.path(), &options).unwrap();
    assert_eq!(mean(&matrix.row(0)), Some(1.0));
}
