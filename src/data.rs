//! Loading, cleaning and reporting on the street-tree table using Polars

use polars::prelude::*;
use std::path::Path;

use crate::error::TreeError;

pub const COMMON_NAME: &str = "common_name";
pub const AGE: &str = "age";
pub const DIAMETER: &str = "diameter_at_breast_height_cm";
pub const HEIGHT: &str = "height_m";
pub const SPREAD: &str = "spread_m";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Columns of the borough tree list that carry no analytic value
pub const DROPPED_COLUMNS: [&str; 9] = [
    "objectid",
    "borough",
    "maintainer",
    "gla_tree_name",
    "dbh_group",
    "load_date",
    "updated",
    "canopy_spread_group",
    "condition",
];

/// Columns every cleaned record is built from
pub const RECORD_COLUMNS: [&str; 7] = [
    COMMON_NAME,
    AGE,
    DIAMETER,
    HEIGHT,
    SPREAD,
    LATITUDE,
    LONGITUDE,
];

/// A row missing any of these is dropped during cleaning
pub const CRITICAL_COLUMNS: [&str; 4] = [AGE, DIAMETER, HEIGHT, SPREAD];

/// Textual spellings of a missing value, besides an empty field
const NULL_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load the CSV dataset and return the cleaned table
///
/// # Arguments
/// * `path` - Path to the borough tree list CSV file
///
/// # Returns
/// * Cleaned `DataFrame`, see [`clean_trees`]
pub fn load_trees<P: AsRef<Path>>(path: P) -> crate::Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TreeError::MissingFile(path.to_path_buf()).into());
    }

    let null_values = NullValues::AllColumns(NULL_MARKERS.iter().map(|m| (*m).into()).collect());

    // Infer types from every row so a late textual value cannot corrupt a column
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_null_values(Some(null_values.clone())))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    log::info!(
        "read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );

    clean_trees(df)
}

/// Drop unused columns and incomplete rows, and normalize heights to `Float64`
pub fn clean_trees(mut df: DataFrame) -> crate::Result<DataFrame> {
    for name in DROPPED_COLUMNS {
        require_column(&df, name)?;
        df.drop_in_place(name)?;
    }
    for name in RECORD_COLUMNS {
        require_column(&df, name)?;
    }

    let mut keep = BooleanChunked::full("keep".into(), true, df.height());
    for name in CRITICAL_COLUMNS {
        keep = &keep & &df.column(name)?.is_not_null();
    }
    let mut cleaned = df.filter(&keep)?;

    // Data row of the input each kept row came from
    let source_rows: Vec<usize> = keep
        .into_iter()
        .enumerate()
        .filter_map(|(row, kept)| (kept == Some(true)).then_some(row))
        .collect();

    let height = coerce_height(cleaned.column(HEIGHT)?, &source_rows)?;
    cleaned.with_column(height)?;

    log::debug!(
        "cleaning kept {} of {} rows",
        cleaned.height(),
        df.height()
    );

    Ok(cleaned)
}

fn require_column(df: &DataFrame, name: &str) -> Result<(), TreeError> {
    match df.get_column_index(name) {
        Some(_) => Ok(()),
        None => Err(TreeError::MissingColumn(name.to_string())),
    }
}

/// `source_rows[i]` is the input data row of `column[i]`, used in error reports
fn coerce_height(column: &Column, source_rows: &[usize]) -> crate::Result<Column> {
    if column.dtype() != &DataType::String {
        return Ok(column.strict_cast(&DataType::Float64)?);
    }

    let values = column
        .str()?
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let row = source_rows.get(i).copied().unwrap_or(i);
            value.map(|text| parse_height(row, text)).transpose()
        })
        .collect::<Result<Vec<Option<f64>>, TreeError>>()?;

    Ok(Column::new(HEIGHT.into(), values))
}

/// Parse one textual height such as `"12"`, `" 7.5 "` or `"9.5m"`
pub fn parse_height(row: usize, text: &str) -> Result<f64, TreeError> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('m').unwrap_or(trimmed).trim_end();
    number
        .parse::<f64>()
        .map_err(|_| TreeError::UnparseableHeight {
            row,
            value: text.to_string(),
        })
}

/// Read a column as floats, keeping nulls
pub fn float_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Names of the integer and float columns, in table order
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype().is_float() || c.dtype().is_integer())
        .map(|c| c.name().to_string())
        .collect()
}

/// Distinct tree names in order of first appearance
pub fn distinct_names(df: &DataFrame) -> crate::Result<Vec<String>> {
    let names = df.column(COMMON_NAME)?.unique_stable()?;
    Ok(names.str()?.into_iter().flatten().map(str::to_owned).collect())
}

pub fn head(df: &DataFrame, n: usize) -> DataFrame {
    df.head(Some(n))
}

/// Print the row count and, per column, its dtype and non-null count
pub fn print_info(df: &DataFrame) {
    println!("{} rows x {} columns", df.height(), df.width());
    println!("  # | {:<30} | Non-null | Dtype", "Column");
    println!("----|-{:-<30}-|----------|------", "");
    for (i, column) in df.get_columns().iter().enumerate() {
        println!(
            "{:3} | {:<30} | {:8} | {}",
            i,
            column.name().as_str(),
            column.len() - column.null_count(),
            column.dtype()
        );
    }
}

/// Summary statistics of one numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, undefined below two values
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summarize every numeric column; columns without values are skipped
pub fn describe(df: &DataFrame) -> crate::Result<Vec<ColumnSummary>> {
    let mut summaries = Vec::new();

    for name in numeric_columns(df) {
        let mut values: Vec<f64> = float_values(df, &name)?.into_iter().flatten().collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        });

        summaries.push(ColumnSummary {
            name,
            count,
            mean,
            std,
            min: values[0],
            q25: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q75: quantile(&values, 0.75),
            max: values[count - 1],
        });
    }

    Ok(summaries)
}

/// Linear-interpolated quantile of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

pub fn print_summary(df: &DataFrame) -> crate::Result<()> {
    let summaries = describe(df)?;

    println!(
        "{:<30} | {:>7} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
        "Column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for s in summaries {
        let std = s
            .std
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "NaN".to_string());
        println!(
            "{:<30} | {:>7} | {:>10.3} | {:>10} | {:>10.3} | {:>10.3} | {:>10.3} | {:>10.3} | {:>10.3}",
            s.name, s.count, s.mean, std, s.min, s.q25, s.median, s.q75, s.max
        );
    }

    Ok(())
}

/// Cleaned-shape table with `n` complete rows for unit tests
#[cfg(test)]
pub(crate) fn synthetic_trees(n: usize) -> DataFrame {
    const NAMES: [&str; 3] = ["London plane", "Common lime", "Norway maple"];

    df!(
        COMMON_NAME => (0..n).map(|i| NAMES[i % NAMES.len()]).collect::<Vec<_>>(),
        AGE => (0..n).map(|i| (i % 80) as f64 + 1.0).collect::<Vec<_>>(),
        DIAMETER => (0..n).map(|i| 10.0 + ((i * 7) % 90) as f64).collect::<Vec<_>>(),
        HEIGHT => (0..n).map(|i| 5.0 + (i % 20) as f64 * 0.5).collect::<Vec<_>>(),
        SPREAD => (0..n).map(|i| 2.0 + (i % 10) as f64).collect::<Vec<_>>(),
        LATITUDE => (0..n).map(|i| 51.3 + i as f64 * 1e-4).collect::<Vec<_>>(),
        LONGITUDE => (0..n).map(|i| -0.5 + i as f64 * 1e-4).collect::<Vec<_>>()
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "objectid,borough,common_name,maintainer,gla_tree_name,age,diameter_at_breast_height_cm,dbh_group,height_m,spread_m,canopy_spread_group,condition,load_date,updated,latitude,longitude";

    fn create_test_csv(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    /// Raw table with `n` rows where every row in `missing_spread` lacks a spread value
    fn raw_trees(n: usize, missing_spread: &[usize]) -> DataFrame {
        let mut raw = synthetic_trees(n);
        let spread: Vec<Option<f64>> = (0..n)
            .map(|i| (!missing_spread.contains(&i)).then(|| 2.0 + (i % 10) as f64))
            .collect();
        raw.with_column(Column::new(SPREAD.into(), spread)).unwrap();
        for name in DROPPED_COLUMNS {
            raw.with_column(Column::new(name.into(), vec!["x"; n])).unwrap();
        }
        raw
    }

    #[test]
    fn test_load_trees() {
        let file = create_test_csv(&[
            "1,Camden,London plane,Council,Plane,12,45.0,40-50,14.5,8.0,5-10,Good,2021-07-01,2021-07-02,51.55,-0.16",
            "2,Camden,Common lime,Council,Lime,30,60.0,60-70,N/A,9.0,5-10,Good,2021-07-01,2021-07-02,51.56,-0.15",
            "3,Barnet,Norway maple,Council,Maple,8,20.0,20-30,9m,4.0,0-5,Fair,2021-07-01,2021-07-02,51.61,-0.20",
            "4,Barnet,London plane,Council,Plane,25,70.0,70-80, 16 ,,10-15,Good,2021-07-01,2021-07-02,51.62,-0.21",
        ]);

        let df = load_trees(file.path()).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), RECORD_COLUMNS.len());
        assert_eq!(df.column(HEIGHT).unwrap().dtype(), &DataType::Float64);
        let heights: Vec<f64> = df.column(HEIGHT).unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(heights, vec![14.5, 9.0]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_trees("no/such/trees.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TreeError>(),
            Some(TreeError::MissingFile(_))
        ));
    }

    #[test]
    fn test_missing_column() {
        let raw = raw_trees(5, &[]).drop("condition").unwrap();
        let err = clean_trees(raw).unwrap_err();
        match err.downcast_ref::<TreeError>() {
            Some(TreeError::MissingColumn(name)) => assert_eq!(name, "condition"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_height() {
        let file = create_test_csv(&[
            "1,Camden,London plane,Council,Plane,12,45.0,40-50,11,,5-10,Good,2021-07-01,2021-07-02,51.55,-0.16",
            "2,Camden,Common lime,Council,Lime,30,60.0,60-70,N/A,9.0,5-10,Good,2021-07-01,2021-07-02,51.56,-0.15",
            "3,Camden,London plane,Council,Plane,12,45.0,40-50,tall,8.0,5-10,Good,2021-07-01,2021-07-02,51.57,-0.17",
        ]);
        let err = load_trees(file.path()).unwrap_err();
        match err.downcast_ref::<TreeError>() {
            Some(TreeError::UnparseableHeight { row, value }) => {
                // Counted in the input, before incomplete rows are dropped
                assert_eq!(*row, 2);
                assert_eq!(value, "tall");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_value_spellings() {
        let file = create_test_csv(&[
            "1,Camden,London plane,Council,Plane,12,45.0,40-50,#N/A,8.0,5-10,Good,2021-07-01,2021-07-02,51.55,-0.16",
            "2,Camden,Common lime,Council,Lime,30,60.0,60-70,<NA>,9.0,5-10,Good,2021-07-01,2021-07-02,51.56,-0.15",
            "3,Camden,Common lime,Council,Lime,30,60.0,60-70,None,9.0,5-10,Good,2021-07-01,2021-07-02,51.56,-0.15",
            "4,Camden,Common lime,Council,Lime,30,60.0,60-70,-nan,9.0,5-10,Good,2021-07-01,2021-07-02,51.56,-0.15",
            "5,Barnet,Norway maple,Council,Maple,8,20.0,20-30,9m,4.0,0-5,Fair,2021-07-01,2021-07-02,51.61,-0.20",
        ]);

        let df = load_trees(file.path()).unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(float_values(&df, HEIGHT).unwrap(), vec![Some(9.0)]);
    }

    #[test]
    fn test_clean_drops_incomplete_rows() {
        let missing: Vec<usize> = (0..1000).step_by(20).collect();
        assert_eq!(missing.len(), 50);

        let cleaned = clean_trees(raw_trees(1000, &missing)).unwrap();

        assert_eq!(cleaned.height(), 950);
        for name in CRITICAL_COLUMNS {
            assert_eq!(cleaned.column(name).unwrap().null_count(), 0);
        }
        for name in DROPPED_COLUMNS {
            assert!(cleaned.column(name).is_err());
        }
    }

    #[test]
    fn test_parse_height() {
        assert_eq!(parse_height(0, "12").unwrap(), 12.0);
        assert_eq!(parse_height(0, " 7.5 ").unwrap(), 7.5);
        assert_eq!(parse_height(0, "9.5m").unwrap(), 9.5);
        assert!(parse_height(3, "about ten").is_err());
    }

    #[test]
    fn test_describe() {
        let df = df!(
            "height_m" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "common_name" => ["a", "b", "c", "d", "e"]
        )
        .unwrap();

        let summaries = describe(&df).unwrap();
        assert_eq!(summaries.len(), 1);

        let s = &summaries[0];
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.q25, 2.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.q75, 4.0);
        assert_eq!(s.max, 5.0);
        assert!((s.std.unwrap() - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_distinct_names() {
        let names = distinct_names(&synthetic_trees(10)).unwrap();
        assert_eq!(names, vec!["London plane", "Common lime", "Norway maple"]);
    }

    #[test]
    fn test_numeric_columns() {
        let numeric = numeric_columns(&synthetic_trees(3));
        assert!(!numeric.contains(&COMMON_NAME.to_string()));
        assert_eq!(numeric.len(), 6);
    }
}
