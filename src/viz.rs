//! Figures describing what to plot, built read-only from the tree table
//!
//! A [`Figure`] holds the data of one plot and nothing about how it is drawn;
//! see [`crate::render`] for the sinks that present them.

use ndarray::Array2;
use polars::prelude::*;

use crate::data::{float_values, numeric_columns, DIAMETER, HEIGHT, LATITUDE, LONGITUDE, SPREAD};
use crate::error::TreeError;

/// Bins per histogram
pub const HISTOGRAM_BINS: usize = 50;

/// Attributes compared in the scatter matrix
pub const CORRELATION_ATTRIBUTES: [&str; 3] = [HEIGHT, DIAMETER, SPREAD];

/// Which figure to render
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Tree positions, faint so dense areas stand out
    Map,
    /// One histogram per numeric column
    Histograms,
    /// Positions sized by trunk diameter and colored by height
    Sized,
    /// Pairwise scatter of height, diameter and spread
    Correlations,
    /// Render nothing
    #[value(name = "none")]
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    GeoScatter(GeoScatter),
    HistogramGrid(HistogramGrid),
    SizedScatter(SizedScatter),
    ScatterMatrix(ScatterMatrix),
}

impl Figure {
    /// Short name used for output files
    pub fn kind(&self) -> &'static str {
        match self {
            Figure::GeoScatter(_) => "map",
            Figure::HistogramGrid(_) => "histograms",
            Figure::SizedScatter(_) => "sized",
            Figure::ScatterMatrix(_) => "correlations",
        }
    }
}

/// Longitude/latitude pairs
#[derive(Debug, Clone, PartialEq)]
pub struct GeoScatter {
    pub points: Vec<(f64, f64)>,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub column: String,
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Equal-width bins over the value range, the last bin closed on the right
    pub fn new(column: &str, values: &[f64], bins: usize) -> Self {
        let (mut min, mut max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min == max {
            min -= 0.5;
            max += 0.5;
        }

        let mut counts = vec![0; bins];
        let width = (max - min) / bins as f64;
        for &value in values {
            let bin = (((value - min) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Self {
            column: column.to_string(),
            min,
            max,
            counts,
        }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramGrid {
    pub panels: Vec<Histogram>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizedPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub diameter: f64,
    pub height: f64,
}

/// Positions with marker size from diameter and color from height
#[derive(Debug, Clone, PartialEq)]
pub struct SizedScatter {
    pub points: Vec<SizedPoint>,
    pub alpha: f64,
    pub label: String,
    /// Height range spanned by the color scale
    pub height_range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterMatrix {
    pub attributes: Vec<String>,
    /// One row per tree, one column per attribute
    pub values: Array2<f64>,
    /// Pearson correlation between attributes
    pub correlations: Array2<f64>,
}

/// Build the figure for `view`, or nothing for [`View::Skip`]
pub fn build(view: View, df: &DataFrame) -> crate::Result<Option<Figure>> {
    let figure = match view {
        View::Map => geo_scatter(df)?,
        View::Histograms => histogram_grid(df)?,
        View::Sized => sized_scatter(df)?,
        View::Correlations => scatter_matrix(df)?,
        View::Skip => return Ok(None),
    };
    Ok(Some(figure))
}

/// Rows where every listed column has a value
fn complete_rows<const N: usize>(df: &DataFrame, names: [&str; N]) -> crate::Result<Vec<[f64; N]>> {
    let columns = names
        .iter()
        .map(|name| float_values(df, name))
        .collect::<crate::Result<Vec<_>>>()?;

    Ok((0..df.height())
        .filter_map(|row| {
            let mut values = [0.0; N];
            for (slot, column) in values.iter_mut().zip(&columns) {
                *slot = column[row]?;
            }
            Some(values)
        })
        .collect())
}

/// Tree positions with alpha 0.1 to reveal density
pub fn geo_scatter(df: &DataFrame) -> crate::Result<Figure> {
    let points: Vec<(f64, f64)> = complete_rows(df, [LONGITUDE, LATITUDE])?
        .into_iter()
        .map(|[lon, lat]| (lon, lat))
        .collect();

    if points.is_empty() {
        return Err(TreeError::EmptyTable("map").into());
    }

    Ok(Figure::GeoScatter(GeoScatter { points, alpha: 0.1 }))
}

/// A histogram for every numeric column that has values
pub fn histogram_grid(df: &DataFrame) -> crate::Result<Figure> {
    let mut panels = Vec::new();
    for name in numeric_columns(df) {
        let values: Vec<f64> = float_values(df, &name)?.into_iter().flatten().collect();
        if !values.is_empty() {
            panels.push(Histogram::new(&name, &values, HISTOGRAM_BINS));
        }
    }

    if panels.is_empty() {
        return Err(TreeError::EmptyTable("histograms").into());
    }

    Ok(Figure::HistogramGrid(HistogramGrid { panels }))
}

/// Positions sized by trunk diameter and colored by height
pub fn sized_scatter(df: &DataFrame) -> crate::Result<Figure> {
    let points: Vec<SizedPoint> = complete_rows(df, [LONGITUDE, LATITUDE, DIAMETER, HEIGHT])?
        .into_iter()
        .map(|[longitude, latitude, diameter, height]| SizedPoint {
            longitude,
            latitude,
            diameter,
            height,
        })
        .collect();

    if points.is_empty() {
        return Err(TreeError::EmptyTable("sized scatter").into());
    }

    let height_range = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.height), hi.max(p.height))
        });

    Ok(Figure::SizedScatter(SizedScatter {
        points,
        alpha: 0.4,
        label: "Tree diameter".to_string(),
        height_range,
    }))
}

/// Pairwise scatter matrix of height, diameter and spread
pub fn scatter_matrix(df: &DataFrame) -> crate::Result<Figure> {
    let rows = complete_rows(df, CORRELATION_ATTRIBUTES)?;
    if rows.is_empty() {
        return Err(TreeError::EmptyTable("scatter matrix").into());
    }

    let n = rows.len();
    let values = Array2::from_shape_vec((n, CORRELATION_ATTRIBUTES.len()), rows.concat())?;
    let correlations = pearson(&values);

    Ok(Figure::ScatterMatrix(ScatterMatrix {
        attributes: CORRELATION_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        values,
        correlations,
    }))
}

/// Correlation matrix of the columns of `values`; NaN where a column is constant
pub fn pearson(values: &Array2<f64>) -> Array2<f64> {
    let k = values.ncols();
    let means: Vec<f64> = (0..k)
        .map(|j| values.column(j).sum() / values.nrows() as f64)
        .collect();

    Array2::from_shape_fn((k, k), |(a, b)| {
        let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        for row in values.outer_iter() {
            let da = row[a] - means[a];
            let db = row[b] - means[b];
            cov += da * db;
            var_a += da * da;
            var_b += db * db;
        }
        cov / (var_a * var_b).sqrt()
    })
}

/// Print the correlation matrix carried by a scatter matrix
pub fn print_correlations(matrix: &ScatterMatrix) {
    println!("\n=== Correlations ===");
    print!("{:>30}", "");
    for name in &matrix.attributes {
        print!(" {:>30}", name);
    }
    println!();

    for (name, row) in matrix.attributes.iter().zip(matrix.correlations.outer_iter()) {
        print!("{:>30}", name);
        for value in row.iter() {
            print!(" {:>30.3}", value);
        }
        println!();
    }
}
