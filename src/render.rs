//! Presenting figures: PNG files drawn with Plotters, or a recorder for tests

use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::prompt::Prompter;
use crate::viz::{
    self, Figure, GeoScatter, Histogram, HistogramGrid, ScatterMatrix, SizedScatter, View,
};

/// Bins of the diagonal histograms in the scatter matrix
const DIAGONAL_BINS: usize = 10;

/// Width in pixels of the height colorbar
const COLORBAR_WIDTH: u32 = 110;

/// Somewhere figures can be shown
pub trait RenderSink {
    fn present(&mut self, figure: &Figure) -> crate::Result<()>;
}

/// Keeps every presented figure instead of drawing it
#[derive(Debug, Default)]
pub struct RecordingSink {
    figures: Vec<Figure>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }
}

impl RenderSink for RecordingSink {
    fn present(&mut self, figure: &Figure) -> crate::Result<()> {
        self.figures.push(figure.clone());
        Ok(())
    }
}

/// Draws each figure into `<output_dir>/<n>_<kind>.png`
///
/// With a prompter attached, every figure blocks until the user dismisses it.
pub struct BitmapSink {
    output_dir: PathBuf,
    size: (u32, u32),
    presented: usize,
    dismiss: Option<Box<dyn Prompter>>,
}

impl BitmapSink {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            size: (1000, 700),
            presented: 0,
            dismiss: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Wait for an answer from `prompter` after every figure
    pub fn wait_with(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.dismiss = Some(prompter);
        self
    }

    /// File the next presented figure is written to
    pub fn next_path(&self, figure: &Figure) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.png", self.presented + 1, figure.kind()))
    }
}

impl RenderSink for BitmapSink {
    fn present(&mut self, figure: &Figure) -> crate::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.next_path(figure);

        draw_figure(figure, &path, self.size)?;
        self.presented += 1;
        println!("Figure '{}' saved to: {}", figure.kind(), path.display());

        if let Some(prompter) = self.dismiss.as_mut() {
            prompter.ask("Press <ENTER> to close the figure ")?;
        }

        Ok(())
    }
}

/// Build the figure for `view` and present it; returns whether anything was shown
pub fn show<S: RenderSink + ?Sized>(
    view: View,
    df: &polars::prelude::DataFrame,
    sink: &mut S,
) -> crate::Result<bool> {
    let Some(figure) = viz::build(view, df)? else {
        return Ok(false);
    };

    if let Figure::ScatterMatrix(matrix) = &figure {
        viz::print_correlations(matrix);
    }
    log::info!("presenting {} figure", figure.kind());
    sink.present(&figure)?;

    Ok(true)
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn draw_figure(figure: &Figure, path: &Path, size: (u32, u32)) -> crate::Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    match figure {
        Figure::GeoScatter(map) => draw_map(&root, map)?,
        Figure::HistogramGrid(grid) => draw_histograms(&root, grid)?,
        Figure::SizedScatter(scatter) => draw_sized(&root, scatter, size.0)?,
        Figure::ScatterMatrix(matrix) => draw_matrix(&root, matrix)?,
    }

    root.present()?;
    Ok(())
}

fn draw_map(root: &Area, map: &GeoScatter) -> crate::Result<()> {
    let mut chart = ChartBuilder::on(root)
        .caption("Street trees", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            span(map.points.iter().map(|p| p.0)),
            span(map.points.iter().map(|p| p.1)),
        )?;

    chart
        .configure_mesh()
        .x_desc("longitude")
        .y_desc("latitude")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let style = BLUE.mix(map.alpha).filled();
    chart.draw_series(map.points.iter().map(|&p| Circle::new(p, 2, style)))?;

    Ok(())
}

fn draw_histograms(root: &Area, grid: &HistogramGrid) -> crate::Result<()> {
    let cols = (grid.panels.len() as f64).sqrt().ceil() as usize;
    let rows = grid.panels.len().div_ceil(cols);

    for (area, histogram) in root.split_evenly((rows, cols)).iter().zip(&grid.panels) {
        draw_histogram(area, histogram, 18)?;
    }

    Ok(())
}

fn draw_histogram(area: &Area, histogram: &Histogram, caption_size: u32) -> crate::Result<()> {
    let top = histogram.counts.iter().copied().max().unwrap_or(0) as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(&histogram.column, ("sans-serif", caption_size))
        .margin(5)
        .x_label_area_size(25)
        .y_label_area_size(40)
        .build_cartesian_2d(histogram.min..histogram.max, 0f64..(top * 1.1).max(1.0))?;

    chart.configure_mesh().x_labels(5).y_labels(5).draw()?;

    let width = histogram.bin_width();
    chart.draw_series(histogram.counts.iter().enumerate().map(|(i, &count)| {
        let left = histogram.min + i as f64 * width;
        Rectangle::new(
            [(left, 0.0), (left + width, count as f64)],
            BLUE.mix(0.7).filled(),
        )
    }))?;

    Ok(())
}

fn draw_sized(root: &Area, scatter: &SizedScatter, width: u32) -> crate::Result<()> {
    let (plot_area, bar_area) = root.split_horizontally(width.saturating_sub(COLORBAR_WIDTH));
    let (low, high) = scatter.height_range;
    let scale = |height: f64| {
        if high > low {
            (height - low) / (high - low)
        } else {
            0.5
        }
    };

    let mut chart = ChartBuilder::on(&plot_area)
        .caption("Trees by diameter and height", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            span(scatter.points.iter().map(|p| p.longitude)),
            span(scatter.points.iter().map(|p| p.latitude)),
        )?;

    chart
        .configure_mesh()
        .x_desc("longitude")
        .y_desc("latitude")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let alpha = scatter.alpha;
    chart
        .draw_series(scatter.points.iter().map(|p| {
            Circle::new(
                (p.longitude, p.latitude),
                marker_radius(p.diameter),
                jet(scale(p.height)).mix(alpha).filled(),
            )
        }))?
        .label(scatter.label.as_str())
        .legend(|(x, y)| Circle::new((x + 5, y), 5, BLUE.mix(0.4).filled()));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    let colors = if high > low { low..high } else { (low - 0.5)..(high + 0.5) };
    let step = (colors.end - colors.start) / 100.0;
    let mut bar = ChartBuilder::on(&bar_area)
        .margin(10)
        .margin_top(50)
        .margin_bottom(60)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1f64, colors.clone())?;

    bar.configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_desc("height_m")
        .draw()?;

    bar.draw_series((0..100).map(|i| {
        let bottom = colors.start + i as f64 * step;
        Rectangle::new(
            [(0.0, bottom), (1.0, bottom + step)],
            jet((i as f64 + 0.5) / 100.0).filled(),
        )
    }))?;

    Ok(())
}

fn draw_matrix(root: &Area, matrix: &ScatterMatrix) -> crate::Result<()> {
    let k = matrix.attributes.len();
    let columns: Vec<Vec<f64>> = (0..k).map(|j| matrix.values.column(j).to_vec()).collect();

    for (index, area) in root.split_evenly((k, k)).iter().enumerate() {
        let (row, col) = (index / k, index % k);

        if row == col {
            let histogram = Histogram::new(&matrix.attributes[row], &columns[row], DIAGONAL_BINS);
            draw_histogram(area, &histogram, 14)?;
            continue;
        }

        let mut chart = ChartBuilder::on(area)
            .margin(5)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(
                span(columns[col].iter().copied()),
                span(columns[row].iter().copied()),
            )?;

        {
            let mut mesh = chart.configure_mesh();
            mesh.x_labels(4).y_labels(4);
            if row == k - 1 {
                mesh.x_desc(matrix.attributes[col].as_str());
            }
            if col == 0 {
                mesh.y_desc(matrix.attributes[row].as_str());
            }
            mesh.draw()?;
        }

        chart.draw_series(
            columns[col]
                .iter()
                .zip(&columns[row])
                .map(|(&x, &y)| Circle::new((x, y), 2, BLUE.mix(0.5).filled())),
        )?;
    }

    Ok(())
}

/// Axis range around `values` with a little padding
fn span<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (low, high) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if low == high {
        return (low - 0.5)..(high + 0.5);
    }
    let pad = (high - low) * 0.05;
    (low - pad)..(high + pad)
}

/// Marker radius in pixels for a trunk diameter in cm
fn marker_radius(diameter: f64) -> i32 {
    (diameter.max(0.0).sqrt() / 2.0).round().max(1.0) as i32
}

/// The "jet" color scale: blue through cyan, yellow and red for `t` in `[0, 1]`
pub fn jet(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let channel = |offset: f64| {
        let level = (1.5 - (4.0 * t - offset).abs()).clamp(0.0, 1.0);
        (level * 255.0).round() as u8
    };
    RGBColor(channel(3.0), channel(2.0), channel(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic_trees;
    use crate::prompt::ScriptedPrompter;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Counts how often a figure was dismissed
    struct CountingPrompter(Rc<Cell<usize>>);

    impl Prompter for CountingPrompter {
        fn ask(&mut self, _message: &str) -> crate::Result<String> {
            self.0.set(self.0.get() + 1);
            Ok(String::new())
        }
    }

    #[test]
    fn test_bitmap_sink_draws_every_view() {
        let df = synthetic_trees(50);
        let temp_dir = tempdir().unwrap();
        let dismissed = Rc::new(Cell::new(0));
        let mut sink = BitmapSink::new(temp_dir.path())
            .with_size(400, 300)
            .wait_with(Box::new(CountingPrompter(Rc::clone(&dismissed))));

        for view in [View::Map, View::Histograms, View::Sized, View::Correlations] {
            assert!(show(view, &df, &mut sink).unwrap());
        }

        for name in ["1_map.png", "2_histograms.png", "3_sized.png", "4_correlations.png"] {
            assert!(temp_dir.path().join(name).exists(), "{} was not written", name);
        }
        assert_eq!(dismissed.get(), 4);
    }

    #[test]
    fn test_bitmap_sink_draws_a_single_tree() {
        let df = synthetic_trees(1);
        let temp_dir = tempdir().unwrap();
        let mut sink = BitmapSink::new(temp_dir.path())
            .with_size(400, 300)
            .wait_with(Box::new(ScriptedPrompter::new([""])));

        assert!(show(View::Sized, &df, &mut sink).unwrap());
        assert!(show(View::Correlations, &df, &mut sink).unwrap());

        assert!(temp_dir.path().join("1_sized.png").exists());
        assert!(temp_dir.path().join("2_correlations.png").exists());
    }

    #[test]
    fn test_recording_sink() {
        let df = synthetic_trees(12);
        let mut sink = RecordingSink::new();

        assert!(show(View::Map, &df, &mut sink).unwrap());
        assert!(show(View::Correlations, &df, &mut sink).unwrap());
        assert!(!show(View::Skip, &df, &mut sink).unwrap());

        let kinds: Vec<&str> = sink.figures().iter().map(Figure::kind).collect();
        assert_eq!(kinds, vec!["map", "correlations"]);
    }

    #[test]
    fn test_bitmap_paths() {
        let sink = BitmapSink::new("plots");
        let figure = viz::geo_scatter(&synthetic_trees(3)).unwrap();

        assert_eq!(sink.next_path(&figure), PathBuf::from("plots/1_map.png"));
    }

    #[test]
    fn test_jet_scale() {
        assert_eq!(jet(0.0), RGBColor(0, 0, 128));
        assert_eq!(jet(0.5), RGBColor(128, 255, 128));
        assert_eq!(jet(1.0), RGBColor(128, 0, 0));
        assert_eq!(jet(7.0), jet(1.0));
    }

    #[test]
    fn test_span() {
        assert_eq!(span([0.0, 10.0]), -0.5..10.5);
        assert_eq!(span([2.0, 2.0]), 1.5..2.5);
    }

    #[test]
    fn test_marker_radius() {
        assert_eq!(marker_radius(0.0), 1);
        assert_eq!(marker_radius(100.0), 5);
    }
}
