use std::{collections::HashMap, error::Error, path::Path};

use plotters::{
    coord::combinators::BindKeyPoints,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::RenderError, series::SeriesSet, util::format_value};

const FONT: &str = "sans-serif";
/// Charts with more categories than this get vertical x labels
const ROTATE_LABELS_AFTER: usize = 8;
/// Share of a category slot covered by its group of bars
const BAR_GROUP_WIDTH: f64 = 0.6;
/// Upper bound on labelled ticks below a [`TickCap`]
const MAX_CAPPED_TICKS: f64 = 40.0;
/// Rough number of y ticks on an uncapped axis
const DEFAULT_TICKS: f64 = 10.0;

type DrawResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
}

/// Caps the labelled y ticks so charts with outliers stay comparable.
///
/// Ticks sit on integers from zero up to the cap, thinned out to at most 40
/// labels. The axis still extends to fit the data, and has no ticks above the
/// cap. A cap that leaves fewer than two ticks falls back to regular ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TickCap {
    /// Ticks `0..=limit`, the axis reaches at least `limit`
    Fixed { limit: u32 },
    /// Ticks stop `margin` below the rounded-up axis top, the axis is left as is
    BelowTop { margin: u32 },
}

impl TickCap {
    pub fn limit(&self, top: f64) -> f64 {
        match self {
            TickCap::Fixed { limit } => f64::from(*limit),
            TickCap::BelowTop { margin } => (top.ceil() - f64::from(*margin)).max(0.0),
        }
    }
}

/// Top of the y axis and the values that get a label and a grid line.
#[derive(Debug, Clone, PartialEq)]
struct YAxis {
    top: f64,
    ticks: Vec<f64>,
    /// Decimal places of the tick labels
    decimals: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub y_ticks: Option<TickCap>,
    /// Print each bar's value above it
    pub annotate: bool,
    pub size: (u32, u32),
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            kind,
            title: title.to_owned(),
            x_label: x_label.to_owned(),
            y_label: y_label.to_owned(),
            y_ticks: None,
            annotate: false,
            size: (1500, 800),
        }
    }

    pub fn with_size(mut self, size: (u32, u32)) -> Self {
        self.size = size;
        self
    }

    pub fn with_y_ticks(mut self, y_ticks: Option<TickCap>) -> Self {
        self.y_ticks = y_ticks;
        self
    }

    pub fn annotated(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    fn y_axis(&self, data: &SeriesSet) -> YAxis {
        let max = data.max_value().unwrap_or(0.0).max(0.0);
        let headroom = if self.annotate { 1.15 } else { 1.05 };
        let mut top = if max > 0.0 { max * headroom } else { 1.0 };
        if let Some(TickCap::Fixed { limit }) = self.y_ticks {
            top = top.max(f64::from(limit) + 0.5);
        }

        let capped = self.y_ticks.and_then(|cap| {
            let limit = cap.limit(top).min(top);
            let ticks = ticks_up_to(limit, nice_step(limit / MAX_CAPPED_TICKS).max(1.0));
            (ticks.len() >= 2).then_some(ticks)
        });
        match capped {
            Some(ticks) => YAxis {
                top,
                ticks,
                decimals: 0,
            },
            None => {
                let step = nice_step(top / DEFAULT_TICKS);
                YAxis {
                    top,
                    ticks: ticks_up_to(top, step),
                    decimals: (-step.log10().floor()).max(0.0) as usize,
                }
            }
        }
    }
}

/// Smallest of 1, 2 or 5 times a power of ten that is at least `raw`
fn nice_step(raw: f64) -> f64 {
    if raw <= 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let scale = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 5.0]
        .into_iter()
        .map(|factor| scale * factor)
        .find(|step| *step >= raw * (1.0 - 1e-9))
        .unwrap_or(scale * 10.0)
}

/// Multiples of `step` from zero up to `bound`
fn ticks_up_to(bound: f64, step: f64) -> Vec<f64> {
    let count = (bound / step + 1e-9).floor().max(0.0) as usize;
    (0..=count).map(|idx| idx as f64 * step).collect()
}

fn rotated_label_area(categories: &[String]) -> u32 {
    let longest = categories
        .iter()
        .map(|category| category.chars().count())
        .max()
        .unwrap_or(0);
    longest as u32 * 8 + 30
}

/// Draws `data` as a PNG at `output`, replacing any existing file.
///
/// Nothing is written when there are no series to draw.
pub fn render(data: &SeriesSet, spec: &ChartSpec, output: &Path) -> Result<(), RenderError> {
    if data.is_empty() {
        return Err(RenderError::EmptySeries {
            path: output.to_path_buf(),
        });
    }
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.is_dir()
    {
        return Err(RenderError::MissingDirectory {
            path: parent.to_path_buf(),
        });
    }

    debug!(
        "Rendering {} series over {} categories to {}",
        data.series.len(),
        data.categories.len(),
        output.display()
    );
    draw(data, spec, output).map_err(|source| RenderError::Draw {
        path: output.to_path_buf(),
        source,
    })
}

fn draw(data: &SeriesSet, spec: &ChartSpec, output: &Path) -> DrawResult<()> {
    let root = BitMapBackend::new(output, spec.size).into_drawing_area();
    root.fill(&WHITE)?;

    let categories = &data.categories;
    let segments = categories.len().max(1);
    let rotate = categories.len() > ROTATE_LABELS_AFTER;
    let YAxis {
        top: y_top,
        ticks: y_ticks,
        decimals: y_decimals,
    } = spec.y_axis(data);

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, (FONT, 26))
        .margin(20)
        .x_label_area_size(if rotate {
            rotated_label_area(categories)
        } else {
            50
        })
        .y_label_area_size(70)
        .build_cartesian_2d(
            (0..segments as i32 - 1).into_segmented(),
            (0f64..y_top).with_key_points(y_ticks),
        )?;

    let x_formatter = |value: &SegmentValue<i32>| match value {
        SegmentValue::CenterOf(idx) => usize::try_from(*idx)
            .ok()
            .and_then(|idx| categories.get(idx))
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    };
    let y_formatter = |value: &f64| format_value(*value, y_decimals);
    let x_font = if rotate {
        (FONT, 14).into_font().transform(FontTransform::Rotate90)
    } else {
        (FONT, 14).into_font()
    };

    let mut mesh = chart.configure_mesh();
    mesh.x_labels(segments)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_label_style(x_font)
        .y_label_style((FONT, 14))
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .axis_desc_style((FONT, 16))
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(WHITE.mix(0.0));
    if spec.kind == ChartKind::Bar {
        mesh.disable_x_mesh();
    }
    mesh.draw()?;

    let positions: HashMap<&str, i32> = categories
        .iter()
        .enumerate()
        .map(|(idx, category)| (category.as_str(), idx as i32))
        .collect();

    match spec.kind {
        ChartKind::Line => {
            for (idx, series) in data.series.iter().enumerate() {
                let color = Palette99::pick(idx).to_rgba();
                let points = series
                    .points
                    .iter()
                    .filter_map(|(x, y)| {
                        positions
                            .get(x.as_str())
                            .map(|pos| (SegmentValue::CenterOf(*pos), *y))
                    })
                    .collect::<Vec<_>>();
                chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)).point_size(4))?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
            }
        }
        ChartKind::Bar => {
            let (x_pixels, _) = chart.plotting_area().get_pixel_range();
            let slot = f64::from(x_pixels.end - x_pixels.start) / segments as f64;
            let group_width = slot * BAR_GROUP_WIDTH;
            let bar_width = group_width / data.series.len() as f64;
            let baseline = chart.backend_coord(&(SegmentValue::CenterOf(0), 0.0)).1;
            let value_font =
                TextStyle::from((FONT, 13).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));

            for (idx, series) in data.series.iter().enumerate() {
                let color = Palette99::pick(idx).to_rgba();
                for (x, y) in &series.points {
                    let Some(pos) = positions.get(x.as_str()) else {
                        continue;
                    };
                    let (center, top) = chart.backend_coord(&(SegmentValue::CenterOf(*pos), *y));
                    let left = f64::from(center) - group_width / 2.0 + bar_width * idx as f64;
                    let right = left + bar_width;
                    root.draw(&Rectangle::new(
                        [(left.round() as i32, top), (right.round() as i32, baseline)],
                        color.filled(),
                    ))?;
                    if spec.annotate {
                        root.draw(&Text::new(
                            format_value(*y, 2),
                            (((left + right) / 2.0).round() as i32, top - 4),
                            value_font.clone(),
                        ))?;
                    }
                }
                chart
                    .draw_series(std::iter::empty::<Rectangle<(SegmentValue<i32>, f64)>>())?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 6), (x + 16, y + 6)], color.filled())
                    });
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, 14))
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::series::Series;

    fn series_set(values: &[(&str, &[(&str, f64)])]) -> SeriesSet {
        let mut categories = values
            .iter()
            .flat_map(|(_, points)| points.iter().map(|(x, _)| (*x).to_owned()))
            .collect::<Vec<_>>();
        categories.sort();
        categories.dedup();
        SeriesSet {
            categories,
            series: values
                .iter()
                .map(|(label, points)| Series {
                    label: (*label).to_owned(),
                    points: points.iter().map(|(x, y)| ((*x).to_owned(), *y)).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_series_leaves_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("chart.png");
        fs::write(&output, b"previous").unwrap();

        let spec = ChartSpec::new(ChartKind::Line, "t", "x", "y");
        let err = render(&SeriesSet::default(), &spec, &output).unwrap_err();
        assert!(matches!(err, RenderError::EmptySeries { .. }));
        assert_eq!(fs::read(&output).unwrap(), b"previous");

        let fresh = dir.path().join("fresh.png");
        assert!(render(&SeriesSet::default(), &spec, &fresh).is_err());
        assert!(!fresh.exists());
    }

    #[test]
    fn missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("chart.png");
        let data = series_set(&[("m1", &[("g1", 1.0)])]);

        let err = render(&data, &ChartSpec::new(ChartKind::Line, "t", "x", "y"), &output)
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingDirectory { .. }));
    }

    #[test]
    fn line_and_bar_charts_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let data = series_set(&[
            ("par_jp", &[("1", 2.0), ("2", 1.25), ("4", 0.75)]),
            ("par_ldf", &[("1", 2.5), ("4", 1.0)]),
        ]);

        let line = dir.path().join("line.png");
        render(&data, &ChartSpec::new(ChartKind::Line, "t", "x", "y"), &line).unwrap();
        let bar = dir.path().join("bar.png");
        let spec = ChartSpec::new(ChartKind::Bar, "t", "x", "y")
            .with_size((800, 600))
            .annotated(true);
        render(&data, &spec, &bar).unwrap();

        for path in [&line, &bar] {
            let bytes = fs::read(path).unwrap();
            assert_eq!(&bytes[1..4], b"PNG");
        }
    }

    #[test]
    fn tick_caps() {
        assert_eq!(TickCap::Fixed { limit: 14 }.limit(3.0), 14.0);
        assert_eq!(TickCap::BelowTop { margin: 2 }.limit(10.3), 9.0);
        assert_eq!(TickCap::BelowTop { margin: 2 }.limit(1.0), 0.0);

        let data = series_set(&[("m1", &[("g1", 4.0)])]);
        let spec = ChartSpec::new(ChartKind::Line, "t", "x", "y")
            .with_y_ticks(Some(TickCap::Fixed { limit: 14 }));
        let axis = spec.y_axis(&data);
        assert_eq!(axis.top, 14.5);
        assert_eq!(axis.ticks.len(), 15);
        assert_eq!(axis.ticks.last(), Some(&14.0));

        let axis = ChartSpec::new(ChartKind::Line, "t", "x", "y").y_axis(&data);
        assert!((axis.top - 4.2).abs() < 1e-9);
        assert_eq!(axis.ticks.len(), 9);
        assert_eq!(axis.decimals, 1);
    }

    #[test]
    fn below_top_leaves_sub_second_axis_alone() {
        let data = series_set(&[
            ("seq_greedy", &[("g1", 0.012), ("g2", 0.033)]),
            ("par_jp", &[("g1", 0.006), ("g2", 0.015)]),
        ]);
        let spec = ChartSpec::new(ChartKind::Line, "t", "x", "y")
            .with_y_ticks(Some(TickCap::BelowTop { margin: 2 }));

        let axis = spec.y_axis(&data);
        assert!((axis.top - 0.033 * 1.05).abs() < 1e-9);
        assert_eq!(axis.decimals, 3);
        assert!(axis.ticks.len() >= 5);
        assert!(axis.ticks.iter().all(|tick| *tick <= axis.top));
        assert!(axis.ticks.iter().any(|tick| *tick > axis.top / 2.0));

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("time.png");
        render(&data, &spec, &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn below_top_caps_large_values() {
        let data = series_set(&[("m1", &[("g1", 19.5)])]);
        let axis = ChartSpec::new(ChartKind::Line, "t", "x", "y")
            .with_y_ticks(Some(TickCap::BelowTop { margin: 2 }))
            .y_axis(&data);
        assert!((axis.top - 20.475).abs() < 1e-9);
        assert_eq!(axis.ticks.last(), Some(&19.0));
        assert_eq!(axis.decimals, 0);
    }

    #[test]
    fn outlier_above_fixed_cap() {
        let graphs = (0..36).map(|idx| format!("g{idx:02}")).collect::<Vec<_>>();
        let points = graphs
            .iter()
            .enumerate()
            .map(|(idx, graph)| (graph.as_str(), if idx == 7 { 3000.0 } else { 5.0 }))
            .collect::<Vec<_>>();
        let data = series_set(&[("seq_greedy", points.as_slice())]);
        let spec = ChartSpec::new(ChartKind::Line, "t", "x", "y")
            .with_y_ticks(Some(TickCap::Fixed { limit: 14 }));

        let axis = spec.y_axis(&data);
        assert!((axis.top - 3150.0).abs() < 1e-6);
        assert_eq!(axis.ticks, (0..=14).map(f64::from).collect::<Vec<_>>());

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("colors.png");
        render(&data, &spec, &output).unwrap();
        assert_eq!(&fs::read(&output).unwrap()[1..4], b"PNG");
    }

    #[test]
    fn steps_are_round() {
        assert_eq!(nice_step(0.3), 0.5);
        assert_eq!(nice_step(1.5), 2.0);
        assert_eq!(nice_step(3.0), 5.0);
        assert_eq!(nice_step(12.0), 20.0);
        assert_eq!(nice_step(1.0), 1.0);
        assert!((nice_step(0.0034) - 0.005).abs() < 1e-12);
        assert_eq!(ticks_up_to(1.0, 0.5), [0.0, 0.5, 1.0]);
    }
}
