use std::{borrow::Cow, path::Path};

use common::{
    aggregate::aggregate,
    chart::{ChartKind, ChartSpec, TickCap},
    config::Settings,
    dataset::{Dataset, Field, RecordFilter},
    plot::{Report, render_chart},
    series::build_series,
    util::fill_title,
};
use eyre::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One line per coloring method, for each configured metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodComparison {
    #[serde(default)]
    pub filter: Option<RecordFilter>,
    pub x_axis: Field,
    pub x_label: String,
    #[serde(default = "default_size")]
    pub size: (u32, u32),
    pub charts: Vec<MetricChart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricChart {
    pub metric: Field,
    /// Image file stem
    pub file: String,
    /// `{count}` is replaced by the number of x categories
    pub title: String,
    pub y_label: String,
    #[serde(default)]
    pub y_ticks: Option<TickCap>,
}

fn default_size() -> (u32, u32) {
    (1500, 800)
}

const TIME_LABEL: &str = "Average coloring time in seconds";
const COLORS_LABEL: &str = "Average colors used";

impl MetricChart {
    fn new(metric: Field, file: &str, title: &str, y_label: &str) -> Self {
        Self {
            metric,
            file: file.to_owned(),
            title: title.to_owned(),
            y_label: y_label.to_owned(),
            y_ticks: None,
        }
    }

    fn with_y_ticks(mut self, y_ticks: TickCap) -> Self {
        self.y_ticks = Some(y_ticks);
        self
    }
}

impl MethodComparison {
    /// Time and colors over every graph
    pub fn all_graphs() -> Self {
        Self {
            filter: None,
            x_axis: Field::GraphName,
            x_label: "Graph name".to_owned(),
            size: default_size(),
            charts: vec![
                MetricChart::new(
                    Field::ColoringTime,
                    "all_time_comparison",
                    "Comparison of coloring algorithms over {count} different graphs",
                    TIME_LABEL,
                )
                .with_y_ticks(TickCap::BelowTop { margin: 2 }),
                MetricChart::new(
                    Field::ColorsUsed,
                    "all_colors_comparison",
                    "Comparison of coloring algorithms over {count} different graphs (biased by outliers)",
                    COLORS_LABEL,
                ),
            ],
        }
    }

    /// Colors over every graph except the v100* outliers
    pub fn without_outliers() -> Self {
        Self {
            filter: Some(RecordFilter::prefix(Field::GraphName, "v100").excluding()),
            x_axis: Field::GraphName,
            x_label: "Graph name".to_owned(),
            size: default_size(),
            charts: vec![MetricChart::new(
                Field::ColorsUsed,
                "no_v100_colors_comparison",
                "Comparison of coloring algorithms over {count} different graphs",
                COLORS_LABEL,
            )],
        }
    }

    /// Time and colors over the random geometric graphs, by vertex count
    pub fn graph_family() -> Self {
        let title = "Comparison of coloring algorithms over RGGs (Random Geometric Graphs)";
        Self {
            filter: Some(RecordFilter::prefix(Field::GraphName, "rgg")),
            x_axis: Field::VertexCount,
            x_label: "Number of vertices".to_owned(),
            size: (1200, 800),
            charts: vec![
                MetricChart::new(Field::ColoringTime, "rgg_time_comparison", title, TIME_LABEL),
                MetricChart::new(
                    Field::ColorsUsed,
                    "rgg_colors_comparison",
                    title,
                    COLORS_LABEL,
                )
                .with_y_ticks(TickCap::Fixed { limit: 14 }),
            ],
        }
    }
}

#[typetag::serde]
impl Report for MethodComparison {
    fn outputs(&self) -> Vec<String> {
        self.charts.iter().map(|chart| chart.file.clone()).collect()
    }

    fn generate(&self, dataset: &Dataset, plot_path: &Path, settings: &Settings) -> Result<()> {
        let dataset = match &self.filter {
            Some(filter) => Cow::Owned(dataset.filter(filter)?),
            None => Cow::Borrowed(dataset),
        };
        debug!("{} records to compare by {}", dataset.len(), self.x_axis);

        let metrics = self
            .charts
            .iter()
            .map(|chart| chart.metric)
            .unique()
            .collect::<Vec<_>>();
        let aggregation = aggregate(&dataset, &[Field::ColoringMethod, self.x_axis], &metrics)?;

        for chart in &self.charts {
            let data = build_series(&aggregation, Field::ColoringMethod, self.x_axis, chart.metric)?;
            let spec = ChartSpec::new(
                ChartKind::Line,
                &fill_title(&chart.title, data.categories.len()),
                &self.x_label,
                &chart.y_label,
            )
            .with_size(self.size)
            .with_y_ticks(chart.y_ticks);
            render_chart(&data, &spec, plot_path, &chart.file, settings)?;
        }
        Ok(())
    }
}
