use std::{collections::HashMap, fs, path::Path};

use common::{
    aggregate::aggregate,
    config::Settings,
    dataset::{Dataset, Field},
    plot::Report,
    series::{SeriesSet, build_series},
    util::format_value,
};
use eyre::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Markdown table of a metric's mean, one row per graph and one column per coloring method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingTable {
    #[serde(default = "default_metric")]
    pub metric: Field,
    #[serde(default = "default_file")]
    pub file: String,
    /// Decimal places kept in each cell
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_metric() -> Field {
    Field::ColoringTime
}

fn default_file() -> String {
    "table.md".to_owned()
}

fn default_precision() -> usize {
    5
}

impl Default for TimingTable {
    fn default() -> Self {
        Self {
            metric: default_metric(),
            file: default_file(),
            precision: default_precision(),
        }
    }
}

fn markdown(data: &SeriesSet, row_header: &str, precision: usize) -> String {
    let columns = data
        .series
        .iter()
        .map(|series| {
            series
                .points
                .iter()
                .map(|(x, value)| (x.as_str(), *value))
                .collect::<HashMap<_, _>>()
        })
        .collect::<Vec<_>>();

    let mut table = format!(
        "| {row_header} | {} |\n",
        data.series.iter().map(|series| &series.label).join(" | ")
    );
    table.push_str(&format!(
        "|{}\n",
        "---|".repeat(data.series.len() + 1)
    ));
    for category in &data.categories {
        let cells = columns
            .iter()
            .map(|column| {
                column
                    .get(category.as_str())
                    .map(|value| format_value(*value, precision))
                    .unwrap_or_default()
            })
            .join(" | ");
        table.push_str(&format!("| {category} | {cells} |\n"));
    }
    table
}

#[typetag::serde]
impl Report for TimingTable {
    fn outputs(&self) -> Vec<String> {
        vec![self.file.clone()]
    }

    fn generate(&self, dataset: &Dataset, plot_path: &Path, _: &Settings) -> Result<()> {
        // Method first so the columns come out sorted by name
        let aggregation = aggregate(
            dataset,
            &[Field::ColoringMethod, Field::GraphName],
            &[self.metric],
        )?
        .sorted();
        let data = build_series(&aggregation, Field::ColoringMethod, Field::GraphName, self.metric)?;

        let path = plot_path.join(&self.file);
        fs::write(
            &path,
            markdown(&data, Field::GraphName.name(), self.precision),
        )
        .context(format!("Write {}", path.display()))?;
        debug!(
            "Wrote {} rows of mean {} to {}",
            data.categories.len(),
            self.metric,
            path.display()
        );
        Ok(())
    }
}
