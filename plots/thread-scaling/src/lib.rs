use std::path::Path;

use common::{
    aggregate::aggregate,
    chart::{ChartKind, ChartSpec},
    config::Settings,
    dataset::{Dataset, Field, RecordFilter},
    plot::{Report, render_chart},
    series::build_series,
};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grouped bars of a metric per thread count, one bar per matching coloring method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadScaling {
    /// Selects the parallel methods
    pub filter: RecordFilter,
    #[serde(default = "default_metric")]
    pub metric: Field,
    pub file: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    #[serde(default)]
    pub annotate: bool,
    #[serde(default = "default_size")]
    pub size: (u32, u32),
}

fn default_metric() -> Field {
    Field::ColoringTime
}

fn default_size() -> (u32, u32) {
    (1000, 600)
}

impl ThreadScaling {
    /// Mean coloring time of the par* methods per thread count
    pub fn parallel_methods() -> Self {
        Self {
            filter: RecordFilter::prefix(Field::ColoringMethod, "par"),
            metric: default_metric(),
            file: "par_threads_comparison".to_owned(),
            title: "Comparison of parallel coloring algorithms for different number of threads"
                .to_owned(),
            x_label: "Number of threads".to_owned(),
            y_label: "Average coloring time in seconds".to_owned(),
            annotate: true,
            size: default_size(),
        }
    }
}

#[typetag::serde]
impl Report for ThreadScaling {
    fn outputs(&self) -> Vec<String> {
        vec![self.file.clone()]
    }

    fn generate(&self, dataset: &Dataset, plot_path: &Path, settings: &Settings) -> Result<()> {
        let parallel = dataset.filter(&self.filter)?;
        debug!(
            "{} records from {} parallel methods",
            parallel.len(),
            parallel.distinct(Field::ColoringMethod).len()
        );

        let aggregation = aggregate(
            &parallel,
            &[Field::ColoringMethod, Field::NThreads],
            &[self.metric],
        )?
        .sorted();
        let data = build_series(&aggregation, Field::ColoringMethod, Field::NThreads, self.metric)?;

        let spec = ChartSpec::new(ChartKind::Bar, &self.title, &self.x_label, &self.y_label)
            .with_size(self.size)
            .annotated(self.annotate);
        render_chart(&data, &spec, plot_path, &self.file, settings)
    }
}

#[cfg(test)]
mod tests {
    use common::{dataset::ResultRecord, error::RenderError, plot::image_path};

    use super::*;

    fn record(method: &str, threads: u32, time: f64) -> ResultRecord {
        ResultRecord {
            graph_name: "rgg_n_2_15".to_owned(),
            vertex_count: 32768,
            coloring_method: method.to_owned(),
            n_threads: threads,
            coloring_time: time,
            colors_used: 12,
        }
    }

    #[test]
    fn bars_per_thread_count() {
        let dir = tempfile::tempdir().unwrap();
        let dataset: Dataset = [
            record("par_ldf", 4, 0.5),
            record("par_jp", 2, 1.0),
            record("par_jp", 4, 0.75),
            record("par_jp", 4, 0.25),
            record("seq_greedy", 1, 3.0),
        ]
        .into_iter()
        .collect();

        let report = ThreadScaling::parallel_methods();
        report
            .generate(&dataset, dir.path(), &Settings::default())
            .unwrap();
        assert!(image_path(dir.path(), "par_threads_comparison").exists());
    }

    #[test]
    fn sequential_only_has_nothing_to_draw() {
        let dir = tempfile::tempdir().unwrap();
        let dataset: Dataset = [record("seq_greedy", 1, 3.0), record("seq_ldf", 1, 2.0)]
            .into_iter()
            .collect();

        let report = ThreadScaling::parallel_methods();
        let parallel = dataset.filter(&report.filter).unwrap();
        let aggregation = aggregate(
            &parallel,
            &[Field::ColoringMethod, Field::NThreads],
            &[report.metric],
        )
        .unwrap();
        assert!(aggregation.is_empty());

        let err = report
            .generate(&dataset, dir.path(), &Settings::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::EmptySeries { .. })
        ));
        assert!(!image_path(dir.path(), "par_threads_comparison").exists());
    }
}
