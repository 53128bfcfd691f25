use core::fmt::Debug;
use std::path::{Path, PathBuf};

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, Result};
use tracing::{debug, info};

use crate::{
    chart::{ChartSpec, render},
    config::{Config, Settings},
    dataset::Dataset,
    error::RenderError,
    series::SeriesSet,
    util::dump_plot_data,
};

pub const IMAGE_EXTENSION: &str = "png";

#[typetag::serde(tag = "type")]
pub trait Report: Debug + DynClone + Send + Sync {
    /// File stems of the images this report writes
    fn outputs(&self) -> Vec<String>;
    /// Generates the report
    ///
    /// Arguments:
    /// * `dataset` - Every loaded result record, shared by all reports
    /// * `plot_path` - The directory the charts go to, ie. plots/
    /// * `settings` - The settings from the config
    fn generate(&self, dataset: &Dataset, plot_path: &Path, settings: &Settings) -> Result<()>;
}
clone_trait_object!(Report);

pub fn image_path(plot_path: &Path, stem: &str) -> PathBuf {
    plot_path.join(format!("{stem}.{IMAGE_EXTENSION}"))
}

/// Renders one chart to `plot_path/<stem>.png`, and its data to
/// `plot_path/plot_data/<stem>.json` when [`Settings::dump_plot_data`] is set.
pub fn render_chart(
    data: &SeriesSet,
    spec: &ChartSpec,
    plot_path: &Path,
    stem: &str,
    settings: &Settings,
) -> Result<()> {
    let output = image_path(plot_path, stem);
    render(data, spec, &output).context(format!("Render {stem}"))?;
    if settings.dump_plot_data {
        dump_plot_data(plot_path, stem, data)?;
    }
    debug!("Wrote {}", output.display());
    Ok(())
}

/// Loads every result file in `input` and generates the configured reports into `output`.
///
/// Reports run in order over the same dataset. The first failure aborts the
/// run; charts written before it stay on disk.
pub fn run(input: &Path, output: &Path, config: &Config) -> Result<()> {
    if !output.is_dir() {
        return Err(RenderError::MissingDirectory {
            path: output.to_path_buf(),
        }
        .into());
    }

    let dataset = Dataset::load_dir(input, &config.settings.extension)
        .context(format!("Load results from {}", input.display()))?;

    for report in &config.reports {
        let outputs = report.outputs().join(", ");
        debug!("Generating {outputs}");
        report
            .generate(&dataset, output, &config.settings)
            .context(format!("Generate {outputs}"))?;
    }
    info!(
        "Generated {} reports in {}",
        config.reports.len(),
        output.display()
    );
    Ok(())
}
