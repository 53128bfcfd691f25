use std::{fs, path::Path};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::plot::Report;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    pub reports: Vec<Box<dyn Report>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Extension of the result files to load
    pub extension: String,
    /// Also write each chart's series as JSON under plot_data/
    pub dump_plot_data: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extension: "csv".to_owned(),
            dump_plot_data: false,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yml::from_str(yaml)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).context(format!("Read {}", path.display()))?;
        Self::from_yaml(&yaml).context(format!("Parse {}", path.display()))
    }

    /// Every image stem the configured reports write
    pub fn outputs(&self) -> Vec<String> {
        self.reports
            .iter()
            .flat_map(|report| report.outputs())
            .collect()
    }
}
