use std::{
    fmt::{self, Display},
    fs::{File, read_dir},
    path::Path,
    str::FromStr,
};

use csv::{ReaderBuilder, Trim};
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AggregationError, LoadError};

/// One benchmark execution, as written by the coloring harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub graph_name: String,
    pub vertex_count: i64,
    pub coloring_method: String,
    pub n_threads: u32,
    pub coloring_time: f64,
    pub colors_used: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    GraphName,
    VertexCount,
    ColoringMethod,
    NThreads,
    ColoringTime,
    ColorsUsed,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::GraphName,
        Field::VertexCount,
        Field::ColoringMethod,
        Field::NThreads,
        Field::ColoringTime,
        Field::ColorsUsed,
    ];

    /// Column name in the result files
    pub fn name(&self) -> &'static str {
        match self {
            Field::GraphName => "graph_name",
            Field::VertexCount => "vertex_count",
            Field::ColoringMethod => "coloring_method",
            Field::NThreads => "n_threads",
            Field::ColoringTime => "coloring_time",
            Field::ColorsUsed => "colors_used",
        }
    }

    /// Whether records can be grouped by this field
    pub fn is_categorical(&self) -> bool {
        !matches!(self, Field::ColoringTime)
    }

    /// Whether this field can be averaged
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Field::GraphName | Field::ColoringMethod)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s.trim())
            .ok_or_else(|| AggregationError::UnknownField(s.to_owned()))
    }
}

/// A categorical value of a record. Integers order numerically and never
/// display with a decimal point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(value) => write!(f, "{value}"),
            KeyValue::Text(value) => f.write_str(value),
        }
    }
}

impl ResultRecord {
    pub fn key(&self, field: Field) -> Option<KeyValue> {
        match field {
            Field::GraphName => Some(KeyValue::Text(self.graph_name.clone())),
            Field::VertexCount => Some(KeyValue::Int(self.vertex_count)),
            Field::ColoringMethod => Some(KeyValue::Text(self.coloring_method.clone())),
            Field::NThreads => Some(KeyValue::Int(self.n_threads.into())),
            Field::ColorsUsed => Some(KeyValue::Int(self.colors_used.into())),
            Field::ColoringTime => None,
        }
    }

    pub fn metric(&self, field: Field) -> Option<f64> {
        match field {
            Field::VertexCount => Some(self.vertex_count as f64),
            Field::NThreads => Some(self.n_threads.into()),
            Field::ColoringTime => Some(self.coloring_time),
            Field::ColorsUsed => Some(self.colors_used.into()),
            Field::GraphName | Field::ColoringMethod => None,
        }
    }

    /// The field rendered the way filters see it
    pub fn display(&self, field: Field) -> String {
        match self.key(field) {
            Some(key) => key.to_string(),
            None => self.coloring_time.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<ResultRecord>,
}

impl Dataset {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn concat(mut self, other: Dataset) -> Self {
        self.records.extend(other.records);
        self
    }

    /// Distinct display values of `field`, in first-seen order
    pub fn distinct(&self, field: Field) -> Vec<String> {
        self.records
            .iter()
            .map(|record| record.display(field))
            .unique()
            .collect()
    }

    pub fn filter(&self, filter: &RecordFilter) -> Result<Dataset, AggregationError> {
        let regex = filter.regex()?;
        Ok(self
            .records
            .iter()
            .filter(|record| regex.is_match(&record.display(filter.field)) != filter.exclude)
            .cloned()
            .collect())
    }

    /// Parses one result file. The header must name all six columns, in any order.
    pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
        debug!("Loading {}", path.display());
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
        let schema_err = |source| LoadError::Schema {
            path: path.to_path_buf(),
            source,
        };

        let headers = reader.headers().map_err(schema_err)?;
        if let Some(missing) = Field::ALL
            .iter()
            .find(|field| !headers.iter().any(|h| h == field.name()))
        {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: missing.name(),
            });
        }

        let records = reader
            .deserialize::<ResultRecord>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(schema_err)?;
        debug!("Read {} records from {}", records.len(), path.display());
        Ok(Dataset::new(records))
    }

    /// Loads and concatenates every `*.{extension}` file directly inside `dir`,
    /// in path order.
    pub fn load_dir(dir: &Path, extension: &str) -> Result<Dataset, LoadError> {
        let io_err = |source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && has_extension(&path, extension) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(LoadError::NoInputFiles {
                dir: dir.to_path_buf(),
                extension: extension.to_owned(),
            });
        }
        files.sort();

        let dataset = files
            .iter()
            .map(|path| Dataset::load_file(path))
            .try_fold(Dataset::default(), |acc, file| file.map(|file| acc.concat(file)))?;
        info!(
            "Loaded {} records from {} files ({} graphs, {} coloring methods)",
            dataset.len(),
            files.len(),
            dataset.distinct(Field::GraphName).len(),
            dataset.distinct(Field::ColoringMethod).len(),
        );
        Ok(dataset)
    }
}

impl FromIterator<ResultRecord> for Dataset {
    fn from_iter<T: IntoIterator<Item = ResultRecord>>(iter: T) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Keeps the records whose `field` matches `pattern`, or drops them when `exclude` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub field: Field,
    pub pattern: String,
    #[serde(default)]
    pub exclude: bool,
}

impl RecordFilter {
    pub fn prefix(field: Field, prefix: &str) -> Self {
        Self {
            field,
            pattern: format!("^{}", regex::escape(prefix)),
            exclude: false,
        }
    }

    pub fn excluding(mut self) -> Self {
        self.exclude = true;
        self
    }

    fn regex(&self) -> Result<Regex, AggregationError> {
        Regex::new(&self.pattern).map_err(|source| AggregationError::Pattern {
            pattern: self.pattern.clone(),
            source,
        })
    }
}
