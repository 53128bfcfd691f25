use std::{collections::HashMap, fmt};

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::{
    dataset::{Dataset, Field, KeyValue},
    error::AggregationError,
};

/// The values of the grouping fields shared by every record of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey(pub Vec<KeyValue>);

impl GroupKey {
    pub fn get(&self, idx: usize) -> Option<&KeyValue> {
        self.0.get(idx)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: GroupKey,
    pub count: usize,
    /// One mean per metric, in the order of [`Aggregation::metrics`]
    pub means: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    keys: Vec<Field>,
    metrics: Vec<Field>,
    groups: Vec<Group>,
}

impl Aggregation {
    pub fn keys(&self) -> &[Field] {
        &self.keys
    }

    pub fn metrics(&self) -> &[Field] {
        &self.metrics
    }

    /// Groups in first-encounter order, unless [`Aggregation::sorted`] was called
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Orders the groups by key, integers numerically and text lexicographically
    pub fn sorted(mut self) -> Self {
        self.groups.sort_by(|a, b| a.key.cmp(&b.key));
        self
    }

    pub fn key_index(&self, field: Field) -> Result<usize, AggregationError> {
        self.keys
            .iter()
            .position(|key| *key == field)
            .ok_or(AggregationError::MissingKey(field))
    }

    pub fn metric_index(&self, field: Field) -> Result<usize, AggregationError> {
        self.metrics
            .iter()
            .position(|metric| *metric == field)
            .ok_or(AggregationError::MissingMetric(field))
    }

    pub fn mean(&self, key: &GroupKey, metric: Field) -> Option<f64> {
        let idx = self.metric_index(metric).ok()?;
        self.groups
            .iter()
            .find(|group| group.key == *key)
            .map(|group| group.means[idx])
    }
}

/// Averages `metrics` over the records sharing the same values of `keys`.
pub fn aggregate(
    dataset: &Dataset,
    keys: &[Field],
    metrics: &[Field],
) -> Result<Aggregation, AggregationError> {
    if keys.is_empty() {
        return Err(AggregationError::NoGroupKeys);
    }
    if metrics.is_empty() {
        return Err(AggregationError::NoMetrics);
    }
    if let Some(key) = keys.iter().find(|key| !key.is_categorical()) {
        return Err(AggregationError::NotCategorical(*key));
    }
    if let Some(metric) = metrics.iter().find(|metric| !metric.is_numeric()) {
        return Err(AggregationError::NotNumeric(*metric));
    }

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut sums: Vec<(GroupKey, usize, Vec<f64>)> = Vec::new();
    for record in dataset.iter() {
        let key = keys
            .iter()
            .map(|field| record.key(*field).ok_or(AggregationError::NotCategorical(*field)))
            .collect::<Result<Vec<_>, _>>()?;
        let values = metrics
            .iter()
            .map(|field| record.metric(*field).ok_or(AggregationError::NotNumeric(*field)))
            .collect::<Result<Vec<_>, _>>()?;

        let key = GroupKey(key);
        let slot = match index.get(&key) {
            Some(slot) => *slot,
            None => {
                index.insert(key.clone(), sums.len());
                sums.push((key, 0, vec![0.0; metrics.len()]));
                sums.len() - 1
            }
        };
        let (_, count, totals) = &mut sums[slot];
        *count += 1;
        for (total, value) in totals.iter_mut().zip(values) {
            *total += value;
        }
    }

    let groups = sums
        .into_iter()
        .map(|(key, count, totals)| Group {
            key,
            count,
            means: totals.into_iter().map(|total| total / count as f64).collect(),
        })
        .collect::<Vec<_>>();
    debug!(
        "Aggregated {} records into {} groups by {}",
        dataset.len(),
        groups.len(),
        keys.iter().join(", ")
    );

    Ok(Aggregation {
        keys: keys.to_vec(),
        metrics: metrics.to_vec(),
        groups,
    })
}
