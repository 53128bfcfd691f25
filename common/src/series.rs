use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    aggregate::Aggregation,
    dataset::{Field, KeyValue},
    error::AggregationError,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    /// `(x label, value)` pairs, ordered like [`SeriesSet::categories`]
    pub points: Vec<(String, f64)>,
}

/// Series drawn against one shared, ordered x axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSet {
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

impl SeriesSet {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Largest finite value over every series
    pub fn max_value(&self) -> Option<f64> {
        self.series
            .iter()
            .flat_map(|series| series.points.iter().map(|(_, value)| *value))
            .filter(|value| value.is_finite())
            .reduce(f64::max)
    }
}

/// Splits an aggregation grouped by `split` and `x` into one series per `split` value.
///
/// Series follow the order in which their split value first appears in the
/// aggregation. The x axis is the sorted union of every x value, so points line
/// up across series; a split value without data for a category simply has no
/// point there.
pub fn build_series(
    aggregation: &Aggregation,
    split: Field,
    x: Field,
    metric: Field,
) -> Result<SeriesSet, AggregationError> {
    if aggregation.keys().len() != 2 {
        return Err(AggregationError::SeriesKeys(aggregation.keys().len()));
    }
    let split_idx = aggregation.key_index(split)?;
    let x_idx = aggregation.key_index(x)?;
    let metric_idx = aggregation.metric_index(metric)?;

    let mut values: HashMap<(&KeyValue, &KeyValue), f64> = HashMap::new();
    let mut splits: Vec<&KeyValue> = Vec::new();
    let mut xs: Vec<&KeyValue> = Vec::new();
    for group in aggregation.groups() {
        let (Some(split_value), Some(x_value)) = (group.key.get(split_idx), group.key.get(x_idx))
        else {
            continue;
        };
        splits.push(split_value);
        xs.push(x_value);
        values.insert((split_value, x_value), group.means[metric_idx]);
    }

    let xs = xs.into_iter().unique().sorted().collect::<Vec<_>>();
    let series = splits
        .into_iter()
        .unique()
        .map(|split_value| Series {
            label: split_value.to_string(),
            points: xs
                .iter()
                .filter_map(|x_value| {
                    values
                        .get(&(split_value, *x_value))
                        .map(|value| (x_value.to_string(), *value))
                })
                .collect(),
        })
        .collect();

    Ok(SeriesSet {
        categories: xs.iter().map(|x_value| x_value.to_string()).collect(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::aggregate,
        dataset::{Dataset, ResultRecord},
    };

    fn record(vertices: i64, method: &str, time: f64) -> ResultRecord {
        ResultRecord {
            graph_name: format!("rgg_{vertices}"),
            vertex_count: vertices,
            coloring_method: method.to_owned(),
            n_threads: 1,
            coloring_time: time,
            colors_used: 3,
        }
    }

    #[test]
    fn shared_axis_with_gaps() {
        let dataset: Dataset = [
            record(10000, "seq_greedy", 3.0),
            record(1000, "seq_greedy", 1.0),
            record(500, "par_jp", 0.5),
            record(10000, "par_jp", 2.0),
        ]
        .into_iter()
        .collect();
        let agg = aggregate(
            &dataset,
            &[Field::ColoringMethod, Field::VertexCount],
            &[Field::ColoringTime],
        )
        .unwrap();

        let set = build_series(&agg, Field::ColoringMethod, Field::VertexCount, Field::ColoringTime)
            .unwrap();
        assert_eq!(set.categories, ["500", "1000", "10000"]);
        assert_eq!(set.series.len(), 2);
        assert_eq!(set.series[0].label, "seq_greedy");
        assert_eq!(
            set.series[0].points,
            [("1000".to_owned(), 1.0), ("10000".to_owned(), 3.0)]
        );
        assert_eq!(
            set.series[1].points,
            [("500".to_owned(), 0.5), ("10000".to_owned(), 2.0)]
        );
        assert_eq!(set.max_value(), Some(3.0));
        assert!(set.series.iter().all(|series| !series.points.is_empty()));
    }

    #[test]
    fn key_order_does_not_matter() {
        let dataset: Dataset = [record(10, "m1", 1.0)].into_iter().collect();
        let agg = aggregate(
            &dataset,
            &[Field::VertexCount, Field::ColoringMethod],
            &[Field::ColoringTime],
        )
        .unwrap();
        let set = build_series(&agg, Field::ColoringMethod, Field::VertexCount, Field::ColoringTime)
            .unwrap();
        assert_eq!(set.series[0].points, [("10".to_owned(), 1.0)]);
    }

    #[test]
    fn requires_matching_keys() {
        let dataset: Dataset = [record(10, "m1", 1.0)].into_iter().collect();
        let agg = aggregate(&dataset, &[Field::ColoringMethod], &[Field::ColoringTime]).unwrap();
        assert!(matches!(
            build_series(&agg, Field::ColoringMethod, Field::GraphName, Field::ColoringTime),
            Err(AggregationError::SeriesKeys(1))
        ));

        let agg = aggregate(
            &dataset,
            &[Field::ColoringMethod, Field::GraphName],
            &[Field::ColoringTime],
        )
        .unwrap();
        assert!(matches!(
            build_series(&agg, Field::ColoringMethod, Field::GraphName, Field::ColorsUsed),
            Err(AggregationError::MissingMetric(Field::ColorsUsed))
        ));
    }

    #[test]
    fn empty_aggregation_gives_no_series() {
        let agg = aggregate(
            &Dataset::default(),
            &[Field::ColoringMethod, Field::NThreads],
            &[Field::ColoringTime],
        )
        .unwrap();
        let set =
            build_series(&agg, Field::ColoringMethod, Field::NThreads, Field::ColoringTime).unwrap();
        assert!(set.is_empty());
        assert!(set.categories.is_empty());
    }
}
