use std::collections::HashMap;

use onto_types::{PrimaryKey, TimeRange, TimeSeriesPoint};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SeriesKey {
    object_type: String,
    primary_key: PrimaryKey,
    property: String,
}

/// Time-series points keyed by `(object type, primary key, property)`.
#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    series: HashMap<SeriesKey, Vec<TimeSeriesPoint>>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the series with `points`, sorted by time. Points sharing a
    /// timestamp keep their given order.
    pub fn set(
        &mut self,
        object_type: &str,
        primary_key: &PrimaryKey,
        property: &str,
        mut points: Vec<TimeSeriesPoint>,
    ) {
        points.sort_by_key(|p| p.time);
        self.series.insert(key(object_type, primary_key, property), points);
    }

    /// Points inside `range`, oldest first. An unknown series is empty.
    pub fn get(
        &self,
        object_type: &str,
        primary_key: &PrimaryKey,
        property: &str,
        range: &TimeRange,
    ) -> Vec<TimeSeriesPoint> {
        self.series
            .get(&key(object_type, primary_key, property))
            .map(|points| {
                points
                    .iter()
                    .filter(|p| range.contains(&p.time))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn first(
        &self,
        object_type: &str,
        primary_key: &PrimaryKey,
        property: &str,
    ) -> Option<&TimeSeriesPoint> {
        self.series
            .get(&key(object_type, primary_key, property))
            .and_then(|points| points.first())
    }

    pub fn last(
        &self,
        object_type: &str,
        primary_key: &PrimaryKey,
        property: &str,
    ) -> Option<&TimeSeriesPoint> {
        self.series
            .get(&key(object_type, primary_key, property))
            .and_then(|points| points.last())
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }
}

fn key(object_type: &str, primary_key: &PrimaryKey, property: &str) -> SeriesKey {
    SeriesKey {
        object_type: object_type.to_string(),
        primary_key: primary_key.clone(),
        property: property.to_string(),
    }
}
