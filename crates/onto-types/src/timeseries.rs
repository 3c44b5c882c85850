use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

/// One sample of a time series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub time: DateTime<Utc>,
    pub value: PropertyValue,
}

impl TimeSeriesPoint {
    pub fn new(time: DateTime<Utc>, value: impl Into<PropertyValue>) -> Self {
        Self {
            time,
            value: value.into(),
        }
    }
}

/// Closed interval filter over sample times. A missing bound is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| *time >= s) && self.end.map_or(true, |e| *time <= e)
    }
}
