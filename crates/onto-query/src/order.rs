//! Result ordering for object-set loads.

use std::cmp::Ordering;
use std::sync::Arc;

use onto_schema::Ontology;
use onto_types::{PropertyValue, Record};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

/// Multi-key ordering applied after evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub fields: Vec<SortField>,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self::default().then_asc(field)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::default().then_desc(field)
    }

    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.fields.push(SortField { field: field.into(), direction: Direction::Asc });
        self
    }

    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.fields.push(SortField { field: field.into(), direction: Direction::Desc });
        self
    }

    /// Parse `name`, `name:asc` or `name:desc` terms separated by commas.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut order = Self::default();
        for term in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            order = match term.split_once(':') {
                None => order.then_asc(term),
                Some((field, "asc")) => order.then_asc(field),
                Some((field, "desc")) => order.then_desc(field),
                Some((_, other)) => return Err(format!("unknown sort direction {other:?}")),
            };
        }
        Ok(order)
    }

    /// Stable sort. Absent values go last in either direction; full ties
    /// fall back to the primary key, then the object type.
    pub fn sort(&self, records: &mut [Arc<Record>], ontology: &Ontology) {
        records.sort_by(|a, b| {
            self.fields
                .iter()
                .map(|f| compare_field(a, b, f))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| compare_primary_keys(a, b, ontology))
        });
    }
}

fn compare_field(a: &Record, b: &Record, field: &SortField) -> Ordering {
    match (a.get(&field.field), b.get(&field.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = x.total_cmp(y);
            match field.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        }
    }
}

fn primary_key_value<'r>(record: &'r Record, ontology: &Ontology) -> Option<&'r PropertyValue> {
    let def = ontology.object_type(&record.object_type).ok()?;
    record.get(&def.primary_key)
}

fn compare_primary_keys(a: &Record, b: &Record, ontology: &Ontology) -> Ordering {
    let typed = match (primary_key_value(a, ontology), primary_key_value(b, ontology)) {
        (Some(x), Some(y)) => x.total_cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    };
    typed
        .then_with(|| a.primary_key.cmp(&b.primary_key))
        .then_with(|| a.object_type.cmp(&b.object_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use onto_schema::ObjectTypeDef;
    use onto_types::PropertyType;
    use std::collections::BTreeMap;

    fn ontology() -> Ontology {
        Ontology::build(
            [ObjectTypeDef::new("Item", "n", PropertyType::Integer)
                .with_property("group", PropertyType::String)
                .with_property("score", PropertyType::Double)],
            [],
            [],
        )
        .unwrap()
    }

    fn item(n: i64, group: Option<&str>, score: Option<f64>) -> Arc<Record> {
        let mut props = BTreeMap::new();
        props.insert("n".to_string(), PropertyValue::Integer(n));
        if let Some(g) = group {
            props.insert("group".to_string(), PropertyValue::from(g));
        }
        if let Some(s) = score {
            props.insert("score".to_string(), PropertyValue::Double(s));
        }
        Arc::new(Record::new("Item", n, props))
    }

    fn keys(records: &[Arc<Record>]) -> Vec<&str> {
        records.iter().map(|r| r.primary_key.as_str()).collect()
    }

    #[test]
    fn multi_key_sort_with_nulls_last() {
        let mut records = vec![
            item(1, Some("b"), Some(1.0)),
            item(2, None, Some(5.0)),
            item(3, Some("a"), Some(2.0)),
            item(4, Some("b"), Some(3.0)),
            item(5, Some("a"), None),
        ];
        OrderBy::asc("group").then_desc("score").sort(&mut records, &ontology());
        assert_eq!(keys(&records), vec!["3", "5", "4", "1", "2"]);

        OrderBy::desc("group").sort(&mut records, &ontology());
        assert_eq!(keys(&records), vec!["1", "4", "3", "5", "2"]);
    }

    #[test]
    fn ties_break_on_typed_primary_key() {
        let mut records = vec![item(10, None, None), item(9, None, None), item(100, None, None)];
        OrderBy::asc("score").sort(&mut records, &ontology());
        assert_eq!(keys(&records), vec!["9", "10", "100"]);
    }

    fn mixed_ontology() -> Ontology {
        Ontology::build(
            [
                ObjectTypeDef::new("A", "n", PropertyType::Integer)
                    .with_property("code", PropertyType::Integer),
                ObjectTypeDef::new("B", "n", PropertyType::Integer)
                    .with_property("code", PropertyType::String),
            ],
            [],
            [],
        )
        .unwrap()
    }

    fn coded(object_type: &str, n: i64, code: PropertyValue) -> Arc<Record> {
        let mut props = BTreeMap::new();
        props.insert("n".to_string(), PropertyValue::Integer(n));
        props.insert("code".to_string(), code);
        Arc::new(Record::new(object_type, n, props))
    }

    #[test]
    fn mixed_kinds_sort_numbers_before_strings() {
        let ontology = mixed_ontology();
        let mut records: Vec<_> = (0..200)
            .map(|i| {
                // Interleave the two types so the sort sees every pairing.
                let n = (i * 37) % 200;
                if n % 2 == 0 {
                    coded("A", n, PropertyValue::Integer(n % 7))
                } else {
                    coded("B", n, PropertyValue::from("z"))
                }
            })
            .collect();
        OrderBy::asc("code").sort(&mut records, &ontology);

        let (numbers, strings) = records.split_at(100);
        assert!(numbers.iter().all(|r| r.object_type == "A"));
        assert!(strings.iter().all(|r| r.object_type == "B"));
        assert!(numbers
            .windows(2)
            .all(|w| w[0].get("code").unwrap().total_cmp(w[1].get("code").unwrap()).is_le()));
        let string_keys: Vec<i64> = strings
            .iter()
            .map(|r| r.get("n").and_then(PropertyValue::as_i64).unwrap())
            .collect();
        assert!(string_keys.windows(2).all(|w| w[0] < w[1]));

        OrderBy::desc("code").sort(&mut records, &ontology);
        assert_eq!(records[0].object_type, "B");
        assert_eq!(records[199].object_type, "A");
    }

    #[test]
    fn nan_scores_sort_after_numbers() {
        let mut records: Vec<_> = (0..200)
            .map(|n| {
                let score = if n % 3 == 0 { f64::NAN } else { ((n * 53) % 200) as f64 };
                item(n, None, Some(score))
            })
            .collect();
        OrderBy::asc("score").sort(&mut records, &ontology());

        let scores: Vec<f64> = records
            .iter()
            .map(|r| r.get("score").and_then(PropertyValue::as_f64).unwrap())
            .collect();
        let first_nan = scores.iter().position(|s| s.is_nan()).unwrap();
        assert!(scores[first_nan..].iter().all(|s| s.is_nan()));
        assert!(scores[..first_nan].windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(scores.len() - first_nan, 67);
    }

    #[test]
    fn parses_cli_terms() {
        assert_eq!(
            OrderBy::parse("group, score:desc").unwrap(),
            OrderBy::asc("group").then_desc("score")
        );
        assert!(OrderBy::parse("score:sideways").is_err());
    }
}
