//! Reduction of [`ObjectSet`] trees to ordered record sequences.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use onto_store::DataStore;
use onto_types::{Locator, PropertyType, PropertyValue, Record};
use tracing::debug;

use crate::derived::DerivedProperty;
use crate::error::{QueryError, QueryResult};
use crate::object_set::ObjectSet;
use crate::page::{decode_page_token, encode_page_token, project, LoadObjectSetRequest, ObjectPage};
use crate::saved::SavedObjectSets;

/// Evaluates object sets against a store.
///
/// Evaluation is read-only and recomputes from the store on every call.
pub struct ObjectSetEvaluator<'a> {
    store: &'a DataStore,
    saved: &'a SavedObjectSets,
}

impl<'a> ObjectSetEvaluator<'a> {
    pub fn new(store: &'a DataStore, saved: &'a SavedObjectSets) -> Self {
        Self { store, saved }
    }

    /// The members of `set`, in evaluation order.
    pub fn evaluate(&self, set: &ObjectSet) -> QueryResult<Vec<Arc<Record>>> {
        self.eval(set, &mut Vec::new(), None)
    }

    /// `input` is the record bound to `methodInput` while a derived property
    /// is computed.
    fn eval(
        &self,
        set: &ObjectSet,
        expanding: &mut Vec<String>,
        input: Option<&Arc<Record>>,
    ) -> QueryResult<Vec<Arc<Record>>> {
        match set {
            ObjectSet::Base { object_type } => Ok(self
                .store
                .get_objects_of_type(object_type)?
                .cloned()
                .collect()),

            ObjectSet::Static { objects } => Ok(objects
                .iter()
                .filter_map(|rid| self.store.get_object_by_rid(rid))
                .cloned()
                .collect()),

            ObjectSet::Reference { reference } => {
                if expanding.iter().any(|id| id == reference) {
                    return Err(QueryError::CyclicReference(reference.clone()));
                }
                let target = self.saved.get(reference)?;
                expanding.push(reference.clone());
                let result = self.eval(target, expanding, input);
                expanding.pop();
                result
            }

            ObjectSet::Filter { object_set, predicate } => {
                let ontology = self.store.ontology();
                let mut kept = Vec::new();
                for record in self.eval(object_set, expanding, input)? {
                    let def = ontology.object_type(&record.object_type)?;
                    if predicate.matches(&record, def)? {
                        kept.push(record);
                    }
                }
                Ok(kept)
            }

            ObjectSet::Union { object_sets } => {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for operand in object_sets {
                    for record in self.eval(operand, expanding, input)? {
                        if seen.insert(record.locator()) {
                            out.push(record);
                        }
                    }
                }
                Ok(out)
            }

            ObjectSet::Intersect { object_sets } => {
                let Some((first, rest)) = object_sets.split_first() else {
                    return Ok(Vec::new());
                };
                let mut members = self.eval(first, expanding, input)?;
                for operand in rest {
                    let other = self.locators(operand, expanding, input)?;
                    members.retain(|record| other.contains(&record.locator()));
                }
                Ok(members)
            }

            ObjectSet::Subtract { object_sets } => {
                let Some((first, rest)) = object_sets.split_first() else {
                    return Ok(Vec::new());
                };
                let mut members = self.eval(first, expanding, input)?;
                for operand in rest {
                    let other = self.locators(operand, expanding, input)?;
                    members.retain(|record| !other.contains(&record.locator()));
                }
                Ok(members)
            }

            ObjectSet::SearchAround { object_set, link } => {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for record in self.eval(object_set, expanding, input)? {
                    for target in self.store.get_links_or_err(&record.locator(), link)? {
                        if seen.insert(target.locator()) {
                            out.push(target);
                        }
                    }
                }
                Ok(out)
            }

            ObjectSet::WithProperties { object_set, derived_properties } => self
                .eval(object_set, expanding, input)?
                .iter()
                .map(|record| self.derive(record, derived_properties, expanding))
                .collect(),

            ObjectSet::MethodInput => input
                .map(|record| vec![Arc::clone(record)])
                .ok_or(QueryError::MissingMethodInput),

            ObjectSet::NearestNeighbors { object_set, property, query, num_neighbors } => {
                let ontology = self.store.ontology();
                let mut ranked = Vec::new();
                for record in self.eval(object_set, expanding, input)? {
                    let def = ontology.object_type(&record.object_type)?;
                    match def.property_type(property) {
                        Some(PropertyType::Array { sub_type }) if sub_type.is_numeric() => {}
                        _ => {
                            return Err(QueryError::InvalidPropertyValue {
                                property: property.clone(),
                                reason: format!(
                                    "{} does not declare it as an array of numbers",
                                    record.object_type
                                ),
                            })
                        }
                    }
                    if let Some(distance) = record.get(property).and_then(|v| squared_distance(v, query)) {
                        ranked.push((distance, record));
                    }
                }
                ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
                debug!(candidates = ranked.len(), num_neighbors, "ranked nearest neighbors");
                Ok(ranked
                    .into_iter()
                    .take(*num_neighbors)
                    .map(|(_, record)| record)
                    .collect())
            }
        }
    }

    fn locators(
        &self,
        set: &ObjectSet,
        expanding: &mut Vec<String>,
        input: Option<&Arc<Record>>,
    ) -> QueryResult<HashSet<Locator>> {
        Ok(self
            .eval(set, expanding, input)?
            .iter()
            .map(|record| record.locator())
            .collect())
    }

    /// Copy of `record` with every derived property computed against it.
    fn derive(
        &self,
        record: &Arc<Record>,
        derived: &BTreeMap<String, DerivedProperty>,
        expanding: &mut Vec<String>,
    ) -> QueryResult<Arc<Record>> {
        let mut properties = record.properties.clone();
        for (name, property) in derived {
            let DerivedProperty::Selection { object_set, operation } = property;
            let selected = self.eval(object_set, expanding, Some(record))?;
            match operation.apply(name, &selected)? {
                Some(value) => properties.insert(name.clone(), value),
                None => properties.remove(name),
            };
        }
        Ok(Arc::new(Record::with_rid(
            record.object_type.clone(),
            record.primary_key.clone(),
            record.rid.clone(),
            properties,
        )))
    }

    /// Evaluate, order, page, and project.
    pub fn load(&self, request: &LoadObjectSetRequest) -> QueryResult<ObjectPage> {
        let config = self.store.config();
        let page_size = request.page_size.unwrap_or(config.default_page_size);
        if page_size == 0 || page_size > config.max_page_size {
            return Err(QueryError::InvalidPageSize {
                size: page_size,
                max: config.max_page_size,
            });
        }
        let offset = match &request.page_token {
            Some(token) => decode_page_token(token)?,
            None => 0,
        };

        let mut records = self.evaluate(&request.object_set)?;
        if request.load_property_securities && records.len() != 1 {
            return Err(QueryError::SecuritiesRequireSingleObject(records.len()));
        }
        if let Some(order) = &request.order_by {
            order.sort(&mut records, self.store.ontology());
        }

        let total_count = records.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(total_count);
        let end = start.saturating_add(page_size).min(total_count);
        let ontology = self.store.ontology();
        let mut property_securities = Vec::new();
        let mut data = Vec::with_capacity(end - start);
        for record in &records[start..end] {
            let def = ontology.object_type(&record.object_type)?;
            let secured = request
                .load_property_securities
                .then(|| self.store.get_object_with_securities(&record.locator()))
                .flatten();
            let rendered = match secured {
                Some((_, securities)) => {
                    property_securities = securities.securities.clone();
                    securities.render(record, &def.primary_key)
                }
                None => record.to_json(&def.primary_key),
            };
            data.push(project(rendered, &request.select, request.exclude_rid));
        }
        let next_page_token = (end < total_count).then(|| encode_page_token(end as u64));

        debug!(total_count, start, end, "loaded object set page");
        Ok(ObjectPage {
            data,
            total_count,
            next_page_token,
            property_securities,
        })
    }
}

/// Squared Euclidean distance between a numeric array value and `query`.
fn squared_distance(value: &PropertyValue, query: &[f64]) -> Option<f64> {
    let items = value.as_array()?;
    if items.len() != query.len() {
        return None;
    }
    items.iter().zip(query).try_fold(0.0, |sum, (item, q)| {
        let d = item.as_f64()? - q;
        Some(sum + d * d)
    })
}
