//! The [`DataStore`] facade.
//!
//! `DataStore` owns the object table, the link graph, and the auxiliary
//! stores, and is the only way to mutate them. Every write is checked against
//! the ontology first: records must match their object type's declared
//! properties, and links must name a registered link type on both ends.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use onto_schema::{LinkTypeSide, Ontology};
use onto_types::{
    Locator, MediaReference, PrimaryKey, PropertyType, PropertyValue, Record, Rid, TimeRange,
    TimeSeriesPoint,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::accessor::SchemaLinkAccessor;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::links::{check_link_pair, LinkGraph};
use crate::media::{MediaItem, MediaStore};
use crate::security::{ObjectSecurities, SecurityStore};
use crate::table::ObjectTable;
use crate::timeseries::TimeSeriesStore;

/// In-memory typed object-graph store.
///
/// Reads take `&self` and writes take `&mut self`; there is no interior
/// locking. Each test should build its own store.
#[derive(Debug)]
pub struct DataStore {
    ontology: Arc<Ontology>,
    config: StoreConfig,
    objects: ObjectTable,
    links: LinkGraph,
    time_series: TimeSeriesStore,
    media: MediaStore,
    securities: SecurityStore,
}

impl DataStore {
    pub fn new(ontology: Arc<Ontology>) -> Self {
        Self::with_config(ontology, StoreConfig::default())
    }

    pub fn with_config(ontology: Arc<Ontology>, config: StoreConfig) -> Self {
        Self {
            ontology,
            config,
            objects: ObjectTable::new(),
            links: LinkGraph::new(),
            time_series: TimeSeriesStore::new(),
            media: MediaStore::new(),
            securities: SecurityStore::new(),
        }
    }

    pub fn ontology(&self) -> &Arc<Ontology> {
        &self.ontology
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    /// Drop all objects, links, securities, time series, and media. The
    /// ontology stays.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.links.clear();
        self.securities.clear();
        self.time_series.clear();
        self.media.clear();
        debug!("cleared store");
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Check a record against its object type's declaration.
    pub fn validate_record(&self, record: &Record) -> StoreResult<()> {
        let def = self.ontology.object_type(&record.object_type)?;

        let pk_value = record
            .get(&def.primary_key)
            .ok_or_else(|| StoreError::InvalidPropertyValue {
                property: def.primary_key.clone(),
                reason: format!("primary key of {} is missing", record.locator()),
            })?;
        if PrimaryKey::from_value(pk_value)? != record.primary_key {
            return Err(StoreError::InvalidPropertyValue {
                property: def.primary_key.clone(),
                reason: format!(
                    "value {pk_value} does not match primary key {}",
                    record.primary_key
                ),
            });
        }

        for (name, value) in &record.properties {
            let ty = def
                .property_type(name)
                .ok_or_else(|| StoreError::PropertyNotFound {
                    object_type: record.object_type.clone(),
                    property: name.clone(),
                })?;
            if !value.conforms_to(ty) {
                return Err(StoreError::InvalidPropertyType {
                    object_type: record.object_type.clone(),
                    property: name.clone(),
                    expected: ty.to_string(),
                    actual: value.kind().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build a record from JSON property literals, converting each by its
    /// declared type. `null` properties are treated as absent.
    pub fn record_from_json(
        &self,
        object_type: &str,
        properties: &Map<String, Value>,
        rid: Option<Rid>,
    ) -> StoreResult<Record> {
        let def = self.ontology.object_type(object_type)?;
        let mut values = BTreeMap::new();
        for (name, json) in properties {
            if json.is_null() {
                continue;
            }
            let ty = def
                .property_type(name)
                .ok_or_else(|| StoreError::PropertyNotFound {
                    object_type: object_type.to_string(),
                    property: name.clone(),
                })?;
            let value =
                PropertyValue::from_json(json, ty).map_err(|e| StoreError::InvalidPropertyValue {
                    property: name.clone(),
                    reason: e.to_string(),
                })?;
            values.insert(name.clone(), value);
        }

        let pk_value = values
            .get(&def.primary_key)
            .ok_or_else(|| StoreError::InvalidPropertyValue {
                property: def.primary_key.clone(),
                reason: "primary key property is missing".into(),
            })?;
        let primary_key = PrimaryKey::from_value(pk_value)?;
        Ok(match rid {
            Some(rid) => Record::with_rid(object_type, primary_key, rid, values),
            None => Record::new(object_type, primary_key, values),
        })
    }

    /// Register a new record. In strict mode its foreign keys install links.
    pub fn register_object(&mut self, record: Record) -> StoreResult<Arc<Record>> {
        self.validate_record(&record)?;
        let stored = self.objects.register(record)?;
        debug!(locator = %stored.locator(), rid = %stored.rid, "registered object");
        if self.config.strict {
            self.sync_foreign_keys(&stored)?;
        }
        Ok(stored)
    }

    /// Swap in a new version of an existing record.
    pub fn replace_object_or_err(&mut self, record: Record) -> StoreResult<Arc<Record>> {
        self.validate_record(&record)?;
        let locator = record.locator();
        self.objects.replace(record)?;
        let stored = Arc::clone(self.objects.get_or_err(&locator)?);
        debug!(locator = %locator, "replaced object");
        if self.config.strict {
            self.sync_foreign_keys(&stored)?;
        }
        Ok(stored)
    }

    /// Remove a record and its property securities. Links are not cascaded.
    pub fn unregister_object_or_err(&mut self, locator: &Locator) -> StoreResult<Arc<Record>> {
        let removed = self.objects.unregister(locator)?;
        self.securities.remove(locator);
        debug!(locator = %locator, "unregistered object");
        Ok(removed)
    }

    /// Register a record together with the securities governing its
    /// properties. Every governed property must be declared and point at an
    /// existing securities entry.
    pub fn register_object_with_property_securities(
        &mut self,
        record: Record,
        securities: ObjectSecurities,
    ) -> StoreResult<Arc<Record>> {
        let def = self.ontology.object_type(&record.object_type)?;
        for (property, &index) in &securities.properties {
            if def.property_type(property).is_none() {
                return Err(StoreError::PropertyNotFound {
                    object_type: record.object_type.clone(),
                    property: property.clone(),
                });
            }
            if index >= securities.securities.len() {
                return Err(StoreError::InvalidRequest(format!(
                    "{}.{property} refers to security {index} but only {} are given",
                    record.object_type,
                    securities.securities.len()
                )));
            }
        }
        let stored = self.register_object(record)?;
        self.securities.set(stored.locator(), securities);
        Ok(stored)
    }

    /// A record and its securities. `None` when the record is missing or was
    /// registered without securities.
    pub fn get_object_with_securities(
        &self,
        locator: &Locator,
    ) -> Option<(&Arc<Record>, &ObjectSecurities)> {
        Some((self.objects.get(locator)?, self.securities.get(locator)?))
    }

    pub fn get_object(&self, locator: &Locator) -> Option<&Arc<Record>> {
        self.objects.get(locator)
    }

    pub fn get_object_or_err(&self, locator: &Locator) -> StoreResult<&Arc<Record>> {
        self.objects.get_or_err(locator)
    }

    pub fn get_object_by_rid(&self, rid: &Rid) -> Option<&Arc<Record>> {
        self.objects.find_by_rid(rid)
    }

    /// Records of a registered object type in registration order.
    pub fn get_objects_of_type(
        &self,
        object_type: &str,
    ) -> StoreResult<impl Iterator<Item = &Arc<Record>> + '_> {
        self.ontology.object_type(object_type)?;
        Ok(self.objects.scan(object_type))
    }

    /// The typed primary-key value of a stored record.
    pub fn primary_key_value(&self, locator: &Locator) -> StoreResult<PropertyValue> {
        let record = self.objects.get_or_err(locator)?;
        let def = self.ontology.object_type(&locator.object_type)?;
        record
            .get(&def.primary_key)
            .cloned()
            .ok_or_else(|| StoreError::InvalidPropertyValue {
                property: def.primary_key.clone(),
                reason: format!("primary key of {locator} is missing"),
            })
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    fn link_pair(
        &self,
        src: &Locator,
        src_link: &str,
        dst: &Locator,
        dst_link: &str,
    ) -> StoreResult<(LinkTypeSide, LinkTypeSide)> {
        let (src_side, dst_side) =
            self.ontology
                .both_link_type_sides(&src.object_type, src_link, &dst.object_type)?;
        check_link_pair(src_side, dst_side, dst_link)?;
        Ok((src_side.clone(), dst_side.clone()))
    }

    /// Link `src.src_link` to `dst`, whose inverse link name must be `dst_link`.
    pub fn register_link(
        &mut self,
        src: &Locator,
        src_link: &str,
        dst: &Locator,
        dst_link: &str,
    ) -> StoreResult<()> {
        self.objects.get_or_err(src)?;
        self.objects.get_or_err(dst)?;
        let (src_side, dst_side) = self.link_pair(src, src_link, dst, dst_link)?;

        if self.config.strict {
            if let Some((owner, fk, far)) = foreign_key_end(&src_side, src, &dst_side, dst) {
                let far_pk = self.primary_key_value(far)?;
                let updated = self.objects.get_or_err(owner)?.with_property(fk, far_pk);
                self.replace_object_or_err(updated)?;
                return Ok(());
            }
        }

        self.links.link(&src_side, src, &dst_side, dst)?;
        debug!(source = %src, link = src_link, target = %dst, "registered link");
        Ok(())
    }

    /// Remove the link `src.src_link -> dst`.
    pub fn unregister_link(
        &mut self,
        src: &Locator,
        src_link: &str,
        dst: &Locator,
        dst_link: &str,
    ) -> StoreResult<()> {
        let (src_side, dst_side) = self.link_pair(src, src_link, dst, dst_link)?;
        if !self.links.contains(src, src_link, dst) {
            return Err(StoreError::LinkedObjectNotFound {
                source_object: src.clone(),
                link: src_link.to_string(),
                target: dst.to_string(),
            });
        }

        if self.config.strict {
            if let Some((owner, fk, _)) = foreign_key_end(&src_side, src, &dst_side, dst) {
                let updated = self.objects.get_or_err(owner)?.without_property(fk);
                self.replace_object_or_err(updated)?;
                return Ok(());
            }
        }

        self.links.unlink(&src_side, src, &dst_side, dst)?;
        debug!(source = %src, link = src_link, target = %dst, "unregistered link");
        Ok(())
    }

    /// Records reachable from `locator` through `link`.
    ///
    /// A link target that no longer exists is an index fault and fails with
    /// `ObjectNotFound`.
    pub fn get_links_or_err(&self, locator: &Locator, link: &str) -> StoreResult<Vec<Arc<Record>>> {
        self.objects.get_or_err(locator)?;
        let side = self.ontology.link_type_side(&locator.object_type, link)?;
        self.links
            .resolve(locator, side)
            .iter()
            .map(|target| self.objects.get_or_err(target).map(Arc::clone))
            .collect()
    }

    /// The record with `target_pk` among the targets of `locator.link`.
    pub fn get_link_or_err(
        &self,
        locator: &Locator,
        link: &str,
        target_pk: &PrimaryKey,
    ) -> StoreResult<Arc<Record>> {
        self.get_links_or_err(locator, link)?
            .into_iter()
            .find(|record| &record.primary_key == target_pk)
            .ok_or_else(|| StoreError::LinkedObjectNotFound {
                source_object: locator.clone(),
                link: link.to_string(),
                target: target_pk.to_string(),
            })
    }

    /// Link accessor for one object type, built from the ontology.
    pub fn link_accessor(&self, object_type: &str) -> StoreResult<SchemaLinkAccessor> {
        SchemaLinkAccessor::new(&self.ontology, object_type)
    }

    /// Re-derive foreign-key-backed links from `record`'s properties.
    fn sync_foreign_keys(&mut self, record: &Record) -> StoreResult<()> {
        let ontology = Arc::clone(&self.ontology);
        let src = record.locator();
        for side in ontology.link_type_sides(&record.object_type)? {
            let Some(fk) = side.foreign_key_property.as_deref().filter(|_| side.is_one()) else {
                continue;
            };
            let inverse = ontology.inverse_link_type_side(&record.object_type, &side.api_name)?;
            match record.get(fk) {
                Some(value) => {
                    let dst = Locator::new(side.object_type.clone(), PrimaryKey::from_value(value)?);
                    if !self.objects.contains(&dst) {
                        warn!(
                            source = %src,
                            link = %side.api_name,
                            target = %dst,
                            "foreign key points at a missing object"
                        );
                    }
                    self.links.link(side, &src, inverse, &dst)?;
                }
                None => {
                    if let Some(old) = self.links.target(&src, &side.api_name).cloned() {
                        self.links.unlink(side, &src, inverse, &old)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk every stored edge and confirm its target exists and points back.
    pub fn check_invariants(&self) -> StoreResult<()> {
        for edge in self.links.edges() {
            if !self.objects.contains(&edge.target) {
                return Err(StoreError::LinkInvariantViolation(format!(
                    "{}.{} points at missing object {}",
                    edge.source, edge.link, edge.target
                )));
            }
            let inverse = self
                .ontology
                .inverse_link_name(&edge.source.object_type, &edge.link)?;
            if !self.links.contains(&edge.target, inverse, &edge.source) {
                return Err(StoreError::LinkInvariantViolation(format!(
                    "{}.{} points at {} but {}.{} does not point back",
                    edge.source, edge.link, edge.target, edge.target, inverse
                )));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Time series
    // -----------------------------------------------------------------------

    fn expect_property_type(
        &self,
        object_type: &str,
        property: &str,
        expected: &PropertyType,
    ) -> StoreResult<()> {
        let def = self.ontology.object_type(object_type)?;
        let ty = def
            .property_type(property)
            .ok_or_else(|| StoreError::PropertyNotFound {
                object_type: object_type.to_string(),
                property: property.to_string(),
            })?;
        if ty != expected {
            return Err(StoreError::InvalidPropertyType {
                object_type: object_type.to_string(),
                property: property.to_string(),
                expected: expected.to_string(),
                actual: ty.to_string(),
            });
        }
        Ok(())
    }

    /// Replace the points of a `timeseries` property.
    pub fn register_time_series_data(
        &mut self,
        locator: &Locator,
        property: &str,
        points: Vec<TimeSeriesPoint>,
    ) -> StoreResult<()> {
        self.objects.get_or_err(locator)?;
        self.expect_property_type(&locator.object_type, property, &PropertyType::TimeSeries)?;
        debug!(locator = %locator, property, points = points.len(), "registered time series");
        self.time_series
            .set(&locator.object_type, &locator.primary_key, property, points);
        Ok(())
    }

    /// Points of a series, oldest first, optionally restricted to `range`.
    pub fn get_time_series_data(
        &self,
        locator: &Locator,
        property: &str,
        range: Option<&TimeRange>,
    ) -> StoreResult<Vec<TimeSeriesPoint>> {
        self.objects.get_or_err(locator)?;
        let all = TimeRange::all();
        Ok(self.time_series.get(
            &locator.object_type,
            &locator.primary_key,
            property,
            range.unwrap_or(&all),
        ))
    }

    pub fn first_time_series_point(
        &self,
        locator: &Locator,
        property: &str,
    ) -> StoreResult<Option<&TimeSeriesPoint>> {
        self.objects.get_or_err(locator)?;
        Ok(self
            .time_series
            .first(&locator.object_type, &locator.primary_key, property))
    }

    pub fn last_time_series_point(
        &self,
        locator: &Locator,
        property: &str,
    ) -> StoreResult<Option<&TimeSeriesPoint>> {
        self.objects.get_or_err(locator)?;
        Ok(self
            .time_series
            .last(&locator.object_type, &locator.primary_key, property))
    }

    // -----------------------------------------------------------------------
    // Media
    // -----------------------------------------------------------------------

    /// Store media content for a `mediaReference` property under a fresh rid.
    pub fn register_media(
        &mut self,
        object_type: &str,
        property: &str,
        content: Bytes,
        media_type: &str,
        path: Option<String>,
    ) -> StoreResult<MediaReference> {
        self.register_media_with_rid(object_type, property, content, media_type, path, Rid::media_item())
    }

    pub fn register_media_with_rid(
        &mut self,
        object_type: &str,
        property: &str,
        content: Bytes,
        media_type: &str,
        path: Option<String>,
        rid: Rid,
    ) -> StoreResult<MediaReference> {
        self.expect_property_type(object_type, property, &PropertyType::MediaReference)?;
        let item = MediaItem::new(content, media_type, path, rid);
        let reference = item.reference.clone();
        debug!(
            object_type,
            property,
            rid = %reference.media_item_rid,
            size = item.metadata.size_bytes,
            "registered media"
        );
        self.media.insert(object_type, property, item);
        Ok(reference)
    }

    /// The media item referenced by `locator.property`.
    pub fn get_media_or_err(&self, locator: &Locator, property: &str) -> StoreResult<&MediaItem> {
        let record = self.objects.get_or_err(locator)?;
        self.expect_property_type(&locator.object_type, property, &PropertyType::MediaReference)?;

        let reference = match record.get(property) {
            Some(PropertyValue::Media(reference)) => reference,
            other => {
                return Err(StoreError::InvalidPropertyValue {
                    property: property.to_string(),
                    reason: format!(
                        "expected a media reference, found {}",
                        other.map_or("nothing", PropertyValue::kind)
                    ),
                })
            }
        };
        let rid = &reference.media_item_rid;
        if !rid.as_str().starts_with("ri.") {
            return Err(StoreError::InvalidPropertyValue {
                property: property.to_string(),
                reason: format!("{rid:?} is not a media item rid"),
            });
        }

        self.media
            .get(&locator.object_type, property, rid)
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!("no media item {rid} for {locator}.{property}"))
            })
    }
}

/// For a link backed by a foreign key, the record holding the key, the key
/// property, and the record the key points at.
fn foreign_key_end<'a>(
    src_side: &'a LinkTypeSide,
    src: &'a Locator,
    dst_side: &'a LinkTypeSide,
    dst: &'a Locator,
) -> Option<(&'a Locator, &'a str, &'a Locator)> {
    [(src_side, src, dst), (dst_side, dst, src)]
        .into_iter()
        .find_map(|(side, owner, far)| {
            side.foreign_key_property
                .as_deref()
                .filter(|_| side.is_one())
                .map(|fk| (owner, fk, far))
        })
}
