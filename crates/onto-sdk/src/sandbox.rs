use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use onto_action::{
    ActionEngine, ActionParameters, ActionResult, ApplyActionRequest, ApplyActionResponse, Batch,
    BatchApplyActionRequest, BatchApplyActionResponse, SubmissionCriterion, ValidationResponse,
};
use onto_query::{LoadObjectSetRequest, ObjectPage, ObjectSet, ObjectSetEvaluator, SavedObjectSets};
use onto_schema::Ontology;
use onto_store::{DataStore, MediaItem, ObjectSecurities, StoreConfig};
use onto_types::{
    Locator, MediaReference, PrimaryKey, Record, Rid, TimeRange, TimeSeriesPoint,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::SdkResult;
use crate::fixture::Fixture;

/// An in-memory ontology sandbox.
///
/// Owns the object store, the action engine with its registered effects and
/// criteria, and the saved object sets that `reference` sets resolve
/// against. Everything is reached through this one value.
#[derive(Debug)]
pub struct Sandbox {
    store: DataStore,
    engine: ActionEngine,
    saved: SavedObjectSets,
}

impl Sandbox {
    pub fn new(ontology: Ontology) -> Self {
        Self::with_config(ontology, StoreConfig::default())
    }

    pub fn with_config(ontology: Ontology, config: StoreConfig) -> Self {
        Self {
            store: DataStore::with_config(Arc::new(ontology), config),
            engine: ActionEngine::new(),
            saved: SavedObjectSets::new(),
        }
    }

    /// Build a sandbox from a fixture's schema and contents.
    pub fn from_fixture(fixture: &Fixture, config: StoreConfig) -> SdkResult<Self> {
        let mut sandbox = Self::with_config(fixture.ontology()?, config);
        fixture.populate(&mut sandbox.store)?;
        Ok(sandbox)
    }

    /// Read a `.toml` or `.json` fixture and build a sandbox from it.
    pub fn load_fixture(path: impl AsRef<Path>, config: StoreConfig) -> SdkResult<Self> {
        let path = path.as_ref();
        let sandbox = Self::from_fixture(&Fixture::load(path)?, config)?;
        info!(
            path = %path.display(),
            objects = sandbox.store.objects().len(),
            links = sandbox.store.links().edge_count(),
            "loaded fixture"
        );
        Ok(sandbox)
    }

    // ---- Accessors ----

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn ontology(&self) -> &Ontology {
        self.store.ontology()
    }

    pub fn engine(&self) -> &ActionEngine {
        &self.engine
    }

    pub fn saved_object_sets(&self) -> &SavedObjectSets {
        &self.saved
    }

    /// Drop all objects, links, series, media, and saved sets. Registered
    /// actions and criteria stay.
    pub fn clear(&mut self) {
        self.store.clear();
        self.saved.clear();
    }

    // ---- Objects ----

    pub fn register_object(&mut self, record: Record) -> SdkResult<Arc<Record>> {
        Ok(self.store.register_object(record)?)
    }

    /// Register a record built from JSON property literals.
    pub fn register_object_json(
        &mut self,
        object_type: &str,
        properties: &Map<String, Value>,
    ) -> SdkResult<Arc<Record>> {
        let record = self.store.record_from_json(object_type, properties, None)?;
        self.register_object(record)
    }

    /// Register a record whose governed properties load with securities
    /// attached when a single-object load asks for them.
    pub fn register_object_with_property_securities(
        &mut self,
        record: Record,
        securities: ObjectSecurities,
    ) -> SdkResult<Arc<Record>> {
        Ok(self
            .store
            .register_object_with_property_securities(record, securities)?)
    }

    pub fn get_object_with_securities(
        &self,
        locator: &Locator,
    ) -> Option<(&Arc<Record>, &ObjectSecurities)> {
        self.store.get_object_with_securities(locator)
    }

    pub fn replace_object_or_err(&mut self, record: Record) -> SdkResult<Arc<Record>> {
        Ok(self.store.replace_object_or_err(record)?)
    }

    pub fn unregister_object_or_err(&mut self, locator: &Locator) -> SdkResult<Arc<Record>> {
        Ok(self.store.unregister_object_or_err(locator)?)
    }

    pub fn get_object(&self, locator: &Locator) -> Option<&Arc<Record>> {
        self.store.get_object(locator)
    }

    pub fn get_object_or_err(&self, locator: &Locator) -> SdkResult<&Arc<Record>> {
        Ok(self.store.get_object_or_err(locator)?)
    }

    pub fn get_object_by_rid(&self, rid: &Rid) -> Option<&Arc<Record>> {
        self.store.get_object_by_rid(rid)
    }

    pub fn get_objects_of_type(&self, object_type: &str) -> SdkResult<Vec<Arc<Record>>> {
        Ok(self.store.get_objects_of_type(object_type)?.cloned().collect())
    }

    // ---- Links ----

    pub fn register_link(
        &mut self,
        source: &Locator,
        link: &str,
        target: &Locator,
        inverse: &str,
    ) -> SdkResult<()> {
        Ok(self.store.register_link(source, link, target, inverse)?)
    }

    pub fn unregister_link(
        &mut self,
        source: &Locator,
        link: &str,
        target: &Locator,
        inverse: &str,
    ) -> SdkResult<()> {
        Ok(self.store.unregister_link(source, link, target, inverse)?)
    }

    pub fn get_links_or_err(&self, locator: &Locator, link: &str) -> SdkResult<Vec<Arc<Record>>> {
        Ok(self.store.get_links_or_err(locator, link)?)
    }

    pub fn get_link_or_err(
        &self,
        locator: &Locator,
        link: &str,
        target: &PrimaryKey,
    ) -> SdkResult<Arc<Record>> {
        Ok(self.store.get_link_or_err(locator, link, target)?)
    }

    // ---- Object sets ----

    pub fn save_object_set(&mut self, id: impl Into<String>, set: ObjectSet) {
        self.saved.save(id, set);
    }

    /// Every record of `set`, unsorted and unpaged.
    pub fn evaluate_object_set(&self, set: &ObjectSet) -> SdkResult<Vec<Arc<Record>>> {
        Ok(ObjectSetEvaluator::new(&self.store, &self.saved).evaluate(set)?)
    }

    pub fn get_objects_from_object_set(
        &self,
        request: &LoadObjectSetRequest,
    ) -> SdkResult<ObjectPage> {
        Ok(ObjectSetEvaluator::new(&self.store, &self.saved).load(request)?)
    }

    // ---- Actions ----

    pub fn register_action<F>(&mut self, action: impl Into<String>, effect: F)
    where
        F: Fn(&mut Batch<'_>, &ActionParameters) -> ActionResult<()> + Send + Sync + 'static,
    {
        self.engine.register(action, effect);
    }

    pub fn add_submission_criterion(
        &mut self,
        action: impl Into<String>,
        criterion: impl SubmissionCriterion + 'static,
    ) {
        self.engine.add_criterion(action, criterion);
    }

    pub fn validate_action(
        &self,
        action: &str,
        params: &ActionParameters,
    ) -> SdkResult<ValidationResponse> {
        Ok(self.engine.validate_action(&self.store, action, params)?)
    }

    pub fn apply_action(
        &mut self,
        action: &str,
        request: &ApplyActionRequest,
    ) -> SdkResult<ApplyActionResponse> {
        Ok(self.engine.apply_action(&mut self.store, action, request)?)
    }

    pub fn batch_apply_action(
        &mut self,
        action: &str,
        request: &BatchApplyActionRequest,
    ) -> SdkResult<BatchApplyActionResponse> {
        Ok(self.engine.batch_apply_action(&mut self.store, action, request)?)
    }

    // ---- Time series and media ----

    pub fn register_time_series_data(
        &mut self,
        locator: &Locator,
        property: &str,
        points: Vec<TimeSeriesPoint>,
    ) -> SdkResult<()> {
        Ok(self.store.register_time_series_data(locator, property, points)?)
    }

    pub fn get_time_series_data(
        &self,
        locator: &Locator,
        property: &str,
        range: Option<&TimeRange>,
    ) -> SdkResult<Vec<TimeSeriesPoint>> {
        Ok(self.store.get_time_series_data(locator, property, range)?)
    }

    pub fn register_media(
        &mut self,
        object_type: &str,
        property: &str,
        content: impl Into<Bytes>,
        media_type: &str,
        path: Option<String>,
    ) -> SdkResult<MediaReference> {
        Ok(self
            .store
            .register_media(object_type, property, content.into(), media_type, path)?)
    }

    pub fn get_media_or_err(&self, locator: &Locator, property: &str) -> SdkResult<&MediaItem> {
        Ok(self.store.get_media_or_err(locator, property)?)
    }
}
