//! Bidirectional link indices.
//!
//! The graph stores edges only; it does not own records and never checks
//! that a locator refers to an existing record. Callers resolve link sides
//! from the ontology and hand them in, so the graph can apply each side's
//! cardinality.

use std::collections::{BTreeSet, HashMap};

use onto_schema::{Cardinality, LinkTypeSide};
use onto_types::Locator;

use crate::error::{StoreError, StoreResult};

/// One directed edge: `source --link--> target`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LinkEdge {
    pub source: Locator,
    pub link: String,
    pub target: Locator,
}

/// Single- and multi-valued link indices keyed by locator.
///
/// Every edge is stored on both of its ends: if `A.l` points at `B`, then
/// `B.inverse(l)` points at (or contains) `A`. [`LinkGraph::link`] and
/// [`LinkGraph::unlink`] maintain that pairing, including removing the stale
/// back-reference when a `ONE` side is overwritten.
#[derive(Debug, Default)]
pub struct LinkGraph {
    single: HashMap<Locator, HashMap<String, Locator>>,
    many: HashMap<Locator, HashMap<String, BTreeSet<Locator>>>,
}

/// Check that two resolved sides form one link type and that the caller's
/// inverse name matches the schema.
pub fn check_link_pair(
    src_side: &LinkTypeSide,
    dst_side: &LinkTypeSide,
    dst_link: &str,
) -> StoreResult<()> {
    if src_side.link_type_rid != dst_side.link_type_rid {
        return Err(StoreError::LinkIdentityMismatch {
            source_rid: src_side.link_type_rid.to_string(),
            target_rid: dst_side.link_type_rid.to_string(),
        });
    }
    if dst_side.api_name != dst_link {
        return Err(StoreError::LinkNameMismatch {
            expected: dst_link.to_string(),
            actual: dst_side.api_name.clone(),
        });
    }
    Ok(())
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `src --src_side--> dst` and its inverse.
    pub fn link(
        &mut self,
        src_side: &LinkTypeSide,
        src: &Locator,
        dst_side: &LinkTypeSide,
        dst: &Locator,
    ) -> StoreResult<()> {
        self.update_side(src_side, src, dst_side, dst)?;
        self.update_side(dst_side, dst, src_side, src)
    }

    /// Remove `src --src_side--> dst` and its inverse.
    ///
    /// Both ends must currently hold the edge.
    pub fn unlink(
        &mut self,
        src_side: &LinkTypeSide,
        src: &Locator,
        dst_side: &LinkTypeSide,
        dst: &Locator,
    ) -> StoreResult<()> {
        self.remove_side(src, src_side, dst)?;
        if is_self_loop(src_side, src, dst_side, dst) {
            return Ok(());
        }
        self.remove_side(dst, dst_side, src)
    }

    /// Point one side of a link at `dst`.
    ///
    /// For a `ONE` side with a different prior target, the prior target's
    /// back-reference (under `dst_side`) is removed first.
    pub fn update_side(
        &mut self,
        src_side: &LinkTypeSide,
        src: &Locator,
        dst_side: &LinkTypeSide,
        dst: &Locator,
    ) -> StoreResult<()> {
        match src_side.cardinality {
            Cardinality::One => {
                let prior = self
                    .single
                    .get(src)
                    .and_then(|links| links.get(&src_side.api_name))
                    .cloned();
                if let Some(old) = prior.filter(|old| old != dst) {
                    self.remove_side(&old, dst_side, src)?;
                }
                self.single
                    .entry(src.clone())
                    .or_default()
                    .insert(src_side.api_name.clone(), dst.clone());
            }
            Cardinality::Many => {
                self.many
                    .entry(src.clone())
                    .or_default()
                    .entry(src_side.api_name.clone())
                    .or_default()
                    .insert(dst.clone());
            }
        }
        Ok(())
    }

    /// Remove one side of a link, which must currently hold `expected`.
    pub fn remove_side(
        &mut self,
        locator: &Locator,
        side: &LinkTypeSide,
        expected: &Locator,
    ) -> StoreResult<()> {
        let name = &side.api_name;
        match side.cardinality {
            Cardinality::One => {
                let links = self.single.get_mut(locator);
                let found = links.as_ref().and_then(|l| l.get(name)).cloned();
                if found.as_ref() != Some(expected) {
                    return Err(StoreError::LinkInvariantViolation(format!(
                        "expected {locator}.{name} to point at {expected}, found {}",
                        found.map_or_else(|| "nothing".to_string(), |l| l.to_string())
                    )));
                }
                if let Some(links) = links {
                    links.remove(name);
                    if links.is_empty() {
                        self.single.remove(locator);
                    }
                }
            }
            Cardinality::Many => {
                let removed = self
                    .many
                    .get_mut(locator)
                    .and_then(|links| links.get_mut(name))
                    .is_some_and(|targets| targets.remove(expected));
                if !removed {
                    return Err(StoreError::LinkInvariantViolation(format!(
                        "expected {locator}.{name} to contain {expected}"
                    )));
                }
                if let Some(links) = self.many.get_mut(locator) {
                    if links.get(name).is_some_and(BTreeSet::is_empty) {
                        links.remove(name);
                    }
                    if links.is_empty() {
                        self.many.remove(locator);
                    }
                }
            }
        }
        Ok(())
    }

    /// Targets of `locator` through `side`. Multi-link targets come back in
    /// locator order.
    pub fn resolve(&self, locator: &Locator, side: &LinkTypeSide) -> Vec<Locator> {
        match side.cardinality {
            Cardinality::One => self
                .single
                .get(locator)
                .and_then(|links| links.get(&side.api_name))
                .cloned()
                .into_iter()
                .collect(),
            Cardinality::Many => self
                .many
                .get(locator)
                .and_then(|links| links.get(&side.api_name))
                .map(|targets| targets.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Current target of a single-valued link.
    pub fn target(&self, locator: &Locator, link: &str) -> Option<&Locator> {
        self.single.get(locator).and_then(|links| links.get(link))
    }

    /// Whether `source.link` holds `target`, under either cardinality.
    pub fn contains(&self, source: &Locator, link: &str, target: &Locator) -> bool {
        self.target(source, link) == Some(target)
            || self
                .many
                .get(source)
                .and_then(|links| links.get(link))
                .is_some_and(|targets| targets.contains(target))
    }

    /// Every `(link name, target)` edge held by `locator`, sorted.
    pub fn links_of(&self, locator: &Locator) -> Vec<(String, Locator)> {
        let mut edges: Vec<(String, Locator)> = self
            .single
            .get(locator)
            .into_iter()
            .flat_map(|links| links.iter().map(|(l, t)| (l.clone(), t.clone())))
            .chain(self.many.get(locator).into_iter().flat_map(|links| {
                links
                    .iter()
                    .flat_map(|(l, ts)| ts.iter().map(move |t| (l.clone(), t.clone())))
            }))
            .collect();
        edges.sort();
        edges
    }

    /// Every stored edge, sorted. Each link appears once per end.
    pub fn edges(&self) -> Vec<LinkEdge> {
        let mut edges: Vec<LinkEdge> = self
            .single
            .iter()
            .flat_map(|(source, links)| {
                links.iter().map(move |(link, target)| LinkEdge {
                    source: source.clone(),
                    link: link.clone(),
                    target: target.clone(),
                })
            })
            .chain(self.many.iter().flat_map(|(source, links)| {
                links.iter().flat_map(move |(link, targets)| {
                    targets.iter().map(move |target| LinkEdge {
                        source: source.clone(),
                        link: link.clone(),
                        target: target.clone(),
                    })
                })
            }))
            .collect();
        edges.sort();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.single.values().map(HashMap::len).sum::<usize>()
            + self
                .many
                .values()
                .flat_map(HashMap::values)
                .map(BTreeSet::len)
                .sum::<usize>()
    }

    pub fn clear(&mut self) {
        self.single.clear();
        self.many.clear();
    }
}

/// A record linked to itself through a self-inverse link is one index entry.
fn is_self_loop(
    src_side: &LinkTypeSide,
    src: &Locator,
    dst_side: &LinkTypeSide,
    dst: &Locator,
) -> bool {
    src == dst && src_side.api_name == dst_side.api_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use onto_types::Rid;
    use proptest::prelude::*;

    fn side(name: &str, target: &str, cardinality: Cardinality) -> LinkTypeSide {
        LinkTypeSide {
            api_name: name.to_string(),
            object_type: target.to_string(),
            cardinality,
            link_type_rid: Rid::from("ri.ontology.main.relation.test"),
            foreign_key_property: None,
        }
    }

    fn emp(pk: &str) -> Locator {
        Locator::new("Employee", pk)
    }

    fn office(pk: &str) -> Locator {
        Locator::new("Office", pk)
    }

    // Employee.lead (ONE) <-> Employee.reports (MANY)
    fn lead() -> (LinkTypeSide, LinkTypeSide) {
        (
            side("lead", "Employee", Cardinality::One),
            side("reports", "Employee", Cardinality::Many),
        )
    }

    // -----------------------------------------------------------------------
    // Symmetry
    // -----------------------------------------------------------------------

    #[test]
    fn many_to_many_self_inverse_link_is_symmetric() {
        let peeps = side("peeps", "Employee", Cardinality::Many);
        let mut graph = LinkGraph::new();
        graph.link(&peeps, &emp("1"), &peeps, &emp("2")).unwrap();

        assert_eq!(graph.resolve(&emp("1"), &peeps), vec![emp("2")]);
        assert_eq!(graph.resolve(&emp("2"), &peeps), vec![emp("1")]);

        graph.unlink(&peeps, &emp("1"), &peeps, &emp("2")).unwrap();
        assert!(graph.resolve(&emp("1"), &peeps).is_empty());
        assert!(graph.resolve(&emp("2"), &peeps).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn one_side_overwrite_cleans_stale_back_reference() {
        let (lead, reports) = lead();
        let mut graph = LinkGraph::new();
        graph.link(&lead, &emp("A"), &reports, &emp("B")).unwrap();
        graph.link(&lead, &emp("A"), &reports, &emp("C")).unwrap();

        assert_eq!(graph.resolve(&emp("A"), &lead), vec![emp("C")]);
        assert!(graph.resolve(&emp("B"), &reports).is_empty());
        assert_eq!(graph.resolve(&emp("C"), &reports), vec![emp("A")]);
    }

    #[test]
    fn linking_from_the_many_side_moves_the_one_side() {
        let office_side = side("office", "Office", Cardinality::One);
        let occupants = side("occupants", "Employee", Cardinality::Many);
        let mut graph = LinkGraph::new();
        graph.link(&office_side, &emp("1"), &occupants, &office("nyc")).unwrap();
        graph.link(&occupants, &office("sf"), &office_side, &emp("1")).unwrap();

        assert_eq!(graph.resolve(&emp("1"), &office_side), vec![office("sf")]);
        assert!(graph.resolve(&office("nyc"), &occupants).is_empty());
        assert_eq!(graph.resolve(&office("sf"), &occupants), vec![emp("1")]);
    }

    #[test]
    fn one_to_one_self_inverse_moves_both_ends() {
        let spouse = side("spouse", "Employee", Cardinality::One);
        let mut graph = LinkGraph::new();
        graph.link(&spouse, &emp("A"), &spouse, &emp("B")).unwrap();
        graph.link(&spouse, &emp("A"), &spouse, &emp("C")).unwrap();

        assert_eq!(graph.target(&emp("A"), "spouse"), Some(&emp("C")));
        assert_eq!(graph.target(&emp("C"), "spouse"), Some(&emp("A")));
        assert_eq!(graph.target(&emp("B"), "spouse"), None);
    }

    #[test]
    fn relinking_same_target_is_idempotent() {
        let (lead, reports) = lead();
        let mut graph = LinkGraph::new();
        graph.link(&lead, &emp("A"), &reports, &emp("B")).unwrap();
        graph.link(&lead, &emp("A"), &reports, &emp("B")).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn self_loop_unlinks_cleanly() {
        let peeps = side("peeps", "Employee", Cardinality::Many);
        let mut graph = LinkGraph::new();
        graph.link(&peeps, &emp("1"), &peeps, &emp("1")).unwrap();
        assert_eq!(graph.resolve(&emp("1"), &peeps), vec![emp("1")]);
        graph.unlink(&peeps, &emp("1"), &peeps, &emp("1")).unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Invariant faults
    // -----------------------------------------------------------------------

    #[test]
    fn removing_absent_edge_is_an_invariant_violation() {
        let (lead, reports) = lead();
        let mut graph = LinkGraph::new();
        assert!(matches!(
            graph.remove_side(&emp("A"), &lead, &emp("B")),
            Err(StoreError::LinkInvariantViolation(_))
        ));
        assert!(matches!(
            graph.remove_side(&emp("B"), &reports, &emp("A")),
            Err(StoreError::LinkInvariantViolation(_))
        ));
    }

    #[test]
    fn removing_with_wrong_expected_target_fails() {
        let (lead, reports) = lead();
        let mut graph = LinkGraph::new();
        graph.link(&lead, &emp("A"), &reports, &emp("B")).unwrap();
        assert!(graph.remove_side(&emp("A"), &lead, &emp("C")).is_err());
        assert_eq!(graph.target(&emp("A"), "lead"), Some(&emp("B")));
    }

    #[test]
    fn pair_check_rejects_wrong_inverse_name() {
        let (lead, reports) = lead();
        assert!(check_link_pair(&lead, &reports, "reports").is_ok());
        assert_eq!(
            check_link_pair(&lead, &reports, "minions"),
            Err(StoreError::LinkNameMismatch {
                expected: "minions".into(),
                actual: "reports".into()
            })
        );
        let mut other = reports.clone();
        other.link_type_rid = Rid::from("ri.ontology.main.relation.other");
        assert!(matches!(
            check_link_pair(&lead, &other, "reports"),
            Err(StoreError::LinkIdentityMismatch { .. })
        ));
    }

    #[test]
    fn links_of_lists_both_cardinalities() {
        let (lead, reports) = lead();
        let peeps = side("peeps", "Employee", Cardinality::Many);
        let mut graph = LinkGraph::new();
        graph.link(&lead, &emp("A"), &reports, &emp("B")).unwrap();
        graph.link(&peeps, &emp("A"), &peeps, &emp("C")).unwrap();
        assert_eq!(
            graph.links_of(&emp("A")),
            vec![("lead".to_string(), emp("B")), ("peeps".to_string(), emp("C"))]
        );
        assert_eq!(graph.edges().len(), 4);
    }

    proptest! {
        /// After any sequence of links on a ONE/MANY pair, every edge has
        /// its inverse and every ONE side holds at most one target.
        #[test]
        fn random_link_sequences_stay_symmetric(
            ops in proptest::collection::vec((0u8..5, 0u8..5, any::<bool>()), 1..40)
        ) {
            let (lead, reports) = lead();
            let mut graph = LinkGraph::new();
            for (a, b, from_one_side) in ops {
                let a = emp(&a.to_string());
                let b = emp(&b.to_string());
                if from_one_side {
                    graph.link(&lead, &a, &reports, &b).unwrap();
                } else {
                    graph.link(&reports, &a, &lead, &b).unwrap();
                }
            }
            for edge in graph.edges() {
                let inverse = if edge.link == "lead" { "reports" } else { "lead" };
                prop_assert!(graph.contains(&edge.target, inverse, &edge.source));
            }
        }
    }
}
