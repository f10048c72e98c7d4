//! Canonical models and their content-derived identifiers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::atom::{Atom, RawSolution, Value};
use crate::hashname;

/// Atoms grouped by predicate, each group holding its argument tuples.
pub type AtomsByPredicate = BTreeMap<String, BTreeSet<Vec<Value>>>;

/// Stable, human-readable identifier of a model's content.
///
/// Equal atom sets always produce equal ids. Distinct atom sets produce
/// distinct ids with high probability only: a collision merges two models.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Wrap an existing id (e.g. loaded from persisted state).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the id of an already sorted, deduplicated atom sequence.
    fn from_canonical_atoms(atoms: &[Atom], words: usize) -> Self {
        Self(hashname::from_value(&atoms, words))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A solution in canonical form: sorted, duplicate-free atoms plus their id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalModel {
    atoms: Vec<Atom>,
    id: ModelId,
}

impl CanonicalModel {
    /// Canonicalize a raw solution.
    ///
    /// Atoms are sorted by predicate, then by argument tuple; the solver's
    /// enumeration order has no effect on the result.
    pub fn from_raw(raw: &RawSolution, id_words: usize) -> Self {
        Self::from_atoms(raw.atoms.iter().cloned(), id_words)
    }

    /// Canonicalize any collection of atoms.
    pub fn from_atoms(atoms: impl IntoIterator<Item = Atom>, id_words: usize) -> Self {
        let sorted: BTreeSet<Atom> = atoms.into_iter().collect();
        let atoms: Vec<Atom> = sorted.into_iter().collect();
        let id = ModelId::from_canonical_atoms(&atoms, id_words);
        Self { atoms, id }
    }

    /// Content-derived identifier.
    pub fn id(&self) -> &ModelId {
        &self.id
    }

    /// Sorted atoms.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Whether the model holds the given atom.
    pub fn contains(&self, atom: &Atom) -> bool {
        self.atoms.binary_search(atom).is_ok()
    }

    /// Atoms with the given predicate, in canonical order.
    pub fn atoms_of<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a Atom> + 'a {
        self.atoms.iter().filter(move |a| a.predicate == predicate)
    }

    /// Atoms grouped by predicate.
    pub fn by_predicate(&self) -> AtomsByPredicate {
        group(self.atoms.iter())
    }

    /// Solver syntax of the whole model: `a(1). b(2).`
    pub fn to_facts(&self) -> String {
        self.atoms
            .iter()
            .map(|a| format!("{}.", a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Atoms common to every model, grouped by predicate.
///
/// Taking the first model separately means the function cannot be called on
/// an empty collection. A single model yields its own atoms. Predicates
/// without common atoms are absent from the result.
pub fn intersection(first: &CanonicalModel, rest: &[CanonicalModel]) -> AtomsByPredicate {
    let common = first
        .atoms
        .iter()
        .filter(|atom| rest.iter().all(|m| m.contains(atom)));
    group(common)
}

/// Atoms present in at least one model.
pub fn union(models: &[CanonicalModel]) -> BTreeSet<&Atom> {
    models.iter().flat_map(|m| m.atoms.iter()).collect()
}

fn group<'a>(atoms: impl Iterator<Item = &'a Atom>) -> AtomsByPredicate {
    let mut grouped = AtomsByPredicate::new();
    for atom in atoms {
        grouped
            .entry(atom.predicate.clone())
            .or_default()
            .insert(atom.args.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(texts: &[&str]) -> RawSolution {
        RawSolution::from_texts(texts).unwrap()
    }

    #[test]
    fn test_canonical_order() {
        let model = CanonicalModel::from_raw(&raw(&["b(1)", "a(2)", "a(1)"]), 2);
        let texts: Vec<String> = model.atoms().iter().map(|a| a.to_string()).collect();
        assert_eq!(texts, vec!["a(1)", "a(2)", "b(1)"]);
    }

    #[test]
    fn test_order_independence() {
        let m1 = CanonicalModel::from_raw(&raw(&["p(1,2)", "q(x)", "r"]), 3);
        let m2 = CanonicalModel::from_raw(&raw(&["r", "p(1,2)", "q(x)"]), 3);
        assert_eq!(m1, m2);
        assert_eq!(m1.id(), m2.id());
    }

    #[test]
    fn test_duplicates_collapse() {
        let m1 = CanonicalModel::from_raw(&raw(&["p(1)", "p(1)"]), 3);
        let m2 = CanonicalModel::from_raw(&raw(&["p(1)"]), 3);
        assert_eq!(m1.atoms().len(), 1);
        assert_eq!(m1.id(), m2.id());
    }

    #[test]
    fn test_different_content_different_id() {
        let m1 = CanonicalModel::from_raw(&raw(&["p(1)"]), 3);
        let m2 = CanonicalModel::from_raw(&raw(&["p(2)"]), 3);
        assert_ne!(m1.id(), m2.id());
    }

    #[test]
    fn test_costs_do_not_affect_id() {
        let m1 = CanonicalModel::from_raw(&raw(&["p(1)"]).with_costs(vec![3]), 3);
        let m2 = CanonicalModel::from_raw(&raw(&["p(1)"]), 3);
        assert_eq!(m1.id(), m2.id());
    }

    #[test]
    fn test_intersection_single_model() {
        let m = CanonicalModel::from_raw(&raw(&["p(1)", "q(2)"]), 3);
        let common = intersection(&m, &[]);
        assert_eq!(common, m.by_predicate());
    }

    #[test]
    fn test_intersection_multiple_models() {
        let m1 = CanonicalModel::from_raw(&raw(&["p(1)", "p(2)", "q(1)"]), 3);
        let m2 = CanonicalModel::from_raw(&raw(&["p(1)", "q(2)"]), 3);
        let m3 = CanonicalModel::from_raw(&raw(&["p(1)", "p(2)"]), 3);
        let before = m1.clone();

        let common = intersection(&m1, &[m2, m3]);
        assert_eq!(common.len(), 1);
        assert_eq!(
            common["p"],
            [vec![Value::Int(1)]].into_iter().collect::<BTreeSet<_>>()
        );
        assert_eq!(m1, before);
    }

    #[test]
    fn test_union() {
        let m1 = CanonicalModel::from_raw(&raw(&["p(1)", "q(1)"]), 3);
        let m2 = CanonicalModel::from_raw(&raw(&["p(1)", "q(2)"]), 3);
        assert_eq!(union(&[m1, m2]).len(), 3);
    }

    #[test]
    fn test_to_facts() {
        let m = CanonicalModel::from_raw(&raw(&["b", "a(1)"]), 3);
        assert_eq!(m.to_facts(), "a(1). b.");
    }
}
