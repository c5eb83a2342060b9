//! Disjunction-of-conjunctions over symbol-value-set assignments.
//!
//! A [`SolutionCache`] represents "any one of these alternative assignments
//! satisfies the constraint". Each alternative is a conjunction: every
//! symbol it mentions must land in the paired value set. The empty
//! conjunction (`{}`) is trivially satisfied, so "no constraint yet" is the
//! singleton list `[{}]`, not the empty list — the empty list means
//! infeasible.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::symbol::SymbolId;
use crate::tristate::Tristate;

pub type ValueSet = std::collections::BTreeSet<Tristate>;

pub fn value_set(values: impl IntoIterator<Item = Tristate>) -> ValueSet {
    values.into_iter().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionCache {
    alternatives: Vec<BTreeMap<SymbolId, ValueSet>>,
}

impl SolutionCache {
    /// The "no constraint" cache: a single, empty alternative.
    pub fn trivial() -> Self {
        SolutionCache { alternatives: vec![BTreeMap::new()] }
    }

    /// The unsatisfiable cache: no alternatives at all.
    pub fn infeasible() -> Self {
        SolutionCache { alternatives: Vec::new() }
    }

    pub fn for_symbol(sym: SymbolId, values: ValueSet) -> Self {
        let mut cache = SolutionCache::trivial();
        cache.push_symbol(sym, &values);
        cache
    }

    pub fn is_feasible(&self) -> bool {
        !self.alternatives.is_empty()
    }

    pub fn alternatives(&self) -> &[BTreeMap<SymbolId, ValueSet>] {
        &self.alternatives
    }

    pub fn into_alternatives(self) -> Vec<BTreeMap<SymbolId, ValueSet>> {
        self.alternatives
    }

    /// Intersects `values` into every alternative's entry for `sym`,
    /// dropping alternatives whose intersection becomes empty. Returns
    /// whether the cache is still feasible afterwards.
    pub fn push_symbol(&mut self, sym: SymbolId, values: &ValueSet) -> bool {
        let mut new_alts = Vec::with_capacity(self.alternatives.len());
        for mut alt in std::mem::take(&mut self.alternatives) {
            let entry = match alt.get(&sym) {
                Some(existing) => existing.intersection(values).cloned().collect(),
                None => values.clone(),
            };
            if !entry.is_empty() {
                alt.insert(sym, entry);
                new_alts.push(alt);
            }
        }
        self.alternatives = new_alts;
        self.is_feasible()
    }

    fn merge_dicts(
        a: &BTreeMap<SymbolId, ValueSet>,
        b: &BTreeMap<SymbolId, ValueSet>,
    ) -> Option<BTreeMap<SymbolId, ValueSet>> {
        let mut out = BTreeMap::new();
        for (sym, values) in a {
            let entry: ValueSet = match b.get(sym) {
                Some(bvalues) => values.intersection(bvalues).cloned().collect(),
                None => values.clone(),
            };
            if entry.is_empty() {
                return None;
            }
            out.insert(*sym, entry);
        }
        for (sym, values) in b {
            out.entry(*sym).or_insert_with(|| values.clone());
        }
        Some(out)
    }

    /// Cross-product merge: every alternative of `self` combined with every
    /// alternative of `other`, keeping only combinations with no empty
    /// intersection. This is the "both constraints must hold" operation
    /// (conjunction of two already-disjunctive caches).
    pub fn merge(&self, other: &SolutionCache) -> SolutionCache {
        let mut out = Vec::new();
        for a in &self.alternatives {
            for b in &other.alternatives {
                if let Some(merged) = Self::merge_dicts(a, b) {
                    out.push(merged);
                }
            }
        }
        SolutionCache { alternatives: out }
    }

    /// Disjunction-over-disjunction: `self AND (alt_1 OR alt_2 OR ...)`,
    /// expanded to `(self AND alt_1) OR (self AND alt_2) OR ...`.
    pub fn merge_alternatives(&self, alternatives: &[SolutionCache]) -> SolutionCache {
        let merged = alternatives.iter().flat_map(|alt_cache| self.merge(alt_cache).alternatives).collect_vec();
        SolutionCache { alternatives: merged }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolId;

    fn sid(n: u32) -> SymbolId {
        SymbolId::from_raw(n)
    }

    #[test]
    fn trivial_is_feasible_and_empty() {
        let t = SolutionCache::trivial();
        assert!(t.is_feasible());
        assert_eq!(t.alternatives().len(), 1);
        assert!(t.alternatives()[0].is_empty());
    }

    #[test]
    fn infeasible_has_no_alternatives() {
        assert!(!SolutionCache::infeasible().is_feasible());
    }

    #[test]
    fn push_symbol_intersects_and_drops_empty() {
        let mut cache = SolutionCache::for_symbol(sid(1), value_set([Tristate::Mod, Tristate::Yes]));
        assert!(cache.push_symbol(sid(1), &value_set([Tristate::Yes])));
        assert_eq!(
            cache.alternatives()[0].get(&sid(1)),
            Some(&value_set([Tristate::Yes]))
        );

        assert!(!cache.push_symbol(sid(1), &value_set([Tristate::No])));
        assert!(!cache.is_feasible());
    }

    #[test]
    fn merge_is_cross_product_with_intersection() {
        let a = SolutionCache::for_symbol(sid(1), value_set([Tristate::Mod, Tristate::Yes]));
        let b = SolutionCache::for_symbol(sid(2), value_set([Tristate::Yes]));
        let merged = a.merge(&b);
        assert_eq!(merged.alternatives().len(), 1);
        let alt = &merged.alternatives()[0];
        assert_eq!(alt.get(&sid(1)), Some(&value_set([Tristate::Mod, Tristate::Yes])));
        assert_eq!(alt.get(&sid(2)), Some(&value_set([Tristate::Yes])));
    }

    #[test]
    fn merge_conflicting_symbol_drops_alternative() {
        let a = SolutionCache::for_symbol(sid(1), value_set([Tristate::Yes]));
        let b = SolutionCache::for_symbol(sid(1), value_set([Tristate::No]));
        assert!(!a.merge(&b).is_feasible());
    }

    #[test]
    fn merge_alternatives_unions_branches() {
        let base = SolutionCache::trivial();
        let branch_a = SolutionCache::for_symbol(sid(1), value_set([Tristate::Yes]));
        let branch_b = SolutionCache::for_symbol(sid(2), value_set([Tristate::Yes]));
        let result = base.merge_alternatives(&[branch_a, branch_b]);
        assert_eq!(result.alternatives().len(), 2);
    }
}
