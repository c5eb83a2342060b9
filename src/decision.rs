//! Per-symbol decision accumulators: user requests narrow monotonically
//! towards a final value, never widen.
//!
//! Two shapes, dispatched by symbol type: a *restriction-set* decision for
//! tristate/boolean symbols (an acceptable-value set that can only shrink),
//! and a *scalar-value* decision for string/int/hex symbols (an assigned
//! value, modified in place by `append`/`add`).

use log::{debug, warn};

use crate::solcache::{value_set, ValueSet};
use crate::symbol::Value;
use crate::tristate::Tristate;

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("conflicting request {requested:?} is incompatible with current {current:?}")]
    Conflict { requested: ValueSet, current: ValueSet },
    #[error("operation not supported for this symbol's decision shape")]
    TypeMismatch,
}

/// Restriction-set decision: tristate/boolean symbols. `None` means
/// unrestricted (no decision made yet).
#[derive(Debug, Clone, Default)]
pub struct RestrictionSetDecision {
    /// The symbol's value in the base config, kept for "greedy no-change"
    /// preference during resolution.
    pub base_default: Option<Tristate>,
    current: Option<ValueSet>,
}

impl RestrictionSetDecision {
    pub fn new(base_default: Option<Tristate>) -> Self {
        RestrictionSetDecision { base_default, current: None }
    }

    pub fn current(&self) -> Option<&ValueSet> {
        self.current.as_ref()
    }

    pub fn is_decided(&self) -> bool {
        self.current.is_some()
    }

    /// Intersects `requested` into the current acceptable set. First call
    /// replaces `None` outright (logging an override if a base default
    /// exists and isn't in the requested set); later calls further
    /// restrict, or are refused (with the previous state kept) if the
    /// requested set doesn't overlap at all.
    pub fn restrict(&mut self, requested: ValueSet) -> Result<(), DecisionError> {
        match &self.current {
            None => {
                if let Some(default) = self.base_default {
                    if !requested.contains(&default) {
                        debug!("overriding default {default} with requested set {requested:?}");
                    }
                }
                self.current = Some(requested);
                Ok(())
            }
            Some(existing) => {
                if *existing == requested {
                    return Ok(());
                }
                let intersection: ValueSet = existing.intersection(&requested).cloned().collect();
                if intersection.is_empty() {
                    warn!("conflicting decision: requested {requested:?}, current {existing:?}");
                    return Err(DecisionError::Conflict { requested, current: existing.clone() });
                }
                debug!("restricting decision from {existing:?} to {intersection:?}");
                self.current = Some(intersection);
                Ok(())
            }
        }
    }

    /// Forgets the decision entirely, as if it had never been made.
    pub fn discard(&mut self) {
        self.current = None;
    }
}

/// Scalar-value decision: string/int/hex symbols. `current` carries the
/// decided state once made: `Some(None)` is a decided *disable* (the
/// symbol becomes `# CONFIG_X is not set`, bypassing its normal value
/// type), `Some(Some(v))` a decided value, `None` no decision yet.
#[derive(Debug, Clone, Default)]
pub struct ScalarValueDecision {
    pub base_default: Option<Value>,
    current: Option<Option<Value>>,
}

impl ScalarValueDecision {
    pub fn new(base_default: Option<Value>) -> Self {
        ScalarValueDecision { base_default, current: None }
    }

    /// The decided value, if any decision has been made and it wasn't a
    /// `disable`.
    pub fn current(&self) -> Option<&Value> {
        self.current.as_ref().and_then(|v| v.as_ref())
    }

    pub fn is_decided(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.current, Some(None))
    }

    pub fn set_to(&mut self, value: Value) {
        if self.current.is_none() {
            if let Some(default) = &self.base_default {
                if *default != value {
                    debug!("overriding default {default} with {value}");
                }
            }
        }
        self.current = Some(Some(value));
    }

    /// Disables the symbol outright (`# CONFIG_X is not set`), bypassing
    /// the usual value-type checks a string/int/hex symbol would otherwise
    /// require.
    pub fn disable(&mut self) {
        self.current = Some(None);
    }

    /// String-only: concatenates whitespace-separated words, duplicates
    /// allowed (`CMDLINE="quiet"` + `append "panic=10"` → `"quiet panic=10"`).
    pub fn append_str(&mut self, word: &str) -> Result<(), DecisionError> {
        let base = self.current.take().flatten().or_else(|| self.base_default.clone());
        let mut text = match base {
            Some(Value::Str(s)) => s,
            None => String::new(),
            Some(_) => return Err(DecisionError::TypeMismatch),
        };
        if !text.is_empty() && !word.is_empty() {
            text.push(' ');
        }
        text.push_str(word);
        self.current = Some(Some(Value::Str(text)));
        Ok(())
    }

    /// String-only: whitespace-separated word *union* — words already
    /// present are not duplicated.
    pub fn add_str(&mut self, word: &str) -> Result<(), DecisionError> {
        let base = self.current.take().flatten().or_else(|| self.base_default.clone());
        let text = match base {
            Some(Value::Str(s)) => s,
            None => String::new(),
            Some(_) => return Err(DecisionError::TypeMismatch),
        };
        let mut words: Vec<&str> = text.split_whitespace().collect();
        if !words.contains(&word) {
            words.push(word);
        }
        self.current = Some(Some(Value::Str(words.join(" "))));
        Ok(())
    }

    /// Int/hex-only: arithmetic addition onto the existing (or default)
    /// value.
    pub fn add_num(&mut self, delta: i64) -> Result<(), DecisionError> {
        let base = self.current.take().flatten().or_else(|| self.base_default.clone());
        self.current = Some(Some(match base {
            Some(Value::Int(n)) => Value::Int(n + delta),
            Some(Value::Hex(n)) => Value::Hex((n as i64 + delta) as u64),
            None => Value::Int(delta),
            Some(_) => return Err(DecisionError::TypeMismatch),
        }));
        Ok(())
    }

    pub fn discard(&mut self) {
        self.current = None;
    }
}

/// Per-symbol decision, dispatched by the symbol's type at creation time
/// (mirrors the donor's per-type decision-class map, as a closed `match`
/// rather than a class registry — see DESIGN.md).
#[derive(Debug, Clone)]
pub enum Decision {
    RestrictionSet(RestrictionSetDecision),
    ScalarValue(ScalarValueDecision),
}

impl Decision {
    pub fn discard(&mut self) {
        match self {
            Decision::RestrictionSet(d) => d.discard(),
            Decision::ScalarValue(d) => d.discard(),
        }
    }

    pub fn is_decided(&self) -> bool {
        match self {
            Decision::RestrictionSet(d) => d.is_decided(),
            Decision::ScalarValue(d) => d.is_decided(),
        }
    }
}

pub fn want(values: impl IntoIterator<Item = Tristate>) -> ValueSet {
    value_set(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_decision_replaces_unrestricted() {
        let mut d = RestrictionSetDecision::new(Some(Tristate::No));
        d.restrict(want([Tristate::Mod, Tristate::Yes])).unwrap();
        assert_eq!(d.current(), Some(&want([Tristate::Mod, Tristate::Yes])));
    }

    #[test]
    fn subsequent_subset_further_restricts() {
        let mut d = RestrictionSetDecision::new(None);
        d.restrict(want([Tristate::Mod, Tristate::Yes])).unwrap();
        d.restrict(want([Tristate::Yes])).unwrap();
        assert_eq!(d.current(), Some(&want([Tristate::Yes])));
    }

    #[test]
    fn disjoint_request_is_conflict_and_keeps_previous() {
        let mut d = RestrictionSetDecision::new(None);
        d.restrict(want([Tristate::Yes])).unwrap();
        let err = d.restrict(want([Tristate::No])).unwrap_err();
        assert!(matches!(err, DecisionError::Conflict { .. }));
        assert_eq!(d.current(), Some(&want([Tristate::Yes])));
    }

    #[test]
    fn same_set_is_noop() {
        let mut d = RestrictionSetDecision::new(None);
        d.restrict(want([Tristate::Yes])).unwrap();
        d.restrict(want([Tristate::Yes])).unwrap();
        assert_eq!(d.current(), Some(&want([Tristate::Yes])));
    }

    #[test]
    fn string_append_concatenates_with_duplicates() {
        let mut d = ScalarValueDecision::new(Some(Value::Str("quiet".to_string())));
        d.append_str("panic=10").unwrap();
        assert_eq!(d.current(), Some(&Value::Str("quiet panic=10".to_string())));
        d.append_str("quiet").unwrap();
        assert_eq!(d.current(), Some(&Value::Str("quiet panic=10 quiet".to_string())));
    }

    #[test]
    fn string_add_is_word_union() {
        let mut d = ScalarValueDecision::new(Some(Value::Str("quiet".to_string())));
        d.add_str("quiet").unwrap();
        assert_eq!(d.current(), Some(&Value::Str("quiet".to_string())));
        d.add_str("panic=10").unwrap();
        assert_eq!(d.current(), Some(&Value::Str("quiet panic=10".to_string())));
    }

    #[test]
    fn int_add_accumulates_onto_default() {
        let mut d = ScalarValueDecision::new(Some(Value::Int(5)));
        d.add_num(3).unwrap();
        assert_eq!(d.current(), Some(&Value::Int(8)));
    }

    #[test]
    fn discard_forgets_decision() {
        let mut d = RestrictionSetDecision::new(None);
        d.restrict(want([Tristate::Yes])).unwrap();
        d.discard();
        assert!(d.current().is_none());
    }

    #[test]
    fn scalar_disable_is_decided_with_no_current_value() {
        let mut d = ScalarValueDecision::new(Some(Value::Str("quiet".to_string())));
        assert!(!d.is_decided());
        d.disable();
        assert!(d.is_decided());
        assert!(d.is_disabled());
        assert_eq!(d.current(), None);
    }
}
