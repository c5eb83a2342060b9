//! `ConfigChoices`: the single entry point directives act through. Owns the
//! per-symbol decision map and the `commit()` driver that hands everything
//! to the resolver (§4.5, §4.6).

use std::collections::HashMap;

use log::{error, warn};

use crate::config::ConfigMap;
use crate::decision::{Decision, DecisionError, RestrictionSetDecision, ScalarValueDecision};
use crate::graph::{ConfigGraph, ResolveError};
use crate::solcache::value_set;
use crate::symbol::{unpack_value_str, Symbol, SymbolId, SymbolType, UnpackValueError, Value};
use crate::symtab::SymbolTable;
use crate::tristate::Tristate;

#[derive(Debug, thiserror::Error)]
pub enum ChoicesError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("{operation} is not supported for {symbol} ({symbol_type})")]
    TypeMismatch { operation: &'static str, symbol: String, symbol_type: SymbolType },
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    Value(#[from] UnpackValueError),
}

pub struct ConfigChoices<'a> {
    table: &'a mut SymbolTable,
    base: &'a ConfigMap,
    decisions: HashMap<SymbolId, Decision>,
}

impl<'a> ConfigChoices<'a> {
    pub fn new(table: &'a mut SymbolTable, base: &'a ConfigMap) -> Self {
        ConfigChoices { table, base, decisions: HashMap::new() }
    }

    pub fn decisions(&self) -> &HashMap<SymbolId, Decision> {
        &self.decisions
    }

    fn resolve_symbol(&self, name: &str) -> Result<(SymbolId, SymbolType), ChoicesError> {
        self.table.lookup(name).map(|id| (id, self.table.get(id).symbol_type)).ok_or_else(|| {
            ChoicesError::UnknownSymbol(SymbolTable::normalize_name(name))
        })
    }

    fn base_tristate(&self, id: SymbolId) -> Option<Tristate> {
        self.base.get(id).map(Value::as_tristate)
    }

    fn base_value(&self, id: SymbolId) -> Option<Value> {
        self.base.get(id).cloned()
    }

    fn restriction_decision(&mut self, id: SymbolId) -> &mut RestrictionSetDecision {
        let default = self.base_tristate(id);
        match self.decisions.entry(id).or_insert_with(|| Decision::RestrictionSet(RestrictionSetDecision::new(default))) {
            Decision::RestrictionSet(d) => d,
            Decision::ScalarValue(_) => unreachable!("decision shape fixed at creation"),
        }
    }

    fn scalar_decision(&mut self, id: SymbolId) -> &mut ScalarValueDecision {
        let default = self.base_value(id);
        match self.decisions.entry(id).or_insert_with(|| Decision::ScalarValue(ScalarValueDecision::new(default))) {
            Decision::ScalarValue(d) => d,
            Decision::RestrictionSet(_) => unreachable!("decision shape fixed at creation"),
        }
    }

    fn restrict(&mut self, name: &str, operation: &'static str, values: crate::solcache::ValueSet) -> Result<bool, ChoicesError> {
        let (id, symbol_type) = self.resolve_symbol(name)?;
        if !symbol_type.is_tristate_like() {
            return Err(ChoicesError::TypeMismatch { operation, symbol: name.to_string(), symbol_type });
        }
        match self.restriction_decision(id).restrict(values) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("{operation} {name}: {e}");
                Ok(false)
            }
        }
    }

    /// Disables `name` outright: `n` for a tristate/boolean symbol, `#
    /// CONFIG_X is not set` for a string/int/hex symbol. Unlike `set`, a
    /// scalar symbol's usual value-type check is bypassed here, so disabling
    /// never fails with a type mismatch.
    pub fn option_disable(&mut self, name: &str) -> bool {
        let (id, symbol_type) = match self.resolve_symbol(name) {
            Ok(v) => v,
            Err(e) => {
                error!("disable {name}: {e}");
                return false;
            }
        };
        if symbol_type.is_tristate_like() {
            return self.dispatch_restrict(name, "disable", value_set([Tristate::No]));
        }
        self.scalar_decision(id).disable();
        true
    }

    pub fn option_module(&mut self, name: &str) -> bool {
        self.dispatch_module(name)
    }

    pub fn option_builtin(&mut self, name: &str) -> bool {
        self.dispatch_restrict(name, "builtin", value_set([Tristate::Yes]))
    }

    pub fn option_builtin_or_module(&mut self, name: &str) -> bool {
        self.dispatch_restrict(name, "builtin-or-module", value_set([Tristate::Mod, Tristate::Yes]))
    }

    fn dispatch_module(&mut self, name: &str) -> bool {
        match self.resolve_symbol(name) {
            Ok((_, SymbolType::Boolean)) => {
                error!("module {name}: not supported for boolean symbols");
                false
            }
            Ok(_) => self.dispatch_restrict(name, "module", value_set([Tristate::Mod])),
            Err(e) => {
                error!("module {name}: {e}");
                false
            }
        }
    }

    fn dispatch_restrict(&mut self, name: &str, operation: &'static str, values: crate::solcache::ValueSet) -> bool {
        match self.restrict(name, operation, values) {
            Ok(ok) => ok,
            Err(e) => {
                error!("{operation} {name}: {e}");
                false
            }
        }
    }

    pub fn option_set_to(&mut self, name: &str, raw_value: &str) -> bool {
        let (id, symbol_type) = match self.resolve_symbol(name) {
            Ok(v) => v,
            Err(e) => {
                error!("set {name}: {e}");
                return false;
            }
        };
        if symbol_type.is_tristate_like() {
            let value = match raw_value.parse::<Tristate>() {
                Ok(t) => t,
                Err(()) => {
                    error!("set {name}: {raw_value:?} is not a valid tristate value");
                    return false;
                }
            };
            return self.dispatch_restrict(name, "set", value_set([value]));
        }
        let value = match unpack_value_str(raw_value) {
            Ok(v) => v,
            Err(e) => {
                error!("set {name}: {e}");
                return false;
            }
        };
        if !Self::value_matches_type(symbol_type, &value) {
            error!("set {name}: value {raw_value:?} does not match symbol type {symbol_type}");
            return false;
        }
        self.scalar_decision(id).set_to(value);
        true
    }

    pub fn option_append(&mut self, name: &str, word: &str) -> bool {
        let (id, symbol_type) = match self.resolve_symbol(name) {
            Ok(v) => v,
            Err(e) => {
                error!("append {name}: {e}");
                return false;
            }
        };
        if symbol_type != SymbolType::String {
            error!("append {name}: not supported for {symbol_type} symbols");
            return false;
        }
        match self.scalar_decision(id).append_str(word) {
            Ok(()) => true,
            Err(e) => {
                error!("append {name}: {e}");
                false
            }
        }
    }

    pub fn option_add(&mut self, name: &str, raw_value: &str) -> bool {
        let (id, symbol_type) = match self.resolve_symbol(name) {
            Ok(v) => v,
            Err(e) => {
                error!("add {name}: {e}");
                return false;
            }
        };
        match symbol_type {
            SymbolType::String => match self.scalar_decision(id).add_str(raw_value) {
                Ok(()) => true,
                Err(e) => {
                    error!("add {name}: {e}");
                    false
                }
            },
            SymbolType::Int | SymbolType::Hex => {
                let delta = match raw_value.parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => {
                        error!("add {name}: {raw_value:?} is not an integer");
                        return false;
                    }
                };
                match self.scalar_decision(id).add_num(delta) {
                    Ok(()) => true,
                    Err(e) => {
                        error!("add {name}: {e}");
                        false
                    }
                }
            }
            _ => {
                error!("add {name}: not supported for {symbol_type} symbols");
                false
            }
        }
    }

    /// Forgets any decision made for `name`, as if it had never been
    /// requested.
    pub fn discard(&mut self, name: &str) -> bool {
        match self.resolve_symbol(name) {
            Ok((id, _)) => {
                if let Some(d) = self.decisions.get_mut(&id) {
                    d.discard();
                }
                true
            }
            Err(e) => {
                error!("discard {name}: {e}");
                false
            }
        }
    }

    fn value_matches_type(symbol_type: SymbolType, value: &Value) -> bool {
        matches!(
            (symbol_type, value),
            (SymbolType::String, Value::Str(_)) | (SymbolType::Int, Value::Int(_)) | (SymbolType::Hex, Value::Hex(_))
        )
    }

    /// Computes the new configuration from every accumulated decision,
    /// without swapping it into `base` (the original's `resolve`/`commit`
    /// split — see DESIGN.md).
    pub fn resolve(&self) -> Result<ConfigMap, ResolveError> {
        let mut graph = ConfigGraph::build(self.table, self.base, &self.decisions);
        graph.resolve()?;
        let mut out = self.base.clone();
        for (sym, value) in graph.iter_update_config() {
            out.set(sym, value);
        }
        Ok(out)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.table.get(id)
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.table.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::symtab::SymbolSpec;

    fn tristate_table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.import([SymbolSpec::new("A", SymbolType::Tristate)]);
        table.link().unwrap();
        table
    }

    #[test]
    fn trivial_enable_prefers_module() {
        let mut table = tristate_table();
        let base = ConfigMap::new();
        let mut choices = ConfigChoices::new(&mut table, &base);
        assert!(choices.option_builtin_or_module("A"));
        let resolved = choices.resolve().unwrap();
        let id = choices.table.lookup("A").unwrap();
        assert_eq!(resolved.get(id), Some(&Value::Tristate(Tristate::Mod)));
    }

    #[test]
    fn module_on_boolean_is_refused() {
        let mut table = SymbolTable::new();
        table.import([SymbolSpec::new("B", SymbolType::Boolean)]);
        table.link().unwrap();
        let base = ConfigMap::new();
        let mut choices = ConfigChoices::new(&mut table, &base);
        assert!(!choices.option_module("B"));
    }

    #[test]
    fn enable_requires_dependency() {
        let mut table = SymbolTable::new();
        let mut a = SymbolSpec::new("A", SymbolType::Tristate);
        a.dir_dep = Some(Expr::SymbolName("B".to_string()));
        table.import([a, SymbolSpec::new("B", SymbolType::Tristate)]);
        table.link().unwrap();

        let base = ConfigMap::new();
        let mut choices = ConfigChoices::new(&mut table, &base);
        assert!(choices.option_builtin_or_module("A"));
        let resolved = choices.resolve().unwrap();

        let a_id = choices.table.lookup("A").unwrap();
        let b_id = choices.table.lookup("B").unwrap();
        assert_eq!(resolved.get(a_id), Some(&Value::Tristate(Tristate::Mod)));
        assert_eq!(resolved.get(b_id), Some(&Value::Tristate(Tristate::Mod)));
    }

    #[test]
    fn conflicting_directives_keep_first_decision() {
        let mut table = tristate_table();
        let mut base = ConfigMap::new();
        let a_id = table.lookup("A").unwrap();
        base.set(a_id, Some(Value::Tristate(Tristate::Yes)));

        let mut choices = ConfigChoices::new(&mut table, &base);
        assert!(choices.option_disable("A"));
        assert!(!choices.option_builtin("A"));
        let resolved = choices.resolve().unwrap();
        assert_eq!(resolved.get(a_id), Some(&Value::Tristate(Tristate::No)));
    }

    #[test]
    fn unknown_symbol_is_refused_not_fatal() {
        let mut table = tristate_table();
        let base = ConfigMap::new();
        let mut choices = ConfigChoices::new(&mut table, &base);
        assert!(!choices.option_disable("GHOST"));
    }

    #[test]
    fn disable_bypasses_the_value_type_check_for_scalar_symbols() {
        let mut table = SymbolTable::new();
        table.import([SymbolSpec::new("CMDLINE", SymbolType::String), SymbolSpec::new("HZ", SymbolType::Int)]);
        table.link().unwrap();
        let mut base = ConfigMap::new();
        let cmdline_id = table.lookup("CMDLINE").unwrap();
        let hz_id = table.lookup("HZ").unwrap();
        base.set(cmdline_id, Some(Value::Str("quiet".to_string())));
        base.set(hz_id, Some(Value::Int(100)));

        let mut choices = ConfigChoices::new(&mut table, &base);
        assert!(choices.option_disable("CMDLINE"));
        assert!(choices.option_disable("HZ"));

        let resolved = choices.resolve().unwrap();
        assert_eq!(resolved.get(cmdline_id), None);
        assert_eq!(resolved.get(hz_id), None);
    }
}
