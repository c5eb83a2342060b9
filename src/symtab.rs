//! Name → symbol mapping, plus the linking step that resolves name
//! references inside dependency expressions into dense [`SymbolId`]s.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::expr::{CmpOperand, Expr};
use crate::symbol::{unpack_value_str, Symbol, SymbolDefault, SymbolId, SymbolType, Value};
use crate::tristate::Tristate;

/// One symbol as handed over by the external Kconfig parser: a name
/// (absent for nameless/choice-group symbols, which are discarded), a type
/// tag, and dependency expressions whose leaves are still unresolved
/// `SymbolName`s rather than `SymbolRef`s.
///
/// This is the concrete shape of the "opaque symbol-view" the external
/// parser interface hands over: the parser has already walked its own
/// expression representation into ours, it just hasn't linked names yet.
#[derive(Debug, Clone)]
pub struct SymbolSpec {
    pub name: Option<String>,
    pub symbol_type: SymbolType,
    pub dir_dep: Option<Expr>,
    /// `(prompt text, visibility condition)` pairs; only the condition
    /// matters to the core, the prompt text is carried for diagnostics.
    pub prompts: Vec<(Option<String>, Expr)>,
    pub rev_dep: Option<Expr>,
    pub defaults: Vec<(Expr, Option<Expr>)>,
}

impl SymbolSpec {
    pub fn new(name: impl Into<String>, symbol_type: SymbolType) -> Self {
        SymbolSpec {
            name: Some(name.into()),
            symbol_type,
            dir_dep: None,
            prompts: Vec::new(),
            rev_dep: None,
            defaults: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SymbolTableError {
    #[error("symbol not found: {0}")]
    NotFound(String),
    #[error("second expansion pass still reports missing symbols: {0:?}")]
    LinkDidNotConverge(Vec<String>),
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    by_name: IndexMap<String, SymbolId>,
    symbols: Vec<Symbol>,
    linked: bool,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Normalizes a `.config`/DSL option reference to a bare symbol name:
    /// uppercase, `CONFIG_` prefix stripped.
    pub fn normalize_name(raw: &str) -> String {
        raw.trim_start_matches("CONFIG_").to_uppercase()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.as_raw() as usize]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.as_raw() as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(&Self::normalize_name(name)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Adds a symbol by type, returning its id. Re-adding an existing name
    /// returns the existing id (matches `symbols.py`'s dual-key lookup: a
    /// symbol table never holds two entries for the same name).
    pub fn add_symbol(&mut self, name: &str, symbol_type: SymbolType) -> SymbolId {
        let norm = Self::normalize_name(name);
        if let Some(&id) = self.by_name.get(&norm) {
            return id;
        }
        let id = SymbolId::from_raw(self.symbols.len() as u32);
        self.symbols.push(Symbol::new(id, norm.clone(), symbol_type));
        self.by_name.insert(norm, id);
        id
    }

    /// Imports symbols from the external parser. Nameless specs (choice
    /// groups, meta symbols) are silently discarded, matching
    /// `KconfigSymbols.add_symbol`'s non-empty-name requirement.
    pub fn import(&mut self, specs: impl IntoIterator<Item = SymbolSpec>) {
        self.linked = false;
        for spec in specs {
            let Some(name) = spec.name.as_ref() else {
                debug!("discarding nameless symbol (choice group or meta symbol)");
                continue;
            };
            let id = self.add_symbol(name, spec.symbol_type);
            let sym = self.get_mut(id);
            sym.dir_dep = spec.dir_dep.map(Box::new);
            sym.vis_deps = spec.prompts.into_iter().map(|(_, e)| Box::new(e)).collect();
            sym.rev_dep = spec.rev_dep.map(Box::new);
            sym.defaults = spec
                .defaults
                .into_iter()
                .map(|(value, condition)| SymbolDefault { value: Box::new(value), condition: condition.map(Box::new) })
                .collect();
        }
    }

    /// Resolves `SymbolName` leaves throughout every symbol's expressions
    /// into `SymbolRef`s, in two passes: expand once, default whatever is
    /// still unresolved (parsed as a literal if it looks like one, else
    /// tristate `n`, with a warning), then expand again and assert nothing
    /// remains unresolved. Mirrors `symbolgen.py`'s `_link_deps`.
    pub fn link(&mut self) -> Result<(), SymbolTableError> {
        let mut constants: HashMap<String, Value> = HashMap::new();
        constants.insert("n".to_string(), Value::Tristate(Tristate::No));
        constants.insert("m".to_string(), Value::Tristate(Tristate::Mod));
        constants.insert("y".to_string(), Value::Tristate(Tristate::Yes));

        let missing = self.expand_all(&constants);
        if !missing.is_empty() {
            info!("missing {} symbols, defaulting them", missing.len());
            for name in &missing {
                let value = Self::constify_missing_symbol(name);
                warn!("defaulting symbol {name} to {value}");
                constants.insert(name.clone(), Value::Tristate(value));
            }

            let still_missing = self.expand_all(&constants);
            if !still_missing.is_empty() {
                return Err(SymbolTableError::LinkDidNotConverge(still_missing.into_iter().collect()));
            }
        }

        for sym in &mut self.symbols {
            sym.dir_dep = sym.dir_dep.take().map(|e| Box::new(e.simplify()));
            sym.vis_deps = sym.vis_deps.drain(..).map(|e| Box::new(e.simplify())).collect();
            sym.rev_dep = sym.rev_dep.take().map(|e| Box::new(e.simplify()));
            for default in &mut sym.defaults {
                default.value = Box::new(default.value.simplify());
                default.condition = default.condition.take().map(|e| Box::new(e.simplify()));
            }
        }

        self.linked = true;
        Ok(())
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    fn constify_missing_symbol(name: &str) -> Tristate {
        Tristate::from_str_or_numeric(name)
    }

    fn expand_all(&mut self, constants: &HashMap<String, Value>) -> HashSet<String> {
        let mut missing = HashSet::new();
        for i in 0..self.symbols.len() {
            let dir_dep = self.symbols[i].dir_dep.take();
            self.symbols[i].dir_dep = dir_dep.map(|e| Box::new(self.expand(*e, constants, &mut missing)));

            let vis_deps = std::mem::take(&mut self.symbols[i].vis_deps);
            self.symbols[i].vis_deps =
                vis_deps.into_iter().map(|e| Box::new(self.expand(*e, constants, &mut missing))).collect();

            let rev_dep = self.symbols[i].rev_dep.take();
            self.symbols[i].rev_dep = rev_dep.map(|e| Box::new(self.expand(*e, constants, &mut missing)));

            let defaults = std::mem::take(&mut self.symbols[i].defaults);
            self.symbols[i].defaults = defaults
                .into_iter()
                .map(|d| SymbolDefault {
                    value: Box::new(self.expand(*d.value, constants, &mut missing)),
                    condition: d.condition.map(|c| Box::new(self.expand(*c, constants, &mut missing))),
                })
                .collect();
        }
        missing
    }

    fn expand(&self, expr: Expr, constants: &HashMap<String, Value>, missing: &mut HashSet<String>) -> Expr {
        match expr {
            Expr::SymbolName(name) => self.expand_name(&name, constants, missing),
            Expr::Const(v) => Expr::Const(v),
            Expr::SymbolRef(s) => Expr::SymbolRef(s),
            Expr::Not(e) => Expr::Not(Box::new(self.expand(*e, constants, missing))),
            Expr::And(list) => Expr::And(list.into_iter().map(|e| self.expand(e, constants, missing)).collect()),
            Expr::Or(list) => Expr::Or(list.into_iter().map(|e| self.expand(e, constants, missing)).collect()),
            Expr::Cmp(op, l, r) => Expr::Cmp(
                op,
                self.expand_operand(l, constants, missing),
                self.expand_operand(r, constants, missing),
            ),
        }
    }

    fn expand_operand(
        &self,
        operand: CmpOperand,
        constants: &HashMap<String, Value>,
        missing: &mut HashSet<String>,
    ) -> CmpOperand {
        match operand {
            CmpOperand::Name(name) => match self.expand_name(&name, constants, missing) {
                Expr::Const(v) => CmpOperand::Const(v),
                Expr::SymbolRef(s) => CmpOperand::Symbol(s),
                _ => CmpOperand::Name(name),
            },
            other => other,
        }
    }

    fn expand_name(&self, name: &str, constants: &HashMap<String, Value>, missing: &mut HashSet<String>) -> Expr {
        if let Some(v) = constants.get(name) {
            return Expr::Const(v.clone());
        }
        if let Some(id) = self.lookup(name) {
            return Expr::SymbolRef(id);
        }
        missing.insert(name.to_string());
        Expr::SymbolName(name.to_string())
    }
}

impl Tristate {
    /// Defaults a name that never resolved to a real symbol: parsed as the
    /// literal it looks like, else `n`. Grounded on
    /// `KconfigSymbolGenerator.constify_missing_symbol`.
    fn from_str_or_numeric(name: &str) -> Tristate {
        match unpack_value_str(name) {
            Ok(Value::Tristate(t)) => t,
            Ok(value) => value.as_tristate(),
            Err(_) => Tristate::No,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_discards_nameless_symbols() {
        let mut table = SymbolTable::new();
        let mut nameless = SymbolSpec::new("placeholder", SymbolType::Tristate);
        nameless.name = None;
        table.import([nameless]);
        assert!(table.is_empty());
    }

    #[test]
    fn normalize_strips_config_prefix_and_uppercases() {
        assert_eq!(SymbolTable::normalize_name("CONFIG_foo"), "FOO");
        assert_eq!(SymbolTable::normalize_name("bar"), "BAR");
    }

    #[test]
    fn link_resolves_symbol_names() {
        let mut table = SymbolTable::new();
        let mut a = SymbolSpec::new("A", SymbolType::Tristate);
        a.dir_dep = Some(Expr::SymbolName("B".to_string()));
        table.import([a, SymbolSpec::new("B", SymbolType::Tristate)]);
        table.link().unwrap();

        let a_id = table.lookup("A").unwrap();
        let b_id = table.lookup("B").unwrap();
        assert_eq!(*table.get(a_id).dir_dep.as_ref().unwrap().as_ref(), Expr::SymbolRef(b_id));
    }

    #[test]
    fn link_defaults_missing_names_with_warning() {
        let mut table = SymbolTable::new();
        let mut a = SymbolSpec::new("A", SymbolType::Tristate);
        a.dir_dep = Some(Expr::SymbolName("GHOST".to_string()));
        table.import([a]);
        table.link().unwrap();

        let a_id = table.lookup("A").unwrap();
        assert_eq!(*table.get(a_id).dir_dep.as_ref().unwrap().as_ref(), Expr::Const(Value::Tristate(Tristate::No)));
    }
}
