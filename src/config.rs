//! `.config` file reading and writing: the insertion-ordered map from
//! symbol to value, and the line format the kernel's own tooling expects.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::symbol::{escape_value, unpack_value_str, Symbol, SymbolType, UnpackValueError, Value};
use crate::symtab::SymbolTable;

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("line {line}: not a recognized .config line: {text:?}")]
    Unrecognized { line: usize, text: String },
    #[error("line {line}: invalid value {value:?} for {symbol_type} symbol {name}")]
    InvalidValue { line: usize, name: String, symbol_type: SymbolType, value: String },
}

/// Current configuration state: an insertion-ordered symbol → value map,
/// mirroring the `.config` file's own line order so round-tripping doesn't
/// needlessly reshuffle untouched options.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    values: IndexMap<crate::symbol::SymbolId, Option<Value>>,
}

impl ConfigMap {
    pub fn new() -> Self {
        ConfigMap::default()
    }

    pub fn get(&self, sym: crate::symbol::SymbolId) -> Option<&Value> {
        self.values.get(&sym).and_then(|v| v.as_ref())
    }

    /// `None` means "explicitly disabled" (`# OPTION is not set`), distinct
    /// from the symbol never having appeared at all.
    pub fn set(&mut self, sym: crate::symbol::SymbolId, value: Option<Value>) {
        self.values.insert(sym, value);
    }

    pub fn contains(&self, sym: crate::symbol::SymbolId) -> bool {
        self.values.contains_key(&sym)
    }

    pub fn iter(&self) -> impl Iterator<Item = (crate::symbol::SymbolId, Option<&Value>)> {
        self.values.iter().map(|(&s, v)| (s, v.as_ref()))
    }

    /// Parses `.config` text, adding unknown options as new undef-typed
    /// symbols (with a warning) rather than rejecting the file, matching
    /// the lenient reader behavior for unrecognized options.
    pub fn read_str(table: &mut SymbolTable, text: &str) -> Result<ConfigMap, ConfigFileError> {
        let mut map = ConfigMap::new();
        for (i, raw_line) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw_line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('#') {
                let rest = rest.trim();
                if let Some(option) = rest.strip_suffix("is not set").map(str::trim_end) {
                    let name = option.trim();
                    let sym = Self::resolve_or_add(table, name, None);
                    map.set(sym, None);
                } // else: a plain comment line, ignored
                continue;
            }

            match trimmed.split_once('=') {
                Some((option, raw_value)) if !option.is_empty() => {
                    let value = unpack_value_str(raw_value).map_err(|e| match e {
                        UnpackValueError::Empty | UnpackValueError::Unrecognized(_) => ConfigFileError::InvalidValue {
                            line,
                            name: option.to_string(),
                            symbol_type: SymbolType::Undef,
                            value: raw_value.to_string(),
                        },
                    })?;
                    let sym = Self::resolve_or_add(table, option, Some(&value));
                    let symbol_type = table.get(sym).symbol_type;
                    if symbol_type != SymbolType::Undef && !Self::matches_type(symbol_type, &value) {
                        return Err(ConfigFileError::InvalidValue {
                            line,
                            name: option.to_string(),
                            symbol_type,
                            value: raw_value.to_string(),
                        });
                    }
                    map.set(sym, Some(value));
                }
                _ => {
                    return Err(ConfigFileError::Unrecognized { line, text: trimmed.to_string() });
                }
            }
        }
        Ok(map)
    }

    fn matches_type(symbol_type: SymbolType, value: &Value) -> bool {
        matches!(
            (symbol_type, value),
            (SymbolType::Tristate | SymbolType::Boolean, Value::Tristate(_))
                | (SymbolType::String, Value::Str(_))
                | (SymbolType::Int, Value::Int(_))
                | (SymbolType::Hex, Value::Hex(_))
        )
    }

    fn resolve_or_add(table: &mut SymbolTable, option: &str, value: Option<&Value>) -> crate::symbol::SymbolId {
        let name = SymbolTable::normalize_name(option);
        if let Some(id) = table.lookup(&name) {
            return id;
        }
        let symbol_type = match value {
            None => SymbolType::Undef,
            Some(Value::Tristate(_)) => SymbolType::Tristate,
            Some(Value::Str(_)) => SymbolType::String,
            Some(Value::Int(_)) => SymbolType::Int,
            Some(Value::Hex(_)) => SymbolType::Hex,
        };
        log::warn!("adding unknown symbol {name} as a new {symbol_type} symbol");
        table.add_symbol(&name, symbol_type)
    }

    /// Renders the current state as `.config` text: `CONFIG_X=value` or
    /// `# CONFIG_X is not set`, in the map's insertion order.
    pub fn write_str(&self, table: &SymbolTable) -> String {
        let mut out = String::new();
        for (sym, value) in self.iter() {
            let symbol = table.get(sym);
            write_line(&mut out, symbol, value);
        }
        out
    }
}

fn write_line(out: &mut String, symbol: &Symbol, value: Option<&Value>) {
    match value {
        None => {
            let _ = writeln!(out, "# CONFIG_{} is not set", symbol.name);
        }
        Some(Value::Tristate(t)) => {
            let _ = writeln!(out, "CONFIG_{}={}", symbol.name, format_plain_tristate(*t));
        }
        Some(Value::Str(s)) => {
            let _ = writeln!(out, "CONFIG_{}=\"{}\"", symbol.name, escape_value(s));
        }
        Some(Value::Int(n)) => {
            let _ = writeln!(out, "CONFIG_{}={}", symbol.name, n);
        }
        Some(Value::Hex(n)) => {
            let _ = writeln!(out, "CONFIG_{}={:#x}", symbol.name, n);
        }
    }
}

fn format_plain_tristate(t: crate::tristate::Tristate) -> &'static str {
    match t {
        crate::tristate::Tristate::No => "n",
        crate::tristate::Tristate::Mod => "m",
        crate::tristate::Tristate::Yes => "y",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tristate::Tristate;

    fn table_with(name: &str, symbol_type: SymbolType) -> SymbolTable {
        let mut table = SymbolTable::new();
        table.add_symbol(name, symbol_type);
        table
    }

    #[test]
    fn parses_set_and_unset_lines() {
        let mut table = table_with("FOO", SymbolType::Tristate);
        table.add_symbol("BAR", SymbolType::Tristate);
        let text = "CONFIG_FOO=y\n# CONFIG_BAR is not set\n# a comment\n";
        let map = ConfigMap::read_str(&mut table, text).unwrap();

        let foo = table.lookup("FOO").unwrap();
        let bar = table.lookup("BAR").unwrap();
        assert_eq!(map.get(foo), Some(&Value::Tristate(Tristate::Yes)));
        assert_eq!(map.get(bar), None);
        assert!(map.contains(bar));
    }

    #[test]
    fn unknown_option_is_added_with_warning() {
        let mut table = SymbolTable::new();
        let map = ConfigMap::read_str(&mut table, "CONFIG_NEW=42\n").unwrap();
        let id = table.lookup("NEW").unwrap();
        assert_eq!(table.get(id).symbol_type, SymbolType::Int);
        assert_eq!(map.get(id), Some(&Value::Int(42)));
    }

    #[test]
    fn bad_value_for_known_symbol_type_errors() {
        let mut table = table_with("FOO", SymbolType::Int);
        let err = ConfigMap::read_str(&mut table, "CONFIG_FOO=y\n");
        assert!(matches!(err, Err(ConfigFileError::InvalidValue { .. })));
    }

    #[test]
    fn round_trips_through_write_str() {
        let mut table = table_with("FOO", SymbolType::String);
        let mut map = ConfigMap::new();
        let id = table.lookup("FOO").unwrap();
        map.set(id, Some(Value::Str("quiet#panic".to_string())));
        let text = map.write_str(&table);
        assert_eq!(text, "CONFIG_FOO=\"quiet\\#panic\"\n");

        let mut table2 = table_with("FOO", SymbolType::String);
        let reparsed = ConfigMap::read_str(&mut table2, &text).unwrap();
        let id2 = table2.lookup("FOO").unwrap();
        assert_eq!(reparsed.get(id2), Some(&Value::Str("quiet#panic".to_string())));
    }
}
