//! Typed Kconfig symbols: tristate, boolean, string, int, hex, and the
//! placeholder type used for names referenced but never defined.

use std::fmt;

use crate::expr::ExprRef;
use crate::tristate::Tristate;

/// Dense integer handle into a [`crate::symtab::SymbolTable`].
///
/// Symbols are identified by these small `Copy` ids rather than by name or
/// pointer once linked, so expressions, decisions and solution caches can
/// all key off a cheap, totally-ordered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn from_raw(n: u32) -> Self {
        SymbolId(n)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of symbol value types. Dispatch on type is a `match`
/// rather than virtual dispatch, since the set is fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolType {
    Tristate,
    Boolean,
    String,
    Int,
    Hex,
    /// A name referenced (e.g. in an expression) that was never defined by
    /// the external parser. Defaulted per §6's "Symbol-parser interface".
    Undef,
}

impl SymbolType {
    /// Whether a dependency-evaluation result of `m` must be reinterpreted
    /// as `y` for this type, because the type itself cannot be modular.
    pub fn reinterprets_mod_as_yes(self) -> bool {
        !matches!(self, SymbolType::Tristate)
    }

    pub fn reinterpret_dep_value(self, value: Tristate) -> Tristate {
        if self.reinterprets_mod_as_yes() && value == Tristate::Mod {
            Tristate::Yes
        } else {
            value
        }
    }

    pub fn is_tristate_like(self) -> bool {
        matches!(self, SymbolType::Tristate | SymbolType::Boolean)
    }
}

/// A concrete value a symbol can hold, independent of its static type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Tristate(Tristate),
    Str(String),
    Int(i64),
    Hex(u64),
}

impl Value {
    /// Python-style truthiness, used when a value needs to be reinterpreted
    /// as a tristate inside an expression (`Const` folding, symbol refs to
    /// non-tristate symbols used in boolean position).
    pub fn as_tristate(&self) -> Tristate {
        match self {
            Value::Tristate(t) => *t,
            Value::Str(s) => Tristate::from(!s.is_empty()),
            Value::Int(n) => Tristate::from(*n != 0),
            Value::Hex(n) => Tristate::from(*n != 0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Tristate(t) => write!(f, "{t}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Hex(n) => write!(f, "{n:#x}"),
        }
    }
}

/// One `(value-expr, condition)` default entry: the value applies when
/// `condition` (or unconditionally, if `None`) evaluates true.
#[derive(Debug, Clone)]
pub struct SymbolDefault {
    pub value: ExprRef,
    pub condition: Option<ExprRef>,
}

/// A linked Kconfig symbol: immutable type, dependency expressions resolved
/// to symbol ids rather than bare names.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub symbol_type: SymbolType,
    pub dir_dep: Option<ExprRef>,
    /// OR-merge of every prompt's visibility condition; `None` means
    /// "always visible" (equivalent to a single `y` entry).
    pub vis_deps: Vec<ExprRef>,
    pub rev_dep: Option<ExprRef>,
    pub defaults: Vec<SymbolDefault>,
}

impl Symbol {
    pub fn new(id: SymbolId, name: String, symbol_type: SymbolType) -> Self {
        Symbol {
            id,
            name,
            symbol_type,
            dir_dep: None,
            vis_deps: Vec::new(),
            rev_dep: None,
            defaults: Vec::new(),
        }
    }
}

/// Escapes `#` in a string symbol's value for `.config` output, matching
/// the kernel's own Makefile-variable escaping (the only special char).
pub fn escape_value(raw: &str) -> String {
    raw.replace('#', "\\#")
}

/// Reverses [`escape_value`].
pub fn unescape_value(raw: &str) -> String {
    raw.replace("\\#", "#")
}

/// Detects the value type of a bare token the way the `.config` reader and
/// directive DSL do: tristate keyword, quoted string, decimal int, hex int.
pub fn unpack_value_str(input: &str) -> Result<Value, UnpackValueError> {
    if input.is_empty() {
        return Err(UnpackValueError::Empty);
    }
    match input {
        "n" => return Ok(Value::Tristate(Tristate::No)),
        "m" => return Ok(Value::Tristate(Tristate::Mod)),
        "y" => return Ok(Value::Tristate(Tristate::Yes)),
        _ => {}
    }

    let bytes = input.as_bytes();
    if bytes.len() > 1 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[0] == bytes[bytes.len() - 1]
    {
        return Ok(Value::Str(unescape_value(&input[1..input.len() - 1])));
    }

    if let Ok(n) = input.parse::<i64>() {
        return Ok(Value::Int(n));
    }

    let hex_digits = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")).unwrap_or(input);
    if let Ok(n) = u64::from_str_radix(hex_digits, 16) {
        return Ok(Value::Hex(n));
    }

    Err(UnpackValueError::Unrecognized(input.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum UnpackValueError {
    #[error("empty value")]
    Empty,
    #[error("unrecognized value: {0:?}")]
    Unrecognized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_reinterpreted_to_yes_for_non_tristate() {
        assert_eq!(SymbolType::Boolean.reinterpret_dep_value(Tristate::Mod), Tristate::Yes);
        assert_eq!(SymbolType::String.reinterpret_dep_value(Tristate::Mod), Tristate::Yes);
        assert_eq!(SymbolType::Tristate.reinterpret_dep_value(Tristate::Mod), Tristate::Mod);
    }

    #[test]
    fn unpack_tristate() {
        assert_eq!(unpack_value_str("y").unwrap(), Value::Tristate(Tristate::Yes));
        assert_eq!(unpack_value_str("m").unwrap(), Value::Tristate(Tristate::Mod));
        assert_eq!(unpack_value_str("n").unwrap(), Value::Tristate(Tristate::No));
    }

    #[test]
    fn unpack_quoted_string_with_escape() {
        assert_eq!(
            unpack_value_str("\"quiet\\#panic\"").unwrap(),
            Value::Str("quiet#panic".to_string())
        );
    }

    #[test]
    fn unpack_decimal_then_hex() {
        assert_eq!(unpack_value_str("42").unwrap(), Value::Int(42));
        assert_eq!(unpack_value_str("0x2a").unwrap(), Value::Hex(0x2a));
        assert_eq!(unpack_value_str("ff").unwrap(), Value::Hex(0xff));
    }

    #[test]
    fn unpack_rejects_garbage() {
        assert!(unpack_value_str("").is_err());
        assert!(unpack_value_str("\"unterminated").is_err());
    }
}
