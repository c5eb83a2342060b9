//! Imports Kconfig symbols from the external parser's JSON symbol-view
//! format (§6 "Symbol-parser interface"). The JSON expression shape is a
//! flat `{kind: "..", ...}` record the caller recursively walks into
//! `crate::expr::Expr`, mirroring the donor's own flattened
//! `kconfig_types::Expr`/`Menu`/`Property` JSON shape (a `type`-tagged
//! struct matched by hand) rather than a tagged serde enum — see
//! DESIGN.md.

use serde::Deserialize;

use crate::expr::{CmpOp, CmpOperand, Expr};
use crate::symbol::{unpack_value_str, SymbolType, Value};
use crate::symtab::{SymbolSpec, SymbolTable};
use crate::tristate::Tristate;

#[derive(Debug, thiserror::Error)]
pub enum SymbolViewError {
    #[error("unknown expression kind: {0:?}")]
    UnknownExprKind(String),
    #[error("unknown comparison operator: {0:?}")]
    UnknownCmpOp(String),
    #[error("symbol {1:?}: unknown type {0:?}")]
    UnknownSymbolType(String, String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One expression node as handed over by the external parser. Leaves are
/// `const`/`symbol` kinds; `cmp` carries `left`/`right` as further
/// `ExprView`s of those two leaf kinds (the wire format never nests a
/// boolean subexpression inside a comparison, matching §3's `Cmp` shape).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExprView {
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default)]
    pub left: Option<Box<ExprView>>,
    #[serde(default)]
    pub right: Option<Box<ExprView>>,
    #[serde(default)]
    pub operands: Option<Vec<ExprView>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptView {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub visible: Option<ExprView>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultView {
    pub value: ExprView,
    #[serde(default)]
    pub condition: Option<ExprView>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolView {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub dir_dep: Option<ExprView>,
    #[serde(default)]
    pub prompts: Vec<PromptView>,
    #[serde(default)]
    pub rev_dep: Option<ExprView>,
    #[serde(default)]
    pub defaults: Vec<DefaultView>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolTableView {
    pub symbols: Vec<SymbolView>,
}

/// Parses the external parser's JSON symbol dump.
pub fn parse_symbol_table_json(text: &str) -> Result<SymbolTableView, SymbolViewError> {
    Ok(serde_json::from_str(text)?)
}

impl ExprView {
    fn into_expr(self) -> Result<Expr, SymbolViewError> {
        match self.kind.as_str() {
            "const" => {
                let raw = self.value.unwrap_or_default();
                let value = unpack_value_str(&raw).unwrap_or(Value::Tristate(Tristate::No));
                Ok(Expr::Const(value))
            }
            "symbol" => Ok(Expr::SymbolName(self.name.unwrap_or_default())),
            "not" => {
                let inner = self.left.ok_or_else(|| SymbolViewError::UnknownExprKind("not (missing left)".to_string()))?;
                Ok(Expr::Not(Box::new(inner.into_expr()?)))
            }
            "and" => {
                let operands = self.operands.unwrap_or_default();
                let exprs = operands.into_iter().map(ExprView::into_expr).collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::And(exprs))
            }
            "or" => {
                let operands = self.operands.unwrap_or_default();
                let exprs = operands.into_iter().map(ExprView::into_expr).collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Or(exprs))
            }
            "cmp" => {
                let op = Self::parse_cmp_op(self.op.as_deref())?;
                let left = self.left.ok_or_else(|| SymbolViewError::UnknownExprKind("cmp (missing left)".to_string()))?;
                let right = self.right.ok_or_else(|| SymbolViewError::UnknownExprKind("cmp (missing right)".to_string()))?;
                Ok(Expr::Cmp(op, left.into_operand()?, right.into_operand()?))
            }
            other => Err(SymbolViewError::UnknownExprKind(other.to_string())),
        }
    }

    fn into_operand(self) -> Result<CmpOperand, SymbolViewError> {
        match self.kind.as_str() {
            "const" => {
                let raw = self.value.unwrap_or_default();
                let value = unpack_value_str(&raw).unwrap_or(Value::Tristate(Tristate::No));
                Ok(CmpOperand::Const(value))
            }
            "symbol" => Ok(CmpOperand::Name(self.name.unwrap_or_default())),
            other => Err(SymbolViewError::UnknownExprKind(other.to_string())),
        }
    }

    fn parse_cmp_op(op: Option<&str>) -> Result<CmpOp, SymbolViewError> {
        match op {
            Some("=") => Ok(CmpOp::Eq),
            Some("!=") => Ok(CmpOp::Ne),
            Some("<") => Ok(CmpOp::Lt),
            Some("<=") => Ok(CmpOp::Le),
            Some(">") => Ok(CmpOp::Gt),
            Some(">=") => Ok(CmpOp::Ge),
            other => Err(SymbolViewError::UnknownCmpOp(other.unwrap_or("").to_string())),
        }
    }
}

/// Converts a parsed symbol-view table into [`SymbolSpec`]s and imports
/// them into `table`. Linking (name → `SymbolId` resolution) is a separate
/// step (`SymbolTable::link`), run once every symbol view in a batch has
/// been imported.
pub fn import_into(table: &mut SymbolTable, view: SymbolTableView) -> Result<(), SymbolViewError> {
    let mut specs = Vec::with_capacity(view.symbols.len());
    for sym in view.symbols {
        let symbol_type = match &sym.name {
            None => SymbolType::Undef,
            Some(name) => sym
                .typ
                .parse::<SymbolType>()
                .map_err(|_| SymbolViewError::UnknownSymbolType(sym.typ.clone(), name.clone()))?,
        };

        let mut spec = SymbolSpec { name: sym.name, symbol_type, dir_dep: None, prompts: Vec::new(), rev_dep: None, defaults: Vec::new() };
        if let Some(dir_dep) = sym.dir_dep {
            spec.dir_dep = Some(dir_dep.into_expr()?);
        }
        for prompt in sym.prompts {
            let visible = match prompt.visible {
                Some(e) => e.into_expr()?,
                None => Expr::Const(Value::Tristate(Tristate::Yes)),
            };
            spec.prompts.push((prompt.text, visible));
        }
        if let Some(rev_dep) = sym.rev_dep {
            spec.rev_dep = Some(rev_dep.into_expr()?);
        }
        for default in sym.defaults {
            let value = default.value.into_expr()?;
            let condition = default.condition.map(ExprView::into_expr).transpose()?;
            spec.defaults.push((value, condition));
        }
        specs.push(spec);
    }
    table.import(specs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_a_simple_dependent_symbol() {
        let json = r#"{
            "symbols": [
                {"name": "A", "type": "tristate", "dir_dep": {"kind": "symbol", "name": "B"}},
                {"name": "B", "type": "tristate"}
            ]
        }"#;
        let view = parse_symbol_table_json(json).unwrap();
        let mut table = SymbolTable::new();
        import_into(&mut table, view).unwrap();
        table.link().unwrap();

        let a = table.lookup("A").unwrap();
        let b = table.lookup("B").unwrap();
        assert_eq!(*table.get(a).dir_dep.as_ref().unwrap().as_ref(), Expr::SymbolRef(b));
    }

    #[test]
    fn nameless_symbol_is_discarded_like_a_choice_group() {
        let json = r#"{"symbols": [{"name": null, "type": "tristate"}]}"#;
        let view = parse_symbol_table_json(json).unwrap();
        let mut table = SymbolTable::new();
        import_into(&mut table, view).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn and_or_not_and_cmp_round_trip() {
        let json = r#"{
            "symbols": [{
                "name": "A",
                "type": "tristate",
                "dir_dep": {
                    "kind": "and",
                    "operands": [
                        {"kind": "not", "left": {"kind": "symbol", "name": "B"}},
                        {"kind": "or", "operands": [
                            {"kind": "symbol", "name": "C"},
                            {"kind": "cmp", "op": ">=", "left": {"kind": "symbol", "name": "D"}, "right": {"kind": "const", "value": "1"}}
                        ]}
                    ]
                }
            }, {"name": "B", "type": "tristate"}, {"name": "C", "type": "tristate"}, {"name": "D", "type": "int"}]
        }"#;
        let view = parse_symbol_table_json(json).unwrap();
        let mut table = SymbolTable::new();
        import_into(&mut table, view).unwrap();
        table.link().unwrap();

        let a = table.lookup("A").unwrap();
        assert!(matches!(table.get(a).dir_dep.as_ref().unwrap().as_ref(), Expr::And(_)));
    }

    #[test]
    fn unknown_symbol_type_errors() {
        let json = r#"{"symbols": [{"name": "A", "type": "quantum"}]}"#;
        let view = parse_symbol_table_json(json).unwrap();
        let mut table = SymbolTable::new();
        let err = import_into(&mut table, view).unwrap_err();
        assert!(matches!(err, SymbolViewError::UnknownSymbolType(..)));
    }
}
