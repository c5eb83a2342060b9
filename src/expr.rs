//! Kconfig dependency expressions: evaluation, simplification, and the
//! upward-propagation primitive `find_solution`.
//!
//! Expressions are owned, boxed recursive trees (`ExprRef = Box<Expr>`).
//! The original implementation interns `Const`/`SymbolRef` leaves for
//! identity-based equality; in Rust those leaves are small `Copy`/structural
//! types, so ordinary equality already gives us the same dedup benefit
//! without a process-wide cache (see DESIGN.md).

use std::collections::BTreeSet;
use std::fmt;

use crate::solcache::{value_set, SolutionCache, ValueSet};
use crate::symbol::{SymbolId, Value};
use crate::tristate::Tristate;

pub type ExprRef = Box<Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CmpOp {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

/// An operand of a [`CmpOp`] comparison: a constant or a symbol reference.
/// Kconfig only ever compares symbols/values, never nested boolean
/// subexpressions, so this is its own small type rather than a full `Expr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmpOperand {
    Const(Value),
    Symbol(SymbolId),
    /// Unresolved name; only valid before linking.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(Value),
    SymbolRef(SymbolId),
    /// Unresolved name; only valid before linking (`SymbolTable::link`).
    SymbolName(String),
    Not(ExprRef),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Cmp(CmpOp, CmpOperand, CmpOperand),
}

/// Read-only view of the current (possibly partial) symbol assignment used
/// while evaluating expressions.
pub trait ValueEnv {
    fn get(&self, sym: SymbolId) -> Option<&Value>;
}

impl Expr {
    /// Evaluates against a (possibly partial) assignment: `Const` is
    /// truthiness-reinterpreted, `SymbolRef` defaults to `n` when absent,
    /// `And`/`Or` short-circuit, `Cmp` compares raw (non-coerced) values.
    pub fn evaluate(&self, env: &dyn ValueEnv) -> Tristate {
        match self {
            Expr::Const(v) => v.as_tristate(),
            Expr::SymbolRef(s) => env.get(*s).map(Value::as_tristate).unwrap_or(Tristate::No),
            Expr::SymbolName(_) => {
                // Unlinked; treat as absent (matches SymbolRef-to-missing-symbol).
                Tristate::No
            }
            Expr::Not(e) => e.evaluate(env).not(),
            Expr::And(list) => Tristate::fold_and(list.iter().map(|e| e.evaluate(env))),
            Expr::Or(list) => Tristate::fold_or(list.iter().map(|e| e.evaluate(env))),
            Expr::Cmp(op, l, r) => {
                let lv = Self::operand_value(l, env);
                let rv = Self::operand_value(r, env);
                Tristate::from(Self::compare(*op, &lv, &rv))
            }
        }
    }

    fn operand_value(operand: &CmpOperand, env: &dyn ValueEnv) -> Value {
        match operand {
            CmpOperand::Const(v) => v.clone(),
            CmpOperand::Symbol(s) => env.get(*s).cloned().unwrap_or(Value::Tristate(Tristate::No)),
            CmpOperand::Name(_) => Value::Tristate(Tristate::No),
        }
    }

    /// Python-like comparison of two raw values. Operands of matching kind
    /// (both numeric, both string) compare naturally; mismatched kinds are
    /// never equal and never ordered (the DSL never produces them in
    /// practice — see DESIGN.md).
    fn compare(op: CmpOp, l: &Value, r: &Value) -> bool {
        use std::cmp::Ordering;
        let numeric = |v: &Value| -> Option<i128> {
            match v {
                Value::Tristate(t) => Some(*t as i128),
                Value::Int(n) => Some(*n as i128),
                Value::Hex(n) => Some(*n as i128),
                Value::Str(_) => None,
            }
        };

        let ordering = match (numeric(l), numeric(r)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => match (l, r) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => None,
            },
        };

        match op {
            CmpOp::Eq => l == r || ordering == Some(Ordering::Equal),
            CmpOp::Ne => !(l == r || ordering == Some(Ordering::Equal)),
            CmpOp::Lt => ordering == Some(Ordering::Less),
            CmpOp::Le => matches!(ordering, Some(Ordering::Less) | Some(Ordering::Equal)),
            CmpOp::Gt => ordering == Some(Ordering::Greater),
            CmpOp::Ge => matches!(ordering, Some(Ordering::Greater) | Some(Ordering::Equal)),
        }
    }

    /// Constant folding and identity elimination: `x && y = x`, `x || n = x`,
    /// double negation, `n` absorbs `And`, `y` absorbs `Or`.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Const(_) | Expr::SymbolRef(_) | Expr::SymbolName(_) => self.clone(),
            Expr::Cmp(op, l, r) => {
                if let (CmpOperand::Const(lv), CmpOperand::Const(rv)) = (l, r) {
                    let result = Self::compare(*op, lv, rv);
                    Expr::Const(Value::Tristate(Tristate::from(result)))
                } else {
                    self.clone()
                }
            }
            Expr::Not(e) => {
                let simpler = e.simplify();
                match &simpler {
                    Expr::Const(v) => Expr::Const(Value::Tristate(v.as_tristate().not())),
                    Expr::Not(inner) => (**inner).clone(),
                    _ => Expr::Not(Box::new(simpler)),
                }
            }
            Expr::And(list) => Self::simplify_junction(list, Tristate::No, Tristate::Yes, true),
            Expr::Or(list) => Self::simplify_junction(list, Tristate::Yes, Tristate::No, false),
        }
    }

    /// Shared simplification for `And`/`Or`. `absorbing` short-circuits the
    /// whole junction (`n` for And, `y` for Or); `identity` is dropped from
    /// the operand list when other operands remain (`y` for And, `n` for Or).
    fn simplify_junction(list: &[Expr], absorbing: Tristate, identity: Tristate, is_and: bool) -> Expr {
        let simplified: Vec<Expr> = list.iter().map(Expr::simplify).collect();

        let mut constants = BTreeSet::new();
        let mut rest = Vec::new();
        for e in simplified {
            match e {
                Expr::Const(v) => {
                    constants.insert(v.as_tristate());
                }
                other => rest.push(other),
            }
        }

        if constants.contains(&absorbing) {
            return Expr::Const(Value::Tristate(absorbing));
        }

        if rest.is_empty() {
            let value = if constants.is_empty() {
                absorbing
            } else if is_and {
                *constants.iter().min().unwrap()
            } else {
                *constants.iter().max().unwrap()
            };
            return Expr::Const(Value::Tristate(value));
        }

        constants.remove(&identity);
        let mut operands: Vec<Expr> = constants.into_iter().map(|t| Expr::Const(Value::Tristate(t))).collect();
        operands.extend(rest);

        if operands.len() == 1 {
            operands.into_iter().next().unwrap()
        } else if is_and {
            Expr::And(operands)
        } else {
            Expr::Or(operands)
        }
    }

    /// Enumerates assignments of the symbols this expression depends on
    /// that make `evaluate(..) >= threshold` (for `downward = false`) or
    /// `evaluate(..) <= threshold` (for `downward = true`).
    ///
    /// The resolver only ever asks "at least" questions (`want = {y}` or
    /// `{m, y}`) and their negations through `Not`, so this takes the
    /// min/max threshold of the requested set rather than an arbitrary
    /// subset — see DESIGN.md for why an arbitrary (non-interval) value set
    /// is out of scope here.
    pub fn find_solution(&self, want: &ValueSet) -> SolutionCache {
        if want.is_empty() {
            return SolutionCache::infeasible();
        }
        if want.len() == 3 {
            return SolutionCache::trivial();
        }
        // An interval touching Yes is "at least min(want)"; otherwise (touching
        // No but not Yes) it is "at most max(want)".
        if want.contains(&Tristate::Yes) {
            self.find_solution_threshold(*want.iter().min().unwrap(), false)
        } else {
            self.find_solution_threshold(*want.iter().max().unwrap(), true)
        }
    }

    fn find_solution_threshold(&self, threshold: Tristate, at_most: bool) -> SolutionCache {
        match self {
            Expr::Const(v) => {
                let tv = v.as_tristate();
                let ok = if at_most { tv <= threshold } else { tv >= threshold };
                if ok {
                    SolutionCache::trivial()
                } else {
                    SolutionCache::infeasible()
                }
            }
            Expr::SymbolRef(s) => {
                let acceptable: ValueSet = Tristate::ALL
                    .into_iter()
                    .filter(|t| if at_most { *t <= threshold } else { *t >= threshold })
                    .collect();
                SolutionCache::for_symbol(*s, acceptable)
            }
            Expr::SymbolName(_) => SolutionCache::trivial(),
            Expr::Not(e) => {
                // evaluate(Not e) = invert(evaluate(e)); flip both the
                // threshold and the polarity.
                e.find_solution_threshold(threshold.not(), !at_most)
            }
            Expr::And(list) => {
                if at_most {
                    // min(children) <= t  iff  at least one child <= t.
                    let branches: Vec<SolutionCache> =
                        list.iter().map(|e| e.find_solution_threshold(threshold, true)).collect();
                    SolutionCache::trivial().merge_alternatives(&branches)
                } else {
                    // min(children) >= t  iff  every child >= t.
                    list.iter().fold(SolutionCache::trivial(), |acc, e| {
                        acc.merge(&e.find_solution_threshold(threshold, false))
                    })
                }
            }
            Expr::Or(list) => {
                if at_most {
                    // max(children) <= t  iff  every child <= t.
                    list.iter().fold(SolutionCache::trivial(), |acc, e| {
                        acc.merge(&e.find_solution_threshold(threshold, true))
                    })
                } else {
                    // max(children) >= t  iff  at least one child >= t.
                    let branches: Vec<SolutionCache> =
                        list.iter().map(|e| e.find_solution_threshold(threshold, false)).collect();
                    SolutionCache::trivial().merge_alternatives(&branches)
                }
            }
            Expr::Cmp(..) => {
                // Relational constraints on non-tristate symbols aren't
                // expressible in a per-symbol tristate value set; assume
                // satisfiable and let evaluation-time checks catch a bad
                // choice (see DESIGN.md).
                SolutionCache::trivial()
            }
        }
    }

    /// Collects every [`SymbolId`] referenced anywhere in this expression,
    /// used to build the resolver's dependency closure (§3's `dep_graph`
    /// invariant: every symbol an expression touches must itself be in the
    /// graph).
    pub fn collect_symbols(&self, out: &mut BTreeSet<SymbolId>) {
        match self {
            Expr::Const(_) | Expr::SymbolName(_) => {}
            Expr::SymbolRef(s) => {
                out.insert(*s);
            }
            Expr::Not(e) => e.collect_symbols(out),
            Expr::And(list) | Expr::Or(list) => {
                for e in list {
                    e.collect_symbols(out);
                }
            }
            Expr::Cmp(_, l, r) => {
                for operand in [l, r] {
                    if let CmpOperand::Symbol(s) = operand {
                        out.insert(*s);
                    }
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(v) => write!(f, "{v}"),
            Expr::SymbolRef(s) => write!(f, "{s}"),
            Expr::SymbolName(n) => write!(f, "{n}"),
            Expr::Not(e) => write!(f, "!({e})"),
            Expr::And(list) => {
                write!(f, "(")?;
                for (i, e) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Expr::Or(list) => {
                write!(f, "(")?;
                for (i, e) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, " || ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Expr::Cmp(op, l, r) => write!(f, "{l:?} {op} {r:?}"),
        }
    }
}

pub fn want_at_least(t: Tristate) -> ValueSet {
    value_set(Tristate::ALL.into_iter().filter(|v| *v >= t))
}

pub fn want_at_most(t: Tristate) -> ValueSet {
    value_set(Tristate::ALL.into_iter().filter(|v| *v <= t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<SymbolId, Value>);
    impl ValueEnv for MapEnv {
        fn get(&self, sym: SymbolId) -> Option<&Value> {
            self.0.get(&sym)
        }
    }

    fn sid(n: u32) -> SymbolId {
        SymbolId::from_raw(n)
    }

    #[test]
    fn and_or_short_circuit_and_empty_identities() {
        let empty_and = Expr::And(vec![]);
        let empty_or = Expr::Or(vec![]);
        let env = MapEnv(HashMap::new());
        assert_eq!(empty_and.evaluate(&env), Tristate::No);
        assert_eq!(empty_or.evaluate(&env), Tristate::Yes);
    }

    #[test]
    fn missing_symbol_defaults_to_no() {
        let env = MapEnv(HashMap::new());
        let e = Expr::SymbolRef(sid(1));
        assert_eq!(e.evaluate(&env), Tristate::No);
    }

    #[test]
    fn simplify_preserves_evaluation() {
        let mut env = HashMap::new();
        env.insert(sid(1), Value::Tristate(Tristate::Mod));
        let env = MapEnv(env);

        let e = Expr::And(vec![
            Expr::Const(Value::Tristate(Tristate::Yes)),
            Expr::SymbolRef(sid(1)),
        ]);
        let simplified = e.simplify();
        assert_eq!(simplified, Expr::SymbolRef(sid(1)));
        assert_eq!(e.evaluate(&env), simplified.evaluate(&env));
    }

    #[test]
    fn simplify_double_negation() {
        let e = Expr::Not(Box::new(Expr::Not(Box::new(Expr::SymbolRef(sid(1))))));
        assert_eq!(e.simplify(), Expr::SymbolRef(sid(1)));
    }

    #[test]
    fn constant_n_absorbs_and() {
        let e = Expr::And(vec![Expr::SymbolRef(sid(1)), Expr::Const(Value::Tristate(Tristate::No))]);
        assert_eq!(e.simplify(), Expr::Const(Value::Tristate(Tristate::No)));
    }

    #[test]
    fn constant_y_absorbs_or() {
        let e = Expr::Or(vec![Expr::SymbolRef(sid(1)), Expr::Const(Value::Tristate(Tristate::Yes))]);
        assert_eq!(e.simplify(), Expr::Const(Value::Tristate(Tristate::Yes)));
    }

    #[test]
    fn find_solution_symbol_ref_at_least_mod() {
        let e = Expr::SymbolRef(sid(1));
        let cache = e.find_solution(&want_at_least(Tristate::Mod));
        assert!(cache.is_feasible());
        assert_eq!(
            cache.alternatives()[0].get(&sid(1)),
            Some(&value_set([Tristate::Mod, Tristate::Yes]))
        );
    }

    #[test]
    fn find_solution_and_requires_all_children() {
        let e = Expr::And(vec![Expr::SymbolRef(sid(1)), Expr::SymbolRef(sid(2))]);
        let cache = e.find_solution(&want_at_least(Tristate::Yes));
        assert_eq!(cache.alternatives().len(), 1);
        let alt = &cache.alternatives()[0];
        assert_eq!(alt.get(&sid(1)), Some(&value_set([Tristate::Yes])));
        assert_eq!(alt.get(&sid(2)), Some(&value_set([Tristate::Yes])));
    }

    #[test]
    fn find_solution_or_offers_alternatives() {
        let e = Expr::Or(vec![Expr::SymbolRef(sid(1)), Expr::SymbolRef(sid(2))]);
        let cache = e.find_solution(&want_at_least(Tristate::Yes));
        assert_eq!(cache.alternatives().len(), 2);
    }
}
