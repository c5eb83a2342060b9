//! kconfigure resolves declarative directives against a Kconfig symbol
//! table and renders the result as a `.config` file, automatically
//! satisfying dependencies and detecting conflicts along the way.
//!
//! The binary (`src/main.rs`) is a thin CLI shell over this library; the
//! pieces below are what actually do the work, roughly in the order data
//! flows through them: [`symview`]/[`symtab`] build the symbol table,
//! [`lang`]/[`interpreter`] turn directive files into calls against
//! [`choices`], and [`graph`] resolves the accumulated decisions into a
//! [`config::ConfigMap`].

pub mod choices;
pub mod config;
pub mod decision;
pub mod expr;
pub mod graph;
pub mod interpreter;
pub mod lang;
pub mod settings;
pub mod solcache;
pub mod symbol;
pub mod symtab;
pub mod symview;
pub mod tristate;
