//! Runs a parsed directive program against a [`ConfigChoices`] façade
//! (§4.4's "Interpreter"). Owns the FIFO queue of files that `include`
//! directives feed into and the one-visit-per-path dedup that makes an
//! include cycle terminate instead of looping forever.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use log::warn;

use crate::choices::ConfigChoices;
use crate::lang::{parse, Cond, CondOp, Command, Opcode, ParseError, SetOp};

/// Supplies directive source text for a path. Abstracted so tests can hand
/// the interpreter an in-memory fixture set instead of real files.
pub trait DirectiveSource {
    fn load(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads directive files straight off disk.
pub struct FsDirectiveSource;

impl DirectiveSource for FsDirectiveSource {
    fn load(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    #[error("{path}: {source}")]
    Parse { path: PathBuf, #[source] source: ParseError },
    #[error("{path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("include {name:?}: not found in any search path")]
    IncludeNotFound { name: String },
    #[error("include {name:?} used outside of a file context")]
    IncludeWithoutFileContext { name: String },
}

/// Drives commands into a [`ConfigChoices`], tracking which files have
/// already been processed this session.
pub struct Interpreter<'a, 'c> {
    choices: &'a mut ConfigChoices<'c>,
    search_paths: Vec<PathBuf>,
    visited: HashSet<PathBuf>,
}

impl<'a, 'c> Interpreter<'a, 'c> {
    pub fn new(choices: &'a mut ConfigChoices<'c>, search_paths: Vec<PathBuf>) -> Self {
        Interpreter { choices, search_paths, visited: HashSet::new() }
    }

    /// Runs directive source text with no enclosing file. An `include`
    /// directive at this level has nowhere to be resolved relative to, so
    /// it's an error rather than silently dropped.
    pub fn run_str(&mut self, src: &str) -> Result<(), InterpreterError> {
        let commands =
            parse(src).map_err(|source| InterpreterError::Parse { path: PathBuf::from("<inline>"), source })?;
        for command in commands {
            if let Some(name) = self.execute(command) {
                return Err(InterpreterError::IncludeWithoutFileContext { name });
            }
        }
        Ok(())
    }

    /// Runs a directive file, then drains the FIFO queue of files its
    /// (transitive) `include` directives enqueue. A path already visited
    /// this session — by canonical form, so `a/../a.conf` and `a.conf`
    /// collapse — is skipped, which is what makes an include cycle
    /// terminate (§8 scenario 6) instead of looping forever.
    pub fn run_file(&mut self, loader: &dyn DirectiveSource, path: &Path) -> Result<(), InterpreterError> {
        let mut queue = VecDeque::new();
        queue.push_back(path.to_path_buf());

        while let Some(path) = queue.pop_front() {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !self.visited.insert(canonical) {
                continue;
            }

            let text = loader
                .load(&path)
                .map_err(|source| InterpreterError::Io { path: path.clone(), source })?;
            let commands =
                parse(&text).map_err(|source| InterpreterError::Parse { path: path.clone(), source })?;

            for command in commands {
                if let Some(name) = self.execute(command) {
                    queue.push_back(self.resolve_include(&name)?);
                }
            }
        }
        Ok(())
    }

    /// Resolves an `include` operand against the configured search paths,
    /// falling back to treating it as a path relative to the process's
    /// working directory.
    fn resolve_include(&self, name: &str) -> Result<PathBuf, InterpreterError> {
        let direct = Path::new(name);
        if direct.is_absolute() {
            return Ok(direct.to_path_buf());
        }
        for base in &self.search_paths {
            let candidate = base.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        if direct.exists() {
            return Ok(direct.to_path_buf());
        }
        Err(InterpreterError::IncludeNotFound { name: name.to_string() })
    }

    /// Executes one command. Returns `Some(path)` for an `include`, leaving
    /// queueing to the caller (only `run_file` has a file queue to push
    /// onto).
    fn execute(&mut self, command: Command) -> Option<String> {
        match command {
            Command::Include(path) => return Some(path),
            Command::Op { opcode, names, cond } => {
                self.warn_dropped_cond(&cond);
                for name in &names {
                    self.dispatch_op(opcode, name);
                }
            }
            Command::SetLike { opcode, name, value, cond } => {
                self.warn_dropped_cond(&cond);
                self.dispatch_set(opcode, &name, &value);
            }
        }
        None
    }

    fn dispatch_op(&mut self, opcode: Opcode, name: &str) -> bool {
        match opcode {
            Opcode::Disable => self.choices.option_disable(name),
            Opcode::Module => self.choices.option_module(name),
            Opcode::Builtin => self.choices.option_builtin(name),
            Opcode::BuiltinOrModule => self.choices.option_builtin_or_module(name),
        }
    }

    fn dispatch_set(&mut self, opcode: SetOp, name: &str, value: &str) -> bool {
        match opcode {
            SetOp::Set => self.choices.option_set_to(name, value),
            SetOp::Append => self.choices.option_append(name, value),
            SetOp::Add => self.choices.option_add(name, value),
        }
    }

    /// §9's open point: the condition language is parsed but not wired to
    /// an evaluator. Every guarded command currently runs unconditionally,
    /// with a warning naming the dropped guard.
    fn warn_dropped_cond(&self, cond: &Option<Cond>) {
        if let Some((op, names)) = cond {
            let op_name = match op {
                CondOp::If => "if",
                CondOp::Unless => "unless",
            };
            warn!(
                "dropping condition `{op_name} {}`: condition evaluation is not wired, proceeding as if true",
                names.join(" ")
            );
        }
    }
}
