//! Recursive-descent parser over the token stream, producing a flat list
//! of [`Command`]s (§4.4's grammar).

use std::fmt;

use super::lexer::{tokenize, Keyword, LangError, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Disable,
    Module,
    Builtin,
    BuiltinOrModule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Set,
    Append,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    If,
    Unless,
}

/// A condition guard attached to a command: `(op, names)`. The interpreter
/// currently evaluates every guard as satisfied and logs a warning — see
/// the open point in §9 of the specification this parses.
pub type Cond = (CondOp, Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Include(String),
    Op { opcode: Opcode, names: Vec<String>, cond: Option<Cond> },
    SetLike { opcode: SetOp, name: String, value: String, cond: Option<Cond> },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lang(#[from] LangError),
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: &'static str, found: String },
    #[error("unexpected end of input, expected {0}")]
    Eof(&'static str),
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Disable => "disable",
            Opcode::Module => "module",
            Opcode::Builtin => "builtin",
            Opcode::BuiltinOrModule => "builtin-or-module",
        };
        write!(f, "{s}")
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_str(&mut self, what: &'static str) -> Result<String, ParseError> {
        match self.bump() {
            Some(Token::Str(s)) => Ok(s),
            Some(other) => Err(ParseError::Unexpected { expected: what, found: other.to_string() }),
            None => Err(ParseError::Eof(what)),
        }
    }

    fn at_cmd_end_or_eof(&self) -> bool {
        matches!(self.peek(), None | Some(Token::CmdEnd))
    }

    fn str_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut out = vec![self.expect_str("an option name")?];
        while let Some(Token::Str(_)) = self.peek() {
            out.push(self.expect_str("an option name")?);
        }
        Ok(out)
    }

    fn maybe_cond(&mut self) -> Result<Option<Cond>, ParseError> {
        let op = match self.peek() {
            Some(Token::Kw(Keyword::If)) => CondOp::If,
            Some(Token::Kw(Keyword::Unless)) => CondOp::Unless,
            _ => return Ok(None),
        };
        self.bump();
        Ok(Some((op, self.str_list()?)))
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        match self.bump() {
            Some(Token::Kw(Keyword::Include)) => {
                let path = self.expect_str("a file path")?;
                Ok(Command::Include(path))
            }
            Some(Token::Kw(kw @ (Keyword::Disable | Keyword::Module | Keyword::Builtin | Keyword::BuiltinOrModule))) => {
                let opcode = match kw {
                    Keyword::Disable => Opcode::Disable,
                    Keyword::Module => Opcode::Module,
                    Keyword::Builtin => Opcode::Builtin,
                    Keyword::BuiltinOrModule => Opcode::BuiltinOrModule,
                    _ => unreachable!(),
                };
                let names = self.str_list()?;
                let cond = self.maybe_cond()?;
                Ok(Command::Op { opcode, names, cond })
            }
            Some(Token::Kw(kw @ (Keyword::Set | Keyword::Append | Keyword::Add))) => {
                let opcode = match kw {
                    Keyword::Set => SetOp::Set,
                    Keyword::Append => SetOp::Append,
                    Keyword::Add => SetOp::Add,
                    _ => unreachable!(),
                };
                let name = self.expect_str("an option name")?;
                let value = self.expect_str("a value")?;
                let cond = self.maybe_cond()?;
                Ok(Command::SetLike { opcode, name, value, cond })
            }
            Some(other) => Err(ParseError::Unexpected { expected: "a command", found: other.to_string() }),
            None => Err(ParseError::Eof("a command")),
        }
    }

    fn command_list(&mut self) -> Result<Vec<Command>, ParseError> {
        let mut commands = Vec::new();
        if self.peek().is_none() {
            return Ok(commands);
        }
        commands.push(self.command()?);
        while matches!(self.peek(), Some(Token::CmdEnd)) {
            self.bump();
            if self.peek().is_none() {
                break;
            }
            commands.push(self.command()?);
        }
        if !self.at_cmd_end_or_eof() {
            return Err(ParseError::Unexpected {
                expected: "end of command",
                found: self.peek().unwrap().to_string(),
            });
        }
        Ok(commands)
    }
}

/// Parses directive source text into a flat command list.
pub fn parse(src: &str) -> Result<Vec<Command>, ParseError> {
    let tokens = tokenize(src)?;
    Parser { tokens, pos: 0 }.command_list()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty_program() {
        assert_eq!(parse("").unwrap(), vec![]);
        assert_eq!(parse("\n\n# just a comment\n").unwrap(), vec![]);
    }

    #[test]
    fn parses_include() {
        let commands = parse("include extra.conf").unwrap();
        assert_eq!(commands, vec![Command::Include("extra.conf".to_string())]);
    }

    #[test]
    fn parses_multi_name_op_with_unless() {
        let commands = parse("n FOO BAR unless BAZ").unwrap();
        assert_eq!(
            commands,
            vec![Command::Op {
                opcode: Opcode::Disable,
                names: vec!["FOO".to_string(), "BAR".to_string()],
                cond: Some((CondOp::Unless, vec!["BAZ".to_string()])),
            }]
        );
    }

    #[test]
    fn parses_set_like_commands() {
        let commands = parse("append CMDLINE \"panic=10\"").unwrap();
        assert_eq!(
            commands,
            vec![Command::SetLike {
                opcode: SetOp::Append,
                name: "CMDLINE".to_string(),
                value: "panic=10".to_string(),
                cond: None,
            }]
        );
    }

    #[test]
    fn rejects_set_missing_value() {
        assert!(parse("set CMDLINE").is_err());
    }

    #[test]
    fn semicolons_separate_multiple_commands() {
        let commands = parse("n A; y B").unwrap();
        assert_eq!(commands.len(), 2);
    }
}
