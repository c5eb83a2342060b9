//! The configuration directive language: lexer, parser and AST for the
//! small DSL that drives `ConfigChoices` (§4.4). `crate::interpreter` walks
//! the AST this module produces.

mod lexer;
mod parser;

pub use lexer::{tokenize, LangError, Token};
pub use parser::{parse, Cond, CondOp, Command, Opcode, ParseError, SetOp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_and_parses_a_small_program() {
        let src = "ym A B\nset CMDLINE \"quiet\" if FOO\n";
        let commands = parse(src).unwrap();
        assert_eq!(commands.len(), 2);
        match &commands[0] {
            Command::Op { opcode: Opcode::BuiltinOrModule, names, cond } => {
                assert_eq!(names, &vec!["A".to_string(), "B".to_string()]);
                assert!(cond.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        match &commands[1] {
            Command::SetLike { opcode: SetOp::Set, name, value, cond } => {
                assert_eq!(name, "CMDLINE");
                assert_eq!(value, "quiet");
                assert_eq!(cond.as_ref().unwrap().0, CondOp::If);
                assert_eq!(cond.as_ref().unwrap().1, vec!["FOO".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
