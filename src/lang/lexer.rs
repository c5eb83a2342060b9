//! Tokenizer for the directive DSL: reserved words, bare/quoted `STR`
//! tokens, and `CMD_END` (newline or `;`, with runs collapsed to one).

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum LangError {
    #[error("unterminated quoted string starting at byte {0}")]
    UnterminatedString(usize),
    #[error("dangling escape character at byte {0}")]
    DanglingEscape(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Disable,
    Module,
    Builtin,
    BuiltinOrModule,
    Set,
    Append,
    Add,
    Include,
    If,
    Unless,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        Some(match word {
            "disable" | "n" => Keyword::Disable,
            "module" | "m" => Keyword::Module,
            "builtin" | "y" => Keyword::Builtin,
            "builtin-or-module" | "ym" => Keyword::BuiltinOrModule,
            "set" => Keyword::Set,
            "append" => Keyword::Append,
            "add" => Keyword::Add,
            "include" => Keyword::Include,
            "if" => Keyword::If,
            "unless" => Keyword::Unless,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Kw(Keyword),
    Str(String),
    CmdEnd,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Kw(kw) => write!(f, "{kw:?}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::CmdEnd => write!(f, "<end>"),
        }
    }
}

/// Tokenizes `src`. `#` starts a line comment outside quotes; `;` and `\n`
/// are both `CMD_END`, and successive `CMD_END`s collapse into one so blank
/// lines and trailing comments never produce empty commands.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LangError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut last_was_end = true; // suppress a leading CMD_END

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' => i += 1,
            '#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '\n' | ';' => {
                if !last_was_end {
                    tokens.push(Token::CmdEnd);
                    last_was_end = true;
                }
                i += 1;
            }
            '"' | '\'' => {
                let start = i;
                let quote = bytes[i];
                i += 1;
                let mut s = String::new();
                loop {
                    if i >= bytes.len() {
                        return Err(LangError::UnterminatedString(start));
                    }
                    if bytes[i] == b'\\' {
                        i += 1;
                        if i >= bytes.len() {
                            return Err(LangError::DanglingEscape(start));
                        }
                        s.push(bytes[i] as char);
                        i += 1;
                    } else if bytes[i] == quote {
                        i += 1;
                        break;
                    } else {
                        s.push(bytes[i] as char);
                        i += 1;
                    }
                }
                tokens.push(word_or_keyword(s));
                last_was_end = false;
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i] as char, ' ' | '\t' | '\r' | '\n' | ';' | '#') {
                    i += 1;
                }
                let word = &src[start..i];
                tokens.push(word_or_keyword_str(word));
                last_was_end = false;
            }
        }
    }
    if !last_was_end {
        tokens.push(Token::CmdEnd);
    }
    Ok(tokens)
}

/// A bare word may be a reserved keyword; a quoted string never is (it was
/// explicitly marked as a literal by the user).
fn word_or_keyword_str(word: &str) -> Token {
    match Keyword::from_word(word) {
        Some(kw) => Token::Kw(kw),
        None => Token::Str(word.to_string()),
    }
}

fn word_or_keyword(s: String) -> Token {
    Token::Str(s)
}
