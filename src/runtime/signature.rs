//! Parser for the textual function signatures used to declare native
//! functions, e.g. `add(number a, number b) -> number`.
//!
//! ```text
//! signature := IDENT '(' [param (',' param)*] ')' ['->' TYPE]
//! param     := 'state' TYPE [IDENT]
//!            | TYPE [IDENT] ['...' | '?']
//! ```
//!
//! A `state` parameter declares the call-site state type and does not count
//! as an input. `...` marks the (last) input variadic, `?` optional.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInput {
    pub type_name: String,
    pub name: Option<String>,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub inputs: Vec<ParsedInput>,
    pub output: Option<String>,
    pub state: Option<String>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureError {
    pub position: usize,
    pub message: String,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.position)
    }
}

impl std::error::Error for SignatureError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Arrow,
    Ellipsis,
    Question,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "`{}`", name),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::Comma => write!(f, "`,`"),
            Token::Arrow => write!(f, "`->`"),
            Token::Ellipsis => write!(f, "`...`"),
            Token::Question => write!(f, "`?`"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, SignatureError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;
        let token = match c {
            b' ' | b'\t' | b'\n' => {
                pos += 1;
                continue;
            }
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b',' => Token::Comma,
            b'?' => Token::Question,
            b'-' if bytes.get(pos + 1) == Some(&b'>') => {
                pos += 1;
                Token::Arrow
            }
            b'.' if text[pos..].starts_with("...") => {
                pos += 2;
                Token::Ellipsis
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c == b'#' => {
                while pos + 1 < bytes.len()
                    && (bytes[pos + 1].is_ascii_alphanumeric() || bytes[pos + 1] == b'_')
                {
                    pos += 1;
                }
                Token::Ident(text[start..=pos].to_string())
            }
            other => {
                return Err(SignatureError {
                    position: start,
                    message: format!("unexpected character `{}`", other as char),
                });
            }
        };
        tokens.push((start, token));
        pos += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    index: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.index).map_or(self.end, |(p, _)| *p)
    }

    fn error(&self, message: impl Into<String>) -> SignatureError {
        SignatureError {
            position: self.position(),
            message: message.into(),
        }
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), SignatureError> {
        if self.eat(&expected) {
            return Ok(());
        }
        Err(match self.peek() {
            Some(found) => self.error(format!("expected {}, found {}", expected, found)),
            None => self.error(format!("expected {}, found end of signature", expected)),
        })
    }

    fn ident(&mut self, what: &str) -> Result<String, SignatureError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.index += 1;
                Ok(name)
            }
            Some(found) => Err(self.error(format!("expected {}, found {}", what, found))),
            None => Err(self.error(format!("expected {}, found end of signature", what))),
        }
    }

    fn optional_ident(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.index += 1;
                Some(name)
            }
            _ => None,
        }
    }
}

pub fn parse_signature(text: &str) -> Result<Signature, SignatureError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        index: 0,
        end: text.len(),
    };

    let name = parser.ident("function name")?;
    parser.expect(Token::LParen)?;

    let mut signature = Signature {
        name,
        inputs: Vec::new(),
        output: None,
        state: None,
        variadic: false,
    };

    if !parser.eat(&Token::RParen) {
        loop {
            if signature.variadic {
                return Err(parser.error("variadic input must be the last input"));
            }

            let first = parser.ident("input type")?;
            if first == "state" && matches!(parser.peek(), Some(Token::Ident(_))) {
                if signature.state.is_some() {
                    return Err(parser.error("duplicate state declaration"));
                }
                signature.state = Some(parser.ident("state type")?);
                parser.optional_ident();
            } else {
                let name = parser.optional_ident();
                let mut optional = false;
                if parser.eat(&Token::Ellipsis) {
                    signature.variadic = true;
                } else if parser.eat(&Token::Question) {
                    optional = true;
                }
                signature.inputs.push(ParsedInput {
                    type_name: first,
                    name,
                    optional,
                });
            }

            if parser.eat(&Token::RParen) {
                break;
            }
            parser.expect(Token::Comma)?;
        }
    }

    if parser.eat(&Token::Arrow) {
        signature.output = Some(parser.ident("output type")?);
    }

    if let Some(found) = parser.peek() {
        return Err(parser.error(format!("unexpected {} after signature", found)));
    }

    Ok(signature)
}
