//! # Command syntax
//!
//! Document commands are stored as bookmark names written in a small nested key/value
//! language:
//!
//! ```text
//! DOC(CMD 'insertFrag' FRAG_ID 'Header' ARGS('Acme Inc.' '' 'Main St'))
//! ```
//!
//! A key is followed either by a quoted string or by a parenthesised list of further nodes.
//! A bare string is a leaf. Strings may use single or double quotes, and a doubled quote
//! inside a string stands for one quote character. `#` starts a comment running to the end
//! of the line.
//!
//! Every node is a [`ConfigNode`]: a name plus children. `FRAG_ID 'Header'` becomes a node
//! named `FRAG_ID` whose only child is a leaf named `Header`. [`ConfigNode`]'s `Display`
//! writes the same syntax back, always with single quotes, so a parsed command can be
//! rewritten into its bookmark after its state changes.

use std::fmt;

use logos::Logos;
use thiserror::Error;

/// Token kinds produced by the Logos lexer.
///
/// Nothing is skipped by Logos itself. Whitespace and comments are real tokens that the
/// parser steps over.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"")]
pub enum TokenKind {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    /// `# ...` up to the end of the line
    #[regex(r"#[^\n]*")]
    Comment,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"'([^']|'')*'")]
    SingleQuoted,

    #[regex(r#""([^"]|"")*""#)]
    DoubleQuoted,
}

impl TokenKind {
    fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// A lexed token with its kind, text slice and byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unrecognised input {text:?} at offset {offset}")]
    InvalidToken { offset: usize, text: String },

    #[error("unexpected {text:?} at offset {offset}")]
    UnexpectedToken { offset: usize, text: String },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
}

/// Lex the input, dropping whitespace and comments.
pub fn lex(input: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let offset = lexer.span().start;
        let text = lexer.slice();
        match result {
            Ok(kind) if kind.is_trivia() => {}
            Ok(kind) => tokens.push(Token { kind, text, offset }),
            Err(()) => {
                return Err(SyntaxError::InvalidToken {
                    offset,
                    text: text.to_string(),
                });
            }
        }
    }

    Ok(tokens)
}

/// A node of the command language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigNode {
    pub name: String,
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>, children: Vec<ConfigNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// `KEY 'value'`
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, vec![Self::leaf(value)])
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Value of a `KEY 'value'` node: its single leaf child.
    pub fn value(&self) -> Option<&str> {
        match self.children.as_slice() {
            [only] if only.is_leaf() => Some(&only.name),
            _ => None,
        }
    }

    /// Value of the direct child `name`, if it has the `KEY 'value'` form.
    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(ConfigNode::value)
    }

    /// Every node called `name` below this one, depth-first in source order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a ConfigNode> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a ConfigNode>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }

    /// Replaces every direct child called `name` with `node`, appending it if there was none.
    pub fn set_child(&mut self, node: ConfigNode) {
        self.children.retain(|child| child.name != node.name);
        self.children.push(node);
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "'{}'", text.replace('\'', "''"))
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            return write_quoted(f, &self.name);
        }
        f.write_str(&self.name)?;
        if let Some(value) = self.value() {
            f.write_str(" ")?;
            return write_quoted(f, value);
        }
        f.write_str("(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

/// Parses a whole input into its top-level nodes.
pub fn parse(input: &str) -> Result<Vec<ConfigNode>, SyntaxError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let nodes = parser.list()?;
    match parser.peek() {
        None => Ok(nodes),
        Some(token) => Err(parser.unexpected(token)),
    }
}

/// Parses an input that must hold exactly one node.
pub fn parse_node(input: &str) -> Result<ConfigNode, SyntaxError> {
    let mut nodes = parse(input)?;
    match nodes.len() {
        1 => Ok(nodes.remove(0)),
        0 => Err(SyntaxError::UnexpectedEnd { expected: "a node" }),
        _ => Err(SyntaxError::UnexpectedToken {
            offset: input.len(),
            text: nodes[1].to_string(),
        }),
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn unexpected(&self, token: &Token<'_>) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            offset: token.offset,
            text: token.text.to_string(),
        }
    }

    /// Nodes up to the end of input or a closing parenthesis, which is left in place.
    fn list(&mut self) -> Result<Vec<ConfigNode>, SyntaxError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::RParen {
                break;
            }
            nodes.push(self.node()?);
        }
        Ok(nodes)
    }

    fn node(&mut self) -> Result<ConfigNode, SyntaxError> {
        let Some(token) = self.bump() else {
            return Err(SyntaxError::UnexpectedEnd { expected: "a node" });
        };
        match token.kind {
            TokenKind::SingleQuoted | TokenKind::DoubleQuoted => {
                Ok(ConfigNode::leaf(unquote(token.text)))
            }
            TokenKind::Ident => self.value_of(token.text),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn value_of(&mut self, key: &str) -> Result<ConfigNode, SyntaxError> {
        let Some(token) = self.bump() else {
            return Err(SyntaxError::UnexpectedEnd {
                expected: "a string or '(' after a key",
            });
        };
        match token.kind {
            TokenKind::SingleQuoted | TokenKind::DoubleQuoted => {
                Ok(ConfigNode::key_value(key, unquote(token.text)))
            }
            TokenKind::LParen => {
                let children = self.list()?;
                match self.bump() {
                    Some(close) if close.kind == TokenKind::RParen => {
                        Ok(ConfigNode::new(key, children))
                    }
                    Some(other) => Err(self.unexpected(&other)),
                    None => Err(SyntaxError::UnexpectedEnd { expected: "')'" }),
                }
            }
            _ => Err(self.unexpected(&token)),
        }
    }
}

fn unquote(text: &str) -> String {
    let quote = &text[..1];
    let inner = &text[1..text.len() - 1];
    inner.replace(&quote.repeat(2), quote)
}
