//! Lexer built on `logos`.
//!
//! Trivia is kept: the parser feeds every token, whitespace and comments
//! included, into the tree so the tree is lossless.

use logos::{Lexer, Logos};

use super::SyntaxKind;
use crate::base::{TextRange, TextSize};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,

    #[token("import")]
    Import,
    #[token("as")]
    As,
    #[token("service")]
    Service,
    #[token("extends")]
    Extends,
    #[token("op")]
    Op,
    #[token("calls")]
    Calls,
    #[token("type")]
    Type,
    #[token("boolean")]
    #[token("byte")]
    #[token("char")]
    #[token("date")]
    #[token("double")]
    #[token("float")]
    #[token("int")]
    #[token("long")]
    #[token("short")]
    #[token("string")]
    #[token("unspecified")]
    Primitive,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("=")]
    Eq,
}

/// Scan past the closing `*/`. An unterminated comment swallows the rest
/// of the input as an error.
fn block_comment(lex: &mut Lexer<RawToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

impl From<RawToken> for SyntaxKind {
    fn from(token: RawToken) -> Self {
        match token {
            RawToken::Whitespace => SyntaxKind::WHITESPACE,
            RawToken::LineComment => SyntaxKind::LINE_COMMENT,
            RawToken::BlockComment => SyntaxKind::BLOCK_COMMENT,
            RawToken::Import => SyntaxKind::IMPORT_KW,
            RawToken::As => SyntaxKind::AS_KW,
            RawToken::Service => SyntaxKind::SERVICE_KW,
            RawToken::Extends => SyntaxKind::EXTENDS_KW,
            RawToken::Op => SyntaxKind::OP_KW,
            RawToken::Calls => SyntaxKind::CALLS_KW,
            RawToken::Type => SyntaxKind::TYPE_KW,
            RawToken::Primitive => SyntaxKind::PRIMITIVE_KW,
            RawToken::Ident => SyntaxKind::IDENT,
            RawToken::LBrace => SyntaxKind::L_BRACE,
            RawToken::RBrace => SyntaxKind::R_BRACE,
            RawToken::LParen => SyntaxKind::L_PAREN,
            RawToken::RParen => SyntaxKind::R_PAREN,
            RawToken::LBrack => SyntaxKind::L_BRACK,
            RawToken::RBrack => SyntaxKind::R_BRACK,
            RawToken::Semicolon => SyntaxKind::SEMICOLON,
            RawToken::Colon => SyntaxKind::COLON,
            RawToken::Comma => SyntaxKind::COMMA,
            RawToken::Dot => SyntaxKind::DOT,
            RawToken::Star => SyntaxKind::STAR,
            RawToken::Eq => SyntaxKind::EQ,
        }
    }
}

/// A lexed token: its kind and where it sits in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

/// Split `text` into tokens covering every byte of it.
///
/// Unrecognized input becomes `ERROR_TOKEN`; lexing never fails.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut lexer = RawToken::lexer(text);
    let mut tokens = Vec::<Token>::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let (mut start, mut end) = (span.start, span.end);

        // An error token is widened to a char boundary; swallow the
        // continuation bytes logos reports separately.
        if let Some(last) = tokens.last() {
            let last_end = usize::from(last.range.end());
            if end <= last_end {
                continue;
            }
            start = start.max(last_end);
        }

        let kind = match result {
            Ok(token) => SyntaxKind::from(token),
            Err(()) => SyntaxKind::ERROR_TOKEN,
        };
        if kind == SyntaxKind::ERROR_TOKEN {
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
        }

        tokens.push(Token {
            kind,
            range: TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32)),
        });
    }

    tokens
}
