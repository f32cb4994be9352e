//! Token and node kinds of the concrete syntax tree.

/// Every token and node kind that can appear in a syntax tree.
///
/// Tokens come first, nodes after [`SyntaxKind::SOURCE_FILE`]. `EOF` never
/// appears in a tree; the parser uses it as the lookahead past the last token.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    // trivia
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,

    // keywords
    IMPORT_KW,
    AS_KW,
    SERVICE_KW,
    EXTENDS_KW,
    OP_KW,
    CALLS_KW,
    TYPE_KW,
    PRIMITIVE_KW,

    IDENT,

    // punctuation
    L_BRACE,
    R_BRACE,
    L_PAREN,
    R_PAREN,
    L_BRACK,
    R_BRACK,
    SEMICOLON,
    COLON,
    COMMA,
    DOT,
    STAR,
    EQ,

    /// A character the lexer does not recognize.
    ERROR_TOKEN,
    EOF,

    // nodes
    SOURCE_FILE,
    IMPORT,
    ALIAS,
    SERVICE,
    EXTENDS_CLAUSE,
    SERVICE_BODY,
    OPERATION,
    PARAM_LIST,
    PARAM,
    RETURN_TYPE,
    CALLS_CLAUSE,
    TYPE_DECL,
    TYPE_BODY,
    FIELD,
    TYPE_REF,
    PATH,
    NAME,
    /// Parse-error marker. Wraps skipped tokens, or is empty where a
    /// required token was missing.
    ERROR,
}

use SyntaxKind::*;

const ALL: &[SyntaxKind] = &[
    WHITESPACE,
    LINE_COMMENT,
    BLOCK_COMMENT,
    IMPORT_KW,
    AS_KW,
    SERVICE_KW,
    EXTENDS_KW,
    OP_KW,
    CALLS_KW,
    TYPE_KW,
    PRIMITIVE_KW,
    IDENT,
    L_BRACE,
    R_BRACE,
    L_PAREN,
    R_PAREN,
    L_BRACK,
    R_BRACK,
    SEMICOLON,
    COLON,
    COMMA,
    DOT,
    STAR,
    EQ,
    ERROR_TOKEN,
    EOF,
    SOURCE_FILE,
    IMPORT,
    ALIAS,
    SERVICE,
    EXTENDS_CLAUSE,
    SERVICE_BODY,
    OPERATION,
    PARAM_LIST,
    PARAM,
    RETURN_TYPE,
    CALLS_CLAUSE,
    TYPE_DECL,
    TYPE_BODY,
    FIELD,
    TYPE_REF,
    PATH,
    NAME,
    ERROR,
];

impl SyntaxKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, WHITESPACE | LINE_COMMENT | BLOCK_COMMENT)
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            IMPORT_KW | AS_KW | SERVICE_KW | EXTENDS_KW | OP_KW | CALLS_KW | TYPE_KW | PRIMITIVE_KW
        )
    }

    /// Raw values outside the enum map to `ERROR`.
    pub fn from_raw(raw: u16) -> SyntaxKind {
        ALL.get(raw as usize).copied().unwrap_or(ERROR)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        rowan::SyntaxKind(kind as u16)
    }
}

/// Rowan language tag for service DSL trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceLanguage {}

impl rowan::Language for ServiceLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> SyntaxKind {
        SyntaxKind::from_raw(raw.0)
    }

    fn kind_to_raw(kind: SyntaxKind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<ServiceLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<ServiceLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<ServiceLanguage>;
