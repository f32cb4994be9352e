//! Recursive-descent grammar with skip-and-resume error recovery.
//!
//! Every parse error leaves an `ERROR` node in the tree: either wrapping the
//! tokens skipped up to the next statement boundary, or empty where a
//! required token was missing. At most one error is reported per token
//! position.

use rowan::{GreenNode, GreenNodeBuilder};

use super::SyntaxKind::{self, *};
use super::lexer::Token;
use super::SyntaxError;
use crate::base::TextRange;

/// Tokens that start a top-level item.
const ITEM_RECOVERY: &[SyntaxKind] = &[IMPORT_KW, SERVICE_KW, TYPE_KW, OP_KW];
/// Tokens that start or close a member of a service body.
const MEMBER_RECOVERY: &[SyntaxKind] = &[OP_KW, TYPE_KW, R_BRACE, SERVICE_KW, IMPORT_KW];
const FIELD_RECOVERY: &[SyntaxKind] = &[IDENT, R_BRACE, OP_KW, TYPE_KW, SERVICE_KW, IMPORT_KW];
/// Tokens that end a parameter list even when `)` is missing.
const PARAM_STOP: &[SyntaxKind] = &[
    OP_KW, TYPE_KW, SERVICE_KW, IMPORT_KW, L_BRACE, R_BRACE, SEMICOLON, COLON, CALLS_KW,
];
const PARAM_RECOVERY: &[SyntaxKind] = &[
    COMMA, R_PAREN, OP_KW, TYPE_KW, SERVICE_KW, IMPORT_KW, L_BRACE, R_BRACE, SEMICOLON, COLON,
    CALLS_KW,
];

pub(super) struct Parser<'t> {
    text: &'t str,
    tokens: &'t [Token],
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
    last_error_at: Option<usize>,
}

impl<'t> Parser<'t> {
    pub(super) fn new(text: &'t str, tokens: &'t [Token]) -> Self {
        Self {
            text,
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            last_error_at: None,
        }
    }

    pub(super) fn finish(self) -> (GreenNode, Vec<SyntaxError>) {
        (self.builder.finish(), self.errors)
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    /// Index of the `n`th non-trivia token at or after the cursor.
    fn nth_index(&self, n: usize) -> Option<usize> {
        self.tokens[self.pos..]
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .nth(n)
            .map(|(i, _)| self.pos + i)
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_index(n).map_or(EOF, |i| self.tokens[i].kind)
    }

    fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    fn at_any(&self, set: &[SyntaxKind]) -> bool {
        set.contains(&self.current())
    }

    fn at_end(&self) -> bool {
        self.at(EOF)
    }

    fn current_range(&self) -> TextRange {
        match self.nth_index(0) {
            Some(i) => self.tokens[i].range,
            None => TextRange::empty(crate::base::TextSize::of(self.text)),
        }
    }

    fn describe_current(&self) -> String {
        match self.nth_index(0) {
            Some(i) => format!("`{}`", &self.text[self.tokens[i].range]),
            None => "end of file".to_string(),
        }
    }

    fn push_token(&mut self, index: usize) {
        let token = self.tokens[index];
        self.builder.token(token.kind.into(), &self.text[token.range]);
    }

    fn eat_trivia(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.push_token(self.pos);
            self.pos += 1;
        }
    }

    /// Add the current token (and the trivia before it) to the open node.
    fn bump(&mut self) {
        self.eat_trivia();
        if self.pos < self.tokens.len() {
            self.push_token(self.pos);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn start(&mut self, kind: SyntaxKind) {
        self.eat_trivia();
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    fn report(&mut self, message: String) {
        let at = self.nth_index(0).unwrap_or(self.tokens.len());
        if self.last_error_at == Some(at) {
            return;
        }
        self.last_error_at = Some(at);
        self.errors.push(SyntaxError::new(message, self.current_range()));
    }

    /// Report a missing token and leave an empty `ERROR` marker.
    fn missing(&mut self, expected: &str) {
        let message = format!("expected {expected}, found {}", self.describe_current());
        self.report(message);
        self.start(ERROR);
        self.finish_node();
    }

    fn expect(&mut self, kind: SyntaxKind, expected: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.missing(expected);
            false
        }
    }

    /// Report an unexpected token, then skip into an `ERROR` node up to the
    /// next token in `recovery` (or past the next `;`).
    fn recover(&mut self, expected: &str, recovery: &[SyntaxKind]) {
        let message = if self.at(ERROR_TOKEN) {
            format!("unexpected character {}", self.describe_current())
        } else {
            format!("expected {expected}, found {}", self.describe_current())
        };
        self.report(message);

        self.start(ERROR);
        while !self.at_end() && !self.at_any(recovery) {
            let was_semicolon = self.at(SEMICOLON);
            self.bump();
            if was_semicolon {
                break;
            }
        }
        self.finish_node();
    }
}

// ============================================================================
// GRAMMAR
// ============================================================================

pub(super) fn source_file(p: &mut Parser<'_>) {
    p.builder.start_node(SOURCE_FILE.into());

    while !p.at_end() {
        match p.current() {
            IMPORT_KW => import(p),
            SERVICE_KW => service(p),
            TYPE_KW => type_decl(p),
            SEMICOLON => p.bump(),
            OP_KW => {
                p.report("operations must be declared inside a service".to_string());
                p.start(ERROR);
                operation(p);
                p.finish_node();
            }
            _ => p.recover("`import`, `service` or `type`", ITEM_RECOVERY),
        }
    }

    p.eat_trivia();
    p.finish_node();
}

fn name(p: &mut Parser<'_>, what: &str) {
    if p.at(IDENT) {
        p.start(NAME);
        p.bump();
        p.finish_node();
    } else {
        p.missing(&format!("{what} name"));
    }
}

/// `IDENT ('.' IDENT)*`, stopping before a `.*` suffix.
fn path(p: &mut Parser<'_>) {
    p.start(PATH);
    p.expect(IDENT, "identifier");
    while p.at(DOT) && p.nth(1) != STAR {
        p.bump();
        if !p.expect(IDENT, "identifier after `.`") {
            break;
        }
    }
    p.finish_node();
}

fn path_or_missing(p: &mut Parser<'_>, what: &str) {
    if p.at(IDENT) {
        path(p);
    } else {
        p.missing(what);
    }
}

fn import(p: &mut Parser<'_>) {
    p.start(IMPORT);
    p.bump();
    path_or_missing(p, "import path");
    if p.at(DOT) && p.nth(1) == STAR {
        p.bump();
        p.bump();
    }
    if p.at(AS_KW) {
        p.start(ALIAS);
        p.bump();
        p.expect(IDENT, "alias name");
        p.finish_node();
    }
    p.eat(SEMICOLON);
    p.finish_node();
}

fn service(p: &mut Parser<'_>) {
    p.start(SERVICE);
    p.bump();
    name(p, "service");
    if p.at(EXTENDS_KW) {
        p.start(EXTENDS_CLAUSE);
        p.bump();
        path_or_missing(p, "service path");
        p.finish_node();
    }
    if p.at(L_BRACE) {
        service_body(p);
    } else {
        p.missing("`{`");
    }
    p.finish_node();
}

fn service_body(p: &mut Parser<'_>) {
    p.start(SERVICE_BODY);
    p.bump();
    while !p.at(R_BRACE) && !p.at_end() {
        match p.current() {
            OP_KW => operation(p),
            TYPE_KW => type_decl(p),
            SEMICOLON => p.bump(),
            // A new top-level item: the closing brace is missing.
            SERVICE_KW | IMPORT_KW => break,
            _ => p.recover("`op`, `type` or `}`", MEMBER_RECOVERY),
        }
    }
    p.expect(R_BRACE, "`}`");
    p.finish_node();
}

fn operation(p: &mut Parser<'_>) {
    p.start(OPERATION);
    p.bump();
    name(p, "operation");
    if p.at(L_PAREN) {
        param_list(p);
    } else {
        p.missing("`(`");
    }
    if p.at(COLON) {
        p.start(RETURN_TYPE);
        p.bump();
        type_ref(p);
        p.finish_node();
    }
    if p.at(CALLS_KW) {
        p.start(CALLS_CLAUSE);
        p.bump();
        path_or_missing(p, "operation path");
        while p.eat(COMMA) {
            path_or_missing(p, "operation path");
        }
        p.finish_node();
    }
    p.eat(SEMICOLON);
    p.finish_node();
}

fn param_list(p: &mut Parser<'_>) {
    p.start(PARAM_LIST);
    p.bump();
    loop {
        if p.at(R_PAREN) || p.at_end() {
            break;
        }
        if p.at(IDENT) {
            param(p);
        } else if p.at_any(PARAM_STOP) {
            break;
        } else {
            p.recover("parameter", PARAM_RECOVERY);
        }

        if !p.eat(COMMA) && p.at(IDENT) {
            p.missing("`,`");
        }
    }
    p.expect(R_PAREN, "`)`");
    p.finish_node();
}

fn param(p: &mut Parser<'_>) {
    p.start(PARAM);
    name(p, "parameter");
    p.expect(COLON, "`:`");
    type_ref(p);
    p.finish_node();
}

fn type_ref(p: &mut Parser<'_>) {
    p.start(TYPE_REF);
    match p.current() {
        PRIMITIVE_KW => p.bump(),
        IDENT => path(p),
        _ => p.missing("type"),
    }
    if p.at(L_BRACK) {
        p.bump();
        p.expect(R_BRACK, "`]`");
    }
    p.finish_node();
}

fn type_decl(p: &mut Parser<'_>) {
    p.start(TYPE_DECL);
    p.bump();
    name(p, "type");
    if p.eat(EQ) {
        type_ref(p);
        p.eat(SEMICOLON);
    } else if p.at(L_BRACE) {
        type_body(p);
    } else {
        p.missing("`{` or `=`");
    }
    p.finish_node();
}

fn type_body(p: &mut Parser<'_>) {
    p.start(TYPE_BODY);
    p.bump();
    while !p.at(R_BRACE) && !p.at_end() {
        match p.current() {
            IDENT => field(p),
            SEMICOLON => p.bump(),
            OP_KW | TYPE_KW | SERVICE_KW | IMPORT_KW => break,
            _ => p.recover("field", FIELD_RECOVERY),
        }
    }
    p.expect(R_BRACE, "`}`");
    p.finish_node();
}

fn field(p: &mut Parser<'_>) {
    p.start(FIELD);
    name(p, "field");
    p.expect(COLON, "`:`");
    type_ref(p);
    p.eat(SEMICOLON);
    p.finish_node();
}
