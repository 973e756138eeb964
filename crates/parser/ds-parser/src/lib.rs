//! Parser for D source
//!
//! A hand-written lexer and recursive-descent parser that lowers source
//! text straight into the declaration model. The accepted surface is the
//! part of the language the resolver reasons about: modules and imports,
//! aggregates and templates, aliases, functions, variables, statements and
//! the full expression precedence ladder. Diagnostics accumulate during the
//! walk; a syntax error never aborts the parse, so half-typed editor
//! buffers still produce a module.

pub mod lexer;

mod expressions;
mod items;
mod statements;
mod support;
mod types;

use ds_dom::{Module, ModuleBuilder};
use ds_intern::Interner;
use ds_span::Span;
use lexer::{LexError, Lexer, Token, TokenKind};
use std::path::Path;
use thiserror::Error;

/// Syntax error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Lexing failed
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Something other than what the grammar allows here
    #[error("expected {expected}, found {found} at {span}")]
    Expected {
        /// What would have been accepted
        expected: String,
        /// What was found instead
        found: String,
        /// Where
        span: Span,
    },
}

impl ParseError {
    /// Location of the error
    pub const fn span(&self) -> Span {
        match self {
            Self::Lex(err) => err.span,
            Self::Expected { span, .. } => *span,
        }
    }
}

/// Result of parsing one file
#[derive(Debug)]
pub struct ParseOutput {
    /// The module, complete as far as the source allowed
    pub module: Module,
    /// Every syntax error found
    pub errors: Vec<ParseError>,
}

/// Parse `source` into a module
///
/// The module is named after `file_name`'s stem unless the source starts
/// with a `module a.b;` header.
pub fn parse_module(source: &str, file_name: &str, interner: &Interner) -> ParseOutput {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    let default_name = Path::new(file_name)
        .file_stem()
        .map_or_else(|| file_name.to_owned(), |stem| stem.to_string_lossy().into_owned());

    let mut parser = Parser::new(
        tokens,
        interner,
        ModuleBuilder::new(interner.intern(&default_name), file_name),
    );
    parser.errors.extend(lex_errors.into_iter().map(ParseError::from));
    let (module, errors) = parser.parse_module();

    tracing::debug!(
        module = interner.resolve(module.name),
        declarations = module.decls.len(),
        errors = errors.len(),
        "parsed module"
    );

    ParseOutput { module, errors }
}

struct Parser<'i> {
    tokens: Vec<Token>,
    eof: Token,
    cursor: usize,
    errors: Vec<ParseError>,
    interner: &'i Interner,
    builder: ModuleBuilder,
}

impl<'i> Parser<'i> {
    fn new(tokens: Vec<Token>, interner: &'i Interner, builder: ModuleBuilder) -> Self {
        let eof = Token {
            kind: TokenKind::Eof,
            span: tokens.last().map(|token| token.span).unwrap_or_default(),
        };
        Self {
            tokens,
            eof,
            cursor: 0,
            errors: Vec::new(),
            interner,
            builder,
        }
    }
}

#[cfg(test)]
mod tests;
