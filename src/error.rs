use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum TomlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Tokenization(#[from] TokenizationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parsing(#[from] ParsingError),
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum TokenizationError {
    #[error("No lexical pattern matched the input")]
    #[diagnostic(
        code(tokenizer::no_match),
        help("The text at line {line}, column {column} does not start any recognized token.")
    )]
    NoMatch {
        #[source_code]
        src: NamedSource<String>,
        #[label("Unrecognized input starting with {excerpt:?}")]
        span: SourceSpan,
        excerpt: String,
        line: usize,
        column: usize,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParsingError {
    #[error("Unexpected token")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected}, but found this")]
        span: SourceSpan,
        expected: String,
    },

    #[error("Token is not legal in the current parser state")]
    #[diagnostic(
        code(parser::illegal_state),
        help("Statements must be completed before the next one starts; check for a missing newline, bracket or assignment.")
    )]
    IllegalState {
        #[source_code]
        src: NamedSource<String>,
        #[label("Legal only when the parser state is one of {expected}, but it was {state}")]
        span: SourceSpan,
        expected: String,
        state: String,
    },

    #[error("Unexpected end of input")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("The document ended in the middle of a statement. The parser expected more tokens.")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,
        #[label("Input ended unexpectedly here")]
        span: SourceSpan,
    },

    #[error("Conflicting document structure")]
    #[diagnostic(
        code(parser::structure),
        help("A statement tried to redeclare or reshape a part of the document that was already built.")
    )]
    Structure {
        #[source_code]
        src: NamedSource<String>,
        #[label("{conflict}")]
        span: SourceSpan,
        conflict: StructureError,
    },
}

/// A structural conflict in the document tree, raised while inserting values
/// or resolving headers. Carries no span of its own; the parser wraps it in
/// [`ParsingError::Structure`] with the offending token's location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("key `{key}` is already defined")]
    DuplicateKey { key: String },

    #[error("`{key}` was declared as an inline table and is closed to further keys")]
    SealedTable { key: String },

    #[error("`{key}` is not a table")]
    NotATable { key: String },

    #[error("`{key}` is not an array of tables")]
    NotATableArray { key: String },

    #[error("`{key}` does not exist")]
    MissingKey { key: String },

    #[error("key has no segments")]
    EmptyKey,
}
