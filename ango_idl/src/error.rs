use std::fmt;

use thiserror::Error;

/// What went wrong while parsing a definition file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Error)]
pub enum ParseErrorKind {
    #[error("invalid name definition")]
    InvalidNameDefinition,
    #[error("invalid procedure definition")]
    InvalidProcedureDefinition,
    #[error("invalid type definition")]
    InvalidTypeDefinition,
    #[error("invalid parameter definition (argument or return value)")]
    InvalidParameter,
    #[error("duplicate procedure identifier")]
    DuplicateProcedureIdentifier,
    #[error("duplicate parameter identifier (argument or return value)")]
    DuplicateParameterIdentifier,
    #[error("unexpected return parameters (oneway procedure?)")]
    UnexpectedReturnParameters,
    #[error("empty return group")]
    EmptyReturnGroup,
    #[error("unknown statement")]
    UnknownStatement,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("reader error")]
    Reader,
}

/// A fatal parse error. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line the error was found on.
    pub line: usize,
    pub detail: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize) -> Self {
        ParseError {
            kind,
            line,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error on line {}: {}", self.line, self.kind)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}
