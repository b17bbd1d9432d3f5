use std::fmt;

use thiserror::Error;

use crate::token::Span;

/// One recorded parser diagnostic. `message` carries the canonical text;
/// `span` points at the token the parser was looking at.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}:{}: {message}", span.line, span.column)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Every error a parse recorded, in source order. Never empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct ParseErrors(pub Vec<ParseError>);

impl ParseErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.0.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|error| error.message.as_str()).collect()
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.len();
        write!(
            f,
            "parser found {count} error{}",
            if count == 1 { "" } else { "s" }
        )?;
        for error in &self.0 {
            write!(f, "\n\t{error}")?;
        }
        Ok(())
    }
}
