//! The compiler's diagnostic type. Every error kind in SPEC_FULL.md §7 is
//! immediately fatal: there is no recovery, so `CompileError` is a plain
//! `Result` error rather than something accumulated across a pass, unlike
//! the teacher's `Diagnostic` (which the device-tree analyzer collects by
//! the dozen per file). The `?`-prefixed, ring-buffer-suffixed rendering
//! and the exit code are fixed by the external interface in SPEC_FULL.md §6.

use crate::ebnfc::reader::Position;
use std::fmt::{self, Display, Formatter};
use strum::AsRefStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    UnexpectedEof,
    UnterminatedStringLiteral,
    EmptyStringLiteral,
    MalformedCharacterClass,
    ExpectedHexDigit,
    ExpectedToken,
    ExpectedExpression,
    ExpectedIdentifier,
    UnresolvedProduction,
    Io,
    Argument,
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub code: ErrorCode,
    message: String,
    /// Present for lexical/syntactic errors raised while reading input;
    /// absent for name-resolution errors raised after parsing completes.
    context: Option<String>,
}

impl CompileError {
    /// A lexical/syntactic error tied to a reader position and ring-buffer
    /// context, matching the original `report()` contract: `"<msg> in
    /// <position>"` followed by the recently-read characters on their own
    /// line.
    pub fn positional(code: ErrorCode, message: impl Into<String>, pos: Position, context: String) -> CompileError {
        CompileError {
            code,
            message: format!("{} in {}", message.into(), pos),
            context: Some(context),
        }
    }

    /// A semantic (name-resolution) error, with no reader context.
    pub fn semantic(code: ErrorCode, message: impl Into<String>) -> CompileError {
        CompileError {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn io(err: std::io::Error) -> CompileError {
        CompileError {
            code: ErrorCode::Io,
            message: err.to_string(),
            context: None,
        }
    }

    pub fn argument(message: impl Into<String>) -> CompileError {
        CompileError {
            code: ErrorCode::Argument,
            message: message.into(),
            context: None,
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "? {}", self.message)?;
        if let Some(context) = &self.context {
            write!(f, "\n{}", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, CompileError>;
