//! Adapter-level errors.
//!
//! Every failure that prevents a command from being judged is one [`AdapterError`]. Each variant
//! maps to a canonical kind from `babeltest_core::lang::errors` and becomes a `status:"error"`
//! result for that command only; nothing here aborts the command loop.

use babeltest_core::Raised;
use babeltest_core::lang::errors::{self, ErrorKind};
use miette::Diagnostic;
use thiserror::Error;

use crate::diagnostics::DiagnosticContext;
use crate::protocol::ErrorInfo;

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum AdapterError {
    #[error("{message}")]
    #[diagnostic(code(babeltest::resolution))]
    Resolution {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(babeltest::construction))]
    Construction {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(
        code(babeltest::coercion),
        help("check the `given` values and `types` hints against the target's parameters")
    )]
    Coercion { message: String },

    #[error("{message}")]
    #[diagnostic(code(babeltest::mock_install))]
    MockInstall { message: String },

    /// The target raised and the test did not declare `throws`.
    #[error("{raised}")]
    #[diagnostic(code(babeltest::invocation))]
    Invocation { raised: Raised },

    #[error("Test timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(babeltest::timeout),
        help("raise `timeoutMs` or make the target faster; blocking calls keep running in the background")
    )]
    Timeout { timeout_ms: u64 },

    #[error("{message}")]
    #[diagnostic(code(babeltest::protocol))]
    Protocol { message: String },
}

impl AdapterError {
    /// Resolution failure rendered with the accumulated search trace.
    pub fn resolution(summary: &str, ctx: &DiagnosticContext) -> Self {
        AdapterError::Resolution {
            message: ctx.format_error(summary),
            help: ctx.first_suggestion(),
        }
    }

    /// Construction failure rendered with the accumulated search trace.
    pub fn construction(summary: &str, ctx: &DiagnosticContext) -> Self {
        AdapterError::Construction {
            message: ctx.format_error(summary),
            help: ctx.first_suggestion(),
        }
    }

    /// Construction failure without a search trace (a builder or constructor raised).
    pub fn construction_raised(summary: impl Into<String>) -> Self {
        AdapterError::Construction {
            message: summary.into(),
            help: None,
        }
    }

    pub fn coercion(message: impl Into<String>) -> Self {
        AdapterError::Coercion {
            message: message.into(),
        }
    }

    pub fn mock_install(message: impl Into<String>) -> Self {
        AdapterError::MockInstall {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        AdapterError::Protocol {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Resolution { .. } => ErrorKind::Resolution,
            AdapterError::Construction { .. } => ErrorKind::Construction,
            AdapterError::Coercion { .. } => ErrorKind::Coercion,
            AdapterError::MockInstall { .. } => ErrorKind::MockInstall,
            AdapterError::Invocation { .. } => ErrorKind::Invocation,
            AdapterError::Timeout { .. } => ErrorKind::Timeout,
            AdapterError::Protocol { .. } => ErrorKind::Protocol,
        }
    }

    /// The `error.type` reported on the wire.
    ///
    /// Invocation errors report the raised kind (`ArgumentException`), everything else its
    /// canonical adapter kind.
    pub fn type_name(&self) -> &str {
        match self {
            AdapterError::Invocation { raised } => &raised.kind,
            other => errors::as_str(other.kind()),
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            kind: self.type_name().to_string(),
            message: self.to_string(),
            stack: match self {
                AdapterError::Invocation { raised } => raised.stack.clone(),
                _ => None,
            },
        }
    }
}
