//! Error types for websh

use rquickjs::{Ctx, Exception};
use thiserror::Error;

/// Result type alias for websh operations
pub type WebshResult<T> = Result<T, WebshError>;

/// Contract violations raised at a capability boundary.
///
/// Every variant except [`CapabilityError::Engine`] is thrown into the script
/// as an `Error` whose `name` is the variant name, so scripts can catch and
/// inspect it (`e.name === "FileNotFound"`).
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// Wrong number of arguments
    #[error("{op}: expected {expected} argument(s), got {got}")]
    Arity {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// Malformed call that is not a plain arity mismatch
    #[error("{op}: {reason}")]
    Argument { op: &'static str, reason: String },

    /// The file object has no usable `name`
    #[error("{op}: invalid file")]
    InvalidFile { op: &'static str },

    /// The named file could not be opened
    #[error("{op}: file not found: {path}")]
    FileNotFound { op: &'static str, path: String },

    /// A required completion property is not set
    #[error("{op}: {property} callback not defined")]
    MissingCallback {
        op: &'static str,
        property: &'static str,
    },

    /// A value does not have the shape the host expects
    #[error("{context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: String,
    },

    /// An engine error or an exception already pending in the engine
    #[error(transparent)]
    Engine(#[from] rquickjs::Error),
}

impl CapabilityError {
    /// The `name` the thrown script error carries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arity { .. } => "ArityError",
            Self::Argument { .. } => "ArgumentError",
            Self::InvalidFile { .. } => "InvalidFile",
            Self::FileNotFound { .. } => "FileNotFound",
            Self::MissingCallback { .. } => "MissingCallback",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::Engine(_) => "Error",
        }
    }

    /// Raise this error as a script exception.
    ///
    /// Engine errors are handed back untouched so an exception thrown by a
    /// script callback keeps propagating as the script threw it.
    pub fn throw(self, ctx: &Ctx<'_>) -> rquickjs::Error {
        let name = self.name();
        let message = match self {
            Self::Engine(err) => return err,
            other => other.to_string(),
        };
        let exception = match Exception::from_message(ctx.clone(), &message) {
            Ok(exception) => exception,
            Err(err) => return err,
        };
        if let Err(err) = exception.as_object().set("name", name) {
            return err;
        }
        ctx.throw(exception.into_object().into_value())
    }
}

/// Terminal failures of one execution session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The script did not compile
    #[error("compile error: {0}")]
    Compile(String),

    /// The script threw while running its top-level statements
    #[error("runtime error: {0}")]
    Runtime(String),

    /// `main` threw
    #[error("error calling main(): {0}")]
    Main(String),

    /// Host-side failure while preparing the context or building values
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors of the shell process itself.
#[derive(Error, Debug)]
pub enum WebshError {
    /// The engine runtime could not be initialized
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// IO error (reading input, writing output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line editor failure
    #[error("Readline error: {0}")]
    Readline(String),
}
