//! Error types for engine-runtime failures.
//!
//! `ScriptError` covers only the outcomes a protected call can absorb.
//! Stack or index misuse by an embedder is a programming error and panics
//! at the offending call site instead of surfacing here.

/// Result alias for operations that can fail at script runtime.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// A failure raised while running script-side code.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    /// Error raised by a script function (`Engine::raise` or a handler `Err`)
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The callee slot of a protected call did not hold a function
    #[error("attempt to call a {0} value")]
    NotCallable(&'static str),

    /// An index passed from script code was outside the valid range
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Index the script supplied
        index: i64,
        /// Number of valid elements
        len: usize,
    },
}
