//! Errors raised while resolving or encoding a module.

/// Errors that can occur during binary encoding.
///
/// Every variant aborts the whole encode; no partial output is produced.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A defined function's body has no instructions at all.
    #[error("function {function} has an empty body")]
    EmptyFunctionBody { function: u32 },
    /// A defined function's body does not end with `end`. `last` is the
    /// final instruction as text.
    #[error("function {function} body ends with `{last}`, expected `end`")]
    UnterminatedFunctionBody { function: u32, last: String },
    /// A function reserved with `declare_function` never received a body.
    #[error("function {function} was declared but never given a body")]
    MissingFunctionBody { function: u32 },
    /// A defined global's initializer has no instructions.
    #[error("global {global} has an empty initializer")]
    EmptyGlobalInitializer { global: u32 },
    /// A defined global's initializer does not end with `end`.
    #[error("global {global} initializer ends with `{last}`, expected `end`")]
    UnterminatedGlobalInitializer { global: u32, last: String },
    /// A function handle that this module did not issue, or one past its arena.
    #[error("unknown function handle: {0}")]
    UnknownFunction(u32),
    /// A memory handle that this module did not issue.
    #[error("unknown memory handle: {0}")]
    UnknownMemory(u32),
    /// A global handle that this module did not issue.
    #[error("unknown global handle: {0}")]
    UnknownGlobal(u32),
    /// Writing the encoded module to a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EncodeError::UnterminatedFunctionBody {
            function: 3,
            last: "i32.add".to_string(),
        };
        assert_eq!(err.to_string(), "function 3 body ends with `i32.add`, expected `end`");
        assert_eq!(EncodeError::UnknownGlobal(7).to_string(), "unknown global handle: 7");
    }
}
