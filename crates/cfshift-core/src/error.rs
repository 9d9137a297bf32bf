//! Error types for cfshift-core

use thiserror::Error;

/// Result type alias for cfshift-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cfshift-core
#[derive(Error, Debug)]
pub enum Error {
    /// An intrinsic function appeared outside its permitted nesting scope
    #[error("{function} is not allowed here")]
    IllegalFunctionContext {
        /// Name of the offending function
        function: String,
    },

    /// An intrinsic function has no entry in the dispatch table
    #[error("unknown intrinsic function {function}")]
    UnknownFunction {
        /// Name of the unregistered function
        function: String,
    },

    /// A resolver received a malformed argument
    #[error("invalid argument to {function}: {message}")]
    BadArgument {
        /// Name of the function that rejected the argument
        function: &'static str,
        /// Description of what's wrong
        message: String,
    },

    /// A reference names a block that does not exist in the registry
    #[error("no terraform block found for {name}")]
    LookupMiss {
        /// Identifier that failed to resolve
        name: String,
    },

    /// Template nesting exceeded the recursion guard
    #[error("template nesting exceeds {limit} levels")]
    NestingTooDeep {
        /// The enforced depth limit
        limit: usize,
    },

    /// The template is structurally invalid
    #[error("invalid template: {message}")]
    Template {
        /// Description of the problem
        message: String,
    },

    /// Failed to parse the template YAML
    #[error("failed to parse template: {0}")]
    TemplateParse(#[from] serde_yaml::Error),

    /// A block failed to render to HCL
    #[error("failed to render block: {message}")]
    Render {
        /// Description of the problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
