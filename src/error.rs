#[derive(thiserror::Error, Debug)]
pub enum JSError {
    #[error("Tokenization failed at {line}:{column}: {message}")]
    TokenizationError { message: String, line: usize, column: usize },

    #[error("Parsing failed at {line}:{column}: {message} ({method} {file}:{rust_line})")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
        file: String,
        rust_line: usize,
        method: String,
    },

    /// Early error detected while wrapping the syntax tree, before any evaluation.
    #[error("SyntaxError: {message}")]
    SyntaxError { message: String },

    #[error("Cannot resolve module '{specifier}' imported from '{referrer}'")]
    ModuleNotFound { specifier: String, referrer: String },

    /// An uncaught throw completion surfaced through the convenience API.
    #[error("Uncaught {message}")]
    Throw { message: String },

    /// A host-level invariant was violated (malformed node shapes, misuse of the agent).
    #[error("Internal error at {method} {file}:{line}: {message}")]
    InternalError {
        message: String,
        file: String,
        line: usize,
        method: String,
    },
}

impl JSError {
    pub fn message(&self) -> String {
        match self {
            JSError::TokenizationError { message, .. }
            | JSError::ParseError { message, .. }
            | JSError::SyntaxError { message }
            | JSError::Throw { message }
            | JSError::InternalError { message, .. } => message.clone(),
            JSError::ModuleNotFound { .. } => self.to_string(),
        }
    }

    pub fn is_syntax_error(&self) -> bool {
        matches!(self, JSError::SyntaxError { .. } | JSError::ParseError { .. } | JSError::TokenizationError { .. })
    }
}

// Macros (rather than functions) so that `file!()` and `line!()` expand to the
// site where the error is raised.
#[macro_export]
macro_rules! raise_tokenize_error {
    ($msg:expr, $line:expr, $column:expr) => {
        $crate::JSError::TokenizationError {
            message: $msg.to_string(),
            line: $line,
            column: $column,
        }
    };
}

#[macro_export]
macro_rules! raise_parse_error {
    ($msg:expr, $token:expr) => {
        $crate::JSError::ParseError {
            message: $msg.to_string(),
            line: $token.line,
            column: $token.column,
            file: file!().to_string(),
            rust_line: line!() as usize,
            method: $crate::function_name!().to_string(),
        }
    };
}

#[macro_export]
macro_rules! raise_syntax_error {
    ($($arg:tt)*) => {
        $crate::JSError::SyntaxError {
            message: format!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! raise_internal_error {
    ($msg:expr) => {
        $crate::JSError::InternalError {
            message: $msg.to_string(),
            file: file!().to_string(),
            line: line!() as usize,
            method: $crate::function_name!().to_string(),
        }
    };
}

#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        // remove the trailing "::f"
        &name[..name.len() - 3]
    }};
}
