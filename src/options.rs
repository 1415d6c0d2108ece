use crate::syntax::Goal;

/// Limits applied by an [`Agent`](crate::core::Agent) while evaluating.
/// `None` leaves the corresponding resource unbounded.
#[derive(Clone, Debug, Default)]
pub struct AgentOptions {
    /// Execution contexts allowed on the stack before a RangeError is thrown.
    /// Without a limit, runaway recursion is bounded only by the native stack.
    pub max_call_depth: Option<usize>,
    /// Iterations a single loop may run before a RangeError is thrown.
    pub max_loop_iterations: Option<usize>,
}

/// Per-file metadata handed over together with the source text.
#[derive(Clone, Debug)]
pub struct SourceOptions {
    /// Module specifier or script name, used in diagnostics.
    pub name: String,
    pub goal: Goal,
    /// Evaluate script code as if it started with a `"use strict"` directive.
    pub strict: bool,
}

impl SourceOptions {
    pub fn script(name: impl Into<String>) -> Self {
        SourceOptions {
            name: name.into(),
            goal: Goal::Script,
            strict: false,
        }
    }

    pub fn module(name: impl Into<String>) -> Self {
        SourceOptions {
            name: name.into(),
            goal: Goal::Module,
            strict: true,
        }
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        SourceOptions::script("<script>")
    }
}
