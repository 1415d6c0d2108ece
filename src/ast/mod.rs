//! Semantic nodes. Each raw syntax node is wrapped once: static semantics and
//! early errors are computed at wrap time and stored in immutable fields, and
//! every node carries an `evaluate` method implementing its runtime semantics.

mod bindings;
mod classes;
mod expressions;
mod functions;
mod modules;
mod statements;

pub use bindings::*;
pub use classes::*;
pub use expressions::*;
pub use functions::*;
pub use modules::*;
pub use statements::*;

use crate::JSError;
use crate::core::{NodeId, Realm};
use crate::raise_syntax_error;
use crate::syntax::{self, Span};
use std::rc::Rc;

bitflags::bitflags! {
    /// Syntactic context a node is wrapped in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Context: u16 {
        const STRICT = 1;
        const MODULE = 1 << 1;
        /// `return` is allowed.
        const IN_FUNCTION = 1 << 2;
        /// `super.x` is allowed.
        const SUPER_PROPERTY = 1 << 3;
        /// `super(...)` is allowed.
        const SUPER_CALL = 1 << 4;
        /// `arguments` is forbidden.
        const IN_CLASS_FIELD = 1 << 5;
        /// `new.target` is allowed.
        const NEW_TARGET = 1 << 6;
    }
}

/// Identity and position of a semantic node. `parent` is the id of the
/// enclosing node, a non-owning back reference.
#[derive(Clone, Copy, Debug)]
pub struct NodeInfo {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub span: Span,
}

macro_rules! log_evaluate {
    ($kind:literal, $info:expr, $agent:expr) => {
        log::debug!("{}#{} Evaluate(#{})", $kind, $info.id, $agent.context_id())
    };
}
pub(crate) use log_evaluate;

struct LabelEntry {
    name: Rc<str>,
    iteration: bool,
}

#[derive(Default)]
struct FunctionScope {
    is_arrow: bool,
    uses_arguments: bool,
    labels: Vec<LabelEntry>,
    breakable: usize,
    iteration: usize,
}

/// Wrap-time state threaded through node construction.
/// Deepest node nesting the wrap step accepts. Wrapping and evaluation both recurse
/// once per level, so this bounds native stack use for generated or hostile sources.
pub const MAX_NODE_DEPTH: usize = 256;

pub(crate) struct Cx<'a> {
    pub realm: &'a Rc<Realm>,
    pub source: &'a str,
    pub flags: Context,
    parents: Vec<NodeId>,
    functions: Vec<FunctionScope>,
}

impl<'a> Cx<'a> {
    pub fn new(realm: &'a Rc<Realm>, source: &'a str, flags: Context) -> Self {
        Cx {
            realm,
            source,
            flags,
            parents: Vec::new(),
            functions: vec![FunctionScope::default()],
        }
    }

    /// Registers a node and makes it the parent of nodes wrapped until [`Cx::end`].
    fn begin(&mut self, span: Span) -> NodeInfo {
        let info = NodeInfo {
            id: self.realm.register_node(),
            parent: self.parents.last().copied(),
            depth: self.parents.len(),
            span,
        };
        self.parents.push(info.id);
        info
    }

    pub fn end(&mut self) {
        self.parents.pop();
    }

    /// Wraps one node: `f` receives the node's info while its children are wrapped.
    pub fn node<T>(&mut self, span: Span, f: impl FnOnce(&mut Self, NodeInfo) -> Result<T, JSError>) -> Result<T, JSError> {
        if self.parents.len() >= MAX_NODE_DEPTH {
            return Err(raise_syntax_error!("Expression nested too deeply at line {}", span.line));
        }
        let info = self.begin(span);
        let result = f(self, info);
        self.end();
        result
    }

    pub fn strict(&self) -> bool {
        self.flags.contains(Context::STRICT)
    }

    /// The source text covered by `span`.
    pub fn text(&self, span: Span) -> Rc<str> {
        Rc::from(self.source.get(span.start..span.end).unwrap_or(""))
    }

    /// Runs `f` with the context flags replaced by `flags`.
    pub fn with_flags<T>(&mut self, flags: Context, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.flags, flags);
        let result = f(self);
        self.flags = saved;
        result
    }

    pub fn enter_function(&mut self, is_arrow: bool) {
        self.functions.push(FunctionScope {
            is_arrow,
            ..Default::default()
        });
    }

    /// Leaves the innermost function scope; returns whether it referenced `arguments`.
    pub fn leave_function(&mut self) -> bool {
        self.functions.pop().is_some_and(|scope| scope.uses_arguments)
    }

    /// Records a reference to `arguments` on every scope up to the nearest non-arrow function.
    pub fn mark_arguments(&mut self) {
        for scope in self.functions.iter_mut().rev() {
            scope.uses_arguments = true;
            if !scope.is_arrow {
                break;
            }
        }
    }

    fn scope(&mut self) -> &mut FunctionScope {
        if self.functions.is_empty() {
            self.functions.push(FunctionScope::default());
        }
        let last = self.functions.len() - 1;
        &mut self.functions[last]
    }

    pub fn push_label(&mut self, name: &str, iteration: bool) -> Result<(), JSError> {
        let scope = self.scope();
        if scope.labels.iter().any(|label| &*label.name == name) {
            return Err(raise_syntax_error!("Label '{name}' has already been declared"));
        }
        scope.labels.push(LabelEntry {
            name: Rc::from(name),
            iteration,
        });
        Ok(())
    }

    pub fn pop_label(&mut self) {
        self.scope().labels.pop();
    }

    pub fn enter_breakable(&mut self, iteration: bool) {
        let scope = self.scope();
        scope.breakable += 1;
        if iteration {
            scope.iteration += 1;
        }
    }

    pub fn leave_breakable(&mut self, iteration: bool) {
        let scope = self.scope();
        scope.breakable -= 1;
        if iteration {
            scope.iteration -= 1;
        }
    }

    pub fn check_break(&mut self, label: Option<&str>) -> Result<(), JSError> {
        let scope = self.scope();
        match label {
            Some(name) if !scope.labels.iter().any(|l| &*l.name == name) => Err(raise_syntax_error!("Undefined label '{name}'")),
            None if scope.breakable == 0 => Err(raise_syntax_error!("Illegal break statement")),
            _ => Ok(()),
        }
    }

    pub fn check_continue(&mut self, label: Option<&str>) -> Result<(), JSError> {
        let scope = self.scope();
        if scope.iteration == 0 {
            return Err(raise_syntax_error!("Illegal continue statement: no surrounding iteration statement"));
        }
        match label {
            Some(name) if !scope.labels.iter().any(|l| &*l.name == name && l.iteration) => Err(raise_syntax_error!(
                "Illegal continue statement: '{name}' does not denote an iteration statement"
            )),
            _ => Ok(()),
        }
    }
}

/// Whether the directive prologue of `body` contains an exact `"use strict"`.
pub(crate) fn has_use_strict_directive(cx: &Cx, body: &[syntax::Statement]) -> bool {
    for statement in body {
        let syntax::StatementKind::Expression(expr) = &statement.kind else {
            return false;
        };
        if !matches!(expr.kind, syntax::ExprKind::String(_)) {
            return false;
        }
        let raw = cx.text(expr.span);
        if &*raw == "\"use strict\"" || &*raw == "'use strict'" {
            return true;
        }
    }
    false
}

/// Names that may never be bound in strict code.
pub(crate) fn check_binding_identifier(cx: &Cx, name: &str) -> Result<(), JSError> {
    if cx.strict() && (name == "eval" || name == "arguments") {
        return Err(raise_syntax_error!("Unexpected eval or arguments in strict mode"));
    }
    Ok(())
}

/// Fails with an early SyntaxError when `names` contains a duplicate.
pub(crate) fn check_duplicates(names: &[Rc<str>]) -> Result<(), JSError> {
    for (index, name) in names.iter().enumerate() {
        if names[..index].contains(name) {
            return Err(raise_syntax_error!("Identifier '{name}' has already been declared"));
        }
    }
    Ok(())
}
