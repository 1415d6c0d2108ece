//! Statements, declaration scopes and scripts.

use super::{
    ClassDeclaration, Context, Cx, ExportPosition, Expression, FunctionDeclaration, NodeInfo, Pattern, check_duplicates,
    has_use_strict_directive, log_evaluate, resolve_binding_in,
};
use crate::JSError;
use crate::core::{
    Abrupt, Agent, Completion, Environment, Object, PropertyKey, Realm, ScriptOrModule, Value, get_iterator, iterator_close,
    iterator_step_value, strict_equality_comparison, throw_range_error, throw_syntax_error, throw_type_error, to_boolean, to_object,
    update_empty,
};
use crate::options::SourceOptions;
use crate::raise_syntax_error;
use crate::syntax::{self, VariableKind};
use std::rc::Rc;

/// A name bound by `let`, `const`, `class` or a block-level function.
#[derive(Clone, Debug)]
pub struct LexicalBinding {
    pub name: Rc<str>,
    pub constant: bool,
}

/// The declarations instantiated when a statement list's scope is entered.
#[derive(Default)]
pub struct Scope {
    /// VarDeclaredNames, deduplicated; hoisted function names are included when functions are var scoped.
    pub var_names: Vec<Rc<str>>,
    /// Functions to initialize. For var-scoped functions the last declaration of a name wins.
    pub functions: Vec<Rc<FunctionDeclaration>>,
    pub lexical: Vec<LexicalBinding>,
}

impl Scope {
    /// Collects the declarations of one scope and applies the redeclaration early errors.
    pub(crate) fn analyze<'a>(statements: impl IntoIterator<Item = &'a Statement>, var_scoped_functions: bool) -> Result<Scope, JSError> {
        Scope::analyze_with(statements, var_scoped_functions, Vec::new())
    }

    pub(crate) fn analyze_with<'a>(
        statements: impl IntoIterator<Item = &'a Statement>,
        var_scoped_functions: bool,
        extra_lexical: Vec<LexicalBinding>,
    ) -> Result<Scope, JSError> {
        let mut scope = Scope {
            lexical: extra_lexical,
            ..Default::default()
        };
        let mut var_names = Vec::new();
        for statement in statements {
            match statement {
                Statement::Variable(declaration) if declaration.kind != VariableKind::Var => {
                    let constant = declaration.kind == VariableKind::Const;
                    for name in declaration.bound_names() {
                        scope.lexical.push(LexicalBinding { name, constant });
                    }
                }
                Statement::Class(class) => {
                    for declaration in class.lexically_scoped_declarations() {
                        for name in declaration.bound_names() {
                            scope.lexical.push(LexicalBinding { name, constant: false });
                        }
                    }
                }
                Statement::Function(function) if var_scoped_functions => {
                    let name = function.bound_name();
                    var_names.push(name.clone());
                    scope.functions.retain(|existing| existing.bound_name() != name);
                    scope.functions.push(function.clone());
                }
                Statement::Function(function) => {
                    scope.lexical.push(LexicalBinding {
                        name: function.bound_name(),
                        constant: false,
                    });
                    scope.functions.push(function.clone());
                }
                other => other.var_declared_names(&mut var_names),
            }
        }
        for name in var_names {
            if !scope.var_names.contains(&name) {
                scope.var_names.push(name);
            }
        }

        let lexical_names = scope.lexically_declared_names();
        if lexical_names.iter().any(|name| &**name == "let") {
            return Err(raise_syntax_error!("let is disallowed as a lexically bound name"));
        }
        check_duplicates(&lexical_names)?;
        if let Some(name) = lexical_names.iter().find(|name| scope.var_names.contains(name)) {
            return Err(raise_syntax_error!("Identifier '{name}' has already been declared"));
        }
        Ok(scope)
    }

    /// LexicallyDeclaredNames
    pub fn lexically_declared_names(&self) -> Vec<Rc<str>> {
        self.lexical.iter().map(|binding| binding.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty() && self.functions.is_empty()
    }

    /// Creates the (uninitialized) lexical bindings in `env`.
    pub fn create_lexical_bindings(&self, agent: &mut Agent, env: &Environment) -> Completion<()> {
        for binding in &self.lexical {
            if binding.constant {
                env.create_immutable_binding(agent, &binding.name, true)?;
            } else {
                env.create_mutable_binding(agent, &binding.name, false)?;
            }
        }
        Ok(())
    }

    /// BlockDeclarationInstantiation(code, env): lexical bindings plus block-level functions.
    pub fn instantiate_block(&self, agent: &mut Agent, env: &Environment) -> Completion<()> {
        self.create_lexical_bindings(agent, env)?;
        for function in &self.functions {
            let object = function.instantiate(agent, env);
            env.initialize_binding(agent, &function.bound_name(), Value::Object(object))?;
        }
        Ok(())
    }
}

/// A statement list together with its scope.
#[derive(Default)]
pub struct StatementList {
    pub statements: Vec<Statement>,
    pub scope: Scope,
}

impl StatementList {
    pub(crate) fn wrap(cx: &mut Cx, statements: &[syntax::Statement], var_scoped_functions: bool) -> Result<StatementList, JSError> {
        let statements = statements
            .iter()
            .map(|statement| Statement::wrap(cx, statement))
            .collect::<Result<Vec<_>, _>>()?;
        let scope = Scope::analyze(&statements, var_scoped_functions)?;
        Ok(StatementList { statements, scope })
    }

    /// Evaluates the statements in order, applying UpdateEmpty to the last value produced.
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        evaluate_statements(agent, &self.statements, None)
    }
}

fn evaluate_statements(agent: &mut Agent, statements: &[Statement], mut last: Option<Value>) -> Completion<Option<Value>> {
    for statement in statements {
        match statement.evaluate(agent) {
            Ok(Some(value)) => last = Some(value),
            Ok(None) => {}
            Err(abrupt) => return Err(abrupt.update_empty(last)),
        }
    }
    Ok(last)
}

pub enum Statement {
    Variable(VariableDeclaration),
    Function(Rc<FunctionDeclaration>),
    Class(Box<ClassDeclaration>),
    Expression(ExpressionStatement),
    Block(BlockStatement),
    Empty(NodeInfo),
    Debugger(NodeInfo),
    If(Box<IfStatement>),
    For(Box<ForStatement>),
    ForInOf(Box<ForInOfStatement>),
    While(Box<WhileStatement>),
    DoWhile(Box<DoWhileStatement>),
    Switch(SwitchStatement),
    Break(BreakStatement),
    Continue(ContinueStatement),
    Labeled(Box<LabeledStatement>),
    Return(ReturnStatement),
    Throw(ThrowStatement),
    Try(TryStatement),
}

/// Whether `statement`, looking through labels, is an iteration statement.
fn is_iteration(statement: &syntax::Statement) -> bool {
    use syntax::StatementKind as K;
    match &statement.kind {
        K::For { .. } | K::ForIn(..) | K::ForOf(..) | K::While(..) | K::DoWhile(..) => true,
        K::Labeled(_, body) => is_iteration(body),
        _ => false,
    }
}

fn wrap_loop_body(cx: &mut Cx, body: &syntax::Statement) -> Result<Statement, JSError> {
    cx.enter_breakable(true);
    let body = Statement::wrap(cx, body);
    cx.leave_breakable(true);
    body
}

/// Early errors shared by loops with a lexical head.
fn check_lexical_head(names: &[Rc<str>], body: &Statement) -> Result<(), JSError> {
    if names.iter().any(|name| &**name == "let") {
        return Err(raise_syntax_error!("let is disallowed as a lexically bound name"));
    }
    check_duplicates(names)?;
    let mut var_names = Vec::new();
    body.var_declared_names(&mut var_names);
    if let Some(name) = names.iter().find(|name| var_names.contains(name)) {
        return Err(raise_syntax_error!("Identifier '{name}' has already been declared"));
    }
    Ok(())
}

impl Statement {
    pub(crate) fn wrap(cx: &mut Cx, statement: &syntax::Statement) -> Result<Statement, JSError> {
        use syntax::StatementKind as K;
        let span = statement.span;
        Ok(match &statement.kind {
            K::Variable(kind, declarators) => Statement::Variable(VariableDeclaration::wrap(cx, span, *kind, declarators)?),
            K::Function(function) => Statement::Function(FunctionDeclaration::wrap(cx, function)?),
            K::Class(class) => Statement::Class(Box::new(ClassDeclaration::wrap(cx, class, ExportPosition::NotExported)?)),
            K::Expression(expr) => Statement::Expression(cx.node(span, |cx, info| {
                Ok(ExpressionStatement {
                    info,
                    expression: Expression::wrap(cx, expr)?,
                })
            })?),
            K::Block(body) => Statement::Block(BlockStatement::wrap(cx, span, body)?),
            K::Empty => Statement::Empty(cx.node(span, |_, info| Ok(info))?),
            K::Debugger => Statement::Debugger(cx.node(span, |_, info| Ok(info))?),
            K::If(test, consequent, alternate) => Statement::If(Box::new(cx.node(span, |cx, info| {
                Ok(IfStatement {
                    info,
                    test: Expression::wrap(cx, test)?,
                    consequent: Statement::wrap(cx, consequent)?,
                    alternate: alternate.as_ref().map(|alternate| Statement::wrap(cx, alternate)).transpose()?,
                })
            })?)),
            K::For { init, test, update, body } => Statement::For(Box::new(cx.node(span, |cx, info| {
                let init = match init {
                    Some(syntax::ForInit::Variable(kind, declarators)) => {
                        Some(ForInitializer::Variable(VariableDeclaration::wrap(cx, span, *kind, declarators)?))
                    }
                    Some(syntax::ForInit::Expression(expr)) => Some(ForInitializer::Expression(Expression::wrap(cx, expr)?)),
                    None => None,
                };
                let for_statement = ForStatement {
                    info,
                    test: test.as_ref().map(|test| Expression::wrap(cx, test)).transpose()?,
                    update: update.as_ref().map(|update| Expression::wrap(cx, update)).transpose()?,
                    body: wrap_loop_body(cx, body)?,
                    init,
                };
                if let Some(ForInitializer::Variable(declaration)) = &for_statement.init
                    && declaration.kind != VariableKind::Var
                {
                    check_lexical_head(&declaration.bound_names(), &for_statement.body)?;
                }
                Ok(for_statement)
            })?)),
            K::ForIn(head, subject, body) => Statement::ForInOf(Box::new(ForInOfStatement::wrap(cx, span, IterationKind::Enumerate, head, subject, body)?)),
            K::ForOf(head, subject, body) => Statement::ForInOf(Box::new(ForInOfStatement::wrap(cx, span, IterationKind::Iterate, head, subject, body)?)),
            K::While(test, body) => Statement::While(Box::new(cx.node(span, |cx, info| {
                Ok(WhileStatement {
                    info,
                    test: Expression::wrap(cx, test)?,
                    body: wrap_loop_body(cx, body)?,
                })
            })?)),
            K::DoWhile(body, test) => Statement::DoWhile(Box::new(cx.node(span, |cx, info| {
                Ok(DoWhileStatement {
                    info,
                    body: wrap_loop_body(cx, body)?,
                    test: Expression::wrap(cx, test)?,
                })
            })?)),
            K::Switch(discriminant, cases) => Statement::Switch(SwitchStatement::wrap(cx, span, discriminant, cases)?),
            K::Break(label) => {
                cx.check_break(label.as_deref())?;
                Statement::Break(cx.node(span, |_, info| {
                    Ok(BreakStatement {
                        info,
                        label: label.as_deref().map(Rc::from),
                    })
                })?)
            }
            K::Continue(label) => {
                cx.check_continue(label.as_deref())?;
                Statement::Continue(cx.node(span, |_, info| {
                    Ok(ContinueStatement {
                        info,
                        label: label.as_deref().map(Rc::from),
                    })
                })?)
            }
            K::Labeled(label, body) => {
                cx.push_label(label, is_iteration(body))?;
                let labeled = cx.node(span, |cx, info| {
                    Ok(LabeledStatement {
                        info,
                        label: Rc::from(label.as_str()),
                        body: Statement::wrap(cx, body)?,
                    })
                });
                cx.pop_label();
                Statement::Labeled(Box::new(labeled?))
            }
            K::Return(argument) => {
                if !cx.flags.contains(Context::IN_FUNCTION) {
                    return Err(raise_syntax_error!("Illegal return statement"));
                }
                Statement::Return(cx.node(span, |cx, info| {
                    Ok(ReturnStatement {
                        info,
                        argument: argument.as_ref().map(|argument| Expression::wrap(cx, argument)).transpose()?,
                    })
                })?)
            }
            K::Throw(argument) => Statement::Throw(cx.node(span, |cx, info| {
                Ok(ThrowStatement {
                    info,
                    argument: Expression::wrap(cx, argument)?,
                })
            })?),
            K::Try { block, handler, finalizer } => Statement::Try(cx.node(span, |cx, info| {
                Ok(TryStatement {
                    info,
                    block: BlockStatement::wrap(cx, span, block)?,
                    handler: handler.as_ref().map(|handler| CatchClause::wrap(cx, handler)).transpose()?,
                    finalizer: finalizer.as_ref().map(|finalizer| BlockStatement::wrap(cx, span, finalizer)).transpose()?,
                })
            })?),
            K::Import(_) | K::Export(_) => {
                return Err(raise_syntax_error!("import and export declarations may only appear at the top level of a module"));
            }
        })
    }

    /// VarDeclaredNames, not descending into functions or classes.
    pub fn var_declared_names(&self, out: &mut Vec<Rc<str>>) {
        match self {
            Statement::Variable(declaration) if declaration.kind == VariableKind::Var => out.extend(declaration.bound_names()),
            Statement::Block(block) => block.var_declared_names(out),
            Statement::If(node) => {
                node.consequent.var_declared_names(out);
                if let Some(alternate) = &node.alternate {
                    alternate.var_declared_names(out);
                }
            }
            Statement::For(node) => {
                if let Some(ForInitializer::Variable(declaration)) = &node.init
                    && declaration.kind == VariableKind::Var
                {
                    out.extend(declaration.bound_names());
                }
                node.body.var_declared_names(out);
            }
            Statement::ForInOf(node) => {
                if let ForBinding::Var(pattern) = &node.binding {
                    pattern.bound_names(out);
                }
                node.body.var_declared_names(out);
            }
            Statement::While(node) => node.body.var_declared_names(out),
            Statement::DoWhile(node) => node.body.var_declared_names(out),
            Statement::Switch(node) => {
                for case in &node.cases {
                    for statement in &case.body {
                        statement.var_declared_names(out);
                    }
                }
            }
            Statement::Labeled(node) => node.body.var_declared_names(out),
            Statement::Try(node) => {
                node.block.var_declared_names(out);
                if let Some(handler) = &node.handler {
                    handler.body.var_declared_names(out);
                }
                if let Some(finalizer) = &node.finalizer {
                    finalizer.var_declared_names(out);
                }
            }
            _ => {}
        }
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        match self {
            Statement::Variable(node) => node.evaluate(agent),
            Statement::Function(node) => node.evaluate(agent),
            Statement::Class(node) => node.evaluate(agent),
            Statement::Expression(node) => node.evaluate(agent),
            Statement::Block(node) => node.evaluate(agent),
            Statement::Empty(info) => {
                log_evaluate!("EmptyStatement", info, agent);
                Ok(None)
            }
            Statement::Debugger(info) => {
                log_evaluate!("DebuggerStatement", info, agent);
                Ok(None)
            }
            Statement::If(node) => node.evaluate(agent),
            Statement::Break(node) => node.evaluate(agent),
            Statement::Continue(node) => node.evaluate(agent),
            Statement::Return(node) => node.evaluate(agent),
            Statement::Throw(node) => node.evaluate(agent),
            Statement::Try(node) => node.evaluate(agent),
            _ => self.labelled_evaluate(agent, &[]),
        }
    }

    /// LabelledEvaluation with the enclosing label set.
    pub fn labelled_evaluate(&self, agent: &mut Agent, labels: &[Rc<str>]) -> Completion<Option<Value>> {
        match self {
            Statement::For(node) => breakable(node.loop_evaluate(agent, labels)),
            Statement::ForInOf(node) => breakable(node.loop_evaluate(agent, labels)),
            Statement::While(node) => breakable(node.loop_evaluate(agent, labels)),
            Statement::DoWhile(node) => breakable(node.loop_evaluate(agent, labels)),
            Statement::Switch(node) => breakable(node.evaluate(agent)),
            Statement::Labeled(node) => node.labelled_evaluate(agent, labels),
            other => other.evaluate(agent),
        }
    }
}

/// An unlabelled `break` out of a breakable statement completes it normally.
fn breakable(completion: Completion<Option<Value>>) -> Completion<Option<Value>> {
    match completion {
        Err(Abrupt::Break { label: None, value }) => Ok(Some(value.unwrap_or_default())),
        other => other,
    }
}

/// LoopContinues(completion, labelSet)
fn loop_continues(completion: &Completion<Option<Value>>, labels: &[Rc<str>]) -> bool {
    match completion {
        Ok(_) => true,
        Err(Abrupt::Continue { label: None, .. }) => true,
        Err(Abrupt::Continue { label: Some(label), .. }) => labels.contains(label),
        Err(_) => false,
    }
}

fn completion_value(completion: &Completion<Option<Value>>) -> Option<Value> {
    match completion {
        Ok(value) => value.clone(),
        Err(abrupt) => abrupt.value().cloned(),
    }
}

/// Counts loop iterations against the agent's limit.
struct IterationGuard {
    count: usize,
    limit: Option<usize>,
}

impl IterationGuard {
    fn new(agent: &Agent) -> Self {
        IterationGuard {
            count: 0,
            limit: agent.options().max_loop_iterations,
        }
    }

    fn tick(&mut self, agent: &mut Agent) -> Completion<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        self.count += 1;
        if self.count > limit {
            log::debug!("loop exceeded {limit} iterations");
            return throw_range_error(agent, "Maximum loop iteration count exceeded");
        }
        Ok(())
    }
}

pub struct VariableDeclarator {
    pub info: NodeInfo,
    pub target: Pattern,
    pub init: Option<Expression>,
}

pub struct VariableDeclaration {
    pub info: NodeInfo,
    pub kind: VariableKind,
    pub declarators: Vec<VariableDeclarator>,
}

impl VariableDeclaration {
    pub(crate) fn wrap(
        cx: &mut Cx,
        span: syntax::Span,
        kind: VariableKind,
        declarators: &[syntax::VariableDeclarator],
    ) -> Result<VariableDeclaration, JSError> {
        cx.node(span, |cx, info| {
            let mut wrapped = Vec::with_capacity(declarators.len());
            for declarator in declarators {
                if declarator.init.is_none() {
                    if kind == VariableKind::Const {
                        return Err(raise_syntax_error!("Missing initializer in const declaration"));
                    }
                    if !matches!(declarator.target, syntax::Pattern::Identifier(..)) {
                        return Err(raise_syntax_error!("Missing initializer in destructuring declaration"));
                    }
                }
                wrapped.push(cx.node(declarator.span, |cx, info| {
                    Ok(VariableDeclarator {
                        info,
                        target: Pattern::wrap(cx, &declarator.target)?,
                        init: declarator.init.as_ref().map(|init| Expression::wrap(cx, init)).transpose()?,
                    })
                })?);
            }
            Ok(VariableDeclaration {
                info,
                kind,
                declarators: wrapped,
            })
        })
    }

    pub fn bound_names(&self) -> Vec<Rc<str>> {
        let mut names = Vec::new();
        for declarator in &self.declarators {
            declarator.target.bound_names(&mut names);
        }
        names
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("VariableDeclaration", self.info, agent);
        let lexical = self.kind != VariableKind::Var;
        for declarator in &self.declarators {
            declarator.evaluate(agent, lexical)?;
        }
        Ok(None)
    }
}

impl VariableDeclarator {
    fn evaluate(&self, agent: &mut Agent, lexical: bool) -> Completion<()> {
        let env = if lexical { Some(agent.lexical_environment()) } else { None };
        match (&self.target, &self.init) {
            (Pattern::Identifier(identifier), init) => {
                if init.is_none() && !lexical {
                    return Ok(());
                }
                let reference = resolve_binding_in(agent, &identifier.name, env.as_ref(), identifier.strict)?;
                let value = match init {
                    Some(init) => init.evaluate_named(agent, &PropertyKey::from(&identifier.name))?,
                    None => Value::Undefined,
                };
                if lexical {
                    reference.initialize_referenced_binding(agent, value)
                } else {
                    reference.put_value(agent, value)
                }
            }
            (pattern, Some(init)) => {
                let value = init.evaluate_value(agent)?;
                pattern.bind(agent, value, env.as_ref())
            }
            (_, None) => Ok(()),
        }
    }
}

pub struct ExpressionStatement {
    pub info: NodeInfo,
    pub expression: Expression,
}

impl ExpressionStatement {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("ExpressionStatement", self.info, agent);
        self.expression.evaluate_value(agent).map(Some)
    }
}

pub struct BlockStatement {
    pub info: NodeInfo,
    pub body: StatementList,
}

impl BlockStatement {
    fn wrap(cx: &mut Cx, span: syntax::Span, statements: &[syntax::Statement]) -> Result<BlockStatement, JSError> {
        cx.node(span, |cx, info| {
            Ok(BlockStatement {
                info,
                body: StatementList::wrap(cx, statements, false)?,
            })
        })
    }

    fn var_declared_names(&self, out: &mut Vec<Rc<str>>) {
        for statement in &self.body.statements {
            statement.var_declared_names(out);
        }
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("Block", self.info, agent);
        if self.body.scope.is_empty() {
            return self.body.evaluate(agent);
        }
        let old_env = agent.lexical_environment();
        let block_env = Environment::new_declarative(Some(old_env.clone()));
        self.body.scope.instantiate_block(agent, &block_env)?;
        agent.set_lexical_environment(block_env);
        let result = self.body.evaluate(agent);
        agent.set_lexical_environment(old_env);
        result
    }
}

pub struct IfStatement {
    pub info: NodeInfo,
    pub test: Expression,
    pub consequent: Statement,
    pub alternate: Option<Statement>,
}

impl IfStatement {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("IfStatement", self.info, agent);
        let test = self.test.evaluate_value(agent)?;
        let result = if to_boolean(&test) {
            self.consequent.evaluate(agent)
        } else {
            match &self.alternate {
                Some(alternate) => alternate.evaluate(agent),
                None => return Ok(Some(Value::Undefined)),
            }
        };
        update_empty(result, Some(Value::Undefined))
    }
}

pub enum ForInitializer {
    Variable(VariableDeclaration),
    Expression(Expression),
}

pub struct ForStatement {
    pub info: NodeInfo,
    pub init: Option<ForInitializer>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Statement,
}

impl ForStatement {
    fn loop_evaluate(&self, agent: &mut Agent, labels: &[Rc<str>]) -> Completion<Option<Value>> {
        log_evaluate!("ForStatement", self.info, agent);
        match &self.init {
            Some(ForInitializer::Variable(declaration)) if declaration.kind != VariableKind::Var => {
                let old_env = agent.lexical_environment();
                let loop_env = Environment::new_declarative(Some(old_env.clone()));
                let constant = declaration.kind == VariableKind::Const;
                let names = declaration.bound_names();
                for name in &names {
                    if constant {
                        loop_env.create_immutable_binding(agent, name, true)?;
                    } else {
                        loop_env.create_mutable_binding(agent, name, false)?;
                    }
                }
                agent.set_lexical_environment(loop_env);
                let per_iteration: &[Rc<str>] = if constant { &[] } else { &names };
                let result = declaration.evaluate(agent).and_then(|_| self.body_evaluation(agent, per_iteration, labels));
                agent.set_lexical_environment(old_env);
                result
            }
            Some(ForInitializer::Variable(declaration)) => {
                declaration.evaluate(agent)?;
                self.body_evaluation(agent, &[], labels)
            }
            Some(ForInitializer::Expression(expr)) => {
                expr.evaluate_value(agent)?;
                self.body_evaluation(agent, &[], labels)
            }
            None => self.body_evaluation(agent, &[], labels),
        }
    }

    /// ForBodyEvaluation(test, increment, stmt, perIterationBindings, labelSet)
    fn body_evaluation(&self, agent: &mut Agent, per_iteration: &[Rc<str>], labels: &[Rc<str>]) -> Completion<Option<Value>> {
        let mut v = Value::Undefined;
        create_per_iteration_environment(agent, per_iteration)?;
        let mut guard = IterationGuard::new(agent);
        loop {
            guard.tick(agent)?;
            if let Some(test) = &self.test {
                let test = test.evaluate_value(agent)?;
                if !to_boolean(&test) {
                    return Ok(Some(v));
                }
            }
            let result = self.body.evaluate(agent);
            if !loop_continues(&result, labels) {
                return update_empty(result, Some(v));
            }
            if let Some(value) = completion_value(&result) {
                v = value;
            }
            create_per_iteration_environment(agent, per_iteration)?;
            if let Some(update) = &self.update {
                update.evaluate_value(agent)?;
            }
        }
    }
}

/// CreatePerIterationEnvironment: copies the `let` bindings into a fresh environment.
fn create_per_iteration_environment(agent: &mut Agent, names: &[Rc<str>]) -> Completion<()> {
    if names.is_empty() {
        return Ok(());
    }
    let last = agent.lexical_environment();
    let this_iteration = Environment::new_declarative(last.outer());
    for name in names {
        this_iteration.create_mutable_binding(agent, name, false)?;
        let value = last.get_binding_value(agent, name, true)?;
        this_iteration.initialize_binding(agent, name, value)?;
    }
    agent.set_lexical_environment(this_iteration);
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationKind {
    /// `for-in`
    Enumerate,
    /// `for-of`
    Iterate,
}

pub enum ForBinding {
    Var(Pattern),
    Lexical { pattern: Pattern, constant: bool, names: Vec<Rc<str>> },
    Assignment(Pattern),
}

pub struct ForInOfStatement {
    pub info: NodeInfo,
    pub kind: IterationKind,
    pub binding: ForBinding,
    pub subject: Expression,
    pub body: Statement,
}

/// The source of values for a for-in/of loop.
enum LoopSource {
    /// Snapshot of enumerable string keys with the object that owned each.
    Keys(std::vec::IntoIter<(Object, PropertyKey)>),
    Iterator(crate::core::IteratorRecord),
}

impl ForInOfStatement {
    fn wrap(
        cx: &mut Cx,
        span: syntax::Span,
        kind: IterationKind,
        head: &syntax::ForHead,
        subject: &syntax::Expr,
        body: &syntax::Statement,
    ) -> Result<ForInOfStatement, JSError> {
        cx.node(span, |cx, info| {
            let binding = match head {
                syntax::ForHead::Variable(VariableKind::Var, pattern) => ForBinding::Var(Pattern::wrap(cx, pattern)?),
                syntax::ForHead::Variable(variable_kind, pattern) => {
                    let pattern = Pattern::wrap(cx, pattern)?;
                    let mut names = Vec::new();
                    pattern.bound_names(&mut names);
                    ForBinding::Lexical {
                        pattern,
                        constant: *variable_kind == VariableKind::Const,
                        names,
                    }
                }
                syntax::ForHead::Pattern(pattern) => ForBinding::Assignment(Pattern::wrap(cx, pattern)?),
            };
            let statement = ForInOfStatement {
                info,
                kind,
                binding,
                subject: Expression::wrap(cx, subject)?,
                body: wrap_loop_body(cx, body)?,
            };
            if let ForBinding::Lexical { names, .. } = &statement.binding {
                check_lexical_head(names, &statement.body)?;
            }
            Ok(statement)
        })
    }

    fn loop_evaluate(&self, agent: &mut Agent, labels: &[Rc<str>]) -> Completion<Option<Value>> {
        log_evaluate!("ForInOfStatement", self.info, agent);
        // ForIn/OfHeadEvaluation: the subject sees the loop's names in their TDZ
        let old_env = agent.lexical_environment();
        let value = match &self.binding {
            ForBinding::Lexical { names, .. } if !names.is_empty() => {
                let tdz = Environment::new_declarative(Some(old_env.clone()));
                for name in names {
                    tdz.create_mutable_binding(agent, name, false)?;
                }
                agent.set_lexical_environment(tdz);
                let value = self.subject.evaluate_value(agent);
                agent.set_lexical_environment(old_env.clone());
                value?
            }
            _ => self.subject.evaluate_value(agent)?,
        };
        let mut source = match self.kind {
            IterationKind::Enumerate => {
                if value.is_nullish() {
                    return Ok(Some(Value::Undefined));
                }
                let object = to_object(agent, &value)?;
                LoopSource::Keys(enumerate_object_properties(agent, &object)?.into_iter())
            }
            IterationKind::Iterate => LoopSource::Iterator(get_iterator(agent, &value)?),
        };
        self.body_evaluation(agent, &mut source, &old_env, labels)
    }

    /// ForIn/OfBodyEvaluation
    fn body_evaluation(&self, agent: &mut Agent, source: &mut LoopSource, old_env: &Environment, labels: &[Rc<str>]) -> Completion<Option<Value>> {
        let mut v = Value::Undefined;
        let mut guard = IterationGuard::new(agent);
        loop {
            guard.tick(agent)?;
            let next = match source {
                LoopSource::Keys(keys) => next_key(agent, keys)?,
                LoopSource::Iterator(record) => iterator_step_value(agent, record)?,
            };
            let Some(next) = next else {
                return Ok(Some(v));
            };

            let bound = self.bind_next(agent, next, old_env);
            let result = match bound {
                Ok(()) => self.body.evaluate(agent),
                Err(abrupt) => Err(abrupt),
            };
            agent.set_lexical_environment(old_env.clone());

            if !loop_continues(&result, labels) {
                let completion = update_empty(result, Some(v));
                return match source {
                    LoopSource::Iterator(record) => iterator_close(agent, record, completion),
                    LoopSource::Keys(_) => completion,
                };
            }
            if let Some(value) = completion_value(&result) {
                v = value;
            }
        }
    }

    fn bind_next(&self, agent: &mut Agent, next: Value, old_env: &Environment) -> Completion<()> {
        match &self.binding {
            ForBinding::Var(pattern) | ForBinding::Assignment(pattern) => pattern.bind(agent, next, None),
            ForBinding::Lexical { pattern, constant, names } => {
                let iteration_env = Environment::new_declarative(Some(old_env.clone()));
                for name in names {
                    if *constant {
                        iteration_env.create_immutable_binding(agent, name, true)?;
                    } else {
                        iteration_env.create_mutable_binding(agent, name, false)?;
                    }
                }
                agent.set_lexical_environment(iteration_env.clone());
                pattern.bind(agent, next, Some(&iteration_env))
            }
        }
    }
}

/// EnumerateObjectProperties: string keys of `object` and its prototypes, shadowed names visited once.
fn enumerate_object_properties(agent: &mut Agent, object: &Object) -> Completion<Vec<(Object, PropertyKey)>> {
    let mut visited: Vec<PropertyKey> = Vec::new();
    let mut keys = Vec::new();
    let mut current = Some(object.clone());
    while let Some(target) = current {
        for key in target.own_property_keys(agent)? {
            if key.is_symbol() || visited.contains(&key) {
                continue;
            }
            visited.push(key.clone());
            if let Some(property) = target.get_own_property(agent, &key)?
                && property.enumerable()
            {
                keys.push((target.clone(), key));
            }
        }
        current = target.get_prototype_of();
    }
    Ok(keys)
}

/// The next snapshot key whose property has not been deleted since enumeration began.
fn next_key(agent: &mut Agent, keys: &mut std::vec::IntoIter<(Object, PropertyKey)>) -> Completion<Option<Value>> {
    for (owner, key) in keys.by_ref() {
        if owner.get_own_property(agent, &key)?.is_some() {
            return Ok(Some(key.to_value()));
        }
    }
    Ok(None)
}

pub struct WhileStatement {
    pub info: NodeInfo,
    pub test: Expression,
    pub body: Statement,
}

impl WhileStatement {
    fn loop_evaluate(&self, agent: &mut Agent, labels: &[Rc<str>]) -> Completion<Option<Value>> {
        log_evaluate!("WhileStatement", self.info, agent);
        let mut v = Value::Undefined;
        let mut guard = IterationGuard::new(agent);
        loop {
            guard.tick(agent)?;
            let test = self.test.evaluate_value(agent)?;
            if !to_boolean(&test) {
                return Ok(Some(v));
            }
            let result = self.body.evaluate(agent);
            if !loop_continues(&result, labels) {
                return update_empty(result, Some(v));
            }
            if let Some(value) = completion_value(&result) {
                v = value;
            }
        }
    }
}

pub struct DoWhileStatement {
    pub info: NodeInfo,
    pub body: Statement,
    pub test: Expression,
}

impl DoWhileStatement {
    fn loop_evaluate(&self, agent: &mut Agent, labels: &[Rc<str>]) -> Completion<Option<Value>> {
        log_evaluate!("DoWhileStatement", self.info, agent);
        let mut v = Value::Undefined;
        let mut guard = IterationGuard::new(agent);
        loop {
            guard.tick(agent)?;
            let result = self.body.evaluate(agent);
            if !loop_continues(&result, labels) {
                return update_empty(result, Some(v));
            }
            if let Some(value) = completion_value(&result) {
                v = value;
            }
            let test = self.test.evaluate_value(agent)?;
            if !to_boolean(&test) {
                return Ok(Some(v));
            }
        }
    }
}

pub struct SwitchCase {
    pub info: NodeInfo,
    /// `None` is the `default` clause.
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
}

pub struct SwitchStatement {
    pub info: NodeInfo,
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
    /// Declarations of the case block, shared by every clause.
    pub scope: Scope,
}

impl SwitchStatement {
    fn wrap(cx: &mut Cx, span: syntax::Span, discriminant: &syntax::Expr, cases: &[syntax::SwitchCase]) -> Result<SwitchStatement, JSError> {
        cx.node(span, |cx, info| {
            let discriminant = Expression::wrap(cx, discriminant)?;
            cx.enter_breakable(false);
            let wrapped = cases
                .iter()
                .map(|case| {
                    cx.node(case.span, |cx, info| {
                        Ok(SwitchCase {
                            info,
                            test: case.test.as_ref().map(|test| Expression::wrap(cx, test)).transpose()?,
                            body: case
                                .body
                                .iter()
                                .map(|statement| Statement::wrap(cx, statement))
                                .collect::<Result<Vec<_>, _>>()?,
                        })
                    })
                })
                .collect::<Result<Vec<_>, _>>();
            cx.leave_breakable(false);
            let cases = wrapped?;
            let scope = Scope::analyze(cases.iter().flat_map(|case| &case.body), false)?;
            Ok(SwitchStatement {
                info,
                discriminant,
                cases,
                scope,
            })
        })
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("SwitchStatement", self.info, agent);
        let input = self.discriminant.evaluate_value(agent)?;
        let old_env = agent.lexical_environment();
        let block_env = Environment::new_declarative(Some(old_env.clone()));
        self.scope.instantiate_block(agent, &block_env)?;
        agent.set_lexical_environment(block_env);
        let result = self.case_block_evaluation(agent, &input);
        agent.set_lexical_environment(old_env);
        result
    }

    /// CaseBlockEvaluation: run from the first matching clause, else from `default`, falling through.
    fn case_block_evaluation(&self, agent: &mut Agent, input: &Value) -> Completion<Option<Value>> {
        let mut start = None;
        for (index, case) in self.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let value = test.evaluate_value(agent)?;
                if strict_equality_comparison(input, &value) {
                    start = Some(index);
                    break;
                }
            }
        }
        let start = start.or_else(|| self.cases.iter().position(|case| case.test.is_none()));
        let Some(start) = start else {
            return Ok(Some(Value::Undefined));
        };
        let mut v = Some(Value::Undefined);
        for case in &self.cases[start..] {
            v = evaluate_statements(agent, &case.body, v)?;
        }
        Ok(v)
    }
}

pub struct BreakStatement {
    pub info: NodeInfo,
    pub label: Option<Rc<str>>,
}

impl BreakStatement {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("BreakStatement", self.info, agent);
        Err(Abrupt::Break {
            label: self.label.clone(),
            value: None,
        })
    }
}

pub struct ContinueStatement {
    pub info: NodeInfo,
    pub label: Option<Rc<str>>,
}

impl ContinueStatement {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("ContinueStatement", self.info, agent);
        Err(Abrupt::Continue {
            label: self.label.clone(),
            value: None,
        })
    }
}

pub struct LabeledStatement {
    pub info: NodeInfo,
    pub label: Rc<str>,
    pub body: Statement,
}

impl LabeledStatement {
    pub fn labelled_evaluate(&self, agent: &mut Agent, labels: &[Rc<str>]) -> Completion<Option<Value>> {
        log_evaluate!("LabeledStatement", self.info, agent);
        let mut label_set = labels.to_vec();
        label_set.push(self.label.clone());
        match self.body.labelled_evaluate(agent, &label_set) {
            Err(Abrupt::Break { label: Some(label), value }) if label == self.label => Ok(value),
            other => other,
        }
    }
}

pub struct ReturnStatement {
    pub info: NodeInfo,
    pub argument: Option<Expression>,
}

impl ReturnStatement {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("ReturnStatement", self.info, agent);
        let value = match &self.argument {
            Some(argument) => argument.evaluate_value(agent)?,
            None => Value::Undefined,
        };
        Err(Abrupt::Return(value))
    }
}

pub struct ThrowStatement {
    pub info: NodeInfo,
    pub argument: Expression,
}

impl ThrowStatement {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("ThrowStatement", self.info, agent);
        let value = self.argument.evaluate_value(agent)?;
        Err(Abrupt::Throw(value))
    }
}

pub struct CatchClause {
    pub info: NodeInfo,
    /// `None` for `catch {}` without a binding.
    pub param: Option<Pattern>,
    pub body: BlockStatement,
}

impl CatchClause {
    fn wrap(cx: &mut Cx, handler: &syntax::CatchClause) -> Result<CatchClause, JSError> {
        cx.node(handler.span, |cx, info| {
            let param = handler.param.as_ref().map(|param| Pattern::wrap(cx, param)).transpose()?;
            let body = BlockStatement::wrap(cx, handler.span, &handler.body)?;
            if let Some(param) = &param {
                let mut names = Vec::new();
                param.bound_names(&mut names);
                check_duplicates(&names)?;
                let lexical = body.body.scope.lexically_declared_names();
                if let Some(name) = names.iter().find(|name| lexical.contains(name)) {
                    return Err(raise_syntax_error!("Identifier '{name}' has already been declared"));
                }
            }
            Ok(CatchClause { info, param, body })
        })
    }

    /// CatchClauseEvaluation(thrownValue)
    fn evaluate(&self, agent: &mut Agent, thrown: Value) -> Completion<Option<Value>> {
        log_evaluate!("CatchClause", self.info, agent);
        let Some(param) = &self.param else {
            return self.body.evaluate(agent);
        };
        let old_env = agent.lexical_environment();
        let catch_env = Environment::new_declarative(Some(old_env.clone()));
        let mut names = Vec::new();
        param.bound_names(&mut names);
        for name in &names {
            catch_env.create_mutable_binding(agent, name, false)?;
        }
        agent.set_lexical_environment(catch_env.clone());
        let result = match param.bind(agent, thrown, Some(&catch_env)) {
            Ok(()) => self.body.evaluate(agent),
            Err(abrupt) => Err(abrupt),
        };
        agent.set_lexical_environment(old_env);
        result
    }
}

pub struct TryStatement {
    pub info: NodeInfo,
    pub block: BlockStatement,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<BlockStatement>,
}

impl TryStatement {
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("TryStatement", self.info, agent);
        let result = match (self.block.evaluate(agent), &self.handler) {
            (Err(Abrupt::Throw(thrown)), Some(handler)) => handler.evaluate(agent, thrown),
            (result, _) => result,
        };
        let result = match &self.finalizer {
            Some(finalizer) => match finalizer.evaluate(agent) {
                Ok(_) => result,
                Err(abrupt) => Err(abrupt),
            },
            None => result,
        };
        update_empty(result, Some(Value::Undefined))
    }
}

/// A parsed and wrapped script.
pub struct Script {
    pub info: NodeInfo,
    pub body: StatementList,
    pub strict: bool,
}

impl Script {
    /// ParseScript's early-error pass over an already parsed program.
    pub fn wrap(realm: &Rc<Realm>, program: &syntax::Program, source: &str, options: &SourceOptions) -> Result<Script, JSError> {
        let mut cx = Cx::new(realm, source, Context::empty());
        let strict = options.strict || has_use_strict_directive(&cx, &program.body);
        if strict {
            cx.flags |= Context::STRICT;
        }
        cx.node(program.span, |cx, info| {
            Ok(Script {
                info,
                body: StatementList::wrap(cx, &program.body, true)?,
                strict,
            })
        })
    }

    /// ScriptEvaluation
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("Script", self.info, agent);
        let global_env = agent.realm().global_env();
        let context = agent.new_context(None, Some(ScriptOrModule::Script), global_env.clone(), global_env.clone());
        agent.push_context(context)?;
        let result = self
            .global_declaration_instantiation(agent, &global_env)
            .and_then(|_| self.body.evaluate(agent));
        agent.pop_context();
        Ok(result?.unwrap_or_default())
    }

    /// GlobalDeclarationInstantiation(script, env)
    fn global_declaration_instantiation(&self, agent: &mut Agent, env: &Environment) -> Completion<()> {
        let scope = &self.body.scope;
        for name in scope.lexically_declared_names() {
            if env.has_var_declaration(&name) || env.has_lexical_declaration(&name) {
                return throw_syntax_error(agent, &format!("Identifier '{name}' has already been declared"));
            }
            if env.has_restricted_global_property(agent, &name)? {
                return throw_syntax_error(agent, &format!("Cannot redefine restricted global property '{name}'"));
            }
        }
        for name in &scope.var_names {
            if env.has_lexical_declaration(name) {
                return throw_syntax_error(agent, &format!("Identifier '{name}' has already been declared"));
            }
        }

        let function_names: Vec<Rc<str>> = scope.functions.iter().map(|function| function.bound_name()).collect();
        for name in &function_names {
            if !env.can_declare_global_function(agent, name)? {
                return throw_type_error(agent, &format!("Cannot declare global function '{name}'"));
            }
        }
        let mut declared_var_names: Vec<Rc<str>> = Vec::new();
        for name in &scope.var_names {
            if function_names.contains(name) || declared_var_names.contains(name) {
                continue;
            }
            if !env.can_declare_global_var(agent, name)? {
                return throw_type_error(agent, &format!("Cannot declare global variable '{name}'"));
            }
            declared_var_names.push(name.clone());
        }

        scope.create_lexical_bindings(agent, env)?;
        for function in &scope.functions {
            let object = function.instantiate(agent, env);
            env.create_global_function_binding(agent, &function.bound_name(), Value::Object(object), false)?;
        }
        for name in &declared_var_names {
            env.create_global_var_binding(agent, name, false)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod statements_tests {
    use super::*;
    use crate::syntax::parse_script;

    fn wrap_script(source: &str) -> Result<Script, JSError> {
        let realm = Realm::new();
        let program = parse_script(source)?;
        Script::wrap(&realm, &program, source, &SourceOptions::default())
    }

    #[test]
    fn test_scope_analysis() {
        let script = wrap_script("var a; let b; const c = 1; function d() {} { var e; let f; } class G {}").unwrap();
        let scope = &script.body.scope;
        let var_names: Vec<&str> = scope.var_names.iter().map(|name| &**name).collect();
        assert_eq!(var_names, vec!["a", "d", "e"]);
        let lexical: Vec<(&str, bool)> = scope.lexical.iter().map(|binding| (&*binding.name, binding.constant)).collect();
        assert_eq!(lexical, vec![("b", false), ("c", true), ("G", false)]);
        assert_eq!(scope.functions.len(), 1);
    }

    #[test]
    fn test_var_scoped_functions_last_wins() {
        let script = wrap_script("function f() { return 1; } function f() { return 2; }").unwrap();
        assert_eq!(script.body.scope.functions.len(), 1);
        assert!(script.body.scope.functions[0].code.source_text.contains("return 2"));
    }

    #[test]
    fn test_redeclaration_early_errors() {
        assert!(wrap_script("let a; let a;").is_err());
        assert!(wrap_script("let a; var a;").is_err());
        assert!(wrap_script("let a; { var a; }").is_err());
        assert!(wrap_script("{ function f() {} function f() {} }").is_err());
        assert!(wrap_script("for (let i of []) { var i; }").is_err());
        assert!(wrap_script("try {} catch (e) { let e; }").is_err());
        assert!(wrap_script("switch (1) { case 1: let x; case 2: let x; }").is_err());
        assert!(wrap_script("{ let a; } var a;").is_ok());
        assert!(wrap_script("var a; var a;").is_ok());
    }

    #[test]
    fn test_control_flow_early_errors() {
        assert!(wrap_script("const x;").is_err());
        assert!(wrap_script("let [a];").is_err());
        assert!(wrap_script("break;").is_err());
        assert!(wrap_script("while (true) { continue missing; }").is_err());
        assert!(wrap_script("a: { continue a; }").is_err());
        assert!(wrap_script("a: a: ;").is_err());
        assert!(wrap_script("return 1;").is_err());
        assert!(wrap_script("a: { break a; }").is_ok());
        assert!(wrap_script("outer: for (;;) { for (;;) { continue outer; } }").is_ok());
        assert!(wrap_script("while (true) { function f() { break; } }").is_err());
    }
}
