use crate::JSError;
use crate::ast;
use crate::core::{
    Abrupt, Completion, Environment, Intrinsic, Object, Realm, Reference, Symbol, Value, WellKnownSymbol, describe_thrown_value,
    get_identifier_reference, heap,
    module::{ModuleRecord, ModuleResolver},
    throw_range_error,
};
use crate::options::{AgentOptions, SourceOptions};
use crate::syntax::{self, Goal};
use std::rc::Rc;

/// The ScriptOrModule component of an execution context.
#[derive(Clone)]
pub enum ScriptOrModule {
    Script,
    Module(Rc<ModuleRecord>),
}

/// An execution context. Builtin functions run with the global environment.
pub struct ExecutionContext {
    pub id: usize,
    pub realm: Rc<Realm>,
    pub function: Option<Object>,
    pub script_or_module: Option<ScriptOrModule>,
    pub lexical_environment: Environment,
    pub variable_environment: Environment,
}

/// Owns the execution context stack. One agent evaluates on one thread.
pub struct Agent {
    realm: Rc<Realm>,
    stack: Vec<ExecutionContext>,
    options: AgentOptions,
    next_context_id: usize,
}

impl Agent {
    pub fn new(options: AgentOptions) -> Self {
        Self::with_realm(Realm::new(), options)
    }

    pub fn with_realm(realm: Rc<Realm>, options: AgentOptions) -> Self {
        Agent {
            realm,
            stack: Vec::new(),
            options,
            next_context_id: 0,
        }
    }

    pub fn realm(&self) -> &Rc<Realm> {
        &self.realm
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn intrinsic(&self, intrinsic: Intrinsic) -> Object {
        self.realm.intrinsic(intrinsic)
    }

    pub fn well_known_symbol(&self, symbol: WellKnownSymbol) -> Symbol {
        self.realm.well_known_symbol(symbol)
    }

    pub fn global_object(&self) -> Object {
        self.realm.global_object()
    }

    pub fn running_context(&self) -> Option<&ExecutionContext> {
        self.stack.last()
    }

    /// Id of the running execution context, `0` when idle. Used in log lines.
    pub fn context_id(&self) -> usize {
        self.stack.last().map(|ctx| ctx.id).unwrap_or(0)
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Builds a context for the current realm; push it with [`Agent::push_context`].
    pub fn new_context(
        &mut self,
        function: Option<Object>,
        script_or_module: Option<ScriptOrModule>,
        lexical_environment: Environment,
        variable_environment: Environment,
    ) -> ExecutionContext {
        self.next_context_id += 1;
        ExecutionContext {
            id: self.next_context_id,
            realm: self.realm.clone(),
            function,
            script_or_module,
            lexical_environment,
            variable_environment,
        }
    }

    pub fn push_context(&mut self, context: ExecutionContext) -> Completion<()> {
        if self.options.max_call_depth.is_some_and(|limit| self.stack.len() >= limit) {
            return throw_range_error(self, "Maximum call stack size exceeded");
        }
        log::trace!("push context #{} (depth {})", context.id, self.stack.len() + 1);
        self.stack.push(context);
        Ok(())
    }

    pub fn pop_context(&mut self) -> Option<ExecutionContext> {
        let context = self.stack.pop();
        if let Some(ctx) = &context {
            log::trace!("pop context #{}", ctx.id);
        }
        context
    }

    pub fn lexical_environment(&self) -> Environment {
        match self.stack.last() {
            Some(ctx) => ctx.lexical_environment.clone(),
            None => self.realm.global_env(),
        }
    }

    pub fn set_lexical_environment(&mut self, env: Environment) {
        if let Some(ctx) = self.stack.last_mut() {
            ctx.lexical_environment = env;
        }
    }

    pub fn variable_environment(&self) -> Environment {
        match self.stack.last() {
            Some(ctx) => ctx.variable_environment.clone(),
            None => self.realm.global_env(),
        }
    }

    pub fn set_variable_environment(&mut self, env: Environment) {
        if let Some(ctx) = self.stack.last_mut() {
            ctx.variable_environment = env;
        }
    }

    pub fn active_function(&self) -> Option<Object> {
        self.stack.last().and_then(|ctx| ctx.function.clone())
    }

    pub fn active_script_or_module(&self) -> Option<ScriptOrModule> {
        self.stack.iter().rev().find_map(|ctx| ctx.script_or_module.clone())
    }

    /// ResolveBinding(name) against the running lexical environment.
    pub fn resolve_binding(&mut self, name: &Rc<str>, strict: bool) -> Completion<Reference> {
        let env = self.lexical_environment();
        get_identifier_reference(self, Some(env), name, strict)
    }

    /// GetThisEnvironment()
    pub fn get_this_environment(&self) -> Environment {
        let mut env = self.lexical_environment();
        loop {
            if env.has_this_binding() {
                return env;
            }
            match env.outer() {
                Some(outer) => env = outer,
                None => return env,
            }
        }
    }

    /// ResolveThisBinding()
    pub fn resolve_this_binding(&mut self) -> Completion<Value> {
        let env = self.get_this_environment();
        env.get_this_binding(self)
    }

    /// GetNewTarget()
    pub fn get_new_target(&self) -> Value {
        self.get_this_environment().new_target()
    }

    /// Frees reference cycles that neither this agent's realm nor the host can reach.
    /// Returns the number of objects, environments and modules released.
    pub fn collect_garbage(&mut self) -> usize {
        heap::collect_cycles()
    }

    /// Converts an abrupt completion that escaped to the top level into a host error.
    pub fn uncaught(&mut self, abrupt: Abrupt) -> JSError {
        match abrupt {
            Abrupt::Throw(value) => JSError::Throw {
                message: describe_thrown_value(self, &value),
            },
            other => JSError::Throw {
                message: format!("illegal {:?} completion at top level", other.completion_type()),
            },
        }
    }

    /// ParseScript + ScriptEvaluation.
    pub fn run_script(&mut self, source: &str, options: &SourceOptions) -> Result<Value, JSError> {
        let program = syntax::parse(source, Goal::Script)?;
        let script = ast::Script::wrap(&self.realm, &program, source, options)?;
        log::debug!("evaluating script '{}'", options.name);
        script.evaluate(self).map_err(|abrupt| self.uncaught(abrupt))
    }

    /// Loads, links and evaluates the module graph rooted at `specifier`, returning its namespace object.
    pub fn run_module(&mut self, resolver: &dyn ModuleResolver, specifier: &str) -> Result<Object, JSError> {
        let module = resolver.resolve_imported_module(None, specifier)?;
        module.load_requested_modules(resolver)?;
        module.link(self).map_err(|abrupt| self.uncaught(abrupt))?;
        module.evaluate(self).map_err(|abrupt| self.uncaught(abrupt))?;
        module.get_module_namespace(self).map_err(|abrupt| self.uncaught(abrupt))
    }

    /// Evaluates a single source text according to `options.goal`. Module code may not import anything.
    pub fn evaluate(&mut self, source: &str, options: &SourceOptions) -> Result<Value, JSError> {
        match options.goal {
            Goal::Script => self.run_script(source, options),
            Goal::Module => {
                let map = crate::core::ModuleMap::new(self.realm.clone());
                map.insert(&options.name, source);
                self.run_module(&map, &options.name).map(Value::Object)
            }
        }
    }
}
