//! Source Text Module Records: loading, linking and evaluation of module graphs.

use crate::JSError;
use crate::ast::{self, ExportImportName, ImportName};
use crate::core::{
    Abrupt, Agent, Completion, Environment, Object, Realm, ScriptOrModule, Value,
    exotics::module_namespace_create,
    heap::{self, Tracked, trace_value},
    throw_syntax_error,
};
use crate::options::SourceOptions;
use crate::syntax::{self, Goal};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleStatus {
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    Evaluated,
}

/// The [[BindingName]] of a ResolvedBinding Record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingName {
    Name(Rc<str>),
    Namespace,
}

/// ResolvedBinding Record.
#[derive(Clone)]
pub struct ResolvedBindingRecord {
    pub module: Rc<ModuleRecord>,
    pub binding_name: BindingName,
}

/// Result of ResolveExport.
#[derive(Clone)]
pub enum ResolvedExport {
    Resolved(ResolvedBindingRecord),
    NotFound,
    Ambiguous,
}

/// The resolveSet of ResolveExport: (module, exportName) pairs already visited.
pub type ResolveSet = Vec<(Rc<ModuleRecord>, Rc<str>)>;

/// Host hook that maps a module specifier to a module record.
pub trait ModuleResolver {
    /// HostLoadImportedModule. Must return the same record for the same specifier.
    fn resolve_imported_module(&self, referrer: Option<&ModuleRecord>, specifier: &str) -> Result<Rc<ModuleRecord>, JSError>;
}

/// A Source Text Module Record.
pub struct ModuleRecord {
    pub specifier: Rc<str>,
    pub realm: Rc<Realm>,
    pub code: ast::Module,
    environment: RefCell<Option<Environment>>,
    namespace: RefCell<Option<Object>>,
    status: Cell<ModuleStatus>,
    evaluation_error: RefCell<Option<Abrupt>>,
    dfs_index: Cell<usize>,
    dfs_ancestor_index: Cell<usize>,
    /// [[LoadedModules]]: module request -> record.
    resolved: RefCell<IndexMap<Rc<str>, Rc<ModuleRecord>>>,
}

impl std::fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModuleRecord({}, {:?})", self.specifier, self.status.get())
    }
}

impl ModuleRecord {
    /// ParseModule(sourceText, realm)
    pub fn parse(realm: &Rc<Realm>, specifier: &str, source: &str) -> Result<Rc<ModuleRecord>, JSError> {
        let program = syntax::parse(source, Goal::Module)?;
        let code = ast::Module::wrap(realm, &program, source, &SourceOptions::module(specifier))?;
        log::debug!("parsed module '{specifier}' ({} requested modules)", code.requested_modules.len());
        let record = Rc::new(ModuleRecord {
            specifier: Rc::from(specifier),
            realm: realm.clone(),
            code,
            environment: RefCell::new(None),
            namespace: RefCell::new(None),
            status: Cell::new(ModuleStatus::Unlinked),
            evaluation_error: RefCell::new(None),
            dfs_index: Cell::new(0),
            dfs_ancestor_index: Cell::new(0),
            resolved: RefCell::new(IndexMap::new()),
        });
        heap::track(Tracked::Module(Rc::downgrade(&record)));
        Ok(record)
    }

    pub(crate) fn trace(&self, visit: &mut dyn FnMut(usize)) -> bool {
        let (Ok(environment), Ok(namespace), Ok(error), Ok(resolved)) = (
            self.environment.try_borrow(),
            self.namespace.try_borrow(),
            self.evaluation_error.try_borrow(),
            self.resolved.try_borrow(),
        ) else {
            return false;
        };
        if let Some(env) = environment.as_ref() {
            visit(env.addr());
        }
        if let Some(namespace) = namespace.as_ref() {
            visit(namespace.addr());
        }
        match error.as_ref() {
            Some(Abrupt::Throw(value) | Abrupt::Return(value)) => trace_value(value, visit),
            Some(Abrupt::Break { value, .. } | Abrupt::Continue { value, .. }) => {
                if let Some(value) = value {
                    trace_value(value, visit);
                }
            }
            None => {}
        }
        for module in resolved.values() {
            visit(Rc::as_ptr(module) as *const () as usize);
        }
        true
    }

    /// Breaks the record's links to its environment, namespace and dependencies.
    pub(crate) fn release(&self) {
        let environment = self.environment.try_borrow_mut().ok().and_then(|mut env| env.take());
        let namespace = self.namespace.try_borrow_mut().ok().and_then(|mut namespace| namespace.take());
        let error = self.evaluation_error.try_borrow_mut().ok().and_then(|mut error| error.take());
        let resolved = self.resolved.try_borrow_mut().map(|mut resolved| std::mem::take(&mut *resolved)).ok();
        drop((environment, namespace, error, resolved));
    }

    pub fn status(&self) -> ModuleStatus {
        self.status.get()
    }

    /// The module environment, present once linking has started.
    pub fn environment(&self) -> Option<Environment> {
        self.environment.borrow().clone()
    }

    fn imported_module(&self, request: &str) -> Option<Rc<ModuleRecord>> {
        self.resolved.borrow().get(request).cloned()
    }

    fn requested(&self) -> Vec<Rc<ModuleRecord>> {
        self.code.requested_modules.iter().filter_map(|request| self.imported_module(request)).collect()
    }

    /// LoadRequestedModules: resolves every module request of the graph through `resolver`.
    pub fn load_requested_modules(self: &Rc<Self>, resolver: &dyn ModuleResolver) -> Result<(), JSError> {
        let mut visited: Vec<Rc<ModuleRecord>> = Vec::new();
        self.inner_load(resolver, &mut visited)
    }

    fn inner_load(self: &Rc<Self>, resolver: &dyn ModuleResolver, visited: &mut Vec<Rc<ModuleRecord>>) -> Result<(), JSError> {
        if visited.iter().any(|m| Rc::ptr_eq(m, self)) {
            return Ok(());
        }
        visited.push(self.clone());
        for request in &self.code.requested_modules {
            let module = match self.imported_module(request) {
                Some(module) => module,
                None => {
                    let module = resolver.resolve_imported_module(Some(self), request)?;
                    self.resolved.borrow_mut().insert(request.clone(), module.clone());
                    module
                }
            };
            module.inner_load(resolver, visited)?;
        }
        Ok(())
    }

    /// GetExportedNames(exportStarSet)
    pub fn get_exported_names(self: &Rc<Self>, export_star_set: &mut Vec<Rc<ModuleRecord>>) -> Vec<Rc<str>> {
        if export_star_set.iter().any(|m| Rc::ptr_eq(m, self)) {
            return Vec::new();
        }
        export_star_set.push(self.clone());
        let mut names: Vec<Rc<str>> = Vec::new();
        let direct = self.code.local_export_entries.iter().chain(&self.code.indirect_export_entries);
        names.extend(direct.filter_map(|entry| entry.export_name.clone()));
        for entry in &self.code.star_export_entries {
            let Some(requested) = entry.module_request.as_deref().and_then(|request| self.imported_module(request)) else {
                continue;
            };
            for name in requested.get_exported_names(export_star_set) {
                if &*name != "default" && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// ResolveExport(exportName, resolveSet)
    pub fn resolve_export(self: &Rc<Self>, export_name: &Rc<str>, resolve_set: &mut ResolveSet) -> ResolvedExport {
        if resolve_set.iter().any(|(m, name)| Rc::ptr_eq(m, self) && name == export_name) {
            // circular import request
            return ResolvedExport::NotFound;
        }
        resolve_set.push((self.clone(), export_name.clone()));

        for entry in &self.code.local_export_entries {
            if entry.export_name.as_ref() == Some(export_name)
                && let Some(local_name) = &entry.local_name
            {
                return ResolvedExport::Resolved(ResolvedBindingRecord {
                    module: self.clone(),
                    binding_name: BindingName::Name(local_name.clone()),
                });
            }
        }
        for entry in &self.code.indirect_export_entries {
            if entry.export_name.as_ref() != Some(export_name) {
                continue;
            }
            let Some(imported) = entry.module_request.as_deref().and_then(|request| self.imported_module(request)) else {
                return ResolvedExport::NotFound;
            };
            return match &entry.import_name {
                Some(ExportImportName::All) => ResolvedExport::Resolved(ResolvedBindingRecord {
                    module: imported,
                    binding_name: BindingName::Namespace,
                }),
                Some(ExportImportName::Name(import_name)) => imported.resolve_export(import_name, resolve_set),
                Some(ExportImportName::AllButDefault) | None => ResolvedExport::NotFound,
            };
        }
        if &**export_name == "default" {
            return ResolvedExport::NotFound;
        }

        let mut star_resolution: Option<ResolvedBindingRecord> = None;
        for entry in &self.code.star_export_entries {
            let Some(imported) = entry.module_request.as_deref().and_then(|request| self.imported_module(request)) else {
                continue;
            };
            match imported.resolve_export(export_name, resolve_set) {
                ResolvedExport::Ambiguous => return ResolvedExport::Ambiguous,
                ResolvedExport::NotFound => {}
                ResolvedExport::Resolved(resolution) => match &star_resolution {
                    None => star_resolution = Some(resolution),
                    Some(existing) => {
                        if !Rc::ptr_eq(&existing.module, &resolution.module) || existing.binding_name != resolution.binding_name {
                            return ResolvedExport::Ambiguous;
                        }
                    }
                },
            }
        }
        match star_resolution {
            Some(resolution) => ResolvedExport::Resolved(resolution),
            None => ResolvedExport::NotFound,
        }
    }

    /// Link(): InnerModuleLinking over the graph; on failure every module on the stack returns to `Unlinked`.
    pub fn link(self: &Rc<Self>, agent: &mut Agent) -> Completion<()> {
        log::debug!("linking module '{}'", self.specifier);
        let mut stack: Vec<Rc<ModuleRecord>> = Vec::new();
        match self.inner_link(agent, &mut stack, 0) {
            Ok(_) => Ok(()),
            Err(error) => {
                for module in stack {
                    module.status.set(ModuleStatus::Unlinked);
                    module.environment.replace(None);
                }
                Err(error)
            }
        }
    }

    fn inner_link(self: &Rc<Self>, agent: &mut Agent, stack: &mut Vec<Rc<ModuleRecord>>, mut index: usize) -> Completion<usize> {
        if self.status.get() != ModuleStatus::Unlinked {
            return Ok(index);
        }
        self.status.set(ModuleStatus::Linking);
        self.dfs_index.set(index);
        self.dfs_ancestor_index.set(index);
        index += 1;
        stack.push(self.clone());

        for required in self.requested() {
            index = required.inner_link(agent, stack, index)?;
            if required.status.get() == ModuleStatus::Linking {
                let ancestor = self.dfs_ancestor_index.get().min(required.dfs_ancestor_index.get());
                self.dfs_ancestor_index.set(ancestor);
            }
        }
        self.initialize_environment(agent)?;

        if self.dfs_ancestor_index.get() == self.dfs_index.get() {
            while let Some(module) = stack.pop() {
                module.status.set(ModuleStatus::Linked);
                if Rc::ptr_eq(&module, self) {
                    break;
                }
            }
        }
        Ok(index)
    }

    /// InitializeEnvironment()
    fn initialize_environment(self: &Rc<Self>, agent: &mut Agent) -> Completion<()> {
        for entry in &self.code.indirect_export_entries {
            let Some(export_name) = &entry.export_name else {
                continue;
            };
            match self.resolve_export(export_name, &mut ResolveSet::new()) {
                ResolvedExport::Resolved(_) => {}
                ResolvedExport::NotFound => {
                    return throw_syntax_error(agent, &format!("Export '{export_name}' of '{}' cannot be resolved", self.specifier));
                }
                ResolvedExport::Ambiguous => {
                    return throw_syntax_error(agent, &format!("Export '{export_name}' of '{}' is ambiguous", self.specifier));
                }
            }
        }

        let env = Environment::new_module(Some(self.realm.global_env()));
        self.environment.replace(Some(env.clone()));

        for entry in &self.code.import_entries {
            let Some(imported) = self.imported_module(&entry.module_request) else {
                return throw_syntax_error(agent, &format!("Module '{}' was not loaded", entry.module_request));
            };
            match &entry.import_name {
                ImportName::NamespaceObject => {
                    let namespace = imported.get_module_namespace(agent)?;
                    env.create_immutable_binding(agent, &entry.local_name, true)?;
                    env.initialize_binding(agent, &entry.local_name, Value::Object(namespace))?;
                }
                ImportName::Name(import_name) => match imported.resolve_export(import_name, &mut ResolveSet::new()) {
                    ResolvedExport::Resolved(ResolvedBindingRecord {
                        module,
                        binding_name: BindingName::Namespace,
                    }) => {
                        let namespace = module.get_module_namespace(agent)?;
                        env.create_immutable_binding(agent, &entry.local_name, true)?;
                        env.initialize_binding(agent, &entry.local_name, Value::Object(namespace))?;
                    }
                    ResolvedExport::Resolved(ResolvedBindingRecord {
                        module,
                        binding_name: BindingName::Name(binding_name),
                    }) => env.create_import_binding(&entry.local_name, module, binding_name),
                    ResolvedExport::NotFound => {
                        return throw_syntax_error(
                            agent,
                            &format!("The requested module '{}' does not provide an export named '{import_name}'", entry.module_request),
                        );
                    }
                    ResolvedExport::Ambiguous => {
                        return throw_syntax_error(
                            agent,
                            &format!("The requested module '{}' contains conflicting star exports for name '{import_name}'", entry.module_request),
                        );
                    }
                },
            }
        }

        let context = agent.new_context(None, Some(ScriptOrModule::Module(self.clone())), env.clone(), env.clone());
        agent.push_context(context)?;
        let result = self.code.instantiate_declarations(agent, &env);
        agent.pop_context();
        result
    }

    /// Evaluate(): InnerModuleEvaluation over the graph. A thrown error is recorded on every module
    /// of the failing strongly connected component and rethrown by later calls.
    pub fn evaluate(self: &Rc<Self>, agent: &mut Agent) -> Completion<()> {
        log::debug!("evaluating module '{}'", self.specifier);
        let mut stack: Vec<Rc<ModuleRecord>> = Vec::new();
        match self.inner_evaluate(agent, &mut stack, 0) {
            Ok(_) => Ok(()),
            Err(error) => {
                for module in stack {
                    module.status.set(ModuleStatus::Evaluated);
                    module.evaluation_error.replace(Some(error.clone()));
                }
                Err(error)
            }
        }
    }

    fn inner_evaluate(self: &Rc<Self>, agent: &mut Agent, stack: &mut Vec<Rc<ModuleRecord>>, mut index: usize) -> Completion<usize> {
        match self.status.get() {
            ModuleStatus::Evaluated => {
                return match self.evaluation_error.borrow().clone() {
                    Some(error) => Err(error),
                    None => Ok(index),
                };
            }
            ModuleStatus::Evaluating => return Ok(index),
            ModuleStatus::Linked => {}
            ModuleStatus::Unlinked | ModuleStatus::Linking => {
                return throw_syntax_error(agent, &format!("Module '{}' is not linked", self.specifier));
            }
        }
        self.status.set(ModuleStatus::Evaluating);
        self.dfs_index.set(index);
        self.dfs_ancestor_index.set(index);
        index += 1;
        stack.push(self.clone());

        for required in self.requested() {
            index = required.inner_evaluate(agent, stack, index)?;
            if required.status.get() == ModuleStatus::Evaluating {
                let ancestor = self.dfs_ancestor_index.get().min(required.dfs_ancestor_index.get());
                self.dfs_ancestor_index.set(ancestor);
            }
        }
        self.execute(agent)?;

        if self.dfs_ancestor_index.get() == self.dfs_index.get() {
            while let Some(module) = stack.pop() {
                module.status.set(ModuleStatus::Evaluated);
                if Rc::ptr_eq(&module, self) {
                    break;
                }
            }
        }
        Ok(index)
    }

    /// ExecuteModule()
    fn execute(self: &Rc<Self>, agent: &mut Agent) -> Completion<()> {
        let Some(env) = self.environment() else {
            return throw_syntax_error(agent, &format!("Module '{}' is not linked", self.specifier));
        };
        let context = agent.new_context(None, Some(ScriptOrModule::Module(self.clone())), env.clone(), env);
        agent.push_context(context)?;
        let result = self.code.evaluate(agent);
        agent.pop_context();
        result.map(|_| ())
    }

    /// GetModuleNamespace(module). Created once and cached.
    pub fn get_module_namespace(self: &Rc<Self>, agent: &mut Agent) -> Completion<Object> {
        if let Some(namespace) = self.namespace.borrow().clone() {
            return Ok(namespace);
        }
        let exported_names = self.get_exported_names(&mut Vec::new());
        let unambiguous: Vec<Rc<str>> = exported_names
            .into_iter()
            .filter(|name| matches!(self.resolve_export(name, &mut ResolveSet::new()), ResolvedExport::Resolved(_)))
            .collect();
        let namespace = module_namespace_create(agent, self, unambiguous);
        self.namespace.replace(Some(namespace.clone()));
        Ok(namespace)
    }
}

/// In-memory [`ModuleResolver`] keyed by specifier. Records are parsed on first request and cached.
pub struct ModuleMap {
    realm: Rc<Realm>,
    sources: RefCell<IndexMap<String, String>>,
    records: RefCell<IndexMap<String, Rc<ModuleRecord>>>,
}

impl Drop for ModuleMap {
    fn drop(&mut self) {
        // records link to each other and to their namespaces; free whatever the host no longer holds
        drop(std::mem::take(self.records.get_mut()));
        heap::collect_cycles();
    }
}

impl ModuleMap {
    pub fn new(realm: Rc<Realm>) -> Self {
        ModuleMap {
            realm,
            sources: RefCell::new(IndexMap::new()),
            records: RefCell::new(IndexMap::new()),
        }
    }

    pub fn insert(&self, specifier: &str, source: &str) {
        self.sources.borrow_mut().insert(specifier.to_string(), source.to_string());
    }

    /// The parsed record for `specifier`, if it has been requested already.
    pub fn get(&self, specifier: &str) -> Option<Rc<ModuleRecord>> {
        self.records.borrow().get(specifier).cloned()
    }
}

impl ModuleResolver for ModuleMap {
    fn resolve_imported_module(&self, referrer: Option<&ModuleRecord>, specifier: &str) -> Result<Rc<ModuleRecord>, JSError> {
        if let Some(record) = self.get(specifier) {
            return Ok(record);
        }
        let source = self.sources.borrow().get(specifier).cloned();
        let Some(source) = source else {
            return Err(JSError::ModuleNotFound {
                specifier: specifier.to_string(),
                referrer: referrer.map(|m| m.specifier.to_string()).unwrap_or_else(|| "<host>".to_string()),
            });
        };
        let record = ModuleRecord::parse(&self.realm, specifier, &source)?;
        self.records.borrow_mut().insert(specifier.to_string(), record.clone());
        Ok(record)
    }
}
