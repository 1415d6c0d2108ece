use crate::core::{
    Agent, Completion, Object, ObjectKind, PropertyDescriptor, PropertyKey, Reference, ThisMode, Value,
    define_property_or_throw, get, has_own_property, has_property, module::ModuleRecord, set, throw_reference_error, throw_type_error,
};
use crate::core::heap::{self, Tracked, trace_value};
use indexmap::{IndexMap, IndexSet};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

/// A binding slot in a declarative-style record.
pub enum Binding {
    Direct {
        mutable: bool,
        initialized: bool,
        /// Immutable bindings created strict throw on assignment even in sloppy code.
        strict: bool,
        deletable: bool,
        value: Value,
    },
    /// Indirect binding created by CreateImportBinding; reads go to the target module's environment.
    Import { module: Rc<ModuleRecord>, name: Rc<str> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThisBindingStatus {
    Lexical,
    Initialized,
    Uninitialized,
}

pub enum EnvironmentKind {
    Declarative,
    Function {
        this_value: Value,
        this_status: ThisBindingStatus,
        function_object: Object,
        new_target: Value,
    },
    Module,
    /// The declarative half lives in `bindings`; the object half is `object`.
    Global {
        object: Object,
        this_value: Object,
        var_names: IndexSet<Rc<str>>,
    },
}

pub struct EnvironmentRecord {
    pub outer: Option<Environment>,
    pub bindings: IndexMap<Rc<str>, Binding>,
    pub kind: EnvironmentKind,
}

#[derive(Clone)]
pub struct Environment(Rc<RefCell<EnvironmentRecord>>);

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.borrow().kind {
            EnvironmentKind::Declarative => "Declarative",
            EnvironmentKind::Function { .. } => "Function",
            EnvironmentKind::Module => "Module",
            EnvironmentKind::Global { .. } => "Global",
        };
        write!(f, "{kind}Environment({} bindings)", self.borrow().bindings.len())
    }
}

enum Lookup {
    Missing,
    Uninitialized,
    Value(Value),
    Import(Rc<ModuleRecord>, Rc<str>),
}

impl Environment {
    fn from_record(outer: Option<Environment>, kind: EnvironmentKind) -> Self {
        let env = Environment(Rc::new(RefCell::new(EnvironmentRecord {
            outer,
            bindings: IndexMap::new(),
            kind,
        })));
        heap::track(Tracked::Environment(env.weak()));
        env
    }

    pub(crate) fn from_rc(rc: Rc<RefCell<EnvironmentRecord>>) -> Self {
        Environment(rc)
    }

    pub(crate) fn weak(&self) -> Weak<RefCell<EnvironmentRecord>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn trace(&self, visit: &mut dyn FnMut(usize)) -> bool {
        let Ok(record) = self.0.try_borrow() else {
            return false;
        };
        if let Some(outer) = &record.outer {
            visit(outer.addr());
        }
        for binding in record.bindings.values() {
            match binding {
                Binding::Direct { value, .. } => trace_value(value, visit),
                Binding::Import { module, .. } => visit(Rc::as_ptr(module) as *const () as usize),
            }
        }
        match &record.kind {
            EnvironmentKind::Function {
                this_value,
                function_object,
                new_target,
                ..
            } => {
                trace_value(this_value, visit);
                visit(function_object.addr());
                trace_value(new_target, visit);
            }
            EnvironmentKind::Global { object, this_value, .. } => {
                visit(object.addr());
                visit(this_value.addr());
            }
            EnvironmentKind::Declarative | EnvironmentKind::Module => {}
        }
        true
    }

    pub(crate) fn release(&self) {
        let released = match self.0.try_borrow_mut() {
            Ok(mut record) => Some((
                record.outer.take(),
                std::mem::take(&mut record.bindings),
                std::mem::replace(&mut record.kind, EnvironmentKind::Declarative),
            )),
            Err(_) => None,
        };
        drop(released);
    }

    /// NewDeclarativeEnvironment(E)
    pub fn new_declarative(outer: Option<Environment>) -> Self {
        Self::from_record(outer, EnvironmentKind::Declarative)
    }

    /// NewFunctionEnvironment(F, newTarget)
    pub fn new_function(function: &Object, new_target: Value) -> Self {
        let (outer, this_mode) = match &function.borrow().kind {
            ObjectKind::Function(data) => (Some(data.environment.clone()), data.this_mode),
            _ => (None, ThisMode::Strict),
        };
        let this_status = if this_mode == ThisMode::Lexical {
            ThisBindingStatus::Lexical
        } else {
            ThisBindingStatus::Uninitialized
        };
        Self::from_record(
            outer,
            EnvironmentKind::Function {
                this_value: Value::Undefined,
                this_status,
                function_object: function.clone(),
                new_target,
            },
        )
    }

    /// NewModuleEnvironment(E)
    pub fn new_module(outer: Option<Environment>) -> Self {
        Self::from_record(outer, EnvironmentKind::Module)
    }

    /// NewGlobalEnvironment(G, thisValue)
    pub fn new_global(object: Object, this_value: Object) -> Self {
        Self::from_record(
            None,
            EnvironmentKind::Global {
                object,
                this_value,
                var_names: IndexSet::new(),
            },
        )
    }

    pub fn borrow(&self) -> Ref<'_, EnvironmentRecord> {
        self.0.borrow()
    }

    fn borrow_mut(&self) -> RefMut<'_, EnvironmentRecord> {
        self.0.borrow_mut()
    }

    pub fn outer(&self) -> Option<Environment> {
        self.borrow().outer.clone()
    }

    pub fn is_global(&self) -> bool {
        matches!(self.borrow().kind, EnvironmentKind::Global { .. })
    }

    fn global_object(&self) -> Option<Object> {
        match &self.borrow().kind {
            EnvironmentKind::Global { object, .. } => Some(object.clone()),
            _ => None,
        }
    }

    fn has_declarative_binding(&self, name: &str) -> bool {
        self.borrow().bindings.contains_key(name)
    }

    fn lookup(&self, name: &str) -> Lookup {
        match self.borrow().bindings.get(name) {
            None => Lookup::Missing,
            Some(Binding::Direct { initialized: false, .. }) => Lookup::Uninitialized,
            Some(Binding::Direct { value, .. }) => Lookup::Value(value.clone()),
            Some(Binding::Import { module, name }) => Lookup::Import(module.clone(), name.clone()),
        }
    }

    /// HasBinding(N)
    pub fn has_binding(&self, agent: &mut Agent, name: &str) -> Completion<bool> {
        if self.has_declarative_binding(name) {
            return Ok(true);
        }
        match self.global_object() {
            Some(object) => has_property(agent, &object, &PropertyKey::from(name)),
            None => Ok(false),
        }
    }

    /// CreateMutableBinding(N, D)
    pub fn create_mutable_binding(&self, agent: &mut Agent, name: &str, deletable: bool) -> Completion<()> {
        if self.is_global() && self.has_declarative_binding(name) {
            return throw_type_error(agent, &format!("Identifier '{name}' has already been declared"));
        }
        self.borrow_mut().bindings.insert(
            Rc::from(name),
            Binding::Direct {
                mutable: true,
                initialized: false,
                strict: false,
                deletable,
                value: Value::Undefined,
            },
        );
        Ok(())
    }

    /// CreateImmutableBinding(N, S)
    pub fn create_immutable_binding(&self, agent: &mut Agent, name: &str, strict: bool) -> Completion<()> {
        if self.is_global() && self.has_declarative_binding(name) {
            return throw_type_error(agent, &format!("Identifier '{name}' has already been declared"));
        }
        self.borrow_mut().bindings.insert(
            Rc::from(name),
            Binding::Direct {
                mutable: false,
                initialized: false,
                strict,
                deletable: false,
                value: Value::Undefined,
            },
        );
        Ok(())
    }

    /// CreateImportBinding(N, M, N2)
    pub fn create_import_binding(&self, name: &str, module: Rc<ModuleRecord>, binding_name: Rc<str>) {
        self.borrow_mut()
            .bindings
            .insert(Rc::from(name), Binding::Import { module, name: binding_name });
    }

    /// InitializeBinding(N, V)
    pub fn initialize_binding(&self, agent: &mut Agent, name: &str, value: Value) -> Completion<()> {
        {
            let mut record = self.borrow_mut();
            if let Some(Binding::Direct {
                initialized, value: slot, ..
            }) = record.bindings.get_mut(name)
            {
                *slot = value;
                *initialized = true;
                return Ok(());
            }
        }
        match self.global_object() {
            // object record: InitializeBinding is SetMutableBinding(N, V, false)
            Some(object) => {
                set(agent, &object, &PropertyKey::from(name), value, false)?;
                Ok(())
            }
            None => throw_reference_error(agent, &format!("{name} is not defined")),
        }
    }

    /// SetMutableBinding(N, V, S)
    pub fn set_mutable_binding(&self, agent: &mut Agent, name: &str, value: Value, strict: bool) -> Completion<()> {
        enum Outcome {
            Done,
            Missing,
            Uninitialized,
            ConstAssign { strict: bool },
        }
        let outcome = {
            let mut record = self.borrow_mut();
            match record.bindings.get_mut(name) {
                None => Outcome::Missing,
                Some(Binding::Import { .. }) => Outcome::ConstAssign { strict: true },
                Some(Binding::Direct { initialized: false, .. }) => Outcome::Uninitialized,
                Some(Binding::Direct {
                    mutable: true, value: slot, ..
                }) => {
                    *slot = value.clone();
                    Outcome::Done
                }
                Some(Binding::Direct { strict: s, .. }) => Outcome::ConstAssign { strict: *s },
            }
        };
        match outcome {
            Outcome::Done => Ok(()),
            Outcome::Uninitialized => throw_reference_error(agent, &format!("Cannot access '{name}' before initialization")),
            Outcome::ConstAssign { strict: s } => {
                if s || strict {
                    throw_type_error(agent, "Assignment to constant variable.")
                } else {
                    Ok(())
                }
            }
            Outcome::Missing => match self.global_object() {
                Some(object) => {
                    let key = PropertyKey::from(name);
                    if strict && !has_property(agent, &object, &key)? {
                        return throw_reference_error(agent, &format!("{name} is not defined"));
                    }
                    set(agent, &object, &key, value, strict)?;
                    Ok(())
                }
                None if strict => throw_reference_error(agent, &format!("{name} is not defined")),
                None => {
                    self.create_mutable_binding(agent, name, true)?;
                    self.initialize_binding(agent, name, value)
                }
            },
        }
    }

    /// GetBindingValue(N, S)
    pub fn get_binding_value(&self, agent: &mut Agent, name: &str, strict: bool) -> Completion<Value> {
        match self.lookup(name) {
            Lookup::Value(value) => Ok(value),
            Lookup::Uninitialized => throw_reference_error(agent, &format!("Cannot access '{name}' before initialization")),
            Lookup::Import(module, binding_name) => match module.environment() {
                Some(target) => target.get_binding_value(agent, &binding_name, true),
                None => throw_reference_error(agent, &format!("Module '{}' is not linked", module.specifier)),
            },
            Lookup::Missing => match self.global_object() {
                Some(object) => {
                    let key = PropertyKey::from(name);
                    if !has_property(agent, &object, &key)? {
                        if strict {
                            return throw_reference_error(agent, &format!("{name} is not defined"));
                        }
                        return Ok(Value::Undefined);
                    }
                    get(agent, &object, &key)
                }
                None => throw_reference_error(agent, &format!("{name} is not defined")),
            },
        }
    }

    /// DeleteBinding(N)
    pub fn delete_binding(&self, agent: &mut Agent, name: &str) -> Completion<bool> {
        let deletable = match self.borrow().bindings.get(name) {
            Some(Binding::Direct { deletable, .. }) => Some(*deletable),
            Some(Binding::Import { .. }) => Some(false),
            None => None,
        };
        match deletable {
            Some(true) => {
                self.borrow_mut().bindings.shift_remove(name);
                Ok(true)
            }
            Some(false) => Ok(false),
            None => {
                let Some(object) = self.global_object() else {
                    return Ok(true);
                };
                let key = PropertyKey::from(name);
                if !has_own_property(agent, &object, &key)? {
                    return Ok(true);
                }
                let status = object.delete(agent, &key)?;
                if status && let EnvironmentKind::Global { var_names, .. } = &mut self.borrow_mut().kind {
                    var_names.shift_remove(name);
                }
                Ok(status)
            }
        }
    }

    /// HasThisBinding()
    pub fn has_this_binding(&self) -> bool {
        match &self.borrow().kind {
            EnvironmentKind::Function { this_status, .. } => *this_status != ThisBindingStatus::Lexical,
            EnvironmentKind::Module | EnvironmentKind::Global { .. } => true,
            EnvironmentKind::Declarative => false,
        }
    }

    /// HasSuperBinding()
    pub fn has_super_binding(&self) -> bool {
        match &self.borrow().kind {
            EnvironmentKind::Function {
                this_status, function_object, ..
            } => *this_status != ThisBindingStatus::Lexical && home_object(function_object).is_some(),
            _ => false,
        }
    }

    /// WithBaseObject(). There are no object environments besides the global one.
    pub fn with_base_object(&self) -> Value {
        Value::Undefined
    }

    /// BindThisValue(V)
    pub fn bind_this_value(&self, agent: &mut Agent, value: Value) -> Completion<()> {
        let already = {
            let mut record = self.borrow_mut();
            match &mut record.kind {
                EnvironmentKind::Function {
                    this_value, this_status, ..
                } if *this_status == ThisBindingStatus::Uninitialized => {
                    *this_value = value;
                    *this_status = ThisBindingStatus::Initialized;
                    false
                }
                _ => true,
            }
        };
        if already {
            return throw_reference_error(agent, "Super constructor may only be called once");
        }
        Ok(())
    }

    /// GetThisBinding()
    pub fn get_this_binding(&self, agent: &mut Agent) -> Completion<Value> {
        let this = match &self.borrow().kind {
            EnvironmentKind::Function {
                this_value, this_status, ..
            } => (*this_status == ThisBindingStatus::Initialized).then(|| this_value.clone()),
            EnvironmentKind::Global { this_value, .. } => Some(Value::Object(this_value.clone())),
            EnvironmentKind::Module => Some(Value::Undefined),
            EnvironmentKind::Declarative => Some(Value::Undefined),
        };
        match this {
            Some(this) => Ok(this),
            None => throw_reference_error(
                agent,
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            ),
        }
    }

    /// GetSuperBase()
    pub fn get_super_base(&self) -> Value {
        let home = match &self.borrow().kind {
            EnvironmentKind::Function { function_object, .. } => home_object(function_object),
            _ => None,
        };
        match home {
            Some(home) => Value::from(home.get_prototype_of()),
            None => Value::Undefined,
        }
    }

    pub fn function_object(&self) -> Option<Object> {
        match &self.borrow().kind {
            EnvironmentKind::Function { function_object, .. } => Some(function_object.clone()),
            _ => None,
        }
    }

    pub fn new_target(&self) -> Value {
        match &self.borrow().kind {
            EnvironmentKind::Function { new_target, .. } => new_target.clone(),
            _ => Value::Undefined,
        }
    }

    /// Whether this function environment belongs to a derived constructor that has not called `super()` yet.
    pub fn is_this_uninitialized(&self) -> bool {
        matches!(
            self.borrow().kind,
            EnvironmentKind::Function {
                this_status: ThisBindingStatus::Uninitialized,
                ..
            }
        )
    }

    // Global Environment Records

    /// HasVarDeclaration(N)
    pub fn has_var_declaration(&self, name: &str) -> bool {
        match &self.borrow().kind {
            EnvironmentKind::Global { var_names, .. } => var_names.contains(name),
            _ => false,
        }
    }

    /// HasLexicalDeclaration(N)
    pub fn has_lexical_declaration(&self, name: &str) -> bool {
        self.is_global() && self.has_declarative_binding(name)
    }

    /// HasRestrictedGlobalProperty(N)
    pub fn has_restricted_global_property(&self, agent: &mut Agent, name: &str) -> Completion<bool> {
        let Some(object) = self.global_object() else {
            return Ok(false);
        };
        match object.get_own_property(agent, &PropertyKey::from(name))? {
            None => Ok(false),
            Some(property) => Ok(!property.configurable()),
        }
    }

    /// CanDeclareGlobalVar(N)
    pub fn can_declare_global_var(&self, agent: &mut Agent, name: &str) -> Completion<bool> {
        let Some(object) = self.global_object() else {
            return Ok(false);
        };
        if has_own_property(agent, &object, &PropertyKey::from(name))? {
            return Ok(true);
        }
        Ok(object.is_extensible())
    }

    /// CanDeclareGlobalFunction(N)
    pub fn can_declare_global_function(&self, agent: &mut Agent, name: &str) -> Completion<bool> {
        let Some(object) = self.global_object() else {
            return Ok(false);
        };
        match object.get_own_property(agent, &PropertyKey::from(name))? {
            None => Ok(object.is_extensible()),
            Some(property) if property.configurable() => Ok(true),
            Some(crate::core::Property::Data {
                writable, enumerable, ..
            }) => Ok(writable && enumerable),
            Some(_) => Ok(false),
        }
    }

    /// CreateGlobalVarBinding(N, D)
    pub fn create_global_var_binding(&self, agent: &mut Agent, name: &str, deletable: bool) -> Completion<()> {
        let Some(object) = self.global_object() else {
            return Ok(());
        };
        let key = PropertyKey::from(name);
        let has_own = has_own_property(agent, &object, &key)?;
        if !has_own && object.is_extensible() {
            define_property_or_throw(agent, &object, &key, PropertyDescriptor::data(Value::Undefined, true, true, deletable))?;
        }
        if let EnvironmentKind::Global { var_names, .. } = &mut self.borrow_mut().kind {
            var_names.insert(Rc::from(name));
        }
        Ok(())
    }

    /// CreateGlobalFunctionBinding(N, V, D)
    pub fn create_global_function_binding(&self, agent: &mut Agent, name: &str, value: Value, deletable: bool) -> Completion<()> {
        let Some(object) = self.global_object() else {
            return Ok(());
        };
        let key = PropertyKey::from(name);
        let existing = object.get_own_property(agent, &key)?;
        let desc = match existing {
            Some(property) if !property.configurable() => PropertyDescriptor {
                value: Some(value.clone()),
                ..Default::default()
            },
            _ => PropertyDescriptor::data(value.clone(), true, true, deletable),
        };
        define_property_or_throw(agent, &object, &key, desc)?;
        set(agent, &object, &key, value, false)?;
        if let EnvironmentKind::Global { var_names, .. } = &mut self.borrow_mut().kind {
            var_names.insert(Rc::from(name));
        }
        Ok(())
    }

    /// The global `this` value, for OrdinaryCallBindThis in sloppy functions.
    pub fn global_this_value(&self) -> Option<Object> {
        match &self.borrow().kind {
            EnvironmentKind::Global { this_value, .. } => Some(this_value.clone()),
            _ => None,
        }
    }
}

fn home_object(function: &Object) -> Option<Object> {
    match &function.borrow().kind {
        ObjectKind::Function(data) => data.home_object.clone(),
        _ => None,
    }
}

/// GetIdentifierReference(env, name, strict)
pub fn get_identifier_reference(agent: &mut Agent, env: Option<Environment>, name: &Rc<str>, strict: bool) -> Completion<Reference> {
    let mut current = env;
    while let Some(env) = current {
        if env.has_binding(agent, name)? {
            return Ok(Reference::Binding {
                env,
                name: name.clone(),
                strict,
            });
        }
        current = env.outer();
    }
    Ok(Reference::Unresolvable {
        name: name.clone(),
        strict,
    })
}

#[cfg(test)]
mod environment_tests {
    use super::*;
    use crate::core::Abrupt;
    use crate::options::AgentOptions;

    fn thrown_name(agent: &mut Agent, abrupt: Abrupt) -> String {
        let Abrupt::Throw(Value::Object(error)) = abrupt else {
            panic!("expected a thrown object");
        };
        let name = get(agent, &error, &PropertyKey::from("name")).unwrap();
        name.to_string()
    }

    #[test]
    fn test_declarative_tdz_and_const() {
        let mut agent = Agent::new(AgentOptions::default());
        let env = Environment::new_declarative(None);
        env.create_mutable_binding(&mut agent, "x", false).unwrap();
        env.create_immutable_binding(&mut agent, "k", true).unwrap();

        let err = env.get_binding_value(&mut agent, "x", true).unwrap_err();
        assert_eq!(thrown_name(&mut agent, err), "ReferenceError");

        env.initialize_binding(&mut agent, "x", Value::from(1.0)).unwrap();
        env.initialize_binding(&mut agent, "k", Value::from(2.0)).unwrap();
        env.set_mutable_binding(&mut agent, "x", Value::from(3.0), true).unwrap();
        assert_eq!(env.get_binding_value(&mut agent, "x", true).unwrap(), Value::from(3.0));

        let err = env.set_mutable_binding(&mut agent, "k", Value::from(4.0), false).unwrap_err();
        assert_eq!(thrown_name(&mut agent, err), "TypeError");
    }

    #[test]
    fn test_identifier_reference_walks_outer_chain() {
        let mut agent = Agent::new(AgentOptions::default());
        let outer = Environment::new_declarative(None);
        outer.create_mutable_binding(&mut agent, "a", false).unwrap();
        outer.initialize_binding(&mut agent, "a", Value::from("outer")).unwrap();
        let inner = Environment::new_declarative(Some(outer.clone()));

        let name: Rc<str> = Rc::from("a");
        match get_identifier_reference(&mut agent, Some(inner), &name, true).unwrap() {
            Reference::Binding { env, .. } => assert!(env == outer),
            other => panic!("unexpected reference {other:?}"),
        }
        let missing: Rc<str> = Rc::from("missing");
        let reference = get_identifier_reference(&mut agent, Some(outer), &missing, true).unwrap();
        assert!(matches!(reference, Reference::Unresolvable { .. }));
    }

    #[test]
    fn test_global_lexical_and_var_bookkeeping() {
        let mut agent = Agent::new(AgentOptions::default());
        let global = agent.realm().global_env();
        global.create_global_var_binding(&mut agent, "v", false).unwrap();
        assert!(global.has_var_declaration("v"));
        assert!(!global.has_lexical_declaration("v"));
        assert!(global.has_binding(&mut agent, "v").unwrap());

        global.create_mutable_binding(&mut agent, "l", false).unwrap();
        assert!(global.has_lexical_declaration("l"));
        assert!(global.create_mutable_binding(&mut agent, "l", false).is_err());
        assert!(global.has_restricted_global_property(&mut agent, "undefined").unwrap());
    }
}
