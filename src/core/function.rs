//! ECMAScript function objects: creation, [[Call]] and [[Construct]].

use crate::ast::FunctionCode;
use crate::core::{
    Agent, Completion, Environment, Intrinsic, Object, ObjectKind, Property, PropertyKey, ScriptOrModule, Value, call,
    create_data_property_or_throw, ordinary_create_from_constructor, ordinary_get_own_property, throw_type_error, to_object,
};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThisMode {
    Lexical,
    Strict,
    Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructorKind {
    Base,
    Derived,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Normal,
    ClassConstructor,
}

/// A ClassFieldDefinition Record. The initializer is a method whose home object is the class or its prototype.
#[derive(Clone)]
pub struct ClassFieldDefinition {
    pub name: PropertyKey,
    pub initializer: Option<Object>,
}

/// Internal slots of an ECMAScript function object.
pub struct FunctionData {
    pub environment: Environment,
    pub code: Rc<FunctionCode>,
    pub this_mode: ThisMode,
    pub strict: bool,
    pub home_object: Option<Object>,
    pub constructor_kind: ConstructorKind,
    pub kind: FunctionKind,
    pub is_constructor: bool,
    pub source_text: Rc<str>,
    pub fields: Vec<ClassFieldDefinition>,
    pub script_or_module: Option<ScriptOrModule>,
    /// Set on class field initializers: the field name used for NamedEvaluation of the initializer.
    pub class_field_initializer_name: Option<PropertyKey>,
}

impl FunctionData {
    pub(crate) fn trace(&self, visit: &mut dyn FnMut(usize)) {
        visit(self.environment.addr());
        if let Some(home) = &self.home_object {
            visit(home.addr());
        }
        for field in &self.fields {
            if let Some(initializer) = &field.initializer {
                visit(initializer.addr());
            }
        }
        if let Some(ScriptOrModule::Module(module)) = &self.script_or_module {
            visit(Rc::as_ptr(module) as *const () as usize);
        }
    }
}

fn with_function_data<R>(function: &Object, f: impl FnOnce(&mut FunctionData) -> R) -> Option<R> {
    match &mut function.borrow_mut().kind {
        ObjectKind::Function(data) => Some(f(data)),
        _ => None,
    }
}

fn read_function_data<R>(function: &Object, f: impl FnOnce(&FunctionData) -> R) -> Option<R> {
    match &function.borrow().kind {
        ObjectKind::Function(data) => Some(f(data)),
        _ => None,
    }
}

/// OrdinaryFunctionCreate(functionPrototype, sourceText, ParameterList, Body, thisMode, env)
pub fn ordinary_function_create(
    agent: &Agent,
    prototype: Object,
    source_text: Rc<str>,
    code: Rc<FunctionCode>,
    lexical_this: bool,
    env: Environment,
) -> Object {
    let strict = code.strict;
    let this_mode = if lexical_this {
        ThisMode::Lexical
    } else if strict {
        ThisMode::Strict
    } else {
        ThisMode::Global
    };
    let length = code.expected_argument_count;
    let data = FunctionData {
        environment: env,
        code,
        this_mode,
        strict,
        home_object: None,
        constructor_kind: ConstructorKind::Base,
        kind: FunctionKind::Normal,
        is_constructor: false,
        source_text,
        fields: Vec::new(),
        script_or_module: agent.active_script_or_module(),
        class_field_initializer_name: None,
    };
    let function = Object::new(Some(prototype), ObjectKind::Function(Box::new(data)));
    set_function_length(&function, length);
    function
}

/// SetFunctionLength(F, length)
pub fn set_function_length(function: &Object, length: usize) {
    function.define_raw("length", Property::data(Value::from(length), false, false, true));
}

/// SetFunctionName(F, name, prefix)
pub fn set_function_name(function: &Object, name: &PropertyKey, prefix: Option<&str>) {
    let name = match name {
        PropertyKey::Symbol(symbol) => match symbol.description() {
            Some(description) => format!("[{description}]"),
            None => String::new(),
        },
        PropertyKey::String(s) => s.to_string(),
    };
    let name = match prefix {
        Some(prefix) => format!("{prefix} {name}"),
        None => name,
    };
    function.define_raw("name", Property::data(Value::from(name), false, false, true));
}

/// MakeConstructor(F, writablePrototype, prototype)
pub fn make_constructor(agent: &Agent, function: &Object, writable_prototype: bool, prototype: Option<Object>) {
    with_function_data(function, |data| data.is_constructor = true);
    let prototype = prototype.unwrap_or_else(|| {
        let prototype = Object::ordinary(Some(agent.intrinsic(Intrinsic::ObjectPrototype)));
        prototype.define_raw("constructor", Property::data(Value::Object(function.clone()), writable_prototype, false, true));
        prototype
    });
    function.define_raw("prototype", Property::data(Value::Object(prototype), writable_prototype, false, false));
}

/// MakeClassConstructor(F)
pub fn make_class_constructor(function: &Object) {
    with_function_data(function, |data| data.kind = FunctionKind::ClassConstructor);
}

/// MakeMethod(F, homeObject)
pub fn make_method(function: &Object, home_object: &Object) {
    with_function_data(function, |data| data.home_object = Some(home_object.clone()));
}

pub fn set_constructor_kind(function: &Object, kind: ConstructorKind) {
    with_function_data(function, |data| data.constructor_kind = kind);
}

pub fn set_source_text(function: &Object, source_text: Rc<str>) {
    with_function_data(function, |data| data.source_text = source_text);
}

pub fn set_class_fields(function: &Object, fields: Vec<ClassFieldDefinition>) {
    with_function_data(function, |data| data.fields = fields);
}

pub fn set_class_field_initializer_name(function: &Object, name: PropertyKey) {
    with_function_data(function, |data| data.class_field_initializer_name = Some(name));
}

pub fn function_source_text(function: &Object) -> Option<Rc<str>> {
    read_function_data(function, |data| data.source_text.clone())
}

pub fn class_field_initializer_name(function: &Object) -> Option<PropertyKey> {
    read_function_data(function, |data| data.class_field_initializer_name.clone()).flatten()
}

/// The current value of an own `name` data property, for diagnostics.
pub fn function_name(function: &Object) -> String {
    match ordinary_get_own_property(function, &PropertyKey::from("name")) {
        Some(Property::Data {
            value: Value::String(name), ..
        }) if !name.is_empty() => name.to_string(),
        _ => "anonymous".to_string(),
    }
}

/// PrepareForOrdinaryCall(F, newTarget). Pushes the callee context and returns its function environment.
pub fn prepare_for_ordinary_call(agent: &mut Agent, function: &Object, new_target: Value) -> Completion<Environment> {
    let script_or_module = read_function_data(function, |data| data.script_or_module.clone()).flatten();
    let env = Environment::new_function(function, new_target);
    let context = agent.new_context(Some(function.clone()), script_or_module, env.clone(), env.clone());
    agent.push_context(context)?;
    Ok(env)
}

/// OrdinaryCallBindThis(F, calleeContext, thisArgument)
pub fn ordinary_call_bind_this(agent: &mut Agent, function: &Object, env: &Environment, this_argument: &Value) -> Completion<()> {
    let this_mode = read_function_data(function, |data| data.this_mode).unwrap_or(ThisMode::Strict);
    let this_value = match this_mode {
        ThisMode::Lexical => return Ok(()),
        ThisMode::Strict => this_argument.clone(),
        ThisMode::Global if this_argument.is_nullish() => Value::Object(agent.global_object()),
        ThisMode::Global => Value::Object(to_object(agent, this_argument)?),
    };
    env.bind_this_value(agent, this_value)
}

/// [[Call]] for ECMAScript function objects.
pub fn call_ecmascript_function(agent: &mut Agent, function: &Object, this: &Value, args: &[Value]) -> Completion<Value> {
    let Some((kind, code)) = read_function_data(function, |data| (data.kind, data.code.clone())) else {
        return throw_type_error(agent, "not an ECMAScript function");
    };
    if kind == FunctionKind::ClassConstructor {
        let name = function_name(function);
        return throw_type_error(agent, &format!("Class constructor {name} cannot be invoked without 'new'"));
    }
    let env = prepare_for_ordinary_call(agent, function, Value::Undefined)?;
    let result = match ordinary_call_bind_this(agent, function, &env, this) {
        Ok(()) => code.evaluate_body(agent, function, args),
        Err(error) => Err(error),
    };
    agent.pop_context();
    result
}

/// [[Construct]] for ECMAScript function objects.
pub fn construct_ecmascript_function(agent: &mut Agent, function: &Object, args: &[Value], new_target: &Object) -> Completion<Value> {
    let Some((constructor_kind, code)) = read_function_data(function, |data| (data.constructor_kind, data.code.clone())) else {
        return throw_type_error(agent, "not an ECMAScript function");
    };
    let this_argument = match constructor_kind {
        ConstructorKind::Base => Some(ordinary_create_from_constructor(
            agent,
            new_target,
            Intrinsic::ObjectPrototype,
            ObjectKind::Ordinary,
        )?),
        ConstructorKind::Derived => None,
    };
    let env = prepare_for_ordinary_call(agent, function, Value::Object(new_target.clone()))?;
    let mut result = Ok(Value::Undefined);
    if let Some(this) = &this_argument {
        result = ordinary_call_bind_this(agent, function, &env, &Value::Object(this.clone()))
            .and_then(|_| Ok(initialize_instance_elements(agent, this, function)?))
            .map(|_| Value::Undefined);
    }
    if result.is_ok() {
        result = code.evaluate_body(agent, function, args);
    }
    agent.pop_context();

    match result? {
        Value::Object(object) => Ok(Value::Object(object)),
        value => {
            if let Some(this) = this_argument {
                return Ok(Value::Object(this));
            }
            if !value.is_undefined() {
                return throw_type_error(agent, "Derived constructors may only return object or undefined");
            }
            let this = env.get_this_binding(agent)?;
            match this {
                Value::Object(_) => Ok(this),
                _ => throw_type_error(agent, "Derived constructor did not initialize 'this'"),
            }
        }
    }
}

/// DefineField(receiver, fieldRecord)
pub fn define_field(agent: &mut Agent, receiver: &Object, field: &ClassFieldDefinition) -> Completion<()> {
    let value = match &field.initializer {
        Some(initializer) => call(agent, &Value::Object(initializer.clone()), &Value::Object(receiver.clone()), &[])?,
        None => Value::Undefined,
    };
    create_data_property_or_throw(agent, receiver, &field.name, value)
}

/// InitializeInstanceElements(O, constructor)
pub fn initialize_instance_elements(agent: &mut Agent, object: &Object, constructor: &Object) -> Completion<()> {
    let fields = read_function_data(constructor, |data| data.fields.clone()).unwrap_or_default();
    for field in &fields {
        define_field(agent, object, field)?;
    }
    Ok(())
}
