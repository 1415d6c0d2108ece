//! Built-in intrinsics. Each submodule installs one family of constructors and
//! prototypes into the realm's [`Intrinsics`] table.

use crate::core::{Agent, Completion, Intrinsic, Intrinsics, Object, ObjectKind, Property, PropertyKey, Symbol, Value, WellKnownSymbols};

mod array;
mod error;
mod function;
mod iterator;
mod object;
mod symbol;
mod wrappers;

pub(crate) use object::object_prototype_to_string;

/// Behavior of a built-in function: `(agent, this, arguments, new_target)`.
/// `new_target` is `Some` only when invoked through [[Construct]].
pub type NativeFn = fn(&mut Agent, &Value, &[Value], Option<&Object>) -> Completion<Value>;

#[derive(Clone, Copy)]
pub struct BuiltinFunction {
    pub behavior: NativeFn,
    pub constructor: bool,
}

/// [[Call]] for built-in function objects.
pub(crate) fn call_builtin(agent: &mut Agent, function: &Object, behavior: NativeFn, this: &Value, args: &[Value]) -> Completion<Value> {
    let env = agent.realm().global_env();
    let context = agent.new_context(Some(function.clone()), None, env.clone(), env);
    agent.push_context(context)?;
    let result = behavior(agent, this, args, None);
    agent.pop_context();
    result
}

/// [[Construct]] for built-in function objects.
pub(crate) fn construct_builtin(
    agent: &mut Agent,
    function: &Object,
    behavior: NativeFn,
    args: &[Value],
    new_target: &Object,
) -> Completion<Value> {
    let env = agent.realm().global_env();
    let context = agent.new_context(Some(function.clone()), None, env.clone(), env);
    agent.push_context(context)?;
    let result = behavior(agent, &Value::Undefined, args, Some(new_target));
    agent.pop_context();
    result
}

/// The n-th argument, `undefined` when absent.
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// CreateBuiltinFunction(behavior, length, name, realm, prototype)
pub(crate) fn create_builtin_function(
    function_prototype: &Object,
    name: &str,
    length: usize,
    behavior: NativeFn,
    constructor: bool,
) -> Object {
    let function = Object::new(
        Some(function_prototype.clone()),
        ObjectKind::Builtin(BuiltinFunction { behavior, constructor }),
    );
    function.define_raw("length", Property::data(Value::from(length), false, false, true));
    function.define_raw("name", Property::data(Value::from(name), false, false, true));
    function
}

/// Helper used while the intrinsics are being created.
pub(crate) struct Installer<'a> {
    pub intrinsics: &'a mut Intrinsics,
    pub symbols: &'a WellKnownSymbols,
}

impl Installer<'_> {
    pub fn get(&self, intrinsic: Intrinsic) -> Object {
        self.intrinsics.get(intrinsic)
    }

    pub fn function_prototype(&self) -> Object {
        self.intrinsics.get(Intrinsic::FunctionPrototype)
    }

    pub fn function(&self, name: &str, length: usize, behavior: NativeFn) -> Object {
        create_builtin_function(&self.function_prototype(), name, length, behavior, false)
    }

    pub fn method(&self, target: &Object, name: &str, length: usize, behavior: NativeFn) -> Object {
        let function = self.function(name, length, behavior);
        target.define_raw(name, Property::method(Value::Object(function.clone())));
        function
    }

    /// Installs a symbol-keyed method; its name is `[description]`.
    pub fn symbol_method(&self, target: &Object, symbol: &Symbol, length: usize, behavior: NativeFn, writable: bool) -> Object {
        let name = format!("[{}]", symbol.description().as_deref().unwrap_or(""));
        let function = self.function(&name, length, behavior);
        target.define_raw(
            PropertyKey::Symbol(symbol.clone()),
            Property::data(Value::Object(function.clone()), writable, false, writable),
        );
        function
    }

    pub fn to_string_tag(&self, target: &Object, tag: &str) {
        let key = PropertyKey::Symbol(self.symbols.get(crate::core::WellKnownSymbol::ToStringTag));
        target.define_raw(key, Property::data(Value::from(tag), false, false, true));
    }

    /// Creates a constructor, links it with `prototype` and records both intrinsics.
    pub fn constructor(
        &mut self,
        name: &str,
        length: usize,
        behavior: NativeFn,
        prototype: Object,
        constructor_slot: Intrinsic,
        prototype_slot: Intrinsic,
    ) -> Object {
        let constructor = create_builtin_function(&self.function_prototype(), name, length, behavior, true);
        constructor.define_raw("prototype", Property::data(Value::Object(prototype.clone()), false, false, false));
        prototype.define_raw("constructor", Property::method(Value::Object(constructor.clone())));
        self.intrinsics.set(constructor_slot, constructor.clone());
        self.intrinsics.set(prototype_slot, prototype);
        constructor
    }
}

/// CreateIntrinsics(realmRec)
pub(crate) fn create_intrinsics(symbols: &WellKnownSymbols) -> Intrinsics {
    let mut intrinsics = Intrinsics::new();
    let object_prototype = Object::ordinary(None);
    let function_prototype = Object::new(
        Some(object_prototype.clone()),
        ObjectKind::Builtin(BuiltinFunction {
            behavior: function::function_prototype,
            constructor: false,
        }),
    );
    function_prototype.define_raw("length", Property::data(Value::from(0), false, false, true));
    function_prototype.define_raw("name", Property::data(Value::from(""), false, false, true));
    intrinsics.set(Intrinsic::ObjectPrototype, object_prototype);
    intrinsics.set(Intrinsic::FunctionPrototype, function_prototype);

    let mut installer = Installer {
        intrinsics: &mut intrinsics,
        symbols,
    };
    object::initialize(&mut installer);
    function::initialize(&mut installer);
    iterator::initialize(&mut installer);
    array::initialize(&mut installer);
    symbol::initialize(&mut installer);
    wrappers::initialize(&mut installer);
    error::initialize(&mut installer);
    intrinsics
}

/// SetDefaultGlobalBindings(realmRec)
pub(crate) fn set_default_global_bindings(intrinsics: &Intrinsics, global: &Object) {
    global.define_raw("globalThis", Property::method(Value::Object(global.clone())));
    global.define_raw("undefined", Property::data(Value::Undefined, false, false, false));
    global.define_raw("NaN", Property::data(Value::Number(f64::NAN), false, false, false));
    global.define_raw("Infinity", Property::data(Value::Number(f64::INFINITY), false, false, false));
    let constructors = [
        ("Object", Intrinsic::ObjectConstructor),
        ("Function", Intrinsic::FunctionConstructor),
        ("Array", Intrinsic::ArrayConstructor),
        ("Symbol", Intrinsic::SymbolConstructor),
        ("String", Intrinsic::StringConstructor),
        ("Number", Intrinsic::NumberConstructor),
        ("Boolean", Intrinsic::BooleanConstructor),
        ("Error", Intrinsic::ErrorConstructor),
        ("TypeError", Intrinsic::TypeErrorConstructor),
        ("ReferenceError", Intrinsic::ReferenceErrorConstructor),
        ("SyntaxError", Intrinsic::SyntaxErrorConstructor),
        ("RangeError", Intrinsic::RangeErrorConstructor),
    ];
    for (name, intrinsic) in constructors {
        global.define_raw(name, Property::method(Value::Object(intrinsics.get(intrinsic))));
    }
}

