use super::{Installer, arg};
use crate::core::{
    Agent, Completion, Intrinsic, Object, ObjectKind, Value, WellKnownSymbol, call, create_list_from_array_like, function_name,
    function_source_text, ordinary_has_instance, throw_type_error,
};

pub(super) fn initialize(installer: &mut Installer) {
    let prototype = installer.function_prototype();
    installer.constructor(
        "Function",
        1,
        function_constructor,
        prototype.clone(),
        Intrinsic::FunctionConstructor,
        Intrinsic::FunctionPrototype,
    );
    installer.method(&prototype, "call", 1, function_prototype_call);
    installer.method(&prototype, "apply", 2, function_prototype_apply);
    installer.method(&prototype, "toString", 0, function_prototype_to_string);
    let has_instance = installer.symbols.get(WellKnownSymbol::HasInstance);
    installer.symbol_method(&prototype, &has_instance, 1, function_prototype_has_instance, false);
}

/// `Function(...)` would need to parse source at run time, which this machine never does.
fn function_constructor(agent: &mut Agent, _this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    throw_type_error(agent, "Code generation from strings is not supported")
}

/// The behavior of %Function.prototype% itself: accepts any arguments and returns undefined.
pub(super) fn function_prototype(_agent: &mut Agent, _this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Undefined)
}

fn function_prototype_call(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    if !this.is_callable() {
        return throw_type_error(agent, "Function.prototype.call called on non-callable");
    }
    let this_arg = arg(args, 0);
    let rest = args.get(1..).unwrap_or(&[]);
    call(agent, this, &this_arg, rest)
}

fn function_prototype_apply(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    if !this.is_callable() {
        return throw_type_error(agent, "Function.prototype.apply called on non-callable");
    }
    let this_arg = arg(args, 0);
    let array_like = arg(args, 1);
    if array_like.is_nullish() {
        return call(agent, this, &this_arg, &[]);
    }
    let list = create_list_from_array_like(agent, &array_like)?;
    call(agent, this, &this_arg, &list)
}

fn function_prototype_to_string(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let Value::Object(function) = this else {
        return throw_type_error(agent, "Function.prototype.toString requires that 'this' be a Function");
    };
    let is_builtin = matches!(function.borrow().kind, ObjectKind::Builtin(_));
    if is_builtin {
        let name = match function_name(function).as_str() {
            "anonymous" => String::new(),
            name => name.to_string(),
        };
        return Ok(Value::from(format!("function {name}() {{ [native code] }}")));
    }
    match function_source_text(function) {
        Some(source_text) => Ok(Value::String(source_text)),
        None => throw_type_error(agent, "Function.prototype.toString requires that 'this' be a Function"),
    }
}

fn function_prototype_has_instance(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Boolean(ordinary_has_instance(agent, this, &arg(args, 0))?))
}
