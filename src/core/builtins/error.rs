use super::{Installer, arg};
use crate::core::{
    Agent, Completion, Intrinsic, Object, ObjectKind, Property, PropertyKey, Value, get, has_property, ordinary_create_from_constructor,
    throw_type_error, to_string,
};

const NATIVE_ERRORS: [(&str, Intrinsic, Intrinsic, super::NativeFn); 4] = [
    ("TypeError", Intrinsic::TypeErrorConstructor, Intrinsic::TypeErrorPrototype, type_error_constructor),
    (
        "ReferenceError",
        Intrinsic::ReferenceErrorConstructor,
        Intrinsic::ReferenceErrorPrototype,
        reference_error_constructor,
    ),
    ("SyntaxError", Intrinsic::SyntaxErrorConstructor, Intrinsic::SyntaxErrorPrototype, syntax_error_constructor),
    ("RangeError", Intrinsic::RangeErrorConstructor, Intrinsic::RangeErrorPrototype, range_error_constructor),
];

pub(super) fn initialize(installer: &mut Installer) {
    let object_prototype = installer.get(Intrinsic::ObjectPrototype);
    let error_prototype = Object::ordinary(Some(object_prototype));
    let error_constructor = installer.constructor(
        "Error",
        1,
        error_constructor,
        error_prototype.clone(),
        Intrinsic::ErrorConstructor,
        Intrinsic::ErrorPrototype,
    );
    error_prototype.define_raw("name", Property::method(Value::from("Error")));
    error_prototype.define_raw("message", Property::method(Value::from("")));
    installer.method(&error_prototype, "toString", 0, error_prototype_to_string);

    for (name, constructor_slot, prototype_slot, behavior) in NATIVE_ERRORS {
        let prototype = Object::ordinary(Some(error_prototype.clone()));
        prototype.define_raw("name", Property::method(Value::from(name)));
        prototype.define_raw("message", Property::method(Value::from("")));
        let constructor = installer.constructor(name, 1, behavior, prototype, constructor_slot, prototype_slot);
        constructor.borrow_mut().prototype = Some(error_constructor.clone());
    }

    let thrower = installer.function("", 0, throw_type_error_function);
    thrower.define_raw("length", Property::data(Value::from(0), false, false, false));
    thrower.define_raw("name", Property::data(Value::from(""), false, false, false));
    thrower.prevent_extensions();
    installer.intrinsics.set(Intrinsic::ThrowTypeError, thrower);
}

/// Shared body of the Error and NativeError constructors.
fn error_constructor_impl(agent: &mut Agent, args: &[Value], new_target: Option<&Object>, default: Intrinsic) -> Completion<Value> {
    let new_target = match new_target {
        Some(new_target) => new_target.clone(),
        None => match agent.active_function() {
            Some(function) => function,
            None => return throw_type_error(agent, "Error constructor called without an active function"),
        },
    };
    let error = ordinary_create_from_constructor(agent, &new_target, default, ObjectKind::Error)?;
    let message = arg(args, 0);
    if !message.is_undefined() {
        let message = to_string(agent, &message)?;
        error.define_raw("message", Property::method(Value::String(message)));
    }
    // InstallErrorCause
    if let Value::Object(options) = arg(args, 1) {
        let cause = PropertyKey::from("cause");
        if has_property(agent, &options, &cause)? {
            let value = get(agent, &options, &cause)?;
            error.define_raw(cause, Property::method(value));
        }
    }
    Ok(Value::Object(error))
}

fn error_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    error_constructor_impl(agent, args, new_target, Intrinsic::ErrorPrototype)
}

fn type_error_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    error_constructor_impl(agent, args, new_target, Intrinsic::TypeErrorPrototype)
}

fn reference_error_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    error_constructor_impl(agent, args, new_target, Intrinsic::ReferenceErrorPrototype)
}

fn syntax_error_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    error_constructor_impl(agent, args, new_target, Intrinsic::SyntaxErrorPrototype)
}

fn range_error_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    error_constructor_impl(agent, args, new_target, Intrinsic::RangeErrorPrototype)
}

fn error_prototype_to_string(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let Value::Object(object) = this else {
        return throw_type_error(agent, "Error.prototype.toString called on non-object");
    };
    let name = match get(agent, object, &PropertyKey::from("name"))? {
        Value::Undefined => "Error".into(),
        other => to_string(agent, &other)?,
    };
    let message = match get(agent, object, &PropertyKey::from("message"))? {
        Value::Undefined => "".into(),
        other => to_string(agent, &other)?,
    };
    let rendered = match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{name}: {message}"),
    };
    Ok(Value::from(rendered))
}

/// %ThrowTypeError%
fn throw_type_error_function(agent: &mut Agent, _this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    throw_type_error(
        agent,
        "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions or the arguments objects for calls to them",
    )
}
