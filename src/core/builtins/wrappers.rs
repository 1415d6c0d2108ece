//! %String%, %Number% and %Boolean%: conversion functions that construct wrapper objects under `new`.

use super::{Installer, arg};
use crate::core::{
    Agent, Completion, Intrinsic, Object, ObjectKind, Value, WellKnownSymbol, create_string_iterator, exotics::string_create,
    get_prototype_from_constructor, number_to_string, require_object_coercible, to_boolean, to_number, to_string, throw_type_error,
};
use std::rc::Rc;

pub(super) fn initialize(installer: &mut Installer) {
    let object_prototype = installer.get(Intrinsic::ObjectPrototype);

    let string_prototype = string_create(Rc::from(""), object_prototype.clone());
    installer.constructor(
        "String",
        1,
        string_constructor,
        string_prototype.clone(),
        Intrinsic::StringConstructor,
        Intrinsic::StringPrototype,
    );
    installer.method(&string_prototype, "toString", 0, string_prototype_value_of);
    installer.method(&string_prototype, "valueOf", 0, string_prototype_value_of);
    let iterator = installer.symbols.get(WellKnownSymbol::Iterator);
    installer.symbol_method(&string_prototype, &iterator, 0, string_prototype_iterator, true);

    let number_prototype = Object::new(Some(object_prototype.clone()), ObjectKind::Number(0.0));
    installer.constructor(
        "Number",
        1,
        number_constructor,
        number_prototype.clone(),
        Intrinsic::NumberConstructor,
        Intrinsic::NumberPrototype,
    );
    installer.method(&number_prototype, "toString", 0, number_prototype_to_string);
    installer.method(&number_prototype, "valueOf", 0, number_prototype_value_of);

    let boolean_prototype = Object::new(Some(object_prototype), ObjectKind::Boolean(false));
    installer.constructor(
        "Boolean",
        1,
        boolean_constructor,
        boolean_prototype.clone(),
        Intrinsic::BooleanConstructor,
        Intrinsic::BooleanPrototype,
    );
    installer.method(&boolean_prototype, "toString", 0, boolean_prototype_to_string);
    installer.method(&boolean_prototype, "valueOf", 0, boolean_prototype_value_of);
}

fn string_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    let s: Rc<str> = match (args.first(), new_target) {
        (None, _) => Rc::from(""),
        (Some(Value::Symbol(symbol)), None) => return Ok(Value::from(symbol.descriptive_string())),
        (Some(value), _) => to_string(agent, value)?,
    };
    match new_target {
        None => Ok(Value::String(s)),
        Some(new_target) => {
            let prototype = get_prototype_from_constructor(agent, new_target, Intrinsic::StringPrototype)?;
            Ok(Value::Object(string_create(s, prototype)))
        }
    }
}

fn this_string_value(agent: &mut Agent, value: &Value) -> Completion<Rc<str>> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::String(s) => Ok(s.clone()),
            _ => throw_type_error(agent, "String.prototype.valueOf requires that 'this' be a String"),
        },
        _ => throw_type_error(agent, "String.prototype.valueOf requires that 'this' be a String"),
    }
}

fn string_prototype_value_of(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::String(this_string_value(agent, this)?))
}

/// String.prototype[@@iterator](), which yields code points rather than code units.
fn string_prototype_iterator(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    require_object_coercible(agent, this)?;
    let string = to_string(agent, this)?;
    Ok(Value::Object(create_string_iterator(agent, string)))
}

fn number_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    let n = match args.first() {
        Some(value) => to_number(agent, value)?,
        None => 0.0,
    };
    match new_target {
        None => Ok(Value::Number(n)),
        Some(new_target) => {
            let prototype = get_prototype_from_constructor(agent, new_target, Intrinsic::NumberPrototype)?;
            Ok(Value::Object(Object::new(Some(prototype), ObjectKind::Number(n))))
        }
    }
}

fn this_number_value(agent: &mut Agent, value: &Value) -> Completion<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Number(n) => Ok(*n),
            _ => throw_type_error(agent, "Number.prototype.valueOf requires that 'this' be a Number"),
        },
        _ => throw_type_error(agent, "Number.prototype.valueOf requires that 'this' be a Number"),
    }
}

fn number_prototype_to_string(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let n = this_number_value(agent, this)?;
    match arg(args, 0) {
        Value::Undefined => Ok(Value::from(number_to_string(n))),
        Value::Number(radix) if radix == 10.0 => Ok(Value::from(number_to_string(n))),
        _ => throw_type_error(agent, "Only radix 10 is supported"),
    }
}

fn number_prototype_value_of(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Number(this_number_value(agent, this)?))
}

fn boolean_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    let b = to_boolean(&arg(args, 0));
    match new_target {
        None => Ok(Value::Boolean(b)),
        Some(new_target) => {
            let prototype = get_prototype_from_constructor(agent, new_target, Intrinsic::BooleanPrototype)?;
            Ok(Value::Object(Object::new(Some(prototype), ObjectKind::Boolean(b))))
        }
    }
}

fn this_boolean_value(agent: &mut Agent, value: &Value) -> Completion<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Boolean(b) => Ok(*b),
            _ => throw_type_error(agent, "Boolean.prototype.valueOf requires that 'this' be a Boolean"),
        },
        _ => throw_type_error(agent, "Boolean.prototype.valueOf requires that 'this' be a Boolean"),
    }
}

fn boolean_prototype_to_string(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::from(if this_boolean_value(agent, this)? { "true" } else { "false" }))
}

fn boolean_prototype_value_of(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Boolean(this_boolean_value(agent, this)?))
}
