use super::{Installer, arg, object_prototype_to_string};
use crate::core::{
    Agent, ArrayIterationKind, Completion, Intrinsic, Object, ObjectKind, Property, PropertyKey, Value, WellKnownSymbol, call,
    create_array_iterator, create_data_property_or_throw, exotics::array_create, get, get_prototype_from_constructor, has_property,
    length_of_array_like, set, strict_equality_comparison, throw_range_error, throw_type_error, to_integer_or_infinity, to_object,
    to_string,
};

pub(super) fn initialize(installer: &mut Installer) {
    let object_prototype = installer.get(Intrinsic::ObjectPrototype);
    let prototype = Object::new(Some(object_prototype), ObjectKind::Array);
    prototype.define_raw("length", Property::data(Value::from(0), true, false, false));
    let constructor = installer.constructor(
        "Array",
        1,
        array_constructor,
        prototype.clone(),
        Intrinsic::ArrayConstructor,
        Intrinsic::ArrayPrototype,
    );
    installer.method(&constructor, "isArray", 1, array_is_array);
    installer.method(&constructor, "of", 0, array_of);

    installer.method(&prototype, "push", 1, array_prototype_push);
    installer.method(&prototype, "join", 1, array_prototype_join);
    installer.method(&prototype, "toString", 0, array_prototype_to_string);
    installer.method(&prototype, "indexOf", 1, array_prototype_index_of);
    installer.method(&prototype, "forEach", 1, array_prototype_for_each);
    installer.method(&prototype, "map", 1, array_prototype_map);
    installer.method(&prototype, "keys", 0, array_prototype_keys);
    installer.method(&prototype, "entries", 0, array_prototype_entries);
    let values = installer.method(&prototype, "values", 0, array_prototype_values);
    let iterator = installer.symbols.get(WellKnownSymbol::Iterator);
    prototype.define_raw(PropertyKey::Symbol(iterator), Property::method(Value::Object(values.clone())));
    installer.intrinsics.set(Intrinsic::ArrayPrototypeValues, values);
}

fn array_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    let new_target = match new_target {
        Some(new_target) => new_target.clone(),
        None => agent.intrinsic(Intrinsic::ArrayConstructor),
    };
    let prototype = get_prototype_from_constructor(agent, &new_target, Intrinsic::ArrayPrototype)?;
    if let [Value::Number(length)] = args {
        if *length < 0.0 || length.fract() != 0.0 || *length > 4_294_967_295.0 {
            return throw_range_error(agent, "Invalid array length");
        }
        return Ok(Value::Object(array_create(agent, *length, Some(prototype))?));
    }
    let array = array_create(agent, 0.0, Some(prototype))?;
    for (index, value) in args.iter().enumerate() {
        create_data_property_or_throw(agent, &array, &PropertyKey::from_index(index), value.clone())?;
    }
    Ok(Value::Object(array))
}

fn array_is_array(_agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Boolean(matches!(arg(args, 0), Value::Object(object) if object.is_array())))
}

fn array_of(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let array = array_create(agent, 0.0, None)?;
    for (index, value) in args.iter().enumerate() {
        create_data_property_or_throw(agent, &array, &PropertyKey::from_index(index), value.clone())?;
    }
    set(agent, &array, &PropertyKey::from("length"), Value::from(args.len()), true)?;
    Ok(Value::Object(array))
}

fn array_prototype_push(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    let mut length = length_of_array_like(agent, &object)?;
    if length + args.len() as f64 > 9_007_199_254_740_991.0 {
        return throw_type_error(agent, "Pushing too many elements");
    }
    for value in args {
        set(agent, &object, &PropertyKey::from_number(length), value.clone(), true)?;
        length += 1.0;
    }
    set(agent, &object, &PropertyKey::from("length"), Value::Number(length), true)?;
    Ok(Value::Number(length))
}

fn array_prototype_join(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    let length = length_of_array_like(agent, &object)? as usize;
    let separator = match arg(args, 0) {
        Value::Undefined => ",".into(),
        other => to_string(agent, &other)?,
    };
    let mut joined = String::new();
    for index in 0..length {
        if index > 0 {
            joined.push_str(&separator);
        }
        let element = get(agent, &object, &PropertyKey::from_index(index))?;
        if !element.is_nullish() {
            joined.push_str(&to_string(agent, &element)?);
        }
    }
    Ok(Value::from(joined))
}

fn array_prototype_to_string(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let array = to_object(agent, this)?;
    let join = get(agent, &array, &PropertyKey::from("join"))?;
    let receiver = Value::Object(array);
    if join.is_callable() {
        return call(agent, &join, &receiver, &[]);
    }
    object_prototype_to_string(agent, &receiver, &[], None)
}

fn array_prototype_index_of(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    let length = length_of_array_like(agent, &object)?;
    if length == 0.0 {
        return Ok(Value::Number(-1.0));
    }
    let search = arg(args, 0);
    let mut start = to_integer_or_infinity(agent, &arg(args, 1))?;
    if start == f64::INFINITY {
        return Ok(Value::Number(-1.0));
    }
    if start < 0.0 {
        start = (length + start).max(0.0);
    }
    let mut index = start;
    while index < length {
        let key = PropertyKey::from_number(index);
        if has_property(agent, &object, &key)? {
            let element = get(agent, &object, &key)?;
            if strict_equality_comparison(&search, &element) {
                return Ok(Value::Number(index));
            }
        }
        index += 1.0;
    }
    Ok(Value::Number(-1.0))
}

fn array_prototype_for_each(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    let length = length_of_array_like(agent, &object)? as usize;
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return throw_type_error(agent, &format!("{callback:?} is not a function"));
    }
    let this_arg = arg(args, 1);
    let receiver = Value::Object(object.clone());
    for index in 0..length {
        let key = PropertyKey::from_index(index);
        if has_property(agent, &object, &key)? {
            let element = get(agent, &object, &key)?;
            call(agent, &callback, &this_arg, &[element, Value::from(index), receiver.clone()])?;
        }
    }
    Ok(Value::Undefined)
}

fn array_prototype_map(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    let length = length_of_array_like(agent, &object)?;
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return throw_type_error(agent, &format!("{callback:?} is not a function"));
    }
    let this_arg = arg(args, 1);
    let result = array_create(agent, length, None)?;
    let receiver = Value::Object(object.clone());
    for index in 0..length as usize {
        let key = PropertyKey::from_index(index);
        if has_property(agent, &object, &key)? {
            let element = get(agent, &object, &key)?;
            let mapped = call(agent, &callback, &this_arg, &[element, Value::from(index), receiver.clone()])?;
            create_data_property_or_throw(agent, &result, &key, mapped)?;
        }
    }
    Ok(Value::Object(result))
}

fn array_prototype_keys(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    Ok(Value::Object(create_array_iterator(agent, object, ArrayIterationKind::Keys)))
}

fn array_prototype_entries(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    Ok(Value::Object(create_array_iterator(agent, object, ArrayIterationKind::Entries)))
}

fn array_prototype_values(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, this)?;
    Ok(Value::Object(create_array_iterator(agent, object, ArrayIterationKind::Values)))
}
