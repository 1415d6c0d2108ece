use super::{Installer, arg};
use crate::core::{
    Agent, Completion, Intrinsic, Object, ObjectKind, Property, PropertyDescriptor, PropertyKey, Value, WellKnownSymbol,
    define_property_or_throw, exotics::create_array_from_list, get, has_own_property, ordinary_create_from_constructor,
    require_object_coercible, throw_type_error, to_object, to_property_key,
};

pub(super) fn initialize(installer: &mut Installer) {
    let prototype = installer.get(Intrinsic::ObjectPrototype);
    let constructor = installer.constructor(
        "Object",
        1,
        object_constructor,
        prototype.clone(),
        Intrinsic::ObjectConstructor,
        Intrinsic::ObjectPrototype,
    );
    installer.method(&constructor, "getPrototypeOf", 1, object_get_prototype_of);
    installer.method(&constructor, "setPrototypeOf", 2, object_set_prototype_of);
    installer.method(&constructor, "keys", 1, object_keys);
    installer.method(&constructor, "defineProperty", 3, object_define_property);
    installer.method(&constructor, "getOwnPropertyDescriptor", 2, object_get_own_property_descriptor);
    installer.method(&constructor, "getOwnPropertyNames", 1, object_get_own_property_names);
    installer.method(&constructor, "create", 2, object_create);
    installer.method(&constructor, "freeze", 1, object_freeze);
    installer.method(&constructor, "isExtensible", 1, object_is_extensible);
    installer.method(&constructor, "preventExtensions", 1, object_prevent_extensions);

    installer.method(&prototype, "hasOwnProperty", 1, object_prototype_has_own_property);
    installer.method(&prototype, "isPrototypeOf", 1, object_prototype_is_prototype_of);
    installer.method(&prototype, "propertyIsEnumerable", 1, object_prototype_property_is_enumerable);
    installer.method(&prototype, "toString", 0, object_prototype_to_string);
    installer.method(&prototype, "valueOf", 0, object_prototype_value_of);
}

fn object_constructor(agent: &mut Agent, _this: &Value, args: &[Value], new_target: Option<&Object>) -> Completion<Value> {
    if let Some(new_target) = new_target
        && agent.active_function().as_ref() != Some(new_target)
    {
        let object = ordinary_create_from_constructor(agent, new_target, Intrinsic::ObjectPrototype, ObjectKind::Ordinary)?;
        return Ok(Value::Object(object));
    }
    let value = arg(args, 0);
    if value.is_nullish() {
        return Ok(Value::Object(Object::ordinary(Some(agent.intrinsic(Intrinsic::ObjectPrototype)))));
    }
    Ok(Value::Object(to_object(agent, &value)?))
}

fn object_get_prototype_of(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, &arg(args, 0))?;
    Ok(Value::from(object.get_prototype_of()))
}

fn object_set_prototype_of(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let target = arg(args, 0);
    require_object_coercible(agent, &target)?;
    let prototype = match arg(args, 1) {
        Value::Object(prototype) => Some(prototype),
        Value::Null => None,
        _ => return throw_type_error(agent, "Object prototype may only be an Object or null"),
    };
    let Value::Object(object) = &target else {
        return Ok(target);
    };
    if !object.set_prototype_of(prototype) {
        return throw_type_error(agent, "Cannot set prototype");
    }
    Ok(target)
}

fn enumerable_own_string_keys(agent: &mut Agent, object: &Object) -> Completion<Vec<PropertyKey>> {
    let mut keys = Vec::new();
    for key in object.own_property_keys(agent)? {
        if key.is_symbol() {
            continue;
        }
        if let Some(property) = object.get_own_property(agent, &key)?
            && property.enumerable()
        {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn object_keys(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, &arg(args, 0))?;
    let keys = enumerable_own_string_keys(agent, &object)?;
    Ok(Value::Object(create_array_from_list(agent, keys.iter().map(PropertyKey::to_value))))
}

fn object_define_property(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let Value::Object(object) = arg(args, 0) else {
        return throw_type_error(agent, "Object.defineProperty called on non-object");
    };
    let key = to_property_key(agent, &arg(args, 1))?;
    let desc = PropertyDescriptor::from_value(agent, &arg(args, 2))?;
    define_property_or_throw(agent, &object, &key, desc)?;
    Ok(Value::Object(object))
}

/// ObjectDefineProperties(O, Properties)
fn object_define_properties(agent: &mut Agent, object: &Object, properties: &Value) -> Completion<()> {
    let props = to_object(agent, properties)?;
    let mut descriptors = Vec::new();
    for key in props.own_property_keys(agent)? {
        if let Some(property) = props.get_own_property(agent, &key)?
            && property.enumerable()
        {
            let value = get(agent, &props, &key)?;
            descriptors.push((key, PropertyDescriptor::from_value(agent, &value)?));
        }
    }
    for (key, desc) in descriptors {
        define_property_or_throw(agent, object, &key, desc)?;
    }
    Ok(())
}

fn object_get_own_property_descriptor(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, &arg(args, 0))?;
    let key = to_property_key(agent, &arg(args, 1))?;
    match object.get_own_property(agent, &key)? {
        Some(property) => Ok(Value::Object(property.to_descriptor().to_object(agent)?)),
        None => Ok(Value::Undefined),
    }
}

fn object_get_own_property_names(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let object = to_object(agent, &arg(args, 0))?;
    let keys = object.own_property_keys(agent)?;
    let names = keys.iter().filter(|key| !key.is_symbol()).map(PropertyKey::to_value);
    Ok(Value::Object(create_array_from_list(agent, names)))
}

fn object_create(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let prototype = match arg(args, 0) {
        Value::Object(prototype) => Some(prototype),
        Value::Null => None,
        _ => return throw_type_error(agent, "Object prototype may only be an Object or null"),
    };
    let object = Object::ordinary(prototype);
    let properties = arg(args, 1);
    if !properties.is_undefined() {
        object_define_properties(agent, &object, &properties)?;
    }
    Ok(Value::Object(object))
}

/// SetIntegrityLevel(O, frozen)
fn object_freeze(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let target = arg(args, 0);
    let Value::Object(object) = &target else {
        return Ok(target);
    };
    if !object.prevent_extensions() {
        return throw_type_error(agent, "Cannot freeze");
    }
    for key in object.own_property_keys(agent)? {
        let Some(current) = object.get_own_property(agent, &key)? else {
            continue;
        };
        let desc = match current {
            Property::Accessor { .. } => PropertyDescriptor {
                configurable: Some(false),
                ..Default::default()
            },
            Property::Data { .. } => PropertyDescriptor {
                configurable: Some(false),
                writable: Some(false),
                ..Default::default()
            },
        };
        define_property_or_throw(agent, object, &key, desc)?;
    }
    Ok(target)
}

fn object_is_extensible(_agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Boolean(matches!(arg(args, 0), Value::Object(object) if object.is_extensible())))
}

fn object_prevent_extensions(agent: &mut Agent, _this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let target = arg(args, 0);
    if let Value::Object(object) = &target
        && !object.prevent_extensions()
    {
        return throw_type_error(agent, "Cannot prevent extensions");
    }
    Ok(target)
}

fn object_prototype_has_own_property(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let key = to_property_key(agent, &arg(args, 0))?;
    let object = to_object(agent, this)?;
    Ok(Value::Boolean(has_own_property(agent, &object, &key)?))
}

fn object_prototype_is_prototype_of(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let Value::Object(value) = arg(args, 0) else {
        return Ok(Value::Boolean(false));
    };
    let object = to_object(agent, this)?;
    let mut current = value.get_prototype_of();
    while let Some(prototype) = current {
        if prototype == object {
            return Ok(Value::Boolean(true));
        }
        current = prototype.get_prototype_of();
    }
    Ok(Value::Boolean(false))
}

fn object_prototype_property_is_enumerable(agent: &mut Agent, this: &Value, args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let key = to_property_key(agent, &arg(args, 0))?;
    let object = to_object(agent, this)?;
    let property = object.get_own_property(agent, &key)?;
    Ok(Value::Boolean(property.is_some_and(|p| p.enumerable())))
}

/// Object.prototype.toString, also the fallback of Array.prototype.toString.
pub(crate) fn object_prototype_to_string(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    match this {
        Value::Undefined => return Ok(Value::from("[object Undefined]")),
        Value::Null => return Ok(Value::from("[object Null]")),
        _ => {}
    }
    let object = to_object(agent, this)?;
    let builtin_tag = object.class_name();
    let key = PropertyKey::Symbol(agent.well_known_symbol(WellKnownSymbol::ToStringTag));
    let tag = match get(agent, &object, &key)? {
        Value::String(tag) => tag.to_string(),
        _ => builtin_tag.to_string(),
    };
    Ok(Value::from(format!("[object {tag}]")))
}

fn object_prototype_value_of(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(Value::Object(to_object(agent, this)?))
}
