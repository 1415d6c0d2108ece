use crate::core::{
    Agent, Completion, Environment, Intrinsic, Object, ObjectKind, Property, PropertyDescriptor, PropertyKey, Value, WellKnownSymbol,
    ordinary_define_own_property, ordinary_delete, ordinary_get, ordinary_get_own_property, ordinary_set,
};
use std::rc::Rc;

/// The [[ParameterMap]] of a mapped arguments object: argument index to the
/// formal parameter binding it aliases.
pub struct ArgumentsMap {
    pub env: Environment,
    pub names: Vec<Option<Rc<str>>>,
}

fn define_common(agent: &Agent, obj: &Object, args: &[Value]) {
    for (index, value) in args.iter().enumerate() {
        obj.define_raw(PropertyKey::from_index(index), Property::data(value.clone(), true, true, true));
    }
    obj.define_raw("length", Property::method(Value::from(args.len())));
    let values = agent.intrinsic(Intrinsic::ArrayPrototypeValues);
    let iterator = agent.well_known_symbol(WellKnownSymbol::Iterator);
    obj.define_raw(PropertyKey::Symbol(iterator), Property::method(Value::Object(values)));
}

/// CreateUnmappedArgumentsObject
pub fn create_unmapped_arguments_object(agent: &Agent, args: &[Value]) -> Object {
    let obj = Object::new(Some(agent.intrinsic(Intrinsic::ObjectPrototype)), ObjectKind::Arguments(None));
    define_common(agent, &obj, args);
    let thrower = Value::Object(agent.intrinsic(Intrinsic::ThrowTypeError));
    obj.define_raw(
        "callee",
        Property::Accessor {
            get: thrower.clone(),
            set: thrower,
            enumerable: false,
            configurable: false,
        },
    );
    obj
}

/// CreateMappedArgumentsObject
pub fn create_mapped_arguments_object(agent: &Agent, func: &Object, formals: &[Rc<str>], args: &[Value], env: &Environment) -> Object {
    let mut names: Vec<Option<Rc<str>>> = vec![None; args.len().min(formals.len())];
    let mut mapped: Vec<&Rc<str>> = Vec::new();
    for (index, name) in formals.iter().enumerate().rev() {
        if mapped.contains(&name) {
            continue;
        }
        mapped.push(name);
        if index < names.len() {
            names[index] = Some(name.clone());
        }
    }
    let map = ArgumentsMap { env: env.clone(), names };
    let obj = Object::new(Some(agent.intrinsic(Intrinsic::ObjectPrototype)), ObjectKind::Arguments(Some(map)));
    define_common(agent, &obj, args);
    obj.define_raw("callee", Property::method(Value::Object(func.clone())));
    obj
}

fn mapped_binding(obj: &Object, key: &PropertyKey) -> Option<(Environment, Rc<str>)> {
    let index = key.array_index()? as usize;
    let data = obj.borrow();
    let ObjectKind::Arguments(Some(map)) = &data.kind else {
        return None;
    };
    let name = map.names.get(index)?.clone()?;
    Some((map.env.clone(), name))
}

fn unmap(obj: &Object, key: &PropertyKey) {
    let Some(index) = key.array_index() else {
        return;
    };
    if let ObjectKind::Arguments(Some(map)) = &mut obj.borrow_mut().kind
        && let Some(slot) = map.names.get_mut(index as usize)
    {
        *slot = None;
    }
}

pub fn arguments_get_own_property(agent: &mut Agent, obj: &Object, key: &PropertyKey) -> Completion<Option<Property>> {
    let Some(property) = ordinary_get_own_property(obj, key) else {
        return Ok(None);
    };
    match (property, mapped_binding(obj, key)) {
        (Property::Data { writable, enumerable, configurable, .. }, Some((env, name))) => {
            let value = env.get_binding_value(agent, &name, false)?;
            Ok(Some(Property::Data {
                value,
                writable,
                enumerable,
                configurable,
            }))
        }
        (property, _) => Ok(Some(property)),
    }
}

pub fn arguments_define_own_property(agent: &mut Agent, obj: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Completion<bool> {
    let mapped = mapped_binding(obj, key);
    let mut new_desc = desc.clone();
    if let Some((env, name)) = &mapped
        && desc.is_data_descriptor()
        && desc.value.is_none()
        && desc.writable == Some(false)
    {
        new_desc.value = Some(env.get_binding_value(agent, name, false)?);
    }
    if !ordinary_define_own_property(agent, obj, key, new_desc)? {
        return Ok(false);
    }
    if let Some((env, name)) = mapped {
        if desc.is_accessor_descriptor() {
            unmap(obj, key);
        } else {
            if let Some(value) = desc.value {
                env.set_mutable_binding(agent, &name, value, false)?;
            }
            if desc.writable == Some(false) {
                unmap(obj, key);
            }
        }
    }
    Ok(true)
}

pub fn arguments_get(agent: &mut Agent, obj: &Object, key: &PropertyKey, receiver: &Value) -> Completion<Value> {
    match mapped_binding(obj, key) {
        Some((env, name)) => env.get_binding_value(agent, &name, false),
        None => ordinary_get(agent, obj, key, receiver),
    }
}

pub fn arguments_set(agent: &mut Agent, obj: &Object, key: &PropertyKey, value: Value, receiver: &Value) -> Completion<bool> {
    let is_self = matches!(receiver, Value::Object(r) if r.ptr_eq(obj));
    if is_self && let Some((env, name)) = mapped_binding(obj, key) {
        env.set_mutable_binding(agent, &name, value.clone(), false)?;
    }
    ordinary_set(agent, obj, key, value, receiver)
}

pub fn arguments_delete(agent: &mut Agent, obj: &Object, key: &PropertyKey) -> Completion<bool> {
    let mapped = mapped_binding(obj, key).is_some();
    let result = ordinary_delete(agent, obj, key)?;
    if result && mapped {
        unmap(obj, key);
    }
    Ok(result)
}
