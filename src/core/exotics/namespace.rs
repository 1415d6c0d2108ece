use crate::core::{
    Agent, Completion, Object, ObjectKind, Property, PropertyDescriptor, PropertyKey, ResolveSet, ResolvedExport, Value, WellKnownSymbol,
    module::{BindingName, ModuleRecord},
    ordinary_define_own_property, ordinary_delete, ordinary_get, ordinary_get_own_property, ordinary_has_property,
    ordinary_own_property_keys, same_value, throw_reference_error,
};
use std::rc::Rc;

/// Internal slots of a module namespace object.
pub struct NamespaceData {
    pub module: Rc<ModuleRecord>,
    /// Sorted by code unit order.
    pub exports: Vec<Rc<str>>,
}

/// ModuleNamespaceCreate(module, exports)
pub fn module_namespace_create(agent: &Agent, module: &Rc<ModuleRecord>, mut exports: Vec<Rc<str>>) -> Object {
    exports.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    exports.dedup();
    let data = NamespaceData {
        module: module.clone(),
        exports,
    };
    let namespace = Object::new(None, ObjectKind::Namespace(data));
    let tag = agent.well_known_symbol(WellKnownSymbol::ToStringTag);
    namespace.define_raw(PropertyKey::Symbol(tag), Property::data(Value::from("Module"), false, false, false));
    namespace.borrow_mut().extensible = false;
    namespace
}

fn exported_name(obj: &Object, key: &PropertyKey) -> Option<Rc<str>> {
    let PropertyKey::String(name) = key else {
        return None;
    };
    match &obj.borrow().kind {
        ObjectKind::Namespace(data) => data.exports.iter().find(|export| *export == name).cloned(),
        _ => None,
    }
}

fn namespace_module(obj: &Object) -> Option<Rc<ModuleRecord>> {
    match &obj.borrow().kind {
        ObjectKind::Namespace(data) => Some(data.module.clone()),
        _ => None,
    }
}

pub fn namespace_get_own_property(agent: &mut Agent, obj: &Object, key: &PropertyKey) -> Completion<Option<Property>> {
    if key.is_symbol() {
        return Ok(ordinary_get_own_property(obj, key));
    }
    if exported_name(obj, key).is_none() {
        return Ok(None);
    }
    let value = namespace_get(agent, obj, key, &Value::Object(obj.clone()))?;
    Ok(Some(Property::data(value, true, true, false)))
}

pub fn namespace_define_own_property(agent: &mut Agent, obj: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Completion<bool> {
    if key.is_symbol() {
        return ordinary_define_own_property(agent, obj, key, desc);
    }
    let Some(current) = namespace_get_own_property(agent, obj, key)? else {
        return Ok(false);
    };
    if desc.configurable == Some(true) || desc.enumerable == Some(false) || desc.is_accessor_descriptor() || desc.writable == Some(false) {
        return Ok(false);
    }
    match (&desc.value, current.value()) {
        (Some(value), Some(current)) => Ok(same_value(value, current)),
        _ => Ok(true),
    }
}

pub fn namespace_has_property(agent: &mut Agent, obj: &Object, key: &PropertyKey) -> Completion<bool> {
    if key.is_symbol() {
        return ordinary_has_property(agent, obj, key);
    }
    Ok(exported_name(obj, key).is_some())
}

pub fn namespace_get(agent: &mut Agent, obj: &Object, key: &PropertyKey, receiver: &Value) -> Completion<Value> {
    if key.is_symbol() {
        return ordinary_get(agent, obj, key, receiver);
    }
    let (Some(name), Some(module)) = (exported_name(obj, key), namespace_module(obj)) else {
        return Ok(Value::Undefined);
    };
    let mut resolve_set = ResolveSet::new();
    let ResolvedExport::Resolved(binding) = module.resolve_export(&name, &mut resolve_set) else {
        return throw_reference_error(agent, &format!("Export '{name}' of '{}' cannot be resolved", module.specifier));
    };
    match &binding.binding_name {
        BindingName::Namespace => Ok(Value::Object(binding.module.get_module_namespace(agent)?)),
        BindingName::Name(binding_name) => match binding.module.environment() {
            Some(env) => env.get_binding_value(agent, binding_name, true),
            None => throw_reference_error(agent, &format!("Module '{}' is not linked", binding.module.specifier)),
        },
    }
}

pub fn namespace_delete(agent: &mut Agent, obj: &Object, key: &PropertyKey) -> Completion<bool> {
    if key.is_symbol() {
        return ordinary_delete(agent, obj, key);
    }
    Ok(exported_name(obj, key).is_none())
}

pub fn namespace_own_property_keys(obj: &Object) -> Vec<PropertyKey> {
    let exports: Vec<PropertyKey> = match &obj.borrow().kind {
        ObjectKind::Namespace(data) => data.exports.iter().map(PropertyKey::from).collect(),
        _ => Vec::new(),
    };
    let symbols = ordinary_own_property_keys(obj).into_iter().filter(PropertyKey::is_symbol);
    exports.into_iter().chain(symbols).collect()
}
