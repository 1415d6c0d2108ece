use crate::core::{
    Agent, Completion, Object, ObjectKind, Property, PropertyDescriptor, PropertyKey, Value, is_compatible_property_descriptor,
    ordinary_define_own_property, ordinary_get_own_property, ordinary_own_property_keys,
};
use std::rc::Rc;

/// StringCreate(value, prototype)
pub fn string_create(value: Rc<str>, prototype: Object) -> Object {
    let length = value.encode_utf16().count();
    let obj = Object::new(Some(prototype), ObjectKind::String(value));
    obj.define_raw("length", Property::data(Value::from(length), false, false, false));
    obj
}

fn string_data(obj: &Object) -> Option<Rc<str>> {
    match &obj.borrow().kind {
        ObjectKind::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// StringGetOwnProperty: the index properties synthesized from [[StringData]].
fn string_index_property(obj: &Object, key: &PropertyKey) -> Option<Property> {
    let index = key.array_index()? as usize;
    let data = string_data(obj)?;
    let unit = data.encode_utf16().nth(index)?;
    let ch = String::from_utf16_lossy(&[unit]);
    Some(Property::data(Value::from(ch), false, true, false))
}

pub fn string_get_own_property(obj: &Object, key: &PropertyKey) -> Option<Property> {
    ordinary_get_own_property(obj, key).or_else(|| string_index_property(obj, key))
}

pub fn string_define_own_property(agent: &mut Agent, obj: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Completion<bool> {
    if let Some(current) = string_index_property(obj, key) {
        let extensible = obj.is_extensible();
        return Ok(is_compatible_property_descriptor(extensible, &desc, Some(&current)));
    }
    ordinary_define_own_property(agent, obj, key, desc)
}

pub fn string_own_property_keys(obj: &Object) -> Vec<PropertyKey> {
    let length = string_data(obj).map(|s| s.encode_utf16().count()).unwrap_or(0);
    (0..length).map(PropertyKey::from_index).chain(ordinary_own_property_keys(obj)).collect()
}
