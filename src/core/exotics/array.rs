use crate::core::{
    Agent, Completion, Intrinsic, Object, ObjectKind, Property, PropertyDescriptor, PropertyKey, Value, ordinary_define_own_property,
    ordinary_delete, ordinary_get_own_property, throw_range_error, to_number, to_uint32,
};

const MAX_ARRAY_LENGTH: f64 = 4_294_967_295.0;

/// ArrayCreate(length, proto)
pub fn array_create(agent: &mut Agent, length: f64, prototype: Option<Object>) -> Completion<Object> {
    if length > MAX_ARRAY_LENGTH {
        return throw_range_error(agent, "Invalid array length");
    }
    let prototype = prototype.unwrap_or_else(|| agent.intrinsic(Intrinsic::ArrayPrototype));
    let array = Object::new(Some(prototype), ObjectKind::Array);
    array.define_raw("length", Property::data(Value::Number(length), true, false, false));
    Ok(array)
}

/// CreateArrayFromList
pub fn create_array_from_list(agent: &mut Agent, elements: impl IntoIterator<Item = Value>) -> Object {
    let prototype = agent.intrinsic(Intrinsic::ArrayPrototype);
    let array = Object::new(Some(prototype), ObjectKind::Array);
    let mut length = 0usize;
    for element in elements {
        array.define_raw(PropertyKey::from_index(length), Property::data(element, true, true, true));
        length += 1;
    }
    array.define_raw("length", Property::data(Value::from(length), true, false, false));
    array
}

fn length_property(array: &Object) -> (f64, bool) {
    match ordinary_get_own_property(array, &PropertyKey::from("length")) {
        Some(Property::Data {
            value: Value::Number(n), writable, ..
        }) => (n, writable),
        _ => (0.0, true),
    }
}

fn set_length_value(array: &Object, length: f64) {
    if let Some(Property::Data { value, .. }) = array.borrow_mut().properties.get_mut(&PropertyKey::from("length")) {
        *value = Value::Number(length);
    }
}

/// [[DefineOwnProperty]] for Array exotic objects
pub fn array_define_own_property(agent: &mut Agent, array: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Completion<bool> {
    if key.as_str() == Some("length") {
        return array_set_length(agent, array, desc);
    }
    if let Some(index) = key.array_index() {
        let (old_len, old_len_writable) = length_property(array);
        let index = index as f64;
        if index >= old_len && !old_len_writable {
            return Ok(false);
        }
        if !ordinary_define_own_property(agent, array, key, desc)? {
            return Ok(false);
        }
        if index >= old_len {
            set_length_value(array, index + 1.0);
        }
        return Ok(true);
    }
    ordinary_define_own_property(agent, array, key, desc)
}

/// ArraySetLength
fn array_set_length(agent: &mut Agent, array: &Object, desc: PropertyDescriptor) -> Completion<bool> {
    let length_key = PropertyKey::from("length");
    let Some(value) = desc.value.clone() else {
        return ordinary_define_own_property(agent, array, &length_key, desc);
    };
    let new_len = to_uint32(agent, &value)? as f64;
    let number_len = to_number(agent, &value)?;
    if new_len != number_len {
        return throw_range_error(agent, "Invalid array length");
    }
    let mut new_len_desc = PropertyDescriptor {
        value: Some(Value::Number(new_len)),
        ..desc
    };
    let (old_len, old_len_writable) = length_property(array);
    if new_len >= old_len {
        return ordinary_define_own_property(agent, array, &length_key, new_len_desc);
    }
    if !old_len_writable {
        return Ok(false);
    }
    let new_writable = new_len_desc.writable != Some(false);
    if !new_writable {
        // deleting elements may fail, so `writable: false` is applied last
        new_len_desc.writable = Some(true);
    }
    if !ordinary_define_own_property(agent, array, &length_key, new_len_desc.clone())? {
        return Ok(false);
    }

    let mut doomed: Vec<(u32, PropertyKey)> = array
        .borrow()
        .properties
        .keys()
        .filter_map(|k| k.array_index().filter(|i| *i as f64 >= new_len).map(|i| (i, k.clone())))
        .collect();
    doomed.sort_by(|a, b| b.0.cmp(&a.0));
    for (index, key) in doomed {
        if !ordinary_delete(agent, array, &key)? {
            new_len_desc.value = Some(Value::Number(index as f64 + 1.0));
            if !new_writable {
                new_len_desc.writable = Some(false);
            }
            ordinary_define_own_property(agent, array, &length_key, new_len_desc)?;
            return Ok(false);
        }
    }
    if !new_writable {
        let freeze = PropertyDescriptor {
            writable: Some(false),
            ..Default::default()
        };
        ordinary_define_own_property(agent, array, &length_key, freeze)?;
    }
    Ok(true)
}
