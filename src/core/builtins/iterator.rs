use super::Installer;
use crate::core::{
    Agent, ArrayIterationKind, Completion, Intrinsic, Object, ObjectKind, PropertyKey, Value, WellKnownSymbol, create_iter_result_object,
    exotics::create_array_from_list, get, length_of_array_like, throw_type_error,
};

pub(super) fn initialize(installer: &mut Installer) {
    let object_prototype = installer.get(Intrinsic::ObjectPrototype);
    let iterator_prototype = Object::ordinary(Some(object_prototype));
    let iterator = installer.symbols.get(WellKnownSymbol::Iterator);
    installer.symbol_method(&iterator_prototype, &iterator, 0, iterator_prototype_iterator, true);

    let array_iterator_prototype = Object::ordinary(Some(iterator_prototype.clone()));
    installer.method(&array_iterator_prototype, "next", 0, array_iterator_prototype_next);
    installer.to_string_tag(&array_iterator_prototype, "Array Iterator");

    let string_iterator_prototype = Object::ordinary(Some(iterator_prototype.clone()));
    installer.method(&string_iterator_prototype, "next", 0, string_iterator_prototype_next);
    installer.to_string_tag(&string_iterator_prototype, "String Iterator");

    installer.intrinsics.set(Intrinsic::IteratorPrototype, iterator_prototype);
    installer.intrinsics.set(Intrinsic::ArrayIteratorPrototype, array_iterator_prototype);
    installer.intrinsics.set(Intrinsic::StringIteratorPrototype, string_iterator_prototype);
}

fn iterator_prototype_iterator(_agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    Ok(this.clone())
}

/// %ArrayIteratorPrototype%.next()
fn array_iterator_prototype_next(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let Value::Object(iterator) = this else {
        return throw_type_error(agent, "next method called on incompatible receiver");
    };
    let state = match &iterator.borrow().kind {
        ObjectKind::ArrayIterator(state) => Some((state.iterated.clone(), state.index, state.kind)),
        _ => None,
    };
    let Some((iterated, index, kind)) = state else {
        return throw_type_error(agent, "next method called on incompatible receiver");
    };
    let Some(array) = iterated else {
        return Ok(Value::Object(create_iter_result_object(agent, Value::Undefined, true)?));
    };
    let length = length_of_array_like(agent, &array)? as usize;
    if index >= length {
        if let ObjectKind::ArrayIterator(state) = &mut iterator.borrow_mut().kind {
            state.iterated = None;
        }
        return Ok(Value::Object(create_iter_result_object(agent, Value::Undefined, true)?));
    }
    if let ObjectKind::ArrayIterator(state) = &mut iterator.borrow_mut().kind {
        state.index = index + 1;
    }
    let result = match kind {
        ArrayIterationKind::Keys => Value::from(index),
        ArrayIterationKind::Values => get(agent, &array, &PropertyKey::from_index(index))?,
        ArrayIterationKind::Entries => {
            let value = get(agent, &array, &PropertyKey::from_index(index))?;
            Value::Object(create_array_from_list(agent, [Value::from(index), value]))
        }
    };
    Ok(Value::Object(create_iter_result_object(agent, result, false)?))
}

/// %StringIteratorPrototype%.next()
fn string_iterator_prototype_next(agent: &mut Agent, this: &Value, _args: &[Value], _nt: Option<&Object>) -> Completion<Value> {
    let Value::Object(iterator) = this else {
        return throw_type_error(agent, "next method called on incompatible receiver");
    };
    let step = match &mut iterator.borrow_mut().kind {
        ObjectKind::StringIterator(state) => Some(state.next_code_point()),
        _ => None,
    };
    match step {
        None => throw_type_error(agent, "next method called on incompatible receiver"),
        Some(None) => Ok(Value::Object(create_iter_result_object(agent, Value::Undefined, true)?)),
        Some(Some(code_point)) => {
            let value = Value::from(code_point.to_string());
            Ok(Value::Object(create_iter_result_object(agent, value, false)?))
        }
    }
}
