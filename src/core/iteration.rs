use crate::core::{
    Abrupt, Agent, Completion, Intrinsic, Object, ObjectKind, PropertyKey, Value, WellKnownSymbol, call, create_data_property_or_throw,
    exotics::create_array_from_list, get, get_method, ordinary_get_own_property, throw_type_error, to_boolean,
};
use std::rc::Rc;

/// An Iterator Record.
#[derive(Clone, Debug)]
pub struct IteratorRecord {
    pub iterator: Object,
    pub next_method: Value,
    pub done: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayIterationKind {
    Keys,
    Values,
    Entries,
}

/// Internal slots of an Array Iterator object.
pub struct ArrayIteratorState {
    /// `None` once the iterator is exhausted.
    pub iterated: Option<Object>,
    pub index: usize,
    pub kind: ArrayIterationKind,
}

/// CreateArrayIterator(array, kind)
pub fn create_array_iterator(agent: &Agent, array: Object, kind: ArrayIterationKind) -> Object {
    let state = ArrayIteratorState {
        iterated: Some(array),
        index: 0,
        kind,
    };
    Object::new(Some(agent.intrinsic(Intrinsic::ArrayIteratorPrototype)), ObjectKind::ArrayIterator(state))
}

/// Internal slots of a String Iterator object.
pub struct StringIteratorState {
    /// `None` once the iterator is exhausted.
    pub iterated: Option<Rc<str>>,
    /// Byte offset of the next code point.
    pub position: usize,
}

impl StringIteratorState {
    /// Advances by one code point; exhausts the iterator at the end of the string.
    pub fn next_code_point(&mut self) -> Option<char> {
        let code_point = self.iterated.as_deref().and_then(|s| s.get(self.position..)).and_then(|rest| rest.chars().next());
        match code_point {
            Some(c) => self.position += c.len_utf8(),
            None => self.iterated = None,
        }
        code_point
    }
}

/// CreateStringIterator(string)
pub fn create_string_iterator(agent: &Agent, string: Rc<str>) -> Object {
    let state = StringIteratorState {
        iterated: Some(string),
        position: 0,
    };
    Object::new(Some(agent.intrinsic(Intrinsic::StringIteratorPrototype)), ObjectKind::StringIterator(state))
}

/// GetIterator(obj, sync)
pub fn get_iterator(agent: &mut Agent, value: &Value) -> Completion<IteratorRecord> {
    let key = PropertyKey::Symbol(agent.well_known_symbol(WellKnownSymbol::Iterator));
    let Some(method) = get_method(agent, value, &key)? else {
        return throw_type_error(agent, &format!("{value:?} is not iterable"));
    };
    get_iterator_from_method(agent, value, &method)
}

/// GetIteratorFromMethod(obj, method)
pub fn get_iterator_from_method(agent: &mut Agent, value: &Value, method: &Value) -> Completion<IteratorRecord> {
    let iterator = call(agent, method, value, &[])?;
    let Value::Object(iterator) = iterator else {
        return throw_type_error(agent, "Result of the Symbol.iterator method is not an object");
    };
    let next_method = get(agent, &iterator, &PropertyKey::from("next"))?;
    Ok(IteratorRecord {
        iterator,
        next_method,
        done: false,
    })
}

/// IteratorNext(iteratorRecord, value)
pub fn iterator_next(agent: &mut Agent, record: &IteratorRecord, value: Option<Value>) -> Completion<Object> {
    let this = Value::Object(record.iterator.clone());
    let result = match value {
        Some(value) => call(agent, &record.next_method, &this, &[value])?,
        None => call(agent, &record.next_method, &this, &[])?,
    };
    match result {
        Value::Object(result) => Ok(result),
        other => throw_type_error(agent, &format!("Iterator result {other:?} is not an object")),
    }
}

/// IteratorComplete(iterResult)
pub fn iterator_complete(agent: &mut Agent, result: &Object) -> Completion<bool> {
    let done = get(agent, result, &PropertyKey::from("done"))?;
    Ok(to_boolean(&done))
}

/// IteratorValue(iterResult)
pub fn iterator_value(agent: &mut Agent, result: &Object) -> Completion<Value> {
    get(agent, result, &PropertyKey::from("value"))
}

/// IteratorStep(iteratorRecord). Marks the record done on exhaustion or when `next` throws.
pub fn iterator_step(agent: &mut Agent, record: &mut IteratorRecord) -> Completion<Option<Object>> {
    let result = match iterator_next(agent, record, None) {
        Ok(result) => result,
        Err(error) => {
            record.done = true;
            return Err(error);
        }
    };
    match iterator_complete(agent, &result) {
        Ok(true) => {
            record.done = true;
            Ok(None)
        }
        Ok(false) => Ok(Some(result)),
        Err(error) => {
            record.done = true;
            Err(error)
        }
    }
}

/// IteratorStepValue(iteratorRecord)
pub fn iterator_step_value(agent: &mut Agent, record: &mut IteratorRecord) -> Completion<Option<Value>> {
    let Some(result) = iterator_step(agent, record)? else {
        return Ok(None);
    };
    match iterator_value(agent, &result) {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            record.done = true;
            Err(error)
        }
    }
}

/// IteratorClose(iteratorRecord, completion)
pub fn iterator_close<T>(agent: &mut Agent, record: &IteratorRecord, completion: Completion<T>) -> Completion<T> {
    let iterator = Value::Object(record.iterator.clone());
    let inner = match get_method(agent, &iterator, &PropertyKey::from("return")) {
        Ok(None) => return completion,
        Ok(Some(method)) => call(agent, &method, &iterator, &[]),
        Err(error) => Err(error),
    };
    if let Err(Abrupt::Throw(_)) = completion {
        return completion;
    }
    let inner = inner?;
    if !inner.is_object() {
        return throw_type_error(agent, "Iterator result is not an object");
    }
    completion
}

/// CreateIterResultObject(value, done)
pub fn create_iter_result_object(agent: &mut Agent, value: Value, done: bool) -> Completion<Object> {
    let result = Object::ordinary(Some(agent.intrinsic(Intrinsic::ObjectPrototype)));
    create_data_property_or_throw(agent, &result, &PropertyKey::from("value"), value)?;
    create_data_property_or_throw(agent, &result, &PropertyKey::from("done"), Value::Boolean(done))?;
    Ok(result)
}

/// CreateListIteratorRecord(list). Backed by an array iterator over a fresh array.
pub fn create_list_iterator_record(agent: &mut Agent, list: Vec<Value>) -> IteratorRecord {
    let array = create_array_from_list(agent, list);
    let iterator = create_array_iterator(agent, array, ArrayIterationKind::Values);
    let prototype = agent.intrinsic(Intrinsic::ArrayIteratorPrototype);
    let next_method = ordinary_get_own_property(&prototype, &PropertyKey::from("next"))
        .and_then(|next| next.value().cloned())
        .unwrap_or_default();
    IteratorRecord {
        iterator,
        next_method,
        done: false,
    }
}

/// IteratorToList(GetIterator(value))
pub fn iterable_to_list(agent: &mut Agent, value: &Value) -> Completion<Vec<Value>> {
    let mut record = get_iterator(agent, value)?;
    let mut values = Vec::new();
    while let Some(value) = iterator_step_value(agent, &mut record)? {
        values.push(value);
    }
    Ok(values)
}
