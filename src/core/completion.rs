use crate::core::Value;
use std::rc::Rc;

/// The abrupt half of a Completion Record.
#[derive(Clone, Debug)]
pub enum Abrupt {
    Throw(Value),
    Return(Value),
    Break { label: Option<Rc<str>>, value: Option<Value> },
    Continue { label: Option<Rc<str>>, value: Option<Value> },
}

/// A Completion Record. `Ok` is a normal completion.
pub type Completion<T = Value> = Result<T, Abrupt>;

/// The `[[Type]]` field of a Completion Record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionType {
    Normal,
    Break,
    Continue,
    Return,
    Throw,
}

impl Abrupt {
    pub fn completion_type(&self) -> CompletionType {
        match self {
            Abrupt::Throw(_) => CompletionType::Throw,
            Abrupt::Return(_) => CompletionType::Return,
            Abrupt::Break { .. } => CompletionType::Break,
            Abrupt::Continue { .. } => CompletionType::Continue,
        }
    }

    /// UpdateEmpty for abrupt completions; only break and continue can carry `empty`.
    pub fn update_empty(self, value: Option<Value>) -> Self {
        match self {
            Abrupt::Break { label, value: None } => Abrupt::Break { label, value },
            Abrupt::Continue { label, value: None } => Abrupt::Continue { label, value },
            other => other,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Abrupt::Throw(v) | Abrupt::Return(v) => Some(v),
            Abrupt::Break { value, .. } | Abrupt::Continue { value, .. } => value.as_ref(),
        }
    }
}

pub fn completion_type<T>(completion: &Completion<T>) -> CompletionType {
    match completion {
        Ok(_) => CompletionType::Normal,
        Err(abrupt) => abrupt.completion_type(),
    }
}

/// UpdateEmpty(completion, value). `None` stands for `empty`.
pub fn update_empty(completion: Completion<Option<Value>>, value: Option<Value>) -> Completion<Option<Value>> {
    match completion {
        Ok(None) => Ok(value),
        Ok(some) => Ok(some),
        Err(abrupt) => Err(abrupt.update_empty(value)),
    }
}

#[cfg(test)]
mod completion_tests {
    use super::*;

    #[test]
    fn test_update_empty() {
        let updated = update_empty(Ok(None), Some(Value::Number(1.0)));
        assert!(matches!(updated, Ok(Some(Value::Number(n))) if n == 1.0));

        let kept = update_empty(Ok(Some(Value::Number(2.0))), Some(Value::Number(1.0)));
        assert!(matches!(kept, Ok(Some(Value::Number(n))) if n == 2.0));

        let brk = update_empty(Err(Abrupt::Break { label: None, value: None }), Some(Value::Null));
        assert!(matches!(brk, Err(Abrupt::Break { value: Some(Value::Null), .. })));

        let thrown = update_empty(Err(Abrupt::Throw(Value::Boolean(true))), Some(Value::Null));
        assert_eq!(completion_type(&thrown), CompletionType::Throw);
    }
}
