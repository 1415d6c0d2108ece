use crate::core::{Symbol, Value, number_to_string};
use std::rc::Rc;

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(Rc<str>),
    Symbol(Symbol),
}

impl PropertyKey {
    pub fn from_index(index: usize) -> Self {
        PropertyKey::String(Rc::from(index.to_string()))
    }

    pub fn from_number(n: f64) -> Self {
        PropertyKey::String(Rc::from(number_to_string(n)))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    /// The array index this key denotes, if it is a canonical numeric string below 2^32 - 1.
    pub fn array_index(&self) -> Option<u32> {
        let s = self.as_str()?;
        if s.is_empty() || s.len() > 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if s.len() > 1 && s.starts_with('0') {
            return None;
        }
        match s.parse::<u64>() {
            Ok(n) if n < u32::MAX as u64 => Some(n as u32),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::String(s) => Value::String(s.clone()),
            PropertyKey::Symbol(sym) => Value::Symbol(sym.clone()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(Rc::from(s))
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(Rc::from(s))
    }
}

impl From<&Rc<str>> for PropertyKey {
    fn from(s: &Rc<str>) -> Self {
        PropertyKey::String(s.clone())
    }
}

impl From<Rc<str>> for PropertyKey {
    fn from(s: Rc<str>) -> Self {
        PropertyKey::String(s)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(sym: Symbol) -> Self {
        PropertyKey::Symbol(sym)
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(sym) => write!(f, "{}", sym.descriptive_string()),
        }
    }
}

impl std::fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s:?}"),
            PropertyKey::Symbol(sym) => write!(f, "{}", sym.descriptive_string()),
        }
    }
}

#[cfg(test)]
mod property_key_tests {
    use super::*;

    #[test]
    fn test_array_index() {
        assert_eq!(PropertyKey::from("0").array_index(), Some(0));
        assert_eq!(PropertyKey::from("42").array_index(), Some(42));
        assert_eq!(PropertyKey::from("042").array_index(), None);
        assert_eq!(PropertyKey::from("4294967295").array_index(), None);
        assert_eq!(PropertyKey::from("4294967294").array_index(), Some(4294967294));
        assert_eq!(PropertyKey::from("-1").array_index(), None);
        assert_eq!(PropertyKey::from("1.5").array_index(), None);
        assert_eq!(PropertyKey::Symbol(Symbol::new(None)).array_index(), None);
    }
}
