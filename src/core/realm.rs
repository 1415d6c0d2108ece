use crate::core::{Environment, Object, Symbol, builtins, heap};
use std::cell::Cell;
use std::rc::Rc;

/// Identifies a semantic node within one realm; used for log correlation only.
pub type NodeId = usize;

/// The well-known intrinsic objects (`%Name%`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    ObjectConstructor,
    ObjectPrototype,
    FunctionConstructor,
    FunctionPrototype,
    ArrayConstructor,
    ArrayPrototype,
    ArrayPrototypeValues,
    ArrayIteratorPrototype,
    StringIteratorPrototype,
    IteratorPrototype,
    SymbolConstructor,
    SymbolPrototype,
    StringConstructor,
    StringPrototype,
    NumberConstructor,
    NumberPrototype,
    BooleanConstructor,
    BooleanPrototype,
    ErrorConstructor,
    ErrorPrototype,
    TypeErrorConstructor,
    TypeErrorPrototype,
    ReferenceErrorConstructor,
    ReferenceErrorPrototype,
    SyntaxErrorConstructor,
    SyntaxErrorPrototype,
    RangeErrorConstructor,
    RangeErrorPrototype,
    ThrowTypeError,
}

impl Intrinsic {
    pub const COUNT: usize = Intrinsic::ThrowTypeError as usize + 1;
}

/// The realm's intrinsic table; every slot is filled during realm creation.
pub struct Intrinsics(Vec<Object>);

impl Intrinsics {
    pub(crate) fn new() -> Self {
        Intrinsics((0..Intrinsic::COUNT).map(|_| Object::ordinary(None)).collect())
    }

    pub fn get(&self, intrinsic: Intrinsic) -> Object {
        self.0[intrinsic as usize].clone()
    }

    pub(crate) fn set(&mut self, intrinsic: Intrinsic, object: Object) {
        self.0[intrinsic as usize] = object;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WellKnownSymbol {
    Iterator,
    HasInstance,
    ToStringTag,
    ToPrimitive,
}

impl WellKnownSymbol {
    pub const ALL: [WellKnownSymbol; 4] = [
        WellKnownSymbol::Iterator,
        WellKnownSymbol::HasInstance,
        WellKnownSymbol::ToStringTag,
        WellKnownSymbol::ToPrimitive,
    ];

    /// The property name on `%Symbol%`.
    pub fn name(self) -> &'static str {
        match self {
            WellKnownSymbol::Iterator => "iterator",
            WellKnownSymbol::HasInstance => "hasInstance",
            WellKnownSymbol::ToStringTag => "toStringTag",
            WellKnownSymbol::ToPrimitive => "toPrimitive",
        }
    }
}

pub struct WellKnownSymbols([Symbol; 4]);

impl WellKnownSymbols {
    fn new() -> Self {
        WellKnownSymbols(WellKnownSymbol::ALL.map(|w| Symbol::new(Some(Rc::from(format!("Symbol.{}", w.name()))))))
    }

    pub fn get(&self, symbol: WellKnownSymbol) -> Symbol {
        self.0[symbol as usize].clone()
    }
}

/// A Realm Record: intrinsics, the global object and the global environment.
pub struct Realm {
    intrinsics: Intrinsics,
    symbols: WellKnownSymbols,
    global_object: Object,
    global_env: Environment,
    next_node_id: Cell<NodeId>,
}

impl Drop for Realm {
    fn drop(&mut self) {
        // the intrinsics and globals reference each other; hand them back to the collector
        let intrinsics = std::mem::take(&mut self.intrinsics.0);
        let global_object = std::mem::replace(&mut self.global_object, Object::ordinary(None));
        let global_env = std::mem::replace(&mut self.global_env, Environment::new_declarative(None));
        drop((intrinsics, global_object, global_env));
        let released = heap::collect_cycles();
        log::trace!("realm dropped, {released} nodes released");
    }
}

impl Realm {
    /// CreateRealm + SetRealmGlobalObject + SetDefaultGlobalBindings
    pub fn new() -> Rc<Realm> {
        let symbols = WellKnownSymbols::new();
        let intrinsics = builtins::create_intrinsics(&symbols);
        let global_object = Object::ordinary(Some(intrinsics.get(Intrinsic::ObjectPrototype)));
        let global_env = Environment::new_global(global_object.clone(), global_object.clone());
        builtins::set_default_global_bindings(&intrinsics, &global_object);
        log::trace!("realm created with {} intrinsics", Intrinsic::COUNT);
        Rc::new(Realm {
            intrinsics,
            symbols,
            global_object,
            global_env,
            next_node_id: Cell::new(0),
        })
    }

    pub fn intrinsic(&self, intrinsic: Intrinsic) -> Object {
        self.intrinsics.get(intrinsic)
    }

    pub fn well_known_symbol(&self, symbol: WellKnownSymbol) -> Symbol {
        self.symbols.get(symbol)
    }

    pub fn global_object(&self) -> Object {
        self.global_object.clone()
    }

    pub fn global_env(&self) -> Environment {
        self.global_env.clone()
    }

    /// Hands out the next semantic node id. Ids are unique and increasing within the realm.
    pub fn register_node(&self) -> NodeId {
        let id = self.next_node_id.get();
        self.next_node_id.set(id + 1);
        id
    }
}

#[cfg(test)]
mod realm_tests {
    use super::*;

    #[test]
    fn test_node_ids_are_monotonic() {
        let realm = Realm::new();
        let a = realm.register_node();
        let b = realm.register_node();
        assert!(b > a);
    }

    #[test]
    fn test_intrinsic_prototype_links() {
        let realm = Realm::new();
        let object_prototype = realm.intrinsic(Intrinsic::ObjectPrototype);
        let function_prototype = realm.intrinsic(Intrinsic::FunctionPrototype);
        assert_eq!(function_prototype.get_prototype_of(), Some(object_prototype.clone()));
        assert_eq!(object_prototype.get_prototype_of(), None);
        let type_error = realm.intrinsic(Intrinsic::TypeErrorConstructor);
        assert_eq!(type_error.get_prototype_of(), Some(realm.intrinsic(Intrinsic::ErrorConstructor)));
    }
}
