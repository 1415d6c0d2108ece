//! Class declarations and expressions.
//!
//! The class body is partitioned once at wrap time; [`evaluate_class_definition`]
//! is the single ClassDefinitionEvaluation used by both node kinds.

use super::{
    BindingIdentifier, CodeKind, Context, Cx, ExportEntry, Expression, ExpressionStatement, FormalParameter, FunctionBody, FunctionCode,
    IdentifierReference, ListElement, MethodDefinition, NodeInfo, Pattern, PatternElement, PropertyName, Statement, StatementList,
    SuperCall, check_binding_identifier, is_property_name, log_evaluate,
};
use crate::JSError;
use crate::core::{
    Agent, ClassFieldDefinition, Completion, ConstructorKind, Environment, Intrinsic, Object, PropertyDescriptor, PropertyKey, Value,
    define_field, define_property_or_throw, get, make_class_constructor, make_constructor, make_method, ordinary_function_create,
    set_class_field_initializer_name, set_class_fields, set_constructor_kind, set_function_name, set_source_text, throw_type_error,
};
use crate::raise_syntax_error;
use crate::syntax::{self, MethodKind, Span};
use std::rc::Rc;

/// Where a class or function declaration sits relative to `export`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportPosition {
    NotExported,
    Named,
    Default,
}

pub struct FieldDefinition {
    pub info: NodeInfo,
    pub key: PropertyName,
    pub is_static: bool,
    pub initializer: Option<Rc<FunctionCode>>,
}

pub enum ClassElement {
    Method(MethodDefinition),
    Field(FieldDefinition),
}

/// ClassHeritage and ClassBody with their static semantics.
pub struct ClassTail {
    pub info: NodeInfo,
    pub heritage: Option<Box<Expression>>,
    /// ConstructorMethod, or the synthesized default constructor.
    pub constructor: Rc<FunctionCode>,
    pub has_explicit_constructor: bool,
    pub elements: Vec<ClassElement>,
    /// Source text of the whole class.
    pub source_text: Rc<str>,
}

impl ClassTail {
    pub(crate) fn wrap(cx: &mut Cx, class: &syntax::ClassNode) -> Result<ClassTail, JSError> {
        let flags = cx.flags | Context::STRICT;
        cx.with_flags(flags, |cx| {
            cx.node(class.span, |cx, info| {
                let heritage = class.heritage.as_ref().map(|heritage| Expression::wrap(cx, heritage).map(Box::new)).transpose()?;
                let derived = heritage.is_some();
                let mut constructor = None;
                let mut elements = Vec::with_capacity(class.members.len());
                for member in &class.members {
                    match member {
                        syntax::ClassMember::Method(method) if method.kind == MethodKind::Constructor => {
                            if constructor.is_some() {
                                return Err(raise_syntax_error!("A class may only have one constructor"));
                            }
                            let kind = if derived { CodeKind::DerivedConstructor } else { CodeKind::BaseConstructor };
                            let source_text = cx.text(method.span);
                            constructor = Some(FunctionCode::wrap(cx, &method.function, kind, source_text)?);
                        }
                        syntax::ClassMember::Method(method) => elements.push(ClassElement::Method(MethodDefinition::wrap(cx, method, true)?)),
                        syntax::ClassMember::Field { key, is_static, value, span } => {
                            elements.push(ClassElement::Field(FieldDefinition::wrap(cx, key, *is_static, value.as_ref(), *span)?));
                        }
                        syntax::ClassMember::Empty(_) => {}
                    }
                }
                let has_explicit_constructor = constructor.is_some();
                let constructor = match constructor {
                    Some(constructor) => constructor,
                    None => default_constructor(cx, class.span, derived)?,
                };
                Ok(ClassTail {
                    info,
                    heritage,
                    constructor,
                    has_explicit_constructor,
                    elements,
                    source_text: cx.text(class.span),
                })
            })
        })
    }

    /// ConstructorMethod
    pub fn constructor_method(&self) -> &Rc<FunctionCode> {
        &self.constructor
    }

    /// NonConstructorMethodDefinitions
    pub fn non_constructor_method_definitions(&self) -> impl Iterator<Item = &MethodDefinition> {
        self.elements.iter().filter_map(|element| match element {
            ClassElement::Method(method) => Some(method),
            ClassElement::Field(_) => None,
        })
    }

    pub fn field_definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.elements.iter().filter_map(|element| match element {
            ClassElement::Field(field) => Some(field),
            ClassElement::Method(_) => None,
        })
    }

    /// PrototypePropertyNameList: statically known names of non-static methods.
    pub fn prototype_property_name_list(&self) -> Vec<PropertyKey> {
        self.non_constructor_method_definitions()
            .filter(|method| !method.is_static)
            .filter_map(|method| method.key.literal().cloned())
            .collect()
    }
}

/// Builds `constructor(...args) { super(...args); }` or `constructor() {}` as semantic nodes.
fn default_constructor(cx: &mut Cx, span: Span, derived: bool) -> Result<Rc<FunctionCode>, JSError> {
    let source_text = cx.text(span);
    cx.node(span, |cx, info| {
        if !derived {
            let body = FunctionBody::Statements(StatementList::default());
            return Ok(Rc::new(FunctionCode::synthesized(info, CodeKind::BaseConstructor, Vec::new(), body, source_text)));
        }
        let args: Rc<str> = Rc::from("args");
        let parameter = cx.node(span, |_, info| {
            Ok(FormalParameter {
                element: PatternElement {
                    target: Pattern::Identifier(BindingIdentifier {
                        info,
                        name: args.clone(),
                        strict: true,
                    }),
                    default: None,
                },
                rest: true,
            })
        })?;
        let statement = cx.node(span, |cx, statement_info| {
            let call = cx.node(span, |cx, call_info| {
                let argument = cx.node(span, |_, info| {
                    Ok(Expression::Identifier(IdentifierReference {
                        info,
                        name: args.clone(),
                        strict: true,
                    }))
                })?;
                Ok(Expression::SuperCall(SuperCall {
                    info: call_info,
                    arguments: vec![ListElement::Spread(argument)],
                }))
            })?;
            Ok(Statement::Expression(ExpressionStatement {
                info: statement_info,
                expression: call,
            }))
        })?;
        let body = FunctionBody::Statements(StatementList {
            statements: vec![statement],
            ..Default::default()
        });
        Ok(Rc::new(FunctionCode::synthesized(info, CodeKind::DerivedConstructor, vec![parameter], body, source_text)))
    })
}

impl FieldDefinition {
    fn wrap(cx: &mut Cx, key: &syntax::PropertyName, is_static: bool, value: Option<&syntax::Expr>, span: Span) -> Result<FieldDefinition, JSError> {
        if is_property_name(key, "constructor") {
            return Err(raise_syntax_error!("Classes may not have a field named 'constructor'"));
        }
        if is_static && is_property_name(key, "prototype") {
            return Err(raise_syntax_error!("Classes may not have a static property named 'prototype'"));
        }
        cx.node(span, |cx, info| {
            let key = PropertyName::wrap(cx, key)?;
            let initializer = match value {
                Some(expr) => {
                    // the initializer is the body of a method; `arguments` and `super()` are out
                    let flags = (cx.flags & (Context::STRICT | Context::MODULE))
                        | Context::NEW_TARGET
                        | Context::SUPER_PROPERTY
                        | Context::IN_CLASS_FIELD;
                    cx.enter_function(false);
                    let wrapped = cx.with_flags(flags, |cx| cx.node(expr.span, |cx, info| Ok((info, Expression::wrap(cx, expr)?))));
                    cx.leave_function();
                    let (info, expression) = wrapped?;
                    let body = FunctionBody::Initializer(Box::new(expression));
                    let source_text = cx.text(expr.span);
                    Some(Rc::new(FunctionCode::synthesized(info, CodeKind::FieldInitializer, Vec::new(), body, source_text)))
                }
                None => None,
            };
            Ok(FieldDefinition {
                info,
                key,
                is_static,
                initializer,
            })
        })
    }

    /// ClassFieldDefinitionEvaluation(homeObject)
    fn evaluate(&self, agent: &mut Agent, home_object: &Object) -> Completion<ClassFieldDefinition> {
        log_evaluate!("FieldDefinition", self.info, agent);
        let name = self.key.evaluate(agent)?;
        let initializer = self.initializer.as_ref().map(|code| {
            let env = agent.lexical_environment();
            let prototype = agent.intrinsic(Intrinsic::FunctionPrototype);
            let function = ordinary_function_create(agent, prototype, code.source_text.clone(), code.clone(), false, env);
            make_method(&function, home_object);
            set_class_field_initializer_name(&function, name.clone());
            function
        });
        Ok(ClassFieldDefinition { name, initializer })
    }
}

/// ClassDefinitionEvaluation(classBinding, className)
pub fn evaluate_class_definition(
    agent: &mut Agent,
    tail: &ClassTail,
    class_binding: Option<&Rc<str>>,
    class_name: Option<&PropertyKey>,
) -> Completion<Object> {
    log_evaluate!("ClassTail", tail.info, agent);
    let env = agent.lexical_environment();
    let class_scope = Environment::new_declarative(Some(env.clone()));
    if let Some(binding) = class_binding {
        class_scope.create_immutable_binding(agent, binding, true)?;
    }

    let (proto_parent, constructor_parent) = match &tail.heritage {
        None => (
            Some(agent.intrinsic(Intrinsic::ObjectPrototype)),
            agent.intrinsic(Intrinsic::FunctionPrototype),
        ),
        Some(heritage) => {
            agent.set_lexical_environment(class_scope.clone());
            let superclass = heritage.evaluate_value(agent);
            agent.set_lexical_environment(env.clone());
            match superclass? {
                Value::Null => (None, agent.intrinsic(Intrinsic::FunctionPrototype)),
                Value::Object(superclass) if superclass.is_constructor() => {
                    match get(agent, &superclass, &PropertyKey::from("prototype"))? {
                        Value::Object(prototype) => (Some(prototype), superclass),
                        Value::Null => (None, superclass),
                        _ => return throw_type_error(agent, "Class extends value does not have valid prototype property"),
                    }
                }
                other => return throw_type_error(agent, &format!("Class extends value {other} is not a constructor or null")),
            }
        }
    };

    let proto = Object::ordinary(proto_parent);
    agent.set_lexical_environment(class_scope.clone());
    let defined = define_class_elements(agent, tail, &proto, constructor_parent, class_name);
    agent.set_lexical_environment(env);
    let (function, static_fields) = defined?;

    if let Some(binding) = class_binding {
        class_scope.initialize_binding(agent, binding, Value::Object(function.clone()))?;
    }
    for field in &static_fields {
        define_field(agent, &function, field)?;
    }
    Ok(function)
}

/// Steps that run with `classScope` as the running lexical environment: the
/// constructor, `proto.constructor`, then every element in order. Returns `F`
/// and the static fields still to be defined on it.
fn define_class_elements(
    agent: &mut Agent,
    tail: &ClassTail,
    proto: &Object,
    constructor_parent: Object,
    class_name: Option<&PropertyKey>,
) -> Completion<(Object, Vec<ClassFieldDefinition>)> {
    let scope = agent.lexical_environment();
    let function = ordinary_function_create(agent, constructor_parent, tail.source_text.clone(), tail.constructor.clone(), false, scope);
    make_method(&function, proto);
    if tail.heritage.is_some() {
        set_constructor_kind(&function, ConstructorKind::Derived);
    }
    make_constructor(agent, &function, false, Some(proto.clone()));
    make_class_constructor(&function);
    if let Some(name) = class_name {
        set_function_name(&function, name, None);
    }
    define_property_or_throw(
        agent,
        proto,
        &PropertyKey::from("constructor"),
        PropertyDescriptor::data(Value::Object(function.clone()), true, false, true),
    )?;

    let mut instance_fields = Vec::new();
    let mut static_fields = Vec::new();
    for element in &tail.elements {
        match element {
            ClassElement::Method(method) => {
                let target = if method.is_static { &function } else { proto };
                method.evaluate_property_definition(agent, target, false)?;
            }
            ClassElement::Field(field) if field.is_static => static_fields.push(field.evaluate(agent, &function)?),
            ClassElement::Field(field) => instance_fields.push(field.evaluate(agent, proto)?),
        }
    }
    set_class_fields(&function, instance_fields);
    Ok((function, static_fields))
}

pub struct ClassDeclaration {
    pub info: NodeInfo,
    pub name: Option<Rc<str>>,
    pub export: ExportPosition,
    pub tail: ClassTail,
}

impl ClassDeclaration {
    pub(crate) fn wrap(cx: &mut Cx, class: &syntax::ClassNode, export: ExportPosition) -> Result<ClassDeclaration, JSError> {
        cx.node(class.span, |cx, info| {
            if let Some(name) = &class.name {
                cx.with_flags(cx.flags | Context::STRICT, |cx| check_binding_identifier(cx, name))?;
            }
            Ok(ClassDeclaration {
                info,
                name: class.name.as_deref().map(Rc::from),
                export,
                tail: ClassTail::wrap(cx, class)?,
            })
        })
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    /// BoundNames: `[name]`, `["*default*"]`, or `[name, "*default*"]` for a named default export.
    pub fn bound_names(&self) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = self.name.iter().cloned().collect();
        if self.export == ExportPosition::Default {
            names.push(Rc::from("*default*"));
        }
        names
    }

    pub fn is_constant_declaration(&self) -> bool {
        false
    }

    pub fn is_function_definition(&self) -> bool {
        true
    }

    pub fn var_declared_names(&self) -> Vec<Rc<str>> {
        Vec::new()
    }

    pub fn var_scoped_declarations(&self) -> Vec<&ClassDeclaration> {
        Vec::new()
    }

    /// LexicallyScopedDeclarations: the declaration itself, exported or not. Its bindings
    /// include `*default*` in default export position.
    pub fn lexically_scoped_declarations(&self) -> Vec<&ClassDeclaration> {
        vec![self]
    }

    pub fn exported_bindings(&self) -> Vec<Rc<str>> {
        match self.export {
            ExportPosition::NotExported => Vec::new(),
            _ => self.bound_names(),
        }
    }

    pub fn exported_names(&self) -> Vec<Rc<str>> {
        match self.export {
            ExportPosition::NotExported => Vec::new(),
            ExportPosition::Named => self.bound_names(),
            ExportPosition::Default => vec![Rc::from("default")],
        }
    }

    /// ExportEntries: the local name is the class name, or `*default*` when unnamed.
    pub fn export_entries(&self) -> Vec<ExportEntry> {
        let local_name = self.name.clone().unwrap_or_else(|| Rc::from("*default*"));
        let export_name = match self.export {
            ExportPosition::NotExported => return Vec::new(),
            ExportPosition::Named => local_name.clone(),
            ExportPosition::Default => Rc::from("default"),
        };
        vec![ExportEntry::local(export_name, local_name)]
    }

    /// BindingClassDeclarationEvaluation
    pub fn evaluate_binding_class_declaration(&self, agent: &mut Agent) -> Completion<Object> {
        let value = match &self.name {
            Some(name) => evaluate_class_definition(agent, &self.tail, Some(name), Some(&PropertyKey::from(name)))?,
            None => evaluate_class_definition(agent, &self.tail, None, Some(&PropertyKey::from("default")))?,
        };
        set_source_text(&value, self.tail.source_text.clone());
        if let Some(name) = &self.name {
            let env = agent.lexical_environment();
            env.initialize_binding(agent, name, Value::Object(value.clone()))?;
        }
        Ok(value)
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("ClassDeclaration", self.info, agent);
        let value = self.evaluate_binding_class_declaration(agent)?;
        if self.export == ExportPosition::Default {
            let env = agent.lexical_environment();
            env.initialize_binding(agent, "*default*", Value::Object(value))?;
        }
        Ok(None)
    }
}

pub struct ClassExpression {
    pub info: NodeInfo,
    pub name: Option<Rc<str>>,
    pub tail: ClassTail,
}

impl ClassExpression {
    pub(crate) fn wrap(cx: &mut Cx, class: &syntax::ClassNode) -> Result<ClassExpression, JSError> {
        cx.node(class.span, |cx, info| {
            if let Some(name) = &class.name {
                cx.with_flags(cx.flags | Context::STRICT, |cx| check_binding_identifier(cx, name))?;
            }
            Ok(ClassExpression {
                info,
                name: class.name.as_deref().map(Rc::from),
                tail: ClassTail::wrap(cx, class)?,
            })
        })
    }

    /// NamedEvaluation of an anonymous class expression.
    pub fn evaluate_named(&self, agent: &mut Agent, name: &PropertyKey) -> Completion<Object> {
        log_evaluate!("ClassExpression", self.info, agent);
        let value = evaluate_class_definition(agent, &self.tail, None, Some(name))?;
        set_source_text(&value, self.tail.source_text.clone());
        Ok(value)
    }

    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Value> {
        log_evaluate!("ClassExpression", self.info, agent);
        let value = match &self.name {
            Some(name) => evaluate_class_definition(agent, &self.tail, Some(name), Some(&PropertyKey::from(name)))?,
            None => evaluate_class_definition(agent, &self.tail, None, None)?,
        };
        set_source_text(&value, self.tail.source_text.clone());
        Ok(Value::Object(value))
    }
}

#[cfg(test)]
mod classes_tests {
    use super::*;
    use crate::core::Realm;
    use crate::syntax::{StatementKind, parse_module, parse_script};

    fn class_node(source: &str) -> syntax::ClassNode {
        let program = parse_script(source).unwrap();
        match program.body.into_iter().next().unwrap().kind {
            StatementKind::Class(class) => class,
            other => panic!("expected class declaration, got {other:?}"),
        }
    }

    fn wrap(source: &str, export: ExportPosition) -> Result<ClassDeclaration, JSError> {
        let realm = Realm::new();
        let class = class_node(source);
        let mut cx = Cx::new(&realm, source, Context::empty());
        ClassDeclaration::wrap(&mut cx, &class, export)
    }

    #[test]
    fn test_class_body_partition() {
        let declaration = wrap("class Foo { constructor() {} static x() {} bar() {} get baz() { return 1; } qux = 1; }", ExportPosition::NotExported).unwrap();
        assert!(declaration.tail.has_explicit_constructor);
        assert_eq!(declaration.tail.non_constructor_method_definitions().count(), 3);
        assert_eq!(declaration.tail.field_definitions().count(), 1);
        let names: Vec<String> = declaration.tail.prototype_property_name_list().iter().map(|key| key.to_string()).collect();
        assert_eq!(names, vec!["bar", "baz"]);
        assert!(declaration.is_function_definition());
        assert!(!declaration.is_constant_declaration());
        assert!(declaration.var_declared_names().is_empty());
    }

    #[test]
    fn test_bound_names_in_export_position() {
        let named = wrap("class Foo {}", ExportPosition::NotExported).unwrap();
        assert_eq!(named.bound_names(), vec![Rc::from("Foo")]);
        assert!(named.export_entries().is_empty());

        let named_default = wrap("class Foo {}", ExportPosition::Default).unwrap();
        assert_eq!(named_default.bound_names(), vec![Rc::from("Foo"), Rc::from("*default*")]);
        assert_eq!(named_default.exported_names(), vec![Rc::from("default")]);
        let entries = named_default.export_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].local_name.as_deref(), Some("Foo"));
    }

    #[test]
    fn test_scoped_declarations_in_each_export_position() {
        for export in [ExportPosition::NotExported, ExportPosition::Named, ExportPosition::Default] {
            let declaration = wrap("class Foo {}", export).unwrap();
            assert!(declaration.var_scoped_declarations().is_empty());
            let lexical = declaration.lexically_scoped_declarations();
            assert_eq!(lexical.len(), 1);
            assert!(std::ptr::eq(lexical[0], &declaration));
        }
        let default = wrap("class Foo {}", ExportPosition::Default).unwrap();
        let names: Vec<Rc<str>> = default.lexically_scoped_declarations().iter().flat_map(|d| d.bound_names()).collect();
        assert_eq!(names, vec![Rc::from("Foo"), Rc::from("*default*")]);
    }

    #[test]
    fn test_unnamed_default_export_binds_default_marker() {
        let source = "export default class {}";
        let program = parse_module(source).unwrap();
        let StatementKind::Export(syntax::ExportDeclaration::DefaultClass(class)) = &program.body[0].kind else {
            panic!("expected default class export");
        };
        let realm = Realm::new();
        let mut cx = Cx::new(&realm, source, Context::STRICT | Context::MODULE);
        let declaration = ClassDeclaration::wrap(&mut cx, class, ExportPosition::Default).unwrap();
        assert!(!declaration.has_name());
        assert_eq!(declaration.bound_names(), vec![Rc::from("*default*")]);
        let entries = declaration.export_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].export_name.as_deref(), Some("default"));
        assert_eq!(entries[0].local_name.as_deref(), Some("*default*"));
        assert!(entries[0].module_request.is_none());
        assert!(entries[0].import_name.is_none());
        let lexical = declaration.lexically_scoped_declarations();
        assert_eq!(lexical.len(), 1);
        assert_eq!(lexical[0].bound_names(), vec![Rc::from("*default*")]);
    }

    #[test]
    fn test_throwing_member_aborts_remaining_installs() {
        use crate::options::AgentOptions;

        let source = "class K { a() {} [(() => { throw new Error('boom'); })()]() {} c() {} }";
        let mut agent = Agent::new(AgentOptions::default());
        let realm = agent.realm().clone();
        let class = class_node(source);
        let mut cx = Cx::new(&realm, source, Context::empty());
        let declaration = ClassDeclaration::wrap(&mut cx, &class, ExportPosition::NotExported).unwrap();

        let proto = Object::ordinary(Some(agent.intrinsic(Intrinsic::ObjectPrototype)));
        let parent = agent.intrinsic(Intrinsic::FunctionPrototype);
        let result = define_class_elements(&mut agent, &declaration.tail, &proto, parent, None);
        assert!(matches!(result, Err(crate::core::Abrupt::Throw(_))));
        assert!(proto.get_own_property(&mut agent, &PropertyKey::from("constructor")).unwrap().is_some());
        assert!(proto.get_own_property(&mut agent, &PropertyKey::from("a")).unwrap().is_some());
        assert!(proto.get_own_property(&mut agent, &PropertyKey::from("c")).unwrap().is_none());
    }

    #[test]
    fn test_early_errors() {
        assert!(wrap("class A { constructor() {} constructor() {} }", ExportPosition::NotExported).is_err());
        assert!(wrap("class A { constructor = 1; }", ExportPosition::NotExported).is_err());
        assert!(wrap("class A { static prototype() {} }", ExportPosition::NotExported).is_err());
        assert!(wrap("class A { m() { super(); } }", ExportPosition::NotExported).is_err());
        assert!(wrap("class A { x = arguments; }", ExportPosition::NotExported).is_err());
        assert!(wrap("class A extends B { constructor() { super(); } }", ExportPosition::NotExported).is_ok());
    }
}
