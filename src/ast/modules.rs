//! Module code: import/export entries and module-level declaration instantiation.

use super::{
    ClassDeclaration, Context, Cx, ExportPosition, Expression, FunctionDeclaration, LexicalBinding, NodeInfo, Scope, Statement,
    VariableDeclaration, check_duplicates, log_evaluate,
};
use crate::JSError;
use crate::core::{Agent, Completion, Environment, PropertyKey, Realm, Value};
use crate::options::SourceOptions;
use crate::raise_syntax_error;
use crate::syntax::{self, ExportDeclaration, ImportSpecifier};
use std::rc::Rc;

/// [[ImportName]] of an ImportEntry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportName {
    Name(Rc<str>),
    NamespaceObject,
}

/// [[ImportName]] of an ExportEntry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportImportName {
    Name(Rc<str>),
    /// `export * as ns from "m"`
    All,
    /// `export * from "m"`
    AllButDefault,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    pub module_request: Rc<str>,
    pub import_name: ImportName,
    pub local_name: Rc<str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportEntry {
    pub export_name: Option<Rc<str>>,
    pub module_request: Option<Rc<str>>,
    pub import_name: Option<ExportImportName>,
    pub local_name: Option<Rc<str>>,
}

impl ExportEntry {
    /// An entry exporting a binding of this module.
    pub fn local(export_name: Rc<str>, local_name: Rc<str>) -> ExportEntry {
        ExportEntry {
            export_name: Some(export_name),
            module_request: None,
            import_name: None,
            local_name: Some(local_name),
        }
    }

    fn indirect(export_name: Option<Rc<str>>, module_request: Rc<str>, import_name: ExportImportName) -> ExportEntry {
        ExportEntry {
            export_name,
            module_request: Some(module_request),
            import_name: Some(import_name),
            local_name: None,
        }
    }
}

/// `export default <expression>;`
pub struct ExportDefaultExpression {
    pub info: NodeInfo,
    pub expression: Expression,
}

impl ExportDefaultExpression {
    fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("ExportDeclaration", self.info, agent);
        let value = self.expression.evaluate_named(agent, &PropertyKey::from("default"))?;
        let env = agent.lexical_environment();
        env.initialize_binding(agent, "*default*", value)?;
        Ok(None)
    }
}

/// A module item with runtime semantics. Imports and plain export lists evaluate to nothing and are not kept.
pub enum ModuleItem {
    Statement(Statement),
    ExportDefault(ExportDefaultExpression),
}

impl ModuleItem {
    fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        match self {
            ModuleItem::Statement(statement) => statement.evaluate(agent),
            ModuleItem::ExportDefault(export) => export.evaluate(agent),
        }
    }
}

/// The wrapped body of a Source Text Module Record.
pub struct Module {
    pub info: NodeInfo,
    pub items: Vec<ModuleItem>,
    pub scope: Scope,
    pub requested_modules: Vec<Rc<str>>,
    pub import_entries: Vec<ImportEntry>,
    pub local_export_entries: Vec<ExportEntry>,
    pub indirect_export_entries: Vec<ExportEntry>,
    pub star_export_entries: Vec<ExportEntry>,
}

/// Entries collected while walking the module body, before local re-exports are classified.
#[derive(Default)]
struct Collected {
    items: Vec<ModuleItem>,
    requests: Vec<Rc<str>>,
    imports: Vec<ImportEntry>,
    exports: Vec<ExportEntry>,
    exported_names: Vec<Rc<str>>,
    /// Local names of `export { x }` lists, checked against the module's declarations.
    export_list_locals: Vec<Rc<str>>,
    default_expression: bool,
}

impl Collected {
    fn request(&mut self, module: &str) -> Rc<str> {
        let request: Rc<str> = Rc::from(module);
        if !self.requests.contains(&request) {
            self.requests.push(request.clone());
        }
        request
    }

    fn import(&mut self, declaration: &syntax::ImportDeclaration) {
        let module_request = self.request(&declaration.module);
        for specifier in &declaration.specifiers {
            let (import_name, local_name) = match specifier {
                ImportSpecifier::Default(local) => (ImportName::Name(Rc::from("default")), local),
                ImportSpecifier::Namespace(local) => (ImportName::NamespaceObject, local),
                ImportSpecifier::Named { imported, local } => (ImportName::Name(Rc::from(imported.as_str())), local),
            };
            self.imports.push(ImportEntry {
                module_request: module_request.clone(),
                import_name,
                local_name: Rc::from(local_name.as_str()),
            });
        }
    }

    fn export(&mut self, cx: &mut Cx, span: syntax::Span, declaration: &ExportDeclaration) -> Result<(), JSError> {
        match declaration {
            ExportDeclaration::Named { specifiers, from: None } => {
                for specifier in specifiers {
                    let local: Rc<str> = Rc::from(specifier.local.as_str());
                    let exported: Rc<str> = Rc::from(specifier.exported.as_str());
                    self.exported_names.push(exported.clone());
                    self.export_list_locals.push(local.clone());
                    self.exports.push(ExportEntry::local(exported, local));
                }
            }
            ExportDeclaration::Named { specifiers, from: Some(from) } => {
                let module_request = self.request(from);
                for specifier in specifiers {
                    let exported: Rc<str> = Rc::from(specifier.exported.as_str());
                    self.exported_names.push(exported.clone());
                    self.exports.push(ExportEntry::indirect(
                        Some(exported),
                        module_request.clone(),
                        ExportImportName::Name(Rc::from(specifier.local.as_str())),
                    ));
                }
            }
            ExportDeclaration::All { alias, from } => {
                let module_request = self.request(from);
                match alias {
                    Some(alias) => {
                        let alias: Rc<str> = Rc::from(alias.as_str());
                        self.exported_names.push(alias.clone());
                        self.exports.push(ExportEntry::indirect(Some(alias), module_request, ExportImportName::All));
                    }
                    None => self.exports.push(ExportEntry::indirect(None, module_request, ExportImportName::AllButDefault)),
                }
            }
            ExportDeclaration::Declaration(statement) => {
                let statement = match &statement.kind {
                    syntax::StatementKind::Variable(kind, declarators) => {
                        Statement::Variable(VariableDeclaration::wrap(cx, statement.span, *kind, declarators)?)
                    }
                    syntax::StatementKind::Function(function) => Statement::Function(FunctionDeclaration::wrap(cx, function)?),
                    syntax::StatementKind::Class(class) => {
                        Statement::Class(Box::new(ClassDeclaration::wrap(cx, class, ExportPosition::Named)?))
                    }
                    _ => return Err(raise_syntax_error!("Unexpected token 'export'")),
                };
                let names = match &statement {
                    Statement::Variable(declaration) => declaration.bound_names(),
                    Statement::Function(function) => vec![function.bound_name()],
                    Statement::Class(class) => class.bound_names(),
                    _ => Vec::new(),
                };
                for name in names {
                    self.exported_names.push(name.clone());
                    self.exports.push(ExportEntry::local(name.clone(), name));
                }
                self.items.push(ModuleItem::Statement(statement));
            }
            ExportDeclaration::DefaultFunction(function) => {
                let declaration = FunctionDeclaration::wrap(cx, function)?;
                self.exported_names.push(Rc::from("default"));
                self.exports.push(ExportEntry::local(Rc::from("default"), declaration.bound_name()));
                self.items.push(ModuleItem::Statement(Statement::Function(declaration)));
            }
            ExportDeclaration::DefaultClass(class) => {
                let declaration = ClassDeclaration::wrap(cx, class, ExportPosition::Default)?;
                self.exported_names.extend(declaration.exported_names());
                self.exports.extend(declaration.export_entries());
                self.items.push(ModuleItem::Statement(Statement::Class(Box::new(declaration))));
            }
            ExportDeclaration::DefaultExpression(expr) => {
                let export = cx.node(span, |cx, info| {
                    Ok(ExportDefaultExpression {
                        info,
                        expression: Expression::wrap(cx, expr)?,
                    })
                })?;
                self.exported_names.push(Rc::from("default"));
                self.exports.push(ExportEntry::local(Rc::from("default"), Rc::from("*default*")));
                self.default_expression = true;
                self.items.push(ModuleItem::ExportDefault(export));
            }
        }
        Ok(())
    }
}

impl Module {
    /// ParseModule's static semantics over an already parsed program.
    pub fn wrap(realm: &Rc<Realm>, program: &syntax::Program, source: &str, _options: &SourceOptions) -> Result<Module, JSError> {
        let mut cx = Cx::new(realm, source, Context::STRICT | Context::MODULE);
        cx.node(program.span, |cx, info| {
            let mut collected = Collected::default();
            for statement in &program.body {
                match &statement.kind {
                    syntax::StatementKind::Import(declaration) => collected.import(declaration),
                    syntax::StatementKind::Export(declaration) => collected.export(cx, statement.span, declaration)?,
                    _ => collected.items.push(ModuleItem::Statement(Statement::wrap(cx, statement)?)),
                }
            }
            Module::from_collected(info, collected)
        })
    }

    fn from_collected(info: NodeInfo, collected: Collected) -> Result<Module, JSError> {
        let Collected {
            items,
            requests,
            imports,
            exports,
            exported_names,
            export_list_locals,
            default_expression,
        } = collected;

        let extra = if default_expression {
            vec![LexicalBinding {
                name: Rc::from("*default*"),
                constant: false,
            }]
        } else {
            Vec::new()
        };
        let statements = items.iter().filter_map(|item| match item {
            ModuleItem::Statement(statement) => Some(statement),
            ModuleItem::ExportDefault(_) => None,
        });
        let scope = Scope::analyze_with(statements, false, extra)?;

        for (index, name) in exported_names.iter().enumerate() {
            if exported_names[..index].contains(name) {
                return Err(raise_syntax_error!("Duplicate export of '{name}'"));
            }
        }

        let import_names: Vec<Rc<str>> = imports.iter().map(|entry| entry.local_name.clone()).collect();
        let mut declared = scope.lexically_declared_names();
        declared.extend(import_names.iter().cloned());
        check_duplicates(&declared)?;
        if let Some(name) = import_names.iter().find(|name| scope.var_names.contains(name)) {
            return Err(raise_syntax_error!("Identifier '{name}' has already been declared"));
        }
        for local in &export_list_locals {
            if !declared.contains(local) && !scope.var_names.contains(local) {
                return Err(raise_syntax_error!("Export '{local}' is not defined in module"));
            }
        }

        let mut local_export_entries = Vec::new();
        let mut indirect_export_entries = Vec::new();
        let mut star_export_entries = Vec::new();
        for entry in exports {
            match (&entry.module_request, &entry.import_name, &entry.local_name) {
                (None, _, Some(local_name)) => {
                    match imports.iter().find(|import| &import.local_name == local_name) {
                        Some(ImportEntry {
                            import_name: ImportName::Name(import_name),
                            module_request,
                            ..
                        }) => indirect_export_entries.push(ExportEntry::indirect(
                            entry.export_name.clone(),
                            module_request.clone(),
                            ExportImportName::Name(import_name.clone()),
                        )),
                        // re-export of an imported namespace object stays local
                        _ => local_export_entries.push(entry),
                    }
                }
                (Some(_), Some(ExportImportName::AllButDefault), _) => star_export_entries.push(entry),
                _ => indirect_export_entries.push(entry),
            }
        }

        Ok(Module {
            info,
            items,
            scope,
            requested_modules: requests,
            import_entries: imports,
            local_export_entries,
            indirect_export_entries,
            star_export_entries,
        })
    }

    /// The declaration part of InitializeEnvironment, run in the module's execution context.
    pub fn instantiate_declarations(&self, agent: &mut Agent, env: &Environment) -> Completion<()> {
        log_evaluate!("Module", self.info, agent);
        for name in &self.scope.var_names {
            if !env.has_binding(agent, name)? {
                env.create_mutable_binding(agent, name, false)?;
                env.initialize_binding(agent, name, Value::Undefined)?;
            }
        }
        self.scope.instantiate_block(agent, env)
    }

    /// Module evaluation: the body's items in order.
    pub fn evaluate(&self, agent: &mut Agent) -> Completion<Option<Value>> {
        log_evaluate!("Module", self.info, agent);
        let mut last = None;
        for item in &self.items {
            match item.evaluate(agent) {
                Ok(Some(value)) => last = Some(value),
                Ok(None) => {}
                Err(abrupt) => return Err(abrupt.update_empty(last)),
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod modules_tests {
    use super::*;
    use crate::syntax::parse_module;

    fn wrap(source: &str) -> Result<Module, JSError> {
        let realm = Realm::new();
        let program = parse_module(source)?;
        Module::wrap(&realm, &program, source, &SourceOptions::module("test"))
    }

    #[test]
    fn test_import_entries() {
        let module = wrap("import d, { a, b as c } from 'x'; import * as ns from 'y'; import 'x';").unwrap();
        assert_eq!(module.requested_modules, vec![Rc::from("x"), Rc::from("y")]);
        let entries: Vec<(&str, ImportName, &str)> = module
            .import_entries
            .iter()
            .map(|entry| (&*entry.module_request, entry.import_name.clone(), &*entry.local_name))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("x", ImportName::Name(Rc::from("default")), "d"),
                ("x", ImportName::Name(Rc::from("a")), "a"),
                ("x", ImportName::Name(Rc::from("b")), "c"),
                ("y", ImportName::NamespaceObject, "ns"),
            ]
        );
    }

    #[test]
    fn test_import_local_names_are_declared() {
        // renamed locals, not the imported names, occupy the module scope
        assert!(wrap("import { a as b } from 'x'; export { b };").is_ok());
        assert!(wrap("import { a as b } from 'x'; export { a };").is_err());
        assert!(wrap("import { a as b } from 'x'; let b;").is_err());
        assert!(wrap("import d from 'x'; import * as d from 'y';").is_err());
        assert!(wrap("import { a as b } from 'x'; var b;").is_err());
    }

    #[test]
    fn test_export_entry_classification() {
        let module = wrap(
            "import { a } from 'x'; import * as ns from 'y';
             export { a, ns };
             export { b as c } from 'z';
             export * from 'w';
             export * as all from 'v';
             export const k = 1;
             export default function () {}",
        )
        .unwrap();
        let local: Vec<(Option<&str>, Option<&str>)> = module
            .local_export_entries
            .iter()
            .map(|entry| (entry.export_name.as_deref(), entry.local_name.as_deref()))
            .collect();
        assert_eq!(local, vec![(Some("ns"), Some("ns")), (Some("k"), Some("k")), (Some("default"), Some("*default*"))]);

        let indirect: Vec<(Option<&str>, Option<&str>, Option<ExportImportName>)> = module
            .indirect_export_entries
            .iter()
            .map(|entry| (entry.export_name.as_deref(), entry.module_request.as_deref(), entry.import_name.clone()))
            .collect();
        assert_eq!(
            indirect,
            vec![
                (Some("a"), Some("x"), Some(ExportImportName::Name(Rc::from("a")))),
                (Some("c"), Some("z"), Some(ExportImportName::Name(Rc::from("b")))),
                (Some("all"), Some("v"), Some(ExportImportName::All)),
            ]
        );
        assert_eq!(module.star_export_entries.len(), 1);
        assert_eq!(module.star_export_entries[0].module_request.as_deref(), Some("w"));
        assert_eq!(module.requested_modules.len(), 5);
    }

    #[test]
    fn test_module_scope() {
        let module = wrap("var v; let l; function f() {} class C {} export default 1;").unwrap();
        let var_names: Vec<&str> = module.scope.var_names.iter().map(|name| &**name).collect();
        assert_eq!(var_names, vec!["v"]);
        let mut lexical: Vec<String> = module.scope.lexically_declared_names().iter().map(|name| name.to_string()).collect();
        lexical.sort();
        assert_eq!(lexical, vec!["*default*", "C", "f", "l"]);
    }

    #[test]
    fn test_module_early_errors() {
        assert!(wrap("export const a = 1; export { a };").is_err());
        assert!(wrap("export default 1; export default 2;").is_err());
        assert!(wrap("export { missing };").is_err());
        assert!(wrap("import { a } from 'x'; let a;").is_err());
        assert!(wrap("import { a } from 'x'; var a;").is_err());
        assert!(wrap("function f() {} var f;").is_err());
        assert!(wrap("return;").is_err());
        assert!(wrap("with (a) {}").is_err());
        assert!(wrap("var x; export { x as y, x as z };").is_ok());
    }
}
