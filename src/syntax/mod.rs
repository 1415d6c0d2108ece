//! Source text to raw syntax tree.
//!
//! The evaluator consumes a [`Program`] and never looks at tokens; anything that
//! produces these nodes can stand in for this front end.

mod node;
mod parser;
mod statement;
mod token;

pub use node::*;
pub use token::{TemplatePart, Token, TokenData, tokenize};

pub(crate) use parser::{
    TokenStream, expr_to_pattern, parse_assignment, parse_binding_target, parse_class_rest, parse_expression, parse_function_rest,
};
pub(crate) use statement::parse_function_body_statements;

use crate::JSError;

pub fn parse(source: &str, goal: Goal) -> Result<Program, JSError> {
    let tokens = tokenize(source)?;
    let mut ts = TokenStream::new(tokens);
    statement::parse_program(&mut ts, goal)
}

pub fn parse_script(source: &str) -> Result<Program, JSError> {
    parse(source, Goal::Script)
}

pub fn parse_module(source: &str) -> Result<Program, JSError> {
    parse(source, Goal::Module)
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    fn first_statement(source: &str) -> StatementKind {
        let program = parse_script(source).unwrap();
        program.body.into_iter().next().unwrap().kind
    }

    #[test]
    fn test_precedence() {
        let StatementKind::Expression(expr) = first_statement("1 + 2 * 3") else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary(BinaryOp::Add, _, right) = expr.kind else {
            panic!("expected addition at the root");
        };
        assert!(matches!(right.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let StatementKind::Expression(expr) = first_statement("2 ** 3 ** 2") else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary(BinaryOp::Exp, left, right) = expr.kind else {
            panic!("expected exponent");
        };
        assert!(matches!(left.kind, ExprKind::Number(n) if n == 2.0));
        assert!(matches!(right.kind, ExprKind::Binary(BinaryOp::Exp, _, _)));
    }

    #[test]
    fn test_arrow_detection() {
        let StatementKind::Variable(_, decls) = first_statement("let f = (a, b = 1, ...rest) => a;") else {
            panic!("expected variable declaration");
        };
        let Some(Expr {
            kind: ExprKind::Arrow(function),
            ..
        }) = &decls[0].init
        else {
            panic!("expected arrow function");
        };
        assert_eq!(function.params.len(), 3);
        assert!(function.params[2].rest);
        assert!(matches!(function.body, FunctionBodyNode::Expression(_)));
    }

    #[test]
    fn test_class_members() {
        let StatementKind::Class(class) = first_statement("class A extends B { constructor() {} static get x() { return 1 } y = 2; static; }")
        else {
            panic!("expected class");
        };
        assert_eq!(class.name.as_deref(), Some("A"));
        assert!(class.heritage.is_some());
        assert_eq!(class.members.len(), 4);
        assert!(matches!(&class.members[0], ClassMember::Method(m) if m.kind == MethodKind::Constructor));
        assert!(matches!(&class.members[1], ClassMember::Method(m) if m.kind == MethodKind::Getter && m.is_static));
        assert!(matches!(&class.members[2], ClassMember::Field { is_static: false, .. }));
        // `static;` is a field named "static"
        assert!(matches!(&class.members[3], ClassMember::Field { key: PropertyName::Identifier(n), .. } if n == "static"));
    }

    #[test]
    fn test_destructuring_assignment_target() {
        let StatementKind::Expression(expr) = first_statement("[a, { b = 2, c: d }, ...e] = x") else {
            panic!("expected expression statement");
        };
        let ExprKind::Assign { target, .. } = expr.kind else {
            panic!("expected assignment");
        };
        let Pattern::Array { elements, rest, .. } = *target else {
            panic!("expected array pattern");
        };
        assert_eq!(elements.len(), 2);
        assert!(rest.is_some());
    }

    #[test]
    fn test_asi_and_restricted_productions() {
        let program = parse_script("let a = 1\nlet b = 2").unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(parse_script("let a = 1 let b = 2").is_err());
        let program = parse_script("function f() { return\n1 }").unwrap();
        let StatementKind::Function(function) = &program.body[0].kind else {
            panic!("expected function");
        };
        let FunctionBodyNode::Block(body) = &function.body else {
            panic!("expected block body");
        };
        assert!(matches!(body[0].kind, StatementKind::Return(None)));
    }

    #[test]
    fn test_for_heads() {
        assert!(matches!(first_statement("for (let i = 0; i < 3; i++) {}"), StatementKind::For { .. }));
        assert!(matches!(first_statement("for (const k in o) {}"), StatementKind::ForIn(ForHead::Variable(..), ..)));
        assert!(matches!(first_statement("for ([a, b] of xs) {}"), StatementKind::ForOf(ForHead::Pattern(_), ..)));
        assert!(matches!(first_statement("for (var {x} of xs) {}"), StatementKind::ForOf(ForHead::Variable(..), ..)));
    }

    #[test]
    fn test_module_declarations() {
        let program = parse_module(
            r#"
            import d, { a as b, c } from "./m.js";
            import * as ns from "./n.js";
            export default class {}
            export { b as renamed };
            export * as all from "./o.js";
            export const x = 1;
            "#,
        )
        .unwrap();
        assert_eq!(program.body.len(), 6);
        let StatementKind::Import(import) = &program.body[0].kind else {
            panic!("expected import");
        };
        assert_eq!(import.specifiers.len(), 3);
        assert_eq!(import.module, "./m.js");
        assert!(matches!(&program.body[2].kind, StatementKind::Export(ExportDeclaration::DefaultClass(c)) if c.name.is_none()));
        assert!(matches!(
            &program.body[4].kind,
            StatementKind::Export(ExportDeclaration::All { alias: Some(a), .. }) if a == "all"
        ));
    }

    #[test]
    fn test_import_rejected_in_script() {
        assert!(parse_script("import x from 'y';").is_err());
        assert!(parse_module("{ export const x = 1; }").is_err());
    }

    #[test]
    fn test_template_substitutions() {
        let StatementKind::Expression(expr) = first_statement("`a${1 + 2}b${x}`") else {
            panic!("expected expression statement");
        };
        let ExprKind::Template { quasis, expressions } = expr.kind else {
            panic!("expected template");
        };
        assert_eq!(quasis, vec!["a".to_string(), "b".to_string(), String::new()]);
        assert_eq!(expressions.len(), 2);
    }

    #[test]
    fn test_nesting_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(parse_script(&deep), Err(JSError::ParseError { .. })));
        assert!(matches!(parse_script(&format!("{}0", "!".repeat(1000))), Err(JSError::ParseError { .. })));
        assert!(parse_script(&format!("{}{}", "{".repeat(300), "}".repeat(300))).is_err());

        let shallow = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert!(parse_script(&shallow).is_ok());
    }

    #[test]
    fn test_nesting_depth_is_released_between_siblings() {
        let source = "if (a) { (((b))); }\n".repeat(500);
        assert_eq!(parse_script(&source).unwrap().body.len(), 500);
    }
}
