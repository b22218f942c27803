//! Parser integration tests: source text to AST shape.

extern crate jstep;

use jstep::parser::ast::{
    AssignmentOperator, BinaryOperator, ExpressionType, LiteralOrIdentifier, LiteralType,
    LogicalOperator, NumberLiteralType, StatementType, UpdateOperator,
    VariableDeclarationKind,
};
use jstep::parser::JsParser;

fn parse_statements(code: &str) -> Vec<StatementType> {
    JsParser::parse_to_ast_from_str(code)
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {:?}", code, e))
        .body
}

fn parse_expression(code: &str) -> ExpressionType {
    let mut body = parse_statements(code);
    assert_eq!(body.len(), 1, "expected a single statement in {:?}", code);
    match body.remove(0) {
        StatementType::ExpressionStatement { expression, .. } => expression,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn test_variable_declaration_shape() {
    let body = parse_statements("var x = 5;");
    match &body[0] {
        StatementType::VariableDeclaration(decl) => {
            assert_eq!(decl.kind, VariableDeclarationKind::Var);
            assert_eq!(decl.declarations.len(), 1);
            assert_eq!(decl.declarations[0].id.name, "x");
            match &decl.declarations[0].init {
                Some(ExpressionType::Literal(lit)) => assert_eq!(
                    lit.value,
                    LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(5))
                ),
                other => panic!("unexpected initializer: {:?}", other),
            }
        }
        other => panic!("expected a variable declaration, got {:?}", other),
    }
}

#[test]
fn test_multi_declarator_declaration() {
    let body = parse_statements("var a = 1, b, c = 3;");
    match &body[0] {
        StatementType::VariableDeclaration(decl) => {
            assert_eq!(decl.declarations.len(), 3);
            assert_eq!(decl.declarations[1].id.name, "b");
            assert!(decl.declarations[1].init.is_none());
        }
        other => panic!("expected a variable declaration, got {:?}", other),
    }
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    match parse_expression("1 + 2 * 3;") {
        ExpressionType::BinaryExpression {
            operator, right, ..
        } => {
            assert_eq!(operator, BinaryOperator::Add);
            match *right {
                ExpressionType::BinaryExpression { operator, .. } => {
                    assert_eq!(operator, BinaryOperator::Multiply)
                }
                other => panic!("expected a nested multiplication, got {:?}", other),
            }
        }
        other => panic!("expected an addition, got {:?}", other),
    }
}

#[test]
fn test_binary_chain_folds_left_associative() {
    match parse_expression("10 - 4 - 3;") {
        ExpressionType::BinaryExpression { operator, left, .. } => {
            assert_eq!(operator, BinaryOperator::Subtract);
            assert!(matches!(
                *left,
                ExpressionType::BinaryExpression {
                    operator: BinaryOperator::Subtract,
                    ..
                }
            ));
        }
        other => panic!("expected a subtraction, got {:?}", other),
    }
}

#[test]
fn test_assignment_is_right_associative() {
    match parse_expression("a = b = 5;") {
        ExpressionType::AssignmentExpression {
            operator, right, ..
        } => {
            assert_eq!(operator, AssignmentOperator::Equals);
            assert!(matches!(*right, ExpressionType::AssignmentExpression { .. }));
        }
        other => panic!("expected an assignment, got {:?}", other),
    }
}

#[test]
fn test_every_compound_assignment_operator_parses() {
    let cases = [
        ("+=", AssignmentOperator::AddEquals),
        ("-=", AssignmentOperator::SubtractEquals),
        ("*=", AssignmentOperator::MultiplyEquals),
        ("/=", AssignmentOperator::DivideEquals),
        ("%=", AssignmentOperator::ModuloEquals),
        ("<<=", AssignmentOperator::BitwiseLeftShiftEquals),
        (">>=", AssignmentOperator::BitwiseRightShiftEquals),
        (">>>=", AssignmentOperator::BitwiseUnsignedRightShiftEquals),
        ("|=", AssignmentOperator::BitwiseOrEquals),
        ("^=", AssignmentOperator::BitwiseXorEquals),
        ("&=", AssignmentOperator::BitwiseAndEquals),
    ];
    for (text, expected) in cases {
        match parse_expression(&format!("a {} 1;", text)) {
            ExpressionType::AssignmentExpression { operator, .. } => {
                assert_eq!(operator, expected, "operator {:?}", text)
            }
            other => panic!("expected an assignment for {:?}, got {:?}", text, other),
        }
    }
}

#[test]
fn test_member_chain_nests_leftward() {
    match parse_expression("a.b.c;") {
        ExpressionType::MemberExpression {
            object, computed, ..
        } => {
            assert!(!computed);
            assert!(matches!(
                *object,
                ExpressionType::MemberExpression { computed: false, .. }
            ));
        }
        other => panic!("expected a member expression, got {:?}", other),
    }
}

#[test]
fn test_call_of_member_then_call_again() {
    match parse_expression("o.f(1)(2);") {
        ExpressionType::CallExpression {
            callee, arguments, ..
        } => {
            assert_eq!(arguments.len(), 1);
            match *callee {
                ExpressionType::CallExpression {
                    callee: ref inner, ..
                } => {
                    assert!(matches!(**inner, ExpressionType::MemberExpression { .. }))
                }
                ref other => panic!("expected a nested call, got {:?}", other),
            }
        }
        other => panic!("expected a call expression, got {:?}", other),
    }
}

#[test]
fn test_computed_member_uses_bracket_expression() {
    match parse_expression("a[b + 1];") {
        ExpressionType::MemberExpression {
            computed, property, ..
        } => {
            assert!(computed);
            assert!(matches!(*property, ExpressionType::BinaryExpression { .. }));
        }
        other => panic!("expected a member expression, got {:?}", other),
    }
}

#[test]
fn test_if_else_shape() {
    let body = parse_statements("if (x) { 1; } else if (y) { 2; } else { 3; }");
    match &body[0] {
        StatementType::IfStatement { alternate, .. } => match alternate.as_deref() {
            Some(StatementType::IfStatement { alternate, .. }) => {
                assert!(alternate.is_some())
            }
            other => panic!("expected a chained if, got {:?}", other),
        },
        other => panic!("expected an if statement, got {:?}", other),
    }
}

#[test]
fn test_while_and_do_while_shapes() {
    let body = parse_statements("while (a) b; do { c; } while (d);");
    assert!(matches!(&body[0], StatementType::WhileStatement { .. }));
    assert!(matches!(&body[1], StatementType::DoWhileStatement { .. }));
}

#[test]
fn test_for_statement_clauses() {
    let body = parse_statements("for (var i = 0; i < 10; i = i + 1) { }");
    match &body[0] {
        StatementType::ForStatement {
            init,
            test,
            update,
            ..
        } => {
            assert!(init.is_some());
            assert!(test.is_some());
            assert!(update.is_some());
        }
        other => panic!("expected a for statement, got {:?}", other),
    }
}

#[test]
fn test_for_statement_with_empty_clauses() {
    let body = parse_statements("for (;;) break;");
    match &body[0] {
        StatementType::ForStatement {
            init,
            test,
            update,
            body,
            ..
        } => {
            assert!(init.is_none());
            assert!(test.is_none());
            assert!(update.is_none());
            assert!(matches!(**body, StatementType::BreakStatement { .. }));
        }
        other => panic!("expected a for statement, got {:?}", other),
    }
}

#[test]
fn test_labeled_statement_shape() {
    let body = parse_statements("loop: while (true) break loop;");
    match &body[0] {
        StatementType::LabeledStatement { label, body, .. } => {
            assert_eq!(label.name, "loop");
            assert!(matches!(**body, StatementType::WhileStatement { .. }));
        }
        other => panic!("expected a labeled statement, got {:?}", other),
    }
}

#[test]
fn test_try_catch_finally_shape() {
    let body = parse_statements("try { a; } catch (e) { b; } finally { c; }");
    match &body[0] {
        StatementType::TryStatement {
            handler, finalizer, ..
        } => {
            assert_eq!(handler.as_ref().map(|h| h.param.name.as_str()), Some("e"));
            assert!(finalizer.is_some());
        }
        other => panic!("expected a try statement, got {:?}", other),
    }
}

#[test]
fn test_try_requires_catch_or_finally() {
    assert!(JsParser::parse_to_ast_from_str("try { a; }").is_err());
}

#[test]
fn test_object_literal_keys() {
    match parse_expression("x = {a: 1, 'b': 2, 3: 'x'};") {
        ExpressionType::AssignmentExpression { right, .. } => match *right {
            ExpressionType::ObjectExpression { ref properties, .. } => {
                assert_eq!(properties.len(), 3);
                assert!(matches!(
                    properties[0].key,
                    LiteralOrIdentifier::Identifier(_)
                ));
                assert!(matches!(properties[1].key, LiteralOrIdentifier::Literal(_)));
                assert!(matches!(properties[2].key, LiteralOrIdentifier::Literal(_)));
            }
            ref other => panic!("expected an object literal, got {:?}", other),
        },
        other => panic!("expected an assignment, got {:?}", other),
    }
}

#[test]
fn test_function_declaration_and_expression() {
    let body = parse_statements("function f(a, b) { return a; } var g = function (x) { };");
    match &body[0] {
        StatementType::FunctionDeclaration(f) => {
            assert_eq!(f.id.as_ref().map(|id| id.name.as_str()), Some("f"));
            assert_eq!(f.params.len(), 2);
        }
        other => panic!("expected a function declaration, got {:?}", other),
    }
    match &body[1] {
        StatementType::VariableDeclaration(decl) => {
            match &decl.declarations[0].init {
                Some(ExpressionType::FunctionExpression(f)) => {
                    assert!(f.id.is_none());
                    assert_eq!(f.params.len(), 1);
                }
                other => panic!("expected a function expression, got {:?}", other),
            }
        }
        other => panic!("expected a variable declaration, got {:?}", other),
    }
}

#[test]
fn test_sequence_expression_shape() {
    match parse_expression("1, 2, 3;") {
        ExpressionType::SequenceExpression { expressions, .. } => {
            assert_eq!(expressions.len(), 3)
        }
        other => panic!("expected a sequence expression, got {:?}", other),
    }
}

#[test]
fn test_update_expressions() {
    match parse_expression("++x;") {
        ExpressionType::UpdateExpression {
            operator, prefix, ..
        } => {
            assert_eq!(operator, UpdateOperator::PlusPlus);
            assert!(prefix);
        }
        other => panic!("expected an update expression, got {:?}", other),
    }
    match parse_expression("x--;") {
        ExpressionType::UpdateExpression {
            operator, prefix, ..
        } => {
            assert_eq!(operator, UpdateOperator::MinusMinus);
            assert!(!prefix);
        }
        other => panic!("expected an update expression, got {:?}", other),
    }
}

#[test]
fn test_logical_operators_build_logical_nodes() {
    match parse_expression("a && b || c;") {
        ExpressionType::LogicalExpression { operator, left, .. } => {
            assert_eq!(operator, LogicalOperator::Or);
            assert!(matches!(
                *left,
                ExpressionType::LogicalExpression {
                    operator: LogicalOperator::And,
                    ..
                }
            ));
        }
        other => panic!("expected a logical expression, got {:?}", other),
    }
}

#[test]
fn test_conditional_expression_shape() {
    assert!(matches!(
        parse_expression("a ? b : c;"),
        ExpressionType::ConditionalExpression { .. }
    ));
}

#[test]
fn test_string_escapes() {
    match parse_expression("'a\\nb';") {
        ExpressionType::Literal(lit) => {
            assert_eq!(lit.value, LiteralType::StringLiteral("a\nb".to_string()))
        }
        other => panic!("expected a string literal, got {:?}", other),
    }
}

#[test]
fn test_hex_and_float_literals() {
    match parse_expression("0xff;") {
        ExpressionType::Literal(lit) => assert_eq!(
            lit.value,
            LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(255))
        ),
        other => panic!("expected a number literal, got {:?}", other),
    }
    match parse_expression("1.5e2;") {
        ExpressionType::Literal(lit) => assert_eq!(
            lit.value,
            LiteralType::NumberLiteral(NumberLiteralType::FloatLiteral(150.0))
        ),
        other => panic!("expected a number literal, got {:?}", other),
    }
}

#[test]
fn test_comments_are_skipped() {
    let body = parse_statements("// leading\nvar x = 1; /* inline */ var y = 2;");
    assert_eq!(body.len(), 2);
}

#[test]
fn test_semicolons_are_optional_at_statement_end() {
    let body = parse_statements("var x = 1\nx");
    assert_eq!(body.len(), 2);
}

#[test]
fn test_invalid_assignment_target_is_rejected() {
    assert!(JsParser::parse_to_ast_from_str("1 = 2;").is_err());
    assert!(JsParser::parse_to_ast_from_str("5++;").is_err());
    assert!(JsParser::parse_to_ast_from_str("++5;").is_err());
}

#[test]
fn test_keywords_are_not_identifiers() {
    assert!(JsParser::parse_to_ast_from_str("var var = 1;").is_err());
    // Prefixes of keywords are ordinary identifiers.
    let body = parse_statements("var variable = 1; var ifx = 2;");
    assert_eq!(body.len(), 2);
}

#[test]
fn test_parse_to_token_tree_renders() {
    let tree = JsParser::parse_to_token_tree("var x = 1;").unwrap();
    assert!(tree.contains("variable_declaration"));
}
