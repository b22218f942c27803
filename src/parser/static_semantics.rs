//! Static semantics: declaration scanning.
//!
//! Before a program or function body runs, its scope is pre-populated with
//! every `var`-declared name and every function declaration visible in the
//! body. The scan recurses into nested statements but never into nested
//! function bodies, which hoist into their own scope.

use crate::parser::ast::{FunctionData, StatementType, VariableDeclarationOrExpression};

/// Names and function declarations hoisted from a statement list.
pub struct HoistedDeclarations<'a> {
    pub var_names: Vec<&'a str>,
    pub functions: Vec<&'a FunctionData>,
}

pub fn scan_statement_list<'a>(statements: &'a [StatementType]) -> HoistedDeclarations<'a> {
    let mut hoisted = HoistedDeclarations {
        var_names: vec![],
        functions: vec![],
    };
    for stmt in statements {
        scan_statement(&mut hoisted, stmt);
    }
    hoisted
}

fn scan_statement<'a>(hoisted: &mut HoistedDeclarations<'a>, stmt: &'a StatementType) {
    match stmt {
        StatementType::VariableDeclaration(var_decl) => {
            for declarator in &var_decl.declarations {
                hoisted.var_names.push(&declarator.id.name);
            }
        }
        StatementType::FunctionDeclaration(func) => {
            hoisted.functions.push(func);
        }
        StatementType::BlockStatement(block) => {
            for nested in &block.body {
                scan_statement(hoisted, nested);
            }
        }
        StatementType::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            scan_statement(hoisted, consequent);
            if let Some(alt) = alternate {
                scan_statement(hoisted, alt);
            }
        }
        StatementType::WhileStatement { body, .. }
        | StatementType::DoWhileStatement { body, .. }
        | StatementType::LabeledStatement { body, .. } => {
            scan_statement(hoisted, body);
        }
        StatementType::ForStatement { init, body, .. } => {
            if let Some(VariableDeclarationOrExpression::VariableDeclaration(var_decl)) = init {
                for declarator in &var_decl.declarations {
                    hoisted.var_names.push(&declarator.id.name);
                }
            }
            scan_statement(hoisted, body);
        }
        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            for nested in &block.body {
                scan_statement(hoisted, nested);
            }
            if let Some(h) = handler {
                for nested in &h.body.body {
                    scan_statement(hoisted, nested);
                }
            }
            if let Some(f) = finalizer {
                for nested in &f.body {
                    scan_statement(hoisted, nested);
                }
            }
        }
        _ => {}
    }
}
