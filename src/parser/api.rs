use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, BlockStatementData, CatchClauseData, ExpressionType,
    FunctionData, IdentifierData, JsError, JsErrorType, LiteralData, LiteralOrIdentifier,
    LiteralType, LogicalOperator, Meta, NumberLiteralType, ProgramData, PropertyData,
    StatementType, UnaryOperator, UpdateOperator, VariableDeclarationData,
    VariableDeclarationKind, VariableDeclarationOrExpression, VariableDeclaratorData,
};
use crate::parser::util::{spaces, TAB_WIDTH};
use lazy_static::lazy_static;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Parser)]
#[grammar = "parser/js_grammar.pest"] // relative to src
pub struct JsParser;

pub type JsRuleError = JsError<Rule>;

lazy_static! {
    static ref BINARY_OPERATORS: HashMap<&'static str, BinaryOperator> = {
        let mut m = HashMap::new();
        m.insert("+", BinaryOperator::Add);
        m.insert("-", BinaryOperator::Subtract);
        m.insert("*", BinaryOperator::Multiply);
        m.insert("/", BinaryOperator::Divide);
        m.insert("%", BinaryOperator::Modulo);
        m.insert("<", BinaryOperator::LessThan);
        m.insert(">", BinaryOperator::GreaterThan);
        m.insert("<=", BinaryOperator::LessThanEqual);
        m.insert(">=", BinaryOperator::GreaterThanEqual);
        m.insert("==", BinaryOperator::LooselyEqual);
        m.insert("!=", BinaryOperator::LooselyUnequal);
        m.insert("===", BinaryOperator::StrictlyEqual);
        m.insert("!==", BinaryOperator::StrictlyUnequal);
        m.insert("&", BinaryOperator::BitwiseAnd);
        m.insert("|", BinaryOperator::BitwiseOr);
        m.insert("^", BinaryOperator::BitwiseXor);
        m.insert("<<", BinaryOperator::BitwiseLeftShift);
        m.insert(">>", BinaryOperator::BitwiseRightShift);
        m.insert(">>>", BinaryOperator::BitwiseUnsignedRightShift);
        m
    };
    static ref ASSIGNMENT_OPERATORS: HashMap<&'static str, AssignmentOperator> = {
        let mut m = HashMap::new();
        m.insert("=", AssignmentOperator::Equals);
        m.insert("+=", AssignmentOperator::AddEquals);
        m.insert("-=", AssignmentOperator::SubtractEquals);
        m.insert("*=", AssignmentOperator::MultiplyEquals);
        m.insert("/=", AssignmentOperator::DivideEquals);
        m.insert("%=", AssignmentOperator::ModuloEquals);
        m.insert("<<=", AssignmentOperator::BitwiseLeftShiftEquals);
        m.insert(">>=", AssignmentOperator::BitwiseRightShiftEquals);
        m.insert(">>>=", AssignmentOperator::BitwiseUnsignedRightShiftEquals);
        m.insert("|=", AssignmentOperator::BitwiseOrEquals);
        m.insert("^=", AssignmentOperator::BitwiseXorEquals);
        m.insert("&=", AssignmentOperator::BitwiseAndEquals);
        m
    };
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    let rule_name = format!(
        "{:?} => ({},{}) #{:?}",
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    );
    tree.push(format!("{}{}", spaces(level * TAB_WIDTH), rule_name));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}

impl JsParser {
    /// Debug helper: parse and render the raw token tree.
    pub fn parse_to_token_tree(script: &str) -> Result<String, String> {
        let mut tree = vec![];
        match Self::parse(Rule::script, script) {
            Ok(pairs) => {
                for pair in pairs {
                    tree.push(pair_to_string(pair, 0).join("\n"));
                }
            }
            Err(err) => {
                return Err(format!("Parse error due to {:?}", err));
            }
        }
        Ok(tree.join("\n"))
    }

    pub fn parse_to_ast(script: Rc<String>) -> Result<ProgramData, JsRuleError> {
        match Self::parse(Rule::script, &script) {
            Ok(pairs) => build_ast_from_script(pairs, &script),
            Err(err) => Err(JsRuleError {
                kind: JsErrorType::ParserValidation(err.clone()),
                message: format!("Parse error due to \n{}", err),
            }),
        }
    }

    pub fn parse_to_ast_from_str(script: &str) -> Result<ProgramData, JsRuleError> {
        Self::parse_to_ast(Rc::new(script.to_string()))
    }
}

fn get_unexpected_error(src: &'static str, pair: &Pair<Rule>) -> JsRuleError {
    let message = format!(
        "Unexpected state reached in the parser at \"{:?}\". This indicates internal logic error in the parser.",
        pair.as_rule()
    );
    JsRuleError {
        message,
        kind: JsErrorType::Unexpected(src),
    }
}

fn get_validation_error(error: String, meta: Meta) -> JsRuleError {
    JsRuleError {
        message: format!("Parsing error encountered: {}", error),
        kind: JsErrorType::AstBuilderValidation(meta),
    }
}

fn get_meta(pair: &Pair<Rule>, script: &Rc<String>) -> Meta {
    Meta {
        start_index: pair.as_span().start(),
        end_index: pair.as_span().end(),
        script: script.clone(),
    }
}

fn next_pair<'i>(
    pairs: &mut Pairs<'i, Rule>,
    src: &'static str,
) -> Result<Pair<'i, Rule>, JsRuleError> {
    pairs.next().ok_or_else(|| JsRuleError {
        kind: JsErrorType::Unexpected(src),
        message: format!("A required token is missing in {}", src),
    })
}

fn build_ast_from_script(
    pairs: Pairs<Rule>,
    script: &Rc<String>,
) -> Result<ProgramData, JsRuleError> {
    let mut body = vec![];
    let mut end: usize = 0;
    for pair in pairs {
        match pair.as_rule() {
            Rule::script => {
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::statement => {
                            let meta = get_meta(&inner, script);
                            if meta.end_index > end {
                                end = meta.end_index;
                            }
                            body.push(build_ast_from_statement(inner, script)?);
                        }
                        Rule::EOI => { /* Do nothing */ }
                        _ => return Err(get_unexpected_error("build_ast_from_script", &inner)),
                    }
                }
            }
            _ => return Err(get_unexpected_error("build_ast_from_script:top", &pair)),
        }
    }
    Ok(ProgramData {
        meta: Meta {
            start_index: 0,
            end_index: end,
            script: script.clone(),
        },
        body,
    })
}

fn build_ast_from_statement(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<StatementType, JsRuleError> {
    let mut outer = pair.into_inner();
    let pair = next_pair(&mut outer, "build_ast_from_statement")?;
    let meta = get_meta(&pair, script);
    Ok(match pair.as_rule() {
        Rule::block_statement => {
            StatementType::BlockStatement(build_ast_from_block_statement(pair, script)?)
        }
        Rule::empty_statement => StatementType::EmptyStatement { meta },
        Rule::variable_declaration | Rule::variable_declaration_no_semi => {
            StatementType::VariableDeclaration(build_ast_from_variable_declaration(pair, script)?)
        }
        Rule::function_declaration => {
            let f = build_ast_from_function(pair, script)?;
            if f.id.is_none() {
                return Err(get_validation_error(
                    "A function declaration must be named".to_string(),
                    meta,
                ));
            }
            StatementType::FunctionDeclaration(f)
        }
        Rule::if_statement => build_ast_from_if_statement(pair, script)?,
        Rule::while_statement => {
            let mut inner = pair.into_inner();
            next_pair(&mut inner, "while_statement")?; // while keyword
            let test =
                build_ast_from_expression(next_pair(&mut inner, "while_statement")?, script)?;
            let body =
                build_ast_from_statement(next_pair(&mut inner, "while_statement")?, script)?;
            StatementType::WhileStatement {
                meta,
                test,
                body: Box::new(body),
            }
        }
        Rule::do_while_statement => {
            let mut inner = pair.into_inner();
            next_pair(&mut inner, "do_while_statement")?; // do keyword
            let body =
                build_ast_from_statement(next_pair(&mut inner, "do_while_statement")?, script)?;
            next_pair(&mut inner, "do_while_statement")?; // while keyword
            let test =
                build_ast_from_expression(next_pair(&mut inner, "do_while_statement")?, script)?;
            StatementType::DoWhileStatement {
                meta,
                test,
                body: Box::new(body),
            }
        }
        Rule::for_statement => build_ast_from_for_statement(pair, script)?,
        Rule::try_statement => build_ast_from_try_statement(pair, script)?,
        Rule::throw_statement => {
            let mut inner = pair.into_inner();
            next_pair(&mut inner, "throw_statement")?; // throw keyword
            let argument =
                build_ast_from_expression(next_pair(&mut inner, "throw_statement")?, script)?;
            StatementType::ThrowStatement { meta, argument }
        }
        Rule::return_statement => {
            let mut argument = None;
            for p in pair.into_inner() {
                if p.as_rule() == Rule::expression {
                    argument = Some(build_ast_from_expression(p, script)?);
                }
            }
            StatementType::ReturnStatement { meta, argument }
        }
        Rule::break_statement => {
            let mut label = None;
            for p in pair.into_inner() {
                if p.as_rule() == Rule::identifier {
                    label = Some(build_identifier(p, script));
                }
            }
            StatementType::BreakStatement { meta, label }
        }
        Rule::continue_statement => {
            let mut label = None;
            for p in pair.into_inner() {
                if p.as_rule() == Rule::identifier {
                    label = Some(build_identifier(p, script));
                }
            }
            StatementType::ContinueStatement { meta, label }
        }
        Rule::labeled_statement => {
            let mut inner = pair.into_inner();
            let label = build_identifier(next_pair(&mut inner, "labeled_statement")?, script);
            let body =
                build_ast_from_statement(next_pair(&mut inner, "labeled_statement")?, script)?;
            StatementType::LabeledStatement {
                meta,
                label,
                body: Box::new(body),
            }
        }
        Rule::expression_statement => {
            let mut inner = pair.into_inner();
            let expression =
                build_ast_from_expression(next_pair(&mut inner, "expression_statement")?, script)?;
            StatementType::ExpressionStatement { meta, expression }
        }
        _ => return Err(get_unexpected_error("build_ast_from_statement", &pair)),
    })
}

fn build_ast_from_block_statement(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<BlockStatementData, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut body = vec![];
    for inner in pair.into_inner() {
        body.push(build_ast_from_statement(inner, script)?);
    }
    Ok(BlockStatementData { meta, body })
}

fn build_ast_from_variable_declaration(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<VariableDeclarationData, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut declarations = vec![];
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::var_kw => {}
            Rule::variable_declarator => {
                let d_meta = get_meta(&p, script);
                let mut inner = p.into_inner();
                let id = build_identifier(next_pair(&mut inner, "variable_declarator")?, script);
                let init = match inner.next() {
                    Some(init_pair) => Some(build_ast_from_expression(init_pair, script)?),
                    None => None,
                };
                declarations.push(VariableDeclaratorData {
                    meta: d_meta,
                    id,
                    init,
                });
            }
            _ => return Err(get_unexpected_error("build_ast_from_variable_declaration", &p)),
        }
    }
    Ok(VariableDeclarationData {
        meta,
        kind: VariableDeclarationKind::Var,
        declarations,
    })
}

fn build_ast_from_function(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<FunctionData, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut id = None;
    let mut params = vec![];
    let mut body = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::function_kw => {}
            Rule::identifier => id = Some(build_identifier(p, script)),
            Rule::formal_parameters => {
                for param in p.into_inner() {
                    params.push(build_identifier(param, script));
                }
            }
            Rule::block_statement => body = Some(build_ast_from_block_statement(p, script)?),
            _ => return Err(get_unexpected_error("build_ast_from_function", &p)),
        }
    }
    match body {
        Some(body) => Ok(FunctionData {
            meta,
            id,
            params,
            body,
        }),
        None => Err(JsRuleError {
            kind: JsErrorType::Unexpected("build_ast_from_function"),
            message: "A function is missing its body".to_string(),
        }),
    }
}

fn build_ast_from_if_statement(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<StatementType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut test = None;
    let mut consequent = None;
    let mut alternate = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::if_kw | Rule::else_kw => {}
            Rule::expression => test = Some(build_ast_from_expression(p, script)?),
            Rule::statement => {
                let stmt = Box::new(build_ast_from_statement(p, script)?);
                if consequent.is_none() {
                    consequent = Some(stmt);
                } else {
                    alternate = Some(stmt);
                }
            }
            _ => return Err(get_unexpected_error("build_ast_from_if_statement", &p)),
        }
    }
    match (test, consequent) {
        (Some(test), Some(consequent)) => Ok(StatementType::IfStatement {
            meta,
            test,
            consequent,
            alternate,
        }),
        _ => Err(JsRuleError {
            kind: JsErrorType::Unexpected("build_ast_from_if_statement"),
            message: "An if statement is missing its test or consequent".to_string(),
        }),
    }
}

fn build_ast_from_for_statement(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<StatementType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::for_kw => {}
            Rule::for_init => {
                let mut inner = p.into_inner();
                let ip = next_pair(&mut inner, "for_init")?;
                init = Some(match ip.as_rule() {
                    Rule::variable_declaration_no_semi => {
                        VariableDeclarationOrExpression::VariableDeclaration(
                            build_ast_from_variable_declaration(ip, script)?,
                        )
                    }
                    Rule::expression => VariableDeclarationOrExpression::Expression(
                        build_ast_from_expression(ip, script)?,
                    ),
                    _ => return Err(get_unexpected_error("build_ast_from_for_statement", &ip)),
                });
            }
            Rule::for_test => {
                let mut inner = p.into_inner();
                test = Some(build_ast_from_expression(
                    next_pair(&mut inner, "for_test")?,
                    script,
                )?);
            }
            Rule::for_update => {
                let mut inner = p.into_inner();
                update = Some(build_ast_from_expression(
                    next_pair(&mut inner, "for_update")?,
                    script,
                )?);
            }
            Rule::statement => body = Some(Box::new(build_ast_from_statement(p, script)?)),
            _ => return Err(get_unexpected_error("build_ast_from_for_statement", &p)),
        }
    }
    match body {
        Some(body) => Ok(StatementType::ForStatement {
            meta,
            init,
            test,
            update,
            body,
        }),
        None => Err(JsRuleError {
            kind: JsErrorType::Unexpected("build_ast_from_for_statement"),
            message: "A for statement is missing its body".to_string(),
        }),
    }
}

fn build_ast_from_try_statement(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<StatementType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut block = None;
    let mut handler = None;
    let mut finalizer = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::try_kw => {}
            Rule::block_statement => block = Some(build_ast_from_block_statement(p, script)?),
            Rule::catch_clause => {
                let c_meta = get_meta(&p, script);
                let mut param = None;
                let mut body = None;
                for cp in p.into_inner() {
                    match cp.as_rule() {
                        Rule::catch_kw => {}
                        Rule::identifier => param = Some(build_identifier(cp, script)),
                        Rule::block_statement => {
                            body = Some(build_ast_from_block_statement(cp, script)?)
                        }
                        _ => {
                            return Err(get_unexpected_error("build_ast_from_try_statement", &cp))
                        }
                    }
                }
                match (param, body) {
                    (Some(param), Some(body)) => {
                        handler = Some(CatchClauseData {
                            meta: c_meta,
                            param,
                            body,
                        })
                    }
                    _ => {
                        return Err(JsRuleError {
                            kind: JsErrorType::Unexpected("build_ast_from_try_statement"),
                            message: "A catch clause is missing its parameter or body".to_string(),
                        })
                    }
                }
            }
            Rule::finally_clause => {
                let mut inner = p.into_inner();
                next_pair(&mut inner, "finally_clause")?; // finally keyword
                finalizer = Some(build_ast_from_block_statement(
                    next_pair(&mut inner, "finally_clause")?,
                    script,
                )?);
            }
            _ => return Err(get_unexpected_error("build_ast_from_try_statement", &p)),
        }
    }
    if handler.is_none() && finalizer.is_none() {
        return Err(get_validation_error(
            "A try statement needs a catch clause, a finally clause or both".to_string(),
            meta,
        ));
    }
    match block {
        Some(block) => Ok(StatementType::TryStatement {
            meta,
            block,
            handler,
            finalizer,
        }),
        None => Err(JsRuleError {
            kind: JsErrorType::Unexpected("build_ast_from_try_statement"),
            message: "A try statement is missing its block".to_string(),
        }),
    }
}

/// Build an expression from any of the expression-level rules. Single-child
/// precedence levels collapse to their operand so the AST carries no
/// degenerate chain nodes.
fn build_ast_from_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    match pair.as_rule() {
        Rule::expression => build_ast_from_sequence_expression(pair, script),
        Rule::assignment_expression => build_ast_from_assignment_expression(pair, script),
        Rule::conditional_expression => build_ast_from_conditional_expression(pair, script),
        Rule::logical_or_expression | Rule::logical_and_expression => {
            build_ast_from_logical_chain(pair, script)
        }
        Rule::bitwise_or_expression
        | Rule::bitwise_xor_expression
        | Rule::bitwise_and_expression
        | Rule::equality_expression
        | Rule::relational_expression
        | Rule::shift_expression
        | Rule::additive_expression
        | Rule::multiplicative_expression => build_ast_from_binary_chain(pair, script),
        Rule::unary_expression => build_ast_from_unary_expression(pair, script),
        Rule::update_expression => build_ast_from_update_expression(pair, script),
        Rule::postfix_expression => build_ast_from_postfix_expression(pair, script),
        Rule::left_hand_side_expression => build_ast_from_left_hand_side_expression(pair, script),
        Rule::primary_expression => {
            let mut inner = pair.into_inner();
            build_ast_from_expression(next_pair(&mut inner, "primary_expression")?, script)
        }
        Rule::paren_expression => {
            let mut inner = pair.into_inner();
            build_ast_from_expression(next_pair(&mut inner, "paren_expression")?, script)
        }
        Rule::literal => Ok(ExpressionType::Literal(build_ast_from_literal(
            pair, script,
        )?)),
        Rule::identifier => Ok(ExpressionType::Identifier(build_identifier(pair, script))),
        Rule::object_literal => build_ast_from_object_literal(pair, script),
        Rule::function_expression => Ok(ExpressionType::FunctionExpression(
            build_ast_from_function(pair, script)?,
        )),
        _ => Err(get_unexpected_error("build_ast_from_expression", &pair)),
    }
}

fn build_ast_from_sequence_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut expressions = vec![];
    for p in pair.into_inner() {
        expressions.push(build_ast_from_expression(p, script)?);
    }
    if expressions.len() == 1 {
        return Ok(expressions.remove(0));
    }
    Ok(ExpressionType::SequenceExpression {
        meta,
        expressions: expressions.into_iter().map(Box::new).collect(),
    })
}

fn build_ast_from_assignment_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let left = build_ast_from_expression(next_pair(&mut inner, "assignment_expression")?, script)?;
    match inner.next() {
        None => Ok(left),
        Some(op_pair) => {
            let operator = match ASSIGNMENT_OPERATORS.get(op_pair.as_str()) {
                Some(op) => *op,
                None => {
                    return Err(get_unexpected_error(
                        "build_ast_from_assignment_expression",
                        &op_pair,
                    ))
                }
            };
            if !left.is_simple_assignment_target() {
                return Err(get_validation_error(
                    "Invalid left-hand side in assignment".to_string(),
                    meta,
                ));
            }
            let right =
                build_ast_from_expression(next_pair(&mut inner, "assignment_expression")?, script)?;
            Ok(ExpressionType::AssignmentExpression {
                meta,
                operator,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
    }
}

fn build_ast_from_conditional_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let test = build_ast_from_expression(next_pair(&mut inner, "conditional_expression")?, script)?;
    match inner.next() {
        None => Ok(test),
        Some(consequent_pair) => {
            let consequent = build_ast_from_expression(consequent_pair, script)?;
            let alternate = build_ast_from_expression(
                next_pair(&mut inner, "conditional_expression")?,
                script,
            )?;
            Ok(ExpressionType::ConditionalExpression {
                meta,
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            })
        }
    }
}

fn build_ast_from_logical_chain(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let mut expr = build_ast_from_expression(next_pair(&mut inner, "logical_chain")?, script)?;
    while let Some(op_pair) = inner.next() {
        let operator = match op_pair.as_rule() {
            Rule::logical_or_operator => LogicalOperator::Or,
            Rule::logical_and_operator => LogicalOperator::And,
            _ => return Err(get_unexpected_error("build_ast_from_logical_chain", &op_pair)),
        };
        let right = build_ast_from_expression(next_pair(&mut inner, "logical_chain")?, script)?;
        expr = ExpressionType::LogicalExpression {
            meta: meta.clone(),
            operator,
            left: Box::new(expr),
            right: Box::new(right),
        };
    }
    Ok(expr)
}

fn build_ast_from_binary_chain(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let mut expr = build_ast_from_expression(next_pair(&mut inner, "binary_chain")?, script)?;
    while let Some(op_pair) = inner.next() {
        let operator = match BINARY_OPERATORS.get(op_pair.as_str()) {
            Some(op) => *op,
            None => return Err(get_unexpected_error("build_ast_from_binary_chain", &op_pair)),
        };
        let right = build_ast_from_expression(next_pair(&mut inner, "binary_chain")?, script)?;
        expr = ExpressionType::BinaryExpression {
            meta: meta.clone(),
            operator,
            left: Box::new(expr),
            right: Box::new(right),
        };
    }
    Ok(expr)
}

fn build_ast_from_unary_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let first = next_pair(&mut inner, "unary_expression")?;
    if first.as_rule() != Rule::unary_operator {
        return build_ast_from_expression(first, script);
    }
    let mut op_inner = first.into_inner();
    let op_pair = next_pair(&mut op_inner, "unary_operator")?;
    let operator = match op_pair.as_rule() {
        Rule::typeof_kw => UnaryOperator::TypeOf,
        Rule::void_kw => UnaryOperator::Void,
        Rule::logical_not_op => UnaryOperator::LogicalNot,
        Rule::bitwise_not_op => UnaryOperator::BitwiseNot,
        Rule::unary_plus_op => UnaryOperator::Plus,
        Rule::unary_minus_op => UnaryOperator::Minus,
        _ => return Err(get_unexpected_error("build_ast_from_unary_expression", &op_pair)),
    };
    let argument =
        build_ast_from_expression(next_pair(&mut inner, "unary_expression")?, script)?;
    Ok(ExpressionType::UnaryExpression {
        meta,
        operator,
        argument: Box::new(argument),
    })
}

fn build_update_operator(pair: &Pair<Rule>) -> UpdateOperator {
    if pair.as_str() == "++" {
        UpdateOperator::PlusPlus
    } else {
        UpdateOperator::MinusMinus
    }
}

fn build_ast_from_update_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let op_pair = next_pair(&mut inner, "update_expression")?;
    let operator = build_update_operator(&op_pair);
    let argument =
        build_ast_from_expression(next_pair(&mut inner, "update_expression")?, script)?;
    if !argument.is_simple_assignment_target() {
        return Err(get_validation_error(
            "Invalid operand in a prefix update expression".to_string(),
            meta,
        ));
    }
    Ok(ExpressionType::UpdateExpression {
        meta,
        operator,
        prefix: true,
        argument: Box::new(argument),
    })
}

fn build_ast_from_postfix_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let expr = build_ast_from_expression(next_pair(&mut inner, "postfix_expression")?, script)?;
    match inner.next() {
        None => Ok(expr),
        Some(op_pair) => {
            let operator = build_update_operator(&op_pair);
            if !expr.is_simple_assignment_target() {
                return Err(get_validation_error(
                    "Invalid operand in a postfix update expression".to_string(),
                    meta,
                ));
            }
            Ok(ExpressionType::UpdateExpression {
                meta,
                operator,
                prefix: false,
                argument: Box::new(expr),
            })
        }
    }
}

fn build_ast_from_left_hand_side_expression(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let mut inner = pair.into_inner();
    let mut expr =
        build_ast_from_expression(next_pair(&mut inner, "left_hand_side_expression")?, script)?;
    for suffix in inner {
        let meta = get_meta(&suffix, script);
        let mut suffix_inner = suffix.into_inner();
        let s = next_pair(&mut suffix_inner, "member_or_call")?;
        expr = match s.as_rule() {
            Rule::call_arguments => {
                let mut arguments = vec![];
                for arg in s.into_inner() {
                    arguments.push(Box::new(build_ast_from_expression(arg, script)?));
                }
                ExpressionType::CallExpression {
                    meta,
                    callee: Box::new(expr),
                    arguments,
                }
            }
            Rule::computed_member => {
                let mut m_inner = s.into_inner();
                let property =
                    build_ast_from_expression(next_pair(&mut m_inner, "computed_member")?, script)?;
                ExpressionType::MemberExpression {
                    meta,
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: true,
                }
            }
            Rule::static_member => {
                let mut m_inner = s.into_inner();
                let property = ExpressionType::Identifier(build_identifier(
                    next_pair(&mut m_inner, "static_member")?,
                    script,
                ));
                ExpressionType::MemberExpression {
                    meta,
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: false,
                }
            }
            _ => {
                return Err(get_unexpected_error(
                    "build_ast_from_left_hand_side_expression",
                    &s,
                ))
            }
        };
    }
    Ok(expr)
}

fn build_ast_from_object_literal(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<ExpressionType, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut properties = vec![];
    for p in pair.into_inner() {
        let p_meta = get_meta(&p, script);
        let mut inner = p.into_inner();
        let key_pair = next_pair(&mut inner, "property_assignment")?;
        let mut key_inner = key_pair.into_inner();
        let k = next_pair(&mut key_inner, "property_key")?;
        let key = match k.as_rule() {
            Rule::identifier => LiteralOrIdentifier::Identifier(build_identifier(k, script)),
            Rule::string => LiteralOrIdentifier::Literal(LiteralData {
                meta: get_meta(&k, script),
                value: LiteralType::StringLiteral(unescape_string_literal(k.as_str())),
            }),
            Rule::number => LiteralOrIdentifier::Literal(LiteralData {
                meta: get_meta(&k, script),
                value: LiteralType::NumberLiteral(parse_number_literal(k.as_str())),
            }),
            _ => return Err(get_unexpected_error("build_ast_from_object_literal", &k)),
        };
        let value =
            build_ast_from_expression(next_pair(&mut inner, "property_assignment")?, script)?;
        properties.push(PropertyData {
            meta: p_meta,
            key,
            value,
        });
    }
    Ok(ExpressionType::ObjectExpression { meta, properties })
}

fn build_ast_from_literal(
    pair: Pair<Rule>,
    script: &Rc<String>,
) -> Result<LiteralData, JsRuleError> {
    let meta = get_meta(&pair, script);
    let mut inner = pair.into_inner();
    let p = next_pair(&mut inner, "build_ast_from_literal")?;
    let value = match p.as_rule() {
        Rule::null_literal => LiteralType::NullLiteral,
        Rule::boolean_literal => LiteralType::BooleanLiteral(p.as_str() == "true"),
        Rule::number => LiteralType::NumberLiteral(parse_number_literal(p.as_str())),
        Rule::string => LiteralType::StringLiteral(unescape_string_literal(p.as_str())),
        _ => return Err(get_unexpected_error("build_ast_from_literal", &p)),
    };
    Ok(LiteralData { meta, value })
}

fn build_identifier(pair: Pair<Rule>, script: &Rc<String>) -> IdentifierData {
    IdentifierData {
        meta: get_meta(&pair, script),
        name: pair.as_str().to_string(),
    }
}

fn parse_number_literal(s: &str) -> NumberLiteralType {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return match i64::from_str_radix(hex, 16) {
            Ok(i) => NumberLiteralType::IntegerLiteral(i),
            Err(_) => NumberLiteralType::FloatLiteral(
                hex.chars()
                    .fold(0f64, |acc, c| acc * 16.0 + c.to_digit(16).unwrap_or(0) as f64),
            ),
        };
    }
    if s.contains('.') || s.contains('e') || s.contains('E') {
        NumberLiteralType::FloatLiteral(s.parse().unwrap_or(f64::NAN))
    } else {
        match s.parse::<i64>() {
            Ok(i) => NumberLiteralType::IntegerLiteral(i),
            Err(_) => NumberLiteralType::FloatLiteral(s.parse().unwrap_or(f64::NAN)),
        }
    }
}

fn unescape_string_literal(raw: &str) -> String {
    let quoted = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('v') => out.push('\u{000B}'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
