//! The reified continuation machine.
//!
//! Every pending sub-evaluation is a heap-allocated [`State`]: one variant
//! per AST node kind, each holding its parent state, the scope it evaluates
//! under and its own progress fields. The driver repeatedly calls
//! [`State::step`], feeding each state the completion value produced by the
//! previous step; a state either spawns a child (returning it as the next
//! state) or finishes and returns its parent together with its completion
//! value. The parent chain is the interpreter's call stack, which is what
//! lets a host suspend, multiplex or resume execution between steps.
//!
//! `step` consumes the boxed state, so a completed state is gone; control
//! flow is parent-directed by construction and a state can never be
//! re-entered after it has handed control back.

use std::rc::Rc;

use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, BlockStatementData, CatchClauseData, ExpressionType,
    FunctionData, LiteralData, LiteralOrIdentifier, LiteralType, LogicalOperator,
    NumberLiteralType, ProgramData, PropertyData, StatementType, UnaryOperator, UpdateOperator,
    VariableDeclarationData, VariableDeclarationKind, VariableDeclarationOrExpression,
    VariableDeclaratorData,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{get_property, set_property, JsObjectData, JsObjectRef};
use crate::runner::ds::operations::operators::{binary_op, unary_op};
use crate::runner::ds::operations::type_conversion::{to_boolean, to_number, to_string};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::function::Closure;
use crate::runner::eval::scope::Scope;
use crate::runner::eval::types::{Completion, CompletionType};

/// What a step produced: the state to run next (`None` once the root has
/// completed and control is back at the driver sentinel) and the completion
/// value to feed it.
pub type StepResult<'a> = (Option<Box<State<'a>>>, Option<Completion<'a>>);

/// A reified computation frame for one AST node.
pub struct State<'a> {
    parent: Option<Box<State<'a>>>,
    scope: Rc<Scope<'a>>,
    labels: Vec<String>,
    kind: StateKind<'a>,
}

enum ForPhase {
    Init,
    Test,
    Body,
    Update,
}

enum StateKind<'a> {
    // Expressions
    Literal {
        value: JsValue<'a>,
    },
    Identifier {
        name: &'a str,
    },
    UnaryExpression {
        op: UnaryOperator,
        argument: &'a ExpressionType,
    },
    UpdateExpression {
        op: UpdateOperator,
        prefix: bool,
        arg: Lvalue<'a>,
    },
    BinaryExpression {
        op: BinaryOperator,
        left_node: &'a ExpressionType,
        right_node: &'a ExpressionType,
        left: Option<JsValue<'a>>,
    },
    LogicalExpression {
        op: LogicalOperator,
        left_node: &'a ExpressionType,
        right_node: &'a ExpressionType,
    },
    AssignmentExpression {
        op: AssignmentOperator,
        left: Lvalue<'a>,
        right_node: &'a ExpressionType,
    },
    ConditionalExpression {
        test: &'a ExpressionType,
        consequent: &'a ExpressionType,
        alternate: &'a ExpressionType,
    },
    SequenceExpression {
        expressions: &'a [Box<ExpressionType>],
        n: usize,
    },
    MemberExpression {
        base_expr: &'a ExpressionType,
        memb_expr: &'a ExpressionType,
        computed: bool,
        base: Option<JsValue<'a>>,
    },
    CallExpression {
        callee: &'a ExpressionType,
        args: &'a [Box<ExpressionType>],
        cl: Option<Rc<Closure<'a>>>,
        ns: Option<Rc<Scope<'a>>>,
        n: usize,
        called: bool,
    },
    ObjectExpression {
        props: &'a [PropertyData],
        obj: Option<JsObjectRef<'a>>,
        n: usize,
    },
    FunctionExpression {
        def: &'a FunctionData,
    },

    // Statements
    BlockStatement {
        body: &'a [StatementType],
        n: usize,
        last: Option<Completion<'a>>,
    },
    EmptyStatement,
    ExpressionStatement {
        expr: &'a ExpressionType,
    },
    VariableDeclaration {
        decls: &'a [VariableDeclaratorData],
        n: usize,
    },
    FunctionDeclaration,
    IfStatement {
        test: &'a ExpressionType,
        consequent: &'a StatementType,
        alternate: Option<&'a StatementType>,
    },
    WhileStatement {
        test: &'a ExpressionType,
        body: &'a StatementType,
        tested: bool,
        val: Option<JsValue<'a>>,
    },
    ForStatement {
        init: Option<&'a VariableDeclarationOrExpression>,
        test: Option<&'a ExpressionType>,
        update: Option<&'a ExpressionType>,
        body: &'a StatementType,
        phase: ForPhase,
        val: Option<JsValue<'a>>,
    },
    TryStatement {
        block: &'a BlockStatementData,
        handler: Option<&'a CatchClauseData>,
        finalizer: Option<&'a BlockStatementData>,
        saved: Option<Completion<'a>>,
        handled: bool,
        finalized: bool,
    },
    CatchClause {
        param: &'a str,
        body: &'a BlockStatementData,
    },
    ThrowStatement {
        argument: &'a ExpressionType,
    },
    ReturnStatement {
        argument: Option<&'a ExpressionType>,
    },
    BreakStatement {
        label: Option<&'a str>,
    },
    ContinueStatement {
        label: Option<&'a str>,
    },
    LabeledStatement {
        label: &'a str,
        body: &'a StatementType,
    },
}

impl<'a> State<'a> {
    /// Builds the root state for a whole program. The program shares the
    /// block-statement protocol.
    pub fn from_program(
        program: &'a ProgramData,
        scope: Rc<Scope<'a>>,
        parent: Option<Box<State<'a>>>,
    ) -> Box<State<'a>> {
        Self::block_state(&program.body, scope, parent)
    }

    /// The state factory for statements. An AST shape with no state variant
    /// is an interpreter bug and panics.
    pub fn from_statement(
        stmt: &'a StatementType,
        scope: Rc<Scope<'a>>,
        parent: Option<Box<State<'a>>>,
    ) -> Box<State<'a>> {
        let kind = match stmt {
            StatementType::BlockStatement(block) => StateKind::BlockStatement {
                body: &block.body,
                n: 0,
                last: None,
            },
            StatementType::EmptyStatement { .. } => StateKind::EmptyStatement,
            StatementType::ExpressionStatement { expression, .. } => {
                StateKind::ExpressionStatement { expr: expression }
            }
            StatementType::VariableDeclaration(decl) => {
                return Self::from_variable_declaration(decl, scope, parent)
            }
            StatementType::FunctionDeclaration(_) => StateKind::FunctionDeclaration,
            StatementType::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => StateKind::IfStatement {
                test,
                consequent: &**consequent,
                alternate: alternate.as_deref(),
            },
            StatementType::WhileStatement { test, body, .. } => StateKind::WhileStatement {
                test,
                body: &**body,
                tested: false,
                val: None,
            },
            // A do-while is a while whose first entry runs the body
            // unconditionally.
            StatementType::DoWhileStatement { test, body, .. } => StateKind::WhileStatement {
                test,
                body: &**body,
                tested: true,
                val: None,
            },
            StatementType::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => StateKind::ForStatement {
                init: init.as_ref(),
                test: test.as_ref(),
                update: update.as_ref(),
                body: &**body,
                phase: ForPhase::Init,
                val: None,
            },
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => StateKind::TryStatement {
                block,
                handler: handler.as_ref(),
                finalizer: finalizer.as_ref(),
                saved: None,
                handled: false,
                finalized: false,
            },
            StatementType::ThrowStatement { argument, .. } => {
                StateKind::ThrowStatement { argument }
            }
            StatementType::ReturnStatement { argument, .. } => StateKind::ReturnStatement {
                argument: argument.as_ref(),
            },
            StatementType::BreakStatement { label, .. } => StateKind::BreakStatement {
                label: label.as_ref().map(|l| l.name.as_str()),
            },
            StatementType::ContinueStatement { label, .. } => StateKind::ContinueStatement {
                label: label.as_ref().map(|l| l.name.as_str()),
            },
            StatementType::LabeledStatement { label, body, .. } => StateKind::LabeledStatement {
                label: label.name.as_str(),
                body: &**body,
            },
        };
        Box::new(State {
            parent,
            scope,
            labels: vec![],
            kind,
        })
    }

    /// The state factory for expressions.
    pub fn from_expression(
        expr: &'a ExpressionType,
        scope: Rc<Scope<'a>>,
        parent: Option<Box<State<'a>>>,
    ) -> Box<State<'a>> {
        let kind = match expr {
            ExpressionType::Literal(lit) => StateKind::Literal {
                value: literal_value(lit),
            },
            ExpressionType::Identifier(id) => StateKind::Identifier {
                name: id.name.as_str(),
            },
            ExpressionType::UnaryExpression {
                operator, argument, ..
            } => StateKind::UnaryExpression {
                op: *operator,
                argument: &**argument,
            },
            ExpressionType::UpdateExpression {
                operator,
                prefix,
                argument,
                ..
            } => StateKind::UpdateExpression {
                op: *operator,
                prefix: *prefix,
                arg: Lvalue::from_expression(argument),
            },
            ExpressionType::BinaryExpression {
                operator,
                left,
                right,
                ..
            } => StateKind::BinaryExpression {
                op: *operator,
                left_node: &**left,
                right_node: &**right,
                left: None,
            },
            ExpressionType::LogicalExpression {
                operator,
                left,
                right,
                ..
            } => StateKind::LogicalExpression {
                op: *operator,
                left_node: &**left,
                right_node: &**right,
            },
            ExpressionType::AssignmentExpression {
                operator,
                left,
                right,
                ..
            } => StateKind::AssignmentExpression {
                op: *operator,
                left: Lvalue::from_expression(left),
                right_node: &**right,
            },
            ExpressionType::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => StateKind::ConditionalExpression {
                test: &**test,
                consequent: &**consequent,
                alternate: &**alternate,
            },
            ExpressionType::SequenceExpression { expressions, .. } => {
                StateKind::SequenceExpression {
                    expressions: expressions.as_slice(),
                    n: 0,
                }
            }
            ExpressionType::MemberExpression {
                object,
                property,
                computed,
                ..
            } => StateKind::MemberExpression {
                base_expr: &**object,
                memb_expr: &**property,
                computed: *computed,
                base: None,
            },
            ExpressionType::CallExpression {
                callee, arguments, ..
            } => StateKind::CallExpression {
                callee: &**callee,
                args: arguments.as_slice(),
                cl: None,
                ns: None,
                n: 0,
                called: false,
            },
            ExpressionType::ObjectExpression { properties, .. } => StateKind::ObjectExpression {
                props: properties.as_slice(),
                obj: None,
                n: 0,
            },
            ExpressionType::FunctionExpression(def) => StateKind::FunctionExpression { def },
        };
        Box::new(State {
            parent,
            scope,
            labels: vec![],
            kind,
        })
    }

    fn from_variable_declaration(
        decl: &'a VariableDeclarationData,
        scope: Rc<Scope<'a>>,
        parent: Option<Box<State<'a>>>,
    ) -> Box<State<'a>> {
        if decl.kind != VariableDeclarationKind::Var {
            panic!("unsupported variable declaration kind {:?}", decl.kind);
        }
        Box::new(State {
            parent,
            scope,
            labels: vec![],
            kind: StateKind::VariableDeclaration {
                decls: &decl.declarations,
                n: 0,
            },
        })
    }

    fn from_block(
        block: &'a BlockStatementData,
        scope: Rc<Scope<'a>>,
        parent: Option<Box<State<'a>>>,
    ) -> Box<State<'a>> {
        Self::block_state(&block.body, scope, parent)
    }

    fn block_state(
        body: &'a [StatementType],
        scope: Rc<Scope<'a>>,
        parent: Option<Box<State<'a>>>,
    ) -> Box<State<'a>> {
        Box::new(State {
            parent,
            scope,
            labels: vec![],
            kind: StateKind::BlockStatement {
                body,
                n: 0,
                last: None,
            },
        })
    }

    /// Adds a label to the statement's label set.
    pub fn add_label(&mut self, label: &str) {
        if !self.has_label(label) {
            self.labels.push(label.to_string());
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Short name of the underlying node kind, for trace logging.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StateKind::Literal { .. } => "Literal",
            StateKind::Identifier { .. } => "Identifier",
            StateKind::UnaryExpression { .. } => "UnaryExpression",
            StateKind::UpdateExpression { .. } => "UpdateExpression",
            StateKind::BinaryExpression { .. } => "BinaryExpression",
            StateKind::LogicalExpression { .. } => "LogicalExpression",
            StateKind::AssignmentExpression { .. } => "AssignmentExpression",
            StateKind::ConditionalExpression { .. } => "ConditionalExpression",
            StateKind::SequenceExpression { .. } => "SequenceExpression",
            StateKind::MemberExpression { .. } => "MemberExpression",
            StateKind::CallExpression { .. } => "CallExpression",
            StateKind::ObjectExpression { .. } => "ObjectExpression",
            StateKind::FunctionExpression { .. } => "FunctionExpression",
            StateKind::BlockStatement { .. } => "BlockStatement",
            StateKind::EmptyStatement => "EmptyStatement",
            StateKind::ExpressionStatement { .. } => "ExpressionStatement",
            StateKind::VariableDeclaration { .. } => "VariableDeclaration",
            StateKind::FunctionDeclaration => "FunctionDeclaration",
            StateKind::IfStatement { .. } => "IfStatement",
            StateKind::WhileStatement { .. } => "WhileStatement",
            StateKind::ForStatement { .. } => "ForStatement",
            StateKind::TryStatement { .. } => "TryStatement",
            StateKind::CatchClause { .. } => "CatchClause",
            StateKind::ThrowStatement { .. } => "ThrowStatement",
            StateKind::ReturnStatement { .. } => "ReturnStatement",
            StateKind::BreakStatement { .. } => "BreakStatement",
            StateKind::ContinueStatement { .. } => "ContinueStatement",
            StateKind::LabeledStatement { .. } => "LabeledStatement",
        }
    }

    /// Performs one step. `cv` is the completion value produced by the
    /// previous step (`None` on a state's first entry). Consumes the state;
    /// when it finishes it returns its parent as the next state.
    pub fn step(self: Box<Self>, cv: Option<Completion<'a>>) -> StepResult<'a> {
        let State {
            parent,
            scope,
            labels,
            kind,
        } = *self;
        match kind {
            StateKind::Literal { value } => (parent, Some(Completion::normal(value))),

            StateKind::Identifier { name } => {
                (parent, Some(Completion::normal(scope.get_var(name))))
            }

            StateKind::EmptyStatement => (parent, Some(Completion::normal_empty())),

            StateKind::ExpressionStatement { expr } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::ExpressionStatement { expr },
                    });
                    (Some(State::from_expression(expr, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    (parent, Some(Completion::normal(cv.get_value())))
                }
            },

            StateKind::BlockStatement { body, mut n, mut last } => {
                if let Some(cv) = cv {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    last = Some(cv);
                }
                if n < body.len() {
                    let node = &body[n];
                    n += 1;
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::BlockStatement { body, n, last },
                    });
                    (Some(State::from_statement(node, scope, Some(me))), None)
                } else {
                    (parent, Some(last.unwrap_or_else(Completion::normal_empty)))
                }
            }

            StateKind::VariableDeclaration { decls, mut n } => {
                if let Some(cv) = cv {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    scope.set_var(&decls[n].id.name, cv.get_value());
                    n += 1;
                }
                // Skip any declarators without initializers.
                while n < decls.len() && decls[n].init.is_none() {
                    n += 1;
                }
                match decls.get(n).and_then(|d| d.init.as_ref()) {
                    Some(init) => {
                        let me = Box::new(State {
                            parent,
                            scope: scope.clone(),
                            labels,
                            kind: StateKind::VariableDeclaration { decls, n },
                        });
                        (Some(State::from_expression(init, scope, Some(me))), None)
                    }
                    None => (parent, Some(Completion::normal_empty())),
                }
            }

            // The binding was hoisted by the scope's populate pass; nothing
            // happens at evaluation time.
            StateKind::FunctionDeclaration => (parent, None),

            StateKind::FunctionExpression { def } => (
                parent,
                Some(Completion::normal(JsValue::Function(Rc::new(
                    Closure::new(scope, def),
                )))),
            ),

            StateKind::IfStatement {
                test,
                consequent,
                alternate,
            } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::IfStatement {
                            test,
                            consequent,
                            alternate,
                        },
                    });
                    (Some(State::from_expression(test, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    // Both branches run in tail position: their parent is
                    // this statement's parent.
                    if to_boolean(&cv.get_value()) {
                        (Some(State::from_statement(consequent, scope, parent)), None)
                    } else if let Some(alt) = alternate {
                        (Some(State::from_statement(alt, scope, parent)), None)
                    } else {
                        (parent, Some(Completion::normal_empty()))
                    }
                }
            },

            StateKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::ConditionalExpression {
                            test,
                            consequent,
                            alternate,
                        },
                    });
                    (Some(State::from_expression(test, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    let branch = if to_boolean(&cv.get_value()) {
                        consequent
                    } else {
                        alternate
                    };
                    (Some(State::from_expression(branch, scope, parent)), None)
                }
            },

            StateKind::WhileStatement {
                test,
                body,
                mut tested,
                mut val,
            } => match cv {
                None => {
                    // First entry: a do-while starts tested and runs its
                    // body unconditionally; a while evaluates the test.
                    let node_is_body = tested;
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::WhileStatement { test, body, tested, val },
                    });
                    if node_is_body {
                        (Some(State::from_statement(body, scope, Some(me))), None)
                    } else {
                        (Some(State::from_expression(test, scope, Some(me))), None)
                    }
                }
                Some(cv) => {
                    if !tested {
                        if cv.is_abrupt() {
                            return (parent, Some(cv));
                        }
                        if !to_boolean(&cv.get_value()) {
                            return (
                                parent,
                                Some(Completion {
                                    completion_type: CompletionType::Normal,
                                    value: val,
                                    target: None,
                                }),
                            );
                        }
                        tested = true;
                        let me = Box::new(State {
                            parent,
                            scope: scope.clone(),
                            labels,
                            kind: StateKind::WhileStatement { test, body, tested, val },
                        });
                        return (Some(State::from_statement(body, scope, Some(me))), None);
                    }
                    // cv is the body's completion.
                    if let Some(v) = &cv.value {
                        val = Some(v.clone());
                    }
                    let continue_here = cv.completion_type == CompletionType::Continue
                        && matches_label(&labels, &cv.target);
                    if !continue_here {
                        if cv.completion_type == CompletionType::Break
                            && (cv.target.is_none() || matches_label(&labels, &cv.target))
                        {
                            return (
                                parent,
                                Some(Completion {
                                    completion_type: CompletionType::Normal,
                                    value: val,
                                    target: None,
                                }),
                            );
                        } else if cv.is_abrupt() {
                            return (parent, Some(cv));
                        }
                    }
                    tested = false;
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::WhileStatement { test, body, tested, val },
                    });
                    (Some(State::from_expression(test, scope, Some(me))), None)
                }
            },

            StateKind::ForStatement {
                init,
                test,
                update,
                body,
                phase,
                mut val,
            } => match cv {
                None => match init {
                    Some(init_node) => {
                        let me = Box::new(State {
                            parent,
                            scope: scope.clone(),
                            labels,
                            kind: StateKind::ForStatement {
                                init,
                                test,
                                update,
                                body,
                                phase: ForPhase::Init,
                                val,
                            },
                        });
                        let child = match init_node {
                            VariableDeclarationOrExpression::VariableDeclaration(decl) => {
                                State::from_variable_declaration(decl, scope, Some(me))
                            }
                            VariableDeclarationOrExpression::Expression(expr) => {
                                State::from_expression(expr, scope, Some(me))
                            }
                        };
                        (Some(child), None)
                    }
                    None => for_dispatch_test(init, test, update, body, val, labels, scope, parent),
                },
                Some(cv) => match phase {
                    ForPhase::Init | ForPhase::Update => {
                        if cv.is_abrupt() {
                            return (parent, Some(cv));
                        }
                        for_dispatch_test(init, test, update, body, val, labels, scope, parent)
                    }
                    ForPhase::Test => {
                        if cv.is_abrupt() {
                            return (parent, Some(cv));
                        }
                        if !to_boolean(&cv.get_value()) {
                            return (
                                parent,
                                Some(Completion {
                                    completion_type: CompletionType::Normal,
                                    value: val,
                                    target: None,
                                }),
                            );
                        }
                        let me = Box::new(State {
                            parent,
                            scope: scope.clone(),
                            labels,
                            kind: StateKind::ForStatement {
                                init,
                                test,
                                update,
                                body,
                                phase: ForPhase::Body,
                                val,
                            },
                        });
                        (Some(State::from_statement(body, scope, Some(me))), None)
                    }
                    ForPhase::Body => {
                        if let Some(v) = &cv.value {
                            val = Some(v.clone());
                        }
                        let continue_here = cv.completion_type == CompletionType::Continue
                            && matches_label(&labels, &cv.target);
                        if !continue_here {
                            if cv.completion_type == CompletionType::Break
                                && (cv.target.is_none() || matches_label(&labels, &cv.target))
                            {
                                return (
                                    parent,
                                    Some(Completion {
                                        completion_type: CompletionType::Normal,
                                        value: val,
                                        target: None,
                                    }),
                                );
                            } else if cv.is_abrupt() {
                                return (parent, Some(cv));
                            }
                        }
                        match update {
                            Some(update_expr) => {
                                let me = Box::new(State {
                                    parent,
                                    scope: scope.clone(),
                                    labels,
                                    kind: StateKind::ForStatement {
                                        init,
                                        test,
                                        update,
                                        body,
                                        phase: ForPhase::Update,
                                        val,
                                    },
                                });
                                (
                                    Some(State::from_expression(update_expr, scope, Some(me))),
                                    None,
                                )
                            }
                            None => for_dispatch_test(
                                init, test, update, body, val, labels, scope, parent,
                            ),
                        }
                    }
                },
            },

            StateKind::BreakStatement { label } => (
                parent,
                Some(Completion::break_completion(label.map(|s| s.to_string()))),
            ),

            StateKind::ContinueStatement { label } => (
                parent,
                Some(Completion::continue_completion(label.map(|s| s.to_string()))),
            ),

            StateKind::ReturnStatement { argument } => match cv {
                None => match argument {
                    Some(arg) => {
                        let me = Box::new(State {
                            parent,
                            scope: scope.clone(),
                            labels,
                            kind: StateKind::ReturnStatement { argument },
                        });
                        (Some(State::from_expression(arg, scope, Some(me))), None)
                    }
                    None => (
                        parent,
                        Some(Completion::return_value(JsValue::Undefined)),
                    ),
                },
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    (parent, Some(Completion::return_value(cv.get_value())))
                }
            },

            StateKind::ThrowStatement { argument } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::ThrowStatement { argument },
                    });
                    (Some(State::from_expression(argument, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    (parent, Some(Completion::throw_value(cv.get_value())))
                }
            },

            StateKind::LabeledStatement { label, body } => match cv {
                None => {
                    // The inner statement is created with this statement's
                    // parent: the wrapper drops out of the chain. Any
                    // enclosing labels transfer onto the inner statement.
                    let mut inner = State::from_statement(body, scope, parent);
                    for l in &labels {
                        inner.add_label(l);
                    }
                    inner.add_label(label);
                    (Some(inner), None)
                }
                Some(cv) => {
                    if cv.completion_type == CompletionType::Break
                        && cv.target.as_deref() == Some(label)
                    {
                        (
                            parent,
                            Some(Completion {
                                completion_type: CompletionType::Normal,
                                value: cv.value,
                                target: None,
                            }),
                        )
                    } else {
                        (parent, Some(cv))
                    }
                }
            },

            StateKind::TryStatement {
                block,
                handler,
                finalizer,
                mut saved,
                mut handled,
                mut finalized,
            } => match cv {
                None => {
                    if handled || finalized {
                        panic!("try statement re-entered before its block has run");
                    }
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::TryStatement {
                            block,
                            handler,
                            finalizer,
                            saved,
                            handled,
                            finalized,
                        },
                    });
                    (Some(State::from_block(block, scope, Some(me))), None)
                }
                Some(cv) => {
                    if !handled {
                        // cv is the result of the block.
                        handled = true;
                        if cv.completion_type == CompletionType::Throw {
                            if let Some(h) = handler {
                                log::debug!("try: dispatching thrown value to catch");
                                let me = Box::new(State {
                                    parent,
                                    scope: scope.clone(),
                                    labels,
                                    kind: StateKind::TryStatement {
                                        block,
                                        handler,
                                        finalizer,
                                        saved,
                                        handled,
                                        finalized,
                                    },
                                });
                                let catch_state = Box::new(State {
                                    parent: Some(me),
                                    scope,
                                    labels: vec![],
                                    kind: StateKind::CatchClause {
                                        param: h.param.name.as_str(),
                                        body: &h.body,
                                    },
                                });
                                return (
                                    Some(catch_state),
                                    Some(Completion::normal(cv.get_value())),
                                );
                            }
                        }
                    }
                    if !finalized {
                        // cv is the non-throw result of the block, or the
                        // (possibly still abrupt) result of the handler.
                        match finalizer {
                            Some(fin) => {
                                finalized = true;
                                saved = Some(cv);
                                let me = Box::new(State {
                                    parent,
                                    scope: scope.clone(),
                                    labels,
                                    kind: StateKind::TryStatement {
                                        block,
                                        handler,
                                        finalizer,
                                        saved,
                                        handled,
                                        finalized,
                                    },
                                });
                                return (Some(State::from_block(fin, scope, Some(me))), None);
                            }
                            None => return (parent, Some(cv)),
                        }
                    }
                    // cv is the finalizer's result; an abrupt finalizer
                    // supersedes whatever was pending.
                    if cv.is_abrupt() {
                        (parent, Some(cv))
                    } else {
                        (parent, Some(saved.unwrap_or_else(Completion::normal_empty)))
                    }
                }
            },

            StateKind::CatchClause { param, body } => {
                let thrown = match cv {
                    Some(cv) => cv.get_value(),
                    None => panic!("catch clause entered without a thrown value"),
                };
                // The handler runs in a fresh child scope binding the
                // parameter, and returns straight to the try statement.
                let catch_scope = Scope::new_child(&scope);
                catch_scope.new_var(param, thrown);
                (Some(State::from_block(body, catch_scope, parent)), None)
            }

            StateKind::BinaryExpression {
                op,
                left_node,
                right_node,
                left,
            } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::BinaryExpression {
                            op,
                            left_node,
                            right_node,
                            left,
                        },
                    });
                    (Some(State::from_expression(left_node, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    match left {
                        None => {
                            let me = Box::new(State {
                                parent,
                                scope: scope.clone(),
                                labels,
                                kind: StateKind::BinaryExpression {
                                    op,
                                    left_node,
                                    right_node,
                                    left: Some(cv.get_value()),
                                },
                            });
                            (
                                Some(State::from_expression(right_node, scope, Some(me))),
                                None,
                            )
                        }
                        Some(left_value) => match binary_op(&left_value, op, &cv.get_value()) {
                            Ok(v) => (parent, Some(Completion::normal(v))),
                            Err(e) => (parent, Some(Completion::throw_value(e.to_value()))),
                        },
                    }
                }
            },

            StateKind::LogicalExpression {
                op,
                left_node,
                right_node,
            } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::LogicalExpression {
                            op,
                            left_node,
                            right_node,
                        },
                    });
                    (Some(State::from_expression(left_node, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    let left_value = cv.get_value();
                    let short_circuit = match op {
                        LogicalOperator::And => !to_boolean(&left_value),
                        LogicalOperator::Or => to_boolean(&left_value),
                    };
                    if short_circuit {
                        (parent, Some(Completion::normal(left_value)))
                    } else {
                        // Tail position: the right operand reports straight
                        // to this expression's parent.
                        (Some(State::from_expression(right_node, scope, parent)), None)
                    }
                }
            },

            StateKind::UnaryExpression { op, argument } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::UnaryExpression { op, argument },
                    });
                    (Some(State::from_expression(argument, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    match unary_op(op, &cv.get_value()) {
                        Ok(v) => (parent, Some(Completion::normal(v))),
                        Err(e) => (parent, Some(Completion::throw_value(e.to_value()))),
                    }
                }
            },

            StateKind::SequenceExpression {
                expressions,
                mut n,
            } => {
                if let Some(cv) = &cv {
                    if cv.is_abrupt() {
                        return (parent, Some(cv.clone()));
                    }
                }
                let node = &*expressions[n];
                let is_last = n + 1 == expressions.len();
                n += 1;
                if is_last {
                    // Tail call: the final subexpression replaces this state.
                    (Some(State::from_expression(node, scope, parent)), None)
                } else {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::SequenceExpression { expressions, n },
                    });
                    (Some(State::from_expression(node, scope, Some(me))), None)
                }
            }

            StateKind::MemberExpression {
                base_expr,
                memb_expr,
                computed,
                base,
            } => match cv {
                None => {
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::MemberExpression {
                            base_expr,
                            memb_expr,
                            computed,
                            base,
                        },
                    });
                    (Some(State::from_expression(base_expr, scope, Some(me))), None)
                }
                Some(cv) => {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    match base {
                        None => {
                            let base_value = cv.get_value();
                            if computed {
                                let me = Box::new(State {
                                    parent,
                                    scope: scope.clone(),
                                    labels,
                                    kind: StateKind::MemberExpression {
                                        base_expr,
                                        memb_expr,
                                        computed,
                                        base: Some(base_value),
                                    },
                                });
                                return (
                                    Some(State::from_expression(memb_expr, scope, Some(me))),
                                    None,
                                );
                            }
                            let name = identifier_name(memb_expr);
                            match get_property(&base_value, name) {
                                Ok(v) => (parent, Some(Completion::normal(v))),
                                Err(e) => (parent, Some(Completion::throw_value(e.to_value()))),
                            }
                        }
                        Some(base_value) => {
                            let name = to_string(&cv.get_value());
                            match get_property(&base_value, &name) {
                                Ok(v) => (parent, Some(Completion::normal(v))),
                                Err(e) => (parent, Some(Completion::throw_value(e.to_value()))),
                            }
                        }
                    }
                }
            },

            StateKind::ObjectExpression { props, obj, mut n } => {
                let object = match obj {
                    Some(o) => o,
                    None => {
                        if n != 0 || cv.is_some() {
                            panic!("object expression state entered in an inconsistent phase");
                        }
                        JsObjectData::new(None)
                    }
                };
                if let Some(cv) = cv {
                    if cv.is_abrupt() {
                        return (parent, Some(cv));
                    }
                    let key = property_key_string(&props[n].key);
                    object.borrow_mut().set(&key, cv.get_value());
                    n += 1;
                }
                if n < props.len() {
                    let value_node = &props[n].value;
                    let me = Box::new(State {
                        parent,
                        scope: scope.clone(),
                        labels,
                        kind: StateKind::ObjectExpression {
                            props,
                            obj: Some(object.clone()),
                            n,
                        },
                    });
                    (Some(State::from_expression(value_node, scope, Some(me))), None)
                } else {
                    (parent, Some(Completion::normal(JsValue::Object(object))))
                }
            }

            StateKind::CallExpression {
                callee,
                args,
                mut cl,
                mut ns,
                mut n,
                mut called,
            } => {
                let mut cv = cv;
                if cl.is_none() {
                    match cv.take() {
                        None => {
                            // First visit: evaluate the callee.
                            let me = Box::new(State {
                                parent,
                                scope: scope.clone(),
                                labels,
                                kind: StateKind::CallExpression {
                                    callee,
                                    args,
                                    cl,
                                    ns,
                                    n,
                                    called,
                                },
                            });
                            return (
                                Some(State::from_expression(callee, scope, Some(me))),
                                None,
                            );
                        }
                        Some(callee_cv) => {
                            if callee_cv.is_abrupt() {
                                return (parent, Some(callee_cv));
                            }
                            let closure = match callee_cv.get_value() {
                                JsValue::Function(c) => c,
                                other => {
                                    let err = JErrorType::TypeError(format!(
                                        "{} is not a function",
                                        other
                                    ));
                                    return (
                                        parent,
                                        Some(Completion::throw_value(err.to_value())),
                                    );
                                }
                            };
                            log::debug!(
                                "call: {} with {} argument(s)",
                                closure.name().unwrap_or("<anonymous>"),
                                args.len()
                            );
                            // Set up the invocation scope: a child of the
                            // closure's defining scope, hoisted for the
                            // body, with every parameter pre-declared.
                            let call_scope = Scope::new_child(closure.defining_scope());
                            call_scope.populate(&closure.body().body);
                            for i in 0..closure.param_count() {
                                if let Some(p) = closure.param_name(i) {
                                    call_scope.new_var(p, JsValue::Undefined);
                                }
                            }
                            cl = Some(closure);
                            ns = Some(call_scope);
                        }
                    }
                } else if !called {
                    match cv.take() {
                        Some(arg_cv) => {
                            if arg_cv.is_abrupt() {
                                return (parent, Some(arg_cv));
                            }
                            if let (Some(closure), Some(call_scope)) = (&cl, &ns) {
                                // Extra arguments are evaluated then dropped.
                                if let Some(p) = closure.param_name(n - 1) {
                                    call_scope.new_var(p, arg_cv.get_value());
                                }
                            }
                        }
                        None => panic!("call expression re-entered without a completion value"),
                    }
                }

                if !called {
                    if n < args.len() {
                        let arg = &*args[n];
                        n += 1;
                        let me = Box::new(State {
                            parent,
                            scope: scope.clone(),
                            labels,
                            kind: StateKind::CallExpression {
                                callee,
                                args,
                                cl,
                                ns,
                                n,
                                called,
                            },
                        });
                        return (Some(State::from_expression(arg, scope, Some(me))), None);
                    }
                    // All arguments are bound: run the body.
                    called = true;
                    let (closure, call_scope) = match (&cl, &ns) {
                        (Some(c), Some(s)) => (c.clone(), s.clone()),
                        _ => panic!("call expression lost its closure before the body ran"),
                    };
                    let me = Box::new(State {
                        parent,
                        scope,
                        labels,
                        kind: StateKind::CallExpression {
                            callee,
                            args,
                            cl,
                            ns,
                            n,
                            called,
                        },
                    });
                    return (
                        Some(State::from_block(closure.body(), call_scope, Some(me))),
                        None,
                    );
                }

                // The body finished: normalise its completion value.
                match cv.take() {
                    Some(body_cv) => match body_cv.completion_type {
                        CompletionType::Return => {
                            (parent, Some(Completion::normal(body_cv.get_value())))
                        }
                        CompletionType::Throw => (parent, Some(body_cv)),
                        CompletionType::Normal => {
                            (parent, Some(Completion::normal(JsValue::Undefined)))
                        }
                        other => panic!(
                            "completion {:?} escaped a function body",
                            other
                        ),
                    },
                    None => panic!("call expression finished without a completion value"),
                }
            }

            StateKind::AssignmentExpression {
                op,
                mut left,
                right_node,
            } => {
                let mut cv = cv;
                if let Some(c) = &cv {
                    if c.is_abrupt() {
                        return (parent, cv);
                    }
                }
                if !left.ready() {
                    match left.step(cv.take()) {
                        LvalueStep::Eval(node) => {
                            let me = Box::new(State {
                                parent,
                                scope: scope.clone(),
                                labels,
                                kind: StateKind::AssignmentExpression {
                                    op,
                                    left,
                                    right_node,
                                },
                            });
                            return (Some(State::from_expression(node, scope, Some(me))), None);
                        }
                        LvalueStep::Ready => {}
                    }
                }
                match cv.take() {
                    None => {
                        let me = Box::new(State {
                            parent,
                            scope: scope.clone(),
                            labels,
                            kind: StateKind::AssignmentExpression {
                                op,
                                left,
                                right_node,
                            },
                        });
                        (Some(State::from_expression(right_node, scope, Some(me))), None)
                    }
                    Some(rhs_cv) => {
                        let rhs = rhs_cv.get_value();
                        let result = match compound_operator(op) {
                            None => rhs,
                            Some(bin) => {
                                let current = match left.get(&scope) {
                                    Ok(v) => v,
                                    Err(e) => {
                                        return (
                                            parent,
                                            Some(Completion::throw_value(e.to_value())),
                                        )
                                    }
                                };
                                match binary_op(&current, bin, &rhs) {
                                    Ok(v) => v,
                                    Err(e) => {
                                        return (
                                            parent,
                                            Some(Completion::throw_value(e.to_value())),
                                        )
                                    }
                                }
                            }
                        };
                        if let Err(e) = left.set(&scope, result.clone()) {
                            return (parent, Some(Completion::throw_value(e.to_value())));
                        }
                        (parent, Some(Completion::normal(result)))
                    }
                }
            }

            StateKind::UpdateExpression {
                op,
                prefix,
                mut arg,
            } => {
                let mut cv = cv;
                if let Some(c) = &cv {
                    if c.is_abrupt() {
                        return (parent, cv);
                    }
                }
                if !arg.ready() {
                    match arg.step(cv.take()) {
                        LvalueStep::Eval(node) => {
                            let me = Box::new(State {
                                parent,
                                scope: scope.clone(),
                                labels,
                                kind: StateKind::UpdateExpression { op, prefix, arg },
                            });
                            return (Some(State::from_expression(node, scope, Some(me))), None);
                        }
                        LvalueStep::Ready => {}
                    }
                }
                let old = match arg.get(&scope) {
                    Ok(v) => v,
                    Err(e) => return (parent, Some(Completion::throw_value(e.to_value()))),
                };
                let old_num = to_number(&old);
                let new_num = update_number(&old_num, op);
                let result = if prefix { new_num.clone() } else { old_num };
                if let Err(e) = arg.set(&scope, JsValue::Number(new_num)) {
                    return (parent, Some(Completion::throw_value(e.to_value())));
                }
                (parent, Some(Completion::normal(JsValue::Number(result))))
            }
        }
    }
}

/// A reference to an identifier or object property, resolved in two phases:
/// first the `(base, name)` pair is computed by stepping through the member
/// expression's sub-expressions, then the owning state reads or writes
/// through it. For a bare identifier it is ready immediately with no base.
pub(crate) struct Lvalue<'a> {
    base_expr: Option<&'a ExpressionType>,
    memb_expr: Option<&'a ExpressionType>,
    computed: bool,
    base: Option<JsValue<'a>>,
    name: String,
    have_base: bool,
    ready: bool,
}

pub(crate) enum LvalueStep<'a> {
    /// The lvalue needs this sub-expression evaluated next.
    Eval(&'a ExpressionType),
    /// Resolution finished; `get`/`set` may now be used.
    Ready,
}

impl<'a> Lvalue<'a> {
    fn from_expression(expr: &'a ExpressionType) -> Self {
        match expr {
            ExpressionType::Identifier(id) => Lvalue {
                base_expr: None,
                memb_expr: None,
                computed: false,
                base: None,
                name: id.name.clone(),
                have_base: false,
                ready: true,
            },
            ExpressionType::MemberExpression {
                object,
                property,
                computed,
                ..
            } => Lvalue {
                base_expr: Some(&**object),
                memb_expr: Some(&**property),
                computed: *computed,
                base: None,
                name: String::new(),
                have_base: false,
                ready: false,
            },
            _ => panic!("expression is not an lvalue"),
        }
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn step(&mut self, cv: Option<Completion<'a>>) -> LvalueStep<'a> {
        if self.ready {
            panic!("lvalue stepped after becoming ready");
        }
        match cv {
            None => {
                if self.have_base {
                    panic!("lvalue already has its base");
                }
                match self.base_expr {
                    Some(e) => LvalueStep::Eval(e),
                    None => panic!("member lvalue is missing its base expression"),
                }
            }
            Some(cv) => {
                if !self.have_base {
                    self.base = Some(cv.get_value());
                    self.have_base = true;
                    if self.computed {
                        return match self.memb_expr {
                            Some(e) => LvalueStep::Eval(e),
                            None => panic!("member lvalue is missing its member expression"),
                        };
                    }
                    // expr.identifier: take the identifier's text directly.
                    match self.memb_expr {
                        Some(e) => self.name = identifier_name(e).to_string(),
                        None => panic!("member lvalue is missing its member expression"),
                    }
                    self.ready = true;
                    LvalueStep::Ready
                } else {
                    self.name = to_string(&cv.get_value());
                    self.ready = true;
                    LvalueStep::Ready
                }
            }
        }
    }

    fn get(&self, scope: &Rc<Scope<'a>>) -> Result<JsValue<'a>, JErrorType> {
        if !self.ready {
            panic!("lvalue read before it is ready");
        }
        match &self.base {
            None => Ok(scope.get_var(&self.name)),
            Some(base) => get_property(base, &self.name),
        }
    }

    fn set(&self, scope: &Rc<Scope<'a>>, value: JsValue<'a>) -> Result<(), JErrorType> {
        if !self.ready {
            panic!("lvalue written before it is ready");
        }
        match &self.base {
            None => {
                scope.set_var(&self.name, value);
                Ok(())
            }
            Some(base) => set_property(base, &self.name, value),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn for_dispatch_test<'a>(
    init: Option<&'a VariableDeclarationOrExpression>,
    test: Option<&'a ExpressionType>,
    update: Option<&'a ExpressionType>,
    body: &'a StatementType,
    val: Option<JsValue<'a>>,
    labels: Vec<String>,
    scope: Rc<Scope<'a>>,
    parent: Option<Box<State<'a>>>,
) -> StepResult<'a> {
    match test {
        Some(test_expr) => {
            let me = Box::new(State {
                parent,
                scope: scope.clone(),
                labels,
                kind: StateKind::ForStatement {
                    init,
                    test,
                    update,
                    body,
                    phase: ForPhase::Test,
                    val,
                },
            });
            (Some(State::from_expression(test_expr, scope, Some(me))), None)
        }
        None => {
            // No test means true: go straight to the body.
            let me = Box::new(State {
                parent,
                scope: scope.clone(),
                labels,
                kind: StateKind::ForStatement {
                    init,
                    test,
                    update,
                    body,
                    phase: ForPhase::Body,
                    val,
                },
            });
            (Some(State::from_statement(body, scope, Some(me))), None)
        }
    }
}

fn matches_label(labels: &[String], target: &Option<String>) -> bool {
    match target {
        Some(t) => labels.iter().any(|l| l == t),
        None => false,
    }
}

fn literal_value<'a>(lit: &'a LiteralData) -> JsValue<'a> {
    match &lit.value {
        LiteralType::NullLiteral => JsValue::Null,
        LiteralType::BooleanLiteral(b) => JsValue::Boolean(*b),
        LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(i)) => {
            JsValue::Number(JsNumberType::Integer(*i))
        }
        LiteralType::NumberLiteral(NumberLiteralType::FloatLiteral(f)) => {
            JsValue::Number(JsNumberType::Float(*f))
        }
        LiteralType::StringLiteral(s) => JsValue::String(s.clone()),
    }
}

fn property_key_string(key: &LiteralOrIdentifier) -> String {
    match key {
        LiteralOrIdentifier::Identifier(id) => id.name.clone(),
        LiteralOrIdentifier::Literal(lit) => to_string(&literal_value(lit)),
    }
}

fn identifier_name(expr: &ExpressionType) -> &str {
    match expr {
        ExpressionType::Identifier(id) => &id.name,
        _ => panic!("expected an identifier in a non-computed member expression"),
    }
}

fn compound_operator(op: AssignmentOperator) -> Option<BinaryOperator> {
    match op {
        AssignmentOperator::Equals => None,
        AssignmentOperator::AddEquals => Some(BinaryOperator::Add),
        AssignmentOperator::SubtractEquals => Some(BinaryOperator::Subtract),
        AssignmentOperator::MultiplyEquals => Some(BinaryOperator::Multiply),
        AssignmentOperator::DivideEquals => Some(BinaryOperator::Divide),
        AssignmentOperator::ModuloEquals => Some(BinaryOperator::Modulo),
        AssignmentOperator::BitwiseLeftShiftEquals => Some(BinaryOperator::BitwiseLeftShift),
        AssignmentOperator::BitwiseRightShiftEquals => Some(BinaryOperator::BitwiseRightShift),
        AssignmentOperator::BitwiseUnsignedRightShiftEquals => {
            Some(BinaryOperator::BitwiseUnsignedRightShift)
        }
        AssignmentOperator::BitwiseOrEquals => Some(BinaryOperator::BitwiseOr),
        AssignmentOperator::BitwiseXorEquals => Some(BinaryOperator::BitwiseXor),
        AssignmentOperator::BitwiseAndEquals => Some(BinaryOperator::BitwiseAnd),
    }
}

fn update_number(n: &JsNumberType, op: UpdateOperator) -> JsNumberType {
    let delta = match op {
        UpdateOperator::PlusPlus => 1,
        UpdateOperator::MinusMinus => -1,
    };
    match n {
        JsNumberType::Integer(i) => JsNumberType::Integer(i + delta),
        JsNumberType::Float(f) => JsNumberType::Float(f + delta as f64),
        JsNumberType::NaN => JsNumberType::NaN,
        JsNumberType::PositiveInfinity => JsNumberType::PositiveInfinity,
        JsNumberType::NegativeInfinity => JsNumberType::NegativeInfinity,
    }
}
