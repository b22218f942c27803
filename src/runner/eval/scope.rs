//! Lexical scopes.
//!
//! A scope is a name-to-value map with a parent link; the chain's root is
//! the global scope. Scopes are shared between the states of one call
//! stack, so the bindings sit behind a `RefCell`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::ast::StatementType;
use crate::parser::static_semantics::scan_statement_list;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::function::Closure;

pub struct Scope<'a> {
    bindings: RefCell<HashMap<String, JsValue<'a>>>,
    parent: Option<Rc<Scope<'a>>>,
}

impl<'a> Scope<'a> {
    pub fn new_global() -> Rc<Self> {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn new_child(parent: &Rc<Scope<'a>>) -> Rc<Self> {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// Looks a name up along the parent chain. An undeclared name reads as
    /// undefined; the evaluator never distinguishes "declared undefined"
    /// from "never declared".
    pub fn get_var(&self, name: &str) -> JsValue<'a> {
        if let Some(v) = self.bindings.borrow().get(name) {
            return v.clone();
        }
        match &self.parent {
            Some(parent) => parent.get_var(name),
            None => JsValue::Undefined,
        }
    }

    /// Assigns to the innermost scope that already declares `name`; an
    /// undeclared name is created on the global scope.
    pub fn set_var(self: &Rc<Self>, name: &str, value: JsValue<'a>) {
        let mut current = self.clone();
        loop {
            if current.bindings.borrow().contains_key(name) || current.parent.is_none() {
                current
                    .bindings
                    .borrow_mut()
                    .insert(name.to_string(), value);
                return;
            }
            let parent = match &current.parent {
                Some(p) => p.clone(),
                None => return,
            };
            current = parent;
        }
    }

    /// Declares `name` in this scope. Re-declaration overwrites, which
    /// makes repeated declaration of the same name idempotent for the
    /// populate pass.
    pub fn new_var(&self, name: &str, value: JsValue<'a>) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Hoisting pass: declares every `var` name in `body` as undefined and
    /// binds every function declaration to a closure over this scope. Runs
    /// before a program or function body executes.
    pub fn populate(self: &Rc<Self>, body: &'a [StatementType]) {
        let hoisted = scan_statement_list(body);
        for name in hoisted.var_names {
            if !self.has_binding(name) {
                self.new_var(name, JsValue::Undefined);
            }
        }
        for func in hoisted.functions {
            if let Some(id) = &func.id {
                self.new_var(
                    &id.name,
                    JsValue::Function(Rc::new(Closure::new(self.clone(), func))),
                );
            }
        }
    }
}
