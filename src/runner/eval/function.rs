//! User function values.

use std::rc::Rc;

use crate::parser::ast::{BlockStatementData, FunctionData};
use crate::runner::eval::scope::Scope;

/// A captured function: the scope it was defined in plus its definition.
/// Invocation lives in the call-expression state.
pub struct Closure<'a> {
    scope: Rc<Scope<'a>>,
    def: &'a FunctionData,
}

impl<'a> Closure<'a> {
    pub fn new(scope: Rc<Scope<'a>>, def: &'a FunctionData) -> Self {
        Closure { scope, def }
    }

    pub fn defining_scope(&self) -> &Rc<Scope<'a>> {
        &self.scope
    }

    pub fn name(&self) -> Option<&str> {
        self.def.id.as_ref().map(|id| id.name.as_str())
    }

    pub fn param_name(&self, index: usize) -> Option<&'a str> {
        self.def.params.get(index).map(|p| p.name.as_str())
    }

    pub fn param_count(&self) -> usize {
        self.def.params.len()
    }

    pub fn body(&self) -> &'a BlockStatementData {
        &self.def.body
    }
}
