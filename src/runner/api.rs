//! The driver: runs a parsed program to completion, or hands out root
//! states for host-controlled stepping.

use std::rc::Rc;

use crate::parser::ast::ProgramData;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::scope::Scope;
use crate::runner::eval::state::{State, StepResult};
use crate::runner::eval::types::Completion;

pub struct Interpreter<'a> {
    global: Rc<Scope<'a>>,
}

impl<'a> Interpreter<'a> {
    pub fn new() -> Self {
        Interpreter {
            global: Scope::new_global(),
        }
    }

    pub fn global_scope(&self) -> &Rc<Scope<'a>> {
        &self.global
    }

    /// Reads a global binding; handy after a run to inspect results.
    pub fn get_global(&self, name: &str) -> JsValue<'a> {
        self.global.get_var(name)
    }

    /// Builds the root state for a program without running it. The global
    /// scope is populated (var and function hoisting) first. The returned
    /// state's parent is the driver sentinel (`None`), so stepping it until
    /// the state runs out drives the whole program.
    pub fn start(&self, program: &'a ProgramData) -> Box<State<'a>> {
        self.global.populate(&program.body);
        State::from_program(program, self.global.clone(), None)
    }

    /// Runs a program to completion. The returned completion value is the
    /// program's result; an uncaught throw comes back as a THROW completion
    /// for the host to report.
    pub fn run(&self, program: &'a ProgramData) -> Completion<'a> {
        let mut state = Some(self.start(program));
        let mut cv = None;
        while let Some(current) = state {
            log::trace!("step {}", current.kind_name());
            let (next, next_cv) = current.step(cv);
            state = next;
            cv = next_cv;
        }
        cv.unwrap_or_else(Completion::normal_empty)
    }
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Advances one state by one step; for hosts that multiplex programs or
/// persist the state chain between steps.
pub fn step<'a>(state: Box<State<'a>>, cv: Option<Completion<'a>>) -> StepResult<'a> {
    state.step(cv)
}
