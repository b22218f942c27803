//! # jstep - a steppable ES5.1 interpreter
//!
//! A tree-walking interpreter for an ES5.1 subset whose evaluator is an
//! explicit continuation machine: every pending sub-evaluation is a
//! heap-allocated state object with a parent pointer, and the driver
//! advances the current state one step at a time. Because the call stack
//! is data rather than host-stack recursion, a host can run programs to
//! completion, interleave several programs at step granularity, or drop a
//! state chain to abandon execution.
//!
//! ## Quick start
//!
//! ```
//! use jstep::parser::JsParser;
//! use jstep::runner::api::Interpreter;
//! use jstep::runner::ds::value::{JsNumberType, JsValue};
//!
//! let program = JsParser::parse_to_ast_from_str(
//!     "var x = 0; while (x < 3) x = x + 1; x",
//! )
//! .unwrap();
//! let interpreter = Interpreter::new();
//! let completion = interpreter.run(&program);
//! assert_eq!(
//!     completion.get_value(),
//!     JsValue::Number(JsNumberType::Integer(3))
//! );
//! ```
//!
//! ## Host-driven stepping
//!
//! ```
//! use jstep::parser::JsParser;
//! use jstep::runner::api::Interpreter;
//!
//! let program = JsParser::parse_to_ast_from_str("1 + 2;").unwrap();
//! let interpreter = Interpreter::new();
//! let mut state = Some(interpreter.start(&program));
//! let mut cv = None;
//! while let Some(current) = state {
//!     let (next, next_cv) = current.step(cv);
//!     state = next;
//!     cv = next_cv;
//! }
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - pest grammar and ESTree-style AST types
//! - **[`runner`]** - the execution engine
//!   - **[`runner::ds`]** - values, objects and the operator adapter
//!   - **[`runner::eval`]** - completion values, scopes, closures and the
//!     state machine
//!   - **[`runner::api`]** - the driver loop

pub mod parser;
pub mod runner;
