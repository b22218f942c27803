use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::value::JsValue;

/// A language-level error. These become THROW completion values that user
/// code can catch; they never abort the evaluator. Internal evaluator
/// invariant violations are panics, not `JErrorType`s.
#[derive(Debug, Clone, PartialEq)]
pub enum JErrorType {
    ReferenceError(String),
    TypeError(String),
    RangeError(String),
    SyntaxError(String),
}

impl JErrorType {
    /// The value carried by the THROW completion raised for this error.
    pub fn to_value<'a>(&self) -> JsValue<'a> {
        JsValue::String(self.to_string())
    }
}

impl Display for JErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JErrorType::ReferenceError(m) => write!(f, "ReferenceError: {}", m),
            JErrorType::TypeError(m) => write!(f, "TypeError: {}", m),
            JErrorType::RangeError(m) => write!(f, "RangeError: {}", m),
            JErrorType::SyntaxError(m) => write!(f, "SyntaxError: {}", m),
        }
    }
}
