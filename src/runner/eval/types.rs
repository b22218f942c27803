//! Completion values: the result of every evaluation step.

use crate::runner::ds::value::JsValue;

/// How a step completed. Anything other than `Normal` is an abrupt
/// completion and is propagated toward the construct that consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionType {
    Normal,
    Break,
    Continue,
    Return,
    Throw,
}

/// The `{typ, val, targ}` triple threaded between states. `target` is only
/// meaningful for break/continue and names the label they are aimed at.
#[derive(Debug, Clone)]
pub struct Completion<'a> {
    pub completion_type: CompletionType,
    pub value: Option<JsValue<'a>>,
    pub target: Option<String>,
}

impl<'a> Completion<'a> {
    pub fn normal(value: JsValue<'a>) -> Self {
        Completion {
            completion_type: CompletionType::Normal,
            value: Some(value),
            target: None,
        }
    }

    /// A normal completion with no value (e.g. an empty block).
    pub fn normal_empty() -> Self {
        Completion {
            completion_type: CompletionType::Normal,
            value: None,
            target: None,
        }
    }

    pub fn return_value(value: JsValue<'a>) -> Self {
        Completion {
            completion_type: CompletionType::Return,
            value: Some(value),
            target: None,
        }
    }

    pub fn throw_value(value: JsValue<'a>) -> Self {
        Completion {
            completion_type: CompletionType::Throw,
            value: Some(value),
            target: None,
        }
    }

    pub fn break_completion(target: Option<String>) -> Self {
        Completion {
            completion_type: CompletionType::Break,
            value: None,
            target,
        }
    }

    pub fn continue_completion(target: Option<String>) -> Self {
        Completion {
            completion_type: CompletionType::Continue,
            value: None,
            target,
        }
    }

    pub fn is_abrupt(&self) -> bool {
        self.completion_type != CompletionType::Normal
    }

    /// The carried value, or undefined when the completion carries none.
    pub fn get_value(&self) -> JsValue<'a> {
        self.value.clone().unwrap_or(JsValue::Undefined)
    }
}
