//! Abstract coercion operations: ToBoolean, ToNumber, ToString and the
//! integer conversions backing the bitwise operators.

use crate::runner::ds::value::{JsNumberType, JsValue};

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// The `typeof` string for a value. Note `typeof null` is "object".
pub fn get_type(v: &JsValue) -> &'static str {
    match v {
        JsValue::Undefined => TYPE_STR_UNDEFINED,
        JsValue::Null => TYPE_STR_OBJECT,
        JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
        JsValue::String(_) => TYPE_STR_STRING,
        JsValue::Number(_) => TYPE_STR_NUMBER,
        JsValue::Object(_) => TYPE_STR_OBJECT,
        JsValue::Function(_) => TYPE_STR_FUNCTION,
    }
}

pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined => false,
        JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => match n {
            JsNumberType::Integer(0) => false,
            JsNumberType::Float(f) if *f == 0.0 || f.is_nan() => false,
            JsNumberType::NaN => false,
            _ => true,
        },
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
        JsValue::Function(_) => true,
    }
}

pub fn to_number(value: &JsValue) -> JsNumberType {
    match value {
        JsValue::Undefined => JsNumberType::NaN,
        JsValue::Null => JsNumberType::Integer(0),
        JsValue::Boolean(true) => JsNumberType::Integer(1),
        JsValue::Boolean(false) => JsNumberType::Integer(0),
        JsValue::Number(n) => n.clone(),
        JsValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                JsNumberType::Integer(0)
            } else if let Ok(i) = trimmed.parse::<i64>() {
                JsNumberType::Integer(i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                JsNumberType::Float(f)
            } else {
                JsNumberType::NaN
            }
        }
        JsValue::Object(_) => JsNumberType::NaN,
        JsValue::Function(_) => JsNumberType::NaN,
    }
}

pub fn to_string(value: &JsValue) -> String {
    match value {
        JsValue::Undefined => TYPE_STR_UNDEFINED.to_string(),
        JsValue::Null => TYPE_STR_NULL.to_string(),
        JsValue::Boolean(true) => "true".to_string(),
        JsValue::Boolean(false) => "false".to_string(),
        JsValue::Number(n) => n.to_string(),
        JsValue::String(s) => s.clone(),
        JsValue::Object(_) => "[object Object]".to_string(),
        JsValue::Function(_) => "function".to_string(),
    }
}

pub fn number_to_f64(n: &JsNumberType) -> f64 {
    match n {
        JsNumberType::Integer(i) => *i as f64,
        JsNumberType::Float(f) => *f,
        JsNumberType::NaN => f64::NAN,
        JsNumberType::PositiveInfinity => f64::INFINITY,
        JsNumberType::NegativeInfinity => f64::NEG_INFINITY,
    }
}

/// ToInt32 for the bitwise and shift operators.
pub fn to_i32(value: &JsValue) -> i32 {
    match to_number(value) {
        JsNumberType::Integer(i) => i as i32,
        JsNumberType::Float(f) => {
            if f.is_finite() {
                f as i64 as i32
            } else {
                0
            }
        }
        JsNumberType::NaN => 0,
        JsNumberType::PositiveInfinity => 0,
        JsNumberType::NegativeInfinity => 0,
    }
}

/// ToUint32; used for the unsigned right shift and shift counts.
pub fn to_u32(value: &JsValue) -> u32 {
    to_i32(value) as u32
}
