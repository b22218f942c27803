//! Equality and relational comparisons.

use std::mem;
use std::rc::Rc;

use crate::runner::ds::operations::type_conversion::{number_to_f64, to_number};
use crate::runner::ds::value::{JsNumberType, JsValue};

pub fn strict_equality<'a>(left: &JsValue<'a>, right: &JsValue<'a>) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Number(JsNumberType::NaN), _) | (_, JsValue::Number(JsNumberType::NaN)) => false,
        (JsValue::Number(a), JsValue::Number(b)) => number_to_f64(a) == number_to_f64(b),
        (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
        (JsValue::Function(a), JsValue::Function(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

pub fn loose_equality<'a>(left: &JsValue<'a>, right: &JsValue<'a>) -> bool {
    if mem::discriminant(left) == mem::discriminant(right) {
        return strict_equality(left, right);
    }
    match (left, right) {
        (JsValue::Null, JsValue::Undefined) | (JsValue::Undefined, JsValue::Null) => true,
        (JsValue::Number(_), JsValue::String(_)) => {
            strict_equality(left, &JsValue::Number(to_number(right)))
        }
        (JsValue::String(_), JsValue::Number(_)) => {
            strict_equality(&JsValue::Number(to_number(left)), right)
        }
        (JsValue::Boolean(_), _) => loose_equality(&JsValue::Number(to_number(left)), right),
        (_, JsValue::Boolean(_)) => loose_equality(left, &JsValue::Number(to_number(right))),
        _ => false,
    }
}

/// Relational comparison after numeric coercion; NaN on either side makes
/// every relation false.
pub fn compare_values<F>(left: &JsValue, right: &JsValue, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let left_num = to_number(left);
    let right_num = to_number(right);
    match (&left_num, &right_num) {
        (JsNumberType::NaN, _) | (_, JsNumberType::NaN) => false,
        (a, b) => cmp(number_to_f64(a), number_to_f64(b)),
    }
}
