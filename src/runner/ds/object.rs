//! Ordinary objects: a property map plus an optional prototype link.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

pub type JsObjectRef<'a> = Rc<RefCell<JsObjectData<'a>>>;

pub struct JsObjectData<'a> {
    properties: HashMap<String, JsValue<'a>>,
    prototype: Option<JsObjectRef<'a>>,
}

impl<'a> JsObjectData<'a> {
    pub fn new(prototype: Option<JsObjectRef<'a>>) -> JsObjectRef<'a> {
        Rc::new(RefCell::new(JsObjectData {
            properties: HashMap::new(),
            prototype,
        }))
    }

    /// Reads an own property, walking the prototype chain. A missing
    /// property reads as undefined.
    pub fn get(&self, name: &str) -> JsValue<'a> {
        if let Some(v) = self.properties.get(name) {
            return v.clone();
        }
        match &self.prototype {
            Some(proto) => proto.borrow().get(name),
            None => JsValue::Undefined,
        }
    }

    pub fn set(&mut self, name: &str, value: JsValue<'a>) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn has_own_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }
}

/// Property read through a value. Only objects carry properties here;
/// anything else raises a TypeError for the evaluator to re-throw.
pub fn get_property<'a>(base: &JsValue<'a>, name: &str) -> Result<JsValue<'a>, JErrorType> {
    match base {
        JsValue::Object(o) => Ok(o.borrow().get(name)),
        _ => Err(JErrorType::TypeError(format!(
            "cannot read property '{}' of {}",
            name, base
        ))),
    }
}

pub fn set_property<'a>(
    base: &JsValue<'a>,
    name: &str,
    value: JsValue<'a>,
) -> Result<(), JErrorType> {
    match base {
        JsValue::Object(o) => {
            o.borrow_mut().set(name, value);
            Ok(())
        }
        _ => Err(JErrorType::TypeError(format!(
            "cannot set property '{}' of {}",
            name, base
        ))),
    }
}
