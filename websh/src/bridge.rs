//! Conversion between host values and engine values.
//!
//! Only the shapes the capability surface needs are bridged: booleans,
//! strings, lists and string-keyed records. Numbers, `null`, `undefined` and
//! functions are rejected by [`from_engine`]; script functions are handled by
//! the callback helpers in [`crate::dispatch`].

use crate::error::CapabilityError;
use indexmap::IndexMap;
use rquickjs::convert::Coerced;
use rquickjs::{Array, Ctx, Object, Value};
use serde::Serialize;

/// Records nested deeper than this are treated as cyclic.
const MAX_DEPTH: usize = 64;

/// A host value with a lossless mapping to an engine value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BridgedValue {
    Bool(bool),
    String(String),
    List(Vec<BridgedValue>),
    Record(IndexMap<String, BridgedValue>),
}

impl BridgedValue {
    pub fn empty_record() -> Self {
        Self::Record(IndexMap::new())
    }

    #[cfg(test)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn field(&self, key: &str) -> Option<&BridgedValue> {
        match self {
            Self::Record(fields) => fields.get(key),
            _ => None,
        }
    }
}

impl From<bool> for BridgedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for BridgedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for BridgedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<T: Into<BridgedValue>> From<Vec<T>> for BridgedValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Build the engine value for `value`.
///
/// Element order of lists and records is preserved and every element
/// assignment is checked.
pub fn to_engine<'js>(ctx: &Ctx<'js>, value: &BridgedValue) -> rquickjs::Result<Value<'js>> {
    let converted = match value {
        BridgedValue::Bool(b) => Value::new_bool(ctx.clone(), *b),
        BridgedValue::String(s) => rquickjs::String::from_str(ctx.clone(), s)?.into_value(),
        BridgedValue::List(items) => {
            let array = Array::new(ctx.clone())?;
            for (index, item) in items.iter().enumerate() {
                array.set(index, to_engine(ctx, item)?)?;
            }
            array.into_value()
        }
        BridgedValue::Record(fields) => {
            let object = Object::new(ctx.clone())?;
            for (key, field) in fields {
                object.set(key.as_str(), to_engine(ctx, field)?)?;
            }
            object.into_value()
        }
    };
    Ok(converted)
}

/// Read an engine value back into a [`BridgedValue`].
pub fn from_engine(value: &Value<'_>) -> Result<BridgedValue, CapabilityError> {
    from_engine_at(value, 0)
}

fn from_engine_at(value: &Value<'_>, depth: usize) -> Result<BridgedValue, CapabilityError> {
    if depth > MAX_DEPTH {
        return Err(mismatch("value", value, "acyclic value"));
    }
    if let Some(b) = value.as_bool() {
        return Ok(BridgedValue::Bool(b));
    }
    if let Some(s) = value.as_string() {
        return Ok(BridgedValue::String(s.to_string()?));
    }
    if let Some(array) = value.as_array() {
        let mut items = Vec::with_capacity(array.len());
        for item in array.iter::<Value>() {
            items.push(from_engine_at(&item?, depth + 1)?);
        }
        return Ok(BridgedValue::List(items));
    }
    if value.is_function() {
        return Err(mismatch("value", value, "boolean, string, array or object"));
    }
    if let Some(object) = value.as_object() {
        let mut fields = IndexMap::new();
        for prop in object.props::<String, Value>() {
            let (key, field) = prop?;
            let bridged = from_engine_at(&field, depth + 1)?;
            fields.insert(key, bridged);
        }
        return Ok(BridgedValue::Record(fields));
    }
    Err(mismatch("value", value, "boolean, string, array or object"))
}

/// Stringify `value` the way the engine does (`String(value)`).
pub fn coerce_string(value: &Value<'_>) -> rquickjs::Result<String> {
    Ok(value.get::<Coerced<String>>()?.0)
}

pub(crate) fn mismatch(context: &str, value: &Value<'_>, expected: &'static str) -> CapabilityError {
    CapabilityError::TypeMismatch {
        context: context.to_string(),
        expected,
        found: value.type_name().to_string(),
    }
}
