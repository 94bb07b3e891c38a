use crate::value::{TomlTable, TomlValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// A generic, serde-serializable mirror of the document tree, used by the
/// JSON and YAML export surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

pub(crate) fn to_value(value: &TomlValue) -> Value {
    match value {
        TomlValue::String(s) => Value::String(s.clone()),
        TomlValue::Integer { value, .. } => Value::Integer(*value),
        TomlValue::Float { value, .. } => Value::Float(*value),
        TomlValue::Boolean(b) => Value::Boolean(*b),
        TomlValue::Array(values) => Value::Array(values.iter().map(to_value).collect()),
        TomlValue::Table(table) => table_to_value(table),
        TomlValue::TableArray(elements) => {
            Value::Array(elements.iter().map(table_to_value).collect())
        }
    }
}

pub(crate) fn table_to_value(table: &TomlTable) -> Value {
    let mut map = BTreeMap::new();
    for (key, entry) in table.iter() {
        map.insert(key.to_string(), to_value(&entry.value));
    }
    Value::Object(map)
}
