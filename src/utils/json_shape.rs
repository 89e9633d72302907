//! JSON shape helpers used by the dual-mode decoder.

use serde_ignored::Path;
use serde_json::Value;

/// True for null, false, 0, "", [] and objects whose members are all zero.
pub fn is_zero(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.values().all(is_zero),
    }
}

/// Render a path reported by [`serde_ignored`] the way error messages show it:
/// `choices[0].delta.foo`.
pub fn ignored_path(path: &Path<'_>) -> String {
    match path {
        Path::Root => String::new(),
        Path::Seq { parent, index } => format!("{}[{}]", ignored_path(parent), index),
        Path::Map { parent, key } => match ignored_path(parent) {
            p if p.is_empty() => key.clone(),
            p => format!("{}.{}", p, key),
        },
        Path::Some { parent }
        | Path::NewtypeStruct { parent }
        | Path::NewtypeVariant { parent } => ignored_path(parent),
    }
}
