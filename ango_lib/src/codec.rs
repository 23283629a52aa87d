//! Checks payload values against the parameter types declared in a service.

use ango_idl::{Builtin, Param, Type, TypeKind};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::values::Values;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected an object of named values, found {0}")]
    NotAnObject(&'static str),
    #[error("`{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

/// Builds the values for `params` out of a payload object.
///
/// Missing values get the zero value of their type, values that are not
/// declared are dropped and declared values must match their type.
pub fn conform(params: &[Param], data: Option<Value>) -> Result<Values, CodecError> {
    let mut fields = match data {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(fields)) => fields,
        Some(other) => return Err(CodecError::NotAnObject(kind_name(&other))),
    };

    let mut values = Values::new();
    for param in params {
        let value = match fields.remove(param.name.as_str()) {
            Some(value) => {
                check(&param.ty, &value, param.name.as_str())?;
                value
            }
            None => zero_value(&param.ty),
        };
        values.insert_value(param.name.as_str(), value);
    }
    Ok(values)
}

/// Procedure parameters always have builtin types.
pub fn zero_value(ty: &Type) -> Value {
    match &ty.kind {
        TypeKind::Builtin(Builtin::String) => Value::String(String::new()),
        TypeKind::Builtin(Builtin::Bool) => Value::Bool(false),
        TypeKind::Builtin(_) => Value::from(0),
        _ => Value::Null,
    }
}

fn check(ty: &Type, value: &Value, path: &str) -> Result<(), CodecError> {
    match &ty.kind {
        TypeKind::Builtin(builtin) if builtin_accepts(*builtin, value) => Ok(()),
        _ => Err(CodecError::TypeMismatch {
            path: path.to_owned(),
            expected: ty.name.to_string(),
            found: kind_name(value).to_owned(),
        }),
    }
}

fn builtin_accepts(builtin: Builtin, value: &Value) -> bool {
    match builtin {
        Builtin::String => value.is_string(),
        Builtin::Bool => value.is_boolean(),
        _ => match value {
            Value::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from))
                .map_or(false, |n| in_range(builtin, n)),
            _ => false,
        },
    }
}

fn in_range(builtin: Builtin, n: i128) -> bool {
    builtin
        .int_range()
        .map_or(false, |(min, max)| (min..=max).contains(&n))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ango_idl::{parse_str, types::builtin_type, Identifier};
    use serde_json::json;

    use super::*;

    fn param(name: &str, ty: Arc<Type>) -> Param {
        Param {
            name: Identifier::from(name),
            ty,
        }
    }

    #[test]
    fn fills_missing_values_and_drops_unknown_ones() {
        let params = [
            param("a", builtin_type(Builtin::Int)),
            param("text", builtin_type(Builtin::String)),
        ];
        let values = conform(&params, Some(json!({ "a": 4, "extra": true }))).unwrap();
        assert_eq!(json!({ "a": 4, "text": "" }), values.into_value());

        let values = conform(&params, None).unwrap();
        assert_eq!(json!({ "a": 0, "text": "" }), values.into_value());
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(
            Err(CodecError::NotAnObject("array")),
            conform(&[], Some(json!([1, 2])))
        );
    }

    #[test]
    fn integer_ranges() {
        let params = [param("n", builtin_type(Builtin::Uint8))];
        assert!(conform(&params, Some(json!({ "n": 255 }))).is_ok());
        assert!(conform(&params, Some(json!({ "n": 256 }))).is_err());
        assert!(conform(&params, Some(json!({ "n": -1 }))).is_err());
        assert!(conform(&params, Some(json!({ "n": 1.5 }))).is_err());

        let params = [param("n", builtin_type(Builtin::Uint64))];
        assert!(conform(&params, Some(json!({ "n": u64::MAX }))).is_ok());
        let params = [param("n", builtin_type(Builtin::Int64))];
        assert!(conform(&params, Some(json!({ "n": u64::MAX }))).is_err());
    }

    #[test]
    fn mismatches_name_the_value() {
        let params = [
            param("text", builtin_type(Builtin::String)),
            param("n", builtin_type(Builtin::Int32)),
        ];
        assert_eq!(
            Err(CodecError::TypeMismatch {
                path: "n".to_owned(),
                expected: "int32".to_owned(),
                found: "string".to_owned(),
            }),
            conform(&params, Some(json!({ "text": "hi", "n": "3" })))
        );
        assert!(conform(&params, Some(json!({ "text": null }))).is_err());
    }

    #[test]
    fn declared_parameter_types_come_from_the_parser() {
        let service = parse_str("name x\nserver set(flag uint8, label string)").unwrap();
        let procedure = &service.server_procedures["set"];
        let values = conform(&procedure.args, Some(json!({ "flag": 7 }))).unwrap();
        assert_eq!(json!({ "flag": 7, "label": "" }), values.into_value());
    }
}
