//! Small helpers over `serde_json::Value` for the hand-written `Deserialize`
//! impls that can't be expressed as `#[derive(Deserialize)]` field attributes
//! — currently just `wire::problem::AcmeProblem`, which decodes from the
//! already-buffered `Value` rather than the deserializer directly so it can
//! keep the full document around in `raw`.

use serde_json::Value;

use crate::error::{AcmeError, AcmeResult};

pub fn string_val(value: &Value, key: &'static str) -> AcmeResult<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(AcmeError::MissingExpectedField(key))
}

pub fn opt_string_val(value: &Value, key: &'static str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_val_missing_key_errors() {
        assert!(string_val(&json!({}), "type").is_err());
    }

    #[test]
    fn opt_string_val_missing_key_is_none() {
        assert_eq!(opt_string_val(&json!({}), "detail"), None);
    }
}
