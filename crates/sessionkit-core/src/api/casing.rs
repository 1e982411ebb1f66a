//! Key-casing transform between application JSON (camelCase) and the
//! identity provider's wire format (snake_case).
//!
//! Only object keys are rewritten, recursively; values are never touched.
//! Keys named in a preserve list keep their spelling, but their nested
//! values are still transformed.

use serde_json::{Map, Value};

/// `phone_number` -> `phoneNumber`
pub fn camelize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => out,
    }
}

/// `phoneNumber` -> `phone_number`, `HTTPServer` -> `http_server`
pub fn decamelize(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars
                .get(i + 1)
                .map(|n| n.is_ascii_lowercase() || n.is_ascii_digit())
                .unwrap_or(false);
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

pub fn camelize_keys(value: Value, preserve: &[String]) -> Value {
    transform_keys(value, preserve, camelize)
}

pub fn decamelize_keys(value: Value, preserve: &[String]) -> Value {
    transform_keys(value, preserve, decamelize)
}

fn transform_keys(value: Value, preserve: &[String], convert: fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, nested) in map {
                let key = if preserve.iter().any(|p| p == &key) {
                    key
                } else {
                    convert(&key)
                };
                out.insert(key, transform_keys(nested, preserve, convert));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| transform_keys(item, preserve, convert))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decamelize() {
        assert_eq!(decamelize("phoneNumber"), "phone_number");
        assert_eq!(decamelize("grantType"), "grant_type");
        assert_eq!(decamelize("email"), "email");
        assert_eq!(decamelize("HTTPServer"), "http_server");
        assert_eq!(decamelize("avatar2Url"), "avatar2_url");
        assert_eq!(decamelize("already_snake"), "already_snake");
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("access_token"), "accessToken");
        assert_eq!(camelize("created_at"), "createdAt");
        assert_eq!(camelize("scope"), "scope");
        assert_eq!(camelize("Client-Id"), "clientId");
        assert_eq!(camelize("alreadyCamel"), "alreadyCamel");
    }

    #[test]
    fn test_keys_are_reversible() {
        for key in ["accessToken", "passwordConfirmation", "otpCode", "validationHash"] {
            assert_eq!(camelize(&decamelize(key)), key);
        }
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let value = json!({
            "otp": { "phoneNumber": "+1", "validationHash": null },
            "items": [{ "byteSize": 3 }, "plainString"]
        });
        assert_eq!(
            decamelize_keys(value, &[]),
            json!({
                "otp": { "phone_number": "+1", "validation_hash": null },
                "items": [{ "byte_size": 3 }, "plainString"]
            })
        );
    }

    #[test]
    fn test_values_are_untouched() {
        let value = json!({ "grantType": "refresh_token" });
        assert_eq!(
            decamelize_keys(value, &[]),
            json!({ "grant_type": "refresh_token" })
        );
    }

    #[test]
    fn test_preserved_keys_keep_spelling_but_children_transform() {
        let value = json!({ "customData": { "innerKey": 1 }, "otherKey": 2 });
        let preserve = vec!["customData".to_string()];
        assert_eq!(
            decamelize_keys(value, &preserve),
            json!({ "customData": { "inner_key": 1 }, "other_key": 2 })
        );

        let incoming = json!({ "raw_payload": { "x_y": 1 } });
        let preserve = vec!["raw_payload".to_string()];
        assert_eq!(
            camelize_keys(incoming, &preserve),
            json!({ "raw_payload": { "xY": 1 } })
        );
    }
}
