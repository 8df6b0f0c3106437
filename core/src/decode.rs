//! JSON decoding of response bodies into caller-owned targets.

use serde::de::DeserializeOwned;

/// A value a response body can be decoded into.
///
/// Implemented for every `DeserializeOwned` type, which lets the request
/// hold `&mut T` behind a trait object while `T` stays chosen at the call
/// site.
pub trait DecodeTarget {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()>;
}

impl<T: DeserializeOwned> DecodeTarget for T {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }
}

/// Decode `body` into `target`. An absent target is a successful no-op.
pub fn decode(body: &[u8], target: Option<&mut dyn DecodeTarget>) -> serde_json::Result<()> {
    match target {
        Some(target) => target.decode_json(body),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct User {
        id: i64,
        user_name: String,
    }

    #[test]
    fn decodes_into_struct() {
        let mut user = User::default();
        decode(br#"{"id":99,"user_name":"X"}"#, Some(&mut user)).unwrap();
        assert_eq!(
            user,
            User {
                id: 99,
                user_name: "X".to_string()
            }
        );
    }

    #[test]
    fn absent_target_ignores_body() {
        assert!(decode(b"definitely not json", None).is_ok());
    }

    #[test]
    fn malformed_body_leaves_target_untouched() {
        let mut user = User {
            id: 1,
            user_name: "kept".to_string(),
        };
        let err = decode(b"{\"id\":", Some(&mut user)).unwrap_err();
        assert!(err.is_eof());
        assert_eq!(user.id, 1);
        assert_eq!(user.user_name, "kept");
    }

    #[test]
    fn decodes_into_dynamic_value() {
        let mut value = serde_json::Value::Null;
        decode(br#"[1,2,3]"#, Some(&mut value)).unwrap();
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }
}
