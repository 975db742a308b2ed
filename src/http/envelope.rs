//! Business envelope `{ code, message, data }` wrapping every API response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

/// How a business code is treated by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Expired,
    Failure,
}

/// Maps a business code onto an [`Outcome`] using the configured sentinels.
pub fn classify(code: i64, success_code: i64, expired_code: i64) -> Outcome {
    if code == success_code {
        Outcome::Success
    } else if code == expired_code {
        Outcome::Expired
    } else {
        Outcome::Failure
    }
}

impl Envelope<Value> {
    pub fn from_slice(body: &[u8]) -> Result<Self, ApiError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Unwraps the payload into the caller's type. A missing `data` field
    /// deserializes as JSON `null`, so `()` and `Option<_>` accept it.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.data.unwrap_or(Value::Null))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(0, 0, 401), Outcome::Success);
        assert_eq!(classify(401, 0, 401), Outcome::Expired);
        assert_eq!(classify(2000, 0, 401), Outcome::Failure);
        // The admin console deployment reports success as 200
        assert_eq!(classify(200, 200, 401), Outcome::Success);
        assert_eq!(classify(0, 200, 401), Outcome::Failure);
    }

    #[test]
    fn test_parse_envelope_without_data() {
        let envelope = Envelope::from_slice(r#"{"code":2001,"message":"未授权"}"#.as_bytes()).unwrap();
        assert_eq!(envelope.code, 2001);
        assert_eq!(envelope.message, "未授权");
        assert_eq!(envelope.data, None);
    }

    #[test]
    fn test_parse_non_envelope_fails() {
        assert!(matches!(
            Envelope::from_slice(b"<html>gateway</html>"),
            Err(ApiError::Decode(_))
        ));
        assert!(Envelope::from_slice(br#"{"message":"no code"}"#).is_err());
    }

    #[test]
    fn test_into_data_typed() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct User {
            id: u32,
            username: String,
        }

        let envelope =
            Envelope::from_slice(br#"{"code":0,"message":"","data":{"id":7,"username":"admin"}}"#)
                .unwrap();
        let user: User = envelope.into_data().unwrap();
        assert_eq!(
            user,
            User {
                id: 7,
                username: "admin".to_string()
            }
        );
    }

    #[test]
    fn test_into_data_unit_when_missing() {
        let envelope = Envelope::from_slice(br#"{"code":0,"message":"ok"}"#).unwrap();
        let _unit: () = envelope.clone().into_data().unwrap();
        let none: Option<u32> = envelope.into_data().unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_into_data_type_mismatch() {
        let envelope = Envelope::from_slice(br#"{"code":0,"data":"text"}"#).unwrap();
        let result: Result<u32, _> = envelope.into_data();
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }
}
