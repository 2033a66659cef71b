//! `{ error, result }` envelope for callers that talk JSON
use crate::numerical::errors::{EngineError, ErrorKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T: Serialize> {
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T: Serialize> Response<T> {
    pub fn ok(result: T) -> Self {
        Response {
            error: None,
            error_kind: None,
            result: Some(result),
        }
    }

    pub fn failed(error: &EngineError) -> Self {
        Response {
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            result: None,
        }
    }

    pub fn from_result(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::failed(&e),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::solve_result::DataSet;

    #[test]
    fn test_error_envelope() {
        let response = Response::from_result(DataSet::new(vec![1.0, 2.0], vec![1.0]));
        assert!(!response.is_ok());
        assert_eq!(response.error_kind, Some(ErrorKind::InsufficientData));
        let json: serde_json::Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert!(json["error"].is_string());
        assert_eq!(json["error_kind"], "InsufficientData");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_ok_envelope() {
        let response = Response::from_result(DataSet::new(vec![1.0, 2.0], vec![3.0, 4.0]));
        assert!(response.is_ok());
        let json: serde_json::Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert!(json["error"].is_null());
        assert_eq!(json["result"]["y"][1], 4.0);
    }
}
