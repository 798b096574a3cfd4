// Copyright (c) 2022-2023 The MobileCoin Foundation

//! JSON-RPC 2.0 envelopes carried inside encrypted messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// JSON-RPC protocol version string
pub const JSONRPC_VERSION: &str = "2.0";

/// Authorization request declined, or auth token invalid / revoked
pub const ERROR_AUTHORIZATION_FAILED: i32 = -1;
/// One or more payloads were invalid
pub const ERROR_INVALID_PAYLOADS: i32 = -2;
/// One or more payloads were not signed (user declined)
pub const ERROR_NOT_SIGNED: i32 = -3;
/// One or more transactions were signed but not submitted
pub const ERROR_NOT_SUBMITTED: i32 = -4;
/// More payloads than the wallet accepts per request
pub const ERROR_TOO_MANY_PAYLOADS: i32 = -5;
/// Origin attestation required (android)
pub const ERROR_ATTEST_ORIGIN_ANDROID: i32 = -100;

/// Invalid JSON
pub const ERROR_PARSE: i32 = -32700;
/// Not a valid request object
pub const ERROR_INVALID_REQUEST: i32 = -32600;
/// Method does not exist
pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameters
pub const ERROR_INVALID_PARAMS: i32 = -32602;
/// Internal error
pub const ERROR_INTERNAL: i32 = -32603;

/// JSON-RPC request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// Create a new request
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create a new error object
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach error data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// JSON-RPC response, carrying either a result or an error
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Create a success response
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response (`id` is `None` where the request could not be parsed)
    pub fn err(id: Option<u64>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Convert into a result, an absent `result` field decodes as `null`
    pub fn into_result(self) -> Result<Value, RpcError> {
        match (self.result, self.error) {
            (_, Some(e)) => Err(e),
            (Some(r), None) => Ok(r),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Encode an RPC object to UTF-8 JSON
pub fn to_bytes<T: Serialize>(v: &T) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(v)?)
}

/// Decode an RPC object from UTF-8 JSON
pub fn from_bytes<'a, T: Deserialize<'a>>(b: &'a [u8]) -> Result<T, Error> {
    Ok(serde_json::from_slice(b)?)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_envelope() {
        let r = Request::new(1, "get_capabilities", json!({}));
        let b = to_bytes(&r).unwrap();
        let v: Value = serde_json::from_slice(&b).unwrap();

        assert_eq!(
            v,
            json!({"jsonrpc": "2.0", "id": 1, "method": "get_capabilities", "params": {}})
        );
    }

    #[test]
    fn response_error() {
        let b = br#"{"jsonrpc":"2.0","id":4,"error":{"code":-1,"message":"declined"}}"#;
        let r: Response = from_bytes(b).unwrap();

        assert_eq!(r.id, Some(4));
        assert_eq!(
            r.into_result(),
            Err(RpcError::new(ERROR_AUTHORIZATION_FAILED, "declined"))
        );
    }

    #[test]
    fn response_result() {
        let b = br#"{"jsonrpc":"2.0","id":2,"result":{}}"#;
        let r: Response = from_bytes(b).unwrap();
        assert_eq!(r.into_result(), Ok(json!({})));
    }
}
