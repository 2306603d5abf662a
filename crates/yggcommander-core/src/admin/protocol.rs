//! JSON-RPC 2.0 wire types and response framing for the admin socket.
//!
//! Requests are a single JSON object followed by `\n`. Responses carry no
//! length header and may or may not end with a newline, so a response is
//! complete once the bytes received so far hold one whole JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC request. Built once per call and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    jsonrpc: String,
    id: u64,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<Map<String, Value>>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.params.as_ref()
    }

    /// Serialize as one JSON object terminated by a newline.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// What the daemon answered: exactly one of a result or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    Result(Value),
    Error(Value),
}

/// A decoded JSON-RPC response.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: Option<String>,
    pub id: Value,
    pub outcome: RpcOutcome,
}

impl RpcResponse {
    pub fn success(id: impl Into<Value>, result: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: id.into(),
            outcome: RpcOutcome::Result(result),
        }
    }

    pub fn failure(id: impl Into<Value>, error: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: id.into(),
            outcome: RpcOutcome::Error(error),
        }
    }

    /// Interpret a response object.
    ///
    /// A non-null `error` wins over a null or missing `result` (older
    /// encoders send both keys). Any other combination that does not leave
    /// exactly one of the two is rejected.
    pub fn from_object(mut obj: Map<String, Value>) -> Result<Self, FrameError> {
        let jsonrpc = obj
            .get("jsonrpc")
            .and_then(Value::as_str)
            .map(str::to_string);
        let id = obj.remove("id").unwrap_or(Value::Null);
        let result = obj.remove("result");
        let error = obj.remove("error").filter(|e| !e.is_null());

        let outcome = match (result, error) {
            (None | Some(Value::Null), Some(error)) => RpcOutcome::Error(error),
            (Some(result), None) => RpcOutcome::Result(result),
            (None, None) => return Err(FrameError::MissingOutcome),
            (Some(_), Some(_)) => return Err(FrameError::AmbiguousOutcome),
        };

        Ok(Self {
            jsonrpc,
            id,
            outcome,
        })
    }

    /// The response as a JSON object, as a daemon would send it.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(version) = &self.jsonrpc {
            obj.insert("jsonrpc".to_string(), Value::String(version.clone()));
        }
        obj.insert("id".to_string(), self.id.clone());
        match &self.outcome {
            RpcOutcome::Result(result) => obj.insert("result".to_string(), result.clone()),
            RpcOutcome::Error(error) => obj.insert("error".to_string(), error.clone()),
        };
        Value::Object(obj)
    }
}

/// Why a response buffer can never become a valid response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("invalid JSON-RPC response: neither result nor error present")]
    MissingOutcome,

    #[error("invalid JSON-RPC response: both result and error present")]
    AmbiguousOutcome,
}

/// Progress of a response buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// The buffer holds a whole response.
    Complete(RpcResponse),
    /// More bytes are needed.
    Incomplete,
}

/// Try to decode a response from everything received so far.
///
/// Only an object counts as a complete frame: an object's closing brace
/// cannot be followed by more of the same value, whereas a bare scalar such
/// as `1` may be the prefix of `12`. Bytes after the first object are
/// ignored. Input that is invalid regardless of what follows is an error.
pub fn decode_response(buf: &[u8]) -> Result<Frame, FrameError> {
    let stream = serde_json::Deserializer::from_slice(buf);
    let mut values = stream.into_iter::<Value>();
    match values.next() {
        None => Ok(Frame::Incomplete),
        Some(Err(e)) if e.is_eof() => Ok(Frame::Incomplete),
        Some(Err(e)) => Err(FrameError::Malformed(e.to_string())),
        Some(Ok(Value::Object(obj))) => RpcResponse::from_object(obj).map(Frame::Complete),
        Some(Ok(_)) => Err(FrameError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_request_encoding_is_newline_terminated() {
        let mut params = Map::new();
        params.insert("uri".to_string(), json!("tcp://example.com:9001"));
        let request = RpcRequest::new(1, "addPeer", Some(params));

        let bytes = request.encode().unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);

        let sent: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            sent,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "addPeer",
                "params": {"uri": "tcp://example.com:9001"}
            })
        );
    }

    #[test]
    fn test_request_without_params_omits_key() {
        let bytes = RpcRequest::new(1, "getSelf", None).encode().unwrap();
        let sent: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(sent.get("params").is_none());
    }

    #[test]
    fn test_request_parsed_by_peer_matches() {
        let mut params = Map::new();
        params.insert("limit".to_string(), json!(5));
        let request = RpcRequest::new(7, "getPeers", Some(params));
        let parsed: RpcRequest = serde_json::from_slice(&request.encode().unwrap()).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_decode_complete_result() {
        let buf = br#"{"jsonrpc":"2.0","id":1,"result":{"address":"200:1234::1"}}"#;
        let frame = decode_response(buf).unwrap();
        assert_eq!(
            frame,
            Frame::Complete(RpcResponse::success(1, json!({"address": "200:1234::1"})))
        );
    }

    #[test]
    fn test_decode_accepts_trailing_newline() {
        let buf = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":[]}\n";
        assert!(matches!(decode_response(buf), Ok(Frame::Complete(_))));
    }

    #[test]
    fn test_decode_every_prefix_is_incomplete() {
        let full = br#"{"jsonrpc":"2.0","id":12,"result":{"peers":[{"uri":"tcp://a:1"}]}}"#;
        for end in 0..full.len() {
            assert_eq!(
                decode_response(&full[..end]),
                Ok(Frame::Incomplete),
                "prefix of length {end}"
            );
        }
        assert!(matches!(decode_response(full), Ok(Frame::Complete(_))));
    }

    #[test]
    fn test_decode_rejects_bare_scalar() {
        assert_eq!(decode_response(b"12 "), Err(FrameError::NotAnObject));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_response(b"HTTP/1.1 400 Bad Request"),
            Err(FrameError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_error_response() {
        let buf = br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"unknown method"}}"#;
        let Frame::Complete(response) = decode_response(buf).unwrap() else {
            panic!("expected complete frame");
        };
        assert_eq!(
            response.outcome,
            RpcOutcome::Error(json!({"code": -32601, "message": "unknown method"}))
        );
    }

    #[test]
    fn test_null_error_alongside_result_is_a_result() {
        let obj = json!({"id": 1, "result": {"ok": true}, "error": null});
        let Value::Object(obj) = obj else {
            unreachable!()
        };
        let response = RpcResponse::from_object(obj).unwrap();
        assert_eq!(response.outcome, RpcOutcome::Result(json!({"ok": true})));
    }

    #[test]
    fn test_null_result_is_a_valid_result() {
        let obj = json!({"id": 1, "result": null});
        let Value::Object(obj) = obj else {
            unreachable!()
        };
        let response = RpcResponse::from_object(obj).unwrap();
        assert_eq!(response.outcome, RpcOutcome::Result(Value::Null));
    }

    #[test]
    fn test_missing_and_ambiguous_outcomes() {
        let Value::Object(neither) = json!({"jsonrpc": "2.0", "id": 1}) else {
            unreachable!()
        };
        assert_eq!(
            RpcResponse::from_object(neither),
            Err(FrameError::MissingOutcome)
        );

        let Value::Object(both) = json!({"id": 1, "result": 1, "error": {"code": 1}}) else {
            unreachable!()
        };
        assert_eq!(
            RpcResponse::from_object(both),
            Err(FrameError::AmbiguousOutcome)
        );
    }

    #[test]
    fn test_response_value_round_trip() {
        let response = RpcResponse::failure(3, json!({"code": -1, "message": "nope"}));
        let bytes = serde_json::to_vec(&response.to_value()).unwrap();
        assert_eq!(decode_response(&bytes), Ok(Frame::Complete(response)));
    }

    // Floats are left out: their text form does not always parse back to
    // the same Number.
    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            any::<u64>().prop_map(Value::from),
            any::<String>().prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec((any::<String>(), inner), 0..4)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    fn arb_params() -> impl Strategy<Value = Option<Map<String, Value>>> {
        proptest::option::of(
            prop::collection::vec(("[a-zA-Z_]{1,12}", arb_json()), 0..5)
                .prop_map(|entries| entries.into_iter().collect::<Map<String, Value>>()),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// Any request survives the trip to a daemon, and the daemon's
        /// success reply decodes to the same result, only once complete.
        #[test]
        fn prop_request_reply_round_trip(
            id in any::<u64>(),
            method in any::<String>(),
            params in arb_params(),
            result in arb_json(),
        ) {
            let request = RpcRequest::new(id, method, params);
            let bytes = request.encode().unwrap();
            prop_assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);

            let received: RpcRequest = serde_json::from_slice(&bytes).unwrap();
            prop_assert_eq!(&received, &request);

            let reply = RpcResponse::success(received.id(), result.clone()).to_value();
            let wire = serde_json::to_vec(&reply).unwrap();
            for end in 0..wire.len() {
                prop_assert_eq!(decode_response(&wire[..end]), Ok(Frame::Incomplete));
            }
            prop_assert_eq!(
                decode_response(&wire),
                Ok(Frame::Complete(RpcResponse::success(id, result)))
            );
        }
    }
}
