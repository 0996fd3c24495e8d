//! tRPC response envelopes.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<ResultBody>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    data: Option<ErrorData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorData {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    http_status: Option<u16>,
}

/// Unwrap `{"result":{"data":...}}` or turn `{"error":{...}}` into a procedure error.
///
/// `status` is the HTTP status of the response; bodies that carry neither
/// envelope are reported as unexpected responses.
pub(crate) fn decode<O: DeserializeOwned>(
    procedure: &str,
    status: u16,
    body: Value,
) -> GatewayResult<O> {
    let unexpected = || GatewayError::UnexpectedResponse {
        procedure: procedure.to_string(),
        status,
    };

    let envelope: Envelope = serde_json::from_value(body).map_err(|_| unexpected())?;

    if let Some(error) = envelope.error {
        let data = error.data.unwrap_or(ErrorData {
            code: None,
            http_status: None,
        });
        let code = data
            .code
            .or_else(|| error.code.map(|code| code.to_string()))
            .unwrap_or_else(|| "INTERNAL_SERVER_ERROR".to_string());

        return Err(GatewayError::Procedure {
            procedure: procedure.to_string(),
            code,
            status: data.http_status.or(Some(status)),
            message: error.message,
        });
    }

    match envelope.result {
        Some(result) => Ok(serde_json::from_value(result.data)?),
        None => Err(unexpected()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_success() {
        let body = json!({"result": {"data": [1, 2, 3]}});
        let numbers: Vec<u32> = decode("chat.test", 200, body).unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_missing_data_as_unit() {
        let body = json!({"result": {}});
        assert!(decode::<()>("chat.deleteMessage", 200, body).is_ok());
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = json!({
            "error": {
                "message": "Message not found",
                "code": -32004,
                "data": {"code": "NOT_FOUND", "httpStatus": 404}
            }
        });
        let err = decode::<Value>("chat.updateMessage", 404, body).unwrap_err();
        match err {
            GatewayError::Procedure {
                code,
                status,
                message,
                ..
            } => {
                assert_eq!(code, "NOT_FOUND");
                assert_eq!(status, Some(404));
                assert_eq!(message, "Message not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_without_data_uses_numeric_code() {
        let body = json!({"error": {"message": "boom", "code": -32603}});
        let err = decode::<Value>("chat.getConversations", 500, body).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Procedure { ref code, status: Some(500), .. } if code == "-32603"
        ));
    }

    #[test]
    fn test_decode_foreign_body() {
        let err = decode::<Value>("chat.getConversations", 502, json!("Bad gateway")).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UnexpectedResponse { status: 502, .. }
        ));
    }
}
