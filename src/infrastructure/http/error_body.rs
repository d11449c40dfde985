//! 非 2xx 响应体的错误消息提取
//!
//! 依次尝试 `detail`、`message`、`error`；
//! `detail` 可能是字符串，也可能是 `[{ "msg": ... }]` 形式的校验错误列表。

use serde_json::Value;

use crate::application::ports::ApiError;

/// 从响应体中提取服务端错误消息
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;

    if let Some(detail) = object.get("detail") {
        if let Some(message) = detail_message(detail) {
            return Some(message);
        }
    }

    ["message", "error"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

/// 非 2xx 响应转换为 ApiError
pub fn status_error(status: u16, body: &[u8]) -> ApiError {
    let message = extract_message(body).unwrap_or_else(|| format!("request failed: {}", status));
    ApiError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        value.to_string().into_bytes()
    }

    #[test]
    fn test_detail_string() {
        let err = status_error(400, &body(json!({"detail": "Novel title already exists"})));
        assert_eq!(
            err,
            ApiError::Status {
                status: 400,
                message: "Novel title already exists".to_string()
            }
        );
    }

    #[test]
    fn test_detail_validation_list() {
        let err = status_error(
            422,
            &body(json!({"detail": [
                {"loc": ["body", "title"], "msg": "field required"},
                {"loc": ["body", "genre"], "msg": "too long"}
            ]})),
        );
        assert_eq!(err.to_string(), "field required; too long");
    }

    #[test]
    fn test_message_then_error_keys() {
        assert_eq!(
            extract_message(&body(json!({"message": "quota exceeded"}))),
            Some("quota exceeded".to_string())
        );
        assert_eq!(
            extract_message(&body(json!({"error": "bad gateway"}))),
            Some("bad gateway".to_string())
        );
    }

    #[test]
    fn test_fallback_for_unstructured_body() {
        assert_eq!(status_error(502, b"<html>oops</html>").to_string(), "request failed: 502");
        assert_eq!(status_error(500, b"").to_string(), "request failed: 500");
        assert_eq!(
            status_error(404, &body(json!({"detail": null}))).to_string(),
            "request failed: 404"
        );
    }
}
