//! Error mapping for service-specific APIs
//!
//! Converts provider error payloads into the normalized `ServiceError`.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

fn by_status(status: StatusCode, message: impl Into<String>) -> ServiceError {
    let message = message.into();
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::BAD_REQUEST => ServiceError::validation(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        _ => ServiceError::service(message),
    }
}

/// Map an OpenAI-compatible API error to a ServiceError
pub fn map_openai_error(status: StatusCode, json: &Value, context: &mut ErrorContext) -> ServiceError {
    context.service = "openai".to_string();

    if let Some(error) = json.get("error") {
        if let Some(error_type) = error.get("type").and_then(|t| t.as_str()) {
            context.add("error_type", error_type);
        }

        if let Some(code) = error.get("code").and_then(|c| c.as_str()) {
            context.error_code = Some(code.to_string());
        }

        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown OpenAI error");

        return by_status(status, message);
    }

    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error");
    by_status(status, message)
}

/// Map a Google API (YouTube Data) error to a ServiceError
///
/// Google reports quota exhaustion as 403 with reason `quotaExceeded`, which
/// is a rate limit rather than a permission problem.
pub fn map_youtube_error(status: StatusCode, json: &Value, context: &mut ErrorContext) -> ServiceError {
    context.service = "youtube".to_string();

    let error = json.get("error");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown YouTube API error");

    let reason = error
        .and_then(|e| e.get("errors"))
        .and_then(|errs| errs.get(0))
        .and_then(|first| first.get("reason"))
        .and_then(|r| r.as_str());

    if let Some(reason) = reason {
        context.error_code = Some(reason.to_string());
        if matches!(reason, "quotaExceeded" | "rateLimitExceeded" | "dailyLimitExceeded") {
            return ServiceError::rate_limit(message);
        }
    }

    by_status(status, message)
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match context.service.as_str() {
            "openai" => return map_openai_error(status, &json, context),
            "youtube" => return map_youtube_error(status, &json, context),
            _ => {
                let message = json
                    .get("message")
                    .or_else(|| json.get("error"))
                    .and_then(|m| m.as_str())
                    .unwrap_or(body);
                return by_status(status, message);
            }
        }
    }

    let message = if body.is_empty() {
        status.to_string()
    } else if body.len() > 100 {
        format!("{}: {}", status, crate::util::truncate_string(body, 100))
    } else {
        format!("{}: {}", status, body)
    };

    by_status(status, message)
}

/// Classify HTTP errors by category, used as log/context metadata
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_openai_rate_limit_maps_to_rate_limit() {
        let mut ctx = ErrorContext::for_service("openai");
        let body = json!({"error": {"message": "slow down", "type": "requests", "code": "rate_limit_exceeded"}});
        let err = map_openai_error(StatusCode::TOO_MANY_REQUESTS, &body, &mut ctx);
        assert!(matches!(err, ServiceError::RateLimit(_)));
        assert_eq!(ctx.error_code.as_deref(), Some("rate_limit_exceeded"));
    }

    #[test]
    fn test_youtube_quota_is_rate_limit() {
        let mut ctx = ErrorContext::for_service("youtube");
        let body = json!({
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]
            }
        });
        let err = map_youtube_error(StatusCode::FORBIDDEN, &body, &mut ctx);
        assert!(matches!(err, ServiceError::RateLimit(_)));
        assert_eq!(ctx.error_code.as_deref(), Some("quotaExceeded"));
    }

    #[test]
    fn test_plain_text_body_falls_back_to_status() {
        let mut ctx = ErrorContext::for_service("openai");
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream crashed", &mut ctx);
        assert!(matches!(err, ServiceError::Service(ref m) if m.contains("upstream crashed")));
    }

    #[test]
    fn test_classify_http_error() {
        assert_eq!(classify_http_error(StatusCode::TOO_MANY_REQUESTS), "rate_limit");
        assert_eq!(classify_http_error(StatusCode::SERVICE_UNAVAILABLE), "server");
        assert_eq!(classify_http_error(StatusCode::IM_A_TEAPOT), "unknown");
    }
}
