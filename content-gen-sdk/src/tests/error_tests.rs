//! Tests for error handling
//!
//! These tests verify the transport error type, its context wrapper and the
//! pipeline's retryable/terminal classification.

#[cfg(test)]
mod tests {
    use crate::error::{
        ErrorContext, PipelineError, Result, ServiceError, ValidationError, VerificationError,
    };

    #[test]
    fn test_service_error_creation() {
        let network_err = ServiceError::network("Connection failed");
        let auth_err = ServiceError::authentication("Invalid credentials");
        let rate_limit_err = ServiceError::rate_limit("Too many requests");

        assert_eq!(network_err.to_string(), "Network error: Connection failed");
        assert_eq!(auth_err.to_string(), "Authentication error: Invalid credentials");
        assert_eq!(rate_limit_err.to_string(), "Rate limit exceeded: Too many requests");
        assert_eq!(
            ServiceError::empty_response("no choices").to_string(),
            "Empty response: no choices"
        );
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::for_service("youtube")
            .status_code(403)
            .error_code("quotaExceeded")
            .endpoint("videos")
            .with("attempt", 3);
        assert_eq!(context.data.get("attempt").map(String::as_str), Some("3"));

        let err = ServiceError::rate_limit("quota").with_context(context);

        assert_eq!(err.service_name(), Some("youtube"));
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(err.error_code(), Some("quotaExceeded"));
        assert!(matches!(err.root(), ServiceError::RateLimit(_)));
        assert_eq!(err.to_string(), "Rate limit exceeded: quota");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: ServiceError = parse.unwrap_err().into();
        assert!(matches!(err.root(), ServiceError::Parsing(_)));
        assert_eq!(err.service_name(), Some("json"));
    }

    #[test]
    fn test_pipeline_error_classification() {
        let retryable: Vec<PipelineError> = vec![
            ServiceError::network("down").into(),
            PipelineError::normalization("no object"),
            ValidationError::Parse("eof".to_string()).into(),
            ValidationError::MissingField("steps[0].title".to_string()).into(),
            ValidationError::InvalidIdentifier {
                field: "youtubeId".to_string(),
                value: "abc".to_string(),
            }
            .into(),
            VerificationError::NotFound("dQw4w9WgXcQ".to_string()).into(),
            VerificationError::LowQuality {
                id: "dQw4w9WgXcQ".to_string(),
                views: 10,
                minimum: 100_000,
            }
            .into(),
            VerificationError::FormatMismatch("http thumbnail".to_string()).into(),
        ];
        for err in &retryable {
            assert!(err.is_retryable(), "{} should be retryable", err);
        }

        for err in [PipelineError::configuration("missing topic"), PipelineError::Cancelled] {
            assert!(!err.is_retryable(), "{} should be terminal", err);
        }

        // authentication failures are still upstream failures of one attempt
        let auth: PipelineError = ServiceError::authentication("bad key").into();
        assert!(auth.is_upstream());
        assert!(auth.is_retryable());
    }

    #[test]
    fn test_kinds_and_reasons() {
        assert_eq!(ValidationError::MissingField("title".to_string()).kind(), "missing_field");
        assert_eq!(VerificationError::NotFound("x".to_string()).kind(), "not_found");

        let not_found: PipelineError = VerificationError::NotFound("x".to_string()).into();
        assert_eq!(not_found.kind(), "not_found");
        let upstream: PipelineError = ServiceError::timeout("slow").into();
        assert_eq!(upstream.kind(), "upstream");
        assert_eq!(PipelineError::normalization("none").kind(), "normalization");
        assert_eq!(PipelineError::Cancelled.kind(), "cancelled");

        let err: PipelineError = VerificationError::LowQuality {
            id: "dQw4w9WgXcQ".to_string(),
            views: 99,
            minimum: 100_000,
        }
        .into();
        let reason = err.reason();
        assert!(reason.contains("failed verification"));
        assert!(reason.contains("99 views"));

        assert_eq!(
            PipelineError::configuration("unknown content type").reason(),
            "Invalid request: unknown content type"
        );
    }

    #[test]
    fn test_result_type() {
        fn might_fail(fail: bool) -> Result<i32> {
            if fail {
                return Err(ServiceError::parsing("Invalid number"));
            }
            Ok(42)
        }

        fn pipeline_step() -> std::result::Result<i32, PipelineError> {
            Ok(might_fail(true)?)
        }

        assert_eq!(might_fail(false).unwrap(), 42);
        assert!(matches!(pipeline_step(), Err(PipelineError::Upstream(_))));
    }
}
