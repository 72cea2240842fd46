//! OpenAPI wrappers for the domain error payload.
//!
//! `crate::domain::Error` stays free of utoipa derives; these shadow types
//! are registered under the domain names so handler annotations can refer to
//! the real type while the document shows the JSON clients receive.

use utoipa::ToSchema;

/// Error category carried in `code`.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// Malformed input, a free/paid mismatch, or an unverifiable webhook.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// No session cookie, or the session expired.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// The caller does not own the event or lacks the operator role.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// Unknown event or payment.
    #[schema(rename = "not_found")]
    NotFound,
    /// Full, closed, already joined, or still occupied.
    #[schema(rename = "conflict")]
    Conflict,
    /// A backing store or the payment provider is unreachable; retry later.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// Unexpected server failure. The message is always redacted.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// Structured rejection details. `code` is one of the stable rejection kinds
/// such as `event_full`, `already_enrolled`, `not_free` or
/// `provider_unavailable`.
#[derive(ToSchema)]
#[expect(dead_code, reason = "registered for OpenAPI generation only")]
pub struct RejectionDetailsSchema {
    #[schema(example = "event_full")]
    code: String,
}

/// Error body returned by every `/api/v1` route.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(dead_code, reason = "registered for OpenAPI generation only")]
pub struct ErrorSchema {
    #[schema(example = "conflict")]
    code: ErrorCodeSchema,
    #[schema(example = "event is full")]
    message: String,
    /// Matches the `trace-id` response header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    details: Option<RejectionDetailsSchema>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;

    fn rendered<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema renders as JSON")
    }

    #[rstest]
    fn wrappers_register_under_domain_names() {
        assert_eq!(ErrorCodeSchema::name(), "crate.domain.ErrorCode");
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
    }

    #[rstest]
    #[case("\"invalid_request\"")]
    #[case("\"conflict\"")]
    #[case("\"service_unavailable\"")]
    #[case("\"internal_error\"")]
    fn error_code_lists_wire_names(#[case] variant: &str) {
        assert!(rendered::<ErrorCodeSchema>().contains(variant), "missing {variant}");
    }

    #[rstest]
    fn error_body_uses_the_serialised_field_names() {
        let json = rendered::<ErrorSchema>();
        assert!(json.contains("\"traceId\""));
        assert!(!json.contains("\"trace_id\""));
        assert!(json.contains("\"details\""));
    }
}
