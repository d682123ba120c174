//! Error classification logic

/// Map an upstream HTTP status to a stable error class for log fields.
///
/// Classes follow the usual chat-completion provider conventions. Every class
/// is fallbackable here: the alternate backend has its own credentials, quota
/// and model, so even an auth or bad-request failure on one side may succeed
/// on the other.
pub(crate) fn class_for_status(status: u16) -> &'static str {
    match status {
        400 | 422 => "invalid_request",
        401 => "authentication",
        402 => "quota_exhausted",
        403 => "permission_denied",
        404 => "not_found",
        408 => "timeout",
        409 => "conflict",
        413 => "request_too_large",
        429 => "rate_limited",
        503 | 529 => "overloaded",
        500..=599 => "server_error",
        _ => "http_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses() {
        assert_eq!(class_for_status(401), "authentication");
        assert_eq!(class_for_status(429), "rate_limited");
        assert_eq!(class_for_status(503), "overloaded");
        assert_eq!(class_for_status(502), "server_error");
        assert_eq!(class_for_status(418), "http_error");
    }
}
