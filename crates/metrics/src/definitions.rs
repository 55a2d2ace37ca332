//! Metric name and label definitions.
//!
//! Every metric the relay emits is named here so the exported set is easy to
//! audit.

/// Inbound HTTP requests
pub mod http {
    /// Requests handled, by route and status
    pub const REQUESTS_TOTAL: &str = "smsrelay_http_requests_total";
    /// Request duration in seconds, including the wait for the IRC session
    pub const REQUEST_DURATION_SECONDS: &str = "smsrelay_http_request_duration_seconds";
}

/// Outbound IRC session
pub mod irc {
    /// Lines handed to the IRC client for delivery
    pub const MESSAGES_SENT_TOTAL: &str = "smsrelay_irc_messages_sent_total";
    /// Sends the client refused, e.g. because the link was down
    pub const SEND_ERRORS_TOTAL: &str = "smsrelay_irc_send_errors_total";
    pub const CONNECT_ATTEMPTS_TOTAL: &str = "smsrelay_irc_connect_attempts_total";
    pub const CONNECT_FAILURES_TOTAL: &str = "smsrelay_irc_connect_failures_total";
    /// 1 while the session is connected, 0 otherwise
    pub const CONNECTED: &str = "smsrelay_irc_connected";
}

/// Common label keys
pub mod labels {
    pub const ROUTE: &str = "route";
    pub const STATUS: &str = "status";
}

/// Standard histogram buckets
pub mod buckets {
    /// HTTP request duration buckets (in seconds).
    /// Covers 1ms up to a full readiness timeout and beyond.
    pub const HTTP_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ];
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(http::REQUESTS_TOTAL)]
    #[case(http::REQUEST_DURATION_SECONDS)]
    #[case(irc::MESSAGES_SENT_TOTAL)]
    #[case(irc::SEND_ERRORS_TOTAL)]
    #[case(irc::CONNECT_ATTEMPTS_TOTAL)]
    #[case(irc::CONNECT_FAILURES_TOTAL)]
    #[case(irc::CONNECTED)]
    fn names_are_prefixed_snake_case(#[case] name: &str) {
        assert!(name.starts_with("smsrelay_"));
        assert!(
            name.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        );
    }

    #[test]
    fn buckets_are_sorted() {
        assert!(buckets::HTTP_DURATION.windows(2).all(|w| w[0] < w[1]));
    }
}
