//! # System Constants
//!
//! Routing keys, queue names, and wire-level identifiers shared between the
//! advertisements service and the statistics consumer. Both sides must agree
//! on these; changing one requires a coordinated deploy.

/// Broker routing identifiers
pub mod routing {
    /// Routing key for single advertisement-view events
    pub const AD_IS_SHOWN: &str = "statistics.adIsShown";

    /// Queue receiving periodic aggregated statistics snapshots
    pub const PERIODICAL_STATISTICS_QUEUE: &str = "statistics.periodicalStatistics";
}

/// Message header names
pub mod headers {
    /// Correlation identifier propagated across service boundaries
    pub const CORRELATION_ID: &str = "X-CorrelationID";
}

/// User service HTTP paths
pub mod user_service {
    /// Base path of the users resource, relative to the configured route
    pub const USERS_PATH: &str = "api/v1.0/users";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_identifiers_are_stable() {
        // These values are shared with the statistics consumer deployment
        assert_eq!(routing::AD_IS_SHOWN, "statistics.adIsShown");
        assert_eq!(
            routing::PERIODICAL_STATISTICS_QUEUE,
            "statistics.periodicalStatistics"
        );
        assert_eq!(headers::CORRELATION_ID, "X-CorrelationID");
    }
}
