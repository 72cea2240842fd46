//! Skip policy for suites that need an embedded PostgreSQL cluster.
//!
//! Embedded PostgreSQL downloads binaries and needs a writable runtime
//! directory, so it cannot start everywhere. Suites skip with a
//! `SKIP-TEST-CLUSTER` marker unless `REQUIRE_TEST_CLUSTER` is truthy, in
//! which case a setup failure fails the test.

/// Returns true when `REQUIRE_TEST_CLUSTER` is "1", "true" or "yes"
/// (case-insensitive).
pub fn cluster_is_required() -> bool {
    std::env::var("REQUIRE_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Handles embedded cluster setup failures consistently across suites.
///
/// Prints a skip marker and returns `None`, or panics when the cluster is
/// required.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if cluster_is_required() {
        panic!("Test cluster setup failed: {reason}. Unset REQUIRE_TEST_CLUSTER to skip.");
    }
    eprintln!("SKIP-TEST-CLUSTER: {reason}");
    None
}
