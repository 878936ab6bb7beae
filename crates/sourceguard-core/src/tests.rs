//! Unit tests for sourceguard-core.

#[test]
fn test_crate_structure() {
    // Smoke test - verifies the public surface fits together
    use crate::{GateFailure, GateResponse, GateVerdict, GuardConfig, IntegrityStatus};

    let config = GuardConfig::for_deployment("/srv/site", "/var/lib/sourceguard", &["index.php"]);
    assert!(config.validate().is_ok());

    let _verdict = GateVerdict::fail(GateFailure::NoBaseline);
    let _status = IntegrityStatus::NoBaseline;
    assert!(!GateResponse::forbidden().is_continue());
}
