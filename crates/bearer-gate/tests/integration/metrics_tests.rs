//! Metrics emitted by pipeline runs
//!
//! Uses a local `DebuggingRecorder` so tests do not share a global recorder.

use bearer_gate::observability::metrics::{
    AUTHENTICATIONS_TOTAL, AUTHENTICATION_DURATION_SECONDS, STATUS_REJECTED, STATUS_SUCCESS,
};
use bearer_gate::{
    Algorithm, AuthenticationGate, AuthorizationHeaderExtractor, ExtractorChain, KeySet,
    TokenPolicy, TokenSigner, VerificationKey,
};
use bearer_gate_test_utils::*;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

fn counter_value(snapshotter: &Snapshotter, status: &str, reason: &str) -> Option<u64> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find(|(key, _, _, _)| {
            let labels: Vec<_> = key.key().labels().collect();
            key.key().name() == AUTHENTICATIONS_TOTAL
                && labels.iter().any(|l| l.key() == "status" && l.value() == status)
                && labels.iter().any(|l| l.key() == "reason" && l.value() == reason)
        })
        .and_then(|(_, _, _, value)| match value {
            DebugValue::Counter(n) => Some(n),
            _ => None,
        })
}

#[test]
fn test_runs_are_counted_by_status_and_reason() -> Result<(), anyhow::Error> {
    let policy = TokenPolicy::builder()
        .algorithm(Algorithm::HS256)
        .keys(KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)))
        .build()?;
    let gate = AuthenticationGate::new(
        policy,
        ExtractorChain::new().with(AuthorizationHeaderExtractor::default()),
    );
    let signer = TokenSigner::hmac(Algorithm::HS256, TEST_HMAC_SECRET)?;
    let valid = TestTokenBuilder::new().at(TEST_NOW).sign(&signer);
    let expired = TestTokenBuilder::new().at(TEST_NOW).expires_in(-3600).sign(&signer);

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        for _ in 0..3 {
            gate.authenticate_at(&TestRequest::new().bearer(&valid).build(), TEST_NOW);
        }
        gate.authenticate_at(&TestRequest::new().bearer(&expired).build(), TEST_NOW);
        gate.authenticate_at(&TestRequest::new().build(), TEST_NOW);
        gate.authenticate_at(&TestRequest::new().bearer("only.two").build(), TEST_NOW);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let count = |status: &str, reason: &str| {
        snapshot.iter().find_map(|(key, _, _, value)| {
            let labels: Vec<_> = key.key().labels().collect();
            let matches = key.key().name() == AUTHENTICATIONS_TOTAL
                && labels.iter().any(|l| l.key() == "status" && l.value() == status)
                && labels.iter().any(|l| l.key() == "reason" && l.value() == reason);
            match value {
                DebugValue::Counter(n) if matches => Some(*n),
                _ => None,
            }
        })
    };

    assert_eq!(count(STATUS_SUCCESS, "none"), Some(3));
    assert_eq!(count(STATUS_REJECTED, "token_expired"), Some(1));
    assert_eq!(count(STATUS_REJECTED, "token_not_found"), Some(1));
    assert_eq!(count(STATUS_REJECTED, "malformed_structure"), Some(1));

    let histograms = snapshot
        .iter()
        .filter(|(key, _, _, _)| key.key().name() == AUTHENTICATION_DURATION_SECONDS)
        .count();
    assert_eq!(histograms, 2, "one duration histogram per status");
    Ok(())
}

#[test]
fn test_no_recorder_is_a_no_op() -> Result<(), anyhow::Error> {
    let policy = TokenPolicy::builder()
        .algorithm(Algorithm::HS256)
        .keys(KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)))
        .build()?;
    let gate = AuthenticationGate::new(policy, ExtractorChain::new());
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    // Recorded outside the local recorder scope
    gate.authenticate_at(&TestRequest::new().build(), TEST_NOW);

    assert_eq!(counter_value(&snapshotter, STATUS_REJECTED, "token_not_found"), None);
    Ok(())
}
