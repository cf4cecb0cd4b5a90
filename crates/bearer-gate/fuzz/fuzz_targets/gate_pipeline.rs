#![no_main]

use bearer_gate::{
    Algorithm, AuthenticationGate, AuthorizationHeaderExtractor, ExtractorChain, KeySet,
    QueryParameterExtractor, TokenPolicy, VerificationKey,
};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

const NOW: i64 = 1_700_000_000;

fn gate() -> Option<&'static AuthenticationGate> {
    static GATE: OnceLock<Option<AuthenticationGate>> = OnceLock::new();
    GATE.get_or_init(|| {
        let policy = TokenPolicy::builder()
            .algorithms([Algorithm::HS256, Algorithm::EdDSA])
            .keys(KeySet::new().with_key(None, VerificationKey::hmac(&[0x42; 32])))
            .build()
            .ok()?;
        let extractors = ExtractorChain::new()
            .with(AuthorizationHeaderExtractor::default())
            .with(QueryParameterExtractor::default());
        Some(AuthenticationGate::new(policy, extractors))
    })
    .as_ref()
}

fuzz_target!(|data: &[u8]| {
    let Some(gate) = gate() else { return };
    let Ok(value) = http::HeaderValue::from_bytes(data) else { return };

    // Header carries the fuzz input verbatim, prefix included or not
    if let Ok(request) = http::Request::builder()
        .uri("/resource")
        .header(http::header::AUTHORIZATION, value)
        .body(())
    {
        let _ = gate.authenticate_at(&request, NOW);
    }
});
