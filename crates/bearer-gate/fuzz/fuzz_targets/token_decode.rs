#![no_main]

use bearer_gate::codec::encode_segment;
use bearer_gate::DecodedToken;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(token) = std::str::from_utf8(data) {
        // Arbitrary compact strings must decode or fail, never panic
        if let Ok(decoded) = DecodedToken::decode_str(token) {
            let _ = decoded.header().alg();
            let _ = decoded.header().kid();
            let _ = decoded.encode();
        }
    }

    // Raw bytes as a payload segment, so JSON parsing sees arbitrary input
    let header = encode_segment(br#"{"alg":"HS256","typ":"JWT"}"#);
    let token = format!("{header}.{}.c2ln", encode_segment(data));
    let _ = DecodedToken::decode_str(&token);
});
