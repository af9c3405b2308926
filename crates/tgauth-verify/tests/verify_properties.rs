//! Property tests for init-data verification through the public API.

use proptest::prelude::*;
use proptest::sample::Index;
use tgauth_verify::signature::sign_init_data;
use tgauth_verify::{AuthError, Credential, CredentialSet, verify};

const SECRET: &str = "123456:property-test-token";

fn credentials() -> CredentialSet {
    CredentialSet::new([Credential::new(SECRET)])
}

// Keys start with `k` so they never collide with a signature field name.
// Values never start with `{` or `[`, which keeps JSON canonicalization out of play.
fn unsigned_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("k[a-z_]{0,7}", "[A-Za-z0-9_.%-]{0,12}", 1..8)
        .prop_map(|map| map.into_iter().collect())
}

fn join(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn sign(pairs: &[(String, String)]) -> String {
    sign_init_data(&join(pairs), &Credential::new(SECRET))
}

fn shuffled_signed_segments() -> impl Strategy<Value = Vec<String>> {
    unsigned_pairs().prop_flat_map(|pairs| {
        let segments: Vec<String> = sign(&pairs).split('&').map(str::to_owned).collect();
        Just(segments).prop_shuffle()
    })
}

proptest! {
    #[test]
    fn test_should_verify_regardless_of_pair_order(segments in shuffled_signed_segments()) {
        let reordered = segments.join("&");
        prop_assert!(verify(&reordered, &credentials()).is_ok(), "payload {reordered:?}");
    }

    #[test]
    fn test_should_reject_any_tampered_value(pairs in unsigned_pairs(), index in any::<Index>()) {
        let signed = sign(&pairs);
        let hash_segment = signed.rsplit('&').next().unwrap_or_default();

        let mut tampered = pairs.clone();
        let target = index.index(tampered.len());
        tampered[target].1.push('x');
        let forged = format!("{}&{hash_segment}", join(&tampered));

        prop_assert_eq!(verify(&forged, &credentials()).unwrap_err(), AuthError::InvalidSignature);
    }

    #[test]
    fn test_should_reject_any_flipped_signature_character(
        pairs in unsigned_pairs(),
        index in any::<Index>(),
    ) {
        let signed = sign(&pairs);
        let mut bytes = signed.into_bytes();
        let len = bytes.len();
        let position = len - 1 - index.index(64);
        bytes[position] = if bytes[position] == b'0' { b'1' } else { b'0' };
        let forged = String::from_utf8(bytes).unwrap();

        prop_assert_eq!(verify(&forged, &credentials()).unwrap_err(), AuthError::InvalidSignature);
    }

    #[test]
    fn test_should_never_panic_on_arbitrary_input(input in ".{0,256}") {
        prop_assert!(verify(&input, &credentials()).is_err());
    }
}
