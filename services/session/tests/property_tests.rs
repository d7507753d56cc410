//! Property-based tests for the token pair protocol.
//!
//! - Codec round-trip for arbitrary claims, secrets and strengths
//! - Correlation of every issued pair
//! - At-most-once redemption along a rotation chain
//! - Refresh wire encoding round-trip

mod common;

use proptest::prelude::*;
use session_service::TokenError;
use session_service::jwt::{Claims, SigningTier, TokenCodec, TokenKind, decode_refresh, encode_refresh};
use session_service::service::validate_subject;
use test_utils::fixtures::EPOCH_2024;
use test_utils::{invalid_subject_strategy, secret_pair_strategy, secret_strategy, subject_strategy, ttl_seconds_strategy};

fn arb_tier() -> impl Strategy<Value = SigningTier> {
    prop_oneof![
        Just(SigningTier::Hs256),
        Just(SigningTier::Hs384),
        Just(SigningTier::Hs512),
    ]
}

fn arb_kind() -> impl Strategy<Value = TokenKind> {
    prop_oneof![Just(TokenKind::Access), Just(TokenKind::Refresh)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Verify(Sign(claims)) returns the claims unchanged.
    #[test]
    fn prop_codec_round_trip(
        secret in secret_strategy(),
        tier in arb_tier(),
        kind in arb_kind(),
        subject in subject_strategy(),
        ttl in ttl_seconds_strategy(),
    ) {
        let codec = TokenCodec::new(secret.as_bytes(), kind, tier);
        let claims = Claims::new(subject, uuid::Uuid::new_v4().to_string(), kind, EPOCH_2024, ttl);

        let token = codec.sign(&claims).unwrap();
        prop_assert_eq!(codec.verify(&token, EPOCH_2024).unwrap(), claims);
    }

    /// A token is valid one second before expiry and expired at it.
    #[test]
    fn prop_expiry_boundary(
        secret in secret_strategy(),
        ttl in ttl_seconds_strategy(),
    ) {
        let codec = TokenCodec::new(secret.as_bytes(), TokenKind::Refresh, SigningTier::Hs512);
        let token = codec
            .sign(&Claims::new("user-1", "cid", TokenKind::Refresh, EPOCH_2024, ttl))
            .unwrap();

        prop_assert!(codec.verify(&token, EPOCH_2024 + ttl - 1).is_ok());
        let expired = matches!(codec.verify(&token, EPOCH_2024 + ttl), Err(TokenError::Expired { .. }));
        prop_assert!(expired);
    }

    /// A token never verifies under a different secret.
    #[test]
    fn prop_foreign_secret_rejected(
        (a, b) in secret_pair_strategy(),
        tier in arb_tier(),
    ) {
        let signer = TokenCodec::new(a.as_bytes(), TokenKind::Access, tier);
        let verifier = TokenCodec::new(b.as_bytes(), TokenKind::Access, tier);
        let token = signer
            .sign(&Claims::new("user-1", "cid", TokenKind::Access, EPOCH_2024, 60))
            .unwrap();

        let rejected = matches!(verifier.verify(&token, EPOCH_2024), Err(TokenError::InvalidSignature));
        prop_assert!(rejected);
    }

    /// Both credentials of an issued pair carry the same correlation ID.
    #[test]
    fn prop_issued_pairs_are_correlated(subject in subject_strategy()) {
        let clock = std::sync::Arc::new(session_service::clock::ManualClock::new(EPOCH_2024));
        let issuer = common::issuer(clock);
        let pair = issuer.issue_pair(&subject).unwrap();

        let access = issuer.access_codec().verify_signature(&pair.access_token).unwrap();
        let refresh = issuer.refresh_codec().verify_signature(&pair.refresh_token).unwrap();

        prop_assert_eq!(&access.cid, &pair.correlation_id);
        prop_assert_eq!(&refresh.cid, &pair.correlation_id);
        prop_assert_eq!(&refresh.sub, &subject);
    }

    /// Wire decoding inverts wire encoding, byte for byte.
    #[test]
    fn prop_wire_round_trip(token in "[A-Za-z0-9_.-]{0,300}") {
        let wire = encode_refresh(&token);
        let decoded = decode_refresh(&wire).unwrap();

        prop_assert_eq!(&decoded, &token);
        prop_assert_eq!(encode_refresh(&decoded), wire);
    }

    /// Invalid subjects never reach the issuer.
    #[test]
    fn prop_invalid_subjects_rejected(subject in invalid_subject_strategy()) {
        let rejected = matches!(validate_subject(&subject), Err(TokenError::InvalidSubject(_)));
        prop_assert!(rejected);
    }

    /// Valid subjects are accepted.
    #[test]
    fn prop_valid_subjects_accepted(subject in subject_strategy()) {
        prop_assert!(validate_subject(&subject).is_ok());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Along a chain of rotations every credential redeems exactly once.
    #[test]
    fn prop_at_most_once_redemption(
        subject in subject_strategy(),
        rotations in 1usize..5,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let h = common::harness();
            let mut retired = Vec::new();
            let mut current = h.service.issue(&subject).await.unwrap();

            for _ in 0..rotations {
                let next = h.service.rotate(&current.access_token, &current.refresh_token).await.unwrap();
                prop_assert_ne!(&next.correlation_id, &current.correlation_id);
                retired.push(current);
                current = next;
            }

            for old in &retired {
                let reused = matches!(
                    h.service.rotate(&old.access_token, &old.refresh_token).await,
                    Err(TokenError::ReuseDetected)
                );
                prop_assert!(reused);
            }

            prop_assert!(h.service.rotate(&current.access_token, &current.refresh_token).await.is_ok());
            Ok(())
        })?;
    }

    /// Credentials from two issuances never rotate together.
    #[test]
    fn prop_mixed_pairs_mismatch(subject in subject_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let h = common::harness();
            let first = h.service.issue(&subject).await.unwrap();
            let second = h.service.issue(&subject).await.unwrap();

            let mismatch = matches!(
                h.service.rotate(&first.access_token, &second.refresh_token).await,
                Err(TokenError::PairMismatch)
            );
            prop_assert!(mismatch);
            Ok(())
        })?;
    }
}
