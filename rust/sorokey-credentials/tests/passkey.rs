//! Passkey pipeline tests.
//!
//! These drive a [`SoftwareAuthenticator`] through the same steps the wallet
//! takes: register, extract the public key, assert over a payload,
//! canonicalize the signature and verify it the way the account contract
//! does.
//!
//! ```sh
//! cargo test -p sorokey-credentials --features helpers
//! ```

#![cfg(feature = "helpers")]

use pretty_assertions::assert_eq;
use sorokey_credentials::webauthn::{
    AssertionRequest, Authenticator, CeremonyError, PasskeyCredential, PasskeyVerifier,
    PasskeyVerifyError, RegistrationOptions, SoftwareAuthenticator, canonicalize,
};
use testresult::TestResult;

const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0x80, 0x00, 0x00, 0x00, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xde, 0x73, 0x7d, 0x56, 0xd3, 0x8b, 0xcf, 0x42, 0x79, 0xdc, 0xe5, 0x61, 0x7e, 0x31,
    0x92, 0xa8,
];

fn request(challenge: &[u8], credential: &PasskeyCredential) -> AssertionRequest {
    AssertionRequest {
        challenge: challenge.to_vec(),
        rp_id: "example.com".into(),
        allow_credentials: vec![credential.credential_id.clone()],
    }
}

#[tokio::test]
async fn it_registers_asserts_and_verifies() -> TestResult {
    let authenticator = SoftwareAuthenticator::from_seed(b"alice");
    let options = RegistrationOptions::named("example.com", "Stellar Demo Wallet", "alice");

    let registration = authenticator.register(&options).await?;
    let credential = PasskeyCredential::from_registration(&registration)?;
    assert_eq!(credential, authenticator.credential());

    let payload = [0xabu8; 32];
    let assertion = authenticator.assert(&request(&payload, &credential)).await?;
    assert_eq!(assertion.credential_id, credential.credential_id);

    let signature = canonicalize(&assertion.signature)?;
    assert!(signature.s() <= &HALF_ORDER[..]);

    let verifier = PasskeyVerifier::from_sec1_bytes(&credential.public_key)?;
    verifier.verify(
        &payload,
        &assertion.authenticator_data,
        &assertion.client_data_json,
        &signature,
    )?;
    Ok(())
}

#[tokio::test]
async fn it_canonicalizes_high_s_assertions() -> TestResult {
    let authenticator = SoftwareAuthenticator::from_seed(b"bob").producing_high_s();
    let credential = authenticator.credential();
    let verifier = PasskeyVerifier::from_sec1_bytes(&credential.public_key)?;

    for round in 0u8..4 {
        let payload = [round; 32];
        let assertion = authenticator.assert(&request(&payload, &credential)).await?;
        let signature = canonicalize(&assertion.signature)?;
        assert!(signature.s() <= &HALF_ORDER[..]);
        verifier.verify_assertion(&payload, &assertion)?;
    }
    Ok(())
}

#[tokio::test]
async fn it_rejects_an_assertion_over_another_payload() -> TestResult {
    let authenticator = SoftwareAuthenticator::from_seed(b"carol");
    let credential = authenticator.credential();
    let assertion = authenticator.assert(&request(&[1; 32], &credential)).await?;

    let verifier = PasskeyVerifier::from_sec1_bytes(&credential.public_key)?;
    assert_eq!(
        verifier.verify_assertion(&[2; 32], &assertion),
        Err(PasskeyVerifyError::ChallengeMismatch)
    );
    Ok(())
}

#[tokio::test]
async fn it_surfaces_a_dismissed_ceremony() {
    let authenticator = SoftwareAuthenticator::from_seed(b"dave").declining();
    let credential = authenticator.credential();
    let result = authenticator.assert(&request(&[1; 32], &credential)).await;
    assert!(matches!(result, Err(CeremonyError::Declined(_))));
}
