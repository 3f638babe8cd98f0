//! Integration test: extract → assemble → sign → validate across the
//! credentials, identity and crypto crates.

use std::sync::Arc;

use chrono::Utc;
use gaiax_credentials::validator::{
    CHECK_CERTIFICATE_CHAIN, CHECK_DID_RESOLUTION, CHECK_PROOF, CHECK_SCHEMA,
};
use gaiax_credentials::{
    extract_service_from_str, CredentialAssembler, ProofSigner, SchemaRegistry,
    SelfDescriptionDocument, Validator, DEFAULT_PROFILE,
};
use gaiax_crypto::TrustRoots;
use gaiax_integration_tests::{resolver_for, Party, MINIMAL_OPENAPI};

fn assembler() -> CredentialAssembler {
    CredentialAssembler::new(SchemaRegistry::new().get(DEFAULT_PROFILE).unwrap())
}

fn signed_document(provider: &Party) -> SelfDescriptionDocument {
    let descriptor = extract_service_from_str(MINIMAL_OPENAPI, "weather.yaml").unwrap();
    let unsigned = assembler()
        .assemble(&descriptor, &provider.anchor, Some(&provider.did_document))
        .unwrap();
    ProofSigner::new(&provider.anchor)
        .sign(
            &unsigned,
            provider.did_document.assertion_key().unwrap(),
            Utc::now(),
        )
        .unwrap()
}

fn validator(provider: &Party) -> Validator {
    let profile = SchemaRegistry::new().get(DEFAULT_PROFILE).unwrap();
    Validator::new(profile, Arc::new(resolver_for(&[provider])), TrustRoots::new())
        .allow_self_signed(true)
}

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test]
async fn test_signed_document_validates() {
    let provider = Party::new("provider.example", 1);
    let document = signed_document(&provider);

    assert_eq!(document.issuer, "did:web:provider.example");
    assert_eq!(document.credential_subject["gx:name"], "Weather API");

    let report = validator(&provider)
        .validate(&serde_json::to_value(&document).unwrap())
        .await;
    assert!(report.is_valid(), "unexpected failures: {:?}", report.failures());
    for check in [CHECK_SCHEMA, CHECK_DID_RESOLUTION, CHECK_CERTIFICATE_CHAIN, CHECK_PROOF] {
        assert!(report.check(check).unwrap().passed(), "{} did not pass", check);
    }
}

#[tokio::test]
async fn test_saved_document_validates_from_disk() {
    let provider = Party::new("provider.example", 2);
    let path = provider.dir().join("self_description.json");
    signed_document(&provider).save_atomic(&path).unwrap();

    let results = validator(&provider).validate_files(&[path.clone()]).await;
    assert_eq!(results.len(), 1);
    let (reported_path, report) = &results[0];
    assert_eq!(reported_path, &path);
    assert!(report.as_ref().unwrap().is_valid());
}

#[test]
fn test_reassembly_is_byte_identical() {
    let provider = Party::new("provider.example", 3);
    let descriptor = extract_service_from_str(MINIMAL_OPENAPI, "weather.yaml").unwrap();

    let first = assembler()
        .assemble(&descriptor, &provider.anchor, Some(&provider.did_document))
        .unwrap();
    let second = assembler()
        .assemble(&descriptor, &provider.anchor, Some(&provider.did_document))
        .unwrap();
    assert_eq!(
        first.to_json_pretty().unwrap(),
        second.to_json_pretty().unwrap()
    );
}

// =========================================================================
// Tampering
// =========================================================================

#[tokio::test]
async fn test_tampered_subject_fails_proof_only() {
    let provider = Party::new("provider.example", 4);
    let mut value = serde_json::to_value(signed_document(&provider)).unwrap();
    value["credentialSubject"]["gx:description"] = "Free forecasts for everyone".into();

    let report = validator(&provider).validate(&value).await;
    assert!(!report.is_valid());
    assert!(report.check(CHECK_SCHEMA).unwrap().passed());
    assert!(report.check(CHECK_DID_RESOLUTION).unwrap().passed());
    assert!(!report.check(CHECK_PROOF).unwrap().passed());
}

#[tokio::test]
async fn test_flipped_byte_in_saved_file_fails_proof_only() {
    let provider = Party::new("provider.example", 7);
    let path = provider.dir().join("self_description.json");
    signed_document(&provider).save_atomic(&path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let needle = b"Hourly forecasts";
    let at = bytes
        .windows(needle.len())
        .position(|window| window == needle)
        .expect("description is persisted");
    bytes[at] = b'h';
    std::fs::write(&path, &bytes).unwrap();

    let report = validator(&provider).validate_file(&path).await.unwrap();
    assert!(!report.is_valid());
    assert!(report.check(CHECK_SCHEMA).unwrap().passed());
    assert!(report.check(CHECK_DID_RESOLUTION).unwrap().passed());
    assert!(!report.check(CHECK_PROOF).unwrap().passed());
}

#[tokio::test]
async fn test_document_signed_by_other_party_fails() {
    let provider = Party::new("provider.example", 5);
    let impostor = Party::new("provider.example", 6);
    let document = signed_document(&impostor);

    // The verifier only knows the genuine provider's DID document.
    let report = validator(&provider)
        .validate(&serde_json::to_value(&document).unwrap())
        .await;
    assert!(!report.is_valid());
    assert!(!report.check(CHECK_PROOF).unwrap().passed());
}
