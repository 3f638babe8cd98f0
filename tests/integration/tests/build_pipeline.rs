//! Integration test: the `build-self-description` pipeline end to end, with
//! an in-process clearing house standing in for the GXDCH.

use std::sync::Arc;
use std::time::Duration;

use gaiax_cli::{AnchorInput, BuildRequest, SelfDescriptionPipeline};
use gaiax_core::{AssistantConfig, Did, DocumentState, KeyType};
use gaiax_credentials::validator::CHECK_PROOF;
use gaiax_credentials::{
    verify_proof, ConformityStatus, CredentialError, SchemaRegistry, SelfDescriptionDocument,
    Validator, DEFAULT_PROFILE,
};
use gaiax_crypto::{Jwk, PrivateKey, TrustRoots};
use gaiax_gateway::{GatewayClient, RetryPolicy};
use gaiax_identity::{DidDocument, VerificationMethod};
use gaiax_integration_tests::{resolver_for, ClearingHouse, Party, MINIMAL_OPENAPI};

fn config() -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.trust.allow_self_signed = true;
    config
}

fn gateway(house: ClearingHouse, config: &AssistantConfig) -> GatewayClient<ClearingHouse> {
    GatewayClient::new(house, config.gateway.clone()).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    })
}

fn request(provider: &Party, conformity_instance: Option<&str>) -> BuildRequest {
    BuildRequest {
        api_spec: provider.write_file("weather.yaml", MINIMAL_OPENAPI),
        anchor: AnchorInput::Files {
            cert: provider.cert_path.clone(),
            key: provider.key_path.clone(),
        },
        did_document: None,
        conformity_instance: conformity_instance.map(str::to_string),
        output: provider.dir().join("self_description.json"),
    }
}

#[tokio::test]
async fn test_minimal_openapi_without_conformity() {
    let provider = Party::new("provider.example", 10);
    let config = config();
    let pipeline = SelfDescriptionPipeline::new(&config, gateway(ClearingHouse::new(0), &config));

    let outcome = pipeline.run(&request(&provider, None)).await.unwrap();

    assert_eq!(outcome.state, DocumentState::Persisted);
    assert_eq!(outcome.document.state(), DocumentState::Signed);
    assert!(outcome
        .document
        .types
        .iter()
        .any(|t| t == "gx:ServiceOffering"));
    assert!(!outcome.warnings.is_empty(), "self-signed anchor should warn");
    assert_eq!(pipeline.gateway().transport().calls(), 0);

    // The proof verifies with the trust anchor's key.
    verify_proof(&outcome.document, &provider.anchor.public_key()).unwrap();
    let proof = outcome.document.proof.as_ref().unwrap();
    assert_eq!(
        proof.verification_method,
        format!(
            "did:web:provider.example#{}",
            VerificationMethod::fragment_for(KeyType::Ed25519)
        )
    );

    let saved = SelfDescriptionDocument::load(&outcome.output).unwrap();
    assert_eq!(saved, outcome.document);
}

#[tokio::test]
async fn test_conformity_after_transient_failures() {
    let provider = Party::new("provider.example", 11);
    let config = config();
    let pipeline = SelfDescriptionPipeline::new(&config, gateway(ClearingHouse::new(2), &config));

    let outcome = pipeline
        .run(&request(&provider, Some("gaia-x-lab")))
        .await
        .unwrap();

    let house = pipeline.gateway().transport();
    assert_eq!(house.calls(), 3);
    assert_eq!(outcome.document.state(), DocumentState::ConformityEnriched);
    let record = outcome.document.conformity.as_ref().unwrap();
    assert_eq!(record.status, ConformityStatus::Accepted);
    assert_eq!(record.instance, "gaia-x-lab");
    assert_eq!(
        record.integrity(),
        Some(outcome.document.integrity().unwrap().as_str())
    );

    // Both the provider proof and the compliance credential verify.
    let profile = SchemaRegistry::new().get(DEFAULT_PROFILE).unwrap();
    let validator = Validator::new(
        profile,
        Arc::new(resolver_for(&[&provider, house.party()])),
        TrustRoots::new(),
    )
    .allow_self_signed(true);
    let report = validator.validate_file(&outcome.output).await.unwrap();
    assert!(report.is_valid(), "unexpected failures: {:?}", report.failures());
    assert!(report.check(CHECK_PROOF).unwrap().passed());
}

#[tokio::test]
async fn test_gateway_gives_up_after_max_attempts() {
    let provider = Party::new("provider.example", 12);
    let config = config();
    let pipeline = SelfDescriptionPipeline::new(&config, gateway(ClearingHouse::new(5), &config));
    let request = request(&provider, Some("gaia-x-lab"));

    assert!(pipeline.run(&request).await.is_err());
    assert_eq!(pipeline.gateway().transport().calls(), 3);
    assert!(!request.output.exists());
}

#[tokio::test]
async fn test_key_type_mismatch_stops_before_gateway() {
    let provider = Party::new("provider.example", 13);

    // Published DID document advertises an RSA key, the anchor holds Ed25519.
    let rsa = PrivateKey::generate(KeyType::Rsa).unwrap();
    let mut did_document = DidDocument::new(&Did::web("provider.example"));
    did_document.add_verification_method(
        &VerificationMethod::fragment_for(KeyType::Rsa),
        Jwk::from_public_key(&rsa.public_key()),
    );
    let did_path = provider.dir().join("did.json");
    did_document.save(&did_path).unwrap();

    let config = config();
    let pipeline = SelfDescriptionPipeline::new(&config, gateway(ClearingHouse::new(0), &config));
    let mut request = request(&provider, Some("gaia-x-lab"));
    request.did_document = Some(did_path);

    let err = pipeline.run(&request).await.unwrap_err();
    match err.downcast_ref::<CredentialError>() {
        Some(CredentialError::KeyTypeMismatch { expected, found }) => {
            assert_eq!(*expected, KeyType::Rsa);
            assert_eq!(*found, KeyType::Ed25519);
        }
        other => panic!("unexpected error: {:?} ({})", other, err),
    }
    assert_eq!(pipeline.gateway().transport().calls(), 0);
    assert!(!request.output.exists());
}

#[tokio::test]
async fn test_untrusted_anchor_is_refused() {
    let provider = Party::new("provider.example", 14);
    let config = AssistantConfig::default();
    let pipeline = SelfDescriptionPipeline::new(&config, gateway(ClearingHouse::new(0), &config));
    let request = request(&provider, None);

    let err = pipeline.run(&request).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CredentialError>(),
        Some(CredentialError::UntrustedAnchor(_))
    ));
    assert!(!request.output.exists());
}

#[tokio::test]
async fn test_issuance_keeps_existing_key() {
    let provider = Party::new("provider.example", 15);
    let existing_key = provider.write_file("provider.example.key.pem", "existing key");
    let config = config();
    let pipeline = SelfDescriptionPipeline::new(&config, gateway(ClearingHouse::new(0), &config));

    let mut request = request(&provider, None);
    request.anchor = AnchorInput::Issue {
        server: "http://127.0.0.1:1".into(),
        domain: "provider.example".into(),
        key_type: KeyType::Ed25519,
    };

    let err = pipeline.run(&request).await.unwrap_err();
    assert!(err.to_string().contains("already exists"), "{}", err);
    assert_eq!(std::fs::read_to_string(&existing_key).unwrap(), "existing key");
    assert_eq!(
        std::fs::read_to_string(&provider.cert_path).unwrap(),
        provider.anchor.chain().to_pem()
    );
    assert!(!request.output.exists());
}
