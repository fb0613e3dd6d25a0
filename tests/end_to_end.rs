//! Issue-then-verify scenarios across the public API.

mod common;

use chrono::{Duration, Utc};
use common::{office_pc, office_pc_moved, signer};
use kc_licensor::issuance::KeyStore;
use kc_licensor::{
    activate, create_claim, create_claim_on, ActivationStore, ClaimRequest, ErrorKind, Expiry, KeyPair, SignedLicense,
    Signer, Verifier,
};

#[test]
fn unbound_license_verifies_anywhere() {
    let claim = create_claim(ClaimRequest::new("acme-core", "Acme Corp"));
    let signed = signer().sign(&claim).unwrap();

    let accepted = Verifier::new().verify(&signed).unwrap();
    assert_eq!(accepted.product_id(), "acme-core");
    assert_eq!(accepted.client(), "Acme Corp");
    assert_eq!(accepted.expires_at(), Expiry::Never);
    assert!(accepted.features().is_empty());

    // A different machine accepts it too
    assert!(Verifier::with_machine(office_pc_moved()).verify(&signed).is_ok());
}

#[test]
fn decoded_claim_equals_issued_claim() {
    let request = ClaimRequest::new("acme-core", "Acme Corp")
        .expires_at(Expiry::At(Utc::now() + Duration::days(30)))
        .feature("seats", 25)
        .feature("modules", serde_json::json!(["reporting", "export"]))
        .feature("region", "eu-west")
        .machine_bound(true);
    let claim = create_claim_on(request, &office_pc());
    let signed = signer().sign(&claim).unwrap();

    let accepted = Verifier::with_machine(office_pc()).verify(&signed).unwrap();
    assert_eq!(accepted, claim);
}

#[test]
fn machine_bound_license_rejected_after_hardware_change() {
    let claim = create_claim_on(
        ClaimRequest::new("acme-core", "Acme Corp").machine_bound(true),
        &office_pc(),
    );
    let signed = signer().sign(&claim).unwrap();

    assert!(Verifier::with_machine(office_pc()).verify(&signed).is_ok());

    let err = Verifier::with_machine(office_pc_moved()).verify(&signed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MachineMismatch);
    assert!(!err.to_string().contains(office_pc().fingerprint().as_str()));
}

#[test]
fn license_bound_to_reported_fingerprint() {
    // Customer runs `kc-licensor fingerprint` and sends the value to the vendor
    let reported = office_pc().fingerprint();
    let claim = create_claim(ClaimRequest::new("acme-core", "Acme Corp").bind_to(reported));
    let signed = signer().sign(&claim).unwrap();

    assert!(Verifier::with_machine(office_pc()).verify(&signed).is_ok());
    assert_eq!(
        Verifier::with_machine(office_pc_moved()).verify(&signed).unwrap_err().kind(),
        ErrorKind::MachineMismatch
    );
}

#[test]
fn artifact_survives_disk_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("license.key");

    let claim = create_claim_on(ClaimRequest::new("acme-core", "Acme Corp"), &office_pc());
    signer().sign(&claim).unwrap().write_to(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    for field in ["license", "signature", "public_key", "integrity"] {
        assert!(value[field].is_string(), "missing {}", field);
    }

    assert_eq!(Verifier::new().verify_file(&path).unwrap(), claim);
    assert_eq!(SignedLicense::read_from(&path).unwrap(), SignedLicense::from_json(&text).unwrap());
}

#[test]
fn missing_and_malformed_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("license.key");
    assert_eq!(Verifier::new().verify_file(&path).unwrap_err().kind(), ErrorKind::NotFound);

    std::fs::write(&path, r#"{"license": "abc", "signature": "def"}"#).unwrap();
    assert_eq!(Verifier::new().verify_file(&path).unwrap_err().kind(), ErrorKind::MalformedArtifact);
}

#[test]
fn expired_license_reports_date() {
    let expired_at = Utc::now() - Duration::days(1);
    let claim = create_claim(ClaimRequest::new("acme-core", "Acme Corp").expires_at(Expiry::At(expired_at)));
    let signed = signer().sign(&claim).unwrap();

    let err = Verifier::new().verify(&signed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);
    assert!(err.to_string().contains(&expired_at.format("%Y-%m-%d").to_string()));
}

#[test]
fn stored_key_signs_verifiable_licenses() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path(), "vendor passphrase");
    assert!(!store.exists());

    let generated = store.load_or_generate(2048).unwrap();
    let reloaded = store.load_or_generate(2048).unwrap();
    assert_eq!(generated.public_key(), reloaded.public_key());

    let signer = Signer::new(reloaded);
    let signed = signer
        .sign(&create_claim(ClaimRequest::new("acme-core", "Acme Corp")))
        .unwrap();
    assert!(Verifier::new().verify(&signed).is_ok());

    let public_pem = std::fs::read_to_string(store.public_key_path()).unwrap();
    assert_eq!(public_pem, signed.public_key);
}

#[test]
fn pinned_verifier_rejects_foreign_issuer() {
    let claim = create_claim(ClaimRequest::new("acme-core", "Acme Corp"));
    let signed = signer().sign(&claim).unwrap();

    let impostor = Signer::new(KeyPair::generate(2048).unwrap());
    let forged = impostor.sign(&claim).unwrap();

    let pin = kc_licensor::crypto::key_id(signer().keys().public_key()).unwrap();
    let verifier = Verifier::new().with_pinned_key(pin);

    assert!(verifier.verify(&signed).is_ok());
    // Self-consistent but signed by someone else
    assert!(Verifier::new().verify(&forged).is_ok());
    assert_eq!(verifier.verify(&forged).unwrap_err().kind(), ErrorKind::BadSignature);
}

#[test]
fn activation_follows_verification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("license.key");
    let store = ActivationStore::new(dir.path().join("state"));

    let claim = create_claim_on(ClaimRequest::new("acme-core", "Acme Corp").machine_bound(true), &office_pc());
    signer().sign(&claim).unwrap().write_to(&path).unwrap();

    assert!(activate(&Verifier::with_machine(office_pc_moved()), &path, &store).is_err());
    assert!(!store.is_activated());

    let (accepted, record) = activate(&Verifier::with_machine(office_pc()), &path, &store).unwrap();
    assert_eq!(accepted.license_id(), record.license_id);
    assert_eq!(record.machine_id, office_pc().fingerprint());
    assert!(store.is_activated());
}
