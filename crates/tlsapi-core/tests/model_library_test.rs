//! Integration test: reference library against real certificate fixtures.
//!
//! Run: cargo test -p tlsapi-core --test model_library_test

use std::io::Write;
use std::path::{Path, PathBuf};

use tlsapi_core::{
    ApiErrorKind, ClientTrustPolicy, ContextCreation, ContextHandle, EncodingTag, LifecycleState,
    ModelLibrary, ModelOptions, Protocol, Role, TlsApi,
};

fn workspace_root() -> PathBuf {
    let manifest = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn certs() -> PathBuf {
    workspace_root().join("tests/fixtures/certs")
}

fn context(lib: &ModelLibrary, role: Role) -> ContextHandle {
    let method = lib.method(Protocol::Negotiate, role).unwrap();
    match lib.context_new(Some(method)) {
        ContextCreation::Owning(ctx) => ctx,
        ContextCreation::Failed { error, .. } => panic!("context_new failed: {error}"),
    }
}

fn bogus_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is not a certificate").unwrap();
    file
}

#[test]
fn server_credentials_enable_sessions() {
    let lib = ModelLibrary::new();
    let ctx = context(&lib, Role::Server);
    let cert = certs().join("server-cert.pem");
    let key = certs().join("server-key.pem");

    lib.use_certificate_file(Some(&ctx), Some(cert.as_path()), EncodingTag::PEM)
        .unwrap();
    assert!(lib.session_new(Some(&ctx)).is_err(), "key still missing");
    lib.use_private_key_file(Some(&ctx), Some(key.as_path()), EncodingTag::PEM)
        .unwrap();

    let snapshot = lib.context_snapshot(&ctx).unwrap();
    assert_eq!(snapshot.state, LifecycleState::CredentialedServer);
    assert_eq!(snapshot.certificate.as_deref().map(str::len), Some(64));

    let session = lib.session_new(Some(&ctx)).unwrap();
    lib.session_free(session);
    assert!(lib.context_snapshot(&ctx).unwrap().method_live);
    let _ = lib.context_free(&ctx);
    assert_eq!(lib.census().live_total(), 0);
}

#[test]
fn der_encoded_credentials_load_with_der_tag_only() {
    let lib = ModelLibrary::new();
    let ctx = context(&lib, Role::Server);
    let pem = certs().join("server-cert.pem");
    let der = certs().join("server-cert.der");

    let err = lib
        .use_certificate_file(Some(&ctx), Some(pem.as_path()), EncodingTag::DER)
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::MalformedMaterial);
    lib.use_certificate_file(Some(&ctx), Some(der.as_path()), EncodingTag::DER)
        .unwrap();
    lib.use_private_key_file(
        Some(&ctx),
        Some(certs().join("server-key.der").as_path()),
        EncodingTag::DER,
    )
    .unwrap();
    assert_eq!(
        lib.context_snapshot(&ctx).unwrap().state,
        LifecycleState::CredentialedServer
    );
    let _ = lib.context_free(&ctx);
}

#[test]
fn pem_and_der_fingerprints_agree() {
    let lib = ModelLibrary::new();
    let a = context(&lib, Role::Server);
    let b = context(&lib, Role::Server);
    lib.use_certificate_file(Some(&a), Some(certs().join("server-cert.pem").as_path()), EncodingTag::PEM)
        .unwrap();
    lib.use_certificate_file(Some(&b), Some(certs().join("server-cert.der").as_path()), EncodingTag::DER)
        .unwrap();
    assert_eq!(
        lib.context_snapshot(&a).unwrap().certificate,
        lib.context_snapshot(&b).unwrap().certificate
    );
    let _ = lib.context_free(&a);
    let _ = lib.context_free(&b);
}

#[test]
fn failed_loads_leave_context_unchanged() {
    let lib = ModelLibrary::new();
    let ctx = context(&lib, Role::Server);
    lib.use_certificate_file(
        Some(&ctx),
        Some(certs().join("server-cert.pem").as_path()),
        EncodingTag::PEM,
    )
    .unwrap();
    let before = lib.context_snapshot(&ctx).unwrap();

    let bogus = bogus_file();
    let missing = certs().join("does-not-exist.pem");
    let err = lib
        .use_certificate_file(Some(&ctx), Some(bogus.path()), EncodingTag::PEM)
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::MalformedMaterial);
    let err = lib
        .use_certificate_file(Some(&ctx), Some(missing.as_path()), EncodingTag::PEM)
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::NotFound);
    let err = lib
        .use_private_key_file(Some(&ctx), Some(bogus.path()), EncodingTag::PEM)
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::MalformedMaterial);
    let err = lib
        .load_verify_locations(Some(&ctx), Some(bogus.path()), None)
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::MalformedMaterial);

    assert_eq!(lib.context_snapshot(&ctx).unwrap(), before);
    let _ = lib.context_free(&ctx);
}

#[test]
fn client_session_requires_trust_when_enforced() {
    let lib = ModelLibrary::new();
    let ctx = context(&lib, Role::Client);
    let err = lib.session_new(Some(&ctx)).unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::PreconditionUnmet);

    lib.load_verify_locations(Some(&ctx), Some(certs().join("ca-cert.pem").as_path()), None)
        .unwrap();
    assert_eq!(
        lib.context_snapshot(&ctx).unwrap().state,
        LifecycleState::TrustedClient
    );
    let session = lib.session_new(Some(&ctx)).unwrap();
    lib.session_free(session);
    let _ = lib.context_free(&ctx);
    assert_eq!(lib.census().live_total(), 0);
}

#[test]
fn permissive_policy_allows_untrusted_client_sessions() {
    let lib = ModelLibrary::with_options(
        ModelOptions::default().with_client_trust(ClientTrustPolicy::Permissive),
    );
    let ctx = context(&lib, Role::Client);
    let session = lib.session_new(Some(&ctx)).unwrap();
    lib.session_free(session);
    let _ = lib.context_free(&ctx);
}

#[test]
fn trust_directory_and_reload() {
    let lib = ModelLibrary::new();
    let ctx = context(&lib, Role::Client);
    let ca_dir = workspace_root().join("tests/fixtures/ca-dir");

    lib.load_verify_locations(Some(&ctx), None, Some(ca_dir.as_path()))
        .unwrap();
    lib.load_verify_locations(Some(&ctx), Some(certs().join("ca-cert.pem").as_path()), None)
        .unwrap();
    let snapshot = lib.context_snapshot(&ctx).unwrap();
    assert_eq!(snapshot.trust_loads, 2);

    // The superseded trust block outlives the context.
    let _ = lib.context_free(&ctx);
    assert_eq!(lib.census().trust_blocks, 1);
}

#[test]
fn unusable_directory_beside_good_file_is_ignored() {
    let lib = ModelLibrary::new();
    let ctx = context(&lib, Role::Client);
    let empty = tempfile::tempdir().unwrap();
    lib.load_verify_locations(
        Some(&ctx),
        Some(certs().join("ca-cert.pem").as_path()),
        Some(empty.path()),
    )
    .unwrap();

    let err = lib
        .load_verify_locations(Some(&ctx), None, Some(empty.path()))
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::MalformedMaterial);
    let err = lib
        .load_verify_locations(Some(&ctx), None, Some(empty.path().join("absent").as_path()))
        .unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::NotFound);
    let _ = lib.context_free(&ctx);
}
