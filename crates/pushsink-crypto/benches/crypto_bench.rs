//! Performance benchmarks for the push receive pipeline

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use pushsink_crypto::aead::{decrypt_payload, encrypt_payload};
use pushsink_crypto::headers::ParsedHeaders;
use pushsink_crypto::kdf::{ContentSecrets, derive_for_receiver};
use pushsink_crypto::{
    AssertionClaims, AssertionSigner, AssertionVerifier, KeyMaterial, KeyMaterialBuilder,
    PushReceiver, PushSealer,
};
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000;

fn setup() -> (Arc<KeyMaterial>, PushSealer) {
    let signer = AssertionSigner::generate().unwrap();
    let mut builder = KeyMaterialBuilder::new();
    builder.generate().unwrap();
    builder.set_verification_key(signer.verification_key());
    let keys = Arc::new(builder.build().unwrap());

    let sealer = PushSealer::new(
        &keys.subscriber().public_key_bytes(),
        keys.auth_secret().clone(),
        signer,
    )
    .unwrap();
    (keys, sealer)
}

fn claims() -> AssertionClaims {
    AssertionClaims::valid_for(NOW, Duration::from_secs(3600))
}

/// Benchmark header parsing
fn bench_header_parse(c: &mut Criterion) {
    let (_, sealer) = setup();
    let sealed = sealer.seal(b"hello", &claims()).unwrap();

    c.bench_function("header_parse", |b| {
        b.iter(|| ParsedHeaders::parse(black_box(&sealed.headers)).unwrap());
    });
}

/// Benchmark ES256 assertion verification
fn bench_assertion_verify(c: &mut Criterion) {
    let signer = AssertionSigner::generate().unwrap();
    let verifier = AssertionVerifier::new(&signer.verification_key());
    let token = signer.sign(&claims()).unwrap();

    c.bench_function("assertion_verify", |b| {
        b.iter(|| verifier.verify_at(black_box(token.as_bytes()), NOW).unwrap());
    });
}

/// Benchmark ECDH + HKDF key schedule
fn bench_key_derivation(c: &mut Criterion) {
    let (keys, sealer) = setup();
    let sealed = sealer.seal(b"hello", &claims()).unwrap();
    let parsed = ParsedHeaders::parse(&sealed.headers).unwrap();

    c.bench_function("derive_for_receiver", |b| {
        b.iter(|| derive_for_receiver(&keys, black_box(&parsed.dh), black_box(&parsed.salt)).unwrap());
    });
}

/// Benchmark AES-128-GCM payload decryption
fn bench_payload_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_decrypt");
    let secrets = ContentSecrets::new([0x42; 16], [0x24; 12]);

    // Push services cap payloads at roughly 4 KiB
    for size in [64, 512, 4096] {
        let message = vec![0xAA; size];
        let ciphertext = encrypt_payload(&secrets, &message, 0).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &ciphertext, |b, ct| {
            b.iter(|| decrypt_payload(&secrets, black_box(ct)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the full receive pipeline
fn bench_receive(c: &mut Criterion) {
    let (keys, sealer) = setup();
    let receiver = PushReceiver::new(keys);
    let sealed = sealer
        .seal(br#"{"title":"bench","body":"message"}"#, &claims())
        .unwrap();

    c.bench_function("receive", |b| {
        b.iter(|| {
            receiver
                .receive_at(black_box(&sealed.headers), black_box(&sealed.body), NOW)
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_header_parse,
    bench_assertion_verify,
    bench_key_derivation,
    bench_payload_decrypt,
    bench_receive,
);
criterion_main!(benches);
