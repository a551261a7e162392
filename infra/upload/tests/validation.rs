use sluice_upload::*;
use std::io::{Seek, SeekFrom};

fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.resize(len.max(PNG_MAGIC.len()), 0xAB);
    bytes
}

#[test]
fn test_csv_under_limit_accepted() {
    let policy = ValidationPolicy::new(1024, ["text/csv"]).unwrap();
    let mut candidate = UploadCandidate::from_bytes(b"a,b\n1,2\n34".to_vec(), "text/csv");
    assert_eq!(candidate.len().unwrap(), 10);

    assert!(validate(&mut candidate, &policy).is_ok());
}

#[test]
fn test_csv_over_limit_too_large() {
    let policy = ValidationPolicy::new(1024, ["text/csv"]).unwrap();
    let mut candidate = UploadCandidate::from_bytes(vec![b'x'; 2048], "text/csv");

    match validate(&mut candidate, &policy).unwrap_err() {
        UploadError::TooLarge { size, limit, .. } => {
            assert_eq!(size, 2048);
            assert_eq!(limit, 1024);
        },
        other => panic!("expected TooLarge, got {other}"),
    }
}

#[test]
fn test_exact_limit_accepted() {
    let policy = ValidationPolicy::new(16, ["text/csv"]).unwrap();
    let mut candidate = UploadCandidate::from_bytes(vec![b'x'; 16], "text/csv");
    assert!(validate(&mut candidate, &policy).is_ok());
}

#[test]
fn test_disallowed_type() {
    let policy = ValidationPolicy::default();
    let mut candidate = UploadCandidate::from_bytes(b"MZ\x90\x00".to_vec(), "application/x-msdownload");

    let err = validate(&mut candidate, &policy).unwrap_err();
    assert_eq!(err.kind(), UploadErrorKind::DisallowedType);
    assert!(!err.is_environment_fault());
}

#[test]
fn test_png_declared_with_png_bytes() {
    let policy = ValidationPolicy::default();
    let mut candidate = UploadCandidate::from_bytes(png_bytes(64), "image/png");
    assert!(validate(&mut candidate, &policy).is_ok());
}

#[test]
fn test_png_declared_with_other_bytes() {
    let policy = ValidationPolicy::default();
    let mut candidate = UploadCandidate::from_bytes(b"<html>not a png</html>".to_vec(), "image/png");

    match validate(&mut candidate, &policy).unwrap_err() {
        UploadError::SignatureMismatch { declared, detected, .. } => {
            assert_eq!(declared, "image/png");
            assert_eq!(detected, ContentSignature::Unknown);
        },
        other => panic!("expected SignatureMismatch, got {other}"),
    }
}

#[test]
fn test_jpeg_without_trailer_accepted() {
    let policy = ValidationPolicy::default();
    let mut candidate = UploadCandidate::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00], "IMAGE/JPEG");
    assert!(validate(&mut candidate, &policy).is_ok());
}

#[test]
fn test_csv_is_not_sniffed() {
    let policy = ValidationPolicy::default();
    let mut candidate = UploadCandidate::from_bytes(png_bytes(32), "text/csv");
    assert!(validate(&mut candidate, &policy).is_ok());
}

#[test]
fn test_per_call_overrides() {
    let shared = ValidationPolicy::default();
    let strict = shared.with_max_size(4).unwrap().with_allowed_types(["application/json"]).unwrap();

    let mut json = UploadCandidate::from_bytes(b"{\"a\":1}".to_vec(), "application/json");
    assert!(validate(&mut json, &shared).is_ok());
    assert_eq!(validate(&mut json, &strict).unwrap_err().kind(), UploadErrorKind::TooLarge);

    let mut csv = UploadCandidate::from_bytes(b"a".to_vec(), "text/csv");
    assert_eq!(validate(&mut csv, &strict).unwrap_err().kind(), UploadErrorKind::DisallowedType);
}

#[test]
fn test_unsafe_filename_rejected_first() {
    let policy = ValidationPolicy::default();
    let mut candidate =
        UploadCandidate::from_bytes(vec![0u8; 64], "application/zip").with_filename("../../etc/passwd");

    let err = validate(&mut candidate, &policy).unwrap_err();
    assert_eq!(err.kind(), UploadErrorKind::InvalidFilename);
}

#[test]
fn test_stream_position_preserved_for_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.csv");
    std::fs::write(&path, b"name,score\nada,10\n").unwrap();

    let mut candidate = UploadCandidate::open(&path, "text/csv").unwrap();
    candidate.get_mut().seek(SeekFrom::Start(5)).unwrap();

    validate(&mut candidate, &ValidationPolicy::default()).unwrap();
    assert_eq!(candidate.get_mut().stream_position().unwrap(), 5);
}

#[test]
fn test_kind_codes_are_stable() {
    assert_eq!(UploadErrorKind::TooLarge.as_str(), "too_large");
    assert_eq!(UploadErrorKind::DisallowedType.as_str(), "disallowed_type");
    assert_eq!(UploadErrorKind::SignatureMismatch.as_str(), "signature_mismatch");
    assert_eq!(UploadErrorKind::UnrecognizedType.as_str(), "unrecognized_type");
    assert_eq!(UploadErrorKind::RootUnavailable.as_str(), "root_unavailable");
    assert_eq!(UploadErrorKind::SymlinkDetected.as_str(), "symlink_detected");
    assert_eq!(UploadErrorKind::TraversalDetected.as_str(), "traversal_detected");
    assert_eq!(UploadErrorKind::WriteFailed.as_str(), "write_failed");
}
