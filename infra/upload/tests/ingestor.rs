use sluice_upload::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn png_bytes() -> Vec<u8> {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.extend_from_slice(&[0x42; 24]);
    bytes
}

#[tokio::test]
async fn test_connect_creates_and_canonicalizes_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested").join("uploads");

    let ingestor = Ingestor::builder().root(&root).connect().await.unwrap();

    assert!(root.is_dir());
    assert_eq!(ingestor.root(), root.canonicalize().unwrap());
}

#[tokio::test]
async fn test_connect_without_create_requires_root() {
    let temp = TempDir::new().unwrap();

    let err = Ingestor::builder().root(temp.path().join("missing")).create(false).connect().await.unwrap_err();
    assert_eq!(err.kind(), UploadErrorKind::RootUnavailable);
}

#[tokio::test]
async fn test_ingest_png() {
    let temp = TempDir::new().unwrap();
    let ingestor = Ingestor::builder().root(temp.path()).connect().await.unwrap();

    let candidate = UploadCandidate::from_bytes(png_bytes(), "image/png").with_filename("avatar.png");
    let dest = ingestor.ingest(candidate).await.unwrap();

    assert_eq!(fs::read(dest.path()).unwrap(), png_bytes());
    assert_ne!(dest.file_name(), "avatar.png");
    assert!(dest.file_name().ends_with(".png"));
}

#[tokio::test]
async fn test_ingest_rejects_spoofed_image_before_writing() {
    let temp = TempDir::new().unwrap();
    let ingestor = Ingestor::builder().root(temp.path()).connect().await.unwrap();

    let candidate = UploadCandidate::from_bytes(b"#!/bin/sh\nrm -rf /\n".to_vec(), "image/png");
    let err = ingestor.ingest(candidate).await.unwrap_err();

    assert_eq!(err.kind(), UploadErrorKind::SignatureMismatch);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_ingest_csv_validates_but_is_not_persistable() {
    let temp = TempDir::new().unwrap();
    let ingestor = Ingestor::builder().root(temp.path()).connect().await.unwrap();

    let mut candidate = UploadCandidate::from_bytes(b"a,b\n".to_vec(), "text/csv");
    ingestor.validate(&mut candidate).unwrap();

    let err = ingestor.ingest(candidate).await.unwrap_err();
    assert_eq!(err.kind(), UploadErrorKind::UnrecognizedType);
}

#[tokio::test]
async fn test_policy_limit_applies_to_persist() {
    let temp = TempDir::new().unwrap();
    let policy = ValidationPolicy::new(8, ["image/png"]).unwrap();
    let ingestor = Ingestor::builder().root(temp.path()).policy(policy).connect().await.unwrap();

    let err = ingestor.persist(png_bytes()).await.unwrap_err();
    assert_eq!(err.kind(), UploadErrorKind::TooLarge);
}

#[tokio::test]
async fn test_namespaced_views_are_isolated() {
    let temp = TempDir::new().unwrap();
    let ingestor = Ingestor::builder().root(temp.path()).connect().await.unwrap();

    let deck_a = ingestor.namespace("deck_a").unwrap();
    let deck_b = ingestor.namespace("deck_b").unwrap();
    let a = deck_a.persist(png_bytes()).await.unwrap();
    let b = deck_b.ingest(UploadCandidate::from_bytes(png_bytes(), "image/png")).await.unwrap();

    assert!(a.relative().starts_with("deck_a"));
    assert!(b.relative().starts_with("deck_b"));
    assert_eq!(deck_a.namespace().as_str(), "deck_a");
    assert!(ingestor.namespace("../deck").is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_persists_never_collide() {
    let temp = TempDir::new().unwrap();
    let ingestor = Ingestor::builder().root(temp.path()).connect().await.unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let ingestor = ingestor.clone();
            tokio::spawn(async move { ingestor.persist(png_bytes()).await })
        })
        .collect();

    let mut names = std::collections::HashSet::new();
    for task in tasks {
        let dest = task.await.unwrap().unwrap();
        assert!(names.insert(dest.file_name().to_owned()));
    }
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 32);
}

#[tokio::test]
async fn test_connect_purges_stale_temp_files() {
    let temp = TempDir::new().unwrap();
    let leftover = temp.path().join(".abc.png.zz.sluicetmp");
    fs::write(&leftover, b"half written").unwrap();
    fs::write(temp.path().join("kept.png"), b"done").unwrap();

    Ingestor::builder().root(temp.path()).stale_after(Duration::ZERO).connect().await.unwrap();

    assert!(!leftover.exists());
    assert!(temp.path().join("kept.png").exists());
}

#[tokio::test]
async fn test_purge_keeps_fresh_temp_files() {
    let temp = TempDir::new().unwrap();
    let ingestor = Ingestor::builder().root(temp.path()).connect().await.unwrap();
    let fresh = temp.path().join(".abc.png.zz.sluicetmp");
    fs::write(&fresh, b"in flight").unwrap();

    let report = ingestor.purge_tmp().await;

    assert!(report.is_empty());
    assert!(fresh.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_connect_rejects_symlinked_root() {
    let temp = TempDir::new().unwrap();
    let real = temp.path().join("real");
    fs::create_dir(&real).unwrap();
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let err = Ingestor::builder().root(&link).connect().await.unwrap_err();
    assert_eq!(err.kind(), UploadErrorKind::SymlinkDetected);
}
