use proptest::prelude::*;
use sluice_upload::*;

fn non_magic() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..256)
        .prop_filter("must not start with a known signature", |bytes| {
            !bytes.starts_with(&PNG_MAGIC) && !bytes.starts_with(&JPEG_SOI)
        })
}

proptest! {
    #[test]
    fn unknown_without_magic(bytes in non_magic()) {
        prop_assert_eq!(sniff(&bytes), ContentSignature::Unknown);
    }

    #[test]
    fn png_regardless_of_suffix(suffix in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&suffix);
        prop_assert_eq!(sniff(&bytes), ContentSignature::Png);
    }

    #[test]
    fn jpeg_regardless_of_suffix(suffix in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut bytes = JPEG_SOI.to_vec();
        bytes.extend_from_slice(&suffix);
        prop_assert_eq!(sniff(&bytes), ContentSignature::Jpeg);
    }

    #[test]
    fn first_sixteen_bytes_decide(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let head = &bytes[..bytes.len().min(SNIFF_LEN)];
        prop_assert_eq!(sniff(&bytes), sniff(head));
    }

    #[test]
    fn unknown_bytes_never_persist(bytes in non_magic()) {
        let temp = tempfile::tempdir().unwrap();
        let err = persist(temp.path(), &bytes, 1024).unwrap_err();
        prop_assert_eq!(err.kind(), UploadErrorKind::UnrecognizedType);
        prop_assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn namespaces_are_plain_components(raw in "\\PC{0,80}") {
        if let Ok(ns) = Namespace::try_from(raw.as_str()) {
            let mut components = std::path::Path::new(ns.as_str()).components();
            prop_assert!(matches!(components.next(), Some(std::path::Component::Normal(_))));
            prop_assert!(components.next().is_none());
            prop_assert!(ns.as_str().len() <= MAX_NAMESPACE_LEN);
        }
    }

    #[test]
    fn containment_rejects_string_prefix_siblings(suffix in "[a-z\\-]{1,12}") {
        let root = std::path::Path::new("/data/up");
        let sibling = std::path::PathBuf::from(format!("/data/up{suffix}/file.png"));
        prop_assert!(!is_contained(root, &sibling));
        let inside = root.join(format!("{suffix}.png"));
        prop_assert!(is_contained(root, &inside));
    }
}
