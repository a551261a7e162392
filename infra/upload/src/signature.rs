//! Content signature sniffing.
//!
//! Classification looks at leading magic bytes only. It is recomputed on every call and
//! never cached, the same buffer is not trusted to stay unchanged between calls.

use std::fmt;

/// The 8-byte PNG file signature.
pub const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
/// JPEG start-of-image marker.
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker.
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
/// Number of leading bytes that is always enough to classify a buffer.
pub const SNIFF_LEN: usize = 16;

/// What the bytes of an upload actually are, independent of any caller-supplied label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentSignature {
    Png,
    Jpeg,
    Unknown,
}

impl ContentSignature {
    /// Classifies a buffer. Total over every input; the empty buffer is [`Self::Unknown`].
    ///
    /// A JPEG is recognized by its start-of-image marker alone: a missing or damaged
    /// end-of-image marker does not demote it. Callers that need end-to-end integrity can
    /// add [`has_jpeg_trailer`] on top.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&PNG_MAGIC) {
            Self::Png
        } else if bytes.starts_with(&JPEG_SOI) {
            Self::Jpeg
        } else {
            Self::Unknown
        }
    }

    /// The signature a declared MIME type promises, if it is one we can sniff.
    ///
    /// Expects a normalized (trimmed, lowercase) content type.
    #[must_use]
    pub fn from_mime(content_type: &str) -> Option<Self> {
        match content_type {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// File extension used for persisted files. `None` means the content is not persistable.
    #[must_use]
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("png"),
            Self::Jpeg => Some("jpg"),
            Self::Unknown => None,
        }
    }

    /// Canonical MIME type for the signature.
    #[must_use]
    pub const fn mime(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("image/png"),
            Self::Jpeg => Some("image/jpeg"),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shorthand for [`ContentSignature::sniff`].
#[must_use]
pub fn sniff(bytes: &[u8]) -> ContentSignature {
    ContentSignature::sniff(bytes)
}

/// `true` when the buffer ends with the JPEG end-of-image marker.
///
/// Not used by [`sniff`]; offered for callers layering a stricter JPEG policy.
#[must_use]
pub fn has_jpeg_trailer(bytes: &[u8]) -> bool {
    bytes.len() >= JPEG_SOI.len() + JPEG_EOI.len() && bytes.ends_with(&JPEG_EOI)
}
