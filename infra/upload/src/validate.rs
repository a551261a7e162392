use crate::candidate::UploadCandidate;
use crate::error::UploadError;
use crate::policy::{ValidationPolicy, normalize_content_type};
use crate::signature::{ContentSignature, SNIFF_LEN};
use std::io::{Read, Seek};

const IMAGE_FAMILY: &str = "image/";

/// Gate an upload against `policy`. Nothing is returned on success; the candidate's read
/// position is unchanged either way.
///
/// Checks run in a fixed order: caller filename (if present and the policy asks for it),
/// size, declared type, then for image types the leading bytes.
///
/// # Errors
/// * [`UploadError::InvalidFilename`] for an unsafe caller filename.
/// * [`UploadError::TooLarge`] when the stream exceeds the size limit.
/// * [`UploadError::DisallowedType`] when the declared type is not in the allowed set.
/// * [`UploadError::SignatureMismatch`] when an image's bytes are not what it claims.
/// * [`UploadError::StreamUnavailable`] when the stream cannot be measured or read.
pub fn validate<R: Read + Seek>(
    candidate: &mut UploadCandidate<R>,
    policy: &ValidationPolicy,
) -> Result<(), UploadError> {
    if policy.rejects_unsafe_filenames()
        && let Some(name) = candidate.filename()
    {
        validate_filename(name)?;
    }

    let size = candidate.len()?;
    let limit = policy.max_size_bytes();
    if size > limit {
        return Err(UploadError::TooLarge { size, limit, context: None });
    }

    let declared = normalize_content_type(candidate.content_type());
    if !policy.allows_normalized(&declared) {
        return Err(UploadError::DisallowedType { content_type: declared.into(), context: None });
    }

    if declared.starts_with(IMAGE_FAMILY) {
        let detected = ContentSignature::sniff(&candidate.head(SNIFF_LEN)?);
        let matches = detected.is_known() && ContentSignature::from_mime(&declared) == Some(detected);
        if !matches {
            return Err(UploadError::SignatureMismatch {
                declared: declared.into(),
                detected,
                context: None,
            });
        }
    }

    Ok(())
}

/// Rejects caller filenames that could only be meant as a path: empty names, names
/// containing `..` or NUL, and absolute names (leading `/` or `\`).
///
/// Passing this check does not make a filename usable as a destination; destinations
/// are always generated.
///
/// # Errors
/// [`UploadError::InvalidFilename`] describing the first problem found.
pub fn validate_filename(name: &str) -> Result<(), UploadError> {
    let problem = if name.is_empty() {
        Some("filename is empty")
    } else if name.contains("..") {
        Some("filename contains '..'")
    } else if name.contains('\0') {
        Some("filename contains a NUL byte")
    } else if name.starts_with('/') || name.starts_with('\\') || std::path::Path::new(name).is_absolute() {
        Some("filename is an absolute path")
    } else {
        None
    };

    problem.map_or(Ok(()), |message| {
        Err(UploadError::InvalidFilename { message: message.into(), context: None })
    })
}
