use crate::signature::ContentSignature;
use std::borrow::Cow;

/// Every way an upload can be refused or fail.
///
/// All kinds are terminal for the call that raised them. Only the variants marked as
/// environment faults (`WriteFailed`, `StreamUnavailable`, `Internal`) describe a
/// server-side problem; the rest describe bad input.
#[sluice_derive::sluice_error]
pub enum UploadError {
    #[error("Upload exceeds the size limit{}: {size} > {limit} bytes", format_context(.context))]
    TooLarge { size: u64, limit: u64, context: Option<Cow<'static, str>> },

    #[error("Declared content type is not allowed{}: '{content_type}'", format_context(.context))]
    DisallowedType { content_type: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error(
        "Content does not match the declared type{}: declared '{declared}', detected {detected}",
        format_context(.context)
    )]
    SignatureMismatch {
        declared: Cow<'static, str>,
        detected: ContentSignature,
        context: Option<Cow<'static, str>>,
    },

    #[error("Content signature is not recognized{}", format_context(.context))]
    UnrecognizedType { context: Option<Cow<'static, str>> },

    #[error("Upload root is unavailable{}: {message}", format_context(.context))]
    RootUnavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Symbolic link on the destination path{}: {message}", format_context(.context))]
    SymlinkDetected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Destination escapes the upload root{}: {message}", format_context(.context))]
    TraversalDetected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[fault(environment)]
    #[error("Failed to write upload{}: {source}", format_context(.context))]
    WriteFailed { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Unsafe filename{}: {message}", format_context(.context))]
    InvalidFilename { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid validation policy{}: {message}", format_context(.context))]
    InvalidPolicy { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[fault(environment)]
    #[error("Upload stream is unavailable{}: {message}", format_context(.context))]
    StreamUnavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[fault(environment)]
    #[error("Internal upload fault{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl UploadError {
    pub(crate) fn stream(err: &std::io::Error, what: &'static str) -> Self {
        Self::StreamUnavailable { message: err.to_string().into(), context: Some(what.into()) }
    }
}
