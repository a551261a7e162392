#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Sluice crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! sluice-derive.workspace = true
//! thiserror.workspace = true
//! ```

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Turns a plain enum into a fully wired error type.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless the enum already derives them.
/// * `<ErrorName>Ext` trait with `.context(...)` for `Result<T, ErrorName>` and for
///   `Result<T, SourceError>` of every variant carrying a `source` field.
/// * `From<SourceError>` for every variant carrying a `source` field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant is present.
/// * `<ErrorName>Kind`: a fieldless `Copy` mirror of the variants, returned by
///   `ErrorName::kind()`. `Kind::as_str()` yields a stable `snake_case` code.
/// * `ErrorName::is_environment_fault()`: `true` for variants annotated with
///   `#[fault(environment)]`, `false` otherwise (`#[fault(input)]` is accepted too).
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with **named-field** variants only.
/// 2. A `context` field must be typed `Option<Cow<'static, str>>`.
/// 3. Variants with a `source` field (or a field marked `#[source]`/`#[from]`) must
///    also have a `context` field.
/// 4. Only one error enum per module, the macro emits a private `format_context` helper.
///
/// # Example
///
/// ```rust,ignore
/// use sluice_derive::sluice_error;
/// use std::borrow::Cow;
///
/// #[sluice_error]
/// pub enum DiskError {
///     #[fault(environment)]
///     #[error("Write failed{}: {source}", format_context(.context))]
///     Write { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Name rejected{}: {message}", format_context(.context))]
///     BadName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn save(path: &std::path::Path) -> Result<(), DiskError> {
///     std::fs::write(path, b"x").context("Saving marker")?;
///     Ok(())
/// }
///
/// let err = save("/nonexistent/x".as_ref()).unwrap_err();
/// assert_eq!(err.kind(), DiskErrorKind::Write);
/// assert_eq!(err.kind().as_str(), "write");
/// assert!(err.is_environment_fault());
/// ```
#[proc_macro_attribute]
pub fn sluice_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
