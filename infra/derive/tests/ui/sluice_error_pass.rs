use sluice_derive::sluice_error;
use std::borrow::Cow;

#[sluice_error]
pub enum DemoError {
    #[fault(environment)]
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let err = DemoError::from("x");
    let _ = (err.kind(), err.is_environment_fault(), DemoErrorKind::Io.as_str());
}
