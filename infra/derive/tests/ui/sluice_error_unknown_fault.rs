use sluice_derive::sluice_error;

#[sluice_error]
pub enum DemoError {
    #[fault(cosmic_rays)]
    #[error("Flipped bit")]
    Flipped {},
}

fn main() {}
