//! Domain layer of the disposition engine.

pub mod policy;
pub mod request;

pub use policy::{generate_code, CodePolicy, CODE_ALPHABET};
pub use request::DispositionRequest;
