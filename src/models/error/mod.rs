mod api;
pub use api::*;

mod repository;
pub use repository::*;

mod signer;
pub use signer::*;

mod submitter;
pub use submitter::*;
