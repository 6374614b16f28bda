//! Value types shared by the store and the minting tool.

mod bundle;
mod general_name;

pub use bundle::CertBundle;
pub use general_name::{GeneralName, GeneralNameOptions};
