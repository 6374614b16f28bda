//! Identity registry and certificate store.
//!
//! An *identity* is a named set of general names persisted as one TOML file.
//! [`CertificateStore`] pairs the [`IdentityRegistry`] holding those files
//! with a shared [`MintingTool`](certkeys_mint::MintingTool) and hands out
//! [`CertificateBinding`]s that read, cache and regenerate certificates.
//!
//! ```text
//! <base>/certificates.toml     registry config (custom_cert, cached_cert, globals)
//! <base>/custom/<identity>     identity files
//! <base>/cached/               mkcert binary, rootCA.pem, rootCA-key.pem
//! <base>/cached/certs/<identity>.{crt,key,pem,toml}
//! ```

mod binding;
mod record;
mod registry;
mod store;

pub use binding::CertificateBinding;
pub use record::IdentityRecord;
pub use registry::{IdentityRegistry, DEFAULT_CONFIG};
pub use store::CertificateStore;
pub use certkeys_core::{CertError, Result};
