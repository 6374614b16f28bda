//! Subject alternative name entries.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CertError, Result};

/// One DNS name or IP address covered by a certificate.
///
/// The wildcard and address flags only apply to domains; setting them on an
/// IP entry leaves them `false`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneralName {
    name: String,
    is_domain: bool,
    include_subdomains: bool,
    resolve_address: bool,
}

/// Serialized form of a [`GeneralName`].
///
/// Flags are only written when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralNameOptions {
    /// Domain or IP literal
    pub generalname: String,
    /// Also cover `*.{generalname}`
    #[serde(default, skip_serializing_if = "is_false")]
    pub subdomains: bool,
    /// Also cover the address `generalname` resolves to
    #[serde(default, skip_serializing_if = "is_false")]
    pub getaddress: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl GeneralName {
    /// Create an entry with both flags cleared.
    #[must_use]
    pub fn new(domain_or_address: &str) -> Self {
        Self::with_flags(domain_or_address, false, false)
    }

    /// Create an entry, dropping flags that do not apply to IP literals.
    #[must_use]
    pub fn with_flags(domain_or_address: &str, subdomains: bool, getaddress: bool) -> Self {
        let (name, is_domain) = Self::format(domain_or_address);
        Self {
            name,
            is_domain,
            include_subdomains: is_domain && subdomains,
            resolve_address: is_domain && getaddress,
        }
    }

    /// Canonicalize `input`: IP literals become their canonical text and are
    /// not domains; anything else is returned unchanged as a domain.
    #[must_use]
    pub fn format(input: &str) -> (String, bool) {
        input
            .parse::<IpAddr>()
            .map_or_else(|_| (input.to_string(), true), |ip| (ip.to_string(), false))
    }

    /// Forward-resolve `domain_name` with the system resolver.
    ///
    /// IP literals resolve to themselves. IPv4 results are preferred.
    pub async fn resolve(domain_name: &str) -> Result<String> {
        if let Ok(ip) = domain_name.parse::<IpAddr>() {
            return Ok(ip.to_string());
        }

        debug!(name = domain_name, "resolving general name");
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((domain_name, 0))
            .await
            .map_err(|e| CertError::Resolution {
                name: domain_name.to_string(),
                reason: e.to_string(),
            })?
            .map(|addr| addr.ip())
            .collect();

        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .map(ToString::to_string)
            .ok_or_else(|| CertError::Resolution {
                name: domain_name.to_string(),
                reason: "no addresses returned".to_string(),
            })
    }

    /// Rebuild an entry from its serialized options.
    #[must_use]
    pub fn load(options: &GeneralNameOptions) -> Self {
        Self::with_flags(&options.generalname, options.subdomains, options.getaddress)
    }

    /// Serialized options for this entry.
    #[must_use]
    pub fn options(&self) -> GeneralNameOptions {
        GeneralNameOptions {
            generalname: self.name.clone(),
            subdomains: self.include_subdomains,
            getaddress: self.resolve_address,
        }
    }

    /// Canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// False for IP literals.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        self.is_domain
    }

    /// Whether `*.{name}` is covered.
    #[must_use]
    pub const fn include_subdomains(&self) -> bool {
        self.include_subdomains
    }

    /// Set the wildcard flag. No-op for IP entries.
    pub fn set_include_subdomains(&mut self, value: bool) {
        self.include_subdomains = self.is_domain && value;
    }

    /// Whether the resolved address is covered.
    #[must_use]
    pub const fn resolve_address(&self) -> bool {
        self.resolve_address
    }

    /// Set the address flag. No-op for IP entries.
    pub fn set_resolve_address(&mut self, value: bool) {
        self.resolve_address = self.is_domain && value;
    }

    /// Values that need no lookup: the name and, if enabled, its wildcard.
    #[must_use]
    pub fn literal_values(&self) -> Vec<String> {
        let mut values = vec![self.name.clone()];
        if self.include_subdomains {
            values.push(format!("*.{}", self.name));
        }
        values
    }

    /// All values this entry contributes to a certificate, in order:
    /// name, wildcard, resolved address.
    pub async fn values(&self) -> Result<Vec<String>> {
        let mut values = self.literal_values();
        if self.resolve_address {
            values.push(Self::resolve(&self.name).await?);
        }
        Ok(values)
    }
}

impl fmt::Display for GeneralName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeneralName({})", self.name)
    }
}

impl From<&GeneralNameOptions> for GeneralName {
    fn from(options: &GeneralNameOptions) -> Self {
        Self::load(options)
    }
}
