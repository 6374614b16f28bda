//! X.509 inspection of minted material.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, TimeZone, Utc};
use x509_parser::extensions::GeneralName as SanEntry;
use x509_parser::pem::parse_x509_pem;
use x509_parser::time::ASN1Time;

use crate::error::{CertError, Result};

/// Facts read back from a PEM certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertSummary {
    /// Subject distinguished name
    pub subject: String,
    /// Not valid after
    pub not_after: DateTime<Utc>,
    /// Subject alternative names (DNS names and IP literals)
    pub alt_names: Vec<String>,
    /// Basic constraints mark this certificate as a CA
    pub is_ca: bool,
}

impl CertSummary {
    /// Whole days until expiry, negative once expired.
    #[must_use]
    pub fn days_remaining(&self) -> i64 {
        (self.not_after - Utc::now()).num_days()
    }

    /// Returns true once `not_after` has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.not_after
    }
}

/// Parse the first certificate block of `crt_pem`.
pub fn inspect(crt_pem: &str) -> Result<CertSummary> {
    let (_, pem) =
        parse_x509_pem(crt_pem.as_bytes()).map_err(|e| CertError::Certificate(e.to_string()))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| CertError::Certificate(e.to_string()))?;

    let alt_names = cert
        .subject_alternative_name()
        .map_err(|e| CertError::Certificate(e.to_string()))?
        .map(|ext| ext.value.general_names.iter().filter_map(san_to_string).collect())
        .unwrap_or_default();

    let is_ca = cert
        .basic_constraints()
        .ok()
        .flatten()
        .is_some_and(|ext| ext.value.ca);

    Ok(CertSummary {
        subject: cert.subject().to_string(),
        not_after: asn1_to_utc(cert.validity().not_after),
        alt_names,
        is_ca,
    })
}

fn san_to_string(entry: &SanEntry<'_>) -> Option<String> {
    match entry {
        SanEntry::DNSName(name) => Some((*name).to_string()),
        SanEntry::IPAddress(bytes) => ip_from_bytes(bytes).map(|ip| ip.to_string()),
        _ => None,
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    <[u8; 16]>::try_from(bytes)
        .ok()
        .map(|octets| IpAddr::V6(Ipv6Addr::from(octets)))
}

fn asn1_to_utc(t: ASN1Time) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_alt_names_and_expiry() {
        let minted = rcgen::generate_simple_self_signed(vec![
            "example.com".to_string(),
            "*.example.com".to_string(),
            "127.0.0.1".to_string(),
        ])
        .unwrap();

        let summary = inspect(&minted.cert.pem()).unwrap();
        assert_eq!(
            summary.alt_names,
            vec!["example.com", "*.example.com", "127.0.0.1"]
        );
        assert!(!summary.is_ca);
        assert!(!summary.is_expired());
        assert!(summary.days_remaining() > 365);
    }

    #[test]
    fn rejects_garbage() {
        let err = inspect("not a certificate").unwrap_err();
        assert!(matches!(err, CertError::Certificate(_)));
    }
}
