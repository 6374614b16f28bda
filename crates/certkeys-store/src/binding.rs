//! One identity paired with the shared minting tool.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use certkeys_core::fs::{self, PUBLIC_FILE_MODE};
use certkeys_core::x509::CertSummary;
use certkeys_core::{CertBundle, CertError, GeneralName, Result};
use certkeys_mint::MintingTool;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::record::IdentityRecord;

/// Subdirectory of the tool cache holding generated bundles.
pub(crate) const BUNDLE_DIR: &str = "certs";

/// Extension of the file recording what a bundle was minted with.
const STAMP_EXT: &str = "toml";

/// Request parameters not visible in the certificate itself.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct MintStamp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validity: Option<u32>,
}

/// An identity and the certificate generated for it.
///
/// The bundle lives in `<cache>/certs/<identity>.{crt,key,pem}` next to a
/// `<identity>.toml` stamp, and is regenerated whenever it no longer
/// matches the identity exactly.
#[derive(Debug, Clone)]
pub struct CertificateBinding {
    record: IdentityRecord,
    tool: MintingTool,
    slot: PathBuf,
}

impl CertificateBinding {
    /// Bind `record` to `tool`.
    #[must_use]
    pub fn new(record: IdentityRecord, tool: MintingTool) -> Self {
        let slot = Self::slot_in(tool.cache_dir(), record.name());
        Self { record, tool, slot }
    }

    pub(crate) fn slot_in(cache_dir: &Path, identity: &str) -> PathBuf {
        cache_dir.join(BUNDLE_DIR).join(identity)
    }

    /// Identity name
    #[must_use]
    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// Underlying record
    #[must_use]
    pub const fn record(&self) -> &IdentityRecord {
        &self.record
    }

    /// Underlying record, mutable
    pub fn record_mut(&mut self) -> &mut IdentityRecord {
        &mut self.record
    }

    /// Side-file stem of the cached bundle
    #[must_use]
    pub fn slot(&self) -> &Path {
        &self.slot
    }

    /// Get-or-create a general name on the record.
    pub fn lookup(&mut self, name: &str) -> &mut GeneralName {
        self.record.lookup(name)
    }

    /// Strict lookup on the record.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GeneralName> {
        self.record.get(name)
    }

    /// Remove a general name from the record. The cached bundle is kept
    /// until the next read notices it no longer matches.
    pub fn delete(&mut self, name: &str) -> bool {
        self.record.delete(name)
    }

    /// Requested leaf validity in days
    #[must_use]
    pub const fn validity(&self) -> Option<u32> {
        self.record.validity_days()
    }

    /// Set the requested leaf validity in days
    pub fn set_validity(&mut self, days: Option<u32>) {
        self.record.set_validity_days(days);
    }

    /// Persist the record.
    pub async fn save(&self) -> Result<bool> {
        self.record.dump(None).await?;
        Ok(true)
    }

    /// The cached bundle if it still matches the record.
    ///
    /// Missing, unreadable or expired bundles yield `None`, as do bundles
    /// whose SANs differ from the record's expanded values or that were
    /// minted with another validity. Addresses are resolved to compare.
    pub async fn cached(&self) -> Result<Option<CertBundle>> {
        let bundle = match CertBundle::load(&self.slot).await {
            Ok(bundle) => bundle,
            Err(e) if e.is_not_found() => {
                debug!(identity = self.name(), "no cached bundle");
                return Ok(None);
            }
            Err(CertError::Certificate(reason)) => {
                warn!(identity = self.name(), %reason, "cached certificate unreadable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let summary = bundle.inspect()?;
        let expected = self.expected_values().await?;
        let stamp = self.load_stamp().await?;
        if let Some(reason) = staleness(&summary, &expected, stamp.as_ref(), self.validity()) {
            warn!(identity = self.name(), %reason, "cached bundle is stale");
            return Ok(None);
        }

        debug!(identity = self.name(), days_remaining = summary.days_remaining(), "cached bundle hit");
        Ok(Some(CertBundle::new(
            bundle.crt().to_string(),
            bundle.key().to_string(),
            self.record_names(),
        )))
    }

    /// Return the certificate for this identity.
    ///
    /// A fresh cached bundle is returned as is. Otherwise the bundle is
    /// minted and cached when `auto_generate` is set, and
    /// [`CertError::NotFound`] is returned when it is not.
    pub async fn read(&self, auto_generate: bool) -> Result<CertBundle> {
        if self.record.is_empty() {
            return Err(CertError::EmptyIdentity {
                name: self.name().to_string(),
            });
        }

        if let Some(bundle) = self.cached().await? {
            return Ok(bundle);
        }
        if !auto_generate {
            return Err(CertError::not_found(format!(
                "certificate for identity '{}'",
                self.name()
            )));
        }

        let names: Vec<GeneralName> = self.record.iter().cloned().collect();
        let bundle = self.tool.generate(&names, self.validity()).await?;
        if self.forget().await? {
            info!(identity = self.name(), "replaced stale bundle");
        }
        bundle.dump(&self.slot).await?;
        self.save_stamp().await?;
        info!(identity = self.name(), slot = %self.slot.display(), "bundle cached");
        Ok(bundle)
    }

    /// Delete the cached bundle. Returns whether one existed.
    pub async fn forget(&self) -> Result<bool> {
        let removed = CertBundle::remove(&self.slot).await?;
        fs::remove_if_exists(&self.stamp_file()).await?;
        Ok(removed)
    }

    /// Every SAN value the record asks for.
    async fn expected_values(&self) -> Result<BTreeSet<String>> {
        let mut values = BTreeSet::new();
        for gn in &self.record {
            values.extend(gn.values().await?);
        }
        Ok(values)
    }

    fn stamp_file(&self) -> PathBuf {
        let mut file = OsString::from(self.slot.as_os_str());
        file.push(".");
        file.push(STAMP_EXT);
        PathBuf::from(file)
    }

    /// The stamp of the cached bundle; `None` if absent or unreadable.
    async fn load_stamp(&self) -> Result<Option<MintStamp>> {
        let file = self.stamp_file();
        let Some(text) = fs::read_optional(&file).await? else {
            return Ok(None);
        };
        match toml::from_str(&text) {
            Ok(stamp) => Ok(Some(stamp)),
            Err(e) => {
                warn!(path = %file.display(), error = %e, "unreadable bundle stamp");
                Ok(None)
            }
        }
    }

    async fn save_stamp(&self) -> Result<()> {
        let stamp = MintStamp {
            validity: self.validity(),
        };
        let text = toml::to_string(&stamp).map_err(|e| CertError::Config {
            path: self.stamp_file().display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write_atomic(&self.stamp_file(), text, PUBLIC_FILE_MODE).await
    }

    fn record_names(&self) -> Vec<String> {
        self.record.iter().map(|gn| gn.name().to_string()).collect()
    }
}

/// Why a cached certificate no longer matches, if it does not.
fn staleness(
    summary: &CertSummary,
    expected: &BTreeSet<String>,
    stamp: Option<&MintStamp>,
    validity: Option<u32>,
) -> Option<String> {
    if summary.is_expired() {
        return Some(format!("expired at {}", summary.not_after));
    }

    let certified: BTreeSet<&String> = summary.alt_names.iter().collect();
    if let Some(value) = expected.iter().find(|v| !certified.contains(v)) {
        return Some(format!("missing {value}"));
    }
    if let Some(value) = certified.iter().find(|v| !expected.contains(**v)) {
        return Some(format!("no longer requested: {value}"));
    }

    let minted_with = stamp.and_then(|s| s.validity);
    if minted_with != validity {
        return Some(format!(
            "validity changed from {minted_with:?} to {validity:?} days"
        ));
    }
    None
}
