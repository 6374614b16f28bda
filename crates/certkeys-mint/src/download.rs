//! Release download of the minting tool.

use std::path::Path;

use certkeys_core::fs::{self, EXECUTABLE_MODE};
use certkeys_core::{CertError, Result};
use reqwest::Client as HttpClient;
use tracing::info;
use url::Url;

/// Download `url` to `target` in a single attempt.
///
/// The file is written atomically and marked executable; a failed request
/// leaves `target` untouched.
pub async fn fetch(http: &HttpClient, url: &Url, target: &Path) -> Result<()> {
    info!(url = %url, target = %target.display(), "downloading minting tool");

    let response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| CertError::Download(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CertError::Download(format!("{url} returned {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| CertError::Download(e.to_string()))?;
    if body.is_empty() {
        return Err(CertError::Download(format!("{url} returned an empty body")));
    }

    fs::write_atomic(target, body.to_vec(), EXECUTABLE_MODE)
        .await
        .map_err(|e| CertError::Download(format!("cannot write {}: {e}", target.display())))
}
