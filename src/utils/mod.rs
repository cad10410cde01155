//! Utility functions and helpers.

pub mod fs;
pub mod report;

use url::Url;

/// Host name of a site URL, used for the `CNAME` file.
pub fn host_of(base_url: &str) -> crate::error::Result<Option<String>> {
    let url = Url::parse(base_url)?;
    Ok(url.host_str().map(|s| s.to_string()))
}
