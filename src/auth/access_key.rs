//! Develocity access key grammar
//!
//! An access key names one credential per host: `host1=key1;host2=key2`.
//! The short-lived token exchange swaps each per-host key for a token and
//! re-joins the result in the same shape.

/// One `host=key` entry of an access key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKey {
    pub host: String,
    pub key: String,
}

/// Parse an access key into its per-host entries, skipping malformed ones
pub fn parse(raw: &str) -> Vec<HostKey> {
    raw.split(';')
        .filter_map(|entry| {
            let (host, key) = entry.split_once('=')?;
            let host = host.trim();
            let key = key.trim();
            if host.is_empty() || key.is_empty() {
                return None;
            }
            Some(HostKey {
                host: host.to_string(),
                key: key.to_string(),
            })
        })
        .collect()
}

/// Join per-host entries back into the `host=key;host2=key2` form
pub fn join(entries: &[HostKey]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}={}", entry.host, entry.key))
        .collect::<Vec<_>>()
        .join(";")
}
