//! Domain Services
//!
//! Pure derivation and hashing logic for device fingerprints.

use std::sync::LazyLock;

use platform::crypto::{sha256_hex, sha256_hex_prefix};
use regex::Regex;

use crate::domain::value_objects::{
    FingerprintId, GraphicsInfo, Salt, SignalSet, UNKNOWN,
};

/// Hex length of the condensed user-agent signal
pub const USER_AGENT_HASH_LEN: usize = 16;

static BROWSER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Chrome|Firefox|Safari|Edge)/[\d.]+").expect("static regex is valid")
});

/// Browser name/version tokens of a user agent, `|`-joined
///
/// `Mozilla/5.0 (...) Chrome/120.0.0.0 Safari/537.36` becomes
/// `Chrome/120.0.0.0|Safari/537.36`. Everything else is dropped.
pub fn condense_user_agent(user_agent: &str) -> String {
    BROWSER_TOKEN
        .find_iter(user_agent)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

/// User-agent signal: 16 hex chars of the hashed browser tokens
pub fn user_agent_signal(user_agent: &str) -> String {
    sha256_hex_prefix(
        condense_user_agent(user_agent).as_bytes(),
        USER_AGENT_HASH_LEN,
    )
}

/// GPU signal from WebGL parameters
///
/// Prefers the unmasked vendor/renderer pair and falls back to the generic
/// (often masked) parameters. The two halves are joined with `~` so the
/// value never introduces an extra `|` separator into the hash input.
pub fn gpu_signal(info: &GraphicsInfo) -> String {
    if let (Some(vendor), Some(renderer)) = (&info.unmasked_vendor, &info.unmasked_renderer) {
        return format!("{}~{}", vendor, renderer);
    }
    format!(
        "{}~{}",
        info.vendor.as_deref().unwrap_or(UNKNOWN),
        info.renderer.as_deref().unwrap_or(UNKNOWN)
    )
}

/// Exact bytes fed to SHA-256: signals in order, then the salt, `|`-joined
pub fn hash_input(signals: &SignalSet, salt: &Salt) -> String {
    let mut input = signals.ordered().join("|");
    input.push('|');
    input.push_str(salt.as_str());
    input
}

/// `SHA256(s1|s2|...|s8|salt)` as a fingerprint identifier
pub fn compute_fingerprint(signals: &SignalSet, salt: &Salt) -> FingerprintId {
    FingerprintId::from_digest_hex(sha256_hex(hash_input(signals, salt).as_bytes()))
}
