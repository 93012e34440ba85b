use sha2::{Digest, Sha256};

const USER_ID_LEN: usize = 8;

/// Stable anonymous id for a caller: first 8 hex chars of SHA-256 over `"{origin}-{user_agent}"`
pub fn derive_user_id(origin: &str, user_agent: &str) -> String {
    let digest = Sha256::digest(format!("{}-{}", origin, user_agent).as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex.truncate(USER_ID_LEN);
    hex
}

/// Explicit ids win when they are non-blank
pub fn resolve_user_id(explicit: Option<&str>, origin: &str, user_agent: &str) -> String {
    match explicit.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => derive_user_id(origin, user_agent),
    }
}
