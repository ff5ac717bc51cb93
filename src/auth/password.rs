use tracing::error;

/// Work factor for every stored credential. Fixed configuration; raising it
/// only affects hashes created after the change.
const BCRYPT_COST: u32 = 12;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let hash = bcrypt::hash(plain, BCRYPT_COST).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(hash)
}

/// Returns `Ok(false)` for a wrong password; errors only on a malformed hash.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(plain, hash).map_err(|e| {
        error!(error = %e, "bcrypt parse hash error");
        anyhow::anyhow!(e.to_string())
    })
}
