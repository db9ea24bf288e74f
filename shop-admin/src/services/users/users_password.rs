//! bcrypt hashing off the async runtime.

use anyhow::Result;
use shop_core::errors::ShopError;
use shop_core::ShopConfigSnapshot;

pub const DEFAULT_COST: u32 = 10;
const COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

pub fn bcrypt_cost(config: &ShopConfigSnapshot) -> u32 {
    config
        .get_u64("users.bcryptCost")
        .and_then(|c| u32::try_from(c).ok())
        .filter(|c| COST_RANGE.contains(c))
        .unwrap_or(DEFAULT_COST)
}

fn hashing_error(err: impl std::fmt::Display) -> anyhow::Error {
    ShopError::general_error("Password hashing failed")
        .with_source(anyhow::anyhow!(err.to_string()))
        .into_anyhow()
}

pub async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(hashing_error)?
        .map_err(hashing_error)
}

/// False for a wrong password and for a stored value that is not a hash.
pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(hashing_error)?;
    Ok(verified.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::ShopConfig;

    #[tokio::test]
    async fn hashes_verify_and_never_equal_the_input() {
        let hash = hash_password("s3cret!".to_string(), 4).await.unwrap();

        assert_ne!(hash, "s3cret!");
        assert!(verify_password("s3cret!".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
        assert!(!verify_password("s3cret!".to_string(), "plain".to_string()).await.unwrap());
    }

    #[test]
    fn out_of_range_cost_falls_back_to_default() {
        let mut config = ShopConfig::new();
        config.set("users.bcryptCost", "99");
        assert_eq!(bcrypt_cost(&config.snapshot()), DEFAULT_COST);

        config.set("users.bcryptCost", "4");
        assert_eq!(bcrypt_cost(&config.snapshot()), 4);
    }
}
