//! Adapters implementing the domain ports: token stores, the CM gateway client and the
//! credential signer.

pub mod cm_gateway;
pub mod in_memory;
pub mod jwt;
#[cfg(feature = "storage-redis")]
pub mod redis;

use crate::config::{Config, StorageType};
use crate::domain::ports::TokenStoreBox;
use crate::error::Result;
use in_memory::InMemoryTokenStore;

/// Builds the token store selected by `storage_type`.
///
/// Networked stores are contacted once here, so an unreachable backend fails startup
/// instead of the first request.
pub async fn create_token_store(config: &Config) -> Result<TokenStoreBox> {
    match config.storage_type {
        StorageType::Memory => {
            tracing::info!("using in-memory token storage");
            Ok(Box::new(InMemoryTokenStore::new()))
        }
        #[cfg(feature = "storage-redis")]
        StorageType::Redis => {
            tracing::info!("using redis token storage");
            let redis_config = config.redis_config()?;
            Ok(Box::new(self::redis::RedisTokenStore::connect(redis_config).await?))
        }
        #[cfg(feature = "storage-redis")]
        StorageType::RedisSentinel => {
            tracing::info!("using redis sentinel token storage");
            let sentinel_config = config.redis_sentinel_config()?;
            Ok(Box::new(
                self::redis::RedisTokenStore::connect_sentinel(sentinel_config).await?,
            ))
        }
        #[cfg(not(feature = "storage-redis"))]
        StorageType::Redis | StorageType::RedisSentinel => {
            Err(crate::error::ConfigError::Invalid(format!(
                "storage type {:?} requires the 'storage-redis' feature",
                config.storage_type
            ))
            .into())
        }
    }
}
