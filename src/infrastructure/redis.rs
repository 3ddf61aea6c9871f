use crate::config::{RedisConfig, RedisSentinelConfig};
use crate::domain::ports::TokenStore;
use crate::domain::transaction::{MerchantReference, TransactionId};
use crate::error::{IssuerError, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType};
use redis::{
    ConnectionAddr, ConnectionInfo, ErrorKind, FromRedisValue, RedisConnectionInfo, RedisError,
    RedisResult,
};
use std::time::Duration;
use tokio::sync::Mutex;

/// Lifetime of a correlation. Transactions that are never polled expire on their own.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Builds the key under which a correlation is stored.
pub fn token_key(namespace: &str, transaction_id: &TransactionId) -> String {
    format!("{}:token:{}", namespace, transaction_id)
}

/// Where connections come from: a fixed node, or whichever node a sentinel reports as
/// the current master.
enum Endpoint {
    Node(redis::Client),
    Sentinel(SentinelClient),
}

impl Endpoint {
    async fn open(&mut self) -> RedisResult<MultiplexedConnection> {
        match self {
            Endpoint::Node(client) => client.get_multiplexed_async_connection().await,
            Endpoint::Sentinel(client) => client.get_async_connection().await,
        }
    }
}

struct Link {
    endpoint: Endpoint,
    connection: Option<MultiplexedConnection>,
    generation: u64,
}

/// A token store backed by Redis.
///
/// One multiplexed connection is shared by all requests. When it breaks it is dropped and
/// the next command dials again, so a restarted server or a sentinel failover is picked up
/// without restarting the process.
pub struct RedisTokenStore {
    link: Mutex<Link>,
    namespace: String,
}

/// Errors after which the connection cannot be trusted anymore. `READONLY` means the node
/// was demoted to a replica by a failover.
fn needs_reconnect(err: &RedisError) -> bool {
    err.is_io_error() || err.is_unrecoverable_error() || err.kind() == ErrorKind::ReadOnly
}

impl RedisTokenStore {
    fn with_endpoint(endpoint: Endpoint, namespace: impl Into<String>) -> Self {
        Self {
            link: Mutex::new(Link {
                endpoint,
                connection: None,
                generation: 0,
            }),
            namespace: namespace.into(),
        }
    }

    /// Connects to a single Redis node and verifies it answers `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;
        let store = Self::with_endpoint(Endpoint::Node(client), config.namespace.clone());
        store.ping().await?;

        tracing::info!(host = %config.host, port = config.port, "connected to redis");
        Ok(store)
    }

    /// Resolves the current master through a sentinel and connects to it. The master is
    /// resolved again on every reconnect.
    pub async fn connect_sentinel(config: &RedisSentinelConfig) -> Result<Self> {
        let sentinel_info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.sentinel_host.clone(), config.sentinel_port),
            redis: RedisConnectionInfo {
                username: config.sentinel_username.clone(),
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let node_info = SentinelNodeConnectionInfo {
            tls_mode: None,
            redis_connection_info: Some(RedisConnectionInfo {
                password: config.password.clone(),
                ..Default::default()
            }),
        };
        let client = SentinelClient::build(
            vec![sentinel_info],
            config.master_name.clone(),
            Some(node_info),
            SentinelServerType::Master,
        )?;
        let store = Self::with_endpoint(Endpoint::Sentinel(client), config.namespace());
        store.ping().await?;

        tracing::info!(
            sentinel = %config.sentinel_host,
            master = %config.master_name,
            "connected to redis through sentinel"
        );
        Ok(store)
    }

    /// Returns the shared connection, dialing a new one if there is none.
    async fn connection(&self) -> Result<(u64, MultiplexedConnection)> {
        let mut link = self.link.lock().await;
        if let Some(connection) = &link.connection {
            return Ok((link.generation, connection.clone()));
        }

        let connection = link.endpoint.open().await?;
        link.generation += 1;
        link.connection = Some(connection.clone());
        Ok((link.generation, connection))
    }

    /// Drops the connection of `generation`, unless another request already replaced it.
    async fn invalidate(&self, generation: u64) {
        let mut link = self.link.lock().await;
        if link.generation == generation {
            link.connection = None;
        }
    }

    /// Runs a command, reconnecting and retrying once if the connection turned out broken.
    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        let (generation, mut connection) = self.connection().await?;
        match cmd.query_async(&mut connection).await {
            Err(err) if needs_reconnect(&err) => {
                tracing::warn!(error = %err, "redis connection lost, reconnecting");
                self.invalidate(generation).await;
                let (_, mut connection) = self.connection().await?;
                Ok(cmd.query_async(&mut connection).await?)
            }
            result => Ok(result?),
        }
    }

    async fn ping(&self) -> Result<()> {
        let _: String = self.query(&redis::cmd("PING")).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn store(
        &self,
        transaction_id: &TransactionId,
        merchant_reference: &MerchantReference,
    ) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(token_key(&self.namespace, transaction_id))
            .arg(merchant_reference.as_str())
            .arg("EX")
            .arg(TOKEN_TTL.as_secs());
        let _: () = self.query(&cmd).await?;
        Ok(())
    }

    async fn retrieve(&self, transaction_id: &TransactionId) -> Result<MerchantReference> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(token_key(&self.namespace, transaction_id));
        let value: Option<String> = self.query(&cmd).await?;
        value
            .map(MerchantReference::from)
            .ok_or_else(|| IssuerError::NotFound(transaction_id.clone()))
    }

    async fn remove(&self, transaction_id: &TransactionId) -> Result<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(token_key(&self.namespace, transaction_id));
        let removed: u64 = self.query(&cmd).await?;
        if removed == 0 {
            return Err(IssuerError::NotFound(transaction_id.clone()));
        }
        Ok(())
    }
}
