#![cfg(feature = "storage-redis")]

use iban_issuer::config::RedisConfig;
use iban_issuer::domain::ports::TokenStore;
use iban_issuer::domain::transaction::{MerchantReference, TransactionId};
use iban_issuer::error::IssuerError;
use iban_issuer::infrastructure::redis::RedisTokenStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// A minimal RESP server keeping string keys in memory and recording every command.
#[derive(Default)]
struct ServerState {
    data: HashMap<String, (String, Option<u64>)>,
    commands: Vec<Vec<String>>,
    accepted: usize,
    open: usize,
}

impl ServerState {
    fn apply(&mut self, args: &[String]) -> String {
        self.commands.push(args.to_vec());
        let name = args.first().map(|s| s.to_ascii_uppercase()).unwrap_or_default();
        match name.as_str() {
            "PING" => "+PONG\r\n".to_string(),
            "CLIENT" | "SELECT" | "AUTH" => "+OK\r\n".to_string(),
            "SET" => {
                let ttl = match args.get(3).map(|s| s.to_ascii_uppercase()).as_deref() {
                    Some("EX") => args.get(4).and_then(|s| s.parse().ok()),
                    _ => None,
                };
                self.data.insert(args[1].clone(), (args[2].clone(), ttl));
                "+OK\r\n".to_string()
            }
            "GET" => match self.data.get(&args[1]) {
                Some((value, _)) => format!("${}\r\n{}\r\n", value.len(), value),
                None => "$-1\r\n".to_string(),
            },
            "DEL" => {
                let removed = args[1..]
                    .iter()
                    .filter(|key| self.data.remove(*key).is_some())
                    .count();
                format!(":{}\r\n", removed)
            }
            "TTL" => match self.data.get(&args[1]) {
                Some((_, Some(ttl))) => format!(":{}\r\n", ttl),
                Some((_, None)) => ":-1\r\n".to_string(),
                None => ":-2\r\n".to_string(),
            },
            _ => "-ERR unknown command\r\n".to_string(),
        }
    }
}

struct ScriptedRedis {
    port: u16,
    state: Arc<Mutex<ServerState>>,
    disconnect: broadcast::Sender<()>,
}

impl ScriptedRedis {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(ServerState::default()));
        let (disconnect, _) = broadcast::channel(4);

        let accept_state = state.clone();
        let accept_disconnect = disconnect.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                {
                    let mut state = accept_state.lock().unwrap();
                    state.accepted += 1;
                    state.open += 1;
                }
                let state = accept_state.clone();
                let disconnect = accept_disconnect.subscribe();
                tokio::spawn(async move {
                    serve(socket, state.clone(), disconnect).await;
                    state.lock().unwrap().open -= 1;
                });
            }
        });

        Self {
            port,
            state,
            disconnect,
        }
    }

    fn config(&self) -> RedisConfig {
        RedisConfig {
            host: "127.0.0.1".into(),
            port: self.port,
            password: None,
            namespace: "iban-issuer".into(),
        }
    }

    /// Closes every open client socket, as a restarting server would.
    async fn drop_connections(&self) {
        let _ = self.disconnect.send(());
        for _ in 0..100 {
            if self.state.lock().unwrap().open == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("client sockets were not closed");
    }

    fn accepted(&self) -> usize {
        self.state.lock().unwrap().accepted
    }

    fn commands_named(&self, name: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .commands
            .iter()
            .filter(|args| args[0].eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }

    fn seed(&self, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .data
            .insert(key.to_string(), (value.to_string(), None));
    }
}

async fn serve(
    socket: TcpStream,
    state: Arc<Mutex<ServerState>>,
    mut disconnect: broadcast::Receiver<()>,
) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    loop {
        tokio::select! {
            _ = disconnect.recv() => return,
            command = read_command(&mut reader) => {
                let Ok(Some(args)) = command else { return };
                let reply = state.lock().unwrap().apply(&args);
                if write.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn read_command(
    reader: &mut BufReader<OwnedReadHalf>,
) -> std::io::Result<Option<Vec<String>>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count: usize = line.trim_end().trim_start_matches('*').parse().unwrap_or(0);

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len: usize = line.trim_end().trim_start_matches('$').parse().unwrap();
        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8(buf).unwrap());
    }
    Ok(Some(args))
}

#[tokio::test]
async fn test_connect_pings_the_server() {
    let server = ScriptedRedis::start().await;
    let _store = RedisTokenStore::connect(&server.config()).await.unwrap();

    assert_eq!(server.commands_named("PING").len(), 1);
}

#[tokio::test]
async fn test_store_sets_namespaced_key_with_one_day_expiry() {
    let server = ScriptedRedis::start().await;
    let store = RedisTokenStore::connect(&server.config()).await.unwrap();

    store
        .store(&TransactionId::new("T1"), &MerchantReference::new("M1"))
        .await
        .unwrap();

    let sets = server.commands_named("SET");
    assert_eq!(sets.len(), 1);
    assert_eq!(
        sets[0],
        vec!["SET", "iban-issuer:token:T1", "M1", "EX", "86400"]
    );
}

#[tokio::test]
async fn test_round_trip_and_single_retirement() {
    let server = ScriptedRedis::start().await;
    let store = RedisTokenStore::connect(&server.config()).await.unwrap();
    let id = TransactionId::new("T1");

    store.store(&id, &MerchantReference::new("M1")).await.unwrap();
    assert_eq!(store.retrieve(&id).await.unwrap().as_str(), "M1");

    store.remove(&id).await.unwrap();
    assert!(matches!(
        store.retrieve(&id).await,
        Err(IssuerError::NotFound(ref missing)) if missing == &id
    ));
    assert!(matches!(store.remove(&id).await, Err(IssuerError::NotFound(_))));
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let server = ScriptedRedis::start().await;
    let store = RedisTokenStore::connect(&server.config()).await.unwrap();

    let id = TransactionId::new("never-stored");
    assert!(matches!(store.retrieve(&id).await, Err(IssuerError::NotFound(_))));
    assert!(matches!(store.remove(&id).await, Err(IssuerError::NotFound(_))));
}

#[tokio::test]
async fn test_store_recovers_after_server_drops_connection() {
    let server = ScriptedRedis::start().await;
    let store = RedisTokenStore::connect(&server.config()).await.unwrap();
    assert_eq!(server.accepted(), 1);

    server.drop_connections().await;
    server.seed("iban-issuer:token:T1", "M1");

    let id = TransactionId::new("T1");
    let reference = tokio::time::timeout(Duration::from_secs(5), store.retrieve(&id))
        .await
        .expect("retrieve hung after disconnect")
        .unwrap();
    assert_eq!(reference.as_str(), "M1");
    assert_eq!(server.accepted(), 2);

    // The new connection keeps serving later commands.
    store.remove(&id).await.unwrap();
    assert_eq!(server.accepted(), 2);
}
