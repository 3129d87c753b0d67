//! Redis-backed record store.
//!
//! Records live under `<key_prefix><name>` with the key's TTL carrying the
//! record's lifespan. Natural expiry is observed through the keyspace
//! notification channel (`__keyevent@<db>__:expired`), filtered down to this
//! application's prefix.

use crate::codec;
use crate::error::{MetadataError, MetadataResult};
use crate::store::{ExpirationFeed, FEED_CAPACITY, RecordStore};
use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;
use async_trait::async_trait;
use ember_core::{FileName, FileRecord, LIFESPAN_UNLIMITED};
use futures::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// Redis-backed record store.
pub struct RedisStore {
    /// Kept for opening dedicated pub/sub connections.
    client: ::redis::Client,
    conn: Mutex<ConnectionManager>,
    key_prefix: String,
}

impl RedisStore {
    /// Connect to Redis and prepare the store.
    ///
    /// When `configure_notifications` is set, best-effort enables keyspace
    /// expiry events (`CONFIG SET notify-keyspace-events Ex`). Managed
    /// Redis services often forbid CONFIG; that failure is logged, not
    /// fatal, but without the events, time-expired blobs are never
    /// reclaimed, so the operator must enable them server-side instead.
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        configure_notifications: bool,
    ) -> MetadataResult<Self> {
        let client = ::redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        let store = Self {
            client,
            conn: Mutex::new(conn),
            key_prefix: key_prefix.into(),
        };

        if configure_notifications {
            // Overwrites any flag set the operator configured; "Ex" is the
            // minimum this store needs (keyevent channel, expired class).
            let mut conn = store.conn.lock().await;
            let result: ::redis::RedisResult<()> = ::redis::cmd("CONFIG")
                .arg("SET")
                .arg("notify-keyspace-events")
                .arg("Ex")
                .query_async(&mut *conn)
                .await;
            match result {
                Ok(()) => debug!("enabled redis keyspace expiry notifications"),
                Err(e) => warn!(
                    error = %e,
                    "could not enable keyspace notifications; ensure \
                     notify-keyspace-events includes 'Ex' or expired blobs \
                     will not be reclaimed"
                ),
            }
        }

        Ok(store)
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn create(&self, record: &FileRecord) -> MetadataResult<bool> {
        let key = self.key(record.name.as_str());
        let value = codec::encode(record)?;

        // SET NX [EX lifespan]: the atomic set-if-absent that makes record
        // creation exactly-once under concurrent uploads.
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(&key).arg(&value).arg("NX");
        if record.lifespan_secs != LIFESPAN_UNLIMITED {
            cmd.arg("EX").arg(record.lifespan_secs);
        }

        let mut conn = self.conn.lock().await;
        let reply: Option<String> = cmd.query_async(&mut *conn).await?;
        Ok(reply.is_some())
    }

    async fn get(&self, name: &FileName) -> MetadataResult<Option<FileRecord>> {
        let key = self.key(name.as_str());
        let mut conn = self.conn.lock().await;
        let value: Option<String> = conn.get(&key).await?;
        match value {
            Some(value) => Ok(Some(codec::decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, record: &FileRecord) -> MetadataResult<()> {
        let key = self.key(record.name.as_str());
        let value = codec::encode(record)?;

        // XX + KEEPTTL: overwrite in place without touching the remaining
        // lifespan. A Nil reply means the key expired between the caller's
        // read and this write; plain SET KEEPTTL would re-create it with no
        // TTL at all, so the miss is surfaced instead.
        let mut conn = self.conn.lock().await;
        let reply: Option<String> = ::redis::cmd("SET")
            .arg(&key)
            .arg(&value)
            .arg("XX")
            .arg("KEEPTTL")
            .query_async(&mut *conn)
            .await?;
        match reply {
            Some(_) => Ok(()),
            None => Err(MetadataError::NotFound(record.name.to_string())),
        }
    }

    async fn delete(&self, name: &FileName) -> MetadataResult<()> {
        let key = self.key(name.as_str());
        let mut conn = self.conn.lock().await;
        // DEL of a missing key is a no-op, which is exactly the idempotence
        // the exhaustion path wants.
        let _removed: i64 = conn.del(&key).await?;
        Ok(())
    }

    async fn subscribe_expirations(&self) -> MetadataResult<ExpirationFeed> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe("__keyevent@*__:expired").await?;

        let prefix = self.key_prefix.clone();
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);

        tokio::spawn(async move {
            let mut messages = pubsub.on_message();
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("expiration feed dropped, closing redis subscription");
                        break;
                    }
                    msg = messages.next() => {
                        let Some(msg) = msg else {
                            warn!("redis expiry subscription ended");
                            break;
                        };
                        let payload: String = match msg.get_payload() {
                            Ok(payload) => payload,
                            Err(e) => {
                                warn!(error = %e, "unreadable expiry notification payload");
                                continue;
                            }
                        };
                        // Events arrive for the whole database; only keys in
                        // our prefix belong to this application.
                        let Some(name) = payload.strip_prefix(&prefix) else {
                            continue;
                        };
                        if tx.send(name.to_string()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(ExpirationFeed::new(rx))
    }

    async fn health_check(&self) -> MetadataResult<()> {
        let mut conn = self.conn.lock().await;
        let _pong: String = ::redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}
