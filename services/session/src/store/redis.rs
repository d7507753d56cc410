use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use rust_common::{PlatformError, RetryPolicy};
use tracing::info;

use super::{SessionRecord, SessionStore};

const FIELD_SUBJECT: &str = "subject";
const FIELD_HASH: &str = "refresh_credential_hash";
const FIELD_ROTATIONS: &str = "rotation_count";
const FIELD_CREATED: &str = "created_at";
const FIELD_UPDATED: &str = "updated_at";

// KEYS[1] session key; ARGV expected hash, new hash, updated_at.
// Returns -1 when absent, 0 when the hash changed, 1 when swapped.
const CAS_SCRIPT: &str = r"
local current = redis.call('HGET', KEYS[1], 'refresh_credential_hash')
if not current then
  return -1
end
if current ~= ARGV[1] then
  return 0
end
redis.call('HSET', KEYS[1], 'refresh_credential_hash', ARGV[2], 'updated_at', ARGV[3])
redis.call('HINCRBY', KEYS[1], 'rotation_count', 1)
return 1
";

/// Session store backed by one Redis hash per subject.
///
/// Records carry no TTL; a session lives until it is overwritten.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    key_prefix: String,
    cas: Script,
}

impl RedisSessionStore {
    /// Connect to `redis_url`, retrying transient failures with `retry`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an unparsable URL, otherwise the last connection
    /// error once retries are exhausted.
    pub async fn connect(
        redis_url: &str,
        key_prefix: impl Into<String>,
        retry: &RetryPolicy,
    ) -> Result<Self, PlatformError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PlatformError::invalid_input(format!("redis url: {e}")))?;

        let conn = retry
            .execute(|| {
                let client = client.clone();
                async move { ConnectionManager::new(client).await.map_err(map_redis_error) }
            })
            .await?;

        let key_prefix = key_prefix.into();
        info!(key_prefix = %key_prefix, "Connected to Redis session store");

        Ok(Self {
            conn,
            key_prefix,
            cas: Script::new(CAS_SCRIPT),
        })
    }

    fn key(&self, subject: &str) -> String {
        session_key(&self.key_prefix, subject)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn upsert(&self, subject: &str, refresh_credential_hash: &str) -> Result<(), PlatformError> {
        let key = self.key(subject);
        let fields = record_to_fields(&SessionRecord::new(subject, refresh_credential_hash));
        let mut conn = self.conn.clone();

        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .hset_multiple(&key, &fields)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn find_by_subject(&self, subject: &str) -> Result<SessionRecord, PlatformError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> =
            conn.hgetall(self.key(subject)).await.map_err(map_redis_error)?;

        if fields.is_empty() {
            return Err(PlatformError::not_found(format!("session {subject}")));
        }
        record_from_fields(subject, &fields)
    }

    async fn compare_and_swap(
        &self,
        subject: &str,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        let outcome: i64 = self
            .cas
            .key(self.key(subject))
            .arg(expected_hash)
            .arg(new_hash)
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        match outcome {
            1 => Ok(true),
            0 => Ok(false),
            _ => Err(PlatformError::not_found(format!("session {subject}"))),
        }
    }
}

fn session_key(prefix: &str, subject: &str) -> String {
    format!("{prefix}:{subject}")
}

fn map_redis_error(err: RedisError) -> PlatformError {
    if err.is_timeout() {
        PlatformError::Timeout(err.to_string())
    } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        PlatformError::unavailable(err.to_string())
    } else {
        PlatformError::internal(err.to_string())
    }
}

fn record_to_fields(record: &SessionRecord) -> [(&'static str, String); 5] {
    [
        (FIELD_SUBJECT, record.subject.clone()),
        (FIELD_HASH, record.refresh_credential_hash.clone()),
        (FIELD_ROTATIONS, record.rotation_count.to_string()),
        (FIELD_CREATED, record.created_at.to_rfc3339()),
        (FIELD_UPDATED, record.updated_at.to_rfc3339()),
    ]
}

fn record_from_fields(subject: &str, fields: &HashMap<String, String>) -> Result<SessionRecord, PlatformError> {
    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| PlatformError::internal(format!("session {subject} missing field {name}")))
    };
    let timestamp = |name: &str| -> Result<DateTime<Utc>, PlatformError> {
        DateTime::parse_from_rfc3339(field(name)?)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| PlatformError::internal(format!("session {subject} field {name}: {e}")))
    };

    Ok(SessionRecord {
        subject: subject.to_string(),
        refresh_credential_hash: field(FIELD_HASH)?.clone(),
        rotation_count: field(FIELD_ROTATIONS)?
            .parse()
            .map_err(|e| PlatformError::internal(format!("session {subject} field {FIELD_ROTATIONS}: {e}")))?,
        created_at: timestamp(FIELD_CREATED)?,
        updated_at: timestamp(FIELD_UPDATED)?,
    })
}
