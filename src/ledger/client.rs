use crate::config::Config;
use crate::ledger::models::{OwnedObject, SentTransaction};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),

    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Read access to the ledger. Implemented over Sui JSON-RPC in production
/// and by an in-memory double in tests.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// All objects currently attributed to `owner`, with type and content
    /// expanded.
    async fn owned_objects(&self, owner: &str) -> Result<Vec<OwnedObject>, ClientError>;

    /// A single object by id, with content expanded.
    async fn object(&self, object_id: &str) -> Result<OwnedObject, ClientError>;

    /// Transactions sent by `from`, most recent first, bounded by `limit`,
    /// with effects expanded.
    async fn sent_transactions(
        &self,
        from: &str,
        limit: usize,
    ) -> Result<Vec<SentTransaction>, ClientError>;
}

pub struct SuiReadClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl SuiReadClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        info!(
            "Initializing Sui read client with RPC endpoint: {}",
            config.sui_rpc_url
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.rpc_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            rpc_url: config.sui_rpc_url.clone(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let envelope: RpcEnvelope<T> = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = envelope.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        envelope.result.ok_or_else(|| {
            ClientError::MalformedResponse(format!("{method} returned neither result nor error"))
        })
    }
}

#[async_trait]
impl LedgerReader for SuiReadClient {
    async fn owned_objects(&self, owner: &str) -> Result<Vec<OwnedObject>, ClientError> {
        let page: Page<ObjectEntry> = self
            .call(
                "suix_getOwnedObjects",
                json!([owner, { "options": { "showType": true, "showContent": true } }]),
            )
            .await?;

        Ok(page
            .data
            .into_iter()
            .filter_map(ObjectEntry::into_owned)
            .collect())
    }

    async fn object(&self, object_id: &str) -> Result<OwnedObject, ClientError> {
        let entry: ObjectEntry = self
            .call(
                "sui_getObject",
                json!([object_id, { "showType": true, "showContent": true }]),
            )
            .await?;

        entry
            .into_owned()
            .ok_or_else(|| ClientError::NotFound(object_id.to_string()))
    }

    async fn sent_transactions(
        &self,
        from: &str,
        limit: usize,
    ) -> Result<Vec<SentTransaction>, ClientError> {
        let page: Page<TxBlockEntry> = self
            .call(
                "suix_queryTransactionBlocks",
                json!([
                    {
                        "filter": { "FromAddress": from },
                        "options": { "showInput": true, "showEffects": true, "showEvents": true }
                    },
                    null,
                    limit,
                    true
                ]),
            )
            .await?;

        Ok(page
            .data
            .into_iter()
            .map(|tx| SentTransaction {
                success: tx
                    .effects
                    .map(|e| e.status.status == "success")
                    .unwrap_or(false),
                timestamp_ms: tx.timestamp_ms.as_ref().and_then(value_to_i64),
                digest: tx.digest,
            })
            .collect())
    }
}

// Wire shapes for the three fullnode reads. Only the parts the history view
// consumes are bound; everything else passes through untouched.

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct ObjectEntry {
    data: Option<ObjectData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectData {
    object_id: String,
    #[serde(rename = "type")]
    type_tag: Option<String>,
    content: Option<ObjectContent>,
}

#[derive(Deserialize)]
struct ObjectContent {
    #[serde(rename = "type")]
    type_tag: Option<String>,
    #[serde(default)]
    fields: Value,
}

impl ObjectEntry {
    /// Entries without data or a type tag cannot be classified and are
    /// dropped at the wire boundary.
    fn into_owned(self) -> Option<OwnedObject> {
        let data = self.data?;
        let (content_type, fields) = match data.content {
            Some(content) => (content.type_tag, content.fields),
            None => (None, Value::Null),
        };
        let type_tag = content_type.or(data.type_tag)?;

        Some(OwnedObject {
            object_id: data.object_id,
            type_tag,
            fields,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxBlockEntry {
    digest: String,
    timestamp_ms: Option<Value>,
    effects: Option<TxEffects>,
}

#[derive(Deserialize)]
struct TxEffects {
    status: TxStatus,
}

#[derive(Deserialize)]
struct TxStatus {
    status: String,
}

// timestampMs is a string on current fullnodes, a number on older ones
fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
