//! Gateway backed by an access node's REST API.
//!
//! ## Endpoints
//! - Emulator: `http://127.0.0.1:8888`
//! - Testnet: `https://rest-testnet.onflow.org`
//! - Mainnet: `https://rest-mainnet.onflow.org`
//!
//! ## Usage
//!
//! ```ignore
//! let gateway = RemoteGateway::new("access.mainnet.nodes.onflow.org:9000");
//! let block = gateway.get_latest_block()?;
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value as Json};
use tracing::debug;

use flow_types::encoding::{base64_decode, base64_encode};
use flow_types::env_utils::env_var_or;
use flow_types::{
    Account, AccountPublicKey, Address, Block, BlockEvents, Collection, Error, Event,
    HashAlgorithm, Identifier, ProposalKey, PublicKey, Result, SignatureAlgorithm, Transaction,
    TransactionResult, TransactionSignature, TransactionStatus, Value,
};

use crate::gateway::Gateway;
use crate::network::resolve_rest_endpoint;

/// Seal-poll interval override, in milliseconds.
pub const SEAL_POLL_ENV: &str = "FLOW_SEAL_POLL_MS";

/// Whole-request deadline override, in seconds. Also bounds KMS calls.
pub const HTTP_TIMEOUT_ENV: &str = "FLOW_HTTP_TIMEOUT_SECS";

/// TCP connect deadline override, in seconds.
pub const HTTP_CONNECT_TIMEOUT_ENV: &str = "FLOW_HTTP_CONNECT_TIMEOUT_SECS";

/// Deadlines and seal polling of a [`RemoteGateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl RemoteSettings {
    /// Defaults, with `FLOW_HTTP_TIMEOUT_SECS`, `FLOW_HTTP_CONNECT_TIMEOUT_SECS`
    /// and `FLOW_SEAL_POLL_MS` applied when set to a number.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            timeout: Duration::from_secs(env_var_or(HTTP_TIMEOUT_ENV, base.timeout.as_secs())),
            connect_timeout: Duration::from_secs(env_var_or(
                HTTP_CONNECT_TIMEOUT_ENV,
                base.connect_timeout.as_secs(),
            )),
            poll_interval: Duration::from_millis(env_var_or(
                SEAL_POLL_ENV,
                base.poll_interval.as_millis() as u64,
            )),
        }
    }
}

/// Gateway speaking the REST access API.
#[derive(Clone)]
pub struct RemoteGateway {
    host: String,
    endpoint: String,
    agent: ureq::Agent,
    poll_interval: Duration,
}

impl RemoteGateway {
    /// Gateway for a configured network host, tuned from the environment.
    pub fn new(host: &str) -> Self {
        Self::with_settings(host, RemoteSettings::from_env())
    }

    pub fn with_settings(host: &str, settings: RemoteSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .timeout_connect(settings.connect_timeout)
            .build();
        Self {
            host: host.to_string(),
            endpoint: resolve_rest_endpoint(host),
            agent,
            poll_interval: settings.poll_interval,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.endpoint, path)
    }

    fn get(&self, operation: &str, path: &str, query: &[(&str, &str)]) -> Result<Json> {
        let url = self.url(path);
        debug!(%url, operation, "gateway GET");
        let mut request = self.agent.get(&url);
        for (k, v) in query {
            request = request.query(k, v);
        }
        let response = request.call().map_err(|e| self.wrap(operation, e))?;
        response
            .into_json()
            .map_err(|e| Error::gateway(operation, format!("invalid response from {}: {}", self.host, e)))
    }

    fn post(&self, operation: &str, path: &str, query: &[(&str, &str)], body: &Json) -> Result<Json> {
        let url = self.url(path);
        debug!(%url, operation, "gateway POST");
        let mut request = self.agent.post(&url).set("Content-Type", "application/json");
        for (k, v) in query {
            request = request.query(k, v);
        }
        let response = request.send_json(body).map_err(|e| self.wrap(operation, e))?;
        response
            .into_json()
            .map_err(|e| Error::gateway(operation, format!("invalid response from {}: {}", self.host, e)))
    }

    /// Turn a transport error into a gateway error carrying the node's message.
    fn wrap(&self, operation: &str, err: ureq::Error) -> Error {
        match err {
            ureq::Error::Status(code, response) => {
                let body: Option<Json> = response.into_json().ok();
                let message = body
                    .as_ref()
                    .and_then(|b| b.get("message"))
                    .and_then(Json::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("status {}", code));
                Error::gateway(operation, message)
            }
            ureq::Error::Transport(t) => {
                Error::gateway(operation, format!("could not reach {}: {}", self.host, t))
            }
        }
    }
}

// ===== Response decoding =====

fn str_field<'a>(v: &'a Json, key: &str) -> &'a str {
    v.get(key).and_then(Json::as_str).unwrap_or_default()
}

/// The REST API encodes integers as decimal strings.
fn u64_field(v: &Json, key: &str) -> u64 {
    match v.get(key) {
        Some(Json::String(s)) => s.parse().unwrap_or_default(),
        Some(Json::Number(n)) => n.as_u64().unwrap_or_default(),
        _ => 0,
    }
}

fn id_field(v: &Json, key: &str) -> Result<Identifier> {
    Identifier::from_hex(str_field(v, key))
}

fn timestamp_field(v: &Json, key: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(str_field(v, key))
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

fn decode_block(v: &Json) -> Result<Block> {
    let header = v.get("header").unwrap_or(v);
    let payload = v.get("payload");
    let collection_guarantees = payload
        .and_then(|p| p.get("collection_guarantees"))
        .and_then(Json::as_array)
        .map(|items| {
            items
                .iter()
                .map(|g| id_field(g, "collection_id"))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();
    let seals = payload
        .and_then(|p| p.get("block_seals"))
        .and_then(Json::as_array)
        .map(Vec::len)
        .unwrap_or_default();
    Ok(Block {
        id: id_field(header, "id")?,
        parent_id: id_field(header, "parent_id")?,
        height: u64_field(header, "height"),
        timestamp: timestamp_field(header, "timestamp"),
        collection_guarantees,
        seals,
    })
}

fn first_block(v: Json) -> Result<Block> {
    match v {
        Json::Array(items) => items
            .first()
            .map(decode_block)
            .unwrap_or_else(|| Err(Error::gateway("get block", "no block returned"))),
        other => decode_block(&other),
    }
}

fn decode_event(v: &Json) -> Result<Event> {
    let payload = base64_decode(str_field(v, "payload"), "event payload")?;
    Ok(Event {
        event_type: str_field(v, "type").to_string(),
        transaction_id: id_field(v, "transaction_id")?,
        transaction_index: u64_field(v, "transaction_index") as u32,
        event_index: u64_field(v, "event_index") as u32,
        value: Value::decode(&payload)?,
    })
}

fn decode_account(v: &Json) -> Result<Account> {
    let address = Address::from_hex(str_field(v, "address"))?;
    let keys = v
        .get("keys")
        .and_then(Json::as_array)
        .map(|keys| keys.iter().map(decode_account_key).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    let mut contracts = BTreeMap::new();
    if let Some(map) = v.get("contracts").and_then(Json::as_object) {
        for (name, code) in map {
            let code = code.as_str().unwrap_or_default();
            contracts.insert(name.clone(), base64_decode(code, "contract code")?);
        }
    }
    Ok(Account {
        address,
        balance: u64_field(v, "balance"),
        keys,
        contracts,
    })
}

fn decode_account_key(v: &Json) -> Result<AccountPublicKey> {
    let sig_algo: SignatureAlgorithm = str_field(v, "signing_algorithm").parse()?;
    let hash_algo: HashAlgorithm = str_field(v, "hashing_algorithm").parse()?;
    Ok(AccountPublicKey {
        index: u64_field(v, "index") as u32,
        public_key: PublicKey::from_hex(sig_algo, str_field(v, "public_key"))?,
        sig_algo,
        hash_algo,
        weight: u64_field(v, "weight") as u32,
        sequence_number: u64_field(v, "sequence_number"),
        revoked: v.get("revoked").and_then(Json::as_bool).unwrap_or(false),
    })
}

fn encode_signatures(sigs: &[TransactionSignature]) -> Json {
    Json::Array(
        sigs.iter()
            .map(|s| {
                json!({
                    "address": s.address.hex(),
                    "key_index": s.key_index.to_string(),
                    "signature": base64_encode(&s.signature),
                })
            })
            .collect(),
    )
}

fn encode_transaction(tx: &Transaction) -> Json {
    json!({
        "script": base64_encode(&tx.script),
        "arguments": tx.arguments.iter().map(|a| base64_encode(a)).collect::<Vec<_>>(),
        "reference_block_id": tx.reference_block_id.hex(),
        "gas_limit": tx.gas_limit.to_string(),
        "payer": tx.payer.hex(),
        "proposal_key": {
            "address": tx.proposal_key.address.hex(),
            "key_index": tx.proposal_key.key_index.to_string(),
            "sequence_number": tx.proposal_key.sequence_number.to_string(),
        },
        "authorizers": tx.authorizers.iter().map(Address::hex).collect::<Vec<_>>(),
        "payload_signatures": encode_signatures(&tx.payload_signatures),
        "envelope_signatures": encode_signatures(&tx.envelope_signatures),
    })
}

fn decode_signatures(v: Option<&Json>) -> Result<Vec<TransactionSignature>> {
    v.and_then(Json::as_array)
        .map(|items| {
            items
                .iter()
                .map(|s| {
                    Ok(TransactionSignature {
                        address: Address::from_hex(str_field(s, "address"))?,
                        key_index: u64_field(s, "key_index") as u32,
                        signature: base64_decode(str_field(s, "signature"), "signature")?,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()
        .map(Option::unwrap_or_default)
}

fn decode_transaction(v: &Json) -> Result<Transaction> {
    let proposal = v.get("proposal_key").unwrap_or(&Json::Null);
    let arguments = v
        .get("arguments")
        .and_then(Json::as_array)
        .map(|args| {
            args.iter()
                .map(|a| base64_decode(a.as_str().unwrap_or_default(), "argument"))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();
    let authorizers = v
        .get("authorizers")
        .and_then(Json::as_array)
        .map(|items| {
            items
                .iter()
                .map(|a| Address::from_hex(a.as_str().unwrap_or_default()))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();
    Ok(Transaction {
        script: base64_decode(str_field(v, "script"), "script")?,
        arguments,
        reference_block_id: id_field(v, "reference_block_id")?,
        gas_limit: u64_field(v, "gas_limit"),
        proposal_key: ProposalKey {
            address: Address::from_hex(str_field(proposal, "address"))?,
            key_index: u64_field(proposal, "key_index") as u32,
            sequence_number: u64_field(proposal, "sequence_number"),
        },
        payer: Address::from_hex(str_field(v, "payer"))?,
        authorizers,
        payload_signatures: decode_signatures(v.get("payload_signatures"))?,
        envelope_signatures: decode_signatures(v.get("envelope_signatures"))?,
    })
}

fn decode_result(v: &Json) -> Result<TransactionResult> {
    let events = v
        .get("events")
        .and_then(Json::as_array)
        .map(|items| items.iter().map(decode_event).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    let error = Some(str_field(v, "error_message").to_string()).filter(|m| !m.is_empty());
    let block_id = Some(str_field(v, "block_id"))
        .filter(|s| !s.is_empty())
        .map(Identifier::from_hex)
        .transpose()?;
    Ok(TransactionResult {
        status: TransactionStatus::parse(str_field(v, "status")),
        status_code: u64_field(v, "status_code") as u32,
        error,
        events,
        block_id,
    })
}

impl Gateway for RemoteGateway {
    fn get_account(&self, address: Address) -> Result<Account> {
        let op = "get account";
        let v = self.get(op, &format!("/accounts/{}", address.hex()), &[("expand", "keys,contracts")])?;
        decode_account(&v).map_err(|e| Error::gateway(op, e))
    }

    fn send_signed_transaction(&self, tx: &Transaction) -> Result<Identifier> {
        let op = "submit transaction";
        let v = self.post(op, "/transactions", &[], &encode_transaction(tx))?;
        let id = id_field(&v, "id").map_err(|e| Error::gateway(op, e))?;
        debug!(id = %id, "transaction submitted");
        Ok(id)
    }

    fn get_transaction(&self, id: &Identifier) -> Result<Transaction> {
        let op = "get transaction";
        let v = self.get(op, &format!("/transactions/{}", id.hex()), &[])?;
        decode_transaction(&v).map_err(|e| Error::gateway(op, e))
    }

    fn get_transaction_result(&self, id: &Identifier, wait_for_seal: bool) -> Result<TransactionResult> {
        let op = "get transaction result";
        loop {
            let v = self.get(op, &format!("/transaction_results/{}", id.hex()), &[])?;
            let result = decode_result(&v).map_err(|e| Error::gateway(op, e))?;
            if !wait_for_seal || result.status.is_final() {
                return Ok(result);
            }
            debug!(id = %id, status = %result.status, "waiting for seal");
            std::thread::sleep(self.poll_interval);
        }
    }

    fn execute_script(&self, script: &[u8], arguments: &[Value]) -> Result<Value> {
        let op = "execute script";
        let body = json!({
            "script": base64_encode(script),
            "arguments": arguments.iter().map(|a| base64_encode(&a.encode())).collect::<Vec<_>>(),
        });
        let v = self.post(op, "/scripts", &[("block_height", "sealed")], &body)?;
        let encoded = v
            .as_str()
            .ok_or_else(|| Error::gateway(op, "script result is not a base64 string"))?;
        let raw = base64_decode(encoded, "script result")?;
        Value::decode(&raw).map_err(|e| Error::gateway(op, e))
    }

    fn get_latest_block(&self) -> Result<Block> {
        let v = self.get("get latest block", "/blocks", &[("height", "sealed"), ("expand", "payload")])?;
        first_block(v)
    }

    fn get_block_by_id(&self, id: &Identifier) -> Result<Block> {
        let v = self.get("get block by id", &format!("/blocks/{}", id.hex()), &[("expand", "payload")])?;
        first_block(v)
    }

    fn get_block_by_height(&self, height: u64) -> Result<Block> {
        let height = height.to_string();
        let v = self.get("get block by height", "/blocks", &[("height", &height), ("expand", "payload")])?;
        first_block(v)
    }

    fn get_events(&self, event_type: &str, start_height: u64, end_height: u64) -> Result<Vec<BlockEvents>> {
        let op = "get events";
        let start = start_height.to_string();
        let end = end_height.to_string();
        let v = self.get(
            op,
            "/events",
            &[("type", event_type), ("start_height", &start), ("end_height", &end)],
        )?;
        let blocks = v.as_array().cloned().unwrap_or_default();
        blocks
            .iter()
            .map(|b| {
                let events = b
                    .get("events")
                    .and_then(Json::as_array)
                    .map(|items| items.iter().map(decode_event).collect::<Result<Vec<_>>>())
                    .transpose()?
                    .unwrap_or_default();
                Ok(BlockEvents {
                    block_id: id_field(b, "block_id")?,
                    height: u64_field(b, "block_height"),
                    timestamp: timestamp_field(b, "block_timestamp"),
                    events,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::gateway(op, e))
    }

    fn get_collection(&self, id: &Identifier) -> Result<Collection> {
        let op = "get collection";
        let v = self.get(op, &format!("/collections/{}", id.hex()), &[("expand", "transactions")])?;
        let transaction_ids = v
            .get("transactions")
            .and_then(Json::as_array)
            .map(|items| items.iter().map(|t| id_field(t, "id")).collect::<Result<Vec<_>>>())
            .transpose()
            .map_err(|e| Error::gateway(op, e))?
            .unwrap_or_default();
        Ok(Collection {
            id: id_field(&v, "id").map_err(|e| Error::gateway(op, e))?,
            transaction_ids,
        })
    }

    fn ping(&self) -> Result<()> {
        self.get("ping", "/network/parameters", &[]).map(|_| ())
    }
}
