//! Output formatting for the flow CLI
//!
//! Every command result implements [`Render`] and is printed as an aligned
//! text block, a single line, or JSON.

use anyhow::Result;
use clap::ValueEnum;
use serde_json::{json, Value as Json};

use flow_types::models::format_ufix64;
use flow_types::{Account, AccountPublicKey, Block, BlockEvents, Collection, Event, Transaction, TransactionResult};
use flowkit::services::BlockWithDetails;
use flowkit::DeploymentReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Inline,
    Json,
}

pub trait Render {
    /// Multi-line, human-readable form.
    fn text(&self) -> String;

    fn json(&self) -> Json;

    /// One line, for piping into other tools.
    fn inline(&self) -> String {
        self.text()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render(&self, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Text => self.text(),
            OutputFormat::Inline => self.inline(),
            OutputFormat::Json => serde_json::to_string_pretty(&self.json())?,
        })
    }
}

/// Builds the aligned `Label\tvalue` rows used by the text renderers.
#[derive(Default)]
pub struct Rows {
    out: String,
}

impl Rows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&mut self, label: &str, value: impl std::fmt::Display) -> &mut Self {
        self.out.push_str(&format!("{:<16}{}\n", label, value));
        self
    }

    pub fn line(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.out.push_str(line.as_ref());
        self.out.push('\n');
        self
    }

    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.out).trim_end().to_string()
    }
}

// =============================================================================
// Chain data
// =============================================================================

pub struct AccountOutput {
    pub account: Account,
    /// Print full contract sources instead of names only.
    pub include_code: bool,
}

impl Render for AccountOutput {
    fn text(&self) -> String {
        let account = &self.account;
        let mut rows = Rows::new();
        rows.row("Address", format!("0x{}", account.address))
            .row("Balance", account.balance_string())
            .row("Keys", account.keys.len());
        for key in &account.keys {
            rows.line("")
                .row(&format!("Key {}", key.index), format!("Public Key   {}", key.public_key))
                .row("", format!("Weight       {}", key.weight))
                .row("", format!("Signature    {}", key.sig_algo))
                .row("", format!("Hash         {}", key.hash_algo))
                .row("", format!("Revoked      {}", key.revoked))
                .row("", format!("Sequence     {}", key.sequence_number));
        }
        rows.line("").row("Contracts", account.contracts.len());
        for (name, code) in &account.contracts {
            rows.row("Contract", format!("'{}'", name));
            if self.include_code {
                rows.line(String::from_utf8_lossy(code));
            }
        }
        rows.finish()
    }

    fn inline(&self) -> String {
        format!("0x{} {}", self.account.address, self.account.balance_string())
    }

    fn json(&self) -> Json {
        let account = &self.account;
        let contracts: serde_json::Map<String, Json> = account
            .contracts
            .iter()
            .map(|(name, code)| {
                let value = if self.include_code {
                    Json::String(String::from_utf8_lossy(code).into_owned())
                } else {
                    Json::Null
                };
                (name.clone(), value)
            })
            .collect();
        json!({
            "address": account.address.hex_with_prefix(),
            "balance": format_ufix64(account.balance),
            "keys": account.keys.iter().map(key_json).collect::<Vec<_>>(),
            "contracts": contracts,
        })
    }
}

fn key_json(key: &AccountPublicKey) -> Json {
    json!({
        "index": key.index,
        "publicKey": key.public_key.to_hex(),
        "sigAlgo": key.sig_algo.name(),
        "hashAlgo": key.hash_algo.name(),
        "weight": key.weight,
        "sequenceNumber": key.sequence_number,
        "revoked": key.revoked,
    })
}

pub struct PublicKeyOutput(pub AccountPublicKey);

impl Render for PublicKeyOutput {
    fn text(&self) -> String {
        let key = &self.0;
        Rows::new()
            .row("Public Key", &key.public_key)
            .row("Signature", key.sig_algo)
            .row("Hash", key.hash_algo)
            .row("Weight", key.weight)
            .row("Revoked", key.revoked)
            .finish()
    }

    fn inline(&self) -> String {
        self.0.public_key.to_hex()
    }

    fn json(&self) -> Json {
        key_json(&self.0)
    }
}

pub struct BlockOutput(pub BlockWithDetails);

fn block_rows(rows: &mut Rows, block: &Block) {
    rows.row("Block ID", block.id)
        .row("Parent ID", block.parent_id)
        .row("Height", block.height)
        .row("Timestamp", block.timestamp.to_rfc3339())
        .row("Collections", block.collection_guarantees.len())
        .row("Seals", block.seals);
}

impl Render for BlockOutput {
    fn text(&self) -> String {
        let details = &self.0;
        let mut rows = Rows::new();
        block_rows(&mut rows, &details.block);
        for id in &details.block.collection_guarantees {
            rows.row("  Collection", id);
        }
        for collection in &details.collections {
            rows.line("").row("Collection", collection.id);
            for tx in &collection.transaction_ids {
                rows.row("  Transaction", tx);
            }
        }
        if !details.events.is_empty() {
            rows.line("").line(events_text(&details.events));
        }
        rows.finish()
    }

    fn inline(&self) -> String {
        format!("{} {}", self.0.block.height, self.0.block.id)
    }

    fn json(&self) -> Json {
        let details = &self.0;
        json!({
            "block": block_json(&details.block),
            "events": details.events.iter().map(block_events_json).collect::<Vec<_>>(),
            "collections": details.collections.iter().map(collection_json).collect::<Vec<_>>(),
        })
    }
}

fn block_json(block: &Block) -> Json {
    json!({
        "id": block.id.hex(),
        "parentId": block.parent_id.hex(),
        "height": block.height,
        "timestamp": block.timestamp.to_rfc3339(),
        "collectionGuarantees": block.collection_guarantees.iter().map(|id| id.hex()).collect::<Vec<_>>(),
        "seals": block.seals,
    })
}

pub struct CollectionOutput(pub Collection);

impl Render for CollectionOutput {
    fn text(&self) -> String {
        let mut rows = Rows::new();
        rows.row("Collection ID", self.0.id);
        for tx in &self.0.transaction_ids {
            rows.row("  Transaction", tx);
        }
        rows.finish()
    }

    fn inline(&self) -> String {
        self.0
            .transaction_ids
            .iter()
            .map(|id| id.hex())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn json(&self) -> Json {
        collection_json(&self.0)
    }
}

fn collection_json(collection: &Collection) -> Json {
    json!({
        "id": collection.id.hex(),
        "transactionIds": collection.transaction_ids.iter().map(|id| id.hex()).collect::<Vec<_>>(),
    })
}

pub struct EventsOutput(pub Vec<BlockEvents>);

fn events_text(blocks: &[BlockEvents]) -> String {
    let mut rows = Rows::new();
    for block in blocks.iter().filter(|b| !b.events.is_empty()) {
        rows.line(format!("Events Block #{}:", block.height));
        for event in &block.events {
            event_rows(&mut rows, event);
        }
    }
    let text = rows.finish();
    if text.is_empty() {
        "No events found".to_string()
    } else {
        text
    }
}

fn event_rows(rows: &mut Rows, event: &Event) {
    rows.row("  Type", &event.event_type)
        .row("  Tx ID", event.transaction_id)
        .row("  Index", event.event_index)
        .row("  Values", &event.value);
}

impl Render for EventsOutput {
    fn text(&self) -> String {
        events_text(&self.0)
    }

    fn json(&self) -> Json {
        Json::Array(self.0.iter().map(block_events_json).collect())
    }
}

fn block_events_json(block: &BlockEvents) -> Json {
    json!({
        "blockId": block.block_id.hex(),
        "height": block.height,
        "timestamp": block.timestamp.to_rfc3339(),
        "events": block.events.iter().map(event_json).collect::<Vec<_>>(),
    })
}

fn event_json(event: &Event) -> Json {
    json!({
        "type": event.event_type,
        "transactionId": event.transaction_id.hex(),
        "transactionIndex": event.transaction_index,
        "eventIndex": event.event_index,
        "value": event.value.to_json(),
    })
}

pub struct ScriptOutput(pub flow_types::Value);

impl Render for ScriptOutput {
    fn text(&self) -> String {
        format!("Result: {}", self.0)
    }

    fn inline(&self) -> String {
        self.0.to_string()
    }

    fn json(&self) -> Json {
        self.0.to_json()
    }
}

pub struct TransactionOutput {
    pub transaction: Transaction,
    pub result: Option<TransactionResult>,
    pub include_code: bool,
}

impl Render for TransactionOutput {
    fn text(&self) -> String {
        let tx = &self.transaction;
        let mut rows = Rows::new();
        rows.row("ID", tx.id());
        if let Some(result) = &self.result {
            rows.row("Status", result.status);
            if let Some(error) = &result.error {
                rows.row("Error", error);
            }
        }
        rows.row("Payer", tx.payer)
            .row(
                "Authorizers",
                tx.authorizers.iter().map(|a| a.hex()).collect::<Vec<_>>().join(", "),
            )
            .line("")
            .row("Proposal Key", format!("Address  {}", tx.proposal_key.address))
            .row("", format!("Index    {}", tx.proposal_key.key_index))
            .row("", format!("Sequence {}", tx.proposal_key.sequence_number))
            .line("");

        if tx.payload_signatures.is_empty() {
            rows.line("No Payload Signatures");
        }
        for (i, sig) in tx.payload_signatures.iter().enumerate() {
            rows.row(&format!("Payload Sig {}", i), format!("{} key {}", sig.address, sig.key_index));
        }
        if tx.envelope_signatures.is_empty() {
            rows.line("No Envelope Signatures");
        }
        for (i, sig) in tx.envelope_signatures.iter().enumerate() {
            rows.row(&format!("Envelope Sig {}", i), format!("{} key {}", sig.address, sig.key_index));
        }

        if let Some(result) = &self.result {
            if !result.events.is_empty() {
                rows.line("").line("Events:");
                for event in &result.events {
                    event_rows(&mut rows, event);
                }
            }
        }
        if self.include_code {
            rows.line("").line("Code").line(tx.script_str());
        }
        rows.line("").row("Payload", hex::encode(tx.encode()));
        rows.finish()
    }

    fn inline(&self) -> String {
        match &self.result {
            Some(result) => format!("{} {}", self.transaction.id(), result.status),
            None => self.transaction.id().hex(),
        }
    }

    fn json(&self) -> Json {
        let tx = &self.transaction;
        let signature_json = |sig: &flow_types::TransactionSignature| {
            json!({
                "address": sig.address.hex_with_prefix(),
                "keyIndex": sig.key_index,
                "signature": hex::encode(&sig.signature),
            })
        };
        let mut out = json!({
            "id": tx.id().hex(),
            "payer": tx.payer.hex_with_prefix(),
            "authorizers": tx.authorizers.iter().map(|a| a.hex_with_prefix()).collect::<Vec<_>>(),
            "proposalKey": {
                "address": tx.proposal_key.address.hex_with_prefix(),
                "keyIndex": tx.proposal_key.key_index,
                "sequenceNumber": tx.proposal_key.sequence_number,
            },
            "gasLimit": tx.gas_limit,
            "payloadSignatures": tx.payload_signatures.iter().map(signature_json).collect::<Vec<_>>(),
            "envelopeSignatures": tx.envelope_signatures.iter().map(signature_json).collect::<Vec<_>>(),
            "payload": hex::encode(tx.encode()),
        });
        if let Some(result) = &self.result {
            out["status"] = json!(result.status.name());
            out["error"] = json!(result.error);
            out["events"] = Json::Array(result.events.iter().map(event_json).collect());
        }
        if self.include_code {
            out["code"] = json!(tx.script_str());
        }
        out
    }
}

/// An encoded transaction passed between signers.
pub struct PayloadOutput(pub Transaction);

impl Render for PayloadOutput {
    fn text(&self) -> String {
        hex::encode(self.0.encode())
    }

    fn json(&self) -> Json {
        json!({ "id": self.0.id().hex(), "payload": hex::encode(self.0.encode()) })
    }
}

// =============================================================================
// Project
// =============================================================================

pub struct DeploymentOutput(pub DeploymentReport);

impl Render for DeploymentOutput {
    fn text(&self) -> String {
        let report = &self.0;
        let mut rows = Rows::new();
        rows.line(format!(
            "Deploying {} contracts for network {}:",
            report.contracts.len(),
            report.network
        ));
        for contract in &report.contracts {
            rows.line(format!("  {} -> 0x{} ({})", contract.name, contract.target, contract.outcome));
        }
        if report.is_success() {
            rows.line("").line("All contracts deployed successfully");
        }
        rows.finish()
    }

    fn inline(&self) -> String {
        self.0
            .contracts
            .iter()
            .map(|c| format!("{}:{}", c.name, c.target))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn json(&self) -> Json {
        let report = &self.0;
        json!({
            "network": report.network,
            "contracts": report.contracts.iter().map(|c| json!({
                "name": c.name,
                "address": c.target.hex_with_prefix(),
                "outcome": c.outcome.to_string(),
                "transactionId": c.transaction_id.map(|id| id.hex()),
            })).collect::<Vec<_>>(),
        })
    }
}

/// Free-form result with an explicit JSON form.
pub struct Message {
    pub text: String,
    pub json: Json,
}

impl Message {
    pub fn new(text: impl Into<String>, json: Json) -> Self {
        Self { text: text.into(), json }
    }
}

impl Render for Message {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn json(&self) -> Json {
        self.json.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_alignment() {
        let text = Rows::new().row("Address", "0x01").row("Balance", "1.0").finish();
        assert_eq!(text, "Address         0x01\nBalance         1.0");
    }

    #[test]
    fn test_inline_joins_lines() {
        let message = Message::new("first\n\n  second\n", json!({}));
        assert_eq!(message.inline(), "first second");
        assert_eq!(message.render(OutputFormat::Json).unwrap(), "{}");
    }
}
