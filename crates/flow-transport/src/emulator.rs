//! In-process emulator gateway.
//!
//! A small ledger that honours the [`Gateway`] contract without a node: it
//! verifies signatures and sequence numbers, applies the built-in account and
//! contract templates, and seals every transaction into its own block.
//! Arbitrary transaction code is accepted and sealed without effects; scripts
//! are not executed.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use parking_lot::Mutex;
use sha3::{Digest, Sha3_256};
use tracing::{debug, info};

use flow_types::models::{
    ACCOUNT_CONTRACT_ADDED_EVENT, ACCOUNT_CONTRACT_REMOVED_EVENT, ACCOUNT_CONTRACT_UPDATED_EVENT,
    ACCOUNT_CREATED_EVENT, ACCOUNT_KEY_WEIGHT_THRESHOLD,
};
use flow_types::templates::{decode_contract_arguments, decode_create_account, TemplateKind};
use flow_types::value::CompositeKind;
use flow_types::{
    Account, AccountPublicKey, Address, AddressGenerator, Block, BlockEvents, Chain, Collection,
    Error, Event, Identifier, Result, Transaction, TransactionResult, TransactionSignature,
    TransactionStatus, Value,
};

use crate::gateway::Gateway;

/// Initial balance of the service account, in 1e-8 units.
const SERVICE_BALANCE: u64 = 1_000_000_000 * 100_000_000;

struct SealedTransaction {
    tx: Transaction,
    result: TransactionResult,
}

struct Ledger {
    generator: AddressGenerator,
    accounts: BTreeMap<Address, Account>,
    blocks: Vec<Block>,
    block_events: Vec<Vec<Event>>,
    collections: HashMap<Identifier, Collection>,
    transactions: HashMap<Identifier, SealedTransaction>,
}

/// Gateway over an in-memory chain.
pub struct EmulatorGateway {
    service_address: Address,
    ledger: Mutex<Ledger>,
}

fn hash_id(parts: &[&[u8]]) -> Identifier {
    let mut hasher = Sha3_256::new();
    for p in parts {
        hasher.update(p);
    }
    Identifier(hasher.finalize().into())
}

fn event(event_type: &str, tx_id: Identifier, index: u32, fields: Vec<(String, Value)>) -> Event {
    Event {
        event_type: event_type.to_string(),
        transaction_id: tx_id,
        transaction_index: 0,
        event_index: index,
        value: Value::Composite {
            kind: CompositeKind::Event,
            id: event_type.to_string(),
            fields,
        },
    }
}

impl EmulatorGateway {
    /// Start a chain whose service account holds `service_key`.
    pub fn new(service_key: AccountPublicKey) -> Self {
        let mut generator = AddressGenerator::new(Chain::Emulator);
        let service_address = generator.next_address();

        let mut service = Account::new(service_address);
        service.balance = SERVICE_BALANCE;
        let mut key = service_key;
        key.index = 0;
        key.sequence_number = 0;
        service.keys.push(key);

        let genesis = Block {
            id: hash_id(&[&b"genesis"[..]]),
            parent_id: Identifier::EMPTY,
            height: 0,
            timestamp: Utc::now(),
            collection_guarantees: Vec::new(),
            seals: 0,
        };

        let mut accounts = BTreeMap::new();
        accounts.insert(service_address, service);

        info!(service = %service_address, "emulator ledger started");
        Self {
            service_address,
            ledger: Mutex::new(Ledger {
                generator,
                accounts,
                blocks: vec![genesis],
                block_events: vec![Vec::new()],
                collections: HashMap::new(),
                transactions: HashMap::new(),
            }),
        }
    }

    pub fn service_address(&self) -> Address {
        self.service_address
    }
}

impl Ledger {
    fn verify(&self, tx: &Transaction) -> std::result::Result<(), String> {
        if !self.blocks.iter().any(|b| b.id == tx.reference_block_id) {
            return Err(format!("reference block {} not found", tx.reference_block_id));
        }

        let proposer = self
            .accounts
            .get(&tx.proposal_key.address)
            .ok_or_else(|| format!("proposer account {} not found", tx.proposal_key.address))?;
        let proposal_key = proposer
            .key(tx.proposal_key.key_index)
            .ok_or_else(|| format!("proposal key {} not found on {}", tx.proposal_key.key_index, proposer.address))?;
        if proposal_key.sequence_number != tx.proposal_key.sequence_number {
            return Err(format!(
                "invalid proposal key sequence number: expected {}, got {}",
                proposal_key.sequence_number, tx.proposal_key.sequence_number
            ));
        }

        let mut weights: HashMap<Address, u32> = HashMap::new();
        self.verify_signatures(&tx.payload_signatures, &tx.payload_message(), &mut weights)?;
        self.verify_signatures(&tx.envelope_signatures, &tx.envelope_message(), &mut weights)?;

        if !tx.envelope_signatures.iter().any(|s| s.address == tx.payer) {
            return Err(format!("missing envelope signature from payer {}", tx.payer));
        }

        let mut required = tx.authorizers.clone();
        required.push(tx.proposal_key.address);
        required.push(tx.payer);
        for addr in required {
            let weight = weights.get(&addr).copied().unwrap_or_default();
            if weight < ACCOUNT_KEY_WEIGHT_THRESHOLD {
                return Err(format!(
                    "account {} does not have sufficient signatures (weight {} of {})",
                    addr, weight, ACCOUNT_KEY_WEIGHT_THRESHOLD
                ));
            }
        }
        Ok(())
    }

    fn verify_signatures(
        &self,
        sigs: &[TransactionSignature],
        message: &[u8],
        weights: &mut HashMap<Address, u32>,
    ) -> std::result::Result<(), String> {
        for sig in sigs {
            let account = self
                .accounts
                .get(&sig.address)
                .ok_or_else(|| format!("signer account {} not found", sig.address))?;
            let key = account
                .key(sig.key_index)
                .filter(|k| !k.revoked)
                .ok_or_else(|| format!("key {} not found on {}", sig.key_index, sig.address))?;
            if !key.public_key.verify(key.hash_algo, message, &sig.signature) {
                return Err(format!("invalid signature from {} key {}", sig.address, sig.key_index));
            }
            *weights.entry(sig.address).or_default() += key.weight;
        }
        Ok(())
    }

    /// Apply the transaction's effects, returning events or an execution error.
    fn execute(&mut self, tx: &Transaction, tx_id: Identifier) -> std::result::Result<Vec<Event>, String> {
        let script = tx.script_str();
        let Some(kind) = TemplateKind::classify(&script) else {
            return Ok(Vec::new());
        };
        let arguments = tx.decoded_arguments().map_err(|e| e.to_string())?;
        let signer = *tx
            .authorizers
            .first()
            .ok_or_else(|| "transaction has no authorizer".to_string())?;

        match kind {
            TemplateKind::CreateAccount => {
                let (keys, contracts) = decode_create_account(&arguments).map_err(|e| e.to_string())?;
                let address = self.generator.next_address();
                let mut account = Account::new(address);
                account.keys = keys;
                let mut events = vec![event(
                    ACCOUNT_CREATED_EVENT,
                    tx_id,
                    0,
                    vec![("address".to_string(), Value::Address(address))],
                )];
                for (name, code) in contracts {
                    events.push(contract_event(ACCOUNT_CONTRACT_ADDED_EVENT, tx_id, events.len() as u32, address, &name));
                    account.contracts.insert(name, code);
                }
                self.accounts.insert(address, account);
                Ok(events)
            }
            TemplateKind::AddContract | TemplateKind::UpdateContract | TemplateKind::RemoveContract => {
                let (name, code) = decode_contract_arguments(&arguments).map_err(|e| e.to_string())?;
                let account = self
                    .accounts
                    .get_mut(&signer)
                    .ok_or_else(|| format!("account {} not found", signer))?;
                let exists = account.contracts.contains_key(&name);
                match kind {
                    TemplateKind::AddContract => {
                        if exists {
                            return Err(format!(
                                "cannot overwrite existing contract with name \"{}\" in account {}",
                                name, signer
                            ));
                        }
                        account.contracts.insert(name.clone(), code.unwrap_or_default());
                        Ok(vec![contract_event(ACCOUNT_CONTRACT_ADDED_EVENT, tx_id, 0, signer, &name)])
                    }
                    TemplateKind::UpdateContract => {
                        if !exists {
                            return Err(format!(
                                "cannot update non-existing contract with name \"{}\" in account {}",
                                name, signer
                            ));
                        }
                        account.contracts.insert(name.clone(), code.unwrap_or_default());
                        Ok(vec![contract_event(ACCOUNT_CONTRACT_UPDATED_EVENT, tx_id, 0, signer, &name)])
                    }
                    _ => {
                        if account.contracts.remove(&name).is_none() {
                            return Err(format!(
                                "cannot remove non-existing contract with name \"{}\" in account {}",
                                name, signer
                            ));
                        }
                        Ok(vec![contract_event(ACCOUNT_CONTRACT_REMOVED_EVENT, tx_id, 0, signer, &name)])
                    }
                }
            }
        }
    }

    fn seal(&mut self, tx: Transaction, tx_id: Identifier, outcome: std::result::Result<Vec<Event>, String>) {
        let parent = self.blocks.last().map(|b| b.id).unwrap_or_default();
        let height = self.blocks.len() as u64;
        let collection = Collection {
            id: hash_id(&[&b"collection"[..], &tx_id.0[..]]),
            transaction_ids: vec![tx_id],
        };
        let block = Block {
            id: hash_id(&[&parent.0[..], &height.to_be_bytes()[..], &tx_id.0[..]]),
            parent_id: parent,
            height,
            timestamp: Utc::now(),
            collection_guarantees: vec![collection.id],
            seals: 1,
        };

        let (events, error) = match outcome {
            Ok(events) => (events, None),
            Err(message) => (Vec::new(), Some(message)),
        };
        let result = TransactionResult {
            status: TransactionStatus::Sealed,
            status_code: u32::from(error.is_some()),
            error,
            events: events.clone(),
            block_id: Some(block.id),
        };
        debug!(id = %tx_id, height, failed = result.error.is_some(), "transaction sealed");

        self.collections.insert(collection.id, collection);
        self.blocks.push(block);
        self.block_events.push(events);
        self.transactions.insert(tx_id, SealedTransaction { tx, result });
    }

    fn block_at(&self, height: u64) -> Option<&Block> {
        self.blocks.get(height as usize)
    }
}

fn contract_event(event_type: &str, tx_id: Identifier, index: u32, address: Address, name: &str) -> Event {
    event(
        event_type,
        tx_id,
        index,
        vec![
            ("address".to_string(), Value::Address(address)),
            ("contract".to_string(), Value::String(name.to_string())),
        ],
    )
}

impl Gateway for EmulatorGateway {
    fn get_account(&self, address: Address) -> Result<Account> {
        self.ledger
            .lock()
            .accounts
            .get(&address)
            .cloned()
            .ok_or_else(|| Error::gateway("get account", format!("account {} not found", address)))
    }

    fn send_signed_transaction(&self, tx: &Transaction) -> Result<Identifier> {
        let mut ledger = self.ledger.lock();
        ledger
            .verify(tx)
            .map_err(|e| Error::gateway("submit transaction", e))?;

        let tx_id = tx.id();
        if let Some(key) = ledger
            .accounts
            .get_mut(&tx.proposal_key.address)
            .and_then(|a| a.keys.iter_mut().find(|k| k.index == tx.proposal_key.key_index))
        {
            key.sequence_number += 1;
        }

        let outcome = ledger.execute(tx, tx_id);
        ledger.seal(tx.clone(), tx_id, outcome);
        Ok(tx_id)
    }

    fn get_transaction(&self, id: &Identifier) -> Result<Transaction> {
        self.ledger
            .lock()
            .transactions
            .get(id)
            .map(|s| s.tx.clone())
            .ok_or_else(|| Error::gateway("get transaction", format!("transaction {} not found", id)))
    }

    fn get_transaction_result(&self, id: &Identifier, _wait_for_seal: bool) -> Result<TransactionResult> {
        // Every accepted transaction is sealed on submission.
        self.ledger
            .lock()
            .transactions
            .get(id)
            .map(|s| s.result.clone())
            .ok_or_else(|| Error::gateway("get transaction result", format!("transaction {} not found", id)))
    }

    fn execute_script(&self, _script: &[u8], _arguments: &[Value]) -> Result<Value> {
        Err(Error::gateway(
            "execute script",
            "scripts are not supported by the in-process emulator",
        ))
    }

    fn get_latest_block(&self) -> Result<Block> {
        self.ledger
            .lock()
            .blocks
            .last()
            .cloned()
            .ok_or_else(|| Error::gateway("get latest block", "chain has no blocks"))
    }

    fn get_block_by_id(&self, id: &Identifier) -> Result<Block> {
        self.ledger
            .lock()
            .blocks
            .iter()
            .find(|b| b.id == *id)
            .cloned()
            .ok_or_else(|| Error::gateway("get block by id", format!("block {} not found", id)))
    }

    fn get_block_by_height(&self, height: u64) -> Result<Block> {
        self.ledger
            .lock()
            .block_at(height)
            .cloned()
            .ok_or_else(|| Error::gateway("get block by height", format!("block at height {} not found", height)))
    }

    fn get_events(&self, event_type: &str, start_height: u64, end_height: u64) -> Result<Vec<BlockEvents>> {
        if end_height < start_height {
            return Err(Error::gateway(
                "get events",
                format!("end height {} is before start height {}", end_height, start_height),
            ));
        }
        let ledger = self.ledger.lock();
        let mut out = Vec::new();
        for height in start_height..=end_height {
            let Some(block) = ledger.block_at(height) else {
                break;
            };
            let events: Vec<Event> = ledger.block_events[height as usize]
                .iter()
                .filter(|e| e.event_type == event_type)
                .cloned()
                .collect();
            out.push(BlockEvents {
                block_id: block.id,
                height,
                timestamp: block.timestamp,
                events,
            });
        }
        Ok(out)
    }

    fn get_collection(&self, id: &Identifier) -> Result<Collection> {
        self.ledger
            .lock()
            .collections
            .get(id)
            .cloned()
            .ok_or_else(|| Error::gateway("get collection", format!("collection {} not found", id)))
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_types::templates;
    use flow_types::{HashAlgorithm, InMemorySigner, PrivateKey, ProposalKey, SignatureAlgorithm};

    fn setup() -> (EmulatorGateway, InMemorySigner) {
        let key = PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[42u8; 32]).unwrap();
        let public = AccountPublicKey::new(key.public_key(), HashAlgorithm::Sha3_256, 1000);
        (EmulatorGateway::new(public), InMemorySigner::new(key, HashAlgorithm::Sha3_256))
    }

    fn signed(gateway: &EmulatorGateway, signer: &InMemorySigner, script: String, args: Vec<Value>) -> Transaction {
        let service = gateway.service_address();
        let account = gateway.get_account(service).unwrap();
        let mut tx = Transaction::new();
        tx.script = script.into_bytes();
        for a in &args {
            tx.add_argument(a);
        }
        tx.reference_block_id = gateway.get_latest_block().unwrap().id;
        tx.proposal_key = ProposalKey {
            address: service,
            key_index: 0,
            sequence_number: account.keys[0].sequence_number,
        };
        tx.payer = service;
        tx.authorizers = vec![service];
        tx.sign_envelope(service, 0, signer).unwrap();
        tx
    }

    #[test]
    fn test_genesis() {
        let (gateway, _) = setup();
        assert_eq!(gateway.service_address().hex(), "f8d6e0586b0a20c7");
        assert_eq!(gateway.get_latest_block().unwrap().height, 0);
        assert!(gateway.ping().is_ok());
    }

    #[test]
    fn test_add_contract_and_sequence() {
        let (gateway, signer) = setup();
        let template = templates::add_account_contract("Foo", b"access(all) contract Foo {}", &[]);
        let tx = signed(&gateway, &signer, template.script.clone(), template.arguments.clone());
        let id = gateway.send_signed_transaction(&tx).unwrap();

        let result = gateway.get_transaction_result(&id, true).unwrap();
        assert_eq!(result.status, TransactionStatus::Sealed);
        assert!(result.error.is_none());
        assert_eq!(result.events[0].event_type, ACCOUNT_CONTRACT_ADDED_EVENT);

        let account = gateway.get_account(gateway.service_address()).unwrap();
        assert!(account.contracts.contains_key("Foo"));
        assert_eq!(account.keys[0].sequence_number, 1);

        // replaying the same sequence number is rejected
        let err = gateway.send_signed_transaction(&tx).unwrap_err();
        assert!(err.to_string().contains("sequence number"));

        // adding again seals with an execution error
        let again = signed(&gateway, &signer, template.script, template.arguments);
        let id = gateway.send_signed_transaction(&again).unwrap();
        let result = gateway.get_transaction_result(&id, true).unwrap();
        assert!(result.error.unwrap().contains("cannot overwrite existing contract"));
    }

    #[test]
    fn test_bad_signature_rejected() {
        let (gateway, _) = setup();
        let other = InMemorySigner::new(
            PrivateKey::generate(SignatureAlgorithm::EcdsaP256).unwrap(),
            HashAlgorithm::Sha3_256,
        );
        let tx = signed(&gateway, &other, "transaction {}".to_string(), vec![]);
        let err = gateway.send_signed_transaction(&tx).unwrap_err();
        assert!(err.to_string().contains("invalid signature"));
    }

    #[test]
    fn test_blocks_collections_and_events() {
        let (gateway, signer) = setup();
        let key = AccountPublicKey::new(
            PrivateKey::generate(SignatureAlgorithm::EcdsaP256).unwrap().public_key(),
            HashAlgorithm::Sha3_256,
            1000,
        );
        let template = templates::create_account(&[key], &[]);
        let tx = signed(&gateway, &signer, template.script, template.arguments);
        let id = gateway.send_signed_transaction(&tx).unwrap();

        let block = gateway.get_latest_block().unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(gateway.get_block_by_id(&block.id).unwrap(), block);
        let collection = gateway.get_collection(&block.collection_guarantees[0]).unwrap();
        assert_eq!(collection.transaction_ids, vec![id]);
        assert_eq!(gateway.get_transaction(&id).unwrap().id(), id);

        let events = gateway.get_events(ACCOUNT_CREATED_EVENT, 0, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].events.is_empty());
        let created = events[1].events[0].field("address").and_then(Value::as_address).unwrap();
        assert_eq!(created.hex(), "ee82856bf20e2aa6");
        assert!(gateway.get_account(created).is_ok());
        assert!(gateway.execute_script(b"access(all) fun main() {}", &[]).is_err());
    }
}
