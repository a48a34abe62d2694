//! A gateway with canned responses.

use chrono::Utc;
use parking_lot::Mutex;

use flow_transport::Gateway;
use flow_types::value::CompositeKind;
use flow_types::{
    Account, AccountPublicKey, Address, Block, BlockEvents, Collection, Error, Event,
    HashAlgorithm, Identifier, Result, Transaction, TransactionResult, TransactionStatus, Value,
};

use super::setup::service_private_key;

/// Accepts every transaction and answers result queries with `result`.
/// Every account exists and holds the service key.
pub struct CannedGateway {
    result: TransactionResult,
    sent: Mutex<Vec<Transaction>>,
}

impl CannedGateway {
    pub fn new(result: TransactionResult) -> Self {
        Self {
            result,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Seals every transaction with one `flow.AccountCreated` event for `address`.
    pub fn account_created(address: &str) -> Self {
        let address = Address::from_hex(address).unwrap();
        let event = Event {
            event_type: "flow.AccountCreated".to_string(),
            transaction_id: Identifier([9u8; 32]),
            transaction_index: 0,
            event_index: 0,
            value: Value::Composite {
                kind: CompositeKind::Event,
                id: "flow.AccountCreated".to_string(),
                fields: vec![("address".to_string(), Value::Address(address))],
            },
        };
        Self::new(TransactionResult {
            status: TransactionStatus::Sealed,
            events: vec![event],
            ..TransactionResult::default()
        })
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().clone()
    }

    fn block() -> Block {
        Block {
            id: Identifier([1u8; 32]),
            parent_id: Identifier::EMPTY,
            height: 100,
            timestamp: Utc::now(),
            collection_guarantees: Vec::new(),
            seals: 0,
        }
    }
}

impl Gateway for CannedGateway {
    fn get_account(&self, address: Address) -> Result<Account> {
        let mut account = Account::new(address);
        account.keys.push(AccountPublicKey::new(
            service_private_key().public_key(),
            HashAlgorithm::Sha3_256,
            1000,
        ));
        Ok(account)
    }

    fn send_signed_transaction(&self, tx: &Transaction) -> Result<Identifier> {
        self.sent.lock().push(tx.clone());
        Ok(tx.id())
    }

    fn get_transaction(&self, _id: &Identifier) -> Result<Transaction> {
        self.sent
            .lock()
            .last()
            .cloned()
            .ok_or_else(|| Error::gateway("get transaction", "nothing sent"))
    }

    fn get_transaction_result(&self, _id: &Identifier, _wait_for_seal: bool) -> Result<TransactionResult> {
        Ok(self.result.clone())
    }

    fn execute_script(&self, _script: &[u8], _arguments: &[Value]) -> Result<Value> {
        Ok(Value::Array(Vec::new()))
    }

    fn get_latest_block(&self) -> Result<Block> {
        Ok(Self::block())
    }

    fn get_block_by_id(&self, _id: &Identifier) -> Result<Block> {
        Ok(Self::block())
    }

    fn get_block_by_height(&self, _height: u64) -> Result<Block> {
        Ok(Self::block())
    }

    fn get_events(&self, _event_type: &str, _start: u64, _end: u64) -> Result<Vec<BlockEvents>> {
        Ok(Vec::new())
    }

    fn get_collection(&self, id: &Identifier) -> Result<Collection> {
        Ok(Collection {
            id: *id,
            transaction_ids: Vec::new(),
        })
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
