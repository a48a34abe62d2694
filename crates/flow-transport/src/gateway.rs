//! The boundary to a node.

use flow_types::{
    Account, Address, Block, BlockEvents, Collection, Identifier, Result, Transaction,
    TransactionResult, Value,
};

/// Operations against an access node. Every call is blocking.
///
/// Implementations wrap upstream failures as
/// [`Error::Gateway`](flow_types::Error::Gateway) with a "failed to <operation>"
/// prefix. A sealed transaction that failed during execution is returned as a
/// [`TransactionResult`] with `error` set.
pub trait Gateway: Send + Sync {
    fn get_account(&self, address: Address) -> Result<Account>;

    /// Submit a fully signed transaction and return its id.
    fn send_signed_transaction(&self, tx: &Transaction) -> Result<Identifier>;

    fn get_transaction(&self, id: &Identifier) -> Result<Transaction>;

    /// Fetch the result; with `wait_for_seal` poll until the transaction is sealed.
    fn get_transaction_result(&self, id: &Identifier, wait_for_seal: bool) -> Result<TransactionResult>;

    fn execute_script(&self, script: &[u8], arguments: &[Value]) -> Result<Value>;

    fn get_latest_block(&self) -> Result<Block>;

    fn get_block_by_id(&self, id: &Identifier) -> Result<Block>;

    fn get_block_by_height(&self, height: u64) -> Result<Block>;

    /// Events of `event_type` in the inclusive height range.
    fn get_events(&self, event_type: &str, start_height: u64, end_height: u64) -> Result<Vec<BlockEvents>>;

    fn get_collection(&self, id: &Identifier) -> Result<Collection>;

    fn ping(&self) -> Result<()>;
}
