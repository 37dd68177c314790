use evmc_vm::{
    AccessStatus, Address, Bytes32, ExecutionMessage, ExecutionResult, Host, Revision,
    StorageStatus, TxContext, Uint256,
};
use tracing::trace;

use crate::registry::VmRegistry;

/// A [`Host`] that executes nested calls through a [`VmRegistry`].
///
/// Every other callback is answered by the wrapped world state `S`. Code supplied with the
/// message runs as is. Otherwise it is read from the state at the message's code address, and
/// creations run their input as code. One dispatcher
/// serves a single transaction under a single revision.
#[derive(Debug)]
pub struct Dispatcher<'r, S> {
    registry: &'r VmRegistry,
    state: S,
    revision: Revision,
}

impl<'r, S: Host> Dispatcher<'r, S> {
    /// Creates a dispatcher over `state` for one transaction under `revision`.
    pub fn new(registry: &'r VmRegistry, state: S, revision: Revision) -> Self {
        Self { registry, state, revision }
    }

    /// The revision every call of the transaction runs under.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// The wrapped world state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access to the wrapped world state.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Gives back the world state, with every change made during execution.
    pub fn into_state(self) -> S {
        self.state
    }

    /// Executes `message` on the registry, nested calls included.
    pub fn execute(&mut self, message: &ExecutionMessage<'_>) -> ExecutionResult {
        let code = self.code_for(message);
        let (registry, revision) = (self.registry, self.revision);
        registry.execute(self, revision, message, &code)
    }

    fn code_for(&mut self, message: &ExecutionMessage<'_>) -> Vec<u8> {
        if !message.code().is_empty() {
            return message.code().to_vec();
        }
        if message.kind().is_create() {
            return message.input().to_vec();
        }

        let address = message.code_address();
        let mut code = vec![0; self.state.get_code_size(&address)];
        let copied = self.state.copy_code(&address, 0, &mut code);
        code.truncate(copied);
        code
    }
}

impl<S: Host> Host for Dispatcher<'_, S> {
    fn account_exists(&mut self, address: &Address) -> bool {
        self.state.account_exists(address)
    }

    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.state.get_storage(address, key)
    }

    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        self.state.set_storage(address, key, value)
    }

    fn get_balance(&mut self, address: &Address) -> Uint256 {
        self.state.get_balance(address)
    }

    fn get_code_size(&mut self, address: &Address) -> usize {
        self.state.get_code_size(address)
    }

    fn get_code_hash(&mut self, address: &Address) -> Bytes32 {
        self.state.get_code_hash(address)
    }

    fn copy_code(&mut self, address: &Address, code_offset: usize, buffer: &mut [u8]) -> usize {
        self.state.copy_code(address, code_offset, buffer)
    }

    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool {
        self.state.selfdestruct(address, beneficiary)
    }

    fn call(&mut self, message: &ExecutionMessage<'_>) -> ExecutionResult {
        trace!("nested {:?} to {} at depth {}", message.kind(), message.recipient(), message.depth());
        self.execute(message)
    }

    fn get_tx_context(&mut self) -> TxContext {
        self.state.get_tx_context()
    }

    fn get_block_hash(&mut self, number: i64) -> Bytes32 {
        self.state.get_block_hash(number)
    }

    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]) {
        self.state.emit_log(address, data, topics)
    }

    fn access_account(&mut self, address: &Address) -> AccessStatus {
        self.state.access_account(address)
    }

    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus {
        self.state.access_storage(address, key)
    }

    fn get_transient_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.state.get_transient_storage(address, key)
    }

    fn set_transient_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) {
        self.state.set_transient_storage(address, key, value)
    }
}
