use hashbrown::{HashMap, HashSet};

use crate::{
    host::Host,
    message::ExecutionMessage,
    result::ExecutionResult,
    types::{
        AccessStatus, Address, Bytes32, CallKind, StorageStatus, TxContext, Uint256,
    },
};

/// One storage slot, tracking its value at the start of the transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageValue {
    /// The value now.
    pub current: Bytes32,
    /// The value at the start of the transaction.
    pub original: Bytes32,
    /// Set once the slot has been accessed.
    pub warm: bool,
}

impl StorageValue {
    /// A clean slot holding `value`.
    pub fn new(value: Bytes32) -> Self {
        StorageValue { current: value, original: value, warm: false }
    }
}

/// An account of [`MockedHost`].
#[derive(Debug, Clone, Default)]
pub struct MockedAccount {
    /// The account nonce.
    pub nonce: u64,
    /// The balance.
    pub balance: Uint256,
    /// The deployed code.
    pub code: Vec<u8>,
    /// Returned as is by `get_code_hash`.
    pub code_hash: Bytes32,
    /// Persistent storage.
    pub storage: HashMap<Bytes32, StorageValue>,
    /// Transient storage.
    pub transient_storage: HashMap<Bytes32, Bytes32>,
}

/// An owned copy of a message received by [`MockedHost::call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The kind of call.
    pub kind: CallKind,
    /// The depth of the call.
    pub depth: i32,
    /// The gas sent along.
    pub gas: i64,
    /// Whether the static flag was set.
    pub is_static: bool,
    /// The recipient.
    pub recipient: Address,
    /// The sender.
    pub sender: Address,
    /// The call data.
    pub input: Vec<u8>,
}

/// A log received by [`MockedHost::emit_log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLog {
    /// The account that emitted the log.
    pub creator: Address,
    /// The log data.
    pub data: Vec<u8>,
    /// The log topics.
    pub topics: Vec<Bytes32>,
}

/// A destruction registered by [`MockedHost::selfdestruct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSelfdestruct {
    /// The destroyed account.
    pub address: Address,
    /// The account receiving the balance.
    pub beneficiary: Address,
}

/// A host backed by in-memory maps that records every callback it receives.
///
/// Nested calls are not executed: [`MockedHost::call`] records the message and answers with a
/// clone of [`MockedHost::call_result`].
#[derive(Debug, Clone)]
pub struct MockedHost {
    /// The world state.
    pub accounts: HashMap<Address, MockedAccount>,
    /// Answered by `get_tx_context`, with the blob hash array pointing into `blob_hashes`.
    pub tx_context: TxContext,
    /// The blob hashes of the transaction.
    pub blob_hashes: Vec<Bytes32>,
    /// Returned for every block number.
    pub block_hash: Bytes32,
    /// Returned for every nested call.
    pub call_result: ExecutionResult,

    /// Every nested call, in order.
    pub recorded_calls: Vec<RecordedCall>,
    /// Every emitted log, in order.
    pub recorded_logs: Vec<RecordedLog>,
    /// Every selfdestruct, in order.
    pub recorded_selfdestructs: Vec<RecordedSelfdestruct>,
    /// Every account touched by a callback.
    pub recorded_account_accesses: Vec<Address>,
    /// Every block number asked for.
    pub recorded_block_hashes: Vec<i64>,
    /// How many times the transaction context was requested.
    pub tx_context_queries: usize,

    warm_accounts: HashSet<Address>,
}

impl Default for MockedHost {
    fn default() -> Self {
        MockedHost {
            accounts: HashMap::new(),
            tx_context: TxContext::default(),
            blob_hashes: Vec::new(),
            block_hash: Bytes32::ZERO,
            call_result: ExecutionResult::success(0, Vec::new()),
            recorded_calls: Vec::new(),
            recorded_logs: Vec::new(),
            recorded_selfdestructs: Vec::new(),
            recorded_account_accesses: Vec::new(),
            recorded_block_hashes: Vec::new(),
            tx_context_queries: 0,
            warm_accounts: HashSet::new(),
        }
    }
}

impl MockedHost {
    /// Creates a host with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an account.
    pub fn with_account(mut self, address: Address, account: MockedAccount) -> Self {
        self.accounts.insert(address, account);
        self
    }
}

impl Host for MockedHost {
    fn account_exists(&mut self, address: &Address) -> bool {
        self.recorded_account_accesses.push(*address);
        self.accounts.contains_key(address)
    }

    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.recorded_account_accesses.push(*address);
        self.accounts
            .get(address)
            .and_then(|account| account.storage.get(key))
            .map(|slot| slot.current)
            .unwrap_or_default()
    }

    /// Classifies the write following EIP-2200/EIP-3529 net gas metering.
    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        self.recorded_account_accesses.push(*address);
        let slot = self.accounts.entry(*address).or_default().storage.entry(*key).or_default();

        let dirty = slot.original != slot.current;
        let restored = slot.original == *value;
        let current_is_zero = slot.current.is_zero();
        let value_is_zero = value.is_zero();

        let status = if slot.current == *value {
            StorageStatus::Assigned
        } else if !dirty && !restored {
            if current_is_zero {
                StorageStatus::Added
            } else if value_is_zero {
                StorageStatus::Deleted
            } else {
                StorageStatus::Modified
            }
        } else if dirty && !restored {
            if current_is_zero && !value_is_zero {
                StorageStatus::DeletedAdded
            } else if !current_is_zero && value_is_zero {
                StorageStatus::ModifiedDeleted
            } else {
                StorageStatus::Assigned
            }
        } else if dirty {
            if current_is_zero {
                StorageStatus::DeletedRestored
            } else if value_is_zero {
                StorageStatus::AddedDeleted
            } else {
                StorageStatus::ModifiedRestored
            }
        } else {
            StorageStatus::Assigned
        };

        slot.current = *value;
        status
    }

    fn get_balance(&mut self, address: &Address) -> Uint256 {
        self.recorded_account_accesses.push(*address);
        self.accounts.get(address).map(|account| account.balance).unwrap_or_default()
    }

    fn get_code_size(&mut self, address: &Address) -> usize {
        self.recorded_account_accesses.push(*address);
        self.accounts.get(address).map(|account| account.code.len()).unwrap_or(0)
    }

    fn get_code_hash(&mut self, address: &Address) -> Bytes32 {
        self.recorded_account_accesses.push(*address);
        self.accounts.get(address).map(|account| account.code_hash).unwrap_or_default()
    }

    fn copy_code(&mut self, address: &Address, code_offset: usize, buffer: &mut [u8]) -> usize {
        self.recorded_account_accesses.push(*address);
        let Some(account) = self.accounts.get(address) else {
            return 0;
        };
        let Some(code) = account.code.get(code_offset..) else {
            return 0;
        };

        let n = code.len().min(buffer.len());
        buffer[..n].copy_from_slice(&code[..n]);
        n
    }

    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool {
        self.recorded_account_accesses.push(*address);
        let first = !self.recorded_selfdestructs.iter().any(|s| s.address == *address);
        self.recorded_selfdestructs
            .push(RecordedSelfdestruct { address: *address, beneficiary: *beneficiary });
        first
    }

    fn call(&mut self, message: &ExecutionMessage<'_>) -> ExecutionResult {
        self.recorded_account_accesses.push(*message.recipient());
        self.recorded_calls.push(RecordedCall {
            kind: message.kind(),
            depth: message.depth(),
            gas: message.gas(),
            is_static: message.is_static(),
            recipient: *message.recipient(),
            sender: *message.sender(),
            input: message.input().to_vec(),
        });
        self.call_result.clone()
    }

    fn get_tx_context(&mut self) -> TxContext {
        self.tx_context_queries += 1;
        let mut tx_context = self.tx_context;
        if !self.blob_hashes.is_empty() {
            tx_context.blob_hashes = self.blob_hashes.as_ptr();
            tx_context.blob_hashes_count = self.blob_hashes.len();
        }
        tx_context
    }

    fn get_block_hash(&mut self, number: i64) -> Bytes32 {
        self.recorded_block_hashes.push(number);
        self.block_hash
    }

    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]) {
        self.recorded_logs.push(RecordedLog {
            creator: *address,
            data: data.to_vec(),
            topics: topics.to_vec(),
        });
    }

    fn access_account(&mut self, address: &Address) -> AccessStatus {
        self.recorded_account_accesses.push(*address);
        if self.warm_accounts.insert(*address) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus {
        let slot = self.accounts.entry(*address).or_default().storage.entry(*key).or_default();
        if std::mem::replace(&mut slot.warm, true) {
            AccessStatus::Warm
        } else {
            AccessStatus::Cold
        }
    }

    fn get_transient_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.recorded_account_accesses.push(*address);
        self.accounts
            .get(address)
            .and_then(|account| account.transient_storage.get(key).copied())
            .unwrap_or_default()
    }

    fn set_transient_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) {
        self.recorded_account_accesses.push(*address);
        self.accounts.entry(*address).or_default().transient_storage.insert(*key, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: u64) -> Bytes32 {
        Bytes32::from_u64(value)
    }

    fn host_with_slot(original: u64, current: u64) -> MockedHost {
        let mut account = MockedAccount::default();
        account.storage.insert(
            word(0),
            StorageValue { current: word(current), original: word(original), warm: false },
        );
        MockedHost::new().with_account(Address::ZERO, account)
    }

    fn store(original: u64, current: u64, value: u64) -> StorageStatus {
        host_with_slot(original, current).set_storage(&Address::ZERO, &word(0), &word(value))
    }

    #[test]
    fn test_storage_status_clean_slots() {
        assert_eq!(store(0, 0, 0), StorageStatus::Assigned);
        assert_eq!(store(0, 0, 1), StorageStatus::Added);
        assert_eq!(store(1, 1, 0), StorageStatus::Deleted);
        assert_eq!(store(1, 1, 2), StorageStatus::Modified);
        assert_eq!(store(1, 1, 1), StorageStatus::Assigned);
    }

    #[test]
    fn test_storage_status_dirty_slots() {
        assert_eq!(store(1, 0, 2), StorageStatus::DeletedAdded);
        assert_eq!(store(1, 2, 0), StorageStatus::ModifiedDeleted);
        assert_eq!(store(1, 0, 1), StorageStatus::DeletedRestored);
        assert_eq!(store(0, 1, 0), StorageStatus::AddedDeleted);
        assert_eq!(store(1, 2, 1), StorageStatus::ModifiedRestored);
        assert_eq!(store(0, 1, 2), StorageStatus::Assigned);
    }

    #[test]
    fn test_access_account_is_cold_then_warm() {
        let mut host = MockedHost::new();
        let address = Address::from_low_u64_be(7);
        assert_eq!(host.access_account(&address), AccessStatus::Cold);
        assert_eq!(host.access_account(&address), AccessStatus::Warm);
        assert_eq!(host.access_storage(&address, &word(1)), AccessStatus::Cold);
        assert_eq!(host.access_storage(&address, &word(1)), AccessStatus::Warm);
    }

    #[test]
    fn test_copy_code_bounds() {
        let address = Address::from_low_u64_be(1);
        let account = MockedAccount { code: vec![1, 2, 3, 4], ..Default::default() };
        let mut host = MockedHost::new().with_account(address, account);

        let mut buffer = [0u8; 3];
        assert_eq!(host.copy_code(&address, 2, &mut buffer), 2);
        assert_eq!(buffer, [3, 4, 0]);
        assert_eq!(host.copy_code(&address, 9, &mut buffer), 0);
    }

    #[test]
    fn test_selfdestruct_reports_first_registration() {
        let mut host = MockedHost::new();
        let address = Address::from_low_u64_be(1);
        assert!(host.selfdestruct(&address, &Address::ZERO));
        assert!(!host.selfdestruct(&address, &Address::ZERO));
        assert_eq!(host.recorded_selfdestructs.len(), 2);
    }
}
