use evmc_sys as ffi;
use once_cell::unsync::OnceCell;

use crate::{
    host::Host,
    message::{borrowed_slice, ExecutionMessage},
    result::{ExecutionResult, RawResult},
    types::{
        AccessStatus, Address, Bytes32, StorageStatus, TxContext, TxInitcode, Uint256,
        UnknownValue,
    },
};

/// Returned when a host passes a callback table with a missing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("host interface is missing the '{0}' callback")]
pub struct MissingCallback(pub &'static str);

/// The VM's view of the host during one execution.
///
/// Wraps the callback table and the opaque host context. The transaction context is fetched
/// from the host at most once and cached for the rest of the execution.
pub struct ExecutionContext<'a> {
    interface: &'a ffi::evmc_host_interface,
    context: *mut ffi::evmc_host_context,
    tx_context: OnceCell<TxContext>,
}

macro_rules! callback {
    ($self:ident . $name:ident ( $($arg:expr),* )) => {
        match $self.interface.$name {
            // SAFETY: the table and context were handed over together by the host
            Some(f) => unsafe { f($self.context $(, $arg)*) },
            None => unreachable!("checked in ExecutionContext::new"),
        }
    };
}

impl<'a> ExecutionContext<'a> {
    /// Wraps a host table and its context.
    ///
    /// # Safety
    ///
    /// `context` must be the context the host passed together with `interface`, and must stay
    /// valid for `'a`.
    pub unsafe fn new(
        interface: &'a ffi::evmc_host_interface,
        context: *mut ffi::evmc_host_context,
    ) -> Result<Self, MissingCallback> {
        macro_rules! require {
            ($($name:ident),*) => {
                $(
                    if interface.$name.is_none() {
                        return Err(MissingCallback(stringify!($name)));
                    }
                )*
            };
        }
        require!(
            account_exists,
            get_storage,
            set_storage,
            get_balance,
            get_code_size,
            get_code_hash,
            copy_code,
            selfdestruct,
            call,
            get_tx_context,
            get_block_hash,
            emit_log,
            access_account,
            access_storage,
            get_transient_storage,
            set_transient_storage
        );

        Ok(ExecutionContext { interface, context, tx_context: OnceCell::new() })
    }

    /// The transaction context, fetched from the host on first use.
    pub fn tx_context(&self) -> &TxContext {
        self.tx_context.get_or_init(|| callback!(self.get_tx_context()))
    }

    /// The blob hashes of the transaction.
    pub fn blob_hashes(&self) -> &[Bytes32] {
        let tx_context = self.tx_context();
        // SAFETY: the host keeps the arrays of its transaction context alive for the execution
        unsafe { borrowed_slice(tx_context.blob_hashes, tx_context.blob_hashes_count) }
    }

    /// The initcodes carried by the transaction.
    pub fn initcodes(&self) -> &[TxInitcode] {
        let tx_context = self.tx_context();
        // SAFETY: see `blob_hashes`
        unsafe { borrowed_slice(tx_context.initcodes, tx_context.initcodes_count) }
    }
}

impl Host for ExecutionContext<'_> {
    fn account_exists(&mut self, address: &Address) -> bool {
        callback!(self.account_exists(address))
    }

    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        callback!(self.get_storage(address, key))
    }

    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        let raw = callback!(self.set_storage(address, key, value));
        StorageStatus::try_from(raw).unwrap_or_else(|UnknownValue { value, .. }| {
            tracing::warn!("host returned unknown storage status {}, assuming assigned", value);
            StorageStatus::Assigned
        })
    }

    fn get_balance(&mut self, address: &Address) -> Uint256 {
        callback!(self.get_balance(address))
    }

    fn get_code_size(&mut self, address: &Address) -> usize {
        callback!(self.get_code_size(address))
    }

    fn get_code_hash(&mut self, address: &Address) -> Bytes32 {
        callback!(self.get_code_hash(address))
    }

    fn copy_code(&mut self, address: &Address, code_offset: usize, buffer: &mut [u8]) -> usize {
        let copied =
            callback!(self.copy_code(address, code_offset, buffer.as_mut_ptr(), buffer.len()));
        copied.min(buffer.len())
    }

    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool {
        callback!(self.selfdestruct(address, beneficiary))
    }

    /// The result returned by the host is copied and released before this returns.
    fn call(&mut self, message: &ExecutionMessage<'_>) -> ExecutionResult {
        let raw_message = message.to_ffi();
        let raw = callback!(self.call(&raw_message));
        // SAFETY: a fresh result from the host, owned by nobody else
        unsafe { RawResult::from_raw(raw) }.into_execution_result()
    }

    fn get_tx_context(&mut self) -> TxContext {
        *self.tx_context()
    }

    fn get_block_hash(&mut self, number: i64) -> Bytes32 {
        callback!(self.get_block_hash(number))
    }

    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]) {
        let data_ptr = if data.is_empty() { std::ptr::null() } else { data.as_ptr() };
        let topics_ptr = if topics.is_empty() { std::ptr::null() } else { topics.as_ptr() };
        callback!(self.emit_log(address, data_ptr, data.len(), topics_ptr, topics.len()))
    }

    fn access_account(&mut self, address: &Address) -> AccessStatus {
        let raw = callback!(self.access_account(address));
        // anything but cold is treated as warm
        AccessStatus::try_from(raw).unwrap_or(AccessStatus::Warm)
    }

    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus {
        let raw = callback!(self.access_storage(address, key));
        AccessStatus::try_from(raw).unwrap_or(AccessStatus::Warm)
    }

    fn get_transient_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32 {
        callback!(self.get_transient_storage(address, key))
    }

    fn set_transient_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) {
        callback!(self.set_transient_storage(address, key, value))
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("context", &self.context)
            .field("tx_context_cached", &self.tx_context.get().is_some())
            .finish()
    }
}
