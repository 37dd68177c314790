//! The Host side of the callback table.
//!
//! A [`Host`] is bound to the wire table by [`host_interface`], which instantiates one
//! `extern "C"` trampoline per entry for the concrete host type. The host itself travels as the
//! opaque context pointer of the call.
//!
//! A panic in a [`Host`] method never unwinds into the VM. The trampoline catches it, logs it
//! and answers with a neutral value: false, zero, [`StorageStatus::Assigned`],
//! [`AccessStatus::Cold`], or an internal error for nested calls.

use std::panic::{catch_unwind, AssertUnwindSafe};

use evmc_sys as ffi;
use tracing::{error, warn};

use crate::{
    message::{borrowed_slice, ExecutionMessage},
    result::ExecutionResult,
    types::{AccessStatus, Address, Bytes32, StatusCode, StorageStatus, TxContext, Uint256},
};

/// The world-state callbacks a VM may invoke during execution.
///
/// The methods follow the order of the wire table. Entries are only ever appended.
pub trait Host {
    /// Returns true if the account exists.
    fn account_exists(&mut self, address: &Address) -> bool;

    /// Returns the value at `key` of the account's storage, or zero.
    fn get_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32;

    /// Sets the value at `key` and reports how the write affects the storage slot.
    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32)
        -> StorageStatus;

    /// Returns the balance of the account, or zero.
    fn get_balance(&mut self, address: &Address) -> Uint256;

    /// Returns the size of the account's code, or zero.
    fn get_code_size(&mut self, address: &Address) -> usize;

    /// Returns the hash of the account's code, or zero for a non-existent account.
    fn get_code_hash(&mut self, address: &Address) -> Bytes32;

    /// Copies code starting at `code_offset` into `buffer`, returning the number of bytes copied.
    fn copy_code(&mut self, address: &Address, code_offset: usize, buffer: &mut [u8]) -> usize;

    /// Registers the account for destruction. Returns true the first time an account is
    /// registered.
    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool;

    /// Performs a nested call. The message depth is one more than the depth of the caller.
    fn call(&mut self, message: &ExecutionMessage<'_>) -> ExecutionResult;

    /// Returns the transaction and block data.
    fn get_tx_context(&mut self) -> TxContext;

    /// Returns the hash of the block with the given number, or zero if it is out of range.
    fn get_block_hash(&mut self, number: i64) -> Bytes32;

    /// Records a log emitted by the account.
    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]);

    /// Marks the account as accessed and reports whether it was warm before.
    fn access_account(&mut self, address: &Address) -> AccessStatus;

    /// Marks the storage slot as accessed and reports whether it was warm before.
    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus;

    /// Returns the value at `key` of the account's transient storage (EIP-1153), or zero.
    fn get_transient_storage(&mut self, address: &Address, key: &Bytes32) -> Bytes32;

    /// Sets the value at `key` of the account's transient storage.
    fn set_transient_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32);
}

/// Builds the callback table for `H`. The table is only valid together with a context pointer
/// that points to a live `H`.
pub fn host_interface<H: Host>() -> ffi::evmc_host_interface {
    ffi::evmc_host_interface {
        account_exists: Some(account_exists::<H>),
        get_storage: Some(get_storage::<H>),
        set_storage: Some(set_storage::<H>),
        get_balance: Some(get_balance::<H>),
        get_code_size: Some(get_code_size::<H>),
        get_code_hash: Some(get_code_hash::<H>),
        copy_code: Some(copy_code::<H>),
        selfdestruct: Some(selfdestruct::<H>),
        call: Some(call::<H>),
        get_tx_context: Some(get_tx_context::<H>),
        get_block_hash: Some(get_block_hash::<H>),
        emit_log: Some(emit_log::<H>),
        access_account: Some(access_account::<H>),
        access_storage: Some(access_storage::<H>),
        get_transient_storage: Some(get_transient_storage::<H>),
        set_transient_storage: Some(set_transient_storage::<H>),
    }
}

/// # Safety
///
/// `context` must be the pointer registered together with the table built for `H`.
unsafe fn host<'a, H: Host>(context: *mut ffi::evmc_host_context) -> &'a mut H {
    &mut *(context as *mut H)
}

/// Runs one callback, answering with `neutral` if it panics.
fn guarded<R>(callback: &'static str, neutral: impl FnOnce() -> R, f: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error!("host panicked in '{}', answering with a neutral value", callback);
            neutral()
        }
    }
}

unsafe extern "C" fn account_exists<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
) -> bool {
    guarded("account_exists", || false, || host::<H>(context).account_exists(&*address))
}

unsafe extern "C" fn get_storage<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    key: *const ffi::evmc_bytes32,
) -> ffi::evmc_bytes32 {
    guarded("get_storage", Default::default, || host::<H>(context).get_storage(&*address, &*key))
}

unsafe extern "C" fn set_storage<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    key: *const ffi::evmc_bytes32,
    value: *const ffi::evmc_bytes32,
) -> ffi::evmc_storage_status {
    let status = guarded(
        "set_storage",
        || StorageStatus::Assigned,
        || host::<H>(context).set_storage(&*address, &*key, &*value),
    );
    status as ffi::evmc_storage_status
}

unsafe extern "C" fn get_balance<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
) -> ffi::evmc_uint256be {
    guarded("get_balance", Default::default, || host::<H>(context).get_balance(&*address))
}

unsafe extern "C" fn get_code_size<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
) -> usize {
    guarded("get_code_size", || 0, || host::<H>(context).get_code_size(&*address))
}

unsafe extern "C" fn get_code_hash<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
) -> ffi::evmc_bytes32 {
    guarded("get_code_hash", Default::default, || host::<H>(context).get_code_hash(&*address))
}

unsafe extern "C" fn copy_code<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize {
    let buffer: &mut [u8] = if buffer_data.is_null() || buffer_size == 0 {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(buffer_data, buffer_size)
    };
    guarded("copy_code", || 0, || host::<H>(context).copy_code(&*address, code_offset, buffer))
}

unsafe extern "C" fn selfdestruct<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    beneficiary: *const ffi::evmc_address,
) -> bool {
    guarded("selfdestruct", || false, || host::<H>(context).selfdestruct(&*address, &*beneficiary))
}

unsafe extern "C" fn call<H: Host>(
    context: *mut ffi::evmc_host_context,
    message: *const ffi::evmc_message,
) -> ffi::evmc_result {
    match ExecutionMessage::from_ffi(&*message) {
        Ok(message) => guarded(
            "call",
            || ExecutionResult::error(StatusCode::InternalError),
            || host::<H>(context).call(&message),
        )
        .into_ffi(),
        Err(e) => {
            warn!("rejecting malformed nested call: {}", e);
            ExecutionResult::error(StatusCode::InternalError).into_ffi()
        }
    }
}

unsafe extern "C" fn get_tx_context<H: Host>(
    context: *mut ffi::evmc_host_context,
) -> ffi::evmc_tx_context {
    guarded("get_tx_context", TxContext::default, || host::<H>(context).get_tx_context())
}

unsafe extern "C" fn get_block_hash<H: Host>(
    context: *mut ffi::evmc_host_context,
    number: i64,
) -> ffi::evmc_bytes32 {
    guarded("get_block_hash", Default::default, || host::<H>(context).get_block_hash(number))
}

unsafe extern "C" fn emit_log<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    data: *const u8,
    data_size: usize,
    topics: *const ffi::evmc_bytes32,
    topics_count: usize,
) {
    let (data, topics) = (borrowed_slice(data, data_size), borrowed_slice(topics, topics_count));
    guarded("emit_log", || (), || host::<H>(context).emit_log(&*address, data, topics))
}

unsafe extern "C" fn access_account<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
) -> ffi::evmc_access_status {
    let status = guarded(
        "access_account",
        || AccessStatus::Cold,
        || host::<H>(context).access_account(&*address),
    );
    status as ffi::evmc_access_status
}

unsafe extern "C" fn access_storage<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    key: *const ffi::evmc_bytes32,
) -> ffi::evmc_access_status {
    let status = guarded(
        "access_storage",
        || AccessStatus::Cold,
        || host::<H>(context).access_storage(&*address, &*key),
    );
    status as ffi::evmc_access_status
}

unsafe extern "C" fn get_transient_storage<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    key: *const ffi::evmc_bytes32,
) -> ffi::evmc_bytes32 {
    guarded("get_transient_storage", Default::default, || {
        host::<H>(context).get_transient_storage(&*address, &*key)
    })
}

unsafe extern "C" fn set_transient_storage<H: Host>(
    context: *mut ffi::evmc_host_context,
    address: *const ffi::evmc_address,
    key: *const ffi::evmc_bytes32,
    value: *const ffi::evmc_bytes32,
) {
    guarded("set_transient_storage", || (), || {
        host::<H>(context).set_transient_storage(&*address, &*key, &*value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        container::EvmcContainer,
        message::ExecutionMessageBuilder,
        result::RawResult,
        testing::{opcodes, ScriptVm},
        types::Revision,
        vm::Vm,
    };

    /// Panics in every callback.
    struct FaultyHost;

    impl Host for FaultyHost {
        fn account_exists(&mut self, _: &Address) -> bool {
            panic!("account_exists")
        }
        fn get_storage(&mut self, _: &Address, _: &Bytes32) -> Bytes32 {
            panic!("get_storage")
        }
        fn set_storage(&mut self, _: &Address, _: &Bytes32, _: &Bytes32) -> StorageStatus {
            panic!("set_storage")
        }
        fn get_balance(&mut self, _: &Address) -> Uint256 {
            panic!("get_balance")
        }
        fn get_code_size(&mut self, _: &Address) -> usize {
            panic!("get_code_size")
        }
        fn get_code_hash(&mut self, _: &Address) -> Bytes32 {
            panic!("get_code_hash")
        }
        fn copy_code(&mut self, _: &Address, _: usize, _: &mut [u8]) -> usize {
            panic!("copy_code")
        }
        fn selfdestruct(&mut self, _: &Address, _: &Address) -> bool {
            panic!("selfdestruct")
        }
        fn call(&mut self, _: &ExecutionMessage<'_>) -> ExecutionResult {
            panic!("call")
        }
        fn get_tx_context(&mut self) -> TxContext {
            panic!("get_tx_context")
        }
        fn get_block_hash(&mut self, _: i64) -> Bytes32 {
            panic!("get_block_hash")
        }
        fn emit_log(&mut self, _: &Address, _: &[u8], _: &[Bytes32]) {
            panic!("emit_log")
        }
        fn access_account(&mut self, _: &Address) -> AccessStatus {
            panic!("access_account")
        }
        fn access_storage(&mut self, _: &Address, _: &Bytes32) -> AccessStatus {
            panic!("access_storage")
        }
        fn get_transient_storage(&mut self, _: &Address, _: &Bytes32) -> Bytes32 {
            panic!("get_transient_storage")
        }
        fn set_transient_storage(&mut self, _: &Address, _: &Bytes32, _: &Bytes32) {
            panic!("set_transient_storage")
        }
    }

    #[test]
    fn test_host_panics_answer_neutral_values() {
        let interface = host_interface::<FaultyHost>();
        let mut host = FaultyHost;
        let context = &mut host as *mut FaultyHost as *mut ffi::evmc_host_context;
        let address = Address::from_low_u64_be(1);
        let key = Bytes32::from_u64(2);
        let mut buffer = [0u8; 4];

        unsafe {
            assert!(!interface.account_exists.unwrap()(context, &address));
            assert_eq!(interface.get_storage.unwrap()(context, &address, &key), Bytes32::ZERO);
            assert_eq!(
                interface.set_storage.unwrap()(context, &address, &key, &key),
                ffi::EVMC_STORAGE_ASSIGNED
            );
            assert_eq!(interface.get_balance.unwrap()(context, &address), Uint256::ZERO);
            assert_eq!(interface.get_code_size.unwrap()(context, &address), 0);
            assert_eq!(interface.get_code_hash.unwrap()(context, &address), Bytes32::ZERO);
            assert_eq!(
                interface.copy_code.unwrap()(context, &address, 0, buffer.as_mut_ptr(), 4),
                0
            );
            assert!(!interface.selfdestruct.unwrap()(context, &address, &address));
            assert_eq!(interface.get_tx_context.unwrap()(context), TxContext::default());
            assert_eq!(interface.get_block_hash.unwrap()(context, 1), Bytes32::ZERO);
            interface.emit_log.unwrap()(context, &address, std::ptr::null(), 0, &key, 1);
            assert_eq!(
                interface.access_account.unwrap()(context, &address),
                ffi::EVMC_ACCESS_COLD
            );
            assert_eq!(
                interface.access_storage.unwrap()(context, &address, &key),
                ffi::EVMC_ACCESS_COLD
            );
            assert_eq!(
                interface.get_transient_storage.unwrap()(context, &address, &key),
                Bytes32::ZERO
            );
            interface.set_transient_storage.unwrap()(context, &address, &key, &key);

            let message = ExecutionMessageBuilder::new().build().expect("failed to build");
            let raw = interface.call.unwrap()(context, &message.to_ffi());
            let result = RawResult::from_raw(raw).into_execution_result();
            assert_eq!(result.status_code(), StatusCode::InternalError);
            assert_eq!(result.gas_left(), 0);
        }
    }

    #[test]
    fn test_execution_survives_host_panic() {
        let instance = EvmcContainer::<ScriptVm>::new_raw("script\0", "0.1.0\0");
        let vm = unsafe { Vm::from_raw(instance) }.expect("failed to wrap instance");
        let message = ExecutionMessageBuilder::new().gas(10).build().expect("failed to build");

        let result =
            vm.execute(&mut FaultyHost, Revision::Cancun, &message, &[opcodes::SSTORE, opcodes::STOP]);
        assert_eq!(result.status_code(), StatusCode::Success);
        assert_eq!(result.output().as_slice(), &[StorageStatus::Assigned as u8]);
    }
}
