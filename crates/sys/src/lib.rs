//! The binary contract of the EVMC connector.
//!
//! Every type in this crate is plain data with a C-compatible layout. Two independently compiled
//! modules (a Host and a VM) agree on these layouts without sharing any source code, so nothing
//! here may be reordered. The callback tables ([`evmc_host_interface`], [`evmc_vm`]) are
//! position-significant: new entries are only ever appended, and any change to an existing
//! layout must bump [`EVMC_ABI_VERSION`].
//!
//! Enumerations are represented as raw integers on the wire. The safe layer in `evmc-vm`
//! converts them into Rust enums and decides what to do with values it does not know.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_void};

/// Hex formatting, parsing and `alloy-primitives` conversions for the value types.
pub mod convert;

/// The ABI version of the layouts declared in this crate.
///
/// Every VM instance embeds the version it was compiled against in [`evmc_vm::abi_version`].
/// The loader refuses any instance whose version differs.
pub const EVMC_ABI_VERSION: i32 = 12;

/// Big-endian 160-bit hash suitable for keeping an Ethereum address.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct evmc_address {
    /// The 20 bytes of the hash.
    pub bytes: [u8; 20],
}

/// The fixed size array of 32 bytes, used both as a big-endian 256-bit integer and as a hash.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct evmc_bytes32 {
    /// The 32 bytes.
    pub bytes: [u8; 32],
}

/// The alias for [`evmc_bytes32`] to represent a big-endian 256-bit integer.
pub type evmc_uint256be = evmc_bytes32;

/// The kind of call-like instruction.
pub type evmc_call_kind = i32;
/// Request CALL.
pub const EVMC_CALL: evmc_call_kind = 0;
/// Request DELEGATECALL. The value param ignored.
pub const EVMC_DELEGATECALL: evmc_call_kind = 1;
/// Request CALLCODE.
pub const EVMC_CALLCODE: evmc_call_kind = 2;
/// Request CREATE.
pub const EVMC_CREATE: evmc_call_kind = 3;
/// Request CREATE2. Valid since Constantinople.
pub const EVMC_CREATE2: evmc_call_kind = 4;

/// The flags for [`evmc_message`].
pub type evmc_flags = u32;
/// Static call mode.
pub const EVMC_STATIC: evmc_flags = 1;

/// The message describing an EVM call, including a zero-depth call from a transaction origin.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct evmc_message {
    /// The kind of the call. For zero-depth calls [`EVMC_CALL`] should be used.
    pub kind: evmc_call_kind,
    /// Additional flags modifying the call execution behavior.
    pub flags: evmc_flags,
    /// The present depth of the message call stack.
    pub depth: i32,
    /// The amount of gas available to the message execution. Never negative.
    pub gas: i64,
    /// The recipient of the message.
    pub recipient: evmc_address,
    /// The sender of the message.
    pub sender: evmc_address,
    /// The message input data. Null iff `input_size` is 0.
    pub input_data: *const u8,
    /// The size of the message input data.
    pub input_size: usize,
    /// The amount of Ether transferred with the message.
    pub value: evmc_uint256be,
    /// The optional value used in new contract address construction. Only for CREATE2.
    pub create2_salt: evmc_bytes32,
    /// The address of the code to be executed. Differs from `recipient` for DELEGATECALL and
    /// CALLCODE.
    pub code_address: evmc_address,
    /// The code to be executed, when the caller already has it. Null iff `code_size` is 0.
    pub code: *const u8,
    /// The length of the code to be executed.
    pub code_size: usize,
}

impl Default for evmc_message {
    fn default() -> Self {
        evmc_message {
            kind: EVMC_CALL,
            flags: 0,
            depth: 0,
            gas: 0,
            recipient: evmc_address::default(),
            sender: evmc_address::default(),
            input_data: std::ptr::null(),
            input_size: 0,
            value: evmc_uint256be::default(),
            create2_salt: evmc_bytes32::default(),
            code_address: evmc_address::default(),
            code: std::ptr::null(),
            code_size: 0,
        }
    }
}

/// An initcode carried by a transaction, with its hash.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct evmc_tx_initcode {
    /// The initcode hash.
    pub hash: evmc_bytes32,
    /// The code.
    pub code: *const u8,
    /// The length of the code.
    pub code_size: usize,
}

/// The transaction and block data for execution.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct evmc_tx_context {
    /// The transaction gas price.
    pub tx_gas_price: evmc_uint256be,
    /// The transaction origin account.
    pub tx_origin: evmc_address,
    /// The miner of the block.
    pub block_coinbase: evmc_address,
    /// The block number.
    pub block_number: i64,
    /// The block timestamp.
    pub block_timestamp: i64,
    /// The block gas limit.
    pub block_gas_limit: i64,
    /// The block previous RANDAO (EIP-4399), or the difficulty before the merge.
    pub block_prev_randao: evmc_uint256be,
    /// The blockchain's ChainID.
    pub chain_id: evmc_uint256be,
    /// The block base fee per gas (EIP-1559, EIP-3198).
    pub block_base_fee: evmc_uint256be,
    /// The blob base fee (EIP-7516).
    pub blob_base_fee: evmc_uint256be,
    /// The array of blob hashes (EIP-4844). Null iff `blob_hashes_count` is 0.
    pub blob_hashes: *const evmc_bytes32,
    /// The number of blob hashes.
    pub blob_hashes_count: usize,
    /// The array of transaction initcodes. Null iff `initcodes_count` is 0.
    pub initcodes: *const evmc_tx_initcode,
    /// The number of transaction initcodes.
    pub initcodes_count: usize,
}

impl Default for evmc_tx_context {
    fn default() -> Self {
        evmc_tx_context {
            tx_gas_price: evmc_uint256be::default(),
            tx_origin: evmc_address::default(),
            block_coinbase: evmc_address::default(),
            block_number: 0,
            block_timestamp: 0,
            block_gas_limit: 0,
            block_prev_randao: evmc_uint256be::default(),
            chain_id: evmc_uint256be::default(),
            block_base_fee: evmc_uint256be::default(),
            blob_base_fee: evmc_uint256be::default(),
            blob_hashes: std::ptr::null(),
            blob_hashes_count: 0,
            initcodes: std::ptr::null(),
            initcodes_count: 0,
        }
    }
}

/// The execution status code.
pub type evmc_status_code = i32;
/// Execution finished with success.
pub const EVMC_SUCCESS: evmc_status_code = 0;
/// Generic execution failure.
pub const EVMC_FAILURE: evmc_status_code = 1;
/// Execution terminated with REVERT opcode.
pub const EVMC_REVERT: evmc_status_code = 2;
/// The execution has run out of gas.
pub const EVMC_OUT_OF_GAS: evmc_status_code = 3;
/// The designated INVALID instruction has been hit during execution.
pub const EVMC_INVALID_INSTRUCTION: evmc_status_code = 4;
/// An undefined instruction has been encountered.
pub const EVMC_UNDEFINED_INSTRUCTION: evmc_status_code = 5;
/// The execution has attempted to put more items on the EVM stack than the specified limit.
pub const EVMC_STACK_OVERFLOW: evmc_status_code = 6;
/// Execution of an opcode has required more items on the EVM stack.
pub const EVMC_STACK_UNDERFLOW: evmc_status_code = 7;
/// Execution has violated the jump destination restrictions.
pub const EVMC_BAD_JUMP_DESTINATION: evmc_status_code = 8;
/// Tried to read outside memory bounds.
pub const EVMC_INVALID_MEMORY_ACCESS: evmc_status_code = 9;
/// Call depth has exceeded the limit.
pub const EVMC_CALL_DEPTH_EXCEEDED: evmc_status_code = 10;
/// Tried to execute an operation which is restricted in static mode.
pub const EVMC_STATIC_MODE_VIOLATION: evmc_status_code = 11;
/// A call to a precompiled or system contract has ended with a failure.
pub const EVMC_PRECOMPILE_FAILURE: evmc_status_code = 12;
/// Contract validation has failed.
pub const EVMC_CONTRACT_VALIDATION_FAILURE: evmc_status_code = 13;
/// An argument to a state accessing method has a value outside of the accepted range.
pub const EVMC_ARGUMENT_OUT_OF_RANGE: evmc_status_code = 14;
/// A WebAssembly `unreachable` instruction has been hit during execution.
pub const EVMC_WASM_UNREACHABLE_INSTRUCTION: evmc_status_code = 15;
/// A WebAssembly trap has been hit during execution.
pub const EVMC_WASM_TRAP: evmc_status_code = 16;
/// The caller does not have enough funds for value transfer.
pub const EVMC_INSUFFICIENT_BALANCE: evmc_status_code = 17;
/// EVM implementation generic internal error.
pub const EVMC_INTERNAL_ERROR: evmc_status_code = -1;
/// The execution of the given code and/or message has been rejected by the EVM implementation.
pub const EVMC_REJECTED: evmc_status_code = -2;
/// The VM failed to allocate the amount of memory needed for execution.
pub const EVMC_OUT_OF_MEMORY: evmc_status_code = -3;

/// Releases resources assigned to an execution result.
///
/// The result itself is not modified by this function, but becomes invalid and must not be read
/// again.
pub type evmc_release_result_fn = Option<unsafe extern "C" fn(result: *const evmc_result)>;

/// The EVM code execution result.
///
/// The structure is 72 bytes long. The trailing 24 bytes (`create_address` and `padding`) form
/// the "optional data" the producer of the result may use as scratch storage.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct evmc_result {
    /// The execution status code.
    pub status_code: evmc_status_code,
    /// The amount of gas left after the execution. Must be 0 unless the status is
    /// [`EVMC_SUCCESS`] or [`EVMC_REVERT`].
    pub gas_left: i64,
    /// The amount of gas refunded by the execution. Must be 0 unless the status is
    /// [`EVMC_SUCCESS`].
    pub gas_refund: i64,
    /// The reference to output data. Null iff `output_size` is 0.
    pub output_data: *const u8,
    /// The size of the output data.
    pub output_size: usize,
    /// The method releasing all resources associated with the result object. May be null.
    pub release: evmc_release_result_fn,
    /// The address of the contract created by a successful create message.
    pub create_address: evmc_address,
    /// Reserved data that may be used by an [`evmc_result`] object creator.
    pub padding: [u8; 4],
}

impl Default for evmc_result {
    fn default() -> Self {
        evmc_result {
            status_code: EVMC_SUCCESS,
            gas_left: 0,
            gas_refund: 0,
            output_data: std::ptr::null(),
            output_size: 0,
            release: None,
            create_address: evmc_address::default(),
            padding: [0u8; 4],
        }
    }
}

/// The union representing [`evmc_result`] "optional data".
#[repr(C)]
#[derive(Clone, Copy)]
pub union evmc_result_optional_data {
    /// 24 bytes of optional data.
    pub bytes: [u8; 24],
    /// Optional pointer.
    pub pointer: *mut c_void,
}

impl std::fmt::Debug for evmc_result_optional_data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SAFETY: every bit pattern is a valid byte array
        f.debug_struct("evmc_result_optional_data").field("bytes", unsafe { &self.bytes }).finish()
    }
}

impl evmc_result {
    /// Provides read-only access to the result "optional data".
    pub fn optional_data(&self) -> &evmc_result_optional_data {
        // SAFETY: `create_address` and `padding` are contiguous, span 24 bytes and start at an
        // 8-byte aligned offset of this 8-byte aligned struct.
        unsafe {
            &*(std::ptr::addr_of!(self.create_address) as *const evmc_result_optional_data)
        }
    }

    /// Provides read-write access to the result "optional data".
    pub fn optional_data_mut(&mut self) -> &mut evmc_result_optional_data {
        // SAFETY: see `optional_data`
        unsafe {
            &mut *(std::ptr::addr_of_mut!(self.create_address) as *mut evmc_result_optional_data)
        }
    }
}

/// The opaque data type representing the Host execution context.
#[repr(C)]
#[derive(Debug)]
pub struct evmc_host_context {
    _unused: [u8; 0],
}

/// The effect of an attempt to modify a contract storage item.
pub type evmc_storage_status = i32;
/// The new/same value is assigned to the storage item without affecting the cost structure.
pub const EVMC_STORAGE_ASSIGNED: evmc_storage_status = 0;
/// A new storage item is added by changing the current clean zero to a nonzero value.
pub const EVMC_STORAGE_ADDED: evmc_storage_status = 1;
/// A storage item is deleted by changing the current clean nonzero to the zero value.
pub const EVMC_STORAGE_DELETED: evmc_storage_status = 2;
/// A storage item is modified by changing the current clean nonzero to other nonzero value.
pub const EVMC_STORAGE_MODIFIED: evmc_storage_status = 3;
/// A storage item is added by changing the current dirty zero to a nonzero value other than the
/// original value.
pub const EVMC_STORAGE_DELETED_ADDED: evmc_storage_status = 4;
/// A storage item is deleted by changing the current dirty nonzero to the zero value and the
/// original value is not zero.
pub const EVMC_STORAGE_MODIFIED_DELETED: evmc_storage_status = 5;
/// A storage item is added by changing the current dirty zero to the original value.
pub const EVMC_STORAGE_DELETED_RESTORED: evmc_storage_status = 6;
/// A storage item is deleted by changing the current dirty nonzero to the original zero value.
pub const EVMC_STORAGE_ADDED_DELETED: evmc_storage_status = 7;
/// A storage item is modified by changing the current dirty nonzero to the original nonzero
/// value other than the current value.
pub const EVMC_STORAGE_MODIFIED_RESTORED: evmc_storage_status = 8;

/// Access status per EIP-2929: Gas cost increases for state access opcodes.
pub type evmc_access_status = i32;
/// The entry hasn't been accessed before, it's the first access.
pub const EVMC_ACCESS_COLD: evmc_access_status = 0;
/// The entry is already in accessed_addresses or accessed_storage_keys.
pub const EVMC_ACCESS_WARM: evmc_access_status = 1;

/// Check account existence callback function.
pub type evmc_account_exists_fn = Option<
    unsafe extern "C" fn(context: *mut evmc_host_context, address: *const evmc_address) -> bool,
>;

/// Get storage callback function.
pub type evmc_get_storage_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        key: *const evmc_bytes32,
    ) -> evmc_bytes32,
>;

/// Set storage callback function.
pub type evmc_set_storage_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        key: *const evmc_bytes32,
        value: *const evmc_bytes32,
    ) -> evmc_storage_status,
>;

/// Get balance callback function.
pub type evmc_get_balance_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
    ) -> evmc_uint256be,
>;

/// Get code size callback function.
pub type evmc_get_code_size_fn = Option<
    unsafe extern "C" fn(context: *mut evmc_host_context, address: *const evmc_address) -> usize,
>;

/// Get code hash callback function.
pub type evmc_get_code_hash_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
    ) -> evmc_bytes32,
>;

/// Copy code callback function. Returns the number of bytes copied into the buffer.
pub type evmc_copy_code_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        code_offset: usize,
        buffer_data: *mut u8,
        buffer_size: usize,
    ) -> usize,
>;

/// Selfdestruct callback function. Returns true if the contract was registered for the first
/// time.
pub type evmc_selfdestruct_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        beneficiary: *const evmc_address,
    ) -> bool,
>;

/// Pointer to the callback function supporting EVM calls.
pub type evmc_call_fn = Option<
    unsafe extern "C" fn(context: *mut evmc_host_context, msg: *const evmc_message) -> evmc_result,
>;

/// Get transaction context callback function.
pub type evmc_get_tx_context_fn =
    Option<unsafe extern "C" fn(context: *mut evmc_host_context) -> evmc_tx_context>;

/// Get block hash callback function.
pub type evmc_get_block_hash_fn =
    Option<unsafe extern "C" fn(context: *mut evmc_host_context, number: i64) -> evmc_bytes32>;

/// Log callback function.
pub type evmc_emit_log_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        data: *const u8,
        data_size: usize,
        topics: *const evmc_bytes32,
        topics_count: usize,
    ),
>;

/// Access account callback function.
pub type evmc_access_account_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
    ) -> evmc_access_status,
>;

/// Access storage callback function.
pub type evmc_access_storage_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        key: *const evmc_bytes32,
    ) -> evmc_access_status,
>;

/// Get transient storage callback function.
pub type evmc_get_transient_storage_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        key: *const evmc_bytes32,
    ) -> evmc_bytes32,
>;

/// Set transient storage callback function.
pub type evmc_set_transient_storage_fn = Option<
    unsafe extern "C" fn(
        context: *mut evmc_host_context,
        address: *const evmc_address,
        key: *const evmc_bytes32,
        value: *const evmc_bytes32,
    ),
>;

/// The Host interface.
///
/// The set of all callback functions expected by VM instances. This is the C realisation of a
/// vtable: only function pointers, no data. The order of the entries is part of the ABI.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct evmc_host_interface {
    /// Check account existence callback function.
    pub account_exists: evmc_account_exists_fn,
    /// Get storage callback function.
    pub get_storage: evmc_get_storage_fn,
    /// Set storage callback function.
    pub set_storage: evmc_set_storage_fn,
    /// Get balance callback function.
    pub get_balance: evmc_get_balance_fn,
    /// Get code size callback function.
    pub get_code_size: evmc_get_code_size_fn,
    /// Get code hash callback function.
    pub get_code_hash: evmc_get_code_hash_fn,
    /// Copy code callback function.
    pub copy_code: evmc_copy_code_fn,
    /// Selfdestruct callback function.
    pub selfdestruct: evmc_selfdestruct_fn,
    /// Call callback function.
    pub call: evmc_call_fn,
    /// Get transaction context callback function.
    pub get_tx_context: evmc_get_tx_context_fn,
    /// Get block hash callback function.
    pub get_block_hash: evmc_get_block_hash_fn,
    /// Emit log callback function.
    pub emit_log: evmc_emit_log_fn,
    /// Access account callback function.
    pub access_account: evmc_access_account_fn,
    /// Access storage callback function.
    pub access_storage: evmc_access_storage_fn,
    /// Get transient storage callback function.
    pub get_transient_storage: evmc_get_transient_storage_fn,
    /// Set transient storage callback function.
    pub set_transient_storage: evmc_set_transient_storage_fn,
}

/// EVM revision. The revision of the EVM specification based on the Ethereum upgrade / hard fork
/// codenames.
pub type evmc_revision = i32;
/// The Frontier revision.
pub const EVMC_FRONTIER: evmc_revision = 0;
/// The Homestead revision.
pub const EVMC_HOMESTEAD: evmc_revision = 1;
/// The Tangerine Whistle revision.
pub const EVMC_TANGERINE_WHISTLE: evmc_revision = 2;
/// The Spurious Dragon revision.
pub const EVMC_SPURIOUS_DRAGON: evmc_revision = 3;
/// The Byzantium revision.
pub const EVMC_BYZANTIUM: evmc_revision = 4;
/// The Constantinople revision.
pub const EVMC_CONSTANTINOPLE: evmc_revision = 5;
/// The Petersburg revision.
pub const EVMC_PETERSBURG: evmc_revision = 6;
/// The Istanbul revision.
pub const EVMC_ISTANBUL: evmc_revision = 7;
/// The Berlin revision.
pub const EVMC_BERLIN: evmc_revision = 8;
/// The London revision.
pub const EVMC_LONDON: evmc_revision = 9;
/// The Paris revision (aka The Merge).
pub const EVMC_PARIS: evmc_revision = 10;
/// The Shanghai revision.
pub const EVMC_SHANGHAI: evmc_revision = 11;
/// The Cancun revision.
pub const EVMC_CANCUN: evmc_revision = 12;
/// The Prague revision.
pub const EVMC_PRAGUE: evmc_revision = 13;
/// The Osaka revision.
pub const EVMC_OSAKA: evmc_revision = 14;
/// The maximum EVM revision supported.
pub const EVMC_MAX_REVISION: evmc_revision = EVMC_OSAKA;
/// The latest known EVM revision with finalized specification.
pub const EVMC_LATEST_STABLE_REVISION: evmc_revision = EVMC_CANCUN;

/// Possible outcomes of [`evmc_set_option_fn`].
pub type evmc_set_option_result = i32;
/// The option was set.
pub const EVMC_SET_OPTION_SUCCESS: evmc_set_option_result = 0;
/// The option name is not known to the VM.
pub const EVMC_SET_OPTION_INVALID_NAME: evmc_set_option_result = 1;
/// The option value is not supported for the given name.
pub const EVMC_SET_OPTION_INVALID_VALUE: evmc_set_option_result = 2;

/// Possible capabilities of a VM, as a bit-set.
pub type evmc_capabilities_flagset = u32;
/// The VM is capable of executing EVM1 bytecode.
pub const EVMC_CAPABILITY_EVM1: evmc_capabilities_flagset = 1 << 0;
/// The VM is capable of executing ewasm bytecode.
pub const EVMC_CAPABILITY_EWASM: evmc_capabilities_flagset = 1 << 1;
/// The VM is capable of executing the precompiled contracts defined for the range of code
/// addresses.
pub const EVMC_CAPABILITY_PRECOMPILES: evmc_capabilities_flagset = 1 << 2;

/// Destroys the VM instance.
pub type evmc_destroy_fn = Option<unsafe extern "C" fn(vm: *mut evmc_vm)>;

/// Configures the VM instance.
pub type evmc_set_option_fn = Option<
    unsafe extern "C" fn(
        vm: *mut evmc_vm,
        name: *const c_char,
        value: *const c_char,
    ) -> evmc_set_option_result,
>;

/// Executes the given code using the input from the message.
pub type evmc_execute_fn = Option<
    unsafe extern "C" fn(
        vm: *mut evmc_vm,
        host: *const evmc_host_interface,
        context: *mut evmc_host_context,
        rev: evmc_revision,
        msg: *const evmc_message,
        code: *const u8,
        code_size: usize,
    ) -> evmc_result,
>;

/// Returns the supported capabilities of the VM instance.
pub type evmc_get_capabilities_fn =
    Option<unsafe extern "C" fn(vm: *mut evmc_vm) -> evmc_capabilities_flagset>;

/// The VM instance.
///
/// Defines the base struct of the VM implementation. Implementations may extend it by placing
/// it as the first field of a larger `#[repr(C)]` struct.
#[repr(C)]
#[derive(Debug)]
pub struct evmc_vm {
    /// EVMC ABI version implemented by the VM instance.
    pub abi_version: i32,
    /// The name of the VM implementation, a null-terminated string.
    pub name: *const c_char,
    /// The version of the VM implementation, a null-terminated string.
    pub version: *const c_char,
    /// Pointer to function destroying the VM instance.
    pub destroy: evmc_destroy_fn,
    /// Pointer to function executing a code by the VM instance.
    pub execute: evmc_execute_fn,
    /// A method returning capabilities supported by the VM instance.
    pub get_capabilities: evmc_get_capabilities_fn,
    /// Optional pointer to function modifying VM's options. Null if the VM has no options.
    pub set_option: evmc_set_option_fn,
}

/// The function creating a VM instance, the single entry point every VM module exports.
pub type evmc_create_fn = unsafe extern "C" fn() -> *mut evmc_vm;
