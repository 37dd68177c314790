use std::{fmt, ops::BitOr};

use evmc_sys as ffi;

/// A 20-byte big-endian account address.
pub type Address = ffi::evmc_address;

/// A 32-byte value, used both as a hash and as a big-endian 256-bit integer.
pub type Bytes32 = ffi::evmc_bytes32;

/// A big-endian 256-bit integer.
pub type Uint256 = ffi::evmc_uint256be;

/// The read-only transaction and block data, identical to its wire layout.
pub type TxContext = ffi::evmc_tx_context;

/// One initcode of the transaction, as referenced from [`TxContext::initcodes`].
pub type TxInitcode = ffi::evmc_tx_initcode;

/// The static-call flag of a message.
pub const STATIC_FLAG: u32 = ffi::EVMC_STATIC;

/// An integer that crossed the boundary but is not a known value of the enumeration it was
/// supposed to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownValue {
    /// The name of the enumeration.
    pub kind: &'static str,
    /// The raw value found on the wire.
    pub value: i64,
}

/// Execution status codes. The discriminants are the values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    /// Execution finished with success.
    Success = ffi::EVMC_SUCCESS,
    /// Generic execution failure.
    Failure = ffi::EVMC_FAILURE,
    /// Execution terminated with REVERT opcode.
    Revert = ffi::EVMC_REVERT,
    /// The execution has run out of gas.
    OutOfGas = ffi::EVMC_OUT_OF_GAS,
    /// The designated INVALID instruction has been hit.
    InvalidInstruction = ffi::EVMC_INVALID_INSTRUCTION,
    /// An undefined instruction has been encountered.
    UndefinedInstruction = ffi::EVMC_UNDEFINED_INSTRUCTION,
    /// Too many items on the stack.
    StackOverflow = ffi::EVMC_STACK_OVERFLOW,
    /// Too few items on the stack.
    StackUnderflow = ffi::EVMC_STACK_UNDERFLOW,
    /// Jump destination restrictions violated.
    BadJumpDestination = ffi::EVMC_BAD_JUMP_DESTINATION,
    /// Tried to read outside memory bounds.
    InvalidMemoryAccess = ffi::EVMC_INVALID_MEMORY_ACCESS,
    /// Call depth has exceeded the limit.
    CallDepthExceeded = ffi::EVMC_CALL_DEPTH_EXCEEDED,
    /// A state-modifying operation was attempted in static mode.
    StaticModeViolation = ffi::EVMC_STATIC_MODE_VIOLATION,
    /// A precompiled or system contract has failed.
    PrecompileFailure = ffi::EVMC_PRECOMPILE_FAILURE,
    /// Contract validation has failed.
    ContractValidationFailure = ffi::EVMC_CONTRACT_VALIDATION_FAILURE,
    /// An argument to a state accessing method is outside the accepted range.
    ArgumentOutOfRange = ffi::EVMC_ARGUMENT_OUT_OF_RANGE,
    /// A WebAssembly `unreachable` instruction has been hit.
    WasmUnreachableInstruction = ffi::EVMC_WASM_UNREACHABLE_INSTRUCTION,
    /// A WebAssembly trap has been hit.
    WasmTrap = ffi::EVMC_WASM_TRAP,
    /// The caller does not have enough funds for value transfer.
    InsufficientBalance = ffi::EVMC_INSUFFICIENT_BALANCE,
    /// Generic internal error of the VM implementation.
    InternalError = ffi::EVMC_INTERNAL_ERROR,
    /// The VM declined to execute this code/revision combination.
    Rejected = ffi::EVMC_REJECTED,
    /// The VM failed to allocate memory.
    OutOfMemory = ffi::EVMC_OUT_OF_MEMORY,
}

impl StatusCode {
    /// Returns true if results with this status may carry a non-zero `gas_left`.
    pub const fn keeps_gas(self) -> bool {
        matches!(self, StatusCode::Success | StatusCode::Revert)
    }

    /// Returns true for [`StatusCode::Success`].
    pub const fn is_success(self) -> bool {
        matches!(self, StatusCode::Success)
    }

    /// Returns the value on the wire.
    pub const fn to_raw(self) -> ffi::evmc_status_code {
        self as ffi::evmc_status_code
    }
}

impl TryFrom<ffi::evmc_status_code> for StatusCode {
    type Error = UnknownValue;

    fn try_from(value: ffi::evmc_status_code) -> Result<Self, Self::Error> {
        Ok(match value {
            ffi::EVMC_SUCCESS => StatusCode::Success,
            ffi::EVMC_FAILURE => StatusCode::Failure,
            ffi::EVMC_REVERT => StatusCode::Revert,
            ffi::EVMC_OUT_OF_GAS => StatusCode::OutOfGas,
            ffi::EVMC_INVALID_INSTRUCTION => StatusCode::InvalidInstruction,
            ffi::EVMC_UNDEFINED_INSTRUCTION => StatusCode::UndefinedInstruction,
            ffi::EVMC_STACK_OVERFLOW => StatusCode::StackOverflow,
            ffi::EVMC_STACK_UNDERFLOW => StatusCode::StackUnderflow,
            ffi::EVMC_BAD_JUMP_DESTINATION => StatusCode::BadJumpDestination,
            ffi::EVMC_INVALID_MEMORY_ACCESS => StatusCode::InvalidMemoryAccess,
            ffi::EVMC_CALL_DEPTH_EXCEEDED => StatusCode::CallDepthExceeded,
            ffi::EVMC_STATIC_MODE_VIOLATION => StatusCode::StaticModeViolation,
            ffi::EVMC_PRECOMPILE_FAILURE => StatusCode::PrecompileFailure,
            ffi::EVMC_CONTRACT_VALIDATION_FAILURE => StatusCode::ContractValidationFailure,
            ffi::EVMC_ARGUMENT_OUT_OF_RANGE => StatusCode::ArgumentOutOfRange,
            ffi::EVMC_WASM_UNREACHABLE_INSTRUCTION => StatusCode::WasmUnreachableInstruction,
            ffi::EVMC_WASM_TRAP => StatusCode::WasmTrap,
            ffi::EVMC_INSUFFICIENT_BALANCE => StatusCode::InsufficientBalance,
            ffi::EVMC_INTERNAL_ERROR => StatusCode::InternalError,
            ffi::EVMC_REJECTED => StatusCode::Rejected,
            ffi::EVMC_OUT_OF_MEMORY => StatusCode::OutOfMemory,
            other => return Err(UnknownValue { kind: "status code", value: other as i64 }),
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "success",
            StatusCode::Failure => "failure",
            StatusCode::Revert => "revert",
            StatusCode::OutOfGas => "out of gas",
            StatusCode::InvalidInstruction => "invalid instruction",
            StatusCode::UndefinedInstruction => "undefined instruction",
            StatusCode::StackOverflow => "stack overflow",
            StatusCode::StackUnderflow => "stack underflow",
            StatusCode::BadJumpDestination => "bad jump destination",
            StatusCode::InvalidMemoryAccess => "invalid memory access",
            StatusCode::CallDepthExceeded => "call depth exceeded",
            StatusCode::StaticModeViolation => "static mode violation",
            StatusCode::PrecompileFailure => "precompile failure",
            StatusCode::ContractValidationFailure => "contract validation failure",
            StatusCode::ArgumentOutOfRange => "argument out of range",
            StatusCode::WasmUnreachableInstruction => "wasm unreachable instruction",
            StatusCode::WasmTrap => "wasm trap",
            StatusCode::InsufficientBalance => "insufficient balance",
            StatusCode::InternalError => "internal error",
            StatusCode::Rejected => "rejected",
            StatusCode::OutOfMemory => "out of memory",
        };
        f.write_str(name)
    }
}

/// The kind of call-like instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum CallKind {
    /// Ordinary call.
    #[default]
    Call = ffi::EVMC_CALL,
    /// Delegated call: code of `code_address` runs in the context of the recipient.
    DelegateCall = ffi::EVMC_DELEGATECALL,
    /// Code call: like a call, but with the code of `code_address`.
    CallCode = ffi::EVMC_CALLCODE,
    /// Contract creation.
    Create = ffi::EVMC_CREATE,
    /// Contract creation with a salt.
    Create2 = ffi::EVMC_CREATE2,
}

impl CallKind {
    /// Returns true for both create kinds.
    pub const fn is_create(self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

impl TryFrom<ffi::evmc_call_kind> for CallKind {
    type Error = UnknownValue;

    fn try_from(value: ffi::evmc_call_kind) -> Result<Self, Self::Error> {
        Ok(match value {
            ffi::EVMC_CALL => CallKind::Call,
            ffi::EVMC_DELEGATECALL => CallKind::DelegateCall,
            ffi::EVMC_CALLCODE => CallKind::CallCode,
            ffi::EVMC_CREATE => CallKind::Create,
            ffi::EVMC_CREATE2 => CallKind::Create2,
            other => return Err(UnknownValue { kind: "call kind", value: other as i64 }),
        })
    }
}

/// Protocol rule-set revisions, in chronological order.
///
/// A revision is passed into every execution and never stored as instance state. Comparisons
/// follow activation order, so `revision >= Revision::Berlin` reads as "Berlin rules are active".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum Revision {
    /// Initial Ethereum release (July 2015)
    Frontier = ffi::EVMC_FRONTIER,
    /// First planned hard fork (March 2016)
    Homestead = ffi::EVMC_HOMESTEAD,
    /// EIP-150 gas repricing (October 2016)
    TangerineWhistle = ffi::EVMC_TANGERINE_WHISTLE,
    /// EIP-158 state clearing (November 2016)
    SpuriousDragon = ffi::EVMC_SPURIOUS_DRAGON,
    /// First of Metropolis series (October 2017)
    Byzantium = ffi::EVMC_BYZANTIUM,
    /// Second of Metropolis series (February 2019)
    Constantinople = ffi::EVMC_CONSTANTINOPLE,
    /// Constantinople without EIP-1283 (February 2019)
    Petersburg = ffi::EVMC_PETERSBURG,
    /// December 2019 fork
    Istanbul = ffi::EVMC_ISTANBUL,
    /// April 2021 fork, introduces cold/warm access pricing
    Berlin = ffi::EVMC_BERLIN,
    /// August 2021 fork
    London = ffi::EVMC_LONDON,
    /// The Merge (September 2022)
    Paris = ffi::EVMC_PARIS,
    /// April 2023 fork
    Shanghai = ffi::EVMC_SHANGHAI,
    /// March 2024 fork
    Cancun = ffi::EVMC_CANCUN,
    /// May 2025 fork
    Prague = ffi::EVMC_PRAGUE,
    /// Next fork, specification not final
    Osaka = ffi::EVMC_OSAKA,
}

impl Revision {
    /// The maximum revision known to this ABI.
    pub const MAX: Revision = Revision::Osaka;

    /// The latest revision with a finalized specification.
    pub const LATEST_STABLE: Revision = Revision::Cancun;

    /// Every revision, in activation order.
    pub const ALL: [Revision; 15] = [
        Revision::Frontier,
        Revision::Homestead,
        Revision::TangerineWhistle,
        Revision::SpuriousDragon,
        Revision::Byzantium,
        Revision::Constantinople,
        Revision::Petersburg,
        Revision::Istanbul,
        Revision::Berlin,
        Revision::London,
        Revision::Paris,
        Revision::Shanghai,
        Revision::Cancun,
        Revision::Prague,
        Revision::Osaka,
    ];

    /// Returns true if the rules of `other` are active at `self`.
    #[inline]
    pub fn is_active(self, other: Revision) -> bool {
        self >= other
    }

    /// Returns the value on the wire.
    pub const fn to_raw(self) -> ffi::evmc_revision {
        self as ffi::evmc_revision
    }

    /// The lowercase name of the revision, e.g. `"tangerine_whistle"`.
    pub const fn name(self) -> &'static str {
        match self {
            Revision::Frontier => "frontier",
            Revision::Homestead => "homestead",
            Revision::TangerineWhistle => "tangerine_whistle",
            Revision::SpuriousDragon => "spurious_dragon",
            Revision::Byzantium => "byzantium",
            Revision::Constantinople => "constantinople",
            Revision::Petersburg => "petersburg",
            Revision::Istanbul => "istanbul",
            Revision::Berlin => "berlin",
            Revision::London => "london",
            Revision::Paris => "paris",
            Revision::Shanghai => "shanghai",
            Revision::Cancun => "cancun",
            Revision::Prague => "prague",
            Revision::Osaka => "osaka",
        }
    }
}

impl Default for Revision {
    fn default() -> Self {
        Revision::LATEST_STABLE
    }
}

impl TryFrom<ffi::evmc_revision> for Revision {
    type Error = UnknownValue;

    fn try_from(value: ffi::evmc_revision) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Revision::ALL.get(index).copied())
            .ok_or(UnknownValue { kind: "revision", value: value as i64 })
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Revision {
    type Err = UnknownRevisionName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Revision::ALL
            .into_iter()
            .find(|revision| revision.name() == normalized)
            .ok_or_else(|| UnknownRevisionName(s.to_string()))
    }
}

/// Returned when parsing a revision from an unknown name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown revision name: '{0}'")]
pub struct UnknownRevisionName(pub String);

/// The bit-set of code dialects a VM instance supports. Queried once per instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(ffi::evmc_capabilities_flagset);

impl Capabilities {
    /// No capabilities.
    pub const NONE: Capabilities = Capabilities(0);
    /// Ordinary EVM bytecode.
    pub const EVM1: Capabilities = Capabilities(ffi::EVMC_CAPABILITY_EVM1);
    /// ewasm bytecode.
    pub const EWASM: Capabilities = Capabilities(ffi::EVMC_CAPABILITY_EWASM);
    /// Precompiled contracts, addressed by destination.
    pub const PRECOMPILES: Capabilities = Capabilities(ffi::EVMC_CAPABILITY_PRECOMPILES);

    /// Builds a set from raw bits. Unknown bits are kept so they survive a round trip.
    pub const fn from_bits_retain(bits: ffi::evmc_capabilities_flagset) -> Self {
        Capabilities(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> ffi::evmc_capabilities_flagset {
        self.0
    }

    /// Returns true if every capability in `other` is also in `self`.
    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no capability is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Self) -> Self::Output {
        Capabilities(self.0 | rhs.0)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Capabilities::EVM1) {
            names.push("EVM1");
        }
        if self.contains(Capabilities::EWASM) {
            names.push("EWASM");
        }
        if self.contains(Capabilities::PRECOMPILES) {
            names.push("PRECOMPILES");
        }
        write!(f, "Capabilities({})", names.join(" | "))
    }
}

/// The effect of an attempt to modify a contract storage item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StorageStatus {
    /// Assigned without affecting the cost structure.
    Assigned = ffi::EVMC_STORAGE_ASSIGNED,
    /// Clean zero changed to nonzero.
    Added = ffi::EVMC_STORAGE_ADDED,
    /// Clean nonzero changed to zero.
    Deleted = ffi::EVMC_STORAGE_DELETED,
    /// Clean nonzero changed to another nonzero.
    Modified = ffi::EVMC_STORAGE_MODIFIED,
    /// Dirty zero changed to a nonzero other than the original.
    DeletedAdded = ffi::EVMC_STORAGE_DELETED_ADDED,
    /// Dirty nonzero changed to zero, original nonzero.
    ModifiedDeleted = ffi::EVMC_STORAGE_MODIFIED_DELETED,
    /// Dirty zero changed back to the original.
    DeletedRestored = ffi::EVMC_STORAGE_DELETED_RESTORED,
    /// Dirty nonzero changed back to the original zero.
    AddedDeleted = ffi::EVMC_STORAGE_ADDED_DELETED,
    /// Dirty nonzero changed back to the original nonzero.
    ModifiedRestored = ffi::EVMC_STORAGE_MODIFIED_RESTORED,
}

impl TryFrom<ffi::evmc_storage_status> for StorageStatus {
    type Error = UnknownValue;

    fn try_from(value: ffi::evmc_storage_status) -> Result<Self, Self::Error> {
        Ok(match value {
            ffi::EVMC_STORAGE_ASSIGNED => StorageStatus::Assigned,
            ffi::EVMC_STORAGE_ADDED => StorageStatus::Added,
            ffi::EVMC_STORAGE_DELETED => StorageStatus::Deleted,
            ffi::EVMC_STORAGE_MODIFIED => StorageStatus::Modified,
            ffi::EVMC_STORAGE_DELETED_ADDED => StorageStatus::DeletedAdded,
            ffi::EVMC_STORAGE_MODIFIED_DELETED => StorageStatus::ModifiedDeleted,
            ffi::EVMC_STORAGE_DELETED_RESTORED => StorageStatus::DeletedRestored,
            ffi::EVMC_STORAGE_ADDED_DELETED => StorageStatus::AddedDeleted,
            ffi::EVMC_STORAGE_MODIFIED_RESTORED => StorageStatus::ModifiedRestored,
            other => return Err(UnknownValue { kind: "storage status", value: other as i64 }),
        })
    }
}

/// Cold/warm classification of an account or storage access (EIP-2929).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AccessStatus {
    /// First access in the transaction.
    Cold = ffi::EVMC_ACCESS_COLD,
    /// Accessed before.
    Warm = ffi::EVMC_ACCESS_WARM,
}

impl TryFrom<ffi::evmc_access_status> for AccessStatus {
    type Error = UnknownValue;

    fn try_from(value: ffi::evmc_access_status) -> Result<Self, Self::Error> {
        match value {
            ffi::EVMC_ACCESS_COLD => Ok(AccessStatus::Cold),
            ffi::EVMC_ACCESS_WARM => Ok(AccessStatus::Warm),
            other => Err(UnknownValue { kind: "access status", value: other as i64 }),
        }
    }
}

/// The ways `set_option` can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SetOptionError {
    /// The VM does not accept any options.
    #[error("the VM does not support any options")]
    NotSupported,
    /// The option name is not known to the VM.
    #[error("unknown option name")]
    InvalidName,
    /// The value is not valid for this option.
    #[error("invalid option value")]
    InvalidValue,
}

impl SetOptionError {
    /// Returns the value on the wire. [`SetOptionError::NotSupported`] has no wire value: it is
    /// expressed by a null `set_option` entry, and maps to an invalid name.
    pub const fn to_raw(self) -> ffi::evmc_set_option_result {
        match self {
            SetOptionError::NotSupported | SetOptionError::InvalidName => {
                ffi::EVMC_SET_OPTION_INVALID_NAME
            }
            SetOptionError::InvalidValue => ffi::EVMC_SET_OPTION_INVALID_VALUE,
        }
    }
}
