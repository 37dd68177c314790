use tracing::debug;

use crate::{
    context::ExecutionContext,
    declare_vm,
    host::Host,
    message::ExecutionMessage,
    negotiate::{is_precompile_address, DEFAULT_PRECOMPILE_MAX_ADDRESS},
    result::{ExecutionResult, Output},
    types::{Bytes32, CallKind, Capabilities, Revision, SetOptionError, StatusCode},
    EvmcVm,
};

/// The instruction set of [`ScriptVm`]. Every instruction is one byte and costs
/// [`ScriptVm::gas_per_op`] gas.
pub mod opcodes {
    /// Stops with success, keeping the remaining gas.
    pub const STOP: u8 = 0x00;
    /// Appends the block number of the transaction context, 8 bytes big-endian.
    pub const BLOCK_NUMBER: u8 = 0x01;
    /// Calls the current recipient again if the first input byte is non-zero, passing that byte
    /// minus one as input and half of the remaining gas. Appends the child's status byte and
    /// output.
    pub const CALL: u8 = 0x02;
    /// Appends the message depth, 4 bytes big-endian.
    pub const DEPTH: u8 = 0x03;
    /// Reverts with the remaining gas and the output so far.
    pub const REVERT: u8 = 0x04;
    /// Fails.
    pub const FAIL: u8 = 0x05;
    /// Panics.
    pub const PANIC: u8 = 0x06;
    /// Writes 1 to slot 0 of the recipient and appends the storage status byte.
    pub const SSTORE: u8 = 0x07;
    /// Emits a log with the output so far as data and the depth as the only topic.
    pub const LOG: u8 = 0x08;
    /// Appends the revision byte.
    pub const REVISION: u8 = 0x09;
    /// Appends every blob hash of the transaction.
    pub const BLOB_HASHES: u8 = 0x0a;
    /// Stops with success, refunding the remaining gas.
    pub const REFUND: u8 = 0x0b;
    /// The designated invalid instruction.
    pub const INVALID: u8 = 0xfe;
}

/// A small VM for driving the host callbacks from tests.
///
/// Without code, a call to a precompile address echoes its input. Supports the options
/// `verbose` (`true`/`false`), `gas-per-op` (an integer) and `min-revision` (a revision name;
/// executions under older revisions are rejected).
#[derive(Debug, Clone)]
pub struct ScriptVm {
    verbose: bool,
    gas_per_op: i64,
    min_revision: Revision,
}

impl ScriptVm {
    /// The gas every instruction costs.
    pub fn gas_per_op(&self) -> i64 {
        self.gas_per_op
    }

    /// The oldest revision that is executed.
    pub fn min_revision(&self) -> Revision {
        self.min_revision
    }

    fn run(
        &self,
        revision: Revision,
        code: &[u8],
        message: &ExecutionMessage<'_>,
        mut context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult {
        let mut gas = message.gas();
        let mut output = Vec::new();

        for op in code {
            if gas < self.gas_per_op {
                return ExecutionResult::error(StatusCode::OutOfGas);
            }
            gas -= self.gas_per_op;
            if self.verbose {
                debug!("script op 0x{:02x} at depth {}, {} gas left", op, message.depth(), gas);
            }

            match *op {
                opcodes::STOP => return ExecutionResult::success(gas, output),
                opcodes::REFUND => {
                    return ExecutionResult::success(gas, output).with_gas_refund(gas)
                }
                opcodes::DEPTH => output.extend_from_slice(&message.depth().to_be_bytes()),
                opcodes::REVISION => output.push(revision.to_raw() as u8),
                opcodes::REVERT => return ExecutionResult::revert(gas, output),
                opcodes::FAIL => return ExecutionResult::failure(),
                opcodes::PANIC => panic!("script VM asked to panic"),
                opcodes::INVALID => return ExecutionResult::error(StatusCode::InvalidInstruction),
                opcodes::BLOCK_NUMBER |
                opcodes::BLOB_HASHES |
                opcodes::CALL |
                opcodes::SSTORE |
                opcodes::LOG => {
                    let Some(host) = context.as_deref_mut() else {
                        return ExecutionResult::error(StatusCode::InternalError);
                    };
                    match *op {
                        opcodes::BLOCK_NUMBER => output
                            .extend_from_slice(&host.tx_context().block_number.to_be_bytes()),
                        opcodes::BLOB_HASHES => {
                            for hash in host.blob_hashes() {
                                output.extend_from_slice(&hash.bytes);
                            }
                        }
                        opcodes::CALL => {
                            let remaining = message.input().first().copied().unwrap_or(0);
                            if remaining == 0 {
                                continue;
                            }
                            let input = [remaining - 1];
                            let child_gas = gas / 2;
                            let child = message.nested(
                                CallKind::Call,
                                *message.recipient(),
                                &input,
                                child_gas,
                            );
                            let result = host.call(&child);
                            gas -= child_gas - result.gas_left();
                            output.push(result.status_code().to_raw() as u8);
                            output.extend_from_slice(result.output().as_slice());
                        }
                        opcodes::SSTORE => {
                            let status = host.set_storage(
                                message.recipient(),
                                &Bytes32::ZERO,
                                &Bytes32::from_u64(1),
                            );
                            output.push(status as u8);
                        }
                        _ => {
                            let topic = Bytes32::from_u64(message.depth() as u64);
                            host.emit_log(message.recipient(), &output, &[topic]);
                        }
                    }
                }
                _ => return ExecutionResult::error(StatusCode::UndefinedInstruction),
            }
        }

        ExecutionResult::success(gas, output)
    }
}

impl EvmcVm for ScriptVm {
    const SUPPORTS_OPTIONS: bool = true;

    fn init() -> Self {
        ScriptVm { verbose: false, gas_per_op: 1, min_revision: Revision::Frontier }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::EVM1 | Capabilities::PRECOMPILES
    }

    fn execute(
        &self,
        revision: Revision,
        code: &[u8],
        message: &ExecutionMessage<'_>,
        context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult {
        if revision < self.min_revision {
            return ExecutionResult::error(StatusCode::Rejected);
        }
        if code.is_empty() &&
            is_precompile_address(&message.code_address(), DEFAULT_PRECOMPILE_MAX_ADDRESS)
        {
            return ExecutionResult::success(message.gas(), message.input().to_vec());
        }
        self.run(revision, code, message, context)
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), SetOptionError> {
        match name {
            "verbose" => {
                self.verbose = value.parse().map_err(|_| SetOptionError::InvalidValue)?;
            }
            "gas-per-op" => {
                self.gas_per_op = value
                    .parse()
                    .ok()
                    .filter(|gas: &i64| *gas >= 0)
                    .ok_or(SetOptionError::InvalidValue)?;
            }
            "min-revision" => {
                self.min_revision = value.parse().map_err(|_| SetOptionError::InvalidValue)?;
            }
            _ => return Err(SetOptionError::InvalidName),
        }
        Ok(())
    }
}

/// A VM without options that accepts only ewasm code and always answers with the same static
/// output.
#[derive(Debug, Clone, Copy)]
pub struct StaticVm;

impl StaticVm {
    /// The output of every execution.
    pub const OUTPUT: &'static [u8] = b"static";
}

impl EvmcVm for StaticVm {
    fn init() -> Self {
        StaticVm
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::EWASM
    }

    fn execute(
        &self,
        _revision: Revision,
        _code: &[u8],
        message: &ExecutionMessage<'_>,
        _context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult {
        ExecutionResult::success(message.gas(), Output::Static(Self::OUTPUT))
    }
}

declare_vm!(ScriptVm, "script", "0.1.0");
declare_vm!(StaticVm, "static_script", "0.1.0");
