use std::fmt;

use evmc_sys as ffi;
use tracing::warn;

use crate::{
    message::borrowed_slice,
    types::{Address, StatusCode},
};

/// The output bytes of an execution, tagged with who is responsible for freeing them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Output {
    /// No output. Crosses the boundary as a null pointer with size 0.
    #[default]
    Empty,
    /// Static memory. Crosses the boundary without a release function.
    Static(&'static [u8]),
    /// Heap memory owned by the result. Crosses the boundary with a release function that frees
    /// it.
    Owned(Box<[u8]>),
}

impl Output {
    /// The output bytes, whoever owns them.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Output::Empty => &[],
            Output::Static(bytes) => bytes,
            Output::Owned(bytes) => bytes,
        }
    }

    /// The number of output bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if there is no output.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<Vec<u8>> for Output {
    fn from(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            Output::Empty
        } else {
            Output::Owned(bytes.into_boxed_slice())
        }
    }
}

impl From<&'static [u8]> for Output {
    fn from(bytes: &'static [u8]) -> Self {
        if bytes.is_empty() {
            Output::Empty
        } else {
            Output::Static(bytes)
        }
    }
}

/// The outcome of an execution, as seen from Rust.
///
/// Every constructor upholds the gas invariant: `gas_left` is zero unless the status is
/// [`StatusCode::Success`] or [`StatusCode::Revert`], and `gas_refund` is zero unless the status
/// is [`StatusCode::Success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    status_code: StatusCode,
    gas_left: i64,
    gas_refund: i64,
    output: Output,
    create_address: Option<Address>,
}

impl ExecutionResult {
    /// Creates a result. `gas_left` is clamped to zero for statuses that do not keep gas, and
    /// for negative values.
    pub fn new(status_code: StatusCode, gas_left: i64, output: impl Into<Output>) -> Self {
        let gas_left = if status_code.keeps_gas() { gas_left.max(0) } else { 0 };
        ExecutionResult {
            status_code,
            gas_left,
            gas_refund: 0,
            output: output.into(),
            create_address: None,
        }
    }

    /// A successful result.
    pub fn success(gas_left: i64, output: impl Into<Output>) -> Self {
        Self::new(StatusCode::Success, gas_left, output)
    }

    /// A reverted result. The remaining gas is kept.
    pub fn revert(gas_left: i64, output: impl Into<Output>) -> Self {
        Self::new(StatusCode::Revert, gas_left, output)
    }

    /// A generic failure with no gas left and no output.
    pub fn failure() -> Self {
        Self::error(StatusCode::Failure)
    }

    /// A result with the given status, no gas left and no output.
    pub fn error(status_code: StatusCode) -> Self {
        Self::new(status_code, 0, Output::Empty)
    }

    /// Attaches a gas refund. Ignored unless the status is [`StatusCode::Success`].
    pub fn with_gas_refund(mut self, gas_refund: i64) -> Self {
        if self.status_code.is_success() {
            self.gas_refund = gas_refund;
        }
        self
    }

    /// Attaches the address of a created contract.
    pub fn with_create_address(mut self, address: Address) -> Self {
        self.create_address = Some(address);
        self
    }

    /// The execution status.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// The gas left after execution.
    pub fn gas_left(&self) -> i64 {
        self.gas_left
    }

    /// The gas refunded by execution.
    pub fn gas_refund(&self) -> i64 {
        self.gas_refund
    }

    /// The output of execution.
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// The created contract address, for a successful creation.
    pub fn create_address(&self) -> Option<&Address> {
        self.create_address.as_ref()
    }

    /// Moves the result into its wire form.
    ///
    /// [`Output::Owned`] buffers are handed over together with a release function that frees
    /// them; the receiver must call it exactly once.
    pub fn into_ffi(self) -> ffi::evmc_result {
        let mut raw = ffi::evmc_result {
            status_code: self.status_code.to_raw(),
            gas_left: self.gas_left,
            gas_refund: self.gas_refund,
            create_address: self.create_address.unwrap_or_default(),
            ..Default::default()
        };

        match self.output {
            Output::Empty => {}
            Output::Static(bytes) => {
                raw.output_data = bytes.as_ptr();
                raw.output_size = bytes.len();
            }
            Output::Owned(bytes) if bytes.is_empty() => {}
            Output::Owned(bytes) => {
                raw.output_size = bytes.len();
                raw.output_data = Box::into_raw(bytes) as *const u8;
                raw.release = Some(release_owned_output);
            }
        }

        raw
    }
}

/// Frees an output buffer handed over by [`ExecutionResult::into_ffi`].
extern "C" fn release_owned_output(result: *const ffi::evmc_result) {
    if result.is_null() {
        return;
    }
    // SAFETY: the pointer and size were produced by `Box::into_raw` on a boxed slice of exactly
    // `output_size` bytes, and the release contract guarantees this runs once per result.
    unsafe {
        let result = &*result;
        if !result.output_data.is_null() {
            let slice =
                std::ptr::slice_from_raw_parts_mut(result.output_data as *mut u8, result.output_size);
            drop(Box::from_raw(slice));
        }
    }
}

/// Owns a result that came in over the boundary and releases it exactly once, on drop.
pub struct RawResult {
    inner: ffi::evmc_result,
}

impl RawResult {
    /// Takes ownership of a result returned by the other side.
    ///
    /// # Safety
    ///
    /// `result` must be a result returned by an `execute` or `call` entry point that has not
    /// been released yet, and must not be released by anyone else.
    pub unsafe fn from_raw(result: ffi::evmc_result) -> Self {
        RawResult { inner: result }
    }

    /// The result in its wire form.
    pub fn as_raw(&self) -> &ffi::evmc_result {
        &self.inner
    }

    /// The raw status value, which may be unknown.
    pub fn status_code(&self) -> Result<StatusCode, crate::types::UnknownValue> {
        StatusCode::try_from(self.inner.status_code)
    }

    /// The output bytes, valid until the result is released.
    pub fn output(&self) -> &[u8] {
        // SAFETY: guaranteed by the contract of `from_raw` until `self` is dropped
        unsafe { borrowed_slice(self.inner.output_data, self.inner.output_size) }
    }

    /// Copies the result into an owned [`ExecutionResult`] and releases the original.
    ///
    /// Results that break the protocol are normalized: an unknown status becomes
    /// [`StatusCode::InternalError`], gas left with a status that does not keep gas is
    /// dropped and a refund is only kept on success.
    pub fn into_execution_result(self) -> ExecutionResult {
        let status_code = match self.status_code() {
            Ok(status_code) => status_code,
            Err(e) => {
                warn!("received result with {}, treating it as an internal error", e);
                StatusCode::InternalError
            }
        };
        if !status_code.keeps_gas() && self.inner.gas_left != 0 {
            warn!(
                "received {} result with {} gas left, forcing it to zero",
                status_code, self.inner.gas_left
            );
        }

        let mut result =
            ExecutionResult::new(status_code, self.inner.gas_left, self.output().to_vec())
                .with_gas_refund(self.inner.gas_refund);
        if status_code.is_success() && !self.inner.create_address.is_zero() {
            result = result.with_create_address(self.inner.create_address);
        }
        result
    }
}

impl Drop for RawResult {
    fn drop(&mut self) {
        if let Some(release) = self.inner.release {
            // SAFETY: released exactly once, here
            unsafe { release(&self.inner) };
        }
    }
}

impl fmt::Debug for RawResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResult")
            .field("status_code", &self.inner.status_code)
            .field("gas_left", &self.inner.gas_left)
            .field("gas_refund", &self.inner.gas_refund)
            .field("output_size", &self.inner.output_size)
            .field("has_release", &self.inner.release.is_some())
            .finish()
    }
}
