use derive_builder::Builder;
use evmc_sys as ffi;

use crate::types::{Address, Bytes32, CallKind, UnknownValue, Uint256, STATIC_FLAG};

/// A message that could not be accepted from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// The call kind is not a known value.
    #[error(transparent)]
    UnknownCallKind(#[from] UnknownValue),
    /// Gas must never be negative.
    #[error("negative gas: {0}")]
    NegativeGas(i64),
    /// Depth must never be negative.
    #[error("negative call depth: {0}")]
    NegativeDepth(i32),
    /// The input pointer is null while its size is not zero.
    #[error("null input data with size {0}")]
    NullInput(usize),
    /// The code pointer is null while its size is not zero.
    #[error("null code with size {0}")]
    NullCode(usize),
}

/// One call or create request, borrowing its input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ExecutionMessage<'a> {
    kind: CallKind,
    flags: u32,
    depth: i32,
    gas: i64,
    recipient: Address,
    sender: Address,
    input: &'a [u8],
    value: Uint256,
    create2_salt: Bytes32,
    /// Defaults to the recipient when not set.
    #[builder(setter(strip_option))]
    code_address: Option<Address>,
    /// Code supplied with the message, empty when the VM should be handed code separately.
    code: &'a [u8],
}

impl<'a> ExecutionMessageBuilder<'a> {
    /// Creates a builder for an ordinary, zero-depth call with no gas, no input and no value.
    pub fn new() -> Self {
        Self {
            kind: Some(CallKind::Call),
            flags: Some(0),
            depth: Some(0),
            gas: Some(0),
            recipient: Some(Address::ZERO),
            sender: Some(Address::ZERO),
            input: Some(&[]),
            value: Some(Uint256::ZERO),
            create2_salt: Some(Bytes32::ZERO),
            code_address: Some(None),
            code: Some(&[]),
        }
    }

    /// Sets the static flag.
    pub fn is_static(&mut self, is_static: bool) -> &mut Self {
        let flags = self.flags.unwrap_or(0);
        self.flags = Some(if is_static { flags | STATIC_FLAG } else { flags & !STATIC_FLAG });
        self
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(gas) = self.gas {
            if gas < 0 {
                return Err(MessageError::NegativeGas(gas).to_string());
            }
        }
        if let Some(depth) = self.depth {
            if depth < 0 {
                return Err(MessageError::NegativeDepth(depth).to_string());
            }
        }
        Ok(())
    }
}

impl<'a> ExecutionMessage<'a> {
    /// Reads a message from its wire form.
    ///
    /// # Safety
    ///
    /// `message.input_data` must either be null or point to `message.input_size` readable bytes
    /// that stay valid for `'a`. The same holds for `message.code` and `message.code_size`.
    pub unsafe fn from_ffi(message: &'a ffi::evmc_message) -> Result<Self, MessageError> {
        let kind = CallKind::try_from(message.kind)?;
        if message.gas < 0 {
            return Err(MessageError::NegativeGas(message.gas));
        }
        if message.depth < 0 {
            return Err(MessageError::NegativeDepth(message.depth));
        }
        if message.input_data.is_null() && message.input_size != 0 {
            return Err(MessageError::NullInput(message.input_size));
        }
        if message.code.is_null() && message.code_size != 0 {
            return Err(MessageError::NullCode(message.code_size));
        }

        Ok(ExecutionMessage {
            kind,
            flags: message.flags,
            depth: message.depth,
            gas: message.gas,
            recipient: message.recipient,
            sender: message.sender,
            input: borrowed_slice(message.input_data, message.input_size),
            value: message.value,
            create2_salt: message.create2_salt,
            code_address: Some(message.code_address),
            code: borrowed_slice(message.code, message.code_size),
        })
    }

    /// Writes the message in its wire form. The input and code pointers are null iff the
    /// matching slice is empty.
    ///
    /// The returned value borrows the input and code bytes of `self` without a lifetime: it
    /// must not outlive `self`.
    pub fn to_ffi(&self) -> ffi::evmc_message {
        ffi::evmc_message {
            kind: self.kind as ffi::evmc_call_kind,
            flags: self.flags,
            depth: self.depth,
            gas: self.gas,
            recipient: self.recipient,
            sender: self.sender,
            input_data: if self.input.is_empty() { std::ptr::null() } else { self.input.as_ptr() },
            input_size: self.input.len(),
            value: self.value,
            create2_salt: self.create2_salt,
            code_address: self.code_address(),
            code: if self.code.is_empty() { std::ptr::null() } else { self.code.as_ptr() },
            code_size: self.code.len(),
        }
    }

    /// Derives the message of a nested call made by the code running under `self`.
    ///
    /// The child is sent by the current recipient, runs exactly one level deeper and inherits
    /// the static flag.
    pub fn nested<'b>(
        &self,
        kind: CallKind,
        recipient: Address,
        input: &'b [u8],
        gas: i64,
    ) -> ExecutionMessage<'b> {
        ExecutionMessage {
            kind,
            flags: self.flags & STATIC_FLAG,
            depth: self.depth.saturating_add(1),
            gas: gas.max(0),
            recipient,
            sender: self.recipient,
            input,
            value: Uint256::ZERO,
            create2_salt: Bytes32::ZERO,
            code_address: None,
            code: &[],
        }
    }

    /// Returns the message with the value transfer replaced.
    pub fn with_value(mut self, value: Uint256) -> Self {
        self.value = value;
        self
    }

    /// Returns the message with a distinct code address.
    pub fn with_code_address(mut self, code_address: Address) -> Self {
        self.code_address = Some(code_address);
        self
    }

    /// Returns the message with the create2 salt replaced.
    pub fn with_salt(mut self, salt: Bytes32) -> Self {
        self.create2_salt = salt;
        self
    }

    /// The kind of call.
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// The raw flags.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Returns true if state changes are forbidden.
    pub fn is_static(&self) -> bool {
        self.flags & STATIC_FLAG != 0
    }

    /// The call depth, zero for the transaction's own call.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// The gas available to the execution.
    pub fn gas(&self) -> i64 {
        self.gas
    }

    /// The account whose storage and balance the code acts on.
    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    /// The caller.
    pub fn sender(&self) -> &Address {
        &self.sender
    }

    /// The call data.
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// The value transferred with the call.
    pub fn value(&self) -> &Uint256 {
        &self.value
    }

    /// The salt of a CREATE2 call.
    pub fn create2_salt(&self) -> &Bytes32 {
        &self.create2_salt
    }

    /// The address whose code runs. Equal to the recipient unless set explicitly.
    pub fn code_address(&self) -> Address {
        self.code_address.unwrap_or(self.recipient)
    }

    /// The code carried by the message itself. Empty unless the caller supplied it.
    pub fn code(&self) -> &'a [u8] {
        self.code
    }
}

/// Builds a slice from a pointer and a size that follow the "null iff empty" convention.
///
/// # Safety
///
/// If `data` is not null it must point to `size` readable, initialized values valid for `'a`.
pub(crate) unsafe fn borrowed_slice<'a, T>(data: *const T, size: usize) -> &'a [T] {
    if data.is_null() || size == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(data, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let message = ExecutionMessageBuilder::new().gas(100).build().expect("failed to build");
        assert_eq!(message.kind(), CallKind::Call);
        assert_eq!(message.depth(), 0);
        assert_eq!(message.gas(), 100);
        assert!(message.input().is_empty());
        assert!(!message.is_static());
    }

    #[test]
    fn test_builder_rejects_negative_gas() {
        let result = ExecutionMessageBuilder::new().gas(-1).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_negative_depth() {
        let result = ExecutionMessageBuilder::new().depth(-3).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_static_flag() {
        let message =
            ExecutionMessageBuilder::new().is_static(true).build().expect("failed to build");
        assert!(message.is_static());
        assert_eq!(message.flags(), STATIC_FLAG);
    }

    #[test]
    fn test_to_ffi_empty_input_is_null() {
        let message = ExecutionMessageBuilder::new().build().expect("failed to build");
        let raw = message.to_ffi();
        assert!(raw.input_data.is_null());
        assert_eq!(raw.input_size, 0);
    }

    #[test]
    fn test_to_ffi_code_address_defaults_to_recipient() {
        let recipient = Address::from_low_u64_be(0xbeef);
        let message = ExecutionMessageBuilder::new()
            .recipient(recipient)
            .build()
            .expect("failed to build");
        assert_eq!(message.to_ffi().code_address, recipient);

        let code = Address::from_low_u64_be(0xc0de);
        let message = message.with_code_address(code);
        assert_eq!(message.to_ffi().code_address, code);
        assert_eq!(message.to_ffi().recipient, recipient);
    }

    #[test]
    fn test_from_ffi_roundtrip() {
        let input = [1u8, 2, 3];
        let message = ExecutionMessageBuilder::new()
            .kind(CallKind::DelegateCall)
            .depth(3)
            .gas(7)
            .input(&input)
            .build()
            .expect("failed to build");
        let raw = message.to_ffi();

        let decoded = unsafe { ExecutionMessage::from_ffi(&raw) }.expect("failed to decode");
        assert_eq!(decoded.kind(), CallKind::DelegateCall);
        assert_eq!(decoded.depth(), 3);
        assert_eq!(decoded.input(), &input);
        assert!(decoded.code().is_empty());
    }

    #[test]
    fn test_from_ffi_rejects_malformed_messages() {
        let raw = ffi::evmc_message { kind: 9, ..Default::default() };
        assert!(matches!(
            unsafe { ExecutionMessage::from_ffi(&raw) },
            Err(MessageError::UnknownCallKind(_))
        ));

        let raw = ffi::evmc_message { gas: -5, ..Default::default() };
        assert_eq!(unsafe { ExecutionMessage::from_ffi(&raw) }, Err(MessageError::NegativeGas(-5)));

        let raw = ffi::evmc_message { input_size: 4, ..Default::default() };
        assert_eq!(unsafe { ExecutionMessage::from_ffi(&raw) }, Err(MessageError::NullInput(4)));

        let raw = ffi::evmc_message { code_size: 2, ..Default::default() };
        assert_eq!(unsafe { ExecutionMessage::from_ffi(&raw) }, Err(MessageError::NullCode(2)));
    }

    #[test]
    fn test_code_crosses_the_boundary() {
        let code = [0x60u8, 0x00, 0x00];
        let message = ExecutionMessageBuilder::new().code(&code).build().expect("failed to build");
        let raw = message.to_ffi();
        assert_eq!(raw.code, code.as_ptr());
        assert_eq!(raw.code_size, 3);

        let decoded = unsafe { ExecutionMessage::from_ffi(&raw) }.expect("failed to decode");
        assert_eq!(decoded.code(), &code);

        let raw = ExecutionMessageBuilder::new().build().expect("failed to build").to_ffi();
        assert!(raw.code.is_null());
        assert_eq!(raw.code_size, 0);
        assert!(decoded.nested(CallKind::Call, Address::ZERO, &[], 0).code().is_empty());
    }

    #[test]
    fn test_nested_increments_depth_by_one() {
        let recipient = Address::from_low_u64_be(1);
        let parent = ExecutionMessageBuilder::new()
            .depth(4)
            .recipient(recipient)
            .is_static(true)
            .build()
            .expect("failed to build");

        let child = parent.nested(CallKind::Call, Address::from_low_u64_be(2), &[], 50);
        assert_eq!(child.depth(), 5);
        assert_eq!(child.sender(), &recipient);
        assert!(child.is_static());
        assert_eq!(child.gas(), 50);
    }
}
