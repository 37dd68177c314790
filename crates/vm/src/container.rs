//! The VM side of the connector: a Rust VM wrapped in a C-compatible instance.

use std::{
    ffi::CStr,
    os::raw::c_char,
    panic::{catch_unwind, AssertUnwindSafe},
};

use evmc_sys as ffi;
use tracing::{debug, error, warn};

use crate::{
    context::ExecutionContext,
    message::{borrowed_slice, ExecutionMessage},
    result::ExecutionResult,
    types::{Capabilities, Revision, SetOptionError, StatusCode},
};

/// A VM implementation that can be exposed over the C ABI with [`declare_vm!`](crate::declare_vm).
///
/// `execute` takes `&self` and may run concurrently on several threads. `set_option` takes
/// `&mut self` and only happens before any execution starts.
pub trait EvmcVm: Send + Sync + Sized {
    /// Whether the instance exposes a `set_option` entry point at all.
    const SUPPORTS_OPTIONS: bool = false;

    /// Creates the VM.
    fn init() -> Self;

    /// The code dialects this VM accepts. Queried once per instance by hosts.
    fn capabilities(&self) -> Capabilities;

    /// Executes `code` for `message` under the rules of `revision`.
    ///
    /// `context` is `None` when the host did not provide a callback table.
    fn execute(
        &self,
        revision: Revision,
        code: &[u8],
        message: &ExecutionMessage<'_>,
        context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult;

    /// Applies one option. Only reachable when [`EvmcVm::SUPPORTS_OPTIONS`] is true.
    fn set_option(&mut self, _name: &str, _value: &str) -> Result<(), SetOptionError> {
        Err(SetOptionError::InvalidName)
    }
}

/// A VM instance: the wire header followed by the Rust VM.
///
/// The header is the first field, so a pointer to the container is also a valid pointer to an
/// `evmc_vm`.
#[repr(C)]
pub struct EvmcContainer<T: EvmcVm> {
    instance: ffi::evmc_vm,
    vm: T,
}

impl<T: EvmcVm> EvmcContainer<T> {
    /// Allocates a new instance and hands it over as a raw pointer. Ownership passes to the
    /// caller, who frees it through the instance's `destroy` entry.
    ///
    /// `name` and `version` must be null-terminated.
    pub fn new_raw(name: &'static str, version: &'static str) -> *mut ffi::evmc_vm {
        let container = Box::new(EvmcContainer {
            instance: ffi::evmc_vm {
                abi_version: ffi::EVMC_ABI_VERSION,
                name: null_terminated(name),
                version: null_terminated(version),
                destroy: Some(destroy::<T>),
                execute: Some(execute::<T>),
                get_capabilities: Some(get_capabilities::<T>),
                set_option: if T::SUPPORTS_OPTIONS { Some(set_option::<T>) } else { None },
            },
            vm: T::init(),
        });
        debug!("created VM instance '{}'", name.trim_end_matches('\0'));

        Box::into_raw(container) as *mut ffi::evmc_vm
    }

    /// The wrapped VM.
    pub fn vm(&self) -> &T {
        &self.vm
    }

    /// # Safety
    ///
    /// `instance` must have been returned by [`EvmcContainer::new_raw`] for the same `T` and
    /// not destroyed yet.
    unsafe fn from_instance<'a>(instance: *mut ffi::evmc_vm) -> &'a Self {
        &*(instance as *const Self)
    }
}

impl<T: EvmcVm + std::fmt::Debug> std::fmt::Debug for EvmcContainer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmcContainer").field("vm", &self.vm).finish()
    }
}

fn null_terminated(s: &'static str) -> *const c_char {
    debug_assert!(s.ends_with('\0'), "VM name and version must be null-terminated");
    s.as_ptr() as *const c_char
}

unsafe extern "C" fn destroy<T: EvmcVm>(instance: *mut ffi::evmc_vm) {
    if instance.is_null() {
        return;
    }
    debug!("destroying VM instance");
    drop(Box::from_raw(instance as *mut EvmcContainer<T>));
}

unsafe extern "C" fn get_capabilities<T: EvmcVm>(
    instance: *mut ffi::evmc_vm,
) -> ffi::evmc_capabilities_flagset {
    if instance.is_null() {
        return 0;
    }
    EvmcContainer::<T>::from_instance(instance).vm.capabilities().bits()
}

unsafe extern "C" fn set_option<T: EvmcVm>(
    instance: *mut ffi::evmc_vm,
    name: *const c_char,
    value: *const c_char,
) -> ffi::evmc_set_option_result {
    if instance.is_null() || name.is_null() {
        return ffi::EVMC_SET_OPTION_INVALID_NAME;
    }
    if value.is_null() {
        return ffi::EVMC_SET_OPTION_INVALID_VALUE;
    }
    let Ok(name) = CStr::from_ptr(name).to_str() else {
        return ffi::EVMC_SET_OPTION_INVALID_NAME;
    };
    let Ok(value) = CStr::from_ptr(value).to_str() else {
        return ffi::EVMC_SET_OPTION_INVALID_VALUE;
    };

    let container = &mut *(instance as *mut EvmcContainer<T>);
    match container.vm.set_option(name, value) {
        Ok(()) => ffi::EVMC_SET_OPTION_SUCCESS,
        Err(e) => {
            debug!("set_option({}, {}) failed: {}", name, value, e);
            e.to_raw()
        }
    }
}

unsafe extern "C" fn execute<T: EvmcVm>(
    instance: *mut ffi::evmc_vm,
    host: *const ffi::evmc_host_interface,
    context: *mut ffi::evmc_host_context,
    revision: ffi::evmc_revision,
    message: *const ffi::evmc_message,
    code: *const u8,
    code_size: usize,
) -> ffi::evmc_result {
    if instance.is_null() || message.is_null() {
        error!("execute called without an instance or a message");
        return ExecutionResult::error(StatusCode::InternalError).into_ffi();
    }

    let Ok(revision) = Revision::try_from(revision) else {
        warn!("rejecting execution under unknown revision {}", revision);
        return ExecutionResult::error(StatusCode::Rejected).into_ffi();
    };
    let message = match ExecutionMessage::from_ffi(&*message) {
        Ok(message) => message,
        Err(e) => {
            warn!("rejecting malformed message: {}", e);
            return ExecutionResult::error(StatusCode::InternalError).into_ffi();
        }
    };
    let mut execution_context = match host.as_ref() {
        Some(interface) => match ExecutionContext::new(interface, context) {
            Ok(execution_context) => Some(execution_context),
            Err(e) => {
                warn!("{}", e);
                return ExecutionResult::error(StatusCode::InternalError).into_ffi();
            }
        },
        None => None,
    };
    let code = borrowed_slice(code, code_size);
    let container = EvmcContainer::<T>::from_instance(instance);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        container.vm.execute(revision, code, &message, execution_context.as_mut())
    }));

    match outcome {
        Ok(result) => result.into_ffi(),
        Err(_) => {
            error!("VM panicked during execution, reporting an internal error");
            ExecutionResult::error(StatusCode::InternalError).into_ffi()
        }
    }
}
