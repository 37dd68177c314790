use std::{any::Any, ffi::CStr, ffi::CString, fmt, ptr::NonNull};

use evmc_sys as ffi;
use tracing::{debug, trace};

use crate::{
    host::{host_interface, Host},
    message::ExecutionMessage,
    result::{ExecutionResult, RawResult},
    types::{Capabilities, Revision, SetOptionError, StatusCode},
};

/// The host's handle to one VM instance.
///
/// The lifecycle of the instance is carried by ownership: configuration needs `&mut Vm`,
/// execution needs `&Vm` and may happen from several threads at once, and dropping the handle
/// destroys the instance exactly once. A handle created from a dynamically loaded module keeps
/// the module mapped until after the instance is destroyed.
pub struct Vm {
    instance: NonNull<ffi::evmc_vm>,
    capabilities: Capabilities,
    // dropped after `destroy` has run
    library: Option<Box<dyn Any + Send + Sync>>,
}

// SAFETY: instances must tolerate concurrent `execute` calls, and the only mutating entry
// point (`set_option`) requires `&mut self`.
unsafe impl Send for Vm {}
unsafe impl Sync for Vm {}

impl Vm {
    /// Takes ownership of a created instance. Returns `None` for a null pointer.
    ///
    /// The capabilities of the instance are queried here, once.
    ///
    /// # Safety
    ///
    /// `instance` must be a live instance with a matching ABI version that nobody else will
    /// destroy.
    pub unsafe fn from_raw(instance: *mut ffi::evmc_vm) -> Option<Self> {
        let instance = NonNull::new(instance)?;
        let capabilities = match instance.as_ref().get_capabilities {
            Some(get_capabilities) => {
                Capabilities::from_bits_retain(get_capabilities(instance.as_ptr()))
            }
            None => Capabilities::NONE,
        };

        let vm = Vm { instance, capabilities, library: None };
        debug!("acquired VM '{}' {} with {:?}", vm.name(), vm.version(), capabilities);
        Some(vm)
    }

    /// Like [`Vm::from_raw`], additionally keeping `library` alive until the instance has been
    /// destroyed.
    ///
    /// # Safety
    ///
    /// See [`Vm::from_raw`]. The instance's code must live in `library`, or outlive it.
    pub unsafe fn from_raw_with_library(
        instance: *mut ffi::evmc_vm,
        library: Box<dyn Any + Send + Sync>,
    ) -> Option<Self> {
        let mut vm = Self::from_raw(instance)?;
        vm.library = Some(library);
        Some(vm)
    }

    /// Gives up ownership of the instance without destroying it. A library kept alive by the
    /// handle is leaked, so it stays mapped for the rest of the process.
    pub fn into_raw(self) -> *mut ffi::evmc_vm {
        let mut this = std::mem::ManuallyDrop::new(self);
        if let Some(library) = this.library.take() {
            std::mem::forget(library);
        }
        this.instance.as_ptr()
    }

    fn raw(&self) -> &ffi::evmc_vm {
        // SAFETY: the instance stays alive until `drop`
        unsafe { self.instance.as_ref() }
    }

    /// The ABI version the instance was built against.
    pub fn abi_version(&self) -> i32 {
        self.raw().abi_version
    }

    /// The name reported by the instance, or an empty string if it has none.
    pub fn name(&self) -> &str {
        c_str_or_empty(self.raw().name)
    }

    /// The version reported by the instance, or an empty string if it has none.
    pub fn version(&self) -> &str {
        c_str_or_empty(self.raw().version)
    }

    /// The capabilities queried when the handle was created.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns true if every bit of `capability` is supported.
    pub fn has_capability(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// Returns true if the instance has a `set_option` entry point.
    pub fn supports_options(&self) -> bool {
        self.raw().set_option.is_some()
    }

    /// Sets one option. Only possible before the handle is shared for execution.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), SetOptionError> {
        let Some(set_option) = self.raw().set_option else {
            return Err(SetOptionError::NotSupported);
        };
        let name_c = CString::new(name).map_err(|_| SetOptionError::InvalidName)?;
        let value_c = CString::new(value).map_err(|_| SetOptionError::InvalidValue)?;

        // SAFETY: live instance, null-terminated arguments that outlive the call
        let raw = unsafe { set_option(self.instance.as_ptr(), name_c.as_ptr(), value_c.as_ptr()) };
        trace!("set_option({}, {}) -> {}", name, value, raw);
        match raw {
            ffi::EVMC_SET_OPTION_SUCCESS => Ok(()),
            ffi::EVMC_SET_OPTION_INVALID_VALUE => Err(SetOptionError::InvalidValue),
            _ => Err(SetOptionError::InvalidName),
        }
    }

    /// Executes `code` for `message` under `revision`, with `host` answering the callbacks.
    ///
    /// The returned result is owned: the instance's result has already been released.
    pub fn execute<H: Host>(
        &self,
        host: &mut H,
        revision: Revision,
        message: &ExecutionMessage<'_>,
        code: &[u8],
    ) -> ExecutionResult {
        let Some(execute) = self.raw().execute else {
            return ExecutionResult::error(StatusCode::InternalError);
        };
        let interface = host_interface::<H>();
        let raw_message = message.to_ffi();
        let code_ptr = if code.is_empty() { std::ptr::null() } else { code.as_ptr() };

        trace!(
            "executing {} bytes of code at depth {} under {} on '{}'",
            code.len(),
            message.depth(),
            revision,
            self.name()
        );

        // SAFETY: the table matches `H`, the context points to `host`, and every pointer
        // outlives the call
        let raw = unsafe {
            execute(
                self.instance.as_ptr(),
                &interface,
                host as *mut H as *mut ffi::evmc_host_context,
                revision.to_raw(),
                &raw_message,
                code_ptr,
                code.len(),
            )
        };

        // SAFETY: a fresh result from the instance, owned by nobody else
        unsafe { RawResult::from_raw(raw) }.into_execution_result()
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        if let Some(destroy) = self.raw().destroy {
            debug!("destroying VM '{}'", self.name());
            // SAFETY: the handle owns the instance and this is the only place it is destroyed
            unsafe { destroy(self.instance.as_ptr()) };
        }
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("abi_version", &self.abi_version())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

fn c_str_or_empty<'a>(s: *const std::os::raw::c_char) -> &'a str {
    if s.is_null() {
        return "";
    }
    // SAFETY: instances report static null-terminated strings
    unsafe { CStr::from_ptr(s) }.to_str().unwrap_or("")
}
