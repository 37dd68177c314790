/// Exports the creation entry point of a VM module.
///
/// `declare_vm!(MyVm, "my_vm", "1.0.0")` exports `evmc_create_my_vm`, which the loader finds
/// for module files named `libmy_vm.so`, `my-vm.so` and the like. The name must be usable as part
/// of an identifier.
///
/// ```ignore
/// evmc_vm::declare_vm!(MyVm, "my_vm", "1.0.0");
/// ```
#[macro_export]
macro_rules! declare_vm {
    ($vm:ty, $name:literal, $version:literal) => {
        $crate::paste::paste! {
            /// Creates a new instance of the VM. Ownership passes to the caller.
            #[no_mangle]
            pub extern "C" fn [<evmc_create_ $name>]() -> *mut $crate::ffi::evmc_vm {
                $crate::EvmcContainer::<$vm>::new_raw(concat!($name, "\0"), concat!($version, "\0"))
            }
        }
    };
}
