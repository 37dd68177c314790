use evmc_config::Configuration;
use evmc_loader::{create_and_configure, load_and_configure, LoaderError, SymbolSource};
use evmc_vm::{
    negotiate::{route_target, Route, DEFAULT_PRECOMPILE_MAX_ADDRESS},
    Address, ExecutionMessage, ExecutionResult, Host, Revision, StatusCode, Vm,
};
use tracing::{debug, info, trace, warn};

use crate::error::Error;

/// An ordered set of VMs that calls are routed across.
///
/// A call goes to the first registered VM whose capabilities fit the destination and code.
/// When that VM rejects the call, the next fitting VM is tried. The revision is passed with
/// every execution and never stored.
#[derive(Debug)]
pub struct VmRegistry {
    vms: Vec<Vm>,
    max_call_depth: i32,
    precompile_max_address: u16,
}

impl VmRegistry {
    /// The deepest call depth accepted by a new registry.
    pub const DEFAULT_MAX_CALL_DEPTH: i32 = 1024;

    /// Creates an empty registry with the default limits.
    pub fn new() -> Self {
        Self {
            vms: vec![],
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            precompile_max_address: DEFAULT_PRECOMPILE_MAX_ADDRESS,
        }
    }

    /// Messages deeper than `max_call_depth` fail with call depth exceeded.
    pub fn with_max_call_depth(mut self, max_call_depth: i32) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Destinations in `1..=max` are precompiles.
    pub fn with_precompile_max_address(mut self, max: u16) -> Self {
        self.precompile_max_address = max;
        self
    }

    /// Builds a registry from the configured limits, loading every module in order.
    pub fn from_config(config: &Configuration) -> Result<Self, Error> {
        Self::from_config_with(config, load_and_configure)
    }

    /// Like [`VmRegistry::from_config`], resolving module paths in `source` instead of opening
    /// them.
    pub fn from_config_in<S: SymbolSource + Clone>(
        config: &Configuration,
        source: &S,
    ) -> Result<Self, Error> {
        Self::from_config_with(config, |module| create_and_configure(source.clone(), module))
    }

    fn from_config_with<F>(config: &Configuration, mut create: F) -> Result<Self, Error>
    where
        F: FnMut(&str) -> Result<Vm, LoaderError>,
    {
        config.validate()?;

        let mut registry = Self::new()
            .with_max_call_depth(config.max_call_depth)
            .with_precompile_max_address(config.precompile_max_address);

        for module in &config.modules {
            debug!("loading module '{}'", module);
            registry.register(create(module)?);
        }

        if registry.is_empty() {
            warn!("no VM modules are configured, every call will be rejected");
        }
        Ok(registry)
    }

    /// Appends `vm` to the routing order.
    pub fn register(&mut self, vm: Vm) -> &mut Self {
        info!(
            "registered VM '{}' {} with {:?}",
            vm.name(),
            vm.version(),
            vm.capabilities()
        );
        self.vms.push(vm);
        self
    }

    /// The registered VMs in routing order.
    pub fn vms(&self) -> &[Vm] {
        &self.vms
    }

    /// The number of registered VMs.
    pub fn len(&self) -> usize {
        self.vms.len()
    }

    /// Returns true if no VM is registered.
    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }

    /// The deepest call depth that is still executed.
    pub fn max_call_depth(&self) -> i32 {
        self.max_call_depth
    }

    /// The highest precompile address.
    pub fn precompile_max_address(&self) -> u16 {
        self.precompile_max_address
    }

    /// The VMs that may receive a call to `destination` running `code`, in routing order.
    pub fn candidates<'s>(
        &'s self,
        code: &'s [u8],
        destination: &'s Address,
    ) -> impl Iterator<Item = (&'s Vm, Route)> + 's {
        self.vms.iter().filter_map(move |vm| {
            route_target(vm.capabilities(), code, destination, self.precompile_max_address)
                .map(|route| (vm, route))
        })
    }

    /// Executes `message` on the first candidate VM that does not reject it.
    ///
    /// Precompiles run without code. If the message is deeper than the limit, or no VM
    /// accepts it, the result carries no gas.
    pub fn execute<H: Host>(
        &self,
        host: &mut H,
        revision: Revision,
        message: &ExecutionMessage<'_>,
        code: &[u8],
    ) -> ExecutionResult {
        if message.depth() > self.max_call_depth {
            debug!(
                "call at depth {} exceeds the maximum of {}",
                message.depth(),
                self.max_call_depth
            );
            return ExecutionResult::error(StatusCode::CallDepthExceeded);
        }

        let destination = message.code_address();
        for (vm, route) in self.candidates(code, &destination) {
            let code = match route {
                Route::Precompile => &[][..],
                Route::Code(_) => code,
            };
            trace!("routing call to {} via '{}' as {:?}", destination, vm.name(), route);

            let result = vm.execute(host, revision, message, code);
            if result.status_code() == StatusCode::Rejected {
                debug!("'{}' rejected the call under {}, trying the next VM", vm.name(), revision);
                continue;
            }
            return result;
        }

        warn!("no VM accepted the call to {} under {}", destination, revision);
        ExecutionResult::error(StatusCode::Rejected)
    }
}

impl Default for VmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmc_loader::SymbolTable;
    use evmc_vm::{
        testing::{evmc_create_script, evmc_create_static_script, opcodes, MockedHost, StaticVm},
        ExecutionMessageBuilder,
    };
    use serial_test::serial;

    fn table() -> SymbolTable {
        SymbolTable::new()
            .with_symbol("evmc_create_script", evmc_create_script)
            .with_symbol("evmc_create_static_script", evmc_create_static_script)
    }

    fn message(destination: Address, input: &[u8], depth: i32) -> ExecutionMessage<'_> {
        ExecutionMessageBuilder::new()
            .recipient(destination)
            .input(input)
            .gas(1000)
            .depth(depth)
            .build()
            .expect("failed to build message")
    }

    fn config(modules: &[&str]) -> Configuration {
        Configuration {
            modules: modules.iter().map(|m| m.to_string()).collect(),
            ..Configuration::default()
        }
    }

    #[test]
    #[serial]
    fn test_from_config_keeps_order_and_limits() {
        let mut config = config(&["static_script.so", "libscript.so,gas-per-op=2"]);
        config.max_call_depth = 7;
        config.precompile_max_address = 0x11;

        let registry = VmRegistry::from_config_in(&config, &table()).expect("failed to load");
        let names: Vec<_> = registry.vms().iter().map(|vm| vm.name().to_string()).collect();
        assert_eq!(names, ["static_script", "script"]);
        assert_eq!(registry.max_call_depth(), 7);
        assert_eq!(registry.precompile_max_address(), 0x11);
    }

    #[test]
    #[serial]
    fn test_from_config_reports_module_errors() {
        let error = VmRegistry::from_config_in(&config(&["libscript.so,colour=blue"]), &table())
            .expect_err("unknown option must fail");
        assert!(matches!(error, Error::Loader(LoaderError::InvalidOptionName(_))));

        let error = VmRegistry::from_config(&config(&["./unittests/nonexistent.so"]))
            .expect_err("missing module must fail");
        assert!(matches!(error, Error::Loader(LoaderError::CannotOpen(_))));
    }

    #[test]
    fn test_from_config_validates_limits() {
        let mut config = config(&[]);
        config.max_call_depth = -1;
        let error = VmRegistry::from_config_in(&config, &table()).expect_err("must be rejected");
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    #[serial]
    fn test_candidates_follow_capabilities() {
        let registry =
            VmRegistry::from_config_in(&config(&["script.so", "static_script.so"]), &table())
                .expect("failed to load");
        let account = Address::from_low_u64_be(0x1000);
        let precompile = Address::from_low_u64_be(0x04);

        let evm: Vec<_> =
            registry.candidates(&[opcodes::STOP], &account).map(|(vm, r)| (vm.name(), r)).collect();
        assert_eq!(evm, [("script", Route::Code(evmc_vm::negotiate::CodeDialect::Evm1))]);

        let wasm: Vec<_> = registry
            .candidates(b"\0asm\x01\0\0\0", &account)
            .map(|(vm, r)| (vm.name(), r))
            .collect();
        assert_eq!(wasm, [("static_script", Route::Code(evmc_vm::negotiate::CodeDialect::Ewasm))]);

        let pre: Vec<_> =
            registry.candidates(&[], &precompile).map(|(vm, r)| (vm.name(), r)).collect();
        assert_eq!(pre, [("script", Route::Precompile)]);
    }

    #[test]
    fn test_depth_limit() {
        let mut registry = VmRegistry::new().with_max_call_depth(2);
        registry.register(
            unsafe { Vm::from_raw(evmc_create_script()) }.expect("failed to create VM"),
        );
        let destination = Address::from_low_u64_be(0x1000);
        let mut host = MockedHost::new();

        let result =
            registry.execute(&mut host, Revision::Cancun, &message(destination, &[], 2), &[
                opcodes::DEPTH,
            ]);
        assert_eq!(result.status_code(), StatusCode::Success);

        let result =
            registry.execute(&mut host, Revision::Cancun, &message(destination, &[], 3), &[
                opcodes::DEPTH,
            ]);
        assert_eq!(result.status_code(), StatusCode::CallDepthExceeded);
        assert_eq!(result.gas_left(), 0);
        assert!(result.output().is_empty());
    }

    #[test]
    fn test_empty_registry_rejects() {
        let registry = VmRegistry::default();
        let mut host = MockedHost::new();
        let result = registry.execute(
            &mut host,
            Revision::Cancun,
            &message(Address::from_low_u64_be(0x1000), &[], 0),
            &[opcodes::STOP],
        );
        assert_eq!(result.status_code(), StatusCode::Rejected);
        assert_eq!(result.gas_left(), 0);
    }

    #[test]
    fn test_static_vm_is_not_offered_evm_code() {
        let mut registry = VmRegistry::new();
        registry.register(
            unsafe { Vm::from_raw(evmc_create_static_script()) }.expect("failed to create VM"),
        );
        let mut host = MockedHost::new();
        let destination = Address::from_low_u64_be(0x1000);

        let result = registry.execute(
            &mut host,
            Revision::Cancun,
            &message(destination, &[], 0),
            &[opcodes::STOP],
        );
        assert_eq!(result.status_code(), StatusCode::Rejected);

        let result = registry.execute(
            &mut host,
            Revision::Cancun,
            &message(destination, &[], 0),
            b"\0asm",
        );
        assert_eq!(result.status_code(), StatusCode::Success);
        assert_eq!(result.output().as_slice(), StaticVm::OUTPUT);
    }
}
