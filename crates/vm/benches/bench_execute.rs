//! Benchmark for the cost of one execute round trip across the C ABI.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use evmc_vm::{
    testing::{opcodes, MockedHost, ScriptVm},
    Address, EvmcContainer, ExecutionMessageBuilder, Revision, Vm,
};

fn test_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("evmc_vm");

    let instance = EvmcContainer::<ScriptVm>::new_raw("script\0", "0.1.0\0");
    let vm = unsafe { Vm::from_raw(instance) }.expect("failed to wrap instance");
    let input = [4u8];
    let message = ExecutionMessageBuilder::new()
        .gas(1_000_000)
        .recipient(Address::from_low_u64_be(0xaaaa))
        .input(&input)
        .build()
        .expect("invalid message");

    group.sample_size(500);
    group.bench_function(BenchmarkId::from_parameter("execute"), |b| {
        let mut host = MockedHost::new();
        b.iter(|| {
            let result = vm.execute(
                &mut host,
                Revision::Cancun,
                &message,
                &[opcodes::DEPTH, opcodes::SSTORE, opcodes::BLOCK_NUMBER, opcodes::STOP],
            );
            assert!(result.status_code().is_success());
        });
    });

    group.bench_function(BenchmarkId::from_parameter("nested_call"), |b| {
        let mut host = MockedHost::new();
        b.iter(|| {
            host.recorded_calls.clear();
            let result = vm.execute(&mut host, Revision::Cancun, &message, &[opcodes::CALL]);
            assert!(result.status_code().is_success());
        });
    });

    group.finish();
}

criterion_group!(benches, test_execute);
criterion_main!(benches);
