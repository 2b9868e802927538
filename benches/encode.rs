use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wasmgen::samples;
use wasmgen::{FunctionBody, FunctionType, Instruction, Module, Resolution, ValueType};

/// A module with `count` functions over a handful of repeated signatures, each
/// calling its predecessor.
fn synthetic_module(count: u32) -> Module {
    let mut module = Module::new();
    let signatures = [
        FunctionType::default(),
        FunctionType::new(&[ValueType::I32], &[ValueType::I32]),
        FunctionType::new(&[ValueType::I64, ValueType::I64], &[]),
    ];
    let mut previous = module.import_function("env", "seed", FunctionType::default());
    for i in 0..count {
        let body = FunctionBody::new(vec![
            Instruction::I32Const { value: i as i32 * 1000 },
            Instruction::Drop,
            Instruction::Call { func: previous },
            Instruction::End,
        ]);
        previous = module.add_function(signatures[i as usize % signatures.len()].clone(), body);
    }
    module.export("last", previous);
    module
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("samples");
    for sample in samples::SAMPLES {
        let module = (sample.build)();
        group.bench_function(sample.name, |b| {
            b.iter(|| black_box(module.encode().expect("sample encodes")));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("synthetic");
    for count in [100, 1000, 10_000] {
        let module = synthetic_module(count);
        println!("{count} functions: {} bytes", module.encode().expect("module encodes").len());

        group.bench_function(format!("resolve_{count}"), |b| {
            b.iter(|| black_box(Resolution::resolve(&module)));
        });
        group.bench_function(format!("encode_{count}"), |b| {
            b.iter(|| black_box(module.encode().expect("module encodes")));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_encode);
criterion_main!(benches);
