//! Criterion benchmarks comparing synthesis cost of the byte access
//! strategies on the same locator circuit.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use zkwire_prover::circuit::{compile, generate_assignment};
use zkwire_prover::error::WitnessError;
use zkwire_prover::gadgets::AccessStrategy;
use zkwire_prover::locator::MessagesCircuit;
use zkwire_prover::wire::WireWriter;
use zkwire_prover::witness::{Prepared, WitnessBuilder};

fn sample_tx() -> Vec<u8> {
    let send = WireWriter::new()
        .bytes(0x0a, b"cosmos1sender")
        .bytes(0x12, b"cosmos1recipient")
        .nested(0x1a, WireWriter::new().bytes(0x0a, b"uatom").bytes(0x12, b"1000"));
    let message = WireWriter::new()
        .bytes(0x0a, b"/cosmos.bank.v1beta1.MsgSend")
        .nested(0x12, send);
    let body = WireWriter::new()
        .nested(0x0a, message)
        .bytes(0x12, b"memo");
    WireWriter::new().nested(0x0a, body).finish()
}

fn prepare(
    tx: &[u8],
    pad: usize,
    strategy: AccessStrategy,
) -> Result<Prepared<MessagesCircuit>, WitnessError> {
    WitnessBuilder::new(tx)?
        .pad_to(pad)
        .strategy(strategy)
        .max_fields(3)
        .messages_circuit(&[0x12])
}

fn bench_strategies(c: &mut Criterion) {
    let tx = sample_tx();
    let strategies = [
        ("linear", AccessStrategy::Linear),
        ("tree", AccessStrategy::BinaryTree),
        ("chunked4", AccessStrategy::Chunked { chunk_bits: 4 }),
        ("merkle", AccessStrategy::MerkleCommitted),
    ];

    let mut group = c.benchmark_group("locator_synthesis");
    group.sample_size(10);
    for pad in [128usize, 512] {
        for (name, strategy) in strategies {
            let Ok(prepared) = prepare(&tx, pad, strategy) else {
                continue;
            };

            if let Ok(compiled) = compile(&prepared.circuit) {
                println!(
                    "{name}/{pad}: {} variables, {} constraints",
                    compiled.num_variables(),
                    compiled.num_constraints()
                );
            }
            group.bench_with_input(BenchmarkId::new(name, pad), &prepared.circuit, |b, circuit| {
                b.iter(|| generate_assignment(black_box(circuit)))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
