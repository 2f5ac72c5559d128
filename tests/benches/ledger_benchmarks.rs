//! # RPKI-Chain Ledger Benchmarks
//!
//! | Operation | Cost driver |
//! |-----------|-------------|
//! | append | canonical JSON + SHA-256 of one block |
//! | verify_integrity | re-hash of every block |
//! | replicate | one re-hash per replica |
//! | merkle_root | one hash per transaction |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rc_01_ledger::{merkle_root, Block, Ledger, MemoryLedger, ReplicaSet};
use shared_types::{
    CommittedTransaction, ConsensusStatus, Observation, Transaction, ValidatorId, Vote, VoteChoice,
};
use std::time::Duration;

fn entry(i: u32) -> CommittedTransaction {
    let observation = Observation {
        subject_asn: 64500 + i,
        prefix: format!("10.{}.{}.0/24", i / 256, i % 256),
        as_path: vec![3356, 1299, 64500 + i],
        timestamp: 1_700_000_000 + i as u64,
        is_attack: false,
        label: String::new(),
    };
    let transaction = Transaction::new(ValidatorId::new("validator-1"), &observation, vec![], None)
        .expect("valid transaction");
    let signatures = (2..5)
        .map(|v| {
            Vote::new(
                transaction.id.clone(),
                ValidatorId::new(format!("validator-{}", v)),
                VoteChoice::Approve,
            )
            .expect("valid vote")
        })
        .collect();
    CommittedTransaction {
        transaction,
        consensus_status: ConsensusStatus::Confirmed,
        approve_count: 3,
        reject_count: 0,
        signatures,
        committed_by: ValidatorId::new("validator-1"),
        committed_at: 1_700_000_000_000,
    }
}

fn genesis() -> Block {
    Block::genesis(1_700_000_000_000).expect("genesis")
}

fn filled(blocks: u32) -> MemoryLedger {
    let ledger = MemoryLedger::new(genesis());
    for i in 0..blocks {
        ledger.append_transaction(entry(i)).expect("append");
    }
    ledger
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc-01-append");
    group.measurement_time(Duration::from_secs(5));

    let ledger = MemoryLedger::new(genesis());
    let mut i = 0u32;
    group.bench_function("append_transaction", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            black_box(ledger.append_transaction(entry(i)).expect("append"))
        })
    });
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc-01-verify-integrity");
    for blocks in [100u32, 1_000] {
        let ledger = filled(blocks);
        group.throughput(Throughput::Elements(blocks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &ledger, |b, ledger| {
            b.iter(|| black_box(ledger.verify_integrity().valid))
        });
    }
    group.finish();
}

fn bench_replicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc-01-replicate");
    for validators in [3usize, 9, 27] {
        let roster: Vec<_> = (1..=validators)
            .map(|v| ValidatorId::new(format!("validator-{}", v)))
            .collect();
        let canonical = MemoryLedger::new(genesis());
        let blocks: Vec<Block> = (0..200)
            .map(|i| canonical.append_transaction(entry(i)).expect("append"))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(validators), &blocks, |b, blocks| {
            b.iter(|| {
                let replicas = ReplicaSet::new(&genesis(), roster.clone());
                for block in blocks {
                    black_box(replicas.replicate(block));
                }
            })
        });
    }
    group.finish();
}

fn bench_merkle(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc-01-merkle-root");
    for size in [1u32, 10, 100] {
        let entries: Vec<_> = (0..size).map(entry).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| black_box(merkle_root(entries).expect("hash")))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append, bench_verify, bench_replicate, bench_merkle);
criterion_main!(benches);
