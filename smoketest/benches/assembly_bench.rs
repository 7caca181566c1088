//! Benchmarks for topology assembly.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smoketest::connectors::ComponentSpec;
use smoketest::context::TestContext;
use smoketest::pipeline::{PipelineSpec, StageDescriptor, TopologyAssembler};
use smoketest::scenario::{SmokeTestScenario, WordCountConfig, WordCountScenario};

fn chain(len: usize) -> PipelineSpec {
    let mut spec = PipelineSpec::new("chain").with_stage(StageDescriptor::source(
        "stage-0",
        ComponentSpec::file_source("words.txt", "word"),
    ));
    for i in 1..len {
        spec = spec.with_stage(
            StageDescriptor::processor(format!("stage-{i}"), ComponentSpec::word_counter("word", "count"))
                .broadcast_from(format!("stage-{}", i - 1)),
        );
    }
    spec
}

fn assembly_benchmark(c: &mut Criterion) {
    let ctx = TestContext::local();
    let assembler = TopologyAssembler::new();

    let word_count = WordCountScenario::new(&WordCountConfig::default(), ["a", "b"])
        .map(|s| s.pipeline());
    if let Ok(spec) = word_count {
        c.bench_function("assemble_word_count", |b| {
            b.iter(|| assembler.build(black_box(&ctx), black_box(&spec)))
        });
    }

    let long = chain(200);
    c.bench_function("assemble_chain_200", |b| {
        b.iter(|| assembler.build(black_box(&ctx), black_box(&long)))
    });
}

criterion_group!(benches, assembly_benchmark);
criterion_main!(benches);
