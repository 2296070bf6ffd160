//! Recognizer throughput over a mix of realistic commands.
//!
//! Every turn runs recognition before anything else, so it must stay well
//! under a millisecond even for utterances that fall through to UNKNOWN.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tutor_intent::IntentRecognizer;

const UTTERANCES: &[&str] = &[
    "summarize this page",
    "explain what photosynthesis means in simple words",
    "translate this paragraph into tamil",
    "give me a hard quiz",
    "next page",
    "go back",
    "go to page 12",
    "read paragraph three",
    "repeat that",
    "what can you do",
    "open biology notes pdf",
    "the weather is lovely today and i would like to talk about it",
];

fn bench_recognize_mixed(c: &mut Criterion) {
    let recognizer = IntentRecognizer::new();

    let mut group = c.benchmark_group("recognizer");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("recognize_mixed", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let text = UTTERANCES[idx % UTTERANCES.len()];
            idx += 1;
            recognizer.recognize(black_box(text))
        });
    });

    group.bench_function("recognize_unknown", |b| {
        b.iter(|| recognizer.recognize(black_box(UTTERANCES[UTTERANCES.len() - 1])));
    });

    group.finish();
}

fn bench_construct(c: &mut Criterion) {
    c.bench_function("recognizer_new", |b| b.iter(IntentRecognizer::new));
}

criterion_group!(benches, bench_recognize_mixed, bench_construct);
criterion_main!(benches);
