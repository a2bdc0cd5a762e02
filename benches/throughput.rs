//! Benchmarks for classification and tick throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::Rng;
use wikispeed::{EventRecord, NullSink, WikispeedConfig};

const WIKIS: &[(&str, &str)] = &[
    ("enwiki", "en.wikipedia.org"),
    ("bnwiki", "bn.wikipedia.org"),
    ("wikidatawiki", "www.wikidata.org"),
    ("commonswiki", "commons.wikimedia.org"),
    ("bnwiktionary", "bn.wiktionary.org"),
    ("dewikivoyage", "de.wikivoyage.org"),
];

fn generate_events(count: usize, span_secs: f64) -> Vec<EventRecord> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let (wiki, domain) = WIKIS[rng.gen_range(0..WIKIS.len())];
            let ts = rng.gen_range(0.0..span_secs);
            let event = EventRecord::new(wiki, ts).with_domain(domain);
            if rng.gen_bool(0.01) {
                event.canary()
            } else {
                event
            }
        })
        .collect()
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    let events = generate_events(10_000, 120.0);
    group.throughput(Throughput::Elements(events.len() as u64));

    group.bench_function("classify_10000_events", |b| {
        b.iter(|| {
            let mut session = WikispeedConfig::default().build_session().unwrap();
            session.start(0.0).unwrap();
            for e in &events {
                black_box(session.ingest(e));
            }
        })
    });

    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    let events = generate_events(50_000, 120.0);

    group.bench_function("steady_tick_after_50000_events", |b| {
        b.iter_batched(
            || {
                let mut session = WikispeedConfig::default().build_session().unwrap();
                session.start(0.0).unwrap();
                for e in &events {
                    session.ingest(e);
                }
                session
            },
            |mut session| black_box(session.tick(120.0, &mut NullSink).unwrap()),
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("bootstrap_tick_after_50000_events", |b| {
        b.iter_batched(
            || {
                let mut session = WikispeedConfig::default().build_session().unwrap();
                session.start(0.0).unwrap();
                for e in &events {
                    session.ingest(e);
                }
                session
            },
            |mut session| black_box(session.tick(30.0, &mut NullSink).unwrap()),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_ingest, bench_tick);
criterion_main!(benches);
