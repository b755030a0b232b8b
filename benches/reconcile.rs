use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use crudkit::{
    DynamicRecord, FieldName, InMemoryRepository, InputMap, RecordEngine, RecordSchema,
    Repository,
};

const FIELDS: usize = 32;

fn make_engine() -> RecordEngine<DynamicRecord> {
    let mut schema = RecordSchema::new("bench").unwrap().with_timestamps();
    for i in 0..FIELDS {
        schema = schema.column(FieldName::new(format!("field_{i}")).unwrap());
    }
    let mut engine = RecordEngine::new(InMemoryRepository::new(schema));
    engine.mark_private([FieldName::new("field_0").unwrap()]);
    engine.mark_read_only([FieldName::new("field_1").unwrap()]);
    engine
}

/// Every schema field plus as many keys that name nothing.
fn make_input() -> InputMap {
    let mut input = InputMap::new();
    for i in 0..FIELDS {
        input.insert(format!("field_{i}"), format!("value {i}"));
        input.insert(format!("forged_{i}"), true);
    }
    input
}

fn bench_reconcile(c: &mut Criterion) {
    let engine = make_engine();
    let input = make_input();

    let mut group = c.benchmark_group("reconcile");
    group.throughput(Throughput::Elements(input.len() as u64));

    group.bench_function("new_record", |b| {
        b.iter_batched(
            || engine.repository().new_record().unwrap(),
            |target| engine.reconcile(target, &input).unwrap(),
            BatchSize::SmallInput,
        );
    });

    let stored = engine.do_create(&input).unwrap();
    group.bench_function("existing_record", |b| {
        b.iter_batched(
            || stored.clone(),
            |target| engine.reconcile(target, &input).unwrap(),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_table(c: &mut Criterion) {
    let engine = make_engine();
    let input = make_input();
    for _ in 0..256 {
        engine.do_create(&input).unwrap();
    }

    c.bench_function("list_table_256", |b| {
        b.iter(|| engine.list_table().unwrap());
    });
}

criterion_group!(benches, bench_reconcile, bench_table);
criterion_main!(benches);
