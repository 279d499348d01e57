use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rusqlite::Connection;

use table_loader::ingestion::batch::{for_each_batch, insert_batch};
use table_loader::types::{BatchPolicy, TableName};

const ROWS: usize = 20_000;

fn sample_rows() -> Vec<Vec<String>> {
    (0..ROWS)
        .map(|i| vec![format!("S{i}"), format!("Stop {i}"), "41.88".to_string(), "-87.63".to_string()])
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let rows = sample_rows();
    let table = TableName::new("stops");
    let mut group = c.benchmark_group("insert_batches");
    group.sample_size(10);

    for size in [100_i64, 1_000, 10_000, 0] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let conn = Connection::open_in_memory().expect("open");
                conn.execute_batch("CREATE TABLE stops (a TEXT, b TEXT, c TEXT, d TEXT);")
                    .expect("create");
                for_each_batch(&rows, BatchPolicy::from_size(size), |_, batch| {
                    insert_batch(&conn, &table, 4, batch)
                })
                .expect("insert");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert);
criterion_main!(benches);
