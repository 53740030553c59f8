use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    client::bench_read_field_exchange,
    client::bench_write_fields_exchange,
    client::bench_read_feed_exchange
);
criterion_main!(benches);
