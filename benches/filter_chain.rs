use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};
use zarrs_filters::{context::FilterContext, metadata};

fn filter_chain(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("filter_chain");
    group.plot_config(plot_config);

    let context = FilterContext::new();
    context.initialize().unwrap();
    context.register_builtin_plugins().unwrap();

    let codecs = serde_json::json!([
        {"codec": "shuffle"},
        {"codec": "zlib", "configuration": {"level": 1}},
        {"codec": "fletcher32"}
    ]);
    let mut chain = metadata::from_json(&context, 4, &codecs).unwrap();
    assert!(chain.setup(&context).unwrap().is_empty());

    for size in [32u64, 64, 128].iter() {
        let size3 = size * size * size;
        let data: Vec<u8> = (0..size3).map(|i| (i % 251) as u8).collect();
        let encoded = chain.encode(data.clone()).unwrap();
        group.throughput(Throughput::Bytes(size3));
        group.bench_function(BenchmarkId::new("encode", size3), |b| {
            b.iter(|| chain.encode(data.clone()).unwrap());
        });
        group.bench_function(BenchmarkId::new("decode", size3), |b| {
            b.iter(|| chain.decode(encoded.clone()).unwrap());
        });
    }
}

criterion_group!(benches, filter_chain);
criterion_main!(benches);
