use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ecore_proxy::model::{self, option_value, OptionValue};
use ecore_proxy::{Bridge, BridgeConfig, TypedCollection};

fn in_memory() -> Bridge {
    Bridge::in_memory(model::package().unwrap(), BridgeConfig::default()).0
}

fn bench_create_release(c: &mut Criterion) {
    let bridge = in_memory();

    c.bench_function("create_release", |b| {
        b.iter(|| {
            let option = OptionValue::new(&bridge).unwrap();
            black_box(option.release().unwrap())
        });
    });
}

fn bench_reflective_access(c: &mut Criterion) {
    let bridge = in_memory();
    let option = OptionValue::new(&bridge).unwrap();
    option.set_option_name("timeout").unwrap();

    let mut group = c.benchmark_group("reflective");
    group.bench_function("e_get", |b| {
        b.iter(|| option.e_get(black_box(option_value::OPTION_NAME), false).unwrap());
    });
    group.bench_function("e_set", |b| {
        b.iter(|| option.e_set(black_box(option_value::VALUE), "3600").unwrap());
    });
    group.bench_function("named_get", |b| {
        b.iter(|| option.option_name().unwrap());
    });
    group.finish();
}

fn bench_collection(c: &mut Criterion) {
    let bridge = in_memory();
    let mut group = c.benchmark_group("collection");

    for size in [16usize, 256] {
        let elements: Vec<_> = (0..size).map(|_| OptionValue::new(&bridge).unwrap()).collect();
        let source = TypedCollection::<OptionValue>::new(&bridge).unwrap();
        for element in &elements {
            source.push_back(element).unwrap();
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("iterate", size), &source, |b, source| {
            b.iter(|| {
                let mut count = 0;
                for item in source.iter().unwrap() {
                    if item.unwrap().is_some() {
                        count += 1;
                    }
                }
                black_box(count)
            });
        });
        group.bench_with_input(BenchmarkId::new("insert_all", size), &source, |b, source| {
            let target = TypedCollection::<OptionValue>::new(&bridge).unwrap();
            b.iter(|| {
                target.insert_all(source).unwrap();
                target.clear().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_create_release,
    bench_reflective_access,
    bench_collection
);
criterion_main!(benches);
