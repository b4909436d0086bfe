use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use pim_align_core::{AlignPairwiseParams, Sequence, Set};
use pim_align_host::{bucket_sets, dispatch_set_mode, sorted_by_load_desc};

fn set_of(n: usize, len: usize) -> Set {
  Set::new((0..n).map(|_| Sequence::from_codes(vec![0; len])).collect()).expect("within MAX_SET_SIZE")
}

fn many_sets(count: usize) -> Vec<Set> {
  (0..count).map(|i| set_of(4 + i % 20, 50 + i % 200)).collect()
}

fn balancer_benchmark(c: &mut Criterion) {
  let sets = many_sets(200);
  let params = AlignPairwiseParams::default();

  c.bench_function("bucket_sets/200-sets-8-tiles", |bencher| {
    let wave = sorted_by_load_desc(&sets);
    bencher.iter(|| bucket_sets(black_box(&wave), black_box(8)));
  });

  c.bench_function("dispatch_set_mode/200-sets-8-tiles", |bencher| {
    bencher.iter(|| dispatch_set_mode(black_box(&sets), black_box(&params), black_box(8)).expect("valid batches"));
  });
}

criterion_group! {
  name = benches;
  config = Criterion::default().warm_up_time(Duration::from_millis(200)).measurement_time(Duration::from_secs(2));
  targets = balancer_benchmark
}
criterion_main!(benches);
