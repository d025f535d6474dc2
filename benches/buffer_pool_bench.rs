use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use std::sync::Arc;
use tarndb::BufferPoolManager;

// Create temporary db for benchmarking
fn create_bench_buffer_pool(pool_size: usize) -> Arc<BufferPoolManager> {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, 2, path).unwrap());

    // Keep the temp file alive
    std::mem::forget(temp_file);

    buffer_pool
}

// Generate test data of specified size
fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn buffer_pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BufferPool");

    // Test with different buffer pool sizes
    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("sequential_access", size), size, |b, &size| {
            let buffer_pool = create_bench_buffer_pool(size as usize);

            // Create some pages first
            let mut page_ids = Vec::new();
            for _ in 0..size {
                let mut guard = buffer_pool.new_page_guarded().unwrap().into_write();
                let data = generate_test_data(100);
                guard.data_mut()[..data.len()].copy_from_slice(&data);
                page_ids.push(guard.page_id());
            }

            // Benchmark sequential access pattern
            b.iter(|| {
                for &page_id in &page_ids {
                    let guard = buffer_pool.fetch_page_read(page_id).unwrap();
                    let _ = guard.data()[0];
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("random_access", size), size, |b, &size| {
            let buffer_pool = create_bench_buffer_pool(size as usize);

            // Create some pages first
            let mut page_ids = Vec::new();
            for _ in 0..size {
                let mut guard = buffer_pool.new_page_guarded().unwrap().into_write();
                let data = generate_test_data(100);
                guard.data_mut()[..data.len()].copy_from_slice(&data);
                page_ids.push(guard.page_id());
            }

            // Create random access pattern
            let mut rng = rand::thread_rng();
            let random_indices: Vec<usize> = (0..size as usize)
                .map(|_| rng.gen_range(0..size as usize))
                .collect();

            // Benchmark random access pattern
            b.iter(|| {
                for &idx in &random_indices {
                    let guard = buffer_pool.fetch_page_read(page_ids[idx]).unwrap();
                    let _ = guard.data()[0];
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, buffer_pool_benchmark);
criterion_main!(benches);
