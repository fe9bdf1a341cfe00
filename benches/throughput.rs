use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion};
use rulefilter::{
    build_predicate, CompileOptions, CompiledFilter, Datum, FieldType, Kind, Record, RuleNode,
    Schema, ToDatum,
};

struct Order {
    total: f64,
    status: String,
    lines: Vec<Line>,
}

struct Line {
    sku: String,
    qty: i32,
}

impl Record for Line {
    fn schema() -> Schema {
        Schema::new("Line")
            .field("sku", FieldType::scalar(Kind::String))
            .field("qty", FieldType::scalar(Kind::Integer))
    }

    fn field(&self, name: &str) -> Option<Datum<'_>> {
        match name {
            "sku" => Some(self.sku.to_datum()),
            "qty" => Some(self.qty.to_datum()),
            _ => None,
        }
    }
}

impl Record for Order {
    fn schema() -> Schema {
        Schema::new("Order")
            .field("total", FieldType::scalar(Kind::Double))
            .field("status", FieldType::scalar(Kind::String))
            .field("lines", FieldType::list(FieldType::object::<Line>()))
    }

    fn field(&self, name: &str) -> Option<Datum<'_>> {
        match name {
            "total" => Some(self.total.to_datum()),
            "status" => Some(self.status.to_datum()),
            "lines" => Some(Datum::records(&self.lines)),
            _ => None,
        }
    }
}

fn build_shared_filter() -> (Arc<CompiledFilter<Order>>, Arc<Vec<Order>>) {
    let rule = RuleNode::and(vec![
        RuleNode::leaf("total", "greater", "double", 50.0),
        RuleNode::leaf("status", "in", "string", "[open,pending]"),
        RuleNode::leaf("lines.sku", "begins_with", "string", "ab"),
    ]);
    let filter = Arc::new(build_predicate::<Order>(Some(&rule), &CompileOptions::default()).unwrap());

    let orders = (0..256)
        .map(|i| Order {
            total: f64::from(i),
            status: if i % 2 == 0 { "Open" } else { "closed" }.to_owned(),
            lines: (0..4)
                .map(|j| Line {
                    sku: format!("{}{j}", if i % 3 == 0 { "AB" } else { "XY" }),
                    qty: j,
                })
                .collect(),
        })
        .collect();

    (filter, Arc::new(orders))
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let (filter, orders) = build_shared_filter();

        group.bench_function(&format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let filter = Arc::clone(&filter);
                        let orders = Arc::clone(&orders);
                        thread::spawn(move || {
                            let start = Instant::now();
                            for i in 0..per_thread {
                                let order = &orders[(i as usize + t) % orders.len()];
                                let _ = filter.evaluate(order);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
