//! 访客身份解析与去重层级选择基准测试

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use marketview::views::identity::resolve_address;
use marketview::views::{AddressSources, EntityKind, WindowPolicy, resolve_visitor};
use std::hint::black_box;

// ============== 地址解析 ==============

fn bench_resolve_address(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity/resolve_address");

    let chains = [
        ("single_hop", "203.0.113.7".to_string()),
        (
            "eight_hops",
            (0..8)
                .map(|i| format!("10.0.0.{}", i))
                .collect::<Vec<_>>()
                .join(", "),
        ),
    ];

    for (name, chain) in &chains {
        group.bench_with_input(BenchmarkId::new("forwarded_for", name), chain, |b, chain| {
            b.iter(|| {
                resolve_address(black_box(AddressSources {
                    forwarded_for: Some(chain.as_str()),
                    real_ip: None,
                    peer: Some("10.0.0.1"),
                }))
            });
        });
    }

    group.bench_function("mapped_peer", |b| {
        b.iter(|| {
            resolve_address(black_box(AddressSources {
                forwarded_for: None,
                real_ip: None,
                peer: Some("::ffff:192.0.2.10"),
            }))
        });
    });

    group.bench_function("no_sources", |b| {
        b.iter(|| resolve_address(black_box(AddressSources::default())));
    });

    group.finish();
}

// ============== 层级选择 + 锁键 ==============

fn bench_select_tier(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy/select");
    let policy = WindowPolicy::default();

    let visitors = [
        (
            "address",
            resolve_visitor(
                None,
                AddressSources {
                    forwarded_for: Some("203.0.113.7"),
                    ..Default::default()
                },
                Some("Mozilla/5.0"),
            ),
        ),
        (
            "user",
            resolve_visitor(Some(7), AddressSources::default(), Some("Mozilla/5.0")),
        ),
        (
            "anonymous",
            resolve_visitor(None, AddressSources::default(), Some("Mozilla/5.0")),
        ),
    ];

    for (name, visitor) in &visitors {
        group.bench_with_input(BenchmarkId::new("rule_and_lock_key", name), visitor, |b, v| {
            b.iter(|| {
                let rule = policy.select(black_box(v));
                rule.lock_key(EntityKind::Product, 42)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve_address, bench_select_tier);
criterion_main!(benches);
