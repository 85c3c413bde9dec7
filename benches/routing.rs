//! Routing benchmarks.
//!
//! `decide` and `classify` run on every request; the end-to-end group
//! measures orchestration overhead with zero-delay echo collaborators.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use hybrid_layer_orchestrator::{
    Collaborators, Complexity, ComplexityScorer, EchoRemote, EchoRuntime, NodeStatus,
    Orchestrator, OrchestratorConfig, PolicyEngine, Priority, ProcessingRequest, RouteOptions,
    Sensitivity,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn instant_orchestrator() -> Orchestrator {
    Orchestrator::new(
        &OrchestratorConfig::default(),
        Collaborators {
            runtime: Arc::new(EchoRuntime::with_delay(Duration::ZERO)),
            remote: Arc::new(EchoRemote::with_delay(Duration::ZERO)),
            ..Collaborators::echo()
        },
    )
}

// ---------------------------------------------------------------------------
// Bench: PolicyEngine::decide over every label combination
// ---------------------------------------------------------------------------

fn bench_policy_decide(c: &mut Criterion) {
    let engine = PolicyEngine::new();
    let node = NodeStatus::active(55.0, 40.0, vec!["llama3:8b".to_string()]);
    let mut requests = Vec::new();
    for p in Priority::ALL {
        for s in Sensitivity::ALL {
            for cx in Complexity::ALL {
                if let Ok(r) = ProcessingRequest::new("bench", p, s, cx) {
                    requests.push(r);
                }
            }
        }
    }

    c.bench_function("policy_decide_27_combinations", |b| {
        b.iter(|| {
            for r in &requests {
                black_box(engine.decide(black_box(r), black_box(&node)));
            }
        })
    });
}

// ---------------------------------------------------------------------------
// Bench: ComplexityScorer::classify by query length
// ---------------------------------------------------------------------------

fn bench_complexity_classify(c: &mut Criterion) {
    let scorer = ComplexityScorer::new();
    let mut group = c.benchmark_group("complexity_classify");

    for words in [10usize, 100, 1000] {
        let query = "explain the tradeoffs step by step ".repeat(words / 6 + 1);
        group.bench_with_input(BenchmarkId::new("words", words), &query, |b, q| {
            b.iter(|| black_box(scorer.classify(black_box(q))))
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Bench: Orchestrator::route end to end with echo collaborators
// ---------------------------------------------------------------------------

fn bench_route_echo(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let orchestrator = instant_orchestrator();

    c.bench_function("route_echo_local", |b| {
        b.to_async(&rt).iter(|| async {
            let result = orchestrator
                .route(
                    black_box("What's the capital of France?"),
                    RouteOptions::new().priority("high").complexity("simple"),
                )
                .await;
            let _ = black_box(result);
        })
    });
}

fn bench_route_echo_concurrent(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("route_echo_concurrent");
    group.sample_size(20);

    for count in [10u64, 100] {
        group.bench_with_input(BenchmarkId::new("requests", count), &count, |b, &count| {
            b.to_async(&rt).iter(|| async move {
                let orchestrator = Arc::new(instant_orchestrator());
                let mut handles = Vec::with_capacity(count as usize);

                for i in 0..count {
                    let o = Arc::clone(&orchestrator);
                    handles.push(tokio::spawn(async move {
                        black_box(o.route(&format!("query {i}"), RouteOptions::new()).await)
                    }));
                }

                for handle in handles {
                    let _ = handle.await;
                }
            })
        });
    }

    group.finish();
}

criterion_group!(policy_benches, bench_policy_decide, bench_complexity_classify);
criterion_group!(route_benches, bench_route_echo, bench_route_echo_concurrent);
criterion_main!(policy_benches, route_benches);
