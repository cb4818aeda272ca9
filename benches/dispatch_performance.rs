use std::sync::Arc;

use comms_core::MessageTemplate;
use comms_web_generic::Dispatcher;
use comms_web_generic::testing::{RecordingClient, test_senders};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

fn benchmark_whatsapp_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let parameter_counts = vec![0, 3, 20];
    let mut group = c.benchmark_group("whatsapp_dispatch");

    for count in parameter_counts {
        let params: Vec<String> = (0..count).map(|i| format!("\"param-{i}\"")).collect();
        let body = format!(
            r#"{{"phoneNumber":"+14255550123","templateParameters":[{}]}}"#,
            params.join(",")
        );

        group.bench_with_input(BenchmarkId::new("send_whatsapp", count), &count, |b, _| {
            // Fresh recorder per iteration keeps the call log bounded.
            b.to_async(&rt).iter(|| async {
                let client = Arc::new(RecordingClient::new());
                let dispatcher = Dispatcher::new(client.channels(), test_senders());
                black_box(dispatcher.send_whatsapp(body.as_bytes()).await)
            })
        });
    }
    group.finish();
}

fn benchmark_rejection(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = Arc::new(RecordingClient::new());
    let dispatcher = Dispatcher::new(client.channels(), test_senders());

    let mut group = c.benchmark_group("rejection");
    for size in [100, 10_000] {
        let payload = "x".repeat(size);
        group.bench_with_input(BenchmarkId::new("malformed_email", size), &size, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(dispatcher.send_email(payload.as_bytes()).await) })
        });
    }
    group.finish();
}

fn benchmark_template_construction(c: &mut Criterion) {
    let params: Vec<String> = (0..10).map(|i| format!("value {i}")).collect();

    c.bench_function("positional_template", |b| {
        b.iter(|| {
            black_box(MessageTemplate::positional(
                "appointment_reminder",
                "en",
                &params,
            ))
        })
    });
}

criterion_group!(
    benches,
    benchmark_whatsapp_dispatch,
    benchmark_rejection,
    benchmark_template_construction
);

criterion_main!(benches);
