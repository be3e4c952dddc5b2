//! Flow router tests

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tcptrail_config::{ConfigError, FlowBinding, MemorySink, RunContext, ServerConfig};
use tcptrail_protocol::Record;
use tcptrail_sources::{IngressError, IngressRegistry, MemoryBroker};
use tokio::time::timeout;

use crate::error::PipelineError;
use crate::flow::FlowRouter;

// ============================================================================
// Helper Functions
// ============================================================================

const ENDPOINTS: &str = r#"
[ingress.mem]
type = "memory"

[ingress.grpc]
type = "grpc"

[ingestion.console]
type = "stdout"

[ingestion.archive]
type = "stdout"
"#;

struct Harness {
    broker: MemoryBroker,
    router: FlowRouter,
}

fn harness() -> Harness {
    let broker = MemoryBroker::new();
    let mut registry = IngressRegistry::empty();
    registry.register(broker.factory());

    Harness {
        broker,
        router: FlowRouter::new(Arc::new(registry)),
    }
}

/// Endpoints from `ENDPOINTS` with the given flow table, skipping load-time
/// validation so dangling names reach the router
fn context(flows: Vec<FlowBinding>) -> (RunContext<ServerConfig>, MemorySink) {
    let mut config = ServerConfig::from_str(ENDPOINTS).unwrap();
    config.flow = flows;
    let sink = config.attach_memory_sink();
    (RunContext::new(config), sink)
}

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn test_dangling_ingestion_starts_nothing() {
    let h = harness();
    let (ctx, _sink) = context(vec![
        FlowBinding::new("mem", "console", "json"),
        FlowBinding::new("mem", "elasticsearch", "json"),
    ]);

    let err = h.router.start(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::UnknownIngestion { index: 1, .. })
    ));
    assert_eq!(h.broker.opens(), 0);
}

#[tokio::test]
async fn test_dangling_ingress_starts_nothing() {
    let h = harness();
    let (ctx, _sink) = context(vec![FlowBinding::new("kafka", "console", "json")]);

    let err = h.router.start(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::UnknownIngress { index: 0, .. })
    ));
}

#[tokio::test]
async fn test_unknown_format_starts_nothing() {
    let h = harness();
    let (ctx, _sink) = context(vec![
        FlowBinding::new("mem", "console", "json"),
        FlowBinding::new("mem", "archive", "avro"),
    ]);

    let err = h.router.start(&ctx).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownFormat { index: 1, .. }));
    assert_eq!(h.broker.opens(), 0);
}

#[tokio::test]
async fn test_unsupported_ingress_type_starts_nothing() {
    let h = harness();
    let (ctx, _sink) = context(vec![
        FlowBinding::new("mem", "console", "json"),
        FlowBinding::new("grpc", "console", "spb"),
    ]);

    let err = h.router.start(&ctx).await.unwrap_err();
    let PipelineError::UnsupportedIngressType { index, ingress, kind } = err else {
        panic!("expected an unsupported type error, got {err:?}");
    };
    assert_eq!((index, ingress.as_str(), kind.as_str()), (1, "grpc", "grpc"));
    assert_eq!(h.broker.opens(), 0);
}

#[test]
fn test_validate_accepts_aliases() {
    let h = harness();
    let (ctx, _sink) = context(vec![
        FlowBinding::new("mem", "console", "dynamic"),
        FlowBinding::new("mem", "console", "full"),
        FlowBinding::new("mem", "archive", "compact"),
    ]);
    h.router.validate(ctx.config()).unwrap();
}

// ============================================================================
// Start-up Tests
// ============================================================================

#[tokio::test]
async fn test_open_failure_is_reported_per_flow() {
    let h = harness();
    h.broker.fail_opens(1);
    let (ctx, _sink) = context(vec![FlowBinding::new("mem", "console", "json")]);

    let err = h.router.start(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Ingress {
            index: 0,
            source: IngressError::Open { .. }
        }
    ));
}

#[tokio::test]
async fn test_empty_flow_table() {
    let h = harness();
    let (ctx, _sink) = context(Vec::new());

    let mut flows = h.router.start(&ctx).await.unwrap();
    assert!(flows.is_empty());
    assert!(flows.take_output("console").is_none());
    flows.shutdown().await;
}

#[tokio::test]
async fn test_outputs_only_for_referenced_ingestions() {
    let h = harness();
    let (ctx, sink) = context(vec![FlowBinding::new("mem", "console", "json")]);

    let mut flows = h.router.start(&ctx).await.unwrap();
    assert_eq!(flows.len(), 1);
    assert_eq!(flows.pending_outputs(), vec!["console"]);
    assert!(flows.take_output("archive").is_none());
    assert!(flows.take_output("console").is_some());
    assert!(flows.take_output("console").is_none());
    assert!(sink.contains("flow started"));

    flows.shutdown().await;
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_flows_fan_in_to_one_ingestion() {
    let h = harness();
    let (ctx, _sink) = context(vec![
        FlowBinding::new("mem", "console", "json"),
        FlowBinding::new("mem", "console", "json"),
    ]);

    let mut flows = h.router.start(&ctx).await.unwrap();
    assert_eq!(h.broker.opens(), 2);
    let console = flows.take_output("console").unwrap();

    for rtt in 0..10 {
        h.broker.publish(format!(r#"{{"RTT":{rtt}}}"#).into_bytes());
    }

    let mut seen = Vec::new();
    for _ in 0..10 {
        let record = timeout(Duration::from_secs(2), console.recv())
            .await
            .expect("timed out waiting for a record")
            .expect("output closed");
        let Record::Dynamic(map) = record else {
            panic!("expected a dynamic record");
        };
        seen.push(map["RTT"].as_u64().unwrap());
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..10).collect::<Vec<_>>());

    let forwarded: u64 = flows.metrics().iter().map(|m| m.ingress.forwarded).sum();
    assert_eq!(forwarded, 10);

    flows.shutdown().await;
    assert_eq!(h.broker.closes(), 2);
}

#[tokio::test]
async fn test_metrics_follow_flow_order() {
    let h = harness();
    let (ctx, _sink) = context(vec![
        FlowBinding::new("mem", "console", "json"),
        FlowBinding::new("mem", "archive", "spb"),
    ]);

    let flows = h.router.start(&ctx).await.unwrap();
    let metrics = flows.metrics();
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[0].index, 0);
    assert_eq!(metrics[1].binding, FlowBinding::new("mem", "archive", "spb"));
    assert_eq!(metrics[1].ingress.forwarded, 0);

    flows.shutdown().await;
}
