//! Demo binary: wires the gateway from environment configuration, registers
//! a local sequence-features tool plus two simulated tools, and walks through
//! invocation, recommendation, health and metrics queries.

use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use tool_gateway::adapters::capacity::SemaphoreCapacityLimiter;
use tool_gateway::adapters::events::TracingAuditSink;
use tool_gateway::adapters::tools::{
    MockOutcome, MockToolAdapter, SequenceFeaturesAdapter, SEQUENCE_FEATURES_TOOL,
};
use tool_gateway::application::{AuditEmitter, ToolGateway};
use tool_gateway::config::AppConfig;
use tool_gateway::domain::invocation::InvocationRequest;
use tool_gateway::domain::recommendation::{RecommendationQuery, SequenceMetadata};
use tool_gateway::domain::sequence::MoleculeType;
use tool_gateway::domain::tool::{FieldKind, ToolCapability, ToolDescriptor, ToolSchema};
use tool_gateway::telemetry;

const SAMPLE: &str = "ATGGCGTACGCTTAGGCTAACGGTACCGATCGATCGGCTA";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.telemetry);

    let (emitter, worker) = AuditEmitter::new(
        Arc::new(TracingAuditSink::new()),
        config.audit.emitter_config(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = worker.spawn(shutdown_rx);

    let gateway = ToolGateway::new(
        config.gateway(),
        Arc::new(SemaphoreCapacityLimiter::new(config.capacity.ceilings())),
        Arc::new(config.breaker.factory()),
        emitter,
    );
    register_tools(&gateway)?;

    let features = gateway
        .invoke(InvocationRequest::new("seq_features").with_param("sequence", SAMPLE))
        .await;
    println!("{}", serde_json::to_string_pretty(&features)?);

    for _ in 0..config.breaker.failure_threshold {
        gateway
            .invoke(
                InvocationRequest::new("blast_search")
                    .with_param("sequence", SAMPLE)
                    .with_timeout(Duration::from_millis(500)),
            )
            .await;
    }

    let query = RecommendationQuery::for_goal([ToolCapability::Bioinformatics])
        .with_field("sequence")
        .with_sequence(SequenceMetadata {
            molecule_type: MoleculeType::classify(SAMPLE),
            length: Some(SAMPLE.len()),
            organism: None,
        });
    println!("{}", serde_json::to_string_pretty(&gateway.recommend(&query))?);
    println!("{}", serde_json::to_string_pretty(&gateway.health_snapshot().await)?);
    println!("{}", serde_json::to_string_pretty(&gateway.metrics())?);
    println!("{}", serde_json::to_string_pretty(&gateway.circuit_statuses())?);

    gateway.emitter().flush().await;
    let _ = shutdown_tx.send(true);
    worker.await?;
    Ok(())
}

fn register_tools(gateway: &ToolGateway) -> Result<(), Box<dyn Error>> {
    gateway.register(
        SequenceFeaturesAdapter::descriptor()?,
        Arc::new(SequenceFeaturesAdapter::new()),
    )?;
    gateway.register_alias("seq_features", SEQUENCE_FEATURES_TOOL)?;

    let blast = ToolDescriptor::builder("blast_search")
        .display_name("BLAST Search")
        .capability(ToolCapability::Bioinformatics)
        .input_schema(
            ToolSchema::new()
                .required("sequence", FieldKind::String)
                .optional("database", FieldKind::String),
        )
        .estimated_duration(Duration::from_secs(3))
        .build()?;
    gateway.register(
        blast,
        Arc::new(MockToolAdapter::new().with_default_outcome(MockOutcome::Hang)),
    )?;

    let llm = ToolDescriptor::builder("llm_analysis")
        .display_name("LLM Analysis")
        .capability(ToolCapability::AiAnalysis)
        .input_schema(ToolSchema::new().required("prompt", FieldKind::String))
        .estimated_duration(Duration::from_secs(8))
        .build()?;
    gateway.register(
        llm,
        Arc::new(
            MockToolAdapter::new()
                .with_default_outcome(MockOutcome::Success(json!({"summary": "n/a"}))),
        ),
    )?;
    Ok(())
}
