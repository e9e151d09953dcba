//! Property tests for the capacity invariant and score bounds.

use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use tool_gateway::adapters::capacity::{CapacityCeilings, SemaphoreCapacityLimiter};
use tool_gateway::adapters::events::InMemoryAuditSink;
use tool_gateway::adapters::resilience::InMemoryCircuitBreakerFactory;
use tool_gateway::application::{AuditEmitter, AuditEmitterConfig, GatewayConfig, ToolGateway};
use tool_gateway::domain::invocation::{InvocationRequest, Parameters};
use tool_gateway::domain::recommendation::{
    score_tool, RecommendationQuery, ScoringWeights, ToolStanding,
};
use tool_gateway::domain::resilience::CircuitState;
use tool_gateway::domain::tool::{FieldKind, ToolCapability, ToolDescriptor, ToolSchema};
use tool_gateway::ports::{
    AcquirePolicy, AdapterError, HealthStatus, InvocationContext, ToolAdapter,
};

#[derive(Default)]
struct Occupancy {
    global: usize,
    per_tool: HashMap<String, usize>,
    peak_global: usize,
    peak_per_tool: HashMap<String, usize>,
}

/// Adapter recording how many calls run at once, globally and per tool.
struct OccupancyProbe {
    tool: String,
    occupancy: Arc<Mutex<Occupancy>>,
    work: Duration,
}

#[async_trait]
impl ToolAdapter for OccupancyProbe {
    async fn invoke(&self, _: &Parameters, _: &InvocationContext) -> Result<Value, AdapterError> {
        {
            let mut o = self.occupancy.lock().unwrap();
            o.global += 1;
            let now = {
                let count = o.per_tool.entry(self.tool.clone()).or_insert(0);
                *count += 1;
                *count
            };
            o.peak_global = o.peak_global.max(o.global);
            let peak = o.peak_per_tool.entry(self.tool.clone()).or_insert(0);
            *peak = (*peak).max(now);
        }
        tokio::time::sleep(self.work).await;
        {
            let mut o = self.occupancy.lock().unwrap();
            o.global -= 1;
            if let Some(count) = o.per_tool.get_mut(&self.tool) {
                *count -= 1;
            }
        }
        Ok(json!({"ok": true}))
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::healthy("probe")
    }

    fn estimated_cost(&self, _: &Parameters) -> Duration {
        self.work
    }
}

fn run_load(global_max: usize, per_tool_max: usize, calls: Vec<(usize, u64)>, fail_fast: bool) -> Occupancy {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let sink = Arc::new(InMemoryAuditSink::new());
        let (emitter, worker) = AuditEmitter::new(sink, AuditEmitterConfig::default());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        worker.spawn(shutdown_rx);

        let config = GatewayConfig {
            acquire_policy: if fail_fast {
                AcquirePolicy::FailFast
            } else {
                AcquirePolicy::Wait {
                    timeout: Duration::from_secs(60),
                }
            },
            ..GatewayConfig::default()
        };
        let gateway = Arc::new(ToolGateway::new(
            config,
            Arc::new(SemaphoreCapacityLimiter::new(CapacityCeilings::new(
                global_max,
                per_tool_max,
            ))),
            Arc::new(InMemoryCircuitBreakerFactory::default()),
            emitter,
        ));

        let occupancy = Arc::new(Mutex::new(Occupancy::default()));
        for (i, name) in ["tool_a", "tool_b", "tool_c"].iter().enumerate() {
            gateway
                .register(
                    ToolDescriptor::builder(*name).build().unwrap(),
                    Arc::new(OccupancyProbe {
                        tool: name.to_string(),
                        occupancy: occupancy.clone(),
                        work: Duration::from_millis(10 * (i as u64 + 1)),
                    }),
                )
                .unwrap();
        }

        let handles: Vec<_> = calls
            .into_iter()
            .map(|(tool, delay_ms)| {
                let gateway = gateway.clone();
                let name = ["tool_a", "tool_b", "tool_c"][tool % 3];
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    gateway.invoke(InvocationRequest::new(name)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(gateway.capacity_snapshot().global.in_flight, 0);
        let o = occupancy.lock().unwrap();
        Occupancy {
            global: o.global,
            per_tool: o.per_tool.clone(),
            peak_global: o.peak_global,
            peak_per_tool: o.peak_per_tool.clone(),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn in_flight_never_exceeds_ceilings(
        global_max in 1usize..4,
        per_tool_max in 1usize..4,
        calls in prop::collection::vec((0usize..3, 0u64..30), 1..20),
        fail_fast in any::<bool>(),
    ) {
        let per_tool_max = per_tool_max.min(global_max);
        let o = run_load(global_max, per_tool_max, calls, fail_fast);

        prop_assert!(o.peak_global <= global_max);
        prop_assert!(o.peak_per_tool.values().all(|peak| *peak <= per_tool_max));
        prop_assert_eq!(o.global, 0);
    }

    #[test]
    fn score_stays_within_unit_interval(
        capability in 0.0f64..=1.0,
        schema in 0.0f64..=1.0,
        penalty in 0.0f64..=1.0,
        bonus in 0.0f64..=1.0,
        success_rate in proptest::option::of(0.0f64..=1.0),
        samples in 0u64..50,
        open in any::<bool>(),
        has_field in any::<bool>(),
    ) {
        let weights = ScoringWeights {
            capability,
            schema,
            open_circuit_penalty: penalty,
            success_bonus: bonus,
            ..ScoringWeights::default()
        };
        let descriptor = ToolDescriptor::builder("blast_search")
            .capability(ToolCapability::Bioinformatics)
            .input_schema(ToolSchema::new().required("sequence", FieldKind::String))
            .build()
            .unwrap();
        let mut query = RecommendationQuery::for_goal([
            ToolCapability::Bioinformatics,
            ToolCapability::AiAnalysis,
        ]);
        if has_field {
            query = query.with_field("sequence");
        }
        let standing = ToolStanding {
            circuit: if open { CircuitState::Open } else { CircuitState::Closed },
            success_rate,
            samples,
        };

        let breakdown = score_tool(&descriptor, &query, &standing, &weights);
        prop_assert!((0.0..=1.0).contains(&breakdown.score));
    }
}
