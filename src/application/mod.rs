//! Application layer - the registry, audit emitter, metrics, recommendation
//! engine and the gateway façade that ties them together.

pub mod audit_emitter;
pub mod gateway;
pub mod metrics;
pub mod recommendation;
pub mod registry;

pub use audit_emitter::{AuditEmitter, AuditEmitterConfig, AuditStats, AuditWorker};
pub use gateway::{GatewayConfig, ToolGateway, ToolHealth};
pub use metrics::{MetricsRecorder, ToolStats};
pub use recommendation::RecommendationEngine;
pub use registry::{RegistryError, ToolRegistry};
