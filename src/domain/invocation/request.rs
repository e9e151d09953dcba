//! InvocationRequest - one call of one tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;

use super::CorrelationContext;

/// Parameter mapping handed to a tool. Keys are unique and kept sorted so the
/// serialized form is canonical.
pub type Parameters = BTreeMap<String, Value>;

/// A request to run a single tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub correlation: CorrelationContext,
    pub tool_name: String,
    #[serde(default)]
    pub params: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl InvocationRequest {
    /// Creates a request with a fresh correlation context and no timeout.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            correlation: CorrelationContext::new(),
            tool_name: tool_name.into(),
            params: Parameters::new(),
            timeout: None,
        }
    }

    pub fn with_correlation(mut self, correlation: CorrelationContext) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// SHA-256 hex digest of the canonical JSON parameters.
    ///
    /// Audit records carry this instead of the raw inputs.
    pub fn input_hash(&self) -> String {
        let canonical = serde_json::to_vec(&self.params).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }
}
