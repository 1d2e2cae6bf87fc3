use crate::convert;
use crate::status::Status;
use async_trait::async_trait;
use capsched_core::Pod;
use capsched_engine::{DecisionEngine, EngineConfig, FilterVerdict, MIN_SCORE};
use capsched_registry::CapabilityRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Filter extension point: decide admissibility of a candidate node
#[async_trait]
pub trait FilterExtension: Send + Sync {
    /// Name under which the host registers the plugin
    fn name(&self) -> &str;

    /// Filter the candidate node for the pod
    async fn filter(&self, pod: &Pod, node_name: &str) -> Status;
}

/// Score extension point: rank an admissible node
#[async_trait]
pub trait ScoreExtension: Send + Sync {
    /// Name under which the host registers the plugin
    fn name(&self) -> &str;

    /// Score the node for the pod (0-100, higher is better)
    async fn score(&self, pod: &Pod, node_name: &str) -> (i64, Status);
}

/// Reserve extension point: take and release tentative capacity holds
#[async_trait]
pub trait ReserveExtension: Send + Sync {
    /// Name under which the host registers the plugin
    fn name(&self) -> &str;

    /// Hold capacity on the chosen node
    async fn reserve(&self, pod: &Pod, node_name: &str) -> Status;

    /// Release the hold after a downstream failure; best-effort, never fails
    async fn unreserve(&self, pod: &Pod, node_name: &str);
}

/// Post-bind extension point: the authoritative bind succeeded
#[async_trait]
pub trait PostBindExtension: Send + Sync {
    /// Name under which the host registers the plugin
    fn name(&self) -> &str;

    /// Finalize the hold for the bound pod
    async fn post_bind(&self, pod: &Pod, node_name: &str);
}

/// Plugin configuration, as delivered by the host's plugin-args mechanism
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginArgs {
    /// Resource-request key prefix marking capability claims
    pub capability_prefix: String,
    /// Pod annotation holding a `class=units,...` claim list
    pub claims_annotation: String,
    /// Upper bound on registry calls, in milliseconds
    pub registry_timeout_ms: u64,
}

impl Default for PluginArgs {
    fn default() -> Self {
        Self {
            capability_prefix: "capacity.capsched.io/".to_string(),
            claims_annotation: "capacity.capsched.io/claims".to_string(),
            registry_timeout_ms: 500,
        }
    }
}

impl PluginArgs {
    /// Parse args from the host's YAML plugin config
    pub fn from_yaml(data: &str) -> capsched_core::Result<Self> {
        capsched_core::from_yaml(data)
    }

    /// Parse args from the host's JSON plugin config
    pub fn from_json(data: &str) -> capsched_core::Result<Self> {
        capsched_core::from_json(data)
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            registry_timeout: Duration::from_millis(self.registry_timeout_ms),
        }
    }
}

/// Capacity-aware scheduler plugin
///
/// One struct satisfying all four lifecycle extension points, discoverable
/// by the host under [`CapacityPlugin::NAME`]. Thin by design: it converts
/// pod specs into placement requests and maps engine results onto framework
/// statuses; every decision lives in the engine.
pub struct CapacityPlugin {
    engine: DecisionEngine,
    args: PluginArgs,
}

impl CapacityPlugin {
    /// Name of the plugin in the host's registry and configuration
    pub const NAME: &'static str = "CapacityPlugin";

    /// Create the plugin against a capability registry
    pub fn new(registry: Arc<dyn CapabilityRegistry>, args: PluginArgs) -> Self {
        Self {
            engine: DecisionEngine::new(registry, args.engine_config()),
            args,
        }
    }
}

#[async_trait]
impl FilterExtension for CapacityPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn filter(&self, pod: &Pod, node_name: &str) -> Status {
        let req = match convert::placement_request(pod, node_name, &self.args) {
            Ok(req) => req,
            Err(e) => return Status::error(e.to_string()),
        };

        match self.engine.filter(&req).await {
            Ok(FilterVerdict::Admit) => Status::success(),
            Ok(FilterVerdict::Reject { reason }) => Status::unschedulable(reason),
            Err(e) => Status::from(e),
        }
    }
}

#[async_trait]
impl ScoreExtension for CapacityPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn score(&self, pod: &Pod, node_name: &str) -> (i64, Status) {
        let req = match convert::placement_request(pod, node_name, &self.args) {
            Ok(req) => req,
            Err(e) => return (MIN_SCORE, Status::error(e.to_string())),
        };

        match self.engine.score(&req).await {
            Ok(score) => (score, Status::success()),
            Err(e) => (MIN_SCORE, Status::from(e)),
        }
    }
}

#[async_trait]
impl ReserveExtension for CapacityPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn reserve(&self, pod: &Pod, node_name: &str) -> Status {
        let req = match convert::placement_request(pod, node_name, &self.args) {
            Ok(req) => req,
            Err(e) => return Status::error(e.to_string()),
        };

        match self.engine.reserve(&req).await {
            Ok(()) => Status::success(),
            Err(e) => Status::from(e),
        }
    }

    async fn unreserve(&self, pod: &Pod, node_name: &str) {
        let req = match convert::placement_request(pod, node_name, &self.args) {
            Ok(req) => req,
            Err(e) => {
                warn!("Unreserve skipped, pod could not be converted: {}", e);
                return;
            }
        };
        self.engine.unreserve(&req).await;
    }
}

#[async_trait]
impl PostBindExtension for CapacityPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn post_bind(&self, pod: &Pod, node_name: &str) {
        let req = match convert::placement_request(pod, node_name, &self.args) {
            Ok(req) => req,
            Err(e) => {
                warn!("Post-bind commit skipped, pod could not be converted: {}", e);
                return;
            }
        };

        // The bind already happened; a failed commit only delays reclamation
        // until the registry's expiry sweep.
        if let Err(e) = self.engine.commit(&req).await {
            warn!(
                "Commit for {} on {} failed: {}",
                req.pod, node_name, e
            );
        }
    }
}
