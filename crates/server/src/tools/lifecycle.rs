//! sw_install and sw_activate tool implementations.
//!
//! Fire the worker's install and activate lifecycle triggers on demand.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use swcache_client::{ActivationReport, InstallReport, ServiceWorker, WorkerState};

use crate::error::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallOutput {
    /// Worker state after the install.
    pub state: WorkerState,
    pub report: InstallReport,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ActivateOutput {
    /// Worker state after the activation.
    pub state: WorkerState,
    pub report: ActivationReport,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    json_result(&InstallOutput { state: worker.state().await, report })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&ActivateOutput { state: worker.state().await, report })
}
