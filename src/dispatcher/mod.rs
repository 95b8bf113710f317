//! Agent/Tool Dispatcher (spec §4.9): a registry of named capabilities,
//! uniformly role-gated and optionally idempotent, invoked via
//! [`ToolDispatcher::call_tool`]. The dispatcher itself is stateless; all
//! state lives in the handlers' own dependencies and in the idempotency
//! store.

mod tools;

pub use tools::register_default_tools;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CellarError, Result};
use crate::storage::repository::IdempotencyRepository;

/// Role label handed down by the collaborator after it has done its own
/// authentication (§6: "the core is handed a validated role label").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Crew,
    Admin,
}

/// `{dry_run, confirm, idempotency_key}` (§6 "Mutation protocol").
/// `dry_run` defaults to `true`, matching the spec's agent-dispatched
/// default.
#[derive(Debug, Clone)]
pub struct ToolCallOptions {
    pub dry_run: bool,
    pub confirm: bool,
    pub idempotency_key: Option<String>,
}

impl Default for ToolCallOptions {
    fn default() -> Self {
        Self { dry_run: true, confirm: false, idempotency_key: None }
    }
}

const MIN_IDEMPOTENCY_KEY_LEN: usize = 16;

/// A handler executes a single capability. `dry_run` lets the handler
/// simulate the mutation (e.g. compute the resulting stock level) without
/// touching persistent state.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, params: serde_json::Value, dry_run: bool) -> Result<serde_json::Value>;
}

/// Registered capability metadata (§4.9): `{name, description, mutating,
/// allowed_roles, require_idempotency, handler}`. Parameter schema
/// validation is delegated to the handler itself, which is free to reject
/// malformed `params` with [`CellarError::Validation`].
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub mutating: bool,
    pub allowed_roles: Vec<Role>,
    pub require_idempotency: bool,
    pub handler: Arc<dyn ToolHandler>,
}

/// Registry plus the `callTool` algorithm. Stateless beyond the registry
/// map and a handle to the idempotency store (§5 "The Agent Dispatcher is
/// stateless").
#[derive(Clone)]
pub struct ToolDispatcher {
    tools: Arc<HashMap<String, ToolDefinition>>,
    idempotency: Arc<IdempotencyRepository>,
}

pub struct ToolDispatcherBuilder {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolDispatcherBuilder {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    pub fn build(self, idempotency: Arc<IdempotencyRepository>) -> ToolDispatcher {
        ToolDispatcher { tools: Arc::new(self.tools), idempotency }
    }
}

impl Default for ToolDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolDispatcher {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// `callTool(name, params, services, userRole, options)` (§4.9), steps
    /// 1-6. `services` is implicit: each handler closes over whatever
    /// repositories/engines it needs at registration time.
    pub async fn call_tool(
        &self,
        name: &str,
        params: serde_json::Value,
        actor: &str,
        role: Role,
        options: ToolCallOptions,
    ) -> Result<serde_json::Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CellarError::not_found(format!("tool '{name}'")))?;

        if !tool.allowed_roles.contains(&role) {
            return Err(CellarError::authorization(format!(
                "role {role:?} may not call tool '{name}'"
            )));
        }

        if tool.mutating && !options.dry_run && !options.confirm {
            return Err(CellarError::authorization(format!(
                "tool '{name}' mutates state; confirm=true is required when dry_run=false"
            )));
        }

        if tool.require_idempotency && !options.dry_run {
            let key = options.idempotency_key.as_deref().unwrap_or("");
            if key.len() < MIN_IDEMPOTENCY_KEY_LEN {
                return Err(CellarError::authorization(format!(
                    "tool '{name}' requires an idempotency_key of at least {MIN_IDEMPOTENCY_KEY_LEN} characters"
                )));
            }

            if let Some(cached) = self.idempotency.lookup(name, key, actor).await? {
                tracing::debug!(tool = name, actor, "idempotency replay, handler not invoked");
                return Ok(cached);
            }

            let result = tool.handler.call(params, options.dry_run).await?;
            self.idempotency.record(name, key, actor, &result).await?;
            return Ok(result);
        }

        tool.handler.call(params, options.dry_run).await
    }
}
