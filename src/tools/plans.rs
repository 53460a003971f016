//! Plan management tools

use rmcp::handler::server::wrapper::Parameters;
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, Json, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::server::CommvaultServer;
use crate::tools::tool_error;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlanIdRequest {
    /// The plan id to retrieve properties for.
    pub plan_id: String,
}

#[tool_router(router = router_plans, vis = "pub(crate)")]
impl CommvaultServer {
    /// Gets the list of plans in the CommCell.
    #[tool(description = "Gets the list of plans in the CommCell.")]
    async fn get_plan_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "v4/plan/summary", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving plan list", e))?;
        Ok(Json(response))
    }

    /// Gets properties for a given plan id.
    #[tool(description = "Gets properties for a given plan id.")]
    async fn get_plan_properties(
        &self,
        Parameters(req): Parameters<PlanIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("v4/plan/summary/{}", req.plan_id),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error retrieving plan properties", e))?;
        Ok(Json(response))
    }
}
