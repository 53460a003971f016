//! Schedule management tools

use rmcp::handler::server::wrapper::Parameters;
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, Json, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::filters;
use crate::server::CommvaultServer;
use crate::tools::tool_error;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScheduleIdRequest {
    /// The schedule id.
    pub schedule_id: String,
}

#[tool_router(router = router_schedules, vis = "pub(crate)")]
impl CommvaultServer {
    /// Gets the list of schedule policies in the CommCell.
    #[tool(description = "Gets the list of schedule policies in the CommCell.")]
    async fn get_schedules_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "Schedules", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving schedules list", e))?;
        Ok(Json(filters::filter_schedules(&response)))
    }

    /// Gets properties for a given schedule id.
    #[tool(description = "Gets properties for a given schedule id.")]
    async fn get_schedule_properties(
        &self,
        Parameters(req): Parameters<ScheduleIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("Schedule/{}", req.schedule_id),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error retrieving schedule properties", e))?;
        Ok(Json(response))
    }

    /// Enables the schedule with the given schedule id.
    #[tool(description = "Enables the schedule with the given schedule id.")]
    async fn enable_schedule(
        &self,
        Parameters(req): Parameters<ScheduleIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .post(
                &caller,
                "Schedules/task/Action/Enable",
                Some(json!({ "taskId": req.schedule_id })),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error enabling schedule", e))?;
        Ok(Json(response))
    }

    /// Disables the schedule with the given schedule id.
    #[tool(description = "Disables the schedule with the given schedule id.")]
    async fn disable_schedule(
        &self,
        Parameters(req): Parameters<ScheduleIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .post(
                &caller,
                "Schedules/task/Action/Disable",
                Some(json!({ "taskId": req.schedule_id })),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error disabling schedule", e))?;
        Ok(Json(response))
    }
}
