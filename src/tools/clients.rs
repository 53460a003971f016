//! Client and subclient management tools

use rmcp::handler::server::wrapper::Parameters;
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, Json, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::filters;
use crate::server::CommvaultServer;
use crate::tools::tool_error;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClientGroupIdRequest {
    /// The client group id to retrieve properties for.
    pub client_group_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClientNameRequest {
    /// The client name to retrieve client id for.
    pub client_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubclientListRequest {
    /// The client name or ID to retrieve subclients for.
    pub client_identifier: String,
    /// Specify 'name' to use client name or 'id' to use client ID.
    pub identifier_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubclientIdRequest {
    /// The subclient id to retrieve properties for.
    pub subclient_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunBackupRequest {
    /// The subclient id to run backup for.
    pub subclient_id: String,
    /// The type of backup to run. Valid values are 'Full', 'INCREMENTAL',
    /// 'SYNTHETIC_FULL'.
    pub backup_type: String,
}

#[tool_router(router = router_clients, vis = "pub(crate)")]
impl CommvaultServer {
    /// Gets the list of client groups in the CommCell.
    #[tool(description = "Gets the list of client groups in the CommCell.")]
    async fn get_client_group_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "ClientGroup", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving client group list", e))?;
        Ok(Json(filters::basic_client_group_details(&response)))
    }

    /// Gets the list of clients in the CommCell.
    #[tool(description = "Gets the list of clients in the CommCell.")]
    async fn get_client_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "Client", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving client list", e))?;
        Ok(Json(filters::filter_clients(&response)))
    }

    /// Gets properties for a given client group id.
    #[tool(description = "Gets properties for a given client group id.")]
    async fn get_client_group_properties(
        &self,
        Parameters(req): Parameters<ClientGroupIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("ClientGroup/{}", req.client_group_id),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error getting client group properties", e))?;
        Ok(Json(response))
    }

    /// Gets client id for a given client name.
    #[tool(description = "Gets client id for a given client name.")]
    async fn get_clientid_from_clientname(
        &self,
        Parameters(req): Parameters<ClientNameRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                "getid",
                vec![("clientname".to_string(), req.client_name)],
            )
            .await
            .map_err(|e| tool_error("Error retrieving client id", e))?;
        Ok(Json(response))
    }

    /// Gets the subclient list for a given client name or client id.
    #[tool(description = "Gets subclient list for a given client name or client id.")]
    async fn get_subclient_list(
        &self,
        Parameters(req): Parameters<SubclientListRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let params = match req.identifier_type.as_str() {
            "name" => vec![("clientName".to_string(), req.client_identifier)],
            "id" => vec![("clientId".to_string(), req.client_identifier)],
            other => {
                return Err(format!(
                    "identifier_type must be 'name' or 'id', got {other:?}"
                ))
            }
        };
        let response = self
            .client()
            .get(&caller, "subclient", params)
            .await
            .map_err(|e| tool_error("Error getting subclient list", e))?;
        Ok(Json(filters::filter_subclients(&response)))
    }

    /// Gets properties for a given subclient id.
    #[tool(description = "Gets properties for a given subclient id.")]
    async fn get_subclient_properties(
        &self,
        Parameters(req): Parameters<SubclientIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("subclient/{}", req.subclient_id),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error getting subclient properties", e))?;
        Ok(Json(response))
    }

    /// Runs a backup job for the specified subclient with the given backup
    /// type.
    #[tool(
        description = "Runs a backup job for the specified subclient with the given backup type."
    )]
    async fn run_backup_for_subclient(
        &self,
        Parameters(req): Parameters<RunBackupRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .post(
                &caller,
                &format!("subclient/{}/action/backup", req.subclient_id),
                None,
                vec![("backupLevel".to_string(), req.backup_type)],
            )
            .await
            .map_err(|e| tool_error("Error running backup for subclient", e))?;
        Ok(Json(response))
    }
}
