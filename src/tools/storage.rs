//! Storage infrastructure tools

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
pub struct StoragePolicyIdRequest {
    /// The storage policy id.
    pub storage_policy_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StoragePolicyCopyRequest {
    /// The storage policy id.
    pub storage_policy_id: String,
    /// The copy id.
    pub copy_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LibraryIdRequest {
    /// The library id to retrieve properties for.
    pub library_id: String,
}

#[tool_router(router = router_storage, vis = "pub(crate)")]
impl CommvaultServer {
    /// Gets the list of storage policies in the CommCell.
    #[tool(description = "Gets the list of storage policies in the CommCell.")]
    async fn get_storage_policy_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "V2/StoragePolicy", Vec::new())
            .await
            .map_err(|e| tool_error("Error getting storage policy list", e))?;
        Ok(Json(response))
    }

    /// Gets storage policy properties for a given storage policy id.
    #[tool(description = "Gets storage policy properties for a given storage policy id.")]
    async fn get_storage_policy_properties(
        &self,
        Parameters(req): Parameters<StoragePolicyIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("V2/StoragePolicy/{}", req.storage_policy_id),
                vec![("propertyLevel".to_string(), "10".to_string())],
            )
            .await
            .map_err(|e| tool_error("Error getting storage policy properties", e))?;
        Ok(Json(response))
    }

    /// Gets storage policy copy details for a given storage policy id and
    /// copy id.
    #[tool(
        description = "Gets storage policy copy details for a given storage policy id and copy id."
    )]
    async fn get_storage_policy_copy_details(
        &self,
        Parameters(req): Parameters<StoragePolicyCopyRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!(
                    "V2/StoragePolicy/{}/Copy/{}",
                    req.storage_policy_id, req.copy_id
                ),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error getting storage policy copy details", e))?;
        Ok(Json(response))
    }

    /// Gets the size of a storage policy copy.
    #[tool(description = "Gets the size of a storage policy copy.")]
    async fn get_storage_policy_copy_size(
        &self,
        Parameters(req): Parameters<StoragePolicyCopyRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!(
                    "V2/StoragePolicy/{}/Copy/{}/Size",
                    req.storage_policy_id, req.copy_id
                ),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error getting storage policy copy size", e))?;
        Ok(Json(response))
    }

    /// Gets the list of libraries in the CommCell.
    #[tool(description = "Gets the list of libraries in the CommCell.")]
    async fn get_library_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                "V2/Library",
                vec![("propertyLevel".to_string(), "10".to_string())],
            )
            .await
            .map_err(|e| tool_error("Error getting library list", e))?;
        Ok(Json(response))
    }

    /// Gets properties for a given library id.
    #[tool(description = "Gets properties for a given library id.")]
    async fn get_library_properties(
        &self,
        Parameters(req): Parameters<LibraryIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, &format!("V2/Library/{}", req.library_id), Vec::new())
            .await
            .map_err(|e| tool_error("Error getting library properties", e))?;
        Ok(Json(response))
    }

    /// Gets the list of storage pools in the CommCell.
    #[tool(description = "Gets the list of storage pools in the CommCell.")]
    async fn get_storage_pool_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "StoragePool", Vec::new())
            .await
            .map_err(|e| tool_error("Error getting storage pool list", e))?;
        Ok(Json(filters::filter_storage_pools(&response)))
    }

    /// Gets the list of media agents in the CommCell.
    #[tool(description = "Gets the list of media agents in the CommCell.")]
    async fn get_mediaagent_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "MediaAgent", Vec::new())
            .await
            .map_err(|e| tool_error("Error getting media agent list", e))?;
        Ok(Json(response))
    }
}
