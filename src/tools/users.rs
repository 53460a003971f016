//! User, user group, role, and security association tools

use rmcp::handler::server::wrapper::Parameters;
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, Json, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::filters;
use crate::server::CommvaultServer;
use crate::tools::tool_error;

/// Security association entity type codes used by the `Security` endpoint.
fn entity_type_code(entity_type: &str) -> Option<i64> {
    match entity_type {
        "client" => Some(3),
        "client_group" => Some(28),
        "agent" => Some(4),
        "instance" => Some(5),
        "backup_set" => Some(6),
        "subclient" => Some(7),
        "storage_policy" => Some(17),
        "schedule_policy" => Some(35),
        "alert" => Some(64),
        "workflow" => Some(83),
        "plan" => Some(158),
        _ => None,
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserIdRequest {
    /// The user id to retrieve properties for.
    pub user_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetUserEnabledRequest {
    /// The user id to enable or disable.
    pub user_id: String,
    /// Set to true to enable the user, false to disable.
    pub enabled: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserGroupIdRequest {
    /// The user group id to retrieve properties for.
    pub user_group_id: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserGroupAssignmentRequest {
    /// The user id to assign to the user group.
    pub user_id: String,
    /// The user group id to assign the user to.
    pub user_group_id: String,
    /// Set to true to assign the user to the group, false to remove the
    /// user from the group.
    #[serde(default = "default_true")]
    pub assign: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AssociatedEntitiesRequest {
    /// The user or user group id to retrieve associated entities for.
    pub id: String,
    /// Specify 'user' for user id or 'usergroup' for user group id.
    pub r#type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EntityPermissionsRequest {
    /// The type of entity to view permissions for. Valid values are:
    /// COMMCELL_ENTITY, CLIENT_ENTITY, INSTANCE_ENTITY, BACKUPSET_ENTITY,
    /// SUBCLIENT_ENTITY, CLIENT_GROUP_ENTITY, USER_ENTITY,
    /// USERGROUP_ENTITY, LIBRARY_ENTITY, STORAGE_POLICY_ENTITY,
    /// STORAGE_POLICY_COPY_ENTITY, SUBCLIENT_POLICY_ENTITY.
    pub entity_type: String,
    /// The ID of the entity to view permissions for.
    pub entity_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GrantRevokeAccessRequest {
    /// The ID of the entity to grant access to.
    pub entity_id: String,
    /// The type of the entity to grant access to. Valid values: 'client',
    /// 'client_group', 'agent', 'instance', 'backup_set', 'subclient',
    /// 'storage_policy', 'schedule_policy', 'alert', 'workflow', 'plan'.
    pub entity_type: String,
    /// The role ID to assign. You can get the role ID using the
    /// get_roles_list tool or ask the user to provide it.
    pub role_id: i64,
    /// The user ID to grant access to.
    pub user_id: String,
    /// Set to true to grant access, false to revoke access. Default is
    /// true.
    #[serde(default = "default_true")]
    pub assign: bool,
}

#[tool_router(router = router_users, vis = "pub(crate)")]
impl CommvaultServer {
    /// Gets the list of users in the CommCell.
    #[tool(description = "Gets the list of users in the CommCell.")]
    async fn get_users_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "v4/user", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving user list", e))?;
        Ok(Json(filters::filter_users(&response)))
    }

    /// Gets properties for a given user id.
    #[tool(description = "Gets properties for a given user id.")]
    async fn get_user_properties(
        &self,
        Parameters(req): Parameters<UserIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, &format!("v4/user/{}", req.user_id), Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving user properties", e))?;
        Ok(Json(response))
    }

    /// Enables or disables a user based on the 'enabled' flag.
    #[tool(
        description = "Enables or disables a user with the given user id based on the 'enabled' flag."
    )]
    async fn set_user_enabled(
        &self,
        Parameters(req): Parameters<SetUserEnabledRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let action = if req.enabled { "enable" } else { "disable" };
        let response = self
            .client()
            .put(
                &caller,
                &format!("user/{}/{action}", req.user_id),
                None,
            )
            .await
            .map_err(|e| tool_error("Error setting user enabled state", e))?;

        let first = response
            .get("response")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .cloned()
            .unwrap_or(Value::Null);
        let error_code = first.get("errorCode").and_then(Value::as_i64).unwrap_or(-1);
        if error_code == 0 {
            Ok(Json(json!({ "message": format!("User {action}d successfully.") })))
        } else {
            let message = first
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error occurred.");
            Err(format!("Failed to {action} user: {message}"))
        }
    }

    /// Gets the list of user groups in the CommCell.
    #[tool(description = "Gets the list of user groups in the CommCell.")]
    async fn get_user_groups_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "v4/usergroup", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving user group list", e))?;
        Ok(Json(filters::filter_user_groups(&response)))
    }

    /// Gets properties for a given user group id.
    #[tool(description = "Gets properties for a given user group id.")]
    async fn get_user_group_properties(
        &self,
        Parameters(req): Parameters<UserGroupIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("v4/usergroup/{}", req.user_group_id),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error retrieving user group properties", e))?;
        Ok(Json(response))
    }

    /// Assigns or removes a user from a user group based on the 'assign'
    /// flag.
    #[tool(
        description = "Assigns or removes a user from a user group. Set assign=true to add the user to the group, or assign=false to remove the user from the group."
    )]
    async fn set_user_group_assignment(
        &self,
        Parameters(req): Parameters<UserGroupAssignmentRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let operation = if req.assign { "ADD" } else { "DELETE" };
        let payload = json!({
            "userGroupOperation": operation,
            "userGroups": [{ "id": req.user_group_id }],
        });
        let response = self
            .client()
            .put(&caller, &format!("v4/user/{}", req.user_id), Some(payload))
            .await
            .map_err(|e| tool_error("Error assigning user to user group", e))?;
        Ok(Json(response))
    }

    /// Gets associated entities (roles and permissions per entity) for a
    /// user or user group id.
    #[tool(
        description = "Gets the associated entities (roles and permissions for each entity) for a given user or user group id."
    )]
    async fn get_associated_entities_for_user_or_user_group(
        &self,
        Parameters(req): Parameters<AssociatedEntitiesRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("{}/{}/security", req.r#type.to_lowercase(), req.id),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error retrieving associated entities", e))?;
        Ok(Json(response))
    }

    /// Retrieves permissions the user has for a specific entity type and
    /// ID.
    #[tool(description = "Retrieves permissions the user has for a specific entity type and ID.")]
    async fn view_entity_permissions(
        &self,
        Parameters(req): Parameters<EntityPermissionsRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!(
                    "Security/{}/{}/Permissions",
                    req.entity_type, req.entity_id
                ),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error retrieving entity permissions", e))?;
        Ok(Json(response))
    }

    /// Grants or revokes access to an entity for a user with a specific
    /// role.
    #[tool(
        description = "Grants or revokes access to an entity for a user with a specific role."
    )]
    async fn grant_or_revoke_access_to_entity(
        &self,
        Parameters(req): Parameters<GrantRevokeAccessRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let entity_type = req.entity_type.to_lowercase();
        let Some(type_code) = entity_type_code(&entity_type) else {
            return Err(format!("Invalid entity_type: {}", req.entity_type));
        };
        // Plan associations use a different _type_ discriminator.
        let type_discriminator = if entity_type == "plan" { 150 } else { type_code };
        let payload = json!({
            "entityAssociated": {
                "entity": [
                    {
                        "entityType": type_code,
                        "_type_": type_discriminator,
                        "entityId": req.entity_id
                    }
                ]
            },
            "securityAssociations": {
                "associationsOperationType": if req.assign { "ADD" } else { "DELETE" },
                "associations": [
                    {
                        "userOrGroup": [{ "userId": req.user_id }],
                        "properties": {
                            "role": { "roleId": req.role_id }
                        }
                    }
                ]
            }
        });
        let response = self
            .client()
            .post(&caller, "Security", Some(payload), Vec::new())
            .await
            .map_err(|e| tool_error("Error granting/revoking access to entity", e))?;
        Ok(Json(response))
    }

    /// Gets the list of roles in the CommCell.
    #[tool(description = "Gets the list of roles in the CommCell.")]
    async fn get_roles_list(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "v4/role", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving roles list", e))?;
        Ok(Json(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_codes_match_security_endpoint() {
        assert_eq!(entity_type_code("client"), Some(3));
        assert_eq!(entity_type_code("client_group"), Some(28));
        assert_eq!(entity_type_code("plan"), Some(158));
        assert_eq!(entity_type_code("nonsense"), None);
    }
}
