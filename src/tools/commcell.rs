//! CommCell-level dashboard and maintenance tools

use rmcp::handler::server::wrapper::Parameters;
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, Json, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::filters;
use crate::server::CommvaultServer;
use crate::tools::tool_error;

/// Report dataset backing the storage space utilization dashboard.
const STORAGE_UTILIZATION_DATASET: &str =
    "cr/reportsplusengine/datasets/2b366703-52e1-4775-8047-1f4cfa13d2db/data?cache=true&parameter.i_dashboardtype=commcell&orderby='date to be full'&datasource=2";

/// Report dataset with CommServe version and platform details.
const COMMCELL_DETAILS_DATASET: &str =
    "cr/reportsplusengine/datasets/a0f077a5-2dfe-4010-a957-57a24cae89a8/data";

/// Report dataset with per-entity counts (clients, agents, policies, ...).
const ENTITY_COUNTS_DATASET: &str =
    "cr/reportsplusengine/datasets/d0a73c45-b06d-4358-8d7e-d55d428ba75c/data?cache=true&parameter.i_dashboardtype=commcell&datasource=2";

/// Report dataset with SLA counts.
const SLA_COUNTS_DATASET: &str =
    "cr/reportsplusengine/datasets/getslacounts/data?cache=true&parameter.i_dashboardtype=commcell&datasource=2";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendLogsRequest {
    /// The email id to send logs to.
    pub emailid: String,
    /// The commcell name for which to send logs.
    pub commcell_name: String,
}

#[tool_router(router = router_commcell, vis = "pub(crate)")]
impl CommvaultServer {
    /// Gets the backup SLA status of the CommCell.
    #[tool(
        description = "Gets the backup SLA status of the CommCell, including the SLA percentage."
    )]
    async fn get_sla_status(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, SLA_COUNTS_DATASET, Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving SLA status", e))?;
        let transformed = filters::transform_sla_data(&response)
            .map_err(|e| tool_error("Error transforming SLA data", e))?;
        Ok(Json(transformed))
    }

    /// Gets the security posture of the CommCell.
    #[tool(description = "Gets the security posture of the CommCell.")]
    async fn get_security_posture(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "Security/Dashboard", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving security posture", e))?;
        Ok(Json(response))
    }

    /// Gets the security score of the CommCell.
    #[tool(
        description = "Gets the security score of the CommCell as a percentage of passing security parameters."
    )]
    async fn get_security_score(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, "Security/Dashboard", Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving security score", e))?;
        let score = filters::compute_security_score(&response)
            .map_err(|e| tool_error("Error computing security score", e))?;
        Ok(Json(json!({ "securityScore": score })))
    }

    /// Gets storage space utilization details for the CommCell.
    #[tool(description = "Gets storage space utilization details for the CommCell.")]
    async fn get_storage_space_utilization(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, STORAGE_UTILIZATION_DATASET, Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving storage space utilization", e))?;
        Ok(Json(filters::format_report_dataset(&response)))
    }

    /// Gets details about the CommCell (version, platform, ...).
    #[tool(description = "Gets details about the CommCell.")]
    async fn get_commcell_details(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, COMMCELL_DETAILS_DATASET, Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving commcell details", e))?;
        Ok(Json(filters::format_report_dataset(&response)))
    }

    /// Gets entity counts (clients, servers, users, ...) for the CommCell.
    #[tool(description = "Gets entity counts for the CommCell.")]
    async fn get_entity_counts(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, ENTITY_COUNTS_DATASET, Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving entity counts", e))?;
        Ok(Json(filters::format_report_dataset(&response)))
    }

    /// Triggers a send-logs job for the specified CommCell and emails the
    /// logs to the provided address.
    #[tool(
        description = "Triggers a new send logs job for the specified CommCell and sends logs to the provided email address. If successful, returns the job ID of the created send logs job."
    )]
    async fn create_send_logs_job_for_commcell(
        &self,
        Parameters(req): Parameters<SendLogsRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let payload = json!({
            "taskInfo": {
                "task": {
                    "taskType": 1,
                    "initiatedFrom": 1,
                    "policyType": 0,
                    "taskFlags": { "disabled": false }
                },
                "subTasks": [
                    {
                        "subTask": { "subTaskType": 1, "operationType": 5010 },
                        "options": {
                            "adminOpts": {
                                "sendLogFilesOption": {
                                    "actionLogsEndJobId": 0,
                                    "emailSelected": true,
                                    "jobid": 0,
                                    "tsDatabase": false,
                                    "galaxyLogs": true,
                                    "getLatestUpdates": false,
                                    "actionLogsStartJobId": 0,
                                    "computersSelected": true,
                                    "csDatabase": false,
                                    "otherDatabases": false,
                                    "crashDump": false,
                                    "isNetworkPath": false,
                                    "saveToFolderSelected": false,
                                    "notifyMe": true,
                                    "includeJobResults": false,
                                    "doNotIncludeLogs": true,
                                    "machineInformation": true,
                                    "scrubLogFiles": false,
                                    "emailSubject": "Your CommCell Logs",
                                    "osLogs": true,
                                    "allUsersProfile": true,
                                    "splitFileSizeMB": 512,
                                    "actionLogs": false,
                                    "includeIndex": false,
                                    "databaseLogs": true,
                                    "includeDCDB": false,
                                    "collectHyperScale": false,
                                    "logFragments": false,
                                    "uploadLogsSelected": true,
                                    "useDefaultUploadOption": true,
                                    "enableChunking": true,
                                    "collectRFC": false,
                                    "collectUserAppLogs": false,
                                    "impersonateUser": { "useImpersonation": false },
                                    "clients": [
                                        { "clientId": 2, "clientName": req.commcell_name }
                                    ],
                                    "recipientCc": {
                                        "emailids": [req.emailid],
                                        "users": [],
                                        "userGroups": []
                                    },
                                    "sendLogsOnJobCompletion": false
                                }
                            }
                        }
                    }
                ]
            }
        });
        let response = self
            .client()
            .post(&caller, "createtask", Some(payload), Vec::new())
            .await
            .map_err(|e| tool_error("Error creating send logs job for commcell", e))?;
        Ok(Json(response))
    }
}
