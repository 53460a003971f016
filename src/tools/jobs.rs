//! Job management tools

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
pub struct JobIdRequest {
    /// The ID of the job.
    pub job_id: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SuspendJobRequest {
    /// The ID of the job to suspend.
    pub job_id: i64,
    /// The reason for suspending the job. Optional.
    #[serde(default)]
    pub reason: String,
}

fn default_lookup_window() -> i64 {
    86400
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct JobsListRequest {
    /// The time window in seconds to look up for jobs. For example, 86400
    /// for the last 24 hours.
    #[serde(rename = "jobLookupWindow", default = "default_lookup_window")]
    pub job_lookup_window: i64,
    /// The job types to filter by. Multiple types can be provided,
    /// comma-separated. If not used, returns backup jobs. Examples: Backup,
    /// Restore, AUXCOPY, SNAPBACKUP, WORKFLOW, SYNTHFULL.
    #[serde(default)]
    pub job_filter: String,
    /// The job status to filter by. Valid values are: Active, Finished, All
    #[serde(default = "default_job_status")]
    pub job_status: String,
    /// The client id to filter jobs by. Not mandatory. If not provided,
    /// jobs for all clients will be returned.
    #[serde(default)]
    pub client_id: Option<String>,
    /// The maximum number of jobs to return. Default is 50.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// The offset for pagination.
    #[serde(default)]
    pub offset: i64,
}

fn default_job_status() -> String {
    "All".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FailedJobsRequest {
    /// The time window in seconds to look up for jobs. For example, 86400
    /// for the last 24 hours.
    #[serde(rename = "jobLookupWindow", default = "default_lookup_window")]
    pub job_lookup_window: i64,
    /// The maximum number of jobs to return. Default is 50.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// The offset for pagination.
    #[serde(default)]
    pub offset: i64,
}

#[tool_router(router = router_jobs, vis = "pub(crate)")]
impl CommvaultServer {
    /// Gets complete details about a job for a given job id.
    #[tool(description = "Gets complete details about a job for a given job id.")]
    async fn get_job_detail(
        &self,
        Parameters(req): Parameters<JobIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(&caller, &format!("Job/{}", req.job_id), Vec::new())
            .await
            .map_err(|e| tool_error("Error getting job detail", e))?;
        let job = response
            .get("jobs")
            .and_then(Value::as_array)
            .and_then(|jobs| jobs.first())
            .cloned()
            .ok_or_else(|| format!("No job found with ID: {}", req.job_id))?;
        Ok(Json(job))
    }

    /// Suspends/pauses the job with the given job id.
    #[tool(description = "Suspends/pauses the job with the given job id.")]
    async fn suspend_job(
        &self,
        Parameters(req): Parameters<SuspendJobRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let payload = json!({
            "message": 1,
            "jobOpReq": {
                "operationType": 0,
                "jobs": [{ "jobId": req.job_id }]
            },
            "operationDescription": req.reason,
        });
        let response = self
            .client()
            .post(&caller, "Jobs/MultiJobOperation", Some(payload), Vec::new())
            .await
            .map_err(|e| tool_error("Error suspending job", e))?;
        Ok(Json(response))
    }

    /// Resumes the job with the given job id.
    #[tool(description = "Resumes the job with the given job id.")]
    async fn resume_job(
        &self,
        Parameters(req): Parameters<JobIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .post(
                &caller,
                &format!("Job/{}/Action/Resume", req.job_id),
                Some(json!({})),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error resuming job", e))?;
        Ok(Json(response))
    }

    /// Resubmits the job with the given job id.
    #[tool(description = "Resubmits the job with the given job id.")]
    async fn resubmit_job(
        &self,
        Parameters(req): Parameters<JobIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .post(
                &caller,
                &format!("Job/{}/Action/Resubmit", req.job_id),
                Some(json!({})),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error resubmitting job", e))?;
        Ok(Json(response))
    }

    /// Kills the job with the given job id.
    #[tool(description = "Kills the job with the given job id.")]
    async fn kill_job(
        &self,
        Parameters(req): Parameters<JobIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .post(
                &caller,
                &format!("Job/{}/Action/Kill", req.job_id),
                Some(json!({})),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error killing job", e))?;
        Ok(Json(response))
    }

    /// Gets the list of jobs filtered by job type/status/clientId in a
    /// given lookup window.
    #[tool(
        description = "Gets the list of jobs filtered by job type/status/clientId in a given jobLookupWindow."
    )]
    async fn get_jobs_list(
        &self,
        Parameters(req): Parameters<JobsListRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let mut params = vec![
            ("jobCategory".to_string(), req.job_status),
            (
                "completedJobLookupTime".to_string(),
                req.job_lookup_window.to_string(),
            ),
            ("limit".to_string(), req.limit.to_string()),
            ("offset".to_string(), req.offset.to_string()),
        ];
        if !req.job_filter.is_empty() {
            params.push(("jobFilter".to_string(), req.job_filter));
        }
        if let Some(client_id) = req.client_id {
            params.push(("clientId".to_string(), client_id));
        }
        let response = self
            .client()
            .get(&caller, "Job", params)
            .await
            .map_err(|e| tool_error("Error retrieving jobs by job type", e))?;
        Ok(Json(filters::basic_job_details(&response)))
    }

    /// Gets the list of failed jobs in a given lookup window.
    #[tool(description = "Gets the list of failed jobs in a given jobLookupWindow.")]
    async fn get_failed_jobs(
        &self,
        Parameters(req): Parameters<FailedJobsRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let payload = json!({
            "category": 0,
            "pagingConfig": {
                "offset": req.offset,
                "limit": req.limit
            },
            "jobFilter": {
                "completedJobLookupTime": req.job_lookup_window,
                "showAgedJobs": false,
                "statusList": ["Failed"]
            }
        });
        let response = self
            .client()
            .post(&caller, "Jobs", Some(payload), Vec::new())
            .await
            .map_err(|e| tool_error("Error retrieving failed jobs", e))?;
        Ok(Json(filters::basic_job_details(&response)))
    }

    /// Gets task details for a given job ID.
    #[tool(description = "Gets task details for a given job ID.")]
    async fn get_job_task_details(
        &self,
        Parameters(req): Parameters<JobIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("Job/{}/taskdetails", req.job_id),
                Vec::new(),
            )
            .await
            .map_err(|e| tool_error("Error retrieving job task details", e))?;
        Ok(Json(response))
    }

    /// Gets retention info for a given job ID.
    #[tool(description = "Gets retention info for a given job ID.")]
    async fn get_retention_info_of_a_job(
        &self,
        Parameters(req): Parameters<JobIdRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<Json<Value>, String> {
        let caller = self.caller(&context);
        let response = self
            .client()
            .get(
                &caller,
                &format!("Job/{}/advanceddetails", req.job_id),
                vec![("infoType".to_string(), "1".to_string())],
            )
            .await
            .map_err(|e| tool_error("Error retrieving retention info", e))?;
        Ok(Json(response))
    }
}
