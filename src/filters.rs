//! Response projections for tool output
//!
//! The Command Center API returns deeply nested payloads; these helpers
//! project them down to the handful of fields an LLM actually needs. All
//! functions are pure transformations over `serde_json::Value` — absent
//! fields become `null` rather than errors, since payload shape varies
//! across product versions.

use serde_json::{json, Map, Value};

use crate::error::{CvMcpError, Result};

fn field(value: &Value, key: &str) -> Value {
    value.get(key).cloned().unwrap_or(Value::Null)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Extracts minimal, LLM-friendly job details from a jobs response.
pub fn basic_job_details(response: &Value) -> Value {
    let jobs: Vec<Value> = array(response, "jobs")
        .iter()
        .map(|job| {
            let summary = job.get("jobSummary").cloned().unwrap_or(Value::Null);
            json!({
                "jobId": field(&summary, "jobId"),
                "status": field(&summary, "status"),
                "jobType": field(&summary, "jobType"),
                "backupLevelName": field(&summary, "backupLevelName"),
                "jobStartTime": field(&summary, "jobStartTime"),
                "jobEndTime": field(&summary, "jobEndTime"),
                "clientName": summary
                    .get("destinationClient")
                    .map(|c| field(c, "clientName"))
                    .unwrap_or(Value::Null),
                "storagePolicyName": summary
                    .get("storagePolicy")
                    .map(|p| field(p, "storagePolicyName"))
                    .unwrap_or(Value::Null),
            })
        })
        .collect();

    json!({
        "totalJobsAvailable": response
            .get("totalRecordsWithoutPaging")
            .cloned()
            .unwrap_or(json!(0)),
        "jobsInThisResponse": jobs,
    })
}

/// Extracts minimal client group details from a client group list response.
pub fn basic_client_group_details(response: &Value) -> Value {
    let groups: Vec<Value> = array(response, "groups")
        .iter()
        .map(|group| {
            let client_group = group.get("clientGroup").cloned().unwrap_or(Value::Null);
            let entity = client_group
                .get("entityInfo")
                .cloned()
                .unwrap_or(Value::Null);
            json!({
                "clientGroupId": client_group
                    .get("clientGroupId")
                    .cloned()
                    .or_else(|| group.get("Id").cloned())
                    .unwrap_or(Value::Null),
                "clientGroupName": field(group, "name"),
                "clientCount": field(group, "clientCount"),
                "companyName": field(&entity, "companyName"),
            })
        })
        .collect();

    json!({
        "totalClientGroups": groups.len(),
        "clientGroups": groups,
    })
}

/// Filters the subclient response to the fields relevant for each subclient.
pub fn filter_subclients(response: &Value) -> Value {
    const RELEVANT_KEYS: [&str; 9] = [
        "clientName",
        "instanceName",
        "displayName",
        "backupsetId",
        "instanceId",
        "subclientId",
        "appName",
        "backupsetName",
        "subclientName",
    ];

    let subclients: Vec<Value> = array(response, "subClientProperties")
        .iter()
        .map(|subclient| {
            let entity = subclient
                .get("subClientEntity")
                .cloned()
                .unwrap_or(Value::Null);
            let filtered: Map<String, Value> = RELEVANT_KEYS
                .iter()
                .filter_map(|key| entity.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect();
            Value::Object(filtered)
        })
        .collect();

    json!({
        "subClientCount": response
            .get("filterQueryCount")
            .cloned()
            .unwrap_or(json!(0)),
        "subClients": subclients,
    })
}

/// Extracts minimal storage pool details from the storage pool list.
pub fn filter_storage_pools(response: &Value) -> Value {
    let pools: Vec<Value> = array(response, "storagePoolList")
        .iter()
        .map(|pool| {
            let entity = pool.get("storagePoolEntity").cloned().unwrap_or(Value::Null);
            let region = pool.get("region").cloned().unwrap_or(Value::Null);
            let policy = pool
                .get("storagePolicyEntity")
                .cloned()
                .unwrap_or(Value::Null);
            json!({
                "storagePoolName": field(&entity, "storagePoolName"),
                "storagePoolId": field(&entity, "storagePoolId"),
                "totalFreeSpace": field(pool, "totalFreeSpace"),
                "sizeOnDisk": field(pool, "sizeOnDisk"),
                "status": field(pool, "status"),
                "regionDisplayName": field(&region, "displayName"),
                "regionName": field(&region, "regionName"),
                "storagePolicyName": field(&policy, "storagePolicyName"),
                "storagePolicyId": field(&policy, "storagePolicyId"),
            })
        })
        .collect();

    json!({
        "storagePoolCount": pools.len(),
        "storagePools": pools,
    })
}

/// Formats a report dataset response into records keyed by column name.
pub fn format_report_dataset(response: &Value) -> Value {
    let column_names: Vec<String> = array(response, "columns")
        .iter()
        .map(|col| {
            col.get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect();

    let records: Vec<Value> = array(response, "records")
        .iter()
        .map(|record| {
            let row = record.as_array().map(Vec::as_slice).unwrap_or(&[]);
            let formatted: Map<String, Value> = column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or(Value::Null)))
                .collect();
            Value::Object(formatted)
        })
        .collect();

    json!({
        "totalRecordCount": response
            .get("totalRecordCount")
            .cloned()
            .unwrap_or(json!(0)),
        "records": records,
    })
}

/// Transforms the SLA report dataset into Met/Missed counts plus an overall
/// SLA percentage, rounded to two decimals.
///
/// Each record is a positional array where index 2 is the SLA status and
/// index 3 the current count; statuses other than `Met SLA`/`Missed SLA`
/// are ignored.
///
/// # Errors
///
/// Returns [`CvMcpError::MalformedResponse`] when a relevant record is too
/// short to carry the status and count columns.
pub fn transform_sla_data(response: &Value) -> Result<Value> {
    let mut met: i64 = 0;
    let mut missed: i64 = 0;

    for record in array(response, "records") {
        let row = record.as_array().map(Vec::as_slice).unwrap_or(&[]);
        let status = row.get(2).and_then(Value::as_str);
        match status {
            Some("Met SLA") | Some("Missed SLA") => {
                let count = row.get(3).and_then(Value::as_i64).ok_or_else(|| {
                    CvMcpError::MalformedResponse("SLA record is missing its count column".to_string())
                })?;
                if status == Some("Met SLA") {
                    met = count;
                } else {
                    missed = count;
                }
            }
            _ => continue,
        }
    }

    let total = met + missed;
    let percentage = if total > 0 {
        (met as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };

    Ok(json!({
        "Met SLA": met,
        "Missed SLA": missed,
        "SLA Percentage": percentage,
    }))
}

/// Computes the security score: the percentage of security parameters that
/// are not failing (status 2 means failure), rounded to the nearest whole
/// number.
///
/// # Errors
///
/// Returns [`CvMcpError::MalformedResponse`] when the posture contains no
/// parameters at all.
pub fn compute_security_score(response: &Value) -> Result<Value> {
    let params: Vec<&Value> = array(response, "securityCategories")
        .iter()
        .flat_map(|cat| array(cat, "parameter"))
        .collect();

    let total = params.len();
    if total == 0 {
        return Err(CvMcpError::MalformedResponse(
            "Security posture contains no parameters".to_string(),
        )
        .into());
    }

    let failures = params
        .iter()
        .filter(|p| p.get("status").and_then(Value::as_i64) == Some(2))
        .count();
    let score = ((total - failures) as f64 / total as f64 * 100.0).round() as i64;

    Ok(json!(score))
}

/// Filters the client list response down to name, id, and host name.
pub fn filter_clients(response: &Value) -> Value {
    let clients: Vec<Value> = array(response, "clientProperties")
        .iter()
        .map(|item| {
            let entity = item
                .get("client")
                .and_then(|c| c.get("clientEntity"))
                .cloned()
                .unwrap_or(Value::Null);
            json!({
                "clientName": field(&entity, "clientName"),
                "clientId": field(&entity, "clientId"),
                "hostName": field(&entity, "hostName"),
            })
        })
        .collect();

    json!({ "clients": clients })
}

/// Filters the schedules response, dropping system-created policies and
/// renaming keys to LLM-friendly names.
pub fn filter_schedules(response: &Value) -> Value {
    let policies: Vec<Value> = array(response, "taskDetail")
        .iter()
        .filter_map(|item| {
            let task = item.get("task").cloned().unwrap_or(Value::Null);
            let policy_name = task
                .get("taskName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let description = task
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            if policy_name.to_lowercase().contains("system created")
                || description.to_lowercase().contains("system created")
            {
                return None;
            }

            let schedules: Vec<Value> = array(item, "subTasks")
                .iter()
                .map(|sub| {
                    let sub_task = sub.get("subTask").cloned().unwrap_or(Value::Null);
                    json!({
                        "scheduleName": field(&sub_task, "subTaskName"),
                        "scheduleId": field(&sub_task, "subTaskId"),
                        "operationType": field(&sub_task, "operationType"),
                        "nextRunTime": field(sub, "nextScheduleTime"),
                    })
                })
                .collect();

            Some(json!({
                "policyName": policy_name,
                "policyId": field(&task, "taskId"),
                "description": description,
                "schedules": schedules,
            }))
        })
        .collect();

    json!({
        "totalPolicies": policies.len(),
        "policies": policies,
    })
}

/// Filters the v4 user list to id, name, email, and enabled state.
pub fn filter_users(response: &Value) -> Value {
    let users: Vec<Value> = array(response, "users")
        .iter()
        .map(|user| {
            json!({
                "userId": field(user, "id"),
                "userName": field(user, "name"),
                "email": field(user, "email"),
                "fullName": field(user, "fullName"),
                "enabled": field(user, "enabled"),
            })
        })
        .collect();

    json!({ "totalUsers": users.len(), "users": users })
}

/// Filters the v4 user group list to id, name, and description.
pub fn filter_user_groups(response: &Value) -> Value {
    let groups: Vec<Value> = array(response, "userGroups")
        .iter()
        .map(|group| {
            json!({
                "userGroupId": field(group, "id"),
                "userGroupName": field(group, "name"),
                "description": field(group, "description"),
            })
        })
        .collect();

    json!({ "totalUserGroups": groups.len(), "userGroups": groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_job_details_projects_summary_fields() {
        let response = json!({
            "totalRecordsWithoutPaging": 120,
            "jobs": [{
                "jobSummary": {
                    "jobId": 42,
                    "status": "Completed",
                    "jobType": "Backup",
                    "backupLevelName": "Incremental",
                    "jobStartTime": 1700000000,
                    "jobEndTime": 1700000600,
                    "destinationClient": { "clientName": "client-a" },
                    "storagePolicy": { "storagePolicyName": "policy-a" }
                }
            }]
        });

        let result = basic_job_details(&response);
        assert_eq!(result["totalJobsAvailable"], 120);
        let job = &result["jobsInThisResponse"][0];
        assert_eq!(job["jobId"], 42);
        assert_eq!(job["clientName"], "client-a");
        assert_eq!(job["storagePolicyName"], "policy-a");
    }

    #[test]
    fn test_basic_job_details_empty_response() {
        let result = basic_job_details(&json!({}));
        assert_eq!(result["totalJobsAvailable"], 0);
        assert_eq!(result["jobsInThisResponse"], json!([]));
    }

    #[test]
    fn test_basic_client_group_details_falls_back_to_top_level_id() {
        let response = json!({
            "groups": [{
                "Id": 7,
                "name": "laptops",
                "clientCount": 12,
                "clientGroup": { "entityInfo": { "companyName": "ACME" } }
            }]
        });

        let result = basic_client_group_details(&response);
        assert_eq!(result["totalClientGroups"], 1);
        let group = &result["clientGroups"][0];
        assert_eq!(group["clientGroupId"], 7);
        assert_eq!(group["clientGroupName"], "laptops");
        assert_eq!(group["companyName"], "ACME");
    }

    #[test]
    fn test_filter_subclients_keeps_only_relevant_keys() {
        let response = json!({
            "filterQueryCount": 3,
            "subClientProperties": [{
                "subClientEntity": {
                    "clientName": "client-a",
                    "subclientId": 11,
                    "subclientName": "default",
                    "internalDetail": "dropped"
                }
            }]
        });

        let result = filter_subclients(&response);
        assert_eq!(result["subClientCount"], 3);
        let subclient = &result["subClients"][0];
        assert_eq!(subclient["clientName"], "client-a");
        assert_eq!(subclient["subclientId"], 11);
        assert!(subclient.get("internalDetail").is_none());
    }

    #[test]
    fn test_format_report_dataset_zips_columns_and_records() {
        let response = json!({
            "totalRecordCount": 2,
            "columns": [{ "name": "Name" }, { "name": "Version" }],
            "records": [["cs01", "11.36"], ["cs02", "11.34"]]
        });

        let result = format_report_dataset(&response);
        assert_eq!(result["totalRecordCount"], 2);
        assert_eq!(result["records"][0]["Name"], "cs01");
        assert_eq!(result["records"][1]["Version"], "11.34");
    }

    #[test]
    fn test_transform_sla_data_computes_percentage() {
        let response = json!({
            "records": [
                ["x", "y", "Met SLA", 75],
                ["x", "y", "Missed SLA", 25],
                ["x", "y", "Excluded", 999]
            ]
        });

        let result = transform_sla_data(&response).unwrap();
        assert_eq!(result["Met SLA"], 75);
        assert_eq!(result["Missed SLA"], 25);
        assert_eq!(result["SLA Percentage"], 75.0);
    }

    #[test]
    fn test_transform_sla_data_rounds_to_two_decimals() {
        let response = json!({
            "records": [
                ["x", "y", "Met SLA", 1],
                ["x", "y", "Missed SLA", 2]
            ]
        });

        let result = transform_sla_data(&response).unwrap();
        assert_eq!(result["SLA Percentage"], 33.33);
    }

    #[test]
    fn test_transform_sla_data_no_records_is_zero_percent() {
        let result = transform_sla_data(&json!({ "records": [] })).unwrap();
        assert_eq!(result["SLA Percentage"], 0.0);
    }

    #[test]
    fn test_compute_security_score_counts_failures() {
        let response = json!({
            "securityCategories": [
                { "parameter": [{ "status": 1 }, { "status": 2 }] },
                { "parameter": [{ "status": 0 }, { "status": 2 }] }
            ]
        });

        // 2 of 4 parameters failing -> 50.
        assert_eq!(compute_security_score(&response).unwrap(), json!(50));
    }

    #[test]
    fn test_compute_security_score_empty_posture_is_error() {
        assert!(compute_security_score(&json!({})).is_err());
    }

    #[test]
    fn test_filter_clients_projects_entity_fields() {
        let response = json!({
            "clientProperties": [{
                "client": {
                    "clientEntity": {
                        "clientName": "client-a",
                        "clientId": 2,
                        "hostName": "a.example.com",
                        "clientGUID": "dropped"
                    }
                }
            }]
        });

        let result = filter_clients(&response);
        let client = &result["clients"][0];
        assert_eq!(client["clientName"], "client-a");
        assert_eq!(client["clientId"], 2);
        assert_eq!(client["hostName"], "a.example.com");
        assert!(client.get("clientGUID").is_none());
    }

    #[test]
    fn test_filter_schedules_drops_system_created_policies() {
        let response = json!({
            "taskDetail": [
                {
                    "task": { "taskName": "System Created for DDB", "taskId": 1 },
                    "subTasks": []
                },
                {
                    "task": { "taskName": "Nightly backups", "taskId": 2, "description": "" },
                    "subTasks": [{
                        "subTask": { "subTaskName": "incr", "subTaskId": 20, "operationType": 2 },
                        "nextScheduleTime": 1700003600
                    }]
                }
            ]
        });

        let result = filter_schedules(&response);
        assert_eq!(result["totalPolicies"], 1);
        let policy = &result["policies"][0];
        assert_eq!(policy["policyName"], "Nightly backups");
        assert_eq!(policy["schedules"][0]["scheduleId"], 20);
        assert_eq!(policy["schedules"][0]["nextRunTime"], 1700003600);
    }

    #[test]
    fn test_filter_users_projects_minimal_fields() {
        let response = json!({
            "users": [{
                "id": 5,
                "name": "admin",
                "email": "admin@example.com",
                "fullName": "Administrator",
                "enabled": true,
                "GUID": "dropped"
            }]
        });

        let result = filter_users(&response);
        assert_eq!(result["totalUsers"], 1);
        assert_eq!(result["users"][0]["userName"], "admin");
        assert!(result["users"][0].get("GUID").is_none());
    }

    #[test]
    fn test_filter_user_groups_projects_minimal_fields() {
        let response = json!({
            "userGroups": [{ "id": 3, "name": "operators", "description": "Ops team" }]
        });

        let result = filter_user_groups(&response);
        assert_eq!(result["totalUserGroups"], 1);
        assert_eq!(result["userGroups"][0]["userGroupName"], "operators");
    }
}
