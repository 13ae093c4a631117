//! Records returned by the history server's v1 REST API.
//!
//! Field names follow the service's camelCase JSON. Anything older service
//! versions leave out is optional or defaulted, so partial responses still
//! decode.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decode::history_time;

/// `GET /applications/{appId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

impl ApplicationSummary {
    /// The attempt with the latest start time. Ties go to the attempt listed
    /// first by the server.
    pub fn latest_attempt(&self) -> Option<&Attempt> {
        self.attempts.iter().fold(None, |best, a| match best {
            Some(b) if b.start_time >= a.start_time => Some(b),
            _ => Some(a),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// Present only when the application ran in cluster mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
    #[serde(with = "history_time")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "history_time::option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, with = "history_time::option")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub spark_user: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub app_spark_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// `GET .../jobs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "history_time::option")]
    pub submission_time: Option<DateTime<Utc>>,
    #[serde(default, with = "history_time::option")]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stage_ids: Vec<i64>,
    #[serde(default)]
    pub job_group: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub num_tasks: i64,
    #[serde(default)]
    pub num_active_tasks: i64,
    #[serde(default)]
    pub num_completed_tasks: i64,
    #[serde(default)]
    pub num_skipped_tasks: i64,
    #[serde(default)]
    pub num_failed_tasks: i64,
    #[serde(default)]
    pub num_active_stages: i64,
    #[serde(default)]
    pub num_completed_stages: i64,
    #[serde(default)]
    pub num_skipped_stages: i64,
    #[serde(default)]
    pub num_failed_stages: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Active,
    Complete,
    Failed,
    Pending,
    Skipped,
    #[serde(other)]
    Unknown,
}

/// `GET .../stages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub status: StageStatus,
    pub stage_id: i64,
    #[serde(default)]
    pub attempt_id: i64,
    #[serde(default)]
    pub num_active_tasks: i64,
    #[serde(default)]
    pub num_complete_tasks: i64,
    #[serde(default)]
    pub num_failed_tasks: i64,
    #[serde(default)]
    pub executor_run_time: i64,
    #[serde(default)]
    pub executor_cpu_time: Option<i64>,
    #[serde(default, with = "history_time::option")]
    pub submission_time: Option<DateTime<Utc>>,
    #[serde(default, with = "history_time::option")]
    pub first_task_launched_time: Option<DateTime<Utc>>,
    #[serde(default, with = "history_time::option")]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input_bytes: i64,
    #[serde(default)]
    pub input_records: i64,
    #[serde(default)]
    pub output_bytes: i64,
    #[serde(default)]
    pub output_records: i64,
    #[serde(default)]
    pub shuffle_read_bytes: i64,
    #[serde(default)]
    pub shuffle_read_records: i64,
    #[serde(default)]
    pub shuffle_write_bytes: i64,
    #[serde(default)]
    pub shuffle_write_records: i64,
    #[serde(default)]
    pub memory_bytes_spilled: i64,
    #[serde(default)]
    pub disk_bytes_spilled: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub scheduling_pool: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// `GET .../executors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorRecord {
    pub id: String,
    #[serde(default)]
    pub host_port: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub rdd_blocks: i64,
    #[serde(default)]
    pub memory_used: i64,
    #[serde(default)]
    pub disk_used: i64,
    #[serde(default)]
    pub total_cores: i64,
    #[serde(default)]
    pub max_tasks: i64,
    #[serde(default)]
    pub active_tasks: i64,
    #[serde(default)]
    pub failed_tasks: i64,
    #[serde(default)]
    pub completed_tasks: i64,
    #[serde(default)]
    pub total_tasks: i64,
    #[serde(default)]
    pub total_duration: i64,
    #[serde(default, rename = "totalGCTime")]
    pub total_gc_time: i64,
    #[serde(default)]
    pub total_input_bytes: i64,
    #[serde(default)]
    pub total_shuffle_read: i64,
    #[serde(default)]
    pub total_shuffle_write: i64,
    #[serde(default)]
    pub max_memory: i64,
    #[serde(default)]
    pub executor_logs: HashMap<String, String>,
}

/// Everything fetched for one application run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub summary: ApplicationSummary,
    pub jobs: Vec<JobRecord>,
    pub stages: Vec<StageRecord>,
    pub executors: Vec<ExecutorRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ResponseDecoder;

    const URL: &str = "http://hs:18080/api/v1/applications/app-1/jobs";

    fn attempt(id: Option<&str>, start: &str) -> Attempt {
        Attempt {
            attempt_id: id.map(str::to_string),
            start_time: history_time::parse(start).unwrap(),
            end_time: None,
            last_updated: None,
            duration: None,
            spark_user: "etl".to_string(),
            completed: true,
            app_spark_version: None,
        }
    }

    fn summary(attempts: Vec<Attempt>) -> ApplicationSummary {
        ApplicationSummary {
            id: "app-1".to_string(),
            name: "nightly".to_string(),
            attempts,
        }
    }

    #[test]
    fn test_latest_attempt_picks_max_start_time() {
        let s = summary(vec![
            attempt(Some("1"), "2016-01-01T00:00:00.100GMT"),
            attempt(Some("2"), "2016-01-01T00:00:00.200GMT"),
        ]);
        assert_eq!(s.latest_attempt().unwrap().attempt_id.as_deref(), Some("2"));

        let reversed = summary(vec![
            attempt(Some("2"), "2016-01-01T00:00:00.200GMT"),
            attempt(Some("1"), "2016-01-01T00:00:00.100GMT"),
        ]);
        assert_eq!(
            reversed.latest_attempt().unwrap().attempt_id.as_deref(),
            Some("2")
        );
    }

    #[test]
    fn test_latest_attempt_tie_goes_to_first_listed() {
        let s = summary(vec![
            attempt(Some("a"), "2016-01-01T00:00:00.100GMT"),
            attempt(Some("b"), "2016-01-01T00:00:05.000GMT"),
            attempt(Some("c"), "2016-01-01T00:00:05.000GMT"),
        ]);
        assert_eq!(s.latest_attempt().unwrap().attempt_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_latest_attempt_empty() {
        assert!(summary(Vec::new()).latest_attempt().is_none());
    }

    #[test]
    fn test_decode_summary_without_attempt_id() {
        let body = r#"{
            "id": "app-1",
            "name": "nightly",
            "attempts": [{
                "startTime": "2016-04-03T19:22:31.000GMT",
                "endTime": "2016-04-03T19:30:02.250GMT",
                "sparkUser": "etl",
                "completed": true
            }]
        }"#;
        let s: ApplicationSummary = ResponseDecoder::new().decode(body, URL).unwrap();
        let a = s.latest_attempt().unwrap();
        assert!(a.attempt_id.is_none());
        assert_eq!(
            a.end_time.map(|t| t.timestamp_millis()),
            Some(history_time::parse("2016-04-03T19:30:02.250GMT").unwrap().timestamp_millis())
        );
    }

    #[test]
    fn test_decode_partial_job_and_unknown_status() {
        let body = r#"[{"jobId": 3, "status": "ZOMBIE"}]"#;
        let jobs: Vec<JobRecord> = ResponseDecoder::new().decode(body, URL).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, 3);
        assert_eq!(jobs[0].status, JobStatus::Unknown);
        assert!(jobs[0].stage_ids.is_empty());
    }

    #[test]
    fn test_records_round_trip_through_decoder() {
        let decoder = ResponseDecoder::new();

        let jobs = vec![JobRecord {
            job_id: 0,
            name: "count at Main.scala:12".to_string(),
            description: None,
            submission_time: Some(history_time::parse("2016-04-03T19:22:35.120GMT").unwrap()),
            completion_time: Some(history_time::parse("2016-04-03T19:22:40.004GMT").unwrap()),
            stage_ids: vec![0, 1],
            job_group: Some("grp".to_string()),
            status: JobStatus::Succeeded,
            num_tasks: 20,
            num_active_tasks: 0,
            num_completed_tasks: 20,
            num_skipped_tasks: 0,
            num_failed_tasks: 0,
            num_active_stages: 0,
            num_completed_stages: 2,
            num_skipped_stages: 0,
            num_failed_stages: 0,
        }];
        let raw = serde_json::to_string(&jobs).unwrap();
        assert_eq!(decoder.decode::<Vec<JobRecord>>(&raw, URL).unwrap(), jobs);

        let stages = vec![StageRecord {
            status: StageStatus::Failed,
            stage_id: 1,
            attempt_id: 0,
            num_active_tasks: 0,
            num_complete_tasks: 9,
            num_failed_tasks: 1,
            executor_run_time: 4200,
            executor_cpu_time: None,
            submission_time: Some(history_time::parse("2016-04-03T19:22:36.000GMT").unwrap()),
            first_task_launched_time: None,
            completion_time: None,
            input_bytes: 1024,
            input_records: 10,
            output_bytes: 0,
            output_records: 0,
            shuffle_read_bytes: 0,
            shuffle_read_records: 0,
            shuffle_write_bytes: 512,
            shuffle_write_records: 5,
            memory_bytes_spilled: 0,
            disk_bytes_spilled: 0,
            name: "map at Main.scala:10".to_string(),
            details: String::new(),
            scheduling_pool: "default".to_string(),
            failure_reason: Some("ExecutorLostFailure".to_string()),
        }];
        let raw = serde_json::to_string(&stages).unwrap();
        assert_eq!(decoder.decode::<Vec<StageRecord>>(&raw, URL).unwrap(), stages);

        let executors = vec![ExecutorRecord {
            id: "driver".to_string(),
            host_port: "10.0.0.4:40121".to_string(),
            is_active: true,
            rdd_blocks: 0,
            memory_used: 0,
            disk_used: 0,
            total_cores: 4,
            max_tasks: 4,
            active_tasks: 0,
            failed_tasks: 0,
            completed_tasks: 40,
            total_tasks: 40,
            total_duration: 9000,
            total_gc_time: 120,
            total_input_bytes: 2048,
            total_shuffle_read: 0,
            total_shuffle_write: 0,
            max_memory: 384_093_388,
            executor_logs: HashMap::from([(
                "stdout".to_string(),
                "http://nm:8042/stdout".to_string(),
            )]),
        }];
        let raw = serde_json::to_string(&executors).unwrap();
        assert!(raw.contains("totalGCTime"));
        assert_eq!(
            decoder.decode::<Vec<ExecutorRecord>>(&raw, URL).unwrap(),
            executors
        );
    }
}
