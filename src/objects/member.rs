// src/objects/member.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub etcd: EtcdStatus,
    #[serde(default)]
    pub options: MemberOptions,
    #[serde(rename = "lastHeartbeatTime", default)]
    pub last_heartbeat_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EtcdStatus {
    #[serde(rename = "startTime", default)]
    pub start_time: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberOptions {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "ClusterRole", default)]
    pub cluster_role: String,
    #[serde(rename = "APIAddr", default)]
    pub api_addr: String,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn is_primary(&self) -> bool {
        self.options.cluster_role == "primary"
    }

    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_heartbeat_time)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_heartbeat().map(|t| now - t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_member_record() {
        let member: Member = serde_json::from_str(
            r#"{
                "etcd": {"startTime": "2023-08-01T10:00:00Z", "state": "Leader"},
                "options": {"Name": "primary-single", "ClusterRole": "primary", "APIAddr": "localhost:2381"},
                "lastHeartbeatTime": "2023-08-01T10:05:00+08:00"
            }"#,
        )
        .unwrap();

        assert_eq!(member.name(), "primary-single");
        assert!(member.is_primary());
        assert_eq!(member.etcd.state, "Leader");

        let now = DateTime::parse_from_rfc3339("2023-08-01T02:06:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(member.heartbeat_age(now), Some(Duration::seconds(60)));
    }

    #[test]
    fn secondary_without_heartbeat() {
        let member: Member =
            serde_json::from_str(r#"{"options": {"Name": "s1", "ClusterRole": "secondary"}}"#)
                .unwrap();
        assert!(!member.is_primary());
        assert_eq!(member.last_heartbeat(), None);
    }
}
