//! Domain types for the Roster peer registry.
//!
//! All record types are serializable via serde; the on-store JSON layout uses
//! camelCase keys (`url`, `lastSeen`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The DNS name a node registers itself under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeName(pub String);

impl NodeName {
    /// The URL peers use to reach this node.
    pub fn url(&self) -> String {
        format!("https://{}", self.0)
    }

    /// Name of the record file this node owns in the shared store.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for NodeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One node's self-reported liveness entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub url: String,
    pub last_seen: DateTime<Utc>,
}

/// Commit message attached to a registration write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitMessage {
    InitialRegistration,
    UpdatedRegistration,
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitMessage::InitialRegistration => write!(f, "Initial registration"),
            CommitMessage::UpdatedRegistration => write!(f, "Updated registration"),
        }
    }
}

/// Branch every registration is committed to.
pub const REGISTRATION_BRANCH: &str = "main";

/// A node's liveness record plus the metadata a version-controlled store
/// needs to commit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationFile {
    pub branch: String,
    pub author_email: String,
    pub author_name: String,
    pub commit_message: CommitMessage,
    pub file_name: String,
    pub content: PeerRecord,
}

impl RegistrationFile {
    /// Build the registration payload for `name`, stamped with `now`.
    pub fn for_node(name: &NodeName, commit_message: CommitMessage, now: DateTime<Utc>) -> Self {
        Self {
            branch: REGISTRATION_BRANCH.to_string(),
            author_email: format!("{}@roster", name.0),
            author_name: name.0.clone(),
            commit_message,
            file_name: name.file_name(),
            content: PeerRecord {
                url: name.url(),
                last_seen: now,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn node_name_derives_url_and_file_name() {
        let name = NodeName::from("node-a.example.com");
        assert_eq!(name.url(), "https://node-a.example.com");
        assert_eq!(name.file_name(), "node-a.example.com.json");
        assert_eq!(name.to_string(), "node-a.example.com");
    }

    #[test]
    fn peer_record_uses_camel_case_keys() {
        let record = PeerRecord {
            url: "https://a".to_string(),
            last_seen: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["url"], "https://a");
        assert_eq!(json["lastSeen"], "2021-01-01T00:00:00Z");

        let decoded: PeerRecord =
            serde_json::from_str(r#"{"url":"https://a","lastSeen":"2021-01-01T00:00:00Z"}"#)
                .expect("deserialize");
        assert_eq!(decoded, record);
    }

    #[test]
    fn registration_file_carries_commit_metadata() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let file = RegistrationFile::for_node(
            &NodeName::from("node-a"),
            CommitMessage::InitialRegistration,
            now,
        );
        assert_eq!(file.branch, "main");
        assert_eq!(file.author_name, "node-a");
        assert_eq!(file.author_email, "node-a@roster");
        assert_eq!(file.file_name, "node-a.json");
        assert_eq!(file.content.url, "https://node-a");
        assert_eq!(file.content.last_seen, now);
        assert_eq!(file.commit_message.to_string(), "Initial registration");
    }
}
