//! Push event parsing and the deploy/ignore decision
//!
//! Everything here runs only on bodies whose signature has already been
//! verified. [`classify`] is pure: it sees the event kind, the parsed payload
//! and the protected branch list, and nothing else.

use serde::Deserialize;

use crate::types::{Error, Result};

/// Event kind that can trigger a deployment
pub const PUSH_EVENT: &str = "push";

/// Prefix stripped from `ref` to obtain the branch name
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// The fields of a push payload this service reads. Everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

impl PushPayload {
    /// Parse a verified request body. The body must be a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidPayload(format!("body is not valid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(Error::InvalidPayload(
                "body must be a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| Error::InvalidPayload(format!("unexpected payload shape: {}", e)))
    }

    /// Branch name with `refs/heads/` removed; other refs are returned unchanged
    pub fn branch(&self) -> &str {
        let git_ref = self.git_ref.as_deref().unwrap_or("");
        git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
    }

    pub fn commit(&self) -> &str {
        self.after.as_deref().unwrap_or("")
    }
}

/// Why a verified event did not lead to a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NonPushEvent,
    UnprotectedBranch { branch: String },
}

impl IgnoreReason {
    /// Message returned to the caller
    pub fn message(&self) -> String {
        match self {
            IgnoreReason::NonPushEvent => "Ignored non-push event".to_string(),
            IgnoreReason::UnprotectedBranch { branch } => {
                format!("Ignored push to {} branch", branch)
            }
        }
    }
}

/// Outcome of filtering a verified event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Ignored(IgnoreReason),
    Accepted { branch: String, commit: String },
}

/// Decide whether a verified event triggers a deployment
pub fn classify(
    event_kind: Option<&str>,
    payload: &PushPayload,
    protected_branches: &[String],
) -> Decision {
    if event_kind != Some(PUSH_EVENT) {
        return Decision::Ignored(IgnoreReason::NonPushEvent);
    }

    let branch = payload.branch();
    if !protected_branches.iter().any(|b| b == branch) {
        return Decision::Ignored(IgnoreReason::UnprotectedBranch {
            branch: branch.to_string(),
        });
    }

    Decision::Accepted {
        branch: branch.to_string(),
        commit: payload.commit().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protected() -> Vec<String> {
        vec!["main".to_string(), "master".to_string()]
    }

    fn payload(git_ref: &str, after: &str) -> PushPayload {
        PushPayload {
            git_ref: Some(git_ref.to_string()),
            after: Some(after.to_string()),
        }
    }

    #[test]
    fn test_parse_push_payload() {
        let body = br#"{"ref":"refs/heads/main","after":"abc123","repository":{"name":"shop"}}"#;
        let parsed = PushPayload::parse(body).unwrap();

        assert_eq!(parsed.git_ref.as_deref(), Some("refs/heads/main"));
        assert_eq!(parsed.after.as_deref(), Some("abc123"));
        assert_eq!(parsed.branch(), "main");
        assert_eq!(parsed.commit(), "abc123");
    }

    #[test]
    fn test_parse_missing_fields() {
        let parsed = PushPayload::parse(br#"{"zen":"Keep it logically awesome."}"#).unwrap();
        assert_eq!(parsed, PushPayload::default());
        assert_eq!(parsed.branch(), "");
        assert_eq!(parsed.commit(), "");
    }

    #[test]
    fn test_parse_null_fields() {
        let parsed = PushPayload::parse(br#"{"ref":null,"after":null}"#).unwrap();
        assert_eq!(parsed, PushPayload::default());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(
            PushPayload::parse(b"{not json"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            PushPayload::parse(b""),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            PushPayload::parse(b"payload=%7B%7D"),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            PushPayload::parse(b"[]"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            PushPayload::parse(b"null"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(
            PushPayload::parse(b"\"refs/heads/main\""),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_field_types() {
        assert!(matches!(
            PushPayload::parse(br#"{"ref":42}"#),
            Err(Error::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_branch_keeps_non_branch_refs() {
        assert_eq!(payload("refs/tags/v1.0.0", "abc").branch(), "refs/tags/v1.0.0");
        assert_eq!(payload("main", "abc").branch(), "main");
        assert_eq!(payload("refs/heads/feature/x", "abc").branch(), "feature/x");
    }

    #[test]
    fn test_classify_push_to_main() {
        let decision = classify(Some("push"), &payload("refs/heads/main", "abc123"), &protected());
        assert_eq!(
            decision,
            Decision::Accepted {
                branch: "main".to_string(),
                commit: "abc123".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_push_to_master() {
        let decision = classify(Some("push"), &payload("refs/heads/master", ""), &protected());
        assert_eq!(
            decision,
            Decision::Accepted {
                branch: "master".to_string(),
                commit: String::new(),
            }
        );
    }

    #[test]
    fn test_classify_missing_commit() {
        let body = PushPayload {
            git_ref: Some("refs/heads/main".to_string()),
            after: None,
        };
        match classify(Some("push"), &body, &protected()) {
            Decision::Accepted { commit, .. } => assert_eq!(commit, ""),
            other => panic!("Expected accepted, got: {:?}", other),
        }
    }

    #[test]
    fn test_classify_feature_branch() {
        let decision = classify(
            Some("push"),
            &payload("refs/heads/feature/x", "abc123"),
            &protected(),
        );
        assert_eq!(
            decision,
            Decision::Ignored(IgnoreReason::UnprotectedBranch {
                branch: "feature/x".to_string()
            })
        );
        if let Decision::Ignored(reason) = decision {
            assert_eq!(reason.message(), "Ignored push to feature/x branch");
        }
    }

    #[test]
    fn test_classify_non_push_events() {
        for event in ["ping", "pull_request", "release", "PUSH", ""] {
            let decision = classify(Some(event), &payload("refs/heads/main", "abc"), &protected());
            assert_eq!(decision, Decision::Ignored(IgnoreReason::NonPushEvent));
        }

        let decision = classify(None, &payload("refs/heads/main", "abc"), &protected());
        assert_eq!(decision, Decision::Ignored(IgnoreReason::NonPushEvent));
    }

    #[test]
    fn test_classify_missing_ref() {
        let decision = classify(Some("push"), &PushPayload::default(), &protected());
        assert_eq!(
            decision,
            Decision::Ignored(IgnoreReason::UnprotectedBranch {
                branch: String::new()
            })
        );
    }

    #[test]
    fn test_classify_tag_push() {
        let decision = classify(Some("push"), &payload("refs/tags/main", "abc"), &protected());
        assert!(matches!(decision, Decision::Ignored(_)));
    }

    #[test]
    fn test_classify_custom_protected_branches() {
        let branches = vec!["production".to_string()];

        assert!(matches!(
            classify(Some("push"), &payload("refs/heads/production", "abc"), &branches),
            Decision::Accepted { .. }
        ));
        assert!(matches!(
            classify(Some("push"), &payload("refs/heads/main", "abc"), &branches),
            Decision::Ignored(_)
        ));
    }

    #[test]
    fn test_non_push_message() {
        assert_eq!(
            IgnoreReason::NonPushEvent.message(),
            "Ignored non-push event"
        );
    }
}
