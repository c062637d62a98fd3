use serde::{Deserialize, Serialize};

/// Input of one linking run.
///
/// Fields default to empty strings so that a payload with missing keys still
/// deserializes and is rejected by [`LinkRequest::missing_fields`] instead of
/// failing inside the JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    #[serde(default)]
    pub pb_story_url: String,
    #[serde(default)]
    pub ado_project_name: String,
    #[serde(default)]
    pub ado_story_id: String,
}

impl LinkRequest {
    pub fn new(
        pb_story_url: impl Into<String>,
        ado_project_name: impl Into<String>,
        ado_story_id: impl Into<String>,
    ) -> Self {
        Self {
            pb_story_url: pb_story_url.into(),
            ado_project_name: ado_project_name.into(),
            ado_story_id: ado_story_id.into(),
        }
    }

    /// Wire names of required fields that are empty or whitespace only.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.pb_story_url.trim().is_empty() {
            missing.push("pbStoryUrl");
        }
        if self.ado_project_name.trim().is_empty() {
            missing.push("adoProjectName");
        }
        if self.ado_story_id.trim().is_empty() {
            missing.push("adoStoryId");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_deserialize_as_empty() {
        let request: LinkRequest =
            serde_json::from_str(r#"{"pbStoryUrl":"https://x.productboard.com/f/1"}"#).unwrap();
        assert_eq!(
            request.missing_fields(),
            vec!["adoProjectName", "adoStoryId"]
        );
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let request = LinkRequest::new("https://x.productboard.com", "  ", "42");
        assert!(!request.is_complete());
        assert_eq!(request.missing_fields(), vec!["adoProjectName"]);
    }
}
