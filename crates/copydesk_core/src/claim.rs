use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A factual assertion reported by the fact-checking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    #[serde(alias = "claim")]
    pub text: String,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub supporting_sources: Vec<SupportingSource>,
}

impl Claim {
    /// Source used as the default citation target.
    pub fn citation_source(&self) -> Option<&SupportingSource> {
        self.supporting_sources.first()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReport {
    #[serde(default)]
    pub total_claims: usize,
    #[serde(default)]
    pub claims: Vec<Claim>,
}
