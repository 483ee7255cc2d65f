use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Fingerprint;

/// The kinds of long-running operations delegated to the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Research,
    Outline,
    MediumGeneration,
    Rewrite,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Research,
        OperationKind::Outline,
        OperationKind::MediumGeneration,
        OperationKind::Rewrite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Research => "research",
            OperationKind::Outline => "outline",
            OperationKind::MediumGeneration => "medium_generation",
            OperationKind::Rewrite => "rewrite",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to start one operation; each kind carries its own payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationRequest {
    Research {
        keywords: Vec<String>,
        industry: String,
        audience: String,
    },
    Outline {
        keywords: Vec<String>,
        industry: String,
        audience: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        research_summary: Option<String>,
    },
    MediumGeneration {
        title: String,
        keywords: Vec<String>,
        industry: String,
        audience: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outline: Option<String>,
    },
    Rewrite {
        content: String,
        instructions: String,
    },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Research { .. } => OperationKind::Research,
            OperationRequest::Outline { .. } => OperationKind::Outline,
            OperationRequest::MediumGeneration { .. } => OperationKind::MediumGeneration,
            OperationRequest::Rewrite { .. } => OperationKind::Rewrite,
        }
    }

    /// Cache identity of the request. Rewrites are content-specific and never
    /// cached.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        let kind = self.kind();
        match self {
            OperationRequest::Research {
                keywords,
                industry,
                audience,
            }
            | OperationRequest::Outline {
                keywords,
                industry,
                audience,
                ..
            } => Some(Fingerprint::scoped(kind, keywords, industry, audience)),
            OperationRequest::MediumGeneration {
                title,
                keywords,
                industry,
                audience,
                ..
            } => {
                // The title is part of what gets generated, so it joins the keyword set.
                let terms = std::iter::once(title).chain(keywords.iter());
                Some(Fingerprint::scoped(kind, terms, industry, audience))
            }
            OperationRequest::Rewrite { .. } => None,
        }
    }
}
