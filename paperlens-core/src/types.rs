//! Wire and view-model types exchanged with the analytics API.
//!
//! The backend is loose about optional fields: lists may arrive as `null`,
//! as JSON-encoded strings, or be missing entirely, and the same paper shape
//! appears with different field names depending on the endpoint. The types
//! here absorb those irregularities at decode time so the rest of the crate
//! only ever sees dense, well-formed values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// One sparse `(year, topic, frequency)` data point from `GET /api/trends`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub year: i32,
    pub topic: String,
    pub frequency: u64,
}

impl TrendRecord {
    pub fn new(year: i32, topic: impl Into<String>, frequency: u64) -> Self {
        Self {
            year,
            topic: topic.into(),
            frequency,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Author row from `GET /api/authors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub influence_score: f64,
    #[serde(default)]
    pub paper_count: u64,
    #[serde(default)]
    pub citations: u64,
}

/// Paper summary shared by the list, search and recommendation endpoints.
///
/// The list endpoint sends `published_date` and `source`; search and
/// recommendations send `date`, `abstract` and `categories` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default, alias = "date")]
    pub published_date: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(
        rename = "abstract",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<String>,
}

impl PaperSummary {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Body of `POST /api/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
}

/// Response of `POST /api/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Vec<PaperSummary>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Editable profile fields, also the body of `POST /api/profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub title: String,
    pub proposal: String,
}

/// A single editable field of [`ProfileForm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    Title,
    Proposal,
}

impl ProfileForm {
    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ProfileField::Name => self.name = value,
            ProfileField::Title => self.title = value,
            ProfileField::Proposal => self.proposal = value,
        }
    }

    pub fn get(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::Name => &self.name,
            ProfileField::Title => &self.title,
            ProfileField::Proposal => &self.proposal,
        }
    }
}

/// Profile object returned by `GET /api/profile` and `POST /api/profile`.
///
/// Every field may be `null` for a profile that was never filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub proposal: Option<String>,
    #[serde(default)]
    pub trajectory: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub suggested_conferences: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub suggested_papers: Vec<SuggestedPaper>,
}

impl Profile {
    /// Form fields with missing values replaced by empty strings.
    pub fn form(&self) -> ProfileForm {
        ProfileForm {
            name: self.name.clone().unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            proposal: self.proposal.clone().unwrap_or_default(),
        }
    }

    /// The analysis stored on the profile, if one was ever produced.
    pub fn analysis(&self) -> Option<AnalysisPayload> {
        let trajectory = self.trajectory.as_deref().filter(|t| !t.is_empty())?;
        Some(AnalysisPayload {
            trajectory: trajectory.to_string(),
            suggested_conferences: self.suggested_conferences.clone(),
            suggested_papers: self.suggested_papers.clone(),
        })
    }
}

/// Paper suggested by the profile analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedPaper {
    pub title: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Result of `POST /api/profile/analyze`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub trajectory: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub suggested_conferences: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub suggested_papers: Vec<SuggestedPaper>,
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

/// Topic with a paper count, as listed in the insights summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    #[serde(default)]
    pub count: u64,
}

/// Landscape summary from `GET /api/research/insights`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchInsights {
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub emerging_trends: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub research_gaps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommended_directions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub top_topics: Vec<TopicCount>,
}

/// Paper reference inside a topic cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPaper {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
}

/// One entry of `GET /api/topics/clusters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCluster {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub papers: Vec<ClusterPaper>,
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum ListShape<T> {
    List(Vec<T>),
    Encoded(String),
    Null(()),
}

/// Accept a list, `null`, or a string holding a JSON-encoded list.
///
/// The profile endpoint persists suggestion lists as JSON text and may hand
/// that text back verbatim.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match ListShape::<T>::deserialize(deserializer)? {
        ListShape::List(items) => Ok(items),
        ListShape::Null(()) => Ok(Vec::new()),
        ListShape::Encoded(text) if text.trim().is_empty() => Ok(Vec::new()),
        ListShape::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
    }
}

/// Accept a string or `null`.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
