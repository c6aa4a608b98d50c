//! Dataset row and validation result models
//!
//! Source rows are produced upstream by the annotation pipeline and are
//! read-only here. Every field except `id` is optional on the wire, and a
//! field that is `null` or of the wrong shape reads as its default, so a row
//! with a partially filled annotation still parses and can be reviewed.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Reviewer category
///
/// `General` reviewers round-robin across several folders, `Lawyers`
/// review a single folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewerCategory {
    General,
    Lawyers,
}

impl ReviewerCategory {
    pub const ALL: [ReviewerCategory; 2] = [ReviewerCategory::General, ReviewerCategory::Lawyers];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewerCategory::General => "general",
            ReviewerCategory::Lawyers => "lawyers",
        }
    }
}

impl fmt::Display for ReviewerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewerCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(ReviewerCategory::General),
            "lawyers" => Ok(ReviewerCategory::Lawyers),
            other => Err(Error::InvalidInput(format!(
                "Invalid validator type '{}'. Use general or lawyers",
                other
            ))),
        }
    }
}

/// Three-step level used by arousal hints and somatic marker intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

/// Emotional valence hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Valence {
    Positive,
    Negative,
    Mixed,
}

/// Safety classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLabel {
    Allowed,
    Disallowed,
    Ambiguous,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SomaticMarker {
    #[serde(deserialize_with = "lenient")]
    pub marker: String,
    #[serde(deserialize_with = "lenient")]
    pub intensity: Option<Level>,
    #[serde(deserialize_with = "lenient")]
    pub evidence_span: String,
}

/// Observation / Feeling / Need / Request annotation bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ofnr {
    #[serde(deserialize_with = "lenient")]
    pub observation: String,
    #[serde(deserialize_with = "lenient")]
    pub feeling: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub need: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub explicit_need: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub implicit_need: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub explicit_request: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub implicit_request: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub implicit_intent: String,
    #[serde(deserialize_with = "lenient")]
    pub pseudo_feelings_detected: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(deserialize_with = "lenient")]
    pub emotion_arousal_hint: Option<Level>,
    #[serde(deserialize_with = "lenient")]
    pub emotion_valence_hint: Option<Valence>,
    #[serde(deserialize_with = "lenient")]
    pub somatic_markers: Vec<SomaticMarker>,
}

/// Safety verdict; a row whose label is outside the known set has no typed safety
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Safety {
    pub label: SafetyLabel,
    #[serde(default, deserialize_with = "lenient")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    #[serde(deserialize_with = "lenient")]
    pub observation_is_nonjudgmental: f64,
    #[serde(deserialize_with = "lenient")]
    pub needs_list_match: f64,
    #[serde(deserialize_with = "lenient")]
    pub overall_confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    #[serde(deserialize_with = "lenient")]
    pub error_flags: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub warnings: Vec<String>,
}

/// Decode `T`, falling back to its default on `null` or a value of the wrong shape
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Typed view of `source[key]`; missing, `null` or mis-shaped values give the default
fn field<T: DeserializeOwned + Default>(source: &Map<String, Value>, key: &str) -> T {
    source
        .get(key)
        .and_then(|value| T::deserialize(value.clone()).ok())
        .unwrap_or_default()
}

/// One source row from a dataset folder
///
/// The only hard requirement is a string `id`. The typed fields are a
/// best-effort view for building results; the row is served and
/// re-serialized exactly as it was read, unknown keys included.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub id: String,
    pub prompt: String,
    pub context: String,
    pub human_chosen_response: String,
    pub human_rejected_response: String,
    pub ofnr: Ofnr,
    pub metadata: Option<Metadata>,
    pub safety: Option<Safety>,
    pub quality: Option<Quality>,
    pub flags: Option<Flags>,
    source: Map<String, Value>,
}

impl DataRow {
    /// Build a row from a decoded JSON object; `None` without a string `id`
    pub fn from_object(source: Map<String, Value>) -> Option<Self> {
        let id = source.get("id")?.as_str()?.to_string();
        Some(Self {
            id,
            prompt: field(&source, "prompt"),
            context: field(&source, "context"),
            human_chosen_response: field(&source, "human_chosen_response"),
            human_rejected_response: field(&source, "human_rejected_response"),
            ofnr: field(&source, "ofnr"),
            metadata: field(&source, "metadata"),
            safety: field(&source, "safety"),
            quality: field(&source, "quality"),
            flags: field(&source, "flags"),
            source,
        })
    }

    /// The row as read from the source file
    pub fn source(&self) -> &Map<String, Value> {
        &self.source
    }
}

impl Serialize for DataRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = Map::<String, Value>::deserialize(deserializer)?;
        DataRow::from_object(source).ok_or_else(|| D::Error::custom("missing string field `id`"))
    }
}

/// OFNR after review
///
/// List fields hold only the items the reviewer accepted, including any the
/// reviewer added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatedOfnr {
    pub observation: String,
    pub observation_is_judgmental: bool,
    pub feeling: Vec<String>,
    pub need: Vec<String>,
    pub explicit_need: Vec<String>,
    pub implicit_need: Vec<String>,
    pub explicit_request: Vec<String>,
    pub implicit_request: Vec<String>,
    pub implicit_intent: String,
    pub pseudo_feelings_detected: Vec<String>,
}

/// A reviewed row as persisted in the validated output tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: String,
    pub folder: String,
    pub validated_at: String,
    pub validator_type: ReviewerCategory,

    // Conversation fields copied verbatim from the source row
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub human_chosen_response: String,
    #[serde(default)]
    pub human_rejected_response: String,

    pub ofnr: ValidatedOfnr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub safety: Safety,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Flags>,
}
