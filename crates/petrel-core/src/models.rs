use serde::{Deserialize, Serialize};

/// The two independently paginated collections belonging to a petition.
///
/// Using an enum makes an unknown collection kind unrepresentable; the
/// original string-flag interface treated it as a fatal caller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagedKind {
    /// Free-text explanations signers attach when signing.
    Reasons,
    /// Messages the petition owner posts after creation.
    Updates,
}

impl PagedKind {
    /// The path segment and response key used by the API.
    pub fn as_str(self) -> &'static str {
        match self {
            PagedKind::Reasons => "reasons",
            PagedKind::Updates => "updates",
        }
    }
}

impl std::fmt::Display for PagedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Petition metadata, the closed 14-field set requested from the API.
///
/// Every field is optional: the API omits fields the creator never set.
/// `targets` stays a raw JSON value since the API returns either a plain
/// string or a list of target objects depending on petition age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PetitionSnapshot {
    pub title: Option<String>,
    pub status: Option<String>,
    pub targets: Option<serde_json::Value>,
    pub overview: Option<String>,
    pub letter_body: Option<String>,
    pub signature_count: Option<u64>,
    pub category: Option<String>,
    pub goal: Option<u64>,
    pub created_at: Option<String>,
    pub end_at: Option<String>,
    pub creator_name: Option<String>,
    pub creator_url: Option<String>,
    pub organization_name: Option<String>,
    pub organization_url: Option<String>,
}

/// One fully collected petition, the unit of output.
///
/// Created only after all four fetches succeeded and validated;
/// never mutated afterwards. `reasons` and `updates` are serialized
/// JSON arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestRecord {
    pub petition_id: u64,
    pub reasons: String,
    pub updates: String,
    pub data: PetitionSnapshot,
}

/// Check that a collected blob is a well-formed JSON array.
///
/// Guards against a partially successful collection (e.g. every page
/// failed after the page-count header) being committed as if complete.
pub fn well_formed_listing(blob: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(blob),
        Ok(serde_json::Value::Array(_))
    )
}
