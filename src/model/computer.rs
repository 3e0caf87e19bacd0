use serde::{Deserialize, Serialize};

/// A computer inventory record.
///
/// The identifier is generated by the store on create, so it is absent from
/// create payloads and serialized as `_id` only when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Computer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub ip: String,
    pub manufacturer: String,
    pub cpu: String,
    pub ram: String,
    pub hdd: String,
    pub gpu: String,
    pub os: String,
    pub is_deleted: bool,
}

impl Computer {
    /// Returns the identifier, or an empty string when none was assigned yet.
    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}
