use serde::{Deserialize, Serialize};

/// A registered user.
///
/// This is the wire shape of the `USER_CREATED` and `USER_UPDATED` payloads.
/// Missing fields decode to empty defaults; completeness is checked by the
/// [`UserService`](crate::service::UserService), not by the codec.
///
/// The `id` is supplied by the caller on create and never changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub email: String,
    pub is_deleted: bool,
}

impl User {
    /// Creates a new, not-deleted user.
    ///
    /// # Arguments
    /// * `id` - Caller-supplied unique token
    /// * `name` - Display name
    /// * `age` - Age in years
    /// * `email` - Contact address
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        age: i64,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age,
            email: email.into(),
            is_deleted: false,
        }
    }
}
