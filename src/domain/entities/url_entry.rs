//! URL entry entity representing a stored code → URL mapping.

/// A stored short URL.
///
/// `original_url` and `owner_id` never change after creation. `deleted` only
/// moves from `false` to `true`; deleted entries stay in storage so reads can
/// tell "never existed" apart from "existed, now gone".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    pub code: String,
    pub original_url: String,
    /// Empty for anonymous entries.
    pub owner_id: String,
    pub deleted: bool,
}

impl UrlEntry {
    /// Creates a live entry.
    pub fn new(code: String, original_url: String, owner_id: String) -> Self {
        Self {
            code,
            original_url,
            owner_id,
            deleted: false,
        }
    }

    /// Returns true while the entry has not been soft-deleted.
    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Returns true if the entry is live and belongs to `owner_id`.
    pub fn is_live_for(&self, owner_id: &str) -> bool {
        self.is_live() && self.owner_id == owner_id
    }

    /// Flags the entry as deleted. Deleting twice is a no-op.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

/// A live URL owned by a user, as returned by owner listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUrl {
    pub code: String,
    pub original_url: String,
}
