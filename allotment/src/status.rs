//! Resource status and its transition table.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a single resource.
///
/// ```text
/// Free --reserve--> Reserved --confirm--> Occupied --release--> Free
///                   Reserved --cancel---> Free
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Available to be reserved.
    Free,
    /// Held by exactly one live reservation token.
    Reserved,
    /// Confirmed and in use until released.
    Occupied,
}

impl ResourceStatus {
    /// All statuses, in bucket order.
    pub const ALL: [Self; 3] = [Self::Free, Self::Reserved, Self::Occupied];

    /// Returns true when moving from `self` to `next` is a legal edge.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Free, Self::Reserved)
                | (Self::Reserved, Self::Occupied)
                | (Self::Reserved, Self::Free)
                | (Self::Occupied, Self::Free)
        )
    }

    pub(crate) const fn bucket(self) -> usize {
        match self {
            Self::Free => 0,
            Self::Reserved => 1,
            Self::Occupied => 2,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Free => "free",
            Self::Reserved => "reserved",
            Self::Occupied => "occupied",
        };
        f.write_str(name)
    }
}
