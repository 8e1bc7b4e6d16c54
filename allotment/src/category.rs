//! Resource categories and the upgrade policy that matches requests to pools.
//!
//! A category is plain data: a closed enum with a rank. Larger ranks can hold
//! anything a smaller rank can, so a request may be served from a larger pool
//! when its own pool is exhausted.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A closed classification that requests are matched against.
///
/// Implementors are usually fieldless enums (locker sizes, seat classes,
/// vehicle types). `rank` orders categories for upgrades; ties are broken by
/// the type's `Ord`.
pub trait Category: Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {
    /// Capacity rank. A request for rank `r` may be upgraded to rank `> r`.
    fn rank(self) -> u8;
}

/// Locker-style sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    /// Smallest unit.
    Small,
    /// Holds anything small.
    Medium,
    /// Holds anything medium.
    Large,
    /// Holds everything.
    ExtraLarge,
}

impl Size {
    /// Every size, smallest first.
    pub const ALL: [Self; 4] = [Self::Small, Self::Medium, Self::Large, Self::ExtraLarge];
}

impl Category for Size {
    fn rank(self) -> u8 {
        match self {
            Self::Small => 1,
            Self::Medium => 2,
            Self::Large => 3,
            Self::ExtraLarge => 4,
        }
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::ExtraLarge => "extra_large",
        };
        f.write_str(name)
    }
}

/// Which pools may satisfy a request for a given category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradePolicy {
    /// Only the requested category.
    Exact,
    /// The requested category, then the categories of the next larger rank.
    NextLarger,
    /// The requested category, then every larger category by ascending rank.
    #[default]
    Ascending,
}

impl UpgradePolicy {
    /// Returns the categories to try for `requested`, in order.
    ///
    /// `ladder` must be sorted by `(rank, category)` ascending. Categories
    /// absent from the ladder are never returned; if `requested` itself is
    /// absent, larger categories are still considered.
    pub fn candidates<C: Category>(self, requested: C, ladder: &[C]) -> Vec<C> {
        let wanted = requested.rank();
        let exact = ladder.iter().copied().filter(|c| *c == requested);

        let larger = ladder.iter().copied().filter(move |c| c.rank() > wanted);
        match self {
            Self::Exact => exact.collect(),
            Self::Ascending => exact.chain(larger).collect(),
            Self::NextLarger => {
                let next_rank = ladder
                    .iter()
                    .map(|c| c.rank())
                    .filter(|rank| *rank > wanted)
                    .min();
                exact
                    .chain(larger.filter(|c| Some(c.rank()) == next_rank))
                    .collect()
            }
        }
    }
}

/// Sorts categories into upgrade order.
pub(crate) fn sort_ladder<C: Category>(categories: &mut [C]) {
    categories.sort_by_key(|c| (c.rank(), *c));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_ladder() -> Vec<Size> {
        let mut ladder = vec![Size::ExtraLarge, Size::Small, Size::Large, Size::Medium];
        sort_ladder(&mut ladder);
        ladder
    }

    #[test]
    fn ladder_sorts_by_rank() {
        assert_eq!(
            full_ladder(),
            vec![Size::Small, Size::Medium, Size::Large, Size::ExtraLarge]
        );
    }

    #[test]
    fn exact_policy_never_upgrades() {
        let ladder = full_ladder();
        assert_eq!(
            UpgradePolicy::Exact.candidates(Size::Small, &ladder),
            vec![Size::Small]
        );
    }

    #[test]
    fn ascending_policy_tries_every_larger_size_in_order() {
        let ladder = full_ladder();
        assert_eq!(
            UpgradePolicy::Ascending.candidates(Size::Medium, &ladder),
            vec![Size::Medium, Size::Large, Size::ExtraLarge]
        );
    }

    #[test]
    fn next_larger_policy_stops_after_one_step() {
        let ladder = full_ladder();
        assert_eq!(
            UpgradePolicy::NextLarger.candidates(Size::Small, &ladder),
            vec![Size::Small, Size::Medium]
        );
    }

    #[test]
    fn next_larger_skips_missing_ranks() {
        let ladder = vec![Size::Small, Size::Large];
        assert_eq!(
            UpgradePolicy::NextLarger.candidates(Size::Small, &ladder),
            vec![Size::Small, Size::Large]
        );
    }

    #[test]
    fn missing_requested_category_still_upgrades() {
        let ladder = vec![Size::Large];
        assert_eq!(
            UpgradePolicy::Ascending.candidates(Size::Small, &ladder),
            vec![Size::Large]
        );
        assert!(UpgradePolicy::Exact
            .candidates(Size::Small, &ladder)
            .is_empty());
    }

    #[test]
    fn largest_size_has_nothing_to_upgrade_to() {
        let ladder = full_ladder();
        assert_eq!(
            UpgradePolicy::Ascending.candidates(Size::ExtraLarge, &ladder),
            vec![Size::ExtraLarge]
        );
    }

    #[test]
    fn default_policy_is_ascending() {
        assert_eq!(UpgradePolicy::default(), UpgradePolicy::Ascending);
    }
}
