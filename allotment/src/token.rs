//! Reservation tokens and the sources that mint their ids.

use crate::category::Category;
use crate::types::{ResourceId, Timestamp, TokenId};
use uuid::Uuid;

/// Single-use proof that the holder won a reservation.
///
/// Tokens are only minted by the [`Allocator`](crate::Allocator). Presenting a
/// token to [`confirm`](crate::Allocator::confirm) or
/// [`cancel`](crate::Allocator::cancel) consumes it; any later use of the same
/// token, or of a clone of it, fails with `InvalidToken`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservationToken<C: Category> {
    token_id: TokenId,
    resource_id: ResourceId,
    category: C,
    issued_at: Timestamp,
}

impl<C: Category> ReservationToken<C> {
    pub(crate) const fn new(
        token_id: TokenId,
        resource_id: ResourceId,
        category: C,
        issued_at: Timestamp,
    ) -> Self {
        Self {
            token_id,
            resource_id,
            category,
            issued_at,
        }
    }

    /// The token's unique id.
    pub const fn token_id(&self) -> TokenId {
        self.token_id
    }

    /// The resource this token holds.
    pub const fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// The category of the granted resource.
    ///
    /// This may be larger than the category that was requested when the
    /// request was upgraded.
    pub const fn category(&self) -> C {
        self.category
    }

    /// When the reservation was made.
    pub const fn issued_at(&self) -> Timestamp {
        self.issued_at
    }
}

/// Supplies unique token ids to an allocator.
///
/// The allocator calls this before taking any pool lock, so an implementation
/// may query the allocator it serves.
pub trait TokenIdSource: Send + Sync {
    /// Returns an id that this source has never returned before.
    fn next_token_id(&self) -> TokenId;
}

/// Random version 4 UUIDs. The default source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenIds;

impl TokenIdSource for RandomTokenIds {
    fn next_token_id(&self) -> TokenId {
        TokenId::new(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Size;
    use std::collections::HashSet;

    #[test]
    fn random_ids_do_not_repeat() {
        let source = RandomTokenIds;
        let ids: HashSet<TokenId> = (0..1_000).map(|_| source.next_token_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn random_ids_are_version_four() {
        let id = RandomTokenIds.next_token_id();
        assert_eq!(id.as_ref().get_version(), Some(uuid::Version::Random));
    }

    #[test]
    fn token_exposes_its_binding() {
        let issued_at = Timestamp::now();
        let token = ReservationToken::new(
            TokenId::new(Uuid::from_u128(1)),
            ResourceId::new(4),
            Size::Large,
            issued_at,
        );

        assert_eq!(token.resource_id(), ResourceId::new(4));
        assert_eq!(token.category(), Size::Large);
        assert_eq!(token.issued_at(), issued_at);
    }
}
