use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Every identifier in the workflow is an opaque UUID; the newtypes exist so a
/// sku id can never be passed where a stock id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an aggregate or process instance stream.
    AggregateId
);

uuid_id!(
    /// Identity of a user aggregate.
    UserId
);

uuid_id!(
    /// Stock keeping unit being purchased.
    SkuId
);

uuid_id!(
    /// Stock (warehouse location) the sku is taken from.
    StockId
);

uuid_id!(
    /// Account that owns a user and pays for its orders.
    AccountId
);

uuid_id!(
    /// Identifier of a pending order; doubles as the buy-now correlation id.
    OrderId
);

// Users and buy-now processes are stored as streams keyed by their own ids.
impl From<UserId> for AggregateId {
    fn from(id: UserId) -> Self {
        Self(id.0)
    }
}

impl From<OrderId> for AggregateId {
    fn from(id: OrderId) -> Self {
        Self(id.0)
    }
}
