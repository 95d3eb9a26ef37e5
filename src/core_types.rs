//! Core scalar types shared across every subsystem.
//!
//! Kept as plain integer aliases rather than newtypes: the wire protocol (see
//! [`crate::protocol`]) moves these values in and out of big-endian `u32` fields
//! constantly, and a newtype wrapper would only add `.0` noise at every call site
//! without buying extra safety the alias names don't already communicate.

/// Unencumbered or encumbered cash, always in whole units. No fractional funds.
pub type Funds = u32;

/// A count of shares.
pub type Quantity = u32;

/// Identifies a single order for the lifetime of the exchange process.
///
/// Assigned monotonically starting at 1; 0 means "no order".
pub type OrderId = u32;
