//! Listing draft persistence.
//!
//! - `keys`: storage key scheme partitioned by user
//! - `lifecycle`: TTL policy and lazy expiry checks
//! - `store`: the `DraftStore` service (create/save/get/list/delete/cleanup)
//! - `transfer`: portable JSON export and re-keying import

pub mod keys;
pub mod lifecycle;
pub mod store;
pub mod transfer;
