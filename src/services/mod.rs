//! Domain services
//!
//! The core lives in `geo`, `ownership`, `nearby`, `field_merge` and
//! `merge`. The remaining modules are the account, questionnaire, record and
//! favorite operations the HTTP layer exposes.

pub mod accounts;
pub mod favorites;
pub mod field_merge;
pub mod geo;
pub mod merge;
pub mod nearby;
pub mod ownership;
pub mod questionnaires;
pub mod records;

pub use field_merge::merge_fields;
pub use geo::distance;
pub use merge::{merge_records, MergeOverrides};
pub use nearby::{find_nearby, NearbyMatch};
