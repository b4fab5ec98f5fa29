//! User module
//!
//! User records, their public projections and the store that owns them.

mod model;
mod store;

pub use model::*;
pub use store::UserStore;
