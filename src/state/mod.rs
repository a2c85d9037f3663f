pub mod store;

pub use store::{StateStore, TierStateMap};
