pub mod store;

pub use store::{BillStore, CategoryStore, RuleStore, StoreError};
