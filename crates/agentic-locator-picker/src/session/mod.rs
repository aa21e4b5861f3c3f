//! Picker session state and the async search driver.

pub mod driver;
pub mod manager;

pub use driver::run_search;
pub use manager::{PendingSearch, PickerSession};
