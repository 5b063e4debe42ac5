pub mod order;
pub mod sort;

pub use order::ResultOrder;
pub use sort::{compare_regions, SortDirection, SortKey};
