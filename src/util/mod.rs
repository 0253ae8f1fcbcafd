//! Internal utilities.

pub mod active_list;

pub use active_list::ActiveList;
