//! Embassy async tasks

pub mod host_link;

pub use host_link::host_link_task;
