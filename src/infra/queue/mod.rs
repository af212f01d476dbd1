//! Priority queue backends.

pub mod file;
pub mod memory;

pub use file::FilePriorityQueue;
pub use memory::InMemoryPriorityQueue;
