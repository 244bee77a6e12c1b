//! seclabel-mcs: MCS level reservation for concurrently running workloads
//!
//! One [`McsAllocator`] is created per process and shared by `Arc` with every
//! component that mints or retires labels. It guarantees that no two live
//! reservations carry the same level.

pub mod allocator;
pub mod range;

pub use allocator::{DEFAULT_PROCESS_TEMPLATE, McsAllocator};
pub use range::McsRange;
