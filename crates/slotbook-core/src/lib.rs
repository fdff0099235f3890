//! Core types: time intervals, business-hours policy, availability engine

pub mod availability;
pub mod policy;
pub mod time;
pub mod tracing;

pub use availability::compute_free_slots;
pub use policy::{BusinessHoursPolicy, PolicyError};
pub use time::{BusyInterval, Slot, TimeWindow};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
