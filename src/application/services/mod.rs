//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, StateStore, Workload)
//! but are themselves concrete structs, not traits.

mod corefile;

pub use corefile::{
    zonefile_path, CorefileService, Revision, UnitStatus, UpdateOutcome, UNCHANGED,
};
