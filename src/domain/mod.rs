//! Domain layer: Corefile and zone file data model
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod coredns;
pub mod error;
pub mod node;
pub mod zonefile;

pub use coredns::{Corefile, Plugin, PlainCorefile, Property, Zone, DEFAULT_PORT};
pub use error::{DomainError, DomainResult};
pub use node::{Node, PlainForm, PlainNode, TreeNode};
pub use zonefile::{PlainRecord, PlainZoneFile, Record, RecordType, ZoneFile};
