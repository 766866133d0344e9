//! CoreDNS Corefile and zone file management.
//!
//! A Corefile is a tree of zones, plugins and properties. Edits are made with
//! a small set of commands, either one at a time or from a line-oriented
//! script, and rendered back to Caddyfile-style text.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
