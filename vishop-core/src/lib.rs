#![doc = "vishop-core: core logic library for vishop."]

//! This crate holds the two engines behind the `vishop` CLI:
//!
//! - the bundle builder ([`pattern`], [`collect`], [`bundle`]), which turns a
//!   directory set and exclude rules into a deterministic archive, and
//! - the publish synchroniser ([`session`], [`scrape`], [`site`], [`publish`]),
//!   which logs into vim.org and creates or updates a script listing from a
//!   bundle.
//!
//! The remote site and the terminal are reached only through the traits in
//! [`contract`], so everything above them can be tested with mocks.

pub mod bundle;
pub mod collect;
pub mod config;
pub mod contract;
pub mod error;
pub mod pattern;
pub mod publish;
pub mod scrape;
pub mod session;
pub mod site;

pub use error::{Result, VishopError};
