//! Layered Configuration-Resolution Engine
//!
//! Produces one immutable, fully-resolved configuration object per process by
//! merging five override sources in strict precedence order, with support for
//! resolve-time derived fields and read-time opaque computed fields.

pub mod cache;
pub mod classify;
pub mod cli;
pub mod envs;
pub mod error;
pub mod layers;
pub mod registry;
pub mod resolved;
pub mod resolver;
pub mod schema;
