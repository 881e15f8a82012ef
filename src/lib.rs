//! Quaver - dynamic widget runtime for a desktop media player.
//!
//! Widgets live in a layout graph of containers ([`graph`]) that can be
//! persisted ([`record`]) and rearranged at runtime. Widget sources on disk
//! are watched ([`watch`]), compiled and loaded ([`build`], [`module`]),
//! registered ([`factory`]) and hot-swapped into the running layout
//! ([`swap`]) without losing settings or data-flow bindings.

pub mod logger;

pub mod build;
pub mod config;
pub mod controller;
pub mod core;
pub mod error;
pub mod factory;
pub mod graph;
pub mod module;
pub mod record;
pub mod runtime;
pub mod swap;
pub mod watch;

#[cfg(test)]
pub mod testing;
