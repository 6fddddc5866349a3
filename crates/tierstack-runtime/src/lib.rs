//! Realization runtime for tierstack topologies.
//!
//! The [`engine::Engine`] walks a validated topology in dependency order,
//! substitutes bound outputs into each unit, hands the unit to a
//! [`provider::ResourceProvider`], and records the returned outputs in an
//! [`store::OutputStore`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod engine;
pub mod provider;
pub mod store;
