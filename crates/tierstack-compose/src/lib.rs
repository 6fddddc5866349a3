//! # tierstack-compose
//!
//! Declaration model and composition logic for tierstack topologies.
//!
//! Handles:
//! - **Model**: units, typed resource specs, references and values.
//! - **Graph**: dependency graphs over units and over resources in a unit.
//! - **Validator**: static checks run before anything is realized.
//! - **Resolver**: substitution of bound input values into a unit.
//! - **Units**: the network, backend and frontend declarations and the
//!   composition root that wires them.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod graph;
pub mod iam;
pub mod reference;
pub mod resolver;
pub mod resource;
pub mod security;
pub mod service;
pub mod topology;
pub mod unit;
pub mod units;
pub mod validator;
