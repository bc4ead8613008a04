// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Shelf crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`gateway`] - In-memory metadata gateway fake with fault injection,
//!   call counters, and a write gate for ordering tests

pub mod gateway;

pub use gateway::{InMemoryMetadataGateway, WriteGate};
