// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Metadata store adapter for Shelf.
//!
//! The metadata API keeps arbitrary JSON blobs under flat string keys
//! (settings, default-sort preferences, custom field definitions). This crate
//! owns the wire types, the [`MetadataGateway`] port that concrete transports
//! implement, and [`MetadataStore`], the typed façade with
//! create-on-missing repair.

pub mod gateway;
pub mod record;
pub mod store;

pub use gateway::{GatewayError, MetadataGateway};
pub use record::{ApiEnvelope, ApiErrorBody, CreateMetadata, MetadataRecord, UpdateMetadata};
pub use store::{Lookup, MetadataStore, RepairPolicy, StoreError, WriteOutcome};
