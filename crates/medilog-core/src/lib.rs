//! MediLog Core Library
//!
//! Client-side data layer for logging medication doses and body temperature
//! per household member, backed by a home-automation service.
//!
//! # Architecture
//!
//! ```text
//!                              DataHub
//!                                 │
//!          ┌──────────────────────┼───────────────────────┐
//!          │                      │                       │
//!          ▼                      ▼                       ▼
//!  MedicationCatalog       PersonDirectory       RecordStoreRegistry
//!   (always loaded)        (always loaded)                │
//!          │                      │              lazily, one per person
//!          │                      │                       ▼
//!          │                      │              PersonRecordStore
//!          │                      │               all + grouped
//!          └──────────────────────┼───────────────────────┘
//!                                 ▼
//!                           RemoteGateway
//! ```
//!
//! # Core Principle
//!
//! **The backend is the source of truth.** Every mutation is followed by a
//! full refetch; stores swap whole snapshots and never patch them in place.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Medication, PersonInfo, Record, groups)
//! - [`gateway`]: Backend contract, service-call adapter, in-memory backend
//! - [`store`]: Catalog, directory, per-person record stores and grouping
//! - [`notify`]: Change subscriptions
//! - [`config`]: JSON configuration

pub mod config;
pub mod error;
pub mod gateway;
pub mod hub;
pub mod models;
pub mod notify;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{GatewayError, GatewayResult, MedilogError, MedilogResult};
pub use gateway::{ProfileLookup, RemoteGateway};
pub use hub::{DataHub, PersonUsage};
pub use models::{
    locale_cmp, parse_timestamp, to_wire_datetime, Medication, MedicationDraft, MedicationNames,
    PersonInfo, PersonProfile, Record, RecordsGroupByTime, Timestamp,
};
pub use notify::{ChangeEvent, ChangeNotifier, Subscription};
pub use store::{
    group_by_periods, MedicationCatalog, PersonDirectory, PersonRecordStore, RecordSnapshot,
    RecordStoreRegistry,
};
