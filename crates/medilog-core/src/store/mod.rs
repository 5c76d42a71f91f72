//! In-memory caches of backend collections.
//!
//! Each store keeps one immutable snapshot behind an `RwLock<Arc<_>>`. A
//! refresh builds the list and its index together and swaps the whole
//! snapshot, so readers never observe an index that disagrees with its list,
//! and the store object itself stays the same across refreshes.

mod grouping;
mod medications;
mod persons;
mod records;
mod registry;

pub use grouping::group_by_periods;
pub use medications::MedicationCatalog;
pub use persons::PersonDirectory;
pub use records::{PersonRecordStore, RecordSnapshot};
pub use registry::RecordStoreRegistry;

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::MedilogResult;

/// Current snapshot held by `lock`.
pub(crate) fn load<T>(lock: &RwLock<Arc<T>>) -> Arc<T> {
    Arc::clone(&lock.read().unwrap_or_else(PoisonError::into_inner))
}

/// Replace the snapshot held by `lock`.
pub(crate) fn replace<T>(lock: &RwLock<Arc<T>>, snapshot: T) {
    *lock.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
}

/// Hex SHA-256 of the JSON form of `value`.
pub(crate) fn digest_json<T: Serialize + ?Sized>(value: &T) -> MedilogResult<String> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
