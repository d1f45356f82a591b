//! Persistent record store seam
//!
//! Records are borsh blobs keyed by their seeds. A commit is an
//! all-or-nothing batch: either every write in it becomes durable or none does.

use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),
}

pub type Key = Vec<u8>;

pub trait AccountStore: Send + Sync {
    fn load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn commit(&self, writes: Vec<(Key, Vec<u8>)>) -> Result<(), StoreError>;
}

impl<S: AccountStore + ?Sized> AccountStore for std::sync::Arc<S> {
    fn load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).load(key)
    }

    fn commit(&self, writes: Vec<(Key, Vec<u8>)>) -> Result<(), StoreError> {
        (**self).commit(writes)
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Key, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl AccountStore for MemoryStore {
    fn load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(records.get(key).cloned())
    }

    fn commit(&self, writes: Vec<(Key, Vec<u8>)>) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        records.extend(writes);
        Ok(())
    }
}
