//! Typed access to the stored collections.
//!
//! The [`Repository`] wraps an injected [`KeyValueStore`] and performs every
//! read-modify-write: load the whole array, change it in memory, write the
//! whole array back. A stored value that is not a JSON array reads as empty.
//! Array elements that fail to decode are skipped when reading but written
//! back unchanged, so a newer or hand-edited entry survives later writes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::inventory::Inventory;
use crate::preferences::{UserPreferences, PREFERENCES_KEY};
use crate::record::{
    Collection, DisposalRecord, InstalledRecord, NewDisposal, NewInstallation, NewStock,
    PeripheralKind, Record, StockRecord,
};
use crate::storage::KeyValueStore;

/// Collection-level operations over a key-value store.
#[derive(Debug)]
pub struct Repository<S> {
    store: S,
}

impl<S: KeyValueStore> Repository<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The stored array under `key`, with an id given to every object that
    /// lacks one.
    ///
    /// Assigned ids are written back right away so ids shown to the user stay
    /// valid for later removal. Elements are kept as stored, decodable or not.
    fn load_raw(&self, key: &str) -> Result<Vec<Value>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(Vec::new());
        };

        let mut elements: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(elements) => elements,
            Err(e) => {
                warn!(key, error = %e, "Stored value is not a JSON array, treating as empty");
                return Ok(Vec::new());
            }
        };

        let assigned = elements.iter_mut().map(assign_id).filter(|a| *a).count();
        if assigned > 0 {
            info!(key, count = assigned, "Assigning ids to legacy records");
            if let Err(e) = self.save(key, &elements) {
                warn!(key, error = %e, "Could not persist assigned ids");
            }
        }

        Ok(elements)
    }

    /// Decode the array under `key`, skipping elements that do not decode.
    fn load<T: Record>(&self, key: &str) -> Result<Vec<T>> {
        let elements = self.load_raw(key)?;
        let mut records = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            match serde_json::from_value::<T>(element) {
                Ok(record) => records.push(record),
                Err(e) => warn!(key, index, error = %e, "Skipping undecodable record"),
            }
        }
        Ok(records)
    }

    fn save<T: Serialize>(&self, key: &str, records: &[T]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.store.set(key, &json)?;
        debug!(key, count = records.len(), "Saved collection");
        Ok(())
    }

    fn append<T: Record>(&self, key: &str, new_records: &[T]) -> Result<()> {
        let mut elements = self.load_raw(key)?;
        for record in new_records {
            elements.push(serde_json::to_value(record)?);
        }
        self.save(key, &elements)
    }

    /// Records of one installed collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn installed(&self, kind: PeripheralKind) -> Result<Vec<InstalledRecord>> {
        self.load(kind.collection().storage_key())
    }

    /// Stock records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn stock(&self) -> Result<Vec<StockRecord>> {
        self.load(Collection::Stock.storage_key())
    }

    /// Disposal records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn disposals(&self) -> Result<Vec<DisposalRecord>> {
        self.load(Collection::Disposal.storage_key())
    }

    /// Load all six collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn snapshot(&self) -> Result<Inventory> {
        Ok(Inventory {
            cameras: self.installed(PeripheralKind::Camera)?,
            card_readers: self.installed(PeripheralKind::CardReader)?,
            ecpf_readers: self.installed(PeripheralKind::Ecpf)?,
            biometrics: self.installed(PeripheralKind::Biometric)?,
            stock: self.stock()?,
            disposals: self.disposals()?,
        })
    }

    /// Validate and store a new installation in the collection for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any write, or a storage error.
    pub fn add_installation(
        &self,
        kind: PeripheralKind,
        input: NewInstallation,
    ) -> Result<InstalledRecord> {
        let record = InstalledRecord::create(kind, input)?;
        self.append(kind.collection().storage_key(), std::slice::from_ref(&record))?;
        info!(kind = %kind, serial = %record.serial, site = %record.site, "Registered installation");
        Ok(record)
    }

    /// Validate and store a stock intake.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any write, or a storage error.
    pub fn add_stock(&self, kind: PeripheralKind, input: NewStock) -> Result<StockRecord> {
        let record = StockRecord::create(kind, input)?;
        self.append(Collection::Stock.storage_key(), std::slice::from_ref(&record))?;
        info!(kind = %kind, serial = %record.serial, "Registered stock intake");
        Ok(record)
    }

    /// Validate every entry, then store them all in one write.
    ///
    /// Nothing is written if any entry fails validation.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or a storage error.
    pub fn add_disposals(
        &self,
        entries: Vec<(PeripheralKind, NewDisposal)>,
    ) -> Result<Vec<DisposalRecord>> {
        let records = entries
            .into_iter()
            .map(|(kind, input)| DisposalRecord::create(kind, input))
            .collect::<Result<Vec<_>>>()?;
        self.append(Collection::Disposal.storage_key(), &records)?;
        info!(count = records.len(), "Registered disposals");
        Ok(records)
    }

    /// Append already-built installed records (imports).
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn append_installed(&self, kind: PeripheralKind, records: &[InstalledRecord]) -> Result<()> {
        self.append(kind.collection().storage_key(), records)
    }

    /// Append already-built stock records (imports).
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn append_stock(&self, records: &[StockRecord]) -> Result<()> {
        self.append(Collection::Stock.storage_key(), records)
    }

    /// Append already-built disposal records (imports).
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn append_disposals(&self, records: &[DisposalRecord]) -> Result<()> {
        self.append(Collection::Disposal.storage_key(), records)
    }

    /// Delete the record with `id` from `collection`.
    ///
    /// Other stored elements, including ones that do not decode, are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no record has that id.
    pub fn remove(&self, collection: Collection, id: Uuid) -> Result<()> {
        let key = collection.storage_key();
        let mut elements = self.load_raw(key)?;
        let position = elements
            .iter()
            .position(|element| element_id(element) == Some(id))
            .ok_or_else(|| Error::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        elements.remove(position);
        self.save(key, &elements)?;
        info!(%collection, %id, "Removed record");
        Ok(())
    }

    /// Stored preferences, or defaults when missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn preferences(&self) -> Result<UserPreferences> {
        let Some(raw) = self.store.get(PREFERENCES_KEY)? else {
            return Ok(UserPreferences::default());
        };
        Ok(load_object(PREFERENCES_KEY, &raw))
    }

    /// Validate and store preferences.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any write, or a storage error.
    pub fn save_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        preferences.validate()?;
        let json = serde_json::to_string(preferences)?;
        self.store.set(PREFERENCES_KEY, &json)?;
        info!("Saved preferences");
        Ok(())
    }

    /// Remove stored preferences so defaults apply again.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn reset_preferences(&self) -> Result<()> {
        self.store.remove(PREFERENCES_KEY)?;
        Ok(())
    }
}

/// Give `element` a fresh id if it is an object without one.
fn assign_id(element: &mut Value) -> bool {
    let Value::Object(fields) = element else {
        return false;
    };
    if fields.get("id").is_some_and(|id| !id.is_null()) {
        return false;
    }
    fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    true
}

fn element_id(element: &Value) -> Option<Uuid> {
    element.get("id")?.as_str()?.parse().ok()
}

fn load_object<T: DeserializeOwned + Default>(key: &str, raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(key, error = %e, "Stored value is unreadable, using defaults");
        T::default()
    })
}
