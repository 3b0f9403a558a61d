use std::fmt;

use super::{PrizeId, ValidationError};

/// One configurable row of a prize catalog.
pub trait Outcome: Clone + fmt::Debug {
    /// Field-level patch accepted by [Catalog::update].
    type Field;
    /// Catalog-wide settings stored alongside the entries.
    type Settings: Clone + Default + fmt::Debug;
    /// Persisted form of one entry, with numeric fields coerced.
    type Record;
    /// Payload handed to the persistence collaborator on save.
    type Payload;

    /// Entries the catalog must hold at all times.
    const MIN_ENTRIES: usize;

    fn with_defaults(id: PrizeId) -> Self;

    fn id(&self) -> &PrizeId;

    fn apply(&mut self, field: Self::Field);

    /// Checks every invariant that must hold before the catalog may be saved.
    fn check(entries: &[Self]) -> Result<(), ValidationError>;

    fn to_record(&self) -> Result<Self::Record, ValidationError>;

    fn payload(settings: &Self::Settings, records: Vec<Self::Record>) -> Self::Payload;
}

/// Ordered, in-memory set of prize outcomes owned by one editing session.
///
/// Nothing here performs I/O: [Catalog::save] hands the validated payload to a caller-supplied
/// collaborator, which replaces the server-side configuration as a whole.
#[derive(Clone, Debug)]
pub struct Catalog<O: Outcome> {
    entries: Vec<O>,
    settings: O::Settings,
}

impl<O: Outcome> Catalog<O> {
    pub fn from_entries(entries: Vec<O>, settings: O::Settings) -> Result<Self, ValidationError> {
        if entries.len() < O::MIN_ENTRIES {
            return Err(ValidationError::SegmentFloor {
                min: O::MIN_ENTRIES,
            });
        }
        Ok(Self::from_parts(entries, settings))
    }

    pub(super) fn from_parts(entries: Vec<O>, settings: O::Settings) -> Self {
        Self { entries, settings }
    }

    pub fn entries(&self) -> &[O] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &PrizeId) -> Option<&O> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn settings(&self) -> &O::Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut O::Settings {
        &mut self.settings
    }

    /// Appends an entry with default values and returns its fresh identifier.
    pub fn add(&mut self) -> PrizeId {
        let id = PrizeId::generate();
        self.entries.push(O::with_defaults(id.clone()));
        id
    }

    /// Patches a single field of one entry, leaving every other field untouched.
    pub fn update(&mut self, id: &PrizeId, field: O::Field) -> Result<(), ValidationError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id() == id)
            .ok_or_else(|| ValidationError::UnknownOutcome { id: id.clone() })?;
        entry.apply(field);
        Ok(())
    }

    /// Removes an entry, refusing to drop below the minimum entry count.
    pub fn remove(&mut self, id: &PrizeId) -> Result<O, ValidationError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id() == id)
            .ok_or_else(|| ValidationError::UnknownOutcome { id: id.clone() })?;
        if self.entries.len() <= O::MIN_ENTRIES {
            return Err(ValidationError::SegmentFloor {
                min: O::MIN_ENTRIES,
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        O::check(&self.entries)
    }

    /// Whether the save action should be enabled.
    pub fn can_save(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validates the catalog and builds the payload with reward values coerced.
    pub fn prepare_save(&self) -> Result<O::Payload, ValidationError> {
        self.validate()?;
        let records = self
            .entries
            .iter()
            .map(O::to_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(O::payload(&self.settings, records))
    }

    /// Validates the catalog and passes the payload to `on_save`.
    ///
    /// `on_save` is never invoked when validation fails.
    pub fn save<F, R>(&self, on_save: F) -> Result<R, ValidationError>
    where
        F: FnOnce(O::Payload) -> R,
    {
        let payload = self.prepare_save()?;
        Ok(on_save(payload))
    }
}
