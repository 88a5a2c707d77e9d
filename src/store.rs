use crate::model::{Reminder, ReminderFields};
use crate::storage::KeyValueStore;
use anyhow::{Context, Result};
use std::collections::HashMap;

// Preferences namespace and slot holding the serialized list
pub const REMINDERS_NAMESPACE: &str = "Reminders";
pub const REMINDERS_SLOT: &str = "reminders_list";

/// Ordered reminder collection mirrored to a key-value slot.
///
/// Every mutating call rewrites the whole list. A failed write rolls the
/// in-memory change back so both views stay identical.
pub struct ReminderStore<S> {
    backend: S,
    by_id: HashMap<i64, Reminder>,
    order: Vec<i64>,
}

pub fn serialize_reminders<'a, I>(reminders: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Reminder>,
{
    let list: Vec<&Reminder> = reminders.into_iter().collect();
    Ok(serde_json::to_string(&list)?)
}

pub fn deserialize_reminders(json: &str) -> Result<Vec<Reminder>> {
    serde_json::from_str(json).context("Failed to parse persisted reminders")
}

impl<S: KeyValueStore> ReminderStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            by_id: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Replaces the in-memory list with the persisted one.
    pub fn load(&mut self) -> Result<usize> {
        let loaded = match self.backend.get(REMINDERS_SLOT)? {
            Some(json) => deserialize_reminders(&json)?,
            None => vec![],
        };

        self.by_id.clear();
        self.order.clear();
        // Re-keyed ids start above every persisted id so they can't clash
        // with an entry later in the list.
        let mut next_free = loaded.iter().map(|r| r.id).max().unwrap_or(0).saturating_add(1);
        let mut rekeyed = 0;
        for mut reminder in loaded {
            if self.by_id.contains_key(&reminder.id) {
                let id = self.fresh_id(next_free);
                log::warn!(
                    "Persisted reminder id {} is duplicated, re-keyed to {}",
                    reminder.id,
                    id
                );
                reminder.id = id;
                next_free = id.saturating_add(1);
                rekeyed += 1;
            }
            self.order.push(reminder.id);
            self.by_id.insert(reminder.id, reminder);
        }

        if rekeyed > 0
            && let Err(e) = self.persist()
        {
            log::warn!("Could not save {} re-keyed reminders: {:#}", rekeyed, e);
        }
        Ok(self.order.len())
    }

    pub fn list(&self) -> Vec<&Reminder> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .collect()
    }

    pub fn get(&self, id: i64) -> Option<&Reminder> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Creation timestamp as id, bumped past any id already taken.
    pub fn fresh_id(&self, now_ms: i64) -> i64 {
        let mut id = now_ms;
        while self.by_id.contains_key(&id) {
            id += 1;
        }
        id
    }

    pub fn add(&mut self, reminder: Reminder) -> Result<()> {
        let id = reminder.id;
        if self.by_id.contains_key(&id) {
            anyhow::bail!("Reminder id {} already exists", id);
        }
        self.order.push(id);
        self.by_id.insert(id, reminder);

        if let Err(e) = self.persist() {
            self.order.pop();
            self.by_id.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    /// Replaces all fields but the id. Returns `false` for unknown ids.
    pub fn update(&mut self, id: i64, fields: ReminderFields) -> Result<bool> {
        let Some(current) = self.by_id.get_mut(&id) else {
            return Ok(false);
        };
        let previous = current.clone();
        current.apply(fields);

        if let Err(e) = self.persist() {
            self.by_id.insert(id, previous);
            return Err(e);
        }
        Ok(true)
    }

    /// Removes by id. Returns `false` (and writes nothing) for unknown ids.
    pub fn remove(&mut self, id: i64) -> Result<bool> {
        let Some(pos) = self.order.iter().position(|&o| o == id) else {
            return Ok(false);
        };
        self.order.remove(pos);
        let removed = self.by_id.remove(&id);

        if let Err(e) = self.persist() {
            self.order.insert(pos, id);
            if let Some(r) = removed {
                self.by_id.insert(id, r);
            }
            return Err(e);
        }
        Ok(true)
    }

    fn persist(&mut self) -> Result<()> {
        let json = serialize_reminders(self.list())?;
        self.backend
            .put(REMINDERS_SLOT, &json)
            .context("Failed to save reminders")
    }
}
