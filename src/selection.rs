use tracing::debug;

use crate::data::{Country, CountryId};

/// What the store keeps of a selected country.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionEntry {
    pub id: CountryId,
    pub a3: String,
    pub name: String,
}

impl From<&Country> for SelectionEntry {
    fn from(c: &Country) -> Self {
        Self { id: c.id.clone(), a3: c.a3.clone(), name: c.name.clone() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// Countries picked for the quiz, unique by id, in click order.
#[derive(Clone, Debug, Default)]
pub struct SelectionStore {
    entries: Vec<SelectionEntry>,
}

/// Fewest countries a test can run with.
pub const MIN_TEST_SIZE: usize = 2;

impl SelectionStore {
    pub fn toggle(&mut self, country: &Country) -> Toggle {
        if let Some(pos) = self.entries.iter().position(|e| e.id == country.id) {
            self.entries.remove(pos);
            debug!(id = %country.id, size = self.entries.len(), "country deselected");
            Toggle::Removed
        } else {
            self.entries.push(SelectionEntry::from(country));
            debug!(id = %country.id, size = self.entries.len(), "country selected");
            Toggle::Added
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn contains(&self, id: &CountryId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether "start test" should be offered.
    pub fn can_start_test(&self) -> bool {
        self.entries.len() >= MIN_TEST_SIZE
    }
}
