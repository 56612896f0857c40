//! Ordered set of tabs awaiting a fetch.

use crate::domain::TabRef;

/// Tabs the user selected, in selection order.
///
/// An id present here is either waiting for its fetch or being fetched.
#[derive(Debug, Clone, Default)]
pub struct SelectionQueue {
    items: Vec<TabRef>,
}

impl SelectionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tab. Re-selecting a queued id keeps its position and takes the new name.
    pub fn insert(&mut self, item: TabRef) {
        match self.items.iter_mut().find(|queued| queued.id == item.id) {
            Some(queued) => queued.name = item.name,
            None => self.items.push(item),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<TabRef> {
        let index = self.items.iter().position(|queued| queued.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|queued| queued.id == id)
    }

    /// Owned copy of the current contents.
    pub fn snapshot(&self) -> Vec<TabRef> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
