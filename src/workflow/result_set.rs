use crate::models::item::{ExtractedItem, ItemPatch};

/// Position of an item that the result set does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Item index {index} is out of range (result set holds {len} items)")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    current: ExtractedItem,
    confirmed: ExtractedItem,
}

/// Ordered items of one job, keyed by position.
///
/// Each entry keeps the value last acknowledged by the backend next to the
/// value shown to the user, so a rejected edit can be undone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<Entry>,
}

impl ResultSet {
    pub fn from_items(items: Vec<ExtractedItem>) -> Self {
        let entries = items
            .into_iter()
            .map(|item| Entry {
                confirmed: item.clone(),
                current: item,
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExtractedItem> {
        self.entries.get(index).map(|e| &e.current)
    }

    pub fn confirmed(&self, index: usize) -> Option<&ExtractedItem> {
        self.entries.get(index).map(|e| &e.confirmed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedItem> {
        self.entries.iter().map(|e| &e.current)
    }

    pub fn to_vec(&self) -> Vec<ExtractedItem> {
        self.iter().cloned().collect()
    }

    /// True when the shown value differs from the confirmed one.
    pub fn is_pending(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| e.current != e.confirmed)
    }

    pub fn check_index(&self, index: usize) -> Result<(), IndexOutOfRange> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }

    /// Show `patch` on the entry before the backend has acknowledged it.
    pub fn apply_optimistic(&mut self, index: usize, patch: &ItemPatch) -> Result<(), IndexOutOfRange> {
        self.check_index(index)?;
        self.entries[index].current.apply(patch);
        Ok(())
    }

    pub fn confirm(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.confirmed = entry.current.clone();
        }
    }

    pub fn rollback(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.current = entry.confirmed.clone();
        }
    }

    /// Remove the entry at `index`, shifting later entries down.
    pub fn remove(&mut self, index: usize) -> Result<ExtractedItem, IndexOutOfRange> {
        self.check_index(index)?;
        Ok(self.entries.remove(index).current)
    }

    /// Sum of the shown estimated prices.
    pub fn total_estimated_value(&self) -> f64 {
        self.iter().map(|item| item.estimated_price).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price: f64) -> ExtractedItem {
        ExtractedItem {
            name: name.to_string(),
            category: "misc".to_string(),
            condition: "good".to_string(),
            estimated_price: price,
            confidence: None,
            frame_data: None,
            timestamp: None,
        }
    }

    fn price_patch(price: f64) -> ItemPatch {
        ItemPatch {
            estimated_price: Some(price),
            ..ItemPatch::default()
        }
    }

    #[test]
    fn optimistic_edit_then_rollback() {
        let mut set = ResultSet::from_items(vec![item("chair", 40.0), item("desk", 90.0)]);

        set.apply_optimistic(0, &price_patch(25.0)).unwrap();
        assert_eq!(set.get(0).unwrap().estimated_price, 25.0);
        assert_eq!(set.confirmed(0).unwrap().estimated_price, 40.0);
        assert!(set.is_pending(0));

        set.rollback(0);
        assert_eq!(set.get(0).unwrap().estimated_price, 40.0);
        assert!(!set.is_pending(0));
    }

    #[test]
    fn confirm_makes_edit_the_new_baseline() {
        let mut set = ResultSet::from_items(vec![item("chair", 40.0)]);
        set.apply_optimistic(0, &price_patch(35.0)).unwrap();
        set.confirm(0);
        set.apply_optimistic(0, &price_patch(10.0)).unwrap();
        set.rollback(0);
        assert_eq!(set.get(0).unwrap().estimated_price, 35.0);
    }

    #[test]
    fn remove_shifts_later_entries() {
        let mut set = ResultSet::from_items(vec![item("a", 1.0), item("b", 2.0), item("c", 3.0)]);
        assert_eq!(set.remove(0).unwrap().name, "a");
        assert_eq!(set.get(0).unwrap().name, "b");
        assert_eq!(set.remove(1).unwrap().name, "c");
        assert_eq!(set.len(), 1);
        assert_eq!(set.total_estimated_value(), 2.0);
    }

    #[test]
    fn out_of_range_is_reported() {
        let mut set = ResultSet::from_items(vec![item("a", 1.0)]);
        assert_eq!(
            set.apply_optimistic(3, &price_patch(1.0)),
            Err(IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(set.remove(1).is_err());
        assert_eq!(set.len(), 1);
    }
}
