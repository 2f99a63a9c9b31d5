use std::collections::BTreeSet;

use super::LineItem;

/// Entry ids the shopper has ticked for purchase. Lives only as long as the
/// loaded cart it refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership and returns whether the entry is selected afterwards.
    pub fn toggle(&mut self, entry_id: &str) -> bool {
        if self.entries.remove(entry_id) {
            false
        } else {
            self.entries.insert(entry_id.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops every id that no longer has a loaded line item.
    pub fn retain_loaded(&mut self, items: &[LineItem]) {
        self.entries
            .retain(|id| items.iter().any(|it| &it.entry_id == id));
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.entries.contains(entry_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Selection {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> LineItem {
        LineItem {
            entry_id: id.to_string(),
            product_id: format!("p-{id}"),
            name: String::new(),
            price: 0.0,
            image_url: String::new(),
        }
    }

    #[test]
    fn toggle_pair_is_a_no_op() {
        let mut sel: Selection = ["a"].into_iter().collect();
        let before = sel.clone();

        assert!(sel.toggle("b"));
        assert!(!sel.toggle("b"));
        assert_eq!(sel, before);

        assert!(!sel.toggle("a"));
        assert!(sel.toggle("a"));
        assert_eq!(sel, before);
    }

    #[test]
    fn retain_loaded_prunes_missing_entries() {
        let mut sel: Selection = ["1", "2", "3"].into_iter().collect();
        sel.retain_loaded(&[item("1"), item("3")]);

        assert_eq!(sel.iter().collect::<Vec<_>>(), vec!["1", "3"]);
    }

    #[test]
    fn clear_empties() {
        let mut sel: Selection = ["x", "y"].into_iter().collect();
        sel.clear();
        assert!(sel.is_empty());
        assert_eq!(sel.len(), 0);
    }
}
