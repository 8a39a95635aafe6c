use crate::core::model::Item;

/// Selects the items written by one author.
pub struct ItemFilter;

impl ItemFilter {
    /// Keeps items whose author matches exactly (case-sensitive), in page order.
    pub fn select(items: &[Item], author_id: &str) -> Vec<Item> {
        items
            .iter()
            .filter(|item| item.author_id == author_id)
            .cloned()
            .collect()
    }
}
