//! The item catalog a session is assembled from.

use pricetag_protocol::Item;
use rand::seq::SliceRandom;

/// A fixed list of items to play through.
///
/// The server holds one catalog and every new session takes its own copy
/// of the items (optionally shuffled) at creation time. After that the
/// session's item list never changes, resets included.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    items: Vec<Item>,
}

impl Catalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// The catalog used when the server config doesn't list any items.
    pub fn builtin() -> Self {
        Self::new(vec![
            Item::new("Vintage Toaster", "https://placehold.co/400x300?text=Toaster", 45.0),
            Item::new("Gaming Chair", "https://placehold.co/400x300?text=Chair", 199.99),
            Item::new("Electric Scooter", "https://placehold.co/400x300?text=Scooter", 450.0),
            Item::new("Smart Watch", "https://placehold.co/400x300?text=Watch", 250.0),
            Item::new("Blender", "https://placehold.co/400x300?text=Blender", 89.99),
        ])
    }

    /// Copies the items out for a new session.
    pub fn assemble(&self, shuffle: bool) -> Vec<Item> {
        let mut items = self.items.clone();
        if shuffle {
            items.shuffle(&mut rand::rng());
        }
        items
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_has_five_priced_items() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.items().iter().all(|i| i.price > 0.0));
        assert_eq!(catalog.items()[0].name, "Vintage Toaster");
    }

    #[test]
    fn test_assemble_without_shuffle_keeps_order() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.assemble(false), catalog.items());
    }

    #[test]
    fn test_assemble_with_shuffle_keeps_the_same_items() {
        let catalog = Catalog::builtin();
        let mut shuffled: Vec<String> =
            catalog.assemble(true).into_iter().map(|i| i.name).collect();
        let mut original: Vec<String> =
            catalog.items().iter().map(|i| i.name.clone()).collect();
        shuffled.sort();
        original.sort();
        assert_eq!(shuffled, original);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.assemble(true).is_empty());
    }
}
