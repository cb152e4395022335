//! Favorites: the set of product ids a visitor has starred, in the order they were added.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ProductId;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ProductId>", into = "Vec<ProductId>")]
pub struct Favorites {
    ids: Vec<ProductId>,
}

impl Favorites {
    pub fn contains(&self, product_id: ProductId) -> bool { self.ids.contains(&product_id) }
    pub fn ids(&self) -> &[ProductId] { &self.ids }
    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Adds the product if absent, removes it otherwise. Returns whether it is now a favorite.
    pub fn toggle(&mut self, product_id: ProductId) -> bool {
        if let Some(pos) = self.ids.iter().position(|id| *id == product_id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(product_id);
            true
        }
    }
}

impl From<Vec<ProductId>> for Favorites {
    fn from(raw: Vec<ProductId>) -> Self {
        let mut ids = Vec::with_capacity(raw.len());
        for id in raw {
            if !ids.contains(&id) { ids.push(id); }
        }
        Self { ids }
    }
}

impl From<Favorites> for Vec<ProductId> {
    fn from(favorites: Favorites) -> Self { favorites.ids }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut favs = Favorites::default();
        assert!(favs.toggle(3));
        assert!(favs.toggle(1));
        assert_eq!(favs.ids(), &[3, 1]);
        assert!(!favs.toggle(3));
        assert_eq!(favs.ids(), &[1]);
        assert!(!favs.contains(3));
    }

    #[test]
    fn test_session_decode_dedups() {
        let favs: Favorites = serde_json::from_str("[4, 4, 2]").unwrap();
        assert_eq!(favs.len(), 2);
        assert_eq!(serde_json::to_string(&favs).unwrap(), "[4,2]");
    }
}
