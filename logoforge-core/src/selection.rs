use crate::element::{Element, ElementID};

/// The set of selected elements, in the order they were selected, with an optional primary.
///
/// The primary is the element whose properties the per-element controls edit. It is always
/// a member of the selection when set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    // Multi-select is rare and small.
    ids: smallvec::SmallVec<[ElementID; 4]>,
    primary: Option<ElementID>,
}
impl Selection {
    /// Plain click selects exactly `id`. Additive click toggles `id`'s membership.
    pub fn click(&mut self, id: ElementID, additive: bool) {
        if !additive {
            self.set_single(id);
            return;
        }
        if let Some(idx) = self.ids.iter().position(|selected| selected == &id) {
            self.ids.remove(idx);
            if self.primary.as_ref() == Some(&id) {
                self.primary = self.ids.last().cloned();
            }
        } else {
            self.ids.push(id.clone());
            self.primary = Some(id);
        }
    }
    /// Select exactly `id`, which also becomes primary.
    pub fn set_single(&mut self, id: ElementID) {
        self.ids.clear();
        self.ids.push(id.clone());
        self.primary = Some(id);
    }
    pub fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }
    #[must_use]
    pub fn contains(&self, id: &ElementID) -> bool {
        self.ids.contains(id)
    }
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ElementID> + '_ {
        self.ids.iter()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
    #[must_use]
    pub fn primary(&self) -> Option<&ElementID> {
        self.primary.as_ref()
    }
    /// Drop every id for which `keep` returns false. The primary falls back to the latest survivor.
    pub fn retain(&mut self, mut keep: impl FnMut(&ElementID) -> bool) {
        self.ids.retain(|id| keep(id));
        if self.primary.as_ref().is_some_and(|primary| !self.ids.contains(primary)) {
            self.primary = self.ids.last().cloned();
        }
    }
    /// Rebuild from the `draggable` flags of top-level elements, after the element list was replaced
    /// wholesale. The old primary is kept if it survived.
    pub fn rederive(&mut self, elements: &[Element]) {
        let old_primary = self.primary.take();
        self.ids = elements
            .iter()
            .filter(|element| element.draggable)
            .map(|element| element.id.clone())
            .collect();
        self.primary = match old_primary {
            Some(primary) if self.ids.contains(&primary) => Some(primary),
            _ => self.ids.last().cloned(),
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn ids<const N: usize>() -> [ElementID; N] {
        std::array::from_fn(|_| ElementID::generate("test"))
    }
    #[test]
    fn plain_click_replaces() {
        let [a, b] = ids();
        let mut selection = Selection::default();
        selection.click(a.clone(), false);
        selection.click(b.clone(), false);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(&b) && !selection.contains(&a));
        assert_eq!(selection.primary(), Some(&b));
    }
    #[test]
    fn additive_click_toggles() {
        let [a, b] = ids();
        let mut selection = Selection::default();
        selection.click(a.clone(), true);
        selection.click(b.clone(), true);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.primary(), Some(&b));
        selection.click(b.clone(), true);
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec![&a]);
        // Primary fell back to what's left.
        assert_eq!(selection.primary(), Some(&a));
        selection.click(a, true);
        assert!(selection.is_empty());
        assert_eq!(selection.primary(), None);
    }
    #[test]
    fn rederive_from_flags() {
        let layer = crate::LayerID::from_raw("default");
        let mut elements: Vec<_> = (0..3).map(|_| Element::text("t", layer.clone())).collect();
        elements[0].draggable = true;
        elements[2].draggable = true;
        let mut selection = Selection::default();
        selection.set_single(elements[0].id.clone());
        selection.rederive(&elements);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.primary(), Some(&elements[0].id));

        elements[0].draggable = false;
        selection.rederive(&elements);
        assert_eq!(selection.primary(), Some(&elements[2].id));
    }
}
