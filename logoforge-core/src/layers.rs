//! # Layers
//!
//! An ordered list of named, independently visible layers. Position in the list is the draw order:
//! the first layer is drawn first, and so is at the bottom.
//!
//! There is always at least one layer, and always exactly one active layer which new elements attach to.

pub type LayerID = crate::StableID<Layer>;

/// ID of the layer every new scene starts with.
pub const DEFAULT_LAYER_ID: &str = "default";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub id: LayerID,
    pub name: String,
    pub visible: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("layer {0} not found")]
    NotFound(LayerID),
    #[error("layer index {index} out of range for {len} layers")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("can't remove the last layer")]
    LastLayer,
    #[error("duplicate layer {0}")]
    Duplicate(LayerID),
    #[error("no layers given")]
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
    active: LayerID,
}
impl Default for LayerRegistry {
    fn default() -> Self {
        let first = Layer {
            id: LayerID::from_raw(DEFAULT_LAYER_ID),
            name: "Layer 1".to_owned(),
            visible: true,
        };
        Self {
            active: first.id.clone(),
            layers: vec![first],
        }
    }
}
impl LayerRegistry {
    /// Rebuild a registry from a list of layers, e.g. read from a file.
    /// If `active` is missing or unknown, the topmost layer becomes active.
    pub fn from_layers(layers: Vec<Layer>, active: Option<LayerID>) -> Result<Self, LayerError> {
        let active = {
            let mut seen = hashbrown::HashSet::with_capacity(layers.len());
            for layer in &layers {
                if !seen.insert(&layer.id) {
                    return Err(LayerError::Duplicate(layer.id.clone()));
                }
            }
            match active {
                Some(active) if seen.contains(&active) => active,
                _ => layers.last().ok_or(LayerError::Empty)?.id.clone(),
            }
        };
        Ok(Self { layers, active })
    }
    /// Iterate layers in draw order, bottom first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> + ExactSizeIterator + '_ {
        self.layers.iter()
    }
    #[must_use]
    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }
    /// Always false, the registry can't be emptied. Here for clippy's sake.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
    #[must_use]
    pub fn get(&self, id: &LayerID) -> Option<&Layer> {
        self.layers.iter().find(|layer| &layer.id == id)
    }
    #[must_use]
    pub fn contains(&self, id: &LayerID) -> bool {
        self.get(id).is_some()
    }
    #[must_use]
    pub fn index_of(&self, id: &LayerID) -> Option<usize> {
        self.layers.iter().position(|layer| &layer.id == id)
    }
    #[must_use]
    pub fn is_visible(&self, id: &LayerID) -> bool {
        self.get(id).is_some_and(|layer| layer.visible)
    }
    #[must_use]
    pub fn active(&self) -> &LayerID {
        &self.active
    }
    fn get_mut(&mut self, id: &LayerID) -> Result<&mut Layer, LayerError> {
        self.layers
            .iter_mut()
            .find(|layer| &layer.id == id)
            .ok_or_else(|| LayerError::NotFound(id.clone()))
    }
    /// Append a new layer on top and make it active.
    /// With no name, one is generated from the layer count.
    pub fn add_layer(&mut self, name: Option<String>) -> LayerID {
        let name = name.unwrap_or_else(|| format!("Layer {}", self.layers.len() + 1));
        let layer = Layer {
            id: LayerID::generate("layer"),
            name,
            visible: true,
        };
        let id = layer.id.clone();
        log::debug!("added layer {id} {:?}", layer.name);
        self.layers.push(layer);
        self.active = id.clone();
        id
    }
    pub fn set_visibility(&mut self, id: &LayerID, visible: bool) -> Result<(), LayerError> {
        self.get_mut(id)?.visible = visible;
        Ok(())
    }
    /// Flip visibility, returning the new state.
    pub fn toggle_visibility(&mut self, id: &LayerID) -> Result<bool, LayerError> {
        let layer = self.get_mut(id)?;
        layer.visible = !layer.visible;
        Ok(layer.visible)
    }
    pub fn rename(&mut self, id: &LayerID, name: String) -> Result<(), LayerError> {
        self.get_mut(id)?.name = name;
        Ok(())
    }
    /// Move the layer at `from` so it ends up at index `to`, shifting those in between.
    /// Either index out of range is an error, and nothing moves.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), LayerError> {
        let len = self.layers.len();
        for index in [from, to] {
            if index >= len {
                return Err(LayerError::IndexOutOfRange { index, len });
            }
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        Ok(())
    }
    pub fn set_active(&mut self, id: &LayerID) -> Result<(), LayerError> {
        if !self.contains(id) {
            return Err(LayerError::NotFound(id.clone()));
        }
        self.active = id.clone();
        Ok(())
    }
    /// Remove a layer, returning the layer that should take over its elements:
    /// the one below it, or the one above if it was the bottom layer.
    ///
    /// If the removed layer was active, the returned layer becomes active.
    pub fn remove(&mut self, id: &LayerID) -> Result<LayerID, LayerError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| LayerError::NotFound(id.clone()))?;
        if self.layers.len() == 1 {
            return Err(LayerError::LastLayer);
        }
        self.layers.remove(index);
        // Below if there is one, else the new occupant of this index (the one that was above).
        let heir = self.layers[index.saturating_sub(1)].id.clone();
        if &self.active == id {
            self.active = heir.clone();
        }
        log::debug!("removed layer {id}, elements go to {heir}");
        Ok(heir)
    }
}
