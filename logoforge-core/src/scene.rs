//! # Scene
//!
//! The document being edited: elements in z-order, the layers they attach to, and the canvas they sit on.
//!
//! Elements are kept behind an [`Arc`], so taking a [`Snapshot`] is a refcount bump. The first mutation after
//! a snapshot pays for a deep copy, every later one is free until the next snapshot.

use std::sync::Arc;

use crate::color::Color;
use crate::element::{Element, ElementID};
use crate::layers::{LayerID, LayerRegistry};
use crate::util::Rect;

/// The drawable area.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
    pub background: Color,
}
impl Canvas {
    #[must_use]
    pub fn size(&self) -> [f32; 2] {
        [self.width, self.height]
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}
impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            background: Color::WHITE,
        }
    }
}

/// An immutable copy of a scene's elements, for undo and redo.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot(Arc<Vec<Element>>);
impl Snapshot {
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.0
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("element {element} refers to missing layer {layer}")]
    DanglingLayer { element: ElementID, layer: LayerID },
    #[error("element id {0} is used more than once")]
    DuplicateElement(ElementID),
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    elements: Arc<Vec<Element>>,
    layers: LayerRegistry,
    canvas: Canvas,
}
impl Scene {
    #[must_use]
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            ..Self::default()
        }
    }
    /// Assemble a scene from parts, checking that every element's layer exists and ids are unique.
    pub fn from_parts(
        canvas: Canvas,
        layers: LayerRegistry,
        elements: Vec<Element>,
    ) -> Result<Self, SceneError> {
        let scene = Self {
            elements: Arc::new(elements),
            layers,
            canvas,
        };
        scene.validate()?;
        Ok(scene)
    }
    /// Check the scene's invariants.
    pub fn validate(&self) -> Result<(), SceneError> {
        let mut seen = hashbrown::HashSet::new();
        let mut result = Ok(());
        for element in self.elements.iter() {
            element.visit(&mut |element| {
                if result.is_err() {
                    return;
                }
                if !self.layers.contains(&element.layer) {
                    result = Err(SceneError::DanglingLayer {
                        element: element.id.clone(),
                        layer: element.layer.clone(),
                    });
                } else if !seen.insert(element.id.clone()) {
                    result = Err(SceneError::DuplicateElement(element.id.clone()));
                }
            });
        }
        result
    }
    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }
    /// Top level elements, in z-order (bottom first).
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
    #[must_use]
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }
    pub(crate) fn layers_mut(&mut self) -> &mut LayerRegistry {
        &mut self.layers
    }
    /// Mutable access to the elements. Copies them if a snapshot still shares them!
    pub(crate) fn elements_mut(&mut self) -> &mut Vec<Element> {
        Arc::make_mut(&mut self.elements)
    }
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.elements.clone())
    }
    /// Replace the elements with a snapshot's. Elements whose layer has since been removed are
    /// moved onto the active layer, so the scene never references a missing layer.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.elements = snapshot.0;
        let layers = &self.layers;
        let mut orphaned = false;
        for element in self.elements.iter() {
            element.visit(&mut |element| orphaned |= !layers.contains(&element.layer));
        }
        if orphaned {
            let active = layers.active().clone();
            log::debug!("restored elements reference removed layers, moving them to {active}");
            for element in Arc::make_mut(&mut self.elements) {
                element.visit_mut(&mut |element| {
                    if !layers.contains(&element.layer) {
                        element.layer = active.clone();
                    }
                });
            }
        }
    }
    #[must_use]
    pub fn index_of(&self, id: &ElementID) -> Option<usize> {
        self.elements.iter().position(|element| &element.id == id)
    }
    /// Get a top-level element.
    #[must_use]
    pub fn get(&self, id: &ElementID) -> Option<&Element> {
        self.elements.iter().find(|element| &element.id == id)
    }
    /// Is there an element with this id, at the top level or inside a group?
    #[must_use]
    pub fn contains_anywhere(&self, id: &ElementID) -> bool {
        self.elements.iter().any(|element| element.contains_id(id))
    }
    /// Top level elements that are drawn, in draw order: by layer, then by z-order within the layer.
    pub fn visible_elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.layers
            .iter()
            .filter(|layer| layer.visible)
            .flat_map(move |layer| {
                self.elements
                    .iter()
                    .filter(move |element| element.layer == layer.id)
            })
    }
    /// The topmost visible element under the point, if any.
    #[must_use]
    pub fn element_at(&self, point: [f32; 2]) -> Option<&Element> {
        // Reverse draw order - last drawn is on top.
        let drawn: Vec<_> = self.visible_elements().collect();
        drawn
            .into_iter()
            .rev()
            .find(|element| element.bounds().contains(point))
    }
}
