//! # Editor
//!
//! The single entry point for changing a [`Scene`]. Every element mutation goes through a
//! [`writer::SceneWriter`], which snapshots the elements before the first change and records that
//! snapshot in the [`History`]. Selection changes are not edits, and are never recorded.
//!
//! Top-level elements carry a `draggable` flag mirroring whether they are selected. It's kept in
//! step after every selection change, and the selection is rebuilt from it after undo and redo.

mod writer;

use std::num::NonZeroUsize;

use crate::color::Color;
use crate::element::{Element, ElementID, ElementKind, FontStyle, TextData, FONT_SIZE_RANGE};
use crate::history::History;
use crate::layers::{LayerError, LayerID};
use crate::repositories::assets::AssetID;
use crate::scene::{Canvas, Scene};
use crate::selection::Selection;
use crate::util::{snap_to_grid, Rect};
use writer::SceneWriter;

/// Smallest width or height a transform handle can commit.
pub const MIN_ELEMENT_EXTENT: f32 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct EditorConfig {
    pub canvas: Canvas,
    /// Spacing of the snapping grid, in canvas pixels.
    pub grid_size: f32,
    pub snap: bool,
    /// Undo steps to keep, or `None` to keep every one.
    pub history_limit: Option<NonZeroUsize>,
}
impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            grid_size: 20.0,
            snap: false,
            history_limit: None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("nothing is selected")]
    NoSelection,
    #[error("no element {0}")]
    UnknownElement(ElementID),
    #[error("element {0} is not text")]
    NotText(ElementID),
    #[error("element {0} is not a group")]
    NotAGroup(ElementID),
    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// Canvas edge to align the primary selection against.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, strum::AsRefStr, strum::EnumIter, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum AlignEdge {
    Left,
    Center,
    Right,
}
impl AlignEdge {
    /// X position which puts an element of the given width against this edge.
    #[must_use]
    pub fn x_for(self, canvas_width: f32, element_width: f32) -> f32 {
        match self {
            Self::Left => 0.0,
            Self::Center => (canvas_width - element_width) / 2.0,
            Self::Right => canvas_width - element_width,
        }
    }
}

pub struct Editor {
    scene: Scene,
    selection: Selection,
    history: History,
    config: EditorConfig,
}
impl Editor {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            scene: Scene::new(config.canvas),
            selection: Selection::default(),
            history: History::new(config.history_limit),
            config,
        }
    }
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
    pub fn set_snap(&mut self, snap: bool) {
        self.config.snap = snap;
    }
    pub fn set_grid_size(&mut self, grid_size: f32) {
        self.config.grid_size = grid_size;
    }
    pub fn set_history_limit(&mut self, limit: Option<NonZeroUsize>) {
        self.config.history_limit = limit;
        self.history.set_limit(limit);
    }
    /// Swap in a whole new scene, e.g. one loaded from a store. History is forgotten and
    /// nothing is selected.
    pub fn replace_scene(&mut self, scene: Scene) {
        self.scene = scene;
        self.history.clear();
        self.selection.clear();
        self.sync_draggable();
        log::debug!("scene replaced, {} elements", self.scene.elements().len());
    }
    fn writer(&mut self) -> SceneWriter<'_> {
        SceneWriter::new(&mut self.scene, &mut self.history)
    }
    /// Make the `draggable` flags match the selection. Not an edit, so not recorded.
    fn sync_draggable(&mut self) {
        let selection = &self.selection;
        let stale = self
            .scene
            .elements()
            .iter()
            .any(|element| element.draggable != selection.contains(&element.id));
        if stale {
            for element in self.scene.elements_mut() {
                element.draggable = selection.contains(&element.id);
            }
        }
    }
    fn primary(&self) -> Result<ElementID, EditError> {
        let id = self.selection.primary().ok_or(EditError::NoSelection)?;
        if self.scene.get(id).is_none() {
            return Err(EditError::UnknownElement(id.clone()));
        }
        Ok(id.clone())
    }
    fn require(&self, id: &ElementID) -> Result<&Element, EditError> {
        self.scene
            .get(id)
            .ok_or_else(|| EditError::UnknownElement(id.clone()))
    }
    /// Append an element on top of everything else.
    pub(crate) fn insert_element(&mut self, element: Element) -> ElementID {
        let id = element.id.clone();
        log::debug!("adding {} {id}", element.tag());
        self.writer().elements_mut().push(element);
        id
    }

    /// Add a text element at the middle of the canvas, on the active layer, and select it.
    pub fn add_text(&mut self, text: impl Into<String>) -> ElementID {
        let mut element = Element::text(text, self.scene.layers().active().clone());
        let [width, height] = self.scene.canvas().size();
        element.position = [
            (width - element.size[0]) / 2.0,
            (height - element.size[1]) / 2.0,
        ];
        let id = self.insert_element(element);
        self.selection.set_single(id.clone());
        self.sync_draggable();
        id
    }
    /// Add an image on the active layer at a quarter of its natural size.
    pub fn add_image(&mut self, source: AssetID, natural_size: [u32; 2]) -> ElementID {
        let element = Element::image(source, natural_size, self.scene.layers().active().clone());
        self.insert_element(element)
    }
    /// Add an image covering the whole canvas, beneath every other element.
    pub fn add_backdrop(&mut self, source: AssetID, natural_size: [u32; 2]) -> ElementID {
        let element = Element::backdrop(
            source,
            natural_size,
            self.scene.canvas().size(),
            self.scene.layers().active().clone(),
        );
        let id = element.id.clone();
        log::debug!("adding backdrop {id}");
        self.writer().elements_mut().insert(0, element);
        id
    }

    /// Select an element. Additive clicks toggle it in or out of the selection.
    pub fn click(&mut self, id: &ElementID, additive: bool) -> Result<(), EditError> {
        self.require(id)?;
        self.selection.click(id.clone(), additive);
        self.sync_draggable();
        Ok(())
    }
    /// A click on bare canvas.
    pub fn click_empty(&mut self) {
        self.selection.clear();
        self.sync_draggable();
    }
    /// Click at a canvas point, selecting the topmost visible element there, or clearing the
    /// selection if there is none. Returns the element hit.
    pub fn click_at(&mut self, point: [f32; 2], additive: bool) -> Option<ElementID> {
        let hit = self.scene.element_at(point).map(|element| element.id.clone());
        match &hit {
            Some(id) => self.selection.click(id.clone(), additive),
            None => self.selection.clear(),
        }
        self.sync_draggable();
        hit
    }

    /// Move the primary selection horizontally against an edge of the canvas.
    pub fn align(&mut self, edge: AlignEdge) -> Result<(), EditError> {
        let id = self.primary()?;
        let canvas_width = self.scene.canvas().width;
        let mut writer = self.writer();
        if let Some(element) = writer.get_mut(&id) {
            element.position[0] = edge.x_for(canvas_width, element.size[0]);
        }
        Ok(())
    }
    /// Gather every selected element into a new group on the active layer, which becomes the
    /// selection. Needs at least two selected elements, else does nothing.
    pub fn group(&mut self) -> Option<ElementID> {
        let selected = self.selection.clone();
        let bounds = {
            let members: Vec<_> = self
                .scene
                .elements()
                .iter()
                .filter(|element| selected.contains(&element.id))
                .collect();
            if members.len() < 2 {
                log::debug!("group needs two or more elements, have {}", members.len());
                return None;
            }
            Rect::union_all(members.iter().map(|element| element.bounds()))?
        };
        let [origin_x, origin_y] = bounds.position();
        let layer = self.scene.layers().active().clone();

        let mut writer = self.writer();
        let elements = writer.elements_mut();
        let (children, rest): (Vec<_>, Vec<_>) = std::mem::take(elements)
            .into_iter()
            .partition(|element| selected.contains(&element.id));
        *elements = rest;
        let children = children
            .into_iter()
            .map(|mut child| {
                child.position = [child.position[0] - origin_x, child.position[1] - origin_y];
                child.draggable = false;
                child
            })
            .collect();
        let group = Element::group(children, bounds, layer);
        let id = group.id.clone();
        elements.push(group);
        drop(writer);

        log::debug!("grouped {} elements into {id}", selected.len());
        self.selection.set_single(id.clone());
        self.sync_draggable();
        Some(id)
    }
    /// Dissolve the primary group, putting its children back in its place at their absolute
    /// positions. The children become the selection.
    pub fn ungroup(&mut self) -> Result<Vec<ElementID>, EditError> {
        let id = self.primary()?;
        let Some(index) = self.scene.index_of(&id) else {
            return Err(EditError::UnknownElement(id));
        };

        let mut writer = self.writer();
        let elements = writer.elements_mut();
        let children = match &mut elements[index].kind {
            ElementKind::Group(group) => std::mem::take(&mut group.children),
            ElementKind::Text(_) | ElementKind::Image(_) => return Err(EditError::NotAGroup(id)),
        };
        let [origin_x, origin_y] = elements[index].position;
        let children: Vec<_> = children
            .into_iter()
            .map(|mut child| {
                child.position = [child.position[0] + origin_x, child.position[1] + origin_y];
                child
            })
            .collect();
        let ids: Vec<_> = children.iter().map(|child| child.id.clone()).collect();
        elements.splice(index..=index, children);
        drop(writer);

        self.selection.clear();
        for child in &ids {
            self.selection.click(child.clone(), true);
        }
        self.sync_draggable();
        Ok(ids)
    }
    /// Remove every selected element, returning what was removed. Nothing selected is a no-op.
    pub fn delete(&mut self) -> Vec<Element> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        let selected = self.selection.clone();
        let mut writer = self.writer();
        let elements = writer.elements_mut();
        let (removed, rest): (Vec<_>, Vec<_>) = std::mem::take(elements)
            .into_iter()
            .partition(|element| selected.contains(&element.id));
        *elements = rest;
        drop(writer);

        log::debug!("deleted {} elements", removed.len());
        self.selection.clear();
        self.sync_draggable();
        removed
    }
    /// Commit the end of a drag. With `snap`, each coordinate is rounded to the nearest multiple
    /// of `grid`. Returns the committed position.
    pub fn drag_end(
        &mut self,
        id: &ElementID,
        raw: [f32; 2],
        snap: bool,
        grid: f32,
    ) -> Result<[f32; 2], EditError> {
        self.require(id)?;
        let position = if snap {
            raw.map(|coord| snap_to_grid(coord, grid))
        } else {
            raw
        };
        if let Some(element) = self.writer().get_mut(id) {
            element.position = position;
        }
        Ok(position)
    }
    /// [`Self::drag_end`] with the configured grid settings.
    pub fn commit_drag(&mut self, id: &ElementID, raw: [f32; 2]) -> Result<[f32; 2], EditError> {
        let EditorConfig {
            snap, grid_size, ..
        } = self.config;
        self.drag_end(id, raw, snap, grid_size)
    }
    /// Commit a move and resize from a transform handle.
    pub fn commit_transform(&mut self, id: &ElementID, rect: Rect) -> Result<(), EditError> {
        self.require(id)?;
        if let Some(element) = self.writer().get_mut(id) {
            element.position = rect.position();
            element.size = rect.size().map(|extent| extent.max(MIN_ELEMENT_EXTENT));
        }
        Ok(())
    }

    fn edit_text(&mut self, edit: impl FnOnce(&mut TextData)) -> Result<(), EditError> {
        let id = self.primary()?;
        if self.require(&id)?.text_data().is_none() {
            return Err(EditError::NotText(id));
        }
        let mut writer = self.writer();
        if let Some(text) = writer.get_mut(&id).and_then(Element::text_data_mut) {
            edit(text);
        }
        Ok(())
    }
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), EditError> {
        let text = text.into();
        self.edit_text(|data| data.text = text)
    }
    pub fn set_fill(&mut self, fill: Color) -> Result<(), EditError> {
        self.edit_text(|data| data.fill = fill)
    }
    pub fn set_font_family(&mut self, family: impl Into<String>) -> Result<(), EditError> {
        let family = family.into();
        self.edit_text(|data| data.font_family = family)
    }
    /// Set the font size, clamped to [`FONT_SIZE_RANGE`]. Returns the size applied.
    pub fn set_font_size(&mut self, size: f32) -> Result<f32, EditError> {
        // NaN clamps to the minimum.
        let size = size
            .max(*FONT_SIZE_RANGE.start())
            .min(*FONT_SIZE_RANGE.end());
        self.edit_text(|data| data.font_size = size)?;
        Ok(size)
    }
    pub fn toggle_bold(&mut self) -> Result<(), EditError> {
        self.edit_text(|data| data.style.toggle(FontStyle::BOLD))
    }
    pub fn toggle_italic(&mut self) -> Result<(), EditError> {
        self.edit_text(|data| data.style.toggle(FontStyle::ITALIC))
    }

    /// Step back one edit. False if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.scene.snapshot()) else {
            return false;
        };
        self.scene.restore(previous);
        self.selection.rederive(self.scene.elements());
        true
    }
    /// Step forward one undone edit. False if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.scene.snapshot()) else {
            return false;
        };
        self.scene.restore(next);
        self.selection.rederive(self.scene.elements());
        true
    }

    // Layers. These aren't part of the history.

    /// Add a layer on top, which becomes active.
    pub fn add_layer(&mut self, name: Option<String>) -> LayerID {
        self.scene.layers_mut().add_layer(name)
    }
    pub fn set_layer_visibility(&mut self, id: &LayerID, visible: bool) -> Result<(), EditError> {
        Ok(self.scene.layers_mut().set_visibility(id, visible)?)
    }
    pub fn toggle_layer_visibility(&mut self, id: &LayerID) -> Result<bool, EditError> {
        Ok(self.scene.layers_mut().toggle_visibility(id)?)
    }
    pub fn reorder_layer(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        Ok(self.scene.layers_mut().reorder(from, to)?)
    }
    pub fn set_active_layer(&mut self, id: &LayerID) -> Result<(), EditError> {
        Ok(self.scene.layers_mut().set_active(id)?)
    }
    pub fn rename_layer(&mut self, id: &LayerID, name: String) -> Result<(), EditError> {
        Ok(self.scene.layers_mut().rename(id, name)?)
    }
    /// Remove a layer. Its elements move to the layer that replaces it (below, else above),
    /// and that move is recorded as an edit. Returns the heir.
    pub fn remove_layer(&mut self, id: &LayerID) -> Result<LayerID, EditError> {
        let heir = self.scene.layers_mut().remove(id)?;
        let mut orphaned = false;
        for element in self.scene.elements() {
            element.visit(&mut |element| orphaned |= &element.layer == id);
        }
        if orphaned {
            let mut writer = self.writer();
            for element in writer.elements_mut() {
                element.visit_mut(&mut |element| {
                    if &element.layer == id {
                        element.layer = heir.clone();
                    }
                });
            }
        }
        Ok(heir)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layers::DEFAULT_LAYER_ID;

    fn editor() -> Editor {
        Editor::new(EditorConfig::default())
    }
    /// Insert a text element with the given geometry, returning its id.
    fn place(editor: &mut Editor, rect: Rect) -> ElementID {
        let id = editor.add_text("t");
        editor.commit_transform(&id, rect).unwrap();
        id
    }
    #[test]
    fn add_text_centered_and_selected() {
        let mut editor = editor();
        let id = editor.add_text("New Text");
        let element = editor.scene().get(&id).unwrap();
        assert_eq!(element.position, [350.0, 290.0]);
        assert_eq!(element.layer.as_str(), DEFAULT_LAYER_ID);
        assert!(element.draggable);
        assert_eq!(editor.selection().primary(), Some(&id));
        assert!(editor.history().can_undo());
    }
    #[test]
    fn group_example() {
        let mut editor = editor();
        let a = place(&mut editor, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = place(&mut editor, Rect::new(20.0, 5.0, 10.0, 15.0));
        editor.click(&a, false).unwrap();
        editor.click(&b, true).unwrap();
        let group = editor.group().unwrap();

        assert_eq!(editor.scene().elements().len(), 1);
        let element = editor.scene().get(&group).unwrap();
        assert_eq!(element.bounds(), Rect::new(0.0, 0.0, 30.0, 20.0));
        let children = element.children();
        assert_eq!(children[0].id, a);
        assert_eq!(children[0].position, [0.0, 0.0]);
        assert_eq!(children[1].id, b);
        assert_eq!(children[1].position, [20.0, 5.0]);
        assert_eq!(editor.selection().iter().collect::<Vec<_>>(), vec![&group]);
        assert!(element.draggable);
    }
    #[test]
    fn group_needs_two() {
        let mut editor = editor();
        place(&mut editor, Rect::new(0.0, 0.0, 10.0, 10.0));
        let (undo_steps, _) = editor.history().len();
        assert_eq!(editor.group(), None);
        assert_eq!(editor.history().len().0, undo_steps);
    }
    #[test]
    fn ungroup_restores_absolute() {
        let mut editor = editor();
        let a = place(&mut editor, Rect::new(40.0, 60.0, 10.0, 10.0));
        let b = place(&mut editor, Rect::new(70.0, 65.0, 10.0, 15.0));
        editor.click(&a, true).unwrap();
        editor.group().unwrap();
        // Move the group, the children should follow.
        let group = editor.selection().primary().unwrap().clone();
        editor.drag_end(&group, [140.0, 160.0], false, 20.0).unwrap();
        let ids = editor.ungroup().unwrap();
        assert_eq!(ids, vec![a.clone(), b.clone()]);
        assert_eq!(editor.scene().get(&a).unwrap().position, [140.0, 160.0]);
        assert_eq!(editor.scene().get(&b).unwrap().position, [170.0, 165.0]);
        assert_eq!(editor.selection().len(), 2);

        editor.click(&a, false).unwrap();
        assert_eq!(editor.ungroup(), Err(EditError::NotAGroup(a)));
    }
    #[test]
    fn align_center() {
        let mut editor = editor();
        let id = place(&mut editor, Rect::new(13.0, 40.0, 100.0, 20.0));
        editor.align(AlignEdge::Center).unwrap();
        assert_eq!(editor.scene().get(&id).unwrap().position, [350.0, 40.0]);
        editor.align(AlignEdge::Right).unwrap();
        assert_eq!(editor.scene().get(&id).unwrap().position[0], 700.0);
        editor.align(AlignEdge::Left).unwrap();
        assert_eq!(editor.scene().get(&id).unwrap().position[0], 0.0);

        // Already there, still an edit: recorded, and redo is gone.
        assert!(editor.undo());
        let steps = editor.history().len().0;
        editor.align(AlignEdge::Right).unwrap();
        assert_eq!(editor.history().len(), (steps + 1, 0));
        assert!(!editor.redo());

        editor.click_empty();
        assert_eq!(editor.align(AlignEdge::Left), Err(EditError::NoSelection));
    }
    #[test]
    fn delete_empty_selection_is_noop() {
        let mut editor = editor();
        place(&mut editor, Rect::new(0.0, 0.0, 10.0, 10.0));
        editor.click_empty();
        let before = editor.scene().elements().to_vec();
        let steps = editor.history().len();
        assert!(editor.delete().is_empty());
        assert_eq!(editor.scene().elements(), &before[..]);
        assert_eq!(editor.history().len(), steps);
    }
    #[test]
    fn delete_selected() {
        let mut editor = editor();
        let a = place(&mut editor, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = place(&mut editor, Rect::new(0.0, 0.0, 10.0, 10.0));
        editor.click(&a, false).unwrap();
        let removed = editor.delete();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, a);
        assert!(editor.selection().is_empty());
        assert_eq!(editor.scene().elements().len(), 1);
        assert_eq!(editor.scene().elements()[0].id, b);
    }
    #[test]
    fn drag_snaps() {
        let mut editor = editor();
        let id = editor.add_text("t");
        assert_eq!(editor.drag_end(&id, [37.0, 53.0], true, 20.0), Ok([40.0, 60.0]));
        assert_eq!(editor.scene().get(&id).unwrap().position, [40.0, 60.0]);
        assert_eq!(editor.drag_end(&id, [37.0, 53.0], false, 20.0), Ok([37.0, 53.0]));

        let ghost = ElementID::from_raw("ghost");
        assert_eq!(
            editor.drag_end(&ghost, [0.0, 0.0], true, 20.0),
            Err(EditError::UnknownElement(ghost))
        );
    }
    #[test]
    fn undo_to_first_then_noop() {
        let mut editor = editor();
        let id = editor.add_text("t");
        let after_first = editor.scene().elements().to_vec();
        editor.drag_end(&id, [1.0, 2.0], false, 20.0).unwrap();
        editor.set_text("changed").unwrap();
        editor.toggle_bold().unwrap();

        while editor.history().len().0 > 1 {
            assert!(editor.undo());
        }
        assert_eq!(editor.scene().elements(), &after_first[..]);
        // And one more takes it to the empty scene, then nothing.
        assert!(editor.undo());
        assert!(editor.scene().elements().is_empty());
        assert!(!editor.undo());
        assert!(editor.scene().elements().is_empty());
    }
    #[test]
    fn redo_roundtrip_and_cleared_by_edit() {
        let mut editor = editor();
        let id = editor.add_text("t");
        editor.drag_end(&id, [10.0, 10.0], false, 20.0).unwrap();
        let state = editor.scene().elements().to_vec();
        assert!(editor.undo());
        assert!(editor.redo());
        assert_eq!(editor.scene().elements(), &state[..]);
        // The selection came back with the flags.
        assert_eq!(editor.selection().primary(), Some(&id));

        assert!(editor.undo());
        editor.set_text("edit2").unwrap();
        assert!(!editor.redo());
        assert_eq!(editor.scene().get(&id).unwrap().position, [350.0, 290.0]);
    }
    #[test]
    fn drag_in_place_clears_redo() {
        let mut editor = editor();
        let id = editor.add_text("t");
        editor.drag_end(&id, [10.0, 10.0], false, 20.0).unwrap();
        assert!(editor.undo());
        let here = editor.scene().get(&id).unwrap().position;
        editor.drag_end(&id, here, false, 20.0).unwrap();
        assert!(!editor.redo());
        assert_eq!(editor.scene().get(&id).unwrap().position, [350.0, 290.0]);
        // The in-place drag is a step of its own.
        assert!(editor.undo());
        assert_eq!(editor.scene().get(&id).unwrap().position, [350.0, 290.0]);
    }
    #[test]
    fn text_edits() {
        let mut editor = editor();
        let id = editor.add_text("t");
        editor.set_fill(Color::rgb(255, 0, 0)).unwrap();
        editor.set_font_family("Helvetica").unwrap();
        assert_eq!(editor.set_font_size(500.0), Ok(100.0));
        assert_eq!(editor.set_font_size(f32::NAN), Ok(10.0));
        editor.toggle_italic().unwrap();
        let data = editor.scene().get(&id).unwrap().text_data().unwrap().clone();
        assert_eq!(data.fill, Color::rgb(255, 0, 0));
        assert_eq!(data.font_family, "Helvetica");
        assert_eq!(data.font_size, 10.0);
        assert!(data.italic() && !data.bold());

        let source = AssetID::of_pixels([1, 1], &[0; 4]);
        let image = editor.add_image(source, [4, 4]);
        editor.click(&image, false).unwrap();
        assert_eq!(editor.set_text("x"), Err(EditError::NotText(image)));
    }
    #[test]
    fn click_at_hits_topmost() {
        let mut editor = editor();
        let low = place(&mut editor, Rect::new(0.0, 0.0, 100.0, 100.0));
        let high = place(&mut editor, Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(editor.click_at([75.0, 75.0], false), Some(high.clone()));
        assert_eq!(editor.click_at([10.0, 10.0], true), Some(low.clone()));
        assert_eq!(editor.selection().len(), 2);
        assert_eq!(editor.click_at([500.0, 500.0], false), None);
        assert!(editor.selection().is_empty());
        assert!(editor.scene().elements().iter().all(|e| !e.draggable));
    }
    #[test]
    fn selection_is_not_history() {
        let mut editor = editor();
        let a = editor.add_text("a");
        let steps = editor.history().len();
        editor.click_empty();
        editor.click(&a, false).unwrap();
        assert_eq!(editor.history().len(), steps);
    }
    #[test]
    fn remove_layer_rehomes() {
        let mut editor = editor();
        let bottom = editor.scene().layers().active().clone();
        let top = editor.add_layer(None);
        let id = editor.add_text("t");
        assert_eq!(editor.scene().get(&id).unwrap().layer, top);
        assert_eq!(editor.remove_layer(&top), Ok(bottom.clone()));
        assert_eq!(editor.scene().get(&id).unwrap().layer, bottom);
        // Undo brings back the element's old layer reference, which is re-homed again.
        assert!(editor.undo());
        assert_eq!(editor.scene().get(&id).unwrap().layer, bottom);
        assert_eq!(editor.scene().validate(), Ok(()));
        assert_eq!(
            editor.remove_layer(&bottom),
            Err(EditError::Layer(LayerError::LastLayer))
        );
    }
    #[test]
    fn history_limit() {
        let mut editor = Editor::new(EditorConfig {
            history_limit: NonZeroUsize::new(2),
            ..EditorConfig::default()
        });
        for _ in 0..5 {
            editor.add_text("t");
        }
        assert_eq!(editor.history().len(), (2, 0));
        assert!(editor.undo() && editor.undo() && !editor.undo());
        assert_eq!(editor.scene().elements().len(), 3);
    }
    #[test]
    fn backdrop_goes_beneath() {
        let mut editor = editor();
        let text = editor.add_text("t");
        let source = AssetID::of_pixels([1, 1], &[0; 4]);
        let backdrop = editor.add_backdrop(source, [10, 10]);
        let elements = editor.scene().elements();
        assert_eq!(elements[0].id, backdrop);
        assert_eq!(elements[1].id, text);
        assert_eq!(elements[0].bounds(), editor.scene().canvas().bounds());
        assert!(!elements[0].draggable);
    }
}
