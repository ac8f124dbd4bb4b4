use crate::element::{Element, ElementID};
use crate::history::History;
use crate::scene::{Scene, Snapshot};

/// Scoped mutable access to a scene's elements which keeps the history in step.
///
/// The pre-mutation snapshot is taken on the first mutable access, before anything changes,
/// and recorded on drop. Recording clears redo, so it happens even when the write left the
/// elements as they were. A writer never asked for mutable access records nothing.
pub(super) struct SceneWriter<'a> {
    scene: &'a mut Scene,
    history: &'a mut History,
    checkpoint: Option<Snapshot>,
}
impl<'a> SceneWriter<'a> {
    pub(super) fn new(scene: &'a mut Scene, history: &'a mut History) -> Self {
        Self {
            scene,
            history,
            checkpoint: None,
        }
    }
    pub(super) fn elements_mut(&mut self) -> &mut Vec<Element> {
        if self.checkpoint.is_none() {
            self.checkpoint = Some(self.scene.snapshot());
        }
        self.scene.elements_mut()
    }
    pub(super) fn get_mut(&mut self, id: &ElementID) -> Option<&mut Element> {
        self.elements_mut().iter_mut().find(|element| &element.id == id)
    }
}
impl Drop for SceneWriter<'_> {
    fn drop(&mut self) {
        if let Some(before) = self.checkpoint.take() {
            if before.elements() == self.scene.elements() {
                log::trace!("write left the elements unchanged, recording anyway");
            }
            self.history.record(before);
        }
    }
}
