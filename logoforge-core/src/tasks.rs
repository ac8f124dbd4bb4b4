//! # Background tasks
//!
//! Decoding images, recognizing text, and talking to the store all happen off the editing thread.
//! They never see the scene. Instead each reports a [`TaskMessage`] which the editing thread feeds
//! to [`Editor::apply_outcome`], in whatever order they arrive.
//!
//! [`PendingTasks`] is the editing thread's ledger of what's in flight. It's what lets a deleted
//! image cancel the text recognition running on it, and lets late results be told apart from
//! cancelled ones.

use crate::element::{Element, ElementID, ElementKind};
use crate::gateway::{GatewayError, RecordID, RecordSummary};
use crate::io::payload::Payload;
use crate::repositories::assets::{Asset, AssetID, Assets};
use crate::Editor;

pub struct TaskMarker;
pub type TaskID = crate::FuzzID<TaskMarker>;

/// Where recognized text lands, and how big it is.
pub const RECOGNIZED_TEXT_RECT: crate::util::Rect = crate::util::Rect::new(100.0, 100.0, 300.0, 50.0);

/// A failure reported by a background task, already turned into something to show the user.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskFailure(pub String);
impl TaskFailure {
    pub fn new(err: impl std::fmt::Display) -> Self {
        Self(err.to_string())
    }
}

/// What a decoded image is for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::AsRefStr)]
pub enum AssetPurpose {
    /// An ordinary image element, which text recognition will also be run on.
    Image,
    /// A full-canvas template.
    Backdrop,
}

#[derive(Debug)]
pub enum TaskOutcome {
    AssetLoaded {
        purpose: AssetPurpose,
        /// Where it came from, for messages.
        label: String,
        result: Result<Asset, TaskFailure>,
    },
    TextRecognized {
        /// The image element the text was read from.
        source: ElementID,
        result: Result<String, TaskFailure>,
    },
    Saved {
        name: String,
        result: Result<RecordID, GatewayError>,
    },
    Loaded {
        id: RecordID,
        result: Result<Payload, GatewayError>,
    },
    Listed {
        result: Result<Vec<RecordSummary>, GatewayError>,
    },
}

#[derive(Debug)]
pub struct TaskMessage {
    pub task: TaskID,
    pub outcome: TaskOutcome,
}

/// Kinds of in-flight task, as tracked by [`PendingTasks`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    LoadAsset,
    Recognize { source: ElementID },
    Gateway,
}

/// What applying an outcome did to the editor, for reporting back to the user.
#[derive(Debug, PartialEq)]
pub enum Applied {
    /// An image element was added. Text recognition may be started on it.
    ImageAdded { element: ElementID, source: AssetID },
    BackdropAdded(ElementID),
    /// Recognized text was added as a new text element.
    TextAdded { element: ElementID, from: ElementID },
    /// Recognition finished, but found nothing.
    NoText(ElementID),
    /// The image text was recognized from has since been deleted, so the result was dropped.
    Stale(ElementID),
    Saved { id: RecordID, name: String },
    Loaded(RecordID),
    Listed(Vec<RecordSummary>),
    /// The task failed. Nothing changed.
    Failed(String),
}

impl Editor {
    /// Fold a background task's result into the editor.
    ///
    /// Failures never roll anything back: they're returned as [`Applied::Failed`] to be shown.
    pub fn apply_outcome(&mut self, outcome: TaskOutcome, assets: &Assets) -> Applied {
        match outcome {
            TaskOutcome::AssetLoaded {
                purpose,
                label,
                result,
            } => {
                let asset = match result {
                    Ok(asset) => asset,
                    Err(err) => return Applied::Failed(format!("couldn't load {label}: {err}")),
                };
                let natural_size = asset.size();
                let source = assets.insert(asset);
                match purpose {
                    AssetPurpose::Image => Applied::ImageAdded {
                        element: self.add_image(source, natural_size),
                        source,
                    },
                    AssetPurpose::Backdrop => {
                        Applied::BackdropAdded(self.add_backdrop(source, natural_size))
                    }
                }
            }
            TaskOutcome::TextRecognized { source, result } => {
                if !self.scene().contains_anywhere(&source) {
                    log::debug!("dropping text recognized from deleted {source}");
                    return Applied::Stale(source);
                }
                let text = match result {
                    Ok(text) => text,
                    Err(err) => return Applied::Failed(format!("text recognition failed: {err}")),
                };
                let text = text.trim();
                if text.is_empty() {
                    return Applied::NoText(source);
                }
                let mut element = Element::text(text, self.scene().layers().active().clone());
                element.position = RECOGNIZED_TEXT_RECT.position();
                element.size = RECOGNIZED_TEXT_RECT.size();
                Applied::TextAdded {
                    element: self.insert_element(element),
                    from: source,
                }
            }
            TaskOutcome::Saved { name, result } => match result {
                Ok(id) => Applied::Saved { id, name },
                Err(err) => Applied::Failed(format!("saving {name:?} failed: {err}")),
            },
            TaskOutcome::Loaded { id, result } => {
                let scene = result
                    .map_err(|err| err.to_string())
                    .and_then(|payload| payload.into_scene(assets).map_err(|err| err.to_string()));
                match scene {
                    Ok(scene) => {
                        self.replace_scene(scene);
                        Applied::Loaded(id)
                    }
                    Err(err) => Applied::Failed(format!("loading {id} failed: {err}")),
                }
            }
            TaskOutcome::Listed { result } => match result {
                Ok(list) => Applied::Listed(list),
                Err(err) => Applied::Failed(format!("listing failed: {err}")),
            },
        }
    }
}

/// Tasks started by the editing thread and not yet finished.
#[derive(Default, Debug)]
pub struct PendingTasks {
    tasks: hashbrown::HashMap<TaskID, TaskKind>,
}
impl PendingTasks {
    pub fn begin(&mut self, kind: TaskKind) -> TaskID {
        let id = TaskID::default();
        log::trace!("task {id} started: {kind:?}");
        self.tasks.insert(id, kind);
        id
    }
    /// Mark a task done. False if it was cancelled (or never existed), in which case its
    /// result should be ignored.
    pub fn finish(&mut self, id: TaskID) -> bool {
        self.tasks.remove(&id).is_some()
    }
    pub fn cancel(&mut self, id: TaskID) -> bool {
        self.tasks.remove(&id).is_some()
    }
    /// Cancel recognitions reading from any of these elements or their descendants.
    /// Returns the tasks cancelled, for the worker to abort.
    pub fn cancel_for_removed(&mut self, removed: &[Element]) -> Vec<TaskID> {
        let mut images = hashbrown::HashSet::new();
        for element in removed {
            element.visit(&mut |element| match &element.kind {
                ElementKind::Image(_) => {
                    images.insert(element.id.clone());
                }
                ElementKind::Text(_) | ElementKind::Group(_) => (),
            });
        }
        let cancelled: Vec<_> = self
            .tasks
            .iter()
            .filter_map(|(id, kind)| match kind {
                TaskKind::Recognize { source } if images.contains(source) => Some(*id),
                _ => None,
            })
            .collect();
        for id in &cancelled {
            log::debug!("cancelling {id}, its image was deleted");
            self.tasks.remove(id);
        }
        cancelled
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
