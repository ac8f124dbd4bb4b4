//! # logoforge-core
//!
//! The document model of the logo editor: elements and layers, selection, snapshot history,
//! and the adapters which turn a scene into pixels or into a record for a remote store.
//!
//! Nothing in here is async or owns a thread. Work that has to leave the editing thread is
//! described by [`tasks`] and carried out by the application.

pub mod color;
pub mod editor;
pub mod element;
pub mod export;
pub mod gateway;
pub mod history;
pub mod id;
pub mod io;
pub mod layers;
pub mod repositories;
pub mod scene;
pub mod selection;
pub mod session;
pub mod tasks;
pub mod util;

use id::FuzzID;
use id::StableID;

pub use editor::{EditError, Editor, EditorConfig};
pub use element::{Element, ElementID, ElementKind};
pub use layers::{Layer, LayerID, LayerRegistry};
pub use scene::{Canvas, Scene, Snapshot};
