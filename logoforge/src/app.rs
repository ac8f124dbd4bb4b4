//! The editing thread: runs commands against the [`Editor`], hands slow work to the [`Worker`],
//! and folds finished tasks back in.

use anyhow::Context;
use logoforge_core::export::{self, DrawingSurface};
use logoforge_core::gateway::RecordID;
use logoforge_core::session::Session;
use logoforge_core::tasks::{
    Applied, AssetPurpose, PendingTasks, TaskID, TaskKind, TaskMessage, TaskOutcome,
};
use logoforge_core::{Editor, ElementID, ElementKind};

use crate::actions::{self, Command, LayerCommand};
use crate::global::{self, settings::Settings};
use crate::surface::SoftwareSurface;
use crate::worker::{Request, Worker};

/// Text of a text element added without any.
const DEFAULT_TEXT: &str = "New Text";
const DEFAULT_LOGO_NAME: &str = "Untitled logo";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<'faces> {
    editor: Editor,
    pending: PendingTasks,
    session: Session,
    settings: Settings,
    surface: SoftwareSurface<'faces>,
    worker: Worker,
    /// Whether to run text recognition on added images.
    recognize: bool,
}
impl<'faces> App<'faces> {
    #[must_use]
    pub fn new(
        settings: Settings,
        session: Session,
        surface: SoftwareSurface<'faces>,
        worker: Worker,
        recognize: bool,
    ) -> Self {
        Self {
            editor: Editor::new(settings.editor_config()),
            pending: PendingTasks::default(),
            session,
            settings,
            surface,
            worker,
            recognize,
        }
    }
    #[must_use]
    pub fn editor(&self) -> &Editor {
        &self.editor
    }
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
    /// Stop the worker, handing back the settings as changed during the session.
    pub fn shutdown(self) -> Settings {
        self.worker.shutdown();
        self.settings
    }
    /// Run one line of input. Blank lines and `#` comments are skipped.
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Flow::Continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                return Flow::Continue;
            }
        };
        log::trace!("running {command:?}");
        match self.handle(command) {
            Ok(flow) => flow,
            Err(e) => {
                println!("error: {e:#}");
                Flow::Continue
            }
        }
    }
    /// Fold in a finished task, unless it was cancelled.
    pub fn apply(&mut self, message: TaskMessage) {
        if !self.pending.finish(message.task) {
            log::debug!("ignoring result of cancelled {}", message.task);
            return;
        }
        self.apply_outcome(message.outcome);
    }
    /// Wait up to `timeout` for running tasks to finish, applying them as they do.
    pub fn drain(
        &mut self,
        results: &crossbeam::channel::Receiver<TaskMessage>,
        timeout: std::time::Duration,
    ) {
        let deadline = std::time::Instant::now() + timeout;
        while self.has_pending() {
            match results.recv_deadline(deadline) {
                Ok(message) => self.apply(message),
                Err(crossbeam::channel::RecvTimeoutError::Timeout) => {
                    log::warn!("gave up waiting on {} tasks", self.pending.len());
                    break;
                }
                Err(crossbeam::channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }
    pub fn apply_outcome(&mut self, outcome: TaskOutcome) {
        let assets = global::assets();
        match self.editor.apply_outcome(outcome, assets) {
            Applied::ImageAdded { element, source } => {
                println!("added image {element}");
                if self.recognize {
                    if let Some(image) = assets.get(source) {
                        self.start(TaskKind::Recognize { source: element.clone() }, |task| {
                            Request::Recognize {
                                task,
                                source: element,
                                image,
                            }
                        });
                    }
                }
            }
            Applied::BackdropAdded(element) => println!("added backdrop {element}"),
            Applied::TextAdded { element, from } => {
                println!("recognized text in {from}, added as {element}");
            }
            Applied::NoText(source) => log::debug!("no text found in {source}"),
            Applied::Stale(source) => log::debug!("{source} was deleted before recognition finished"),
            Applied::Saved { id, name } => println!("saved {name:?} as {id}"),
            Applied::Loaded(id) => println!(
                "loaded {id}, {} elements",
                self.editor.scene().elements().len()
            ),
            Applied::Listed(summaries) => {
                if summaries.is_empty() {
                    println!("no saved logos");
                }
                for summary in summaries {
                    println!("{}  {}  {:?}", summary.id, summary.created_at, summary.name);
                }
            }
            Applied::Failed(message) => {
                log::warn!("{message}");
                println!("error: {message}");
            }
        }
    }
    fn start(&mut self, kind: TaskKind, request: impl FnOnce(TaskID) -> Request) {
        let task = self.pending.begin(kind);
        if let Err(e) = self.worker.send(request(task)) {
            log::error!("{e}");
            self.pending.cancel(task);
        }
    }
    fn element(&self, query: &str) -> anyhow::Result<ElementID> {
        Ok(actions::resolve_element(self.editor.scene(), query)?)
    }
    fn layer(&self, query: &str) -> anyhow::Result<logoforge_core::LayerID> {
        Ok(actions::resolve_layer(self.editor.scene(), query)?)
    }
    fn handle(&mut self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Text(text) => {
                let id = self
                    .editor
                    .add_text(text.unwrap_or_else(|| DEFAULT_TEXT.to_owned()));
                println!("added {id}");
            }
            Command::Image(path) => self.start(TaskKind::LoadAsset, |task| Request::LoadAsset {
                task,
                purpose: AssetPurpose::Image,
                path,
            }),
            Command::Backdrop(path) => {
                self.start(TaskKind::LoadAsset, |task| Request::LoadAsset {
                    task,
                    purpose: AssetPurpose::Backdrop,
                    path,
                });
            }
            Command::Click { target, additive } => {
                let id = self.element(&target)?;
                self.editor.click(&id, additive)?;
            }
            Command::ClickAt { point, additive } => match self.click_at(point, additive)? {
                Some(id) => println!("selected {id}"),
                None => println!("nothing there"),
            },
            Command::Deselect => self.editor.click_empty(),
            Command::Align(edge) => self.editor.align(edge)?,
            Command::Group => match self.editor.group() {
                Some(id) => println!("grouped as {id}"),
                None => println!("select at least two elements to group"),
            },
            Command::Ungroup => {
                let children = self.editor.ungroup()?;
                println!("ungrouped {} elements", children.len());
            }
            Command::Delete => {
                let removed = self.editor.delete();
                for task in self.pending.cancel_for_removed(&removed) {
                    // Already forgotten locally, so a failure here only wastes a little work.
                    let _ = self.worker.send(Request::Cancel(task));
                }
                println!("deleted {}", removed.len());
            }
            Command::Drag { target, to } => {
                let id = self.element(&target)?;
                let [x, y] = self.editor.commit_drag(&id, to)?;
                println!("{id} at {x}, {y}");
            }
            Command::Transform { target, rect } => {
                let id = self.element(&target)?;
                self.editor.commit_transform(&id, rect)?;
            }
            Command::SetText(text) => self.editor.set_text(text)?,
            Command::Fill(color) => self.editor.set_fill(color)?,
            Command::Font(family) => self.editor.set_font_family(family)?,
            Command::Size(size) => {
                let applied = self.editor.set_font_size(size)?;
                if (applied - size).abs() > f32::EPSILON {
                    println!("size clamped to {applied}");
                }
            }
            Command::Bold => self.editor.toggle_bold()?,
            Command::Italic => self.editor.toggle_italic()?,
            Command::Undo => {
                if !self.editor.undo() {
                    println!("nothing to undo");
                }
            }
            Command::Redo => {
                if !self.editor.redo() {
                    println!("nothing to redo");
                }
            }
            Command::HistoryLimit(limit) => {
                self.editor.set_history_limit(limit);
                self.settings.history_limit = limit;
            }
            Command::Layer(command) => self.layer_command(command)?,
            Command::Layers => self.print_layers(),
            Command::Grid(size) => {
                anyhow::ensure!(size >= 1.0, "grid size must be at least 1");
                self.editor.set_grid_size(size);
                self.settings.grid_size = size;
            }
            Command::Snap(snap) => {
                self.editor.set_snap(snap);
                self.settings.snap = snap;
            }
            Command::ShowGrid(show) => self.settings.show_grid = show,
            Command::List => self.print_elements(),
            Command::Status => self.print_status(),
            Command::View(path) => {
                self.refresh_decorations();
                let scene = self.editor.scene();
                self.surface
                    .draw(scene.canvas(), &export::draw_list(scene), global::assets())?;
                let image = self.surface.capture()?;
                std::fs::write(&path, image.png).with_context(|| format!("writing {path:?}"))?;
            }
            Command::Export(path) => {
                let image = export::rasterize(self.editor.scene(), global::assets(), &mut self.surface)?;
                std::fs::write(&path, image.png).with_context(|| format!("writing {path:?}"))?;
                println!("exported {}x{} to {path:?}", image.width, image.height);
            }
            Command::Save(name) => self.save(name.unwrap_or_else(|| DEFAULT_LOGO_NAME.to_owned()))?,
            Command::Load(id) => {
                let credential = self.session.credential()?.clone();
                self.start(TaskKind::Gateway, |task| Request::Load {
                    task,
                    credential,
                    id: RecordID(id),
                });
            }
            Command::Logos => {
                let owner = self.session.owner()?.clone();
                let credential = self.session.credential()?.clone();
                self.start(TaskKind::Gateway, |task| Request::List {
                    task,
                    credential,
                    owner,
                });
            }
            Command::Help => println!("{}", actions::HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
    fn save(&mut self, name: String) -> anyhow::Result<()> {
        let payload = export::build_persistence_payload(
            self.editor.scene(),
            &self.session,
            &mut self.surface,
            global::assets(),
            name,
        )?;
        let credential = self.session.credential()?.clone();
        self.start(TaskKind::Gateway, |task| Request::Save {
            task,
            credential,
            payload: Box::new(payload),
        });
        Ok(())
    }
    /// Hit test against what's actually drawn, falling back to element bounds if the scene
    /// can't be drawn right now.
    fn click_at(&mut self, point: [f32; 2], additive: bool) -> anyhow::Result<Option<ElementID>> {
        let scene = self.editor.scene();
        let drawn = self
            .surface
            .draw(scene.canvas(), &export::draw_list(scene), global::assets());
        if let Err(e) = drawn {
            log::debug!("hit testing by bounds, can't draw: {e}");
            return Ok(self.editor.click_at(point, additive));
        }
        match self.surface.element_at(point) {
            Some(id) => {
                self.editor.click(&id, additive)?;
                Ok(Some(id))
            }
            None => {
                self.editor.click_empty();
                Ok(None)
            }
        }
    }
    fn layer_command(&mut self, command: LayerCommand) -> anyhow::Result<()> {
        match command {
            LayerCommand::Add(name) => {
                let id = self.editor.add_layer(name);
                println!("added layer {id}");
            }
            LayerCommand::Use(layer) => {
                let id = self.layer(&layer)?;
                self.editor.set_active_layer(&id)?;
            }
            LayerCommand::Show(layer) => {
                let id = self.layer(&layer)?;
                self.editor.set_layer_visibility(&id, true)?;
            }
            LayerCommand::Hide(layer) => {
                let id = self.layer(&layer)?;
                self.editor.set_layer_visibility(&id, false)?;
            }
            LayerCommand::Toggle(layer) => {
                let id = self.layer(&layer)?;
                let visible = self.editor.toggle_layer_visibility(&id)?;
                println!("{id} {}", if visible { "shown" } else { "hidden" });
            }
            LayerCommand::Move { from, to } => self.editor.reorder_layer(from, to)?,
            LayerCommand::Rename { layer, name } => {
                let id = self.layer(&layer)?;
                self.editor.rename_layer(&id, name)?;
            }
            LayerCommand::Remove(layer) => {
                let id = self.layer(&layer)?;
                let heir = self.editor.remove_layer(&id)?;
                println!("removed {id}, its elements moved to {heir}");
            }
        }
        Ok(())
    }
    fn refresh_decorations(&mut self) {
        let scene = self.editor.scene();
        let outlines = self
            .editor
            .selection()
            .iter()
            .filter_map(|id| scene.get(id))
            .map(logoforge_core::Element::bounds)
            .collect::<Vec<_>>();
        self.surface.set_outlines(outlines);
        self.surface.set_grid(
            self.settings
                .show_grid
                .then_some(self.editor.config().grid_size),
        );
    }
    fn print_elements(&self) {
        let scene = self.editor.scene();
        let selection = self.editor.selection();
        if scene.elements().is_empty() {
            println!("no elements");
        }
        for (index, element) in scene.elements().iter().enumerate() {
            let marker = match selection.primary() {
                Some(primary) if primary == &element.id => '*',
                _ if selection.contains(&element.id) => '+',
                _ => ' ',
            };
            let bounds = element.bounds();
            let detail = match &element.kind {
                ElementKind::Text(text) => format!("{:?}", text.text),
                ElementKind::Image(image) => {
                    format!("{}x{} image", image.natural_size[0], image.natural_size[1])
                }
                ElementKind::Group(group) => format!("{} children", group.children.len()),
            };
            println!(
                "{marker}{index:>3} {} [{}, {} {}x{}] on {}  {detail}",
                element.id, bounds.x, bounds.y, bounds.width, bounds.height, element.layer
            );
        }
    }
    fn print_layers(&self) {
        let layers = self.editor.scene().layers();
        for (index, layer) in layers.iter().enumerate() {
            let active = if &layer.id == layers.active() { '*' } else { ' ' };
            let visible = if layer.visible { "" } else { " (hidden)" };
            println!("{active}{index:>3} {} {:?}{visible}", layer.id, layer.name);
        }
    }
    fn print_status(&self) {
        let scene = self.editor.scene();
        let (undo, redo) = self.editor.history().len();
        let assets = global::assets();
        println!(
            "{} elements, {} selected, {} layers",
            scene.elements().len(),
            self.editor.selection().len(),
            scene.layers().len()
        );
        println!("history: {undo} undo, {redo} redo");
        #[allow(clippy::cast_precision_loss)]
        let resident = human_bytes::human_bytes(assets.resident_bytes() as f64);
        println!("images: {} ({resident})", assets.len());
        println!("tasks running: {}", self.pending.len());
        match self.session.owner() {
            Ok(owner) => println!("signed in as {owner}"),
            Err(_) => println!("not signed in"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    use logoforge_core::gateway::InMemoryGateway;
    use logoforge_core::repositories::assets::Asset;
    use logoforge_core::session::{Credential, OwnerID};

    use crate::recognizer::{RecognizeError, TextRecognizer};
    use crate::text::Faces;

    /// Never answers.
    struct Stalled;
    #[async_trait::async_trait]
    impl TextRecognizer for Stalled {
        async fn recognize(&self, _: Arc<Asset>) -> Result<String, RecognizeError> {
            std::future::pending().await
        }
    }

    struct Harness {
        results: crossbeam::channel::Receiver<TaskMessage>,
        _gateway: Arc<InMemoryGateway>,
    }
    fn app(faces: &Faces, session: Session) -> (App<'_>, Harness) {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.add_account("token", OwnerID::new("alice").unwrap());
        let (send, results) = crossbeam::channel::unbounded();
        let worker = Worker::spawn(Arc::new(Stalled), gateway.clone(), send).unwrap();
        let app = App::new(
            Settings::default(),
            session,
            SoftwareSurface::new(faces),
            worker,
            true,
        );
        (
            app,
            Harness {
                results,
                _gateway: gateway,
            },
        )
    }
    fn alice() -> Session {
        Session::new(
            Some(OwnerID::new("alice").unwrap()),
            Some(Credential::new("token")),
        )
    }
    fn faces() -> Faces {
        Faces::with_database(fontdb::Database::new())
    }
    fn timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
    #[test]
    fn commands_edit() {
        let faces = faces();
        let (mut app, _harness) = app(&faces, Session::anonymous());
        assert_eq!(app.handle_line("text ACME"), Flow::Continue);
        assert_eq!(app.handle_line("align left"), Flow::Continue);
        let element = &app.editor().scene().elements()[0];
        assert_eq!(element.position[0], 0.0);
        assert_eq!(element.text_data().unwrap().text, "ACME");

        // Bad input changes nothing.
        app.handle_line("frobnicate");
        app.handle_line("click nobody");
        app.handle_line("# a comment");
        assert_eq!(app.editor().history().len(), (2, 0));

        app.handle_line("undo");
        assert_eq!(app.editor().scene().elements()[0].position[0], 350.0);
        assert_eq!(app.handle_line("quit"), Flow::Quit);
        app.shutdown();
    }
    #[test]
    fn saving_needs_an_owner() {
        let faces = faces();
        let (mut app, harness) = app(&faces, Session::anonymous());
        app.handle_line("save Mine");
        assert!(!app.has_pending());
        app.shutdown();
        assert!(harness.results.try_recv().is_err());
    }
    #[test]
    fn save_and_list() {
        let faces = faces();
        let (mut app, harness) = app(&faces, alice());
        app.handle_line("save Mine");
        assert!(app.has_pending());
        app.drain(&harness.results, timeout());
        assert!(!app.has_pending());

        app.handle_line("logos");
        let message = harness.results.recv_timeout(timeout()).unwrap();
        let TaskOutcome::Listed { result: Ok(listing) } = &message.outcome else {
            panic!("expected a listing");
        };
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "Mine");
        let id = listing[0].id.clone();
        app.apply(message);

        app.handle_line("text extra");
        app.handle_line(&format!("load {id}"));
        app.drain(&harness.results, timeout());
        assert!(app.editor().scene().elements().is_empty());
        app.shutdown();
    }
    #[test]
    fn deleting_an_image_cancels_recognition() {
        let faces = faces();
        let (mut app, harness) = app(&faces, Session::anonymous());
        let asset = Asset::from_rgba([8, 8], vec![90; 8 * 8 * 4]).unwrap();
        let path = std::env::temp_dir().join(format!("logoforge-app-test-{}.png", asset.id()));
        std::fs::write(&path, crate::loader::encode_png(&asset).unwrap()).unwrap();

        app.handle_line(&format!("image {}", path.display()));
        let loaded = harness.results.recv_timeout(timeout()).unwrap();
        app.apply(loaded);
        let _ = std::fs::remove_file(&path);
        // The image is in, and its recognition never finishes.
        assert_eq!(app.editor().scene().elements().len(), 1);
        assert!(app.has_pending());

        let image = app.editor().scene().elements()[0].id.clone();
        app.handle_line(&format!("click {image}"));
        app.handle_line("delete");
        assert!(!app.has_pending());
        app.shutdown();
    }
}
