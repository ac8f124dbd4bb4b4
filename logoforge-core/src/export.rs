//! # Export
//!
//! Turning a scene into pixels, and into a [`Payload`] for a store.
//!
//! The actual drawing is done by a [`DrawingSurface`], provided by the application. This module
//! decides *what* is drawn and in which order: visible layers bottom to top, and within a layer
//! the elements in sequence order, with groups flattened into their children.

use base64::Engine;

use crate::element::{ElementID, ElementKind, TextData};
use crate::io::payload::{EmbeddedAsset, Payload};
use crate::repositories::assets::{AssetID, Assets};
use crate::scene::{Canvas, Scene};
use crate::session::Session;
use crate::util::Rect;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// An encoded PNG image.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}
impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.png.len())
            .finish()
    }
}
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a PNG data URL")]
    NotPngUrl,
    #[error("invalid base64")]
    Encoding,
    #[error("not a PNG")]
    NotPng,
}
impl RasterImage {
    #[must_use]
    pub fn to_data_url(&self) -> String {
        let mut url = String::from(PNG_DATA_URL_PREFIX);
        base64::engine::general_purpose::STANDARD.encode_string(&self.png, &mut url);
        url
    }
    /// Parse a PNG data URL. Dimensions are read from the PNG header, the image is not decoded.
    pub fn from_data_url(url: &str) -> Result<Self, DataUrlError> {
        let encoded = url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or(DataUrlError::NotPngUrl)?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| DataUrlError::Encoding)?;
        // Signature, then the IHDR chunk: length, tag, width, height.
        if png.len() < 24 || png[..8] != PNG_SIGNATURE || &png[12..16] != b"IHDR" {
            return Err(DataUrlError::NotPng);
        }
        let dimension = |at: usize| u32::from_be_bytes([png[at], png[at + 1], png[at + 2], png[at + 3]]);
        let (width, height) = (dimension(16), dimension(20));
        Ok(Self { width, height, png })
    }
}

/// What to paint for one draw item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint<'a> {
    Text(&'a TextData),
    Image(AssetID),
}

/// One leaf element, with its rect in absolute canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem<'a> {
    /// The leaf's own ID, even when it sits inside a group.
    pub id: &'a ElementID,
    /// The top-level element this leaf belongs to, for hit testing.
    pub root: &'a ElementID,
    pub rect: Rect,
    pub paint: Paint<'a>,
}

/// Every leaf to draw, in order. Hidden layers contribute nothing.
#[must_use]
pub fn draw_list(scene: &Scene) -> Vec<DrawItem<'_>> {
    fn flatten<'a>(
        element: &'a crate::Element,
        root: &'a ElementID,
        offset: [f32; 2],
        out: &mut Vec<DrawItem<'a>>,
    ) {
        let rect = element.bounds().translated(offset);
        let paint = match &element.kind {
            ElementKind::Text(text) => Paint::Text(text),
            ElementKind::Image(image) => Paint::Image(image.source),
            ElementKind::Group(group) => {
                for child in &group.children {
                    flatten(child, root, rect.position(), out);
                }
                return;
            }
        };
        out.push(DrawItem {
            id: &element.id,
            root,
            rect,
            paint,
        });
    }
    let mut out = Vec::with_capacity(scene.elements().len());
    for element in scene.visible_elements() {
        flatten(element, &element.id, [0.0; 2], &mut out);
    }
    out
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("image {0} is not loaded")]
    MissingAsset(AssetID),
    #[error("no font available for {0:?}")]
    Font(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("{0}")]
    Surface(String),
}

/// Something which can draw a scene, and capture what it drew.
///
/// Surfaces may also show decorations on top of the scene: selection outlines, transform
/// handles, grid lines. Those never belong in an export.
pub trait DrawingSurface {
    /// Replace the surface's contents with the canvas background and the given items, in order.
    fn draw(&mut self, canvas: &Canvas, items: &[DrawItem<'_>], assets: &Assets)
        -> Result<(), RenderError>;
    /// The top-level element drawn topmost at the point, as of the last draw.
    fn element_at(&self, point: [f32; 2]) -> Option<ElementID>;
    fn set_decorations_visible(&mut self, visible: bool);
    fn decorations_visible(&self) -> bool;
    /// Encode the current frame.
    fn capture(&mut self) -> Result<RasterImage, RenderError>;
}

/// Hides decorations for its lifetime, restoring their previous visibility on drop - including
/// when a render fails partway and unwinds out with `?`.
struct DecorationsHidden<'a, Surface: DrawingSurface + ?Sized> {
    surface: &'a mut Surface,
    restore_to: bool,
}
impl<'a, Surface: DrawingSurface + ?Sized> DecorationsHidden<'a, Surface> {
    fn new(surface: &'a mut Surface) -> Self {
        let restore_to = surface.decorations_visible();
        surface.set_decorations_visible(false);
        Self {
            surface,
            restore_to,
        }
    }
}
impl<Surface: DrawingSurface + ?Sized> Drop for DecorationsHidden<'_, Surface> {
    fn drop(&mut self) {
        self.surface.set_decorations_visible(self.restore_to);
    }
}
impl<Surface: DrawingSurface + ?Sized> std::ops::Deref for DecorationsHidden<'_, Surface> {
    type Target = Surface;
    fn deref(&self) -> &Self::Target {
        self.surface
    }
}
impl<Surface: DrawingSurface + ?Sized> std::ops::DerefMut for DecorationsHidden<'_, Surface> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface
    }
}

/// Render the scene's visible layers without decorations and capture the result.
pub fn rasterize<Surface: DrawingSurface + ?Sized>(
    scene: &Scene,
    assets: &Assets,
    surface: &mut Surface,
) -> Result<RasterImage, RenderError> {
    let items = draw_list(scene);
    let mut surface = DecorationsHidden::new(surface);
    surface.draw(scene.canvas(), &items, assets)?;
    let image = surface.capture()?;
    log::debug!(
        "rasterized {} items into {}x{}",
        items.len(),
        image.width,
        image.height
    );
    Ok(image)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("can't save without a signed-in owner")]
    MissingOwner,
    #[error("image {0} is not loaded")]
    MissingAsset(AssetID),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Bundle a thumbnail, the elements, the layers, and the owner into a record for a store.
///
/// Fails before rendering anything if there is no owner.
pub fn build_persistence_payload<Surface: DrawingSurface + ?Sized>(
    scene: &Scene,
    session: &Session,
    surface: &mut Surface,
    assets: &Assets,
    name: impl Into<String>,
) -> Result<Payload, ExportError> {
    let owner = session
        .owner()
        .map_err(|_| ExportError::MissingOwner)?
        .clone();
    let embedded = Payload::referenced_assets(scene.elements())
        .into_iter()
        .map(|id| {
            assets
                .get(id)
                .map(|asset| EmbeddedAsset::from_asset(&asset))
                .ok_or(ExportError::MissingAsset(id))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let thumbnail = rasterize(scene, assets, surface)?;

    let mut elements = scene.elements().to_vec();
    // Selection state means nothing to the store.
    for element in &mut elements {
        element.draggable = false;
    }
    Ok(Payload {
        name: name.into(),
        thumbnail: thumbnail.to_data_url(),
        elements,
        layers: scene.layers().as_slice().to_vec(),
        active_layer: Some(scene.layers().active().clone()),
        canvas: *scene.canvas(),
        owner,
        created_at: chrono::Utc::now(),
        assets: embedded,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::{Credential, OwnerID};
    use crate::{Editor, EditorConfig};

    /// Records what it was asked to do.
    #[derive(Default)]
    struct MockSurface {
        decorations: bool,
        decorations_during_draw: Option<bool>,
        drawn: Vec<ElementID>,
        roots: Vec<(Rect, ElementID)>,
        fail_draw: bool,
    }
    impl DrawingSurface for MockSurface {
        fn draw(
            &mut self,
            _: &Canvas,
            items: &[DrawItem<'_>],
            _: &Assets,
        ) -> Result<(), RenderError> {
            self.decorations_during_draw = Some(self.decorations);
            if self.fail_draw {
                return Err(RenderError::Surface("out of ink".into()));
            }
            self.drawn = items.iter().map(|item| item.id.clone()).collect();
            self.roots = items
                .iter()
                .map(|item| (item.rect, item.root.clone()))
                .collect();
            Ok(())
        }
        fn element_at(&self, point: [f32; 2]) -> Option<ElementID> {
            self.roots
                .iter()
                .rev()
                .find(|(rect, _)| rect.contains(point))
                .map(|(_, id)| id.clone())
        }
        fn set_decorations_visible(&mut self, visible: bool) {
            self.decorations = visible;
        }
        fn decorations_visible(&self) -> bool {
            self.decorations
        }
        fn capture(&mut self) -> Result<RasterImage, RenderError> {
            // Smallest thing with a PNG header.
            let mut png = PNG_SIGNATURE.to_vec();
            png.extend_from_slice(&13u32.to_be_bytes());
            png.extend_from_slice(b"IHDR");
            png.extend_from_slice(&800u32.to_be_bytes());
            png.extend_from_slice(&600u32.to_be_bytes());
            Ok(RasterImage {
                width: 800,
                height: 600,
                png,
            })
        }
    }
    fn surface() -> MockSurface {
        MockSurface {
            decorations: true,
            ..MockSurface::default()
        }
    }
    #[test]
    fn draws_visible_layers_in_order() {
        let mut editor = Editor::new(EditorConfig::default());
        let bottom = editor.scene().layers().active().clone();
        let top = editor.add_layer(None);
        let on_top = editor.add_text("top");
        editor.set_active_layer(&bottom).unwrap();
        let below = editor.add_text("below");
        let third = editor.add_layer(None);
        let hidden = editor.add_text("hidden");
        editor.set_layer_visibility(&third, false).unwrap();
        let _ = (top, hidden);

        let mut surface = surface();
        let assets = Assets::new();
        rasterize(editor.scene(), &assets, &mut surface).unwrap();
        assert_eq!(surface.drawn, vec![below, on_top.clone()]);
        assert_eq!(surface.decorations_during_draw, Some(false));
        assert!(surface.decorations);
        assert_eq!(surface.element_at([400.0, 300.0]), Some(on_top));
    }
    #[test]
    fn groups_flatten_to_absolute() {
        let mut editor = Editor::new(EditorConfig::default());
        let a = editor.add_text("a");
        editor.commit_transform(&a, Rect::new(10.0, 10.0, 5.0, 5.0)).unwrap();
        let b = editor.add_text("b");
        editor.commit_transform(&b, Rect::new(30.0, 20.0, 5.0, 5.0)).unwrap();
        editor.click(&a, true).unwrap();
        let group = editor.group().unwrap();

        let items = draw_list(editor.scene());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].rect, Rect::new(10.0, 10.0, 5.0, 5.0));
        assert_eq!(items[1].rect, Rect::new(30.0, 20.0, 5.0, 5.0));
        assert!(items.iter().all(|item| item.root == &group));
    }
    #[test]
    fn decorations_restored_on_failure() {
        let editor = Editor::new(EditorConfig::default());
        let mut surface = MockSurface {
            fail_draw: true,
            ..surface()
        };
        let assets = Assets::new();
        assert!(rasterize(editor.scene(), &assets, &mut surface).is_err());
        assert_eq!(surface.decorations_during_draw, Some(false));
        assert!(surface.decorations);

        // Hidden stays hidden.
        surface.decorations = false;
        surface.fail_draw = false;
        rasterize(editor.scene(), &assets, &mut surface).unwrap();
        assert!(!surface.decorations);
    }
    #[test]
    fn payload_needs_owner() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.add_text("t");
        let mut surface = surface();
        let assets = Assets::new();
        let result = build_persistence_payload(
            editor.scene(),
            &Session::anonymous(),
            &mut surface,
            &assets,
            "My Logo",
        );
        assert_eq!(result, Err(ExportError::MissingOwner));
        // Never got as far as drawing.
        assert_eq!(surface.decorations_during_draw, None);

        let session = Session::new(
            Some(OwnerID::new("user-1").unwrap()),
            Some(Credential::new("token")),
        );
        let payload =
            build_persistence_payload(editor.scene(), &session, &mut surface, &assets, "My Logo")
                .unwrap();
        assert_eq!(payload.owner.as_str(), "user-1");
        assert_eq!(payload.elements.len(), 1);
        assert!(!payload.elements[0].draggable);
        let thumbnail = RasterImage::from_data_url(&payload.thumbnail).unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (800, 600));
    }
    #[test]
    fn missing_image_is_an_error() {
        let mut editor = Editor::new(EditorConfig::default());
        let source = AssetID::of_pixels([1, 1], &[1, 2, 3, 4]);
        editor.add_image(source, [1, 1]);
        let session = Session::new(Some(OwnerID::new("user-1").unwrap()), None);
        let result = build_persistence_payload(
            editor.scene(),
            &session,
            &mut surface(),
            &Assets::new(),
            "x",
        );
        assert_eq!(result, Err(ExportError::MissingAsset(source)));
    }
}
