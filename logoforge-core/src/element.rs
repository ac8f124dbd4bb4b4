//! # Elements
//!
//! Everything visible in a scene is an [`Element`]: a piece of text, an image, or a group of other
//! elements. The kind is a closed set - consumers match on [`ElementKind`] exhaustively, so a new
//! kind is a compile error everywhere it needs handling.

use crate::color::Color;
use crate::layers::LayerID;
use crate::repositories::assets::AssetID;
use crate::util::Rect;

pub type ElementID = crate::StableID<Element>;

/// Default size of a new text element, and of its font.
pub const DEFAULT_TEXT_SIZE: [f32; 2] = [100.0, 20.0];
pub const DEFAULT_FONT_SIZE: f32 = 20.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
/// Font sizes accepted by the text editing controls.
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<f32> = 10.0..=100.0;
/// Where newly added images land.
pub const DEFAULT_IMAGE_POSITION: [f32; 2] = [100.0, 100.0];
/// Newly added images are shown at a quarter of their natural size.
pub const IMAGE_DOWNSCALE: f32 = 4.0;

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
    pub struct FontStyle : u8 {
        const BOLD   = 0b0000_0001;
        const ITALIC = 0b0000_0010;
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub fill: Color,
    #[serde(default)]
    pub style: FontStyle,
}
impl TextData {
    #[must_use]
    pub fn bold(&self) -> bool {
        self.style.contains(FontStyle::BOLD)
    }
    #[must_use]
    pub fn italic(&self) -> bool {
        self.style.contains(FontStyle::ITALIC)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub source: AssetID,
    pub natural_size: [u32; 2],
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroupData {
    /// Children, positioned relative to the group's origin.
    pub children: Vec<Element>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, strum::EnumDiscriminants)]
#[serde(tag = "type", rename_all = "lowercase")]
#[strum_discriminants(name(ElementKindTag), derive(strum::AsRefStr, strum::Display, Hash))]
pub enum ElementKind {
    Text(TextData),
    Image(ImageData),
    Group(GroupData),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Element {
    pub id: ElementID,
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub layer: LayerID,
    /// Mirrors whether this element is currently selected, and so can be dragged.
    #[serde(default)]
    pub draggable: bool,
    pub kind: ElementKind,
}
impl Element {
    /// A new text element with the default font and size, at the origin.
    #[must_use]
    pub fn text(initial_text: impl Into<String>, layer: LayerID) -> Self {
        Self {
            id: ElementID::generate("text"),
            position: [0.0; 2],
            size: DEFAULT_TEXT_SIZE,
            layer,
            draggable: false,
            kind: ElementKind::Text(TextData {
                text: initial_text.into(),
                font_family: DEFAULT_FONT_FAMILY.to_owned(),
                font_size: DEFAULT_FONT_SIZE,
                fill: Color::BLACK,
                style: FontStyle::empty(),
            }),
        }
    }
    /// A new image element, shown at a quarter of its natural size.
    #[must_use]
    pub fn image(source: AssetID, natural_size: [u32; 2], layer: LayerID) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let size = natural_size.map(|px| px as f32 / IMAGE_DOWNSCALE);
        Self {
            id: ElementID::generate("image"),
            position: DEFAULT_IMAGE_POSITION,
            size,
            layer,
            draggable: false,
            kind: ElementKind::Image(ImageData {
                source,
                natural_size,
            }),
        }
    }
    /// An image stretched over the whole canvas. Used for templates, which sit behind everything else.
    #[must_use]
    pub fn backdrop(source: AssetID, natural_size: [u32; 2], canvas_size: [f32; 2], layer: LayerID) -> Self {
        Self {
            position: [0.0; 2],
            size: canvas_size,
            ..Self::image(source, natural_size, layer)
        }
    }
    /// A group at `bounds`, taking ownership of children that are already expressed relative to
    /// the bounds' origin.
    #[must_use]
    pub fn group(children: Vec<Element>, bounds: Rect, layer: LayerID) -> Self {
        Self {
            id: ElementID::generate("group"),
            position: bounds.position(),
            size: bounds.size(),
            layer,
            draggable: false,
            kind: ElementKind::Group(GroupData { children }),
        }
    }
    #[must_use]
    pub fn tag(&self) -> ElementKindTag {
        ElementKindTag::from(&self.kind)
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_position_size(self.position, self.size)
    }
    #[must_use]
    pub fn text_data(&self) -> Option<&TextData> {
        match &self.kind {
            ElementKind::Text(text) => Some(text),
            ElementKind::Image(_) | ElementKind::Group(_) => None,
        }
    }
    pub fn text_data_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.kind {
            ElementKind::Text(text) => Some(text),
            ElementKind::Image(_) | ElementKind::Group(_) => None,
        }
    }
    #[must_use]
    pub fn children(&self) -> &[Element] {
        match &self.kind {
            ElementKind::Group(group) => &group.children,
            ElementKind::Text(_) | ElementKind::Image(_) => &[],
        }
    }
    /// Does this element, or any of its descendants, have the given ID?
    #[must_use]
    pub fn contains_id(&self, id: &ElementID) -> bool {
        &self.id == id || self.children().iter().any(|child| child.contains_id(id))
    }
    /// Visit this element and every descendant, depth first, parents before children.
    pub fn visit(&self, f: &mut impl FnMut(&Element)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }
    /// Visit this element and every descendant mutably, parents before children.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        if let ElementKind::Group(group) = &mut self.kind {
            for child in &mut group.children {
                child.visit_mut(f);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn layer() -> LayerID {
        LayerID::from_raw("default")
    }
    #[test]
    fn text_defaults() {
        let text = Element::text("New Text", layer());
        assert_eq!(text.tag(), ElementKindTag::Text);
        assert_eq!(text.size, DEFAULT_TEXT_SIZE);
        let data = text.text_data().unwrap();
        assert_eq!(data.font_family, "Arial");
        assert_eq!(data.fill, Color::BLACK);
        assert!(!data.bold() && !data.italic());
    }
    #[test]
    fn fresh_ids() {
        let a = Element::text("a", layer());
        let b = Element::text("a", layer());
        assert_ne!(a.id, b.id);
    }
    #[test]
    fn image_quarter_size() {
        let source = AssetID::of_pixels([1, 1], &[0; 4]);
        let image = Element::image(source, [400, 200], layer());
        assert_eq!(image.size, [100.0, 50.0]);
        assert_eq!(image.position, DEFAULT_IMAGE_POSITION);
        let backdrop = Element::backdrop(source, [400, 200], [800.0, 600.0], layer());
        assert_eq!(backdrop.bounds(), Rect::new(0.0, 0.0, 800.0, 600.0));
    }
    #[test]
    fn nested_lookup() {
        let inner = Element::text("inner", layer());
        let inner_id = inner.id.clone();
        let group = Element::group(vec![inner], Rect::new(0.0, 0.0, 10.0, 10.0), layer());
        assert!(group.contains_id(&inner_id));
        let mut count = 0;
        group.visit(&mut |_| count += 1);
        assert_eq!(count, 2);
    }
    #[test]
    fn serializes_with_kind_tag() {
        let text = Element::text("hi", layer());
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["kind"]["type"], "text");
        assert_eq!(json["kind"]["fontFamily"], "Arial");
        let back: Element = serde_json::from_value(json).unwrap();
        assert_eq!(back, text);
    }
}
