//! # Text rendering
//!
//! Faces are discovered with `fontdb` and rasterized with `fontdue`. Each `(family, bold, italic)`
//! combination is resolved and parsed at most once, including misses, so a scene naming a font the
//! system lacks doesn't rescan the database every frame.
//!
//! A family that isn't installed falls back to the system's sans-serif face.

use std::sync::Arc;

use logoforge_core::element::TextData;
use logoforge_core::util::Rect;

/// Location of fonts installed for logoforge only. May not exist.
#[must_use]
pub fn local_fonts() -> Option<std::path::PathBuf> {
    let mut data = dirs::data_dir()?;
    data.push(env!("CARGO_PKG_NAME"));
    data.push("fonts");
    Some(data)
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct FaceKey {
    family: String,
    bold: bool,
    italic: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FaceError {
    #[error("no face available for {0:?}")]
    NotFound(String),
}

pub struct Faces {
    db: fontdb::Database,
    /// `None` caches a miss.
    loaded: parking_lot::Mutex<hashbrown::HashMap<FaceKey, Option<Arc<fontdue::Font>>>>,
}
impl Faces {
    /// Create the database from the system font folders, and the logoforge local fonts.
    #[must_use]
    pub fn new_system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(locals) = local_fonts() {
            // This directory may not even exist. Fails silently.
            db.load_fonts_dir(locals);
        }
        log::debug!("found {} font faces", db.len());
        Self::with_database(db)
    }
    #[must_use]
    pub fn with_database(db: fontdb::Database) -> Self {
        Self {
            db,
            loaded: parking_lot::Mutex::default(),
        }
    }
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.db.len()
    }
    /// Find and parse the face for this text's family and style.
    pub fn get(&self, text: &TextData) -> Result<Arc<fontdue::Font>, FaceError> {
        let key = FaceKey {
            family: text.font_family.clone(),
            bold: text.bold(),
            italic: text.italic(),
        };
        let mut loaded = self.loaded.lock();
        if let Some(cached) = loaded.get(&key) {
            return cached
                .clone()
                .ok_or_else(|| FaceError::NotFound(key.family.clone()));
        }
        let font = self.load(&key).map(Arc::new);
        if font.is_none() {
            log::warn!("no font face for {key:?}");
        }
        loaded.insert(key.clone(), font.clone());
        font.ok_or(FaceError::NotFound(key.family))
    }
    fn load(&self, key: &FaceKey) -> Option<fontdue::Font> {
        let families = [fontdb::Family::Name(&key.family), fontdb::Family::SansSerif];
        let id = self.db.query(&fontdb::Query {
            families: &families,
            weight: if key.bold {
                fontdb::Weight::BOLD
            } else {
                fontdb::Weight::NORMAL
            },
            stretch: fontdb::Stretch::Normal,
            style: if key.italic {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
        })?;
        self.db
            .with_face_data(id, |data, collection_index| {
                fontdue::Font::from_bytes(
                    data,
                    fontdue::FontSettings {
                        collection_index,
                        ..fontdue::FontSettings::default()
                    },
                )
            })?
            .map_err(|e| log::warn!("failed to parse face for {key:?}: {e}"))
            .ok()
    }
}

/// Lay out `text` within `rect`, wrapping at its width, and blend it onto `target`.
/// Nothing is drawn outside of `rect`.
pub fn draw_text(font: &fontdue::Font, text: &TextData, rect: Rect, target: &mut image::RgbaImage) {
    use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle, WrapStyle};
    use image::Pixel;

    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings {
        x: rect.x,
        y: rect.y,
        max_width: Some(rect.width.max(1.0)),
        wrap_style: WrapStyle::Word,
        ..LayoutSettings::default()
    });
    layout.append(&[font], &TextStyle::new(&text.text, text.font_size.max(1.0), 0));

    let clip_right = rect.right().min(target.width() as f32);
    let clip_bottom = rect.bottom().min(target.height() as f32);
    let fill = text.fill.0;

    for glyph in layout.glyphs() {
        if glyph.width == 0 || glyph.height == 0 {
            continue;
        }
        let (metrics, coverage) = font.rasterize_config(glyph.key);
        let left = glyph.x.round();
        let top = glyph.y.round();
        for (index, &cover) in coverage.iter().enumerate() {
            if cover == 0 {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let (x, y) = (
                left + (index % metrics.width) as f32,
                top + (index / metrics.width) as f32,
            );
            if x < rect.x.max(0.0) || y < rect.y.max(0.0) || x >= clip_right || y >= clip_bottom {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let alpha = (u16::from(fill[3]) * u16::from(cover) / 255) as u8;
            let source = image::Rgba([fill[0], fill[1], fill[2], alpha]);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            target.get_pixel_mut(x as u32, y as u32).blend(&source);
        }
    }
}
