//! A [`DrawingSurface`] that paints into an in-memory RGBA8 frame.
//!
//! Decorations (selection outlines and the grid) are never painted into the frame itself. They're
//! composed over a copy at capture time, and only while visible.

use logoforge_core::color::Color;
use logoforge_core::export::{DrawItem, DrawingSurface, Paint, RasterImage, RenderError};
use logoforge_core::repositories::assets::Assets;
use logoforge_core::util::Rect;
use logoforge_core::{Canvas, ElementID};

use crate::text::{self, Faces};

const OUTLINE_COLOR: Color = Color::rgb(0, 150, 255);
const GRID_COLOR: Color = Color::rgba(0, 0, 0, 40);

pub struct SoftwareSurface<'faces> {
    faces: &'faces Faces,
    frame: image::RgbaImage,
    decorations_visible: bool,
    /// Grid spacing, if the grid should be shown.
    grid: Option<f32>,
    outlines: Vec<Rect>,
    /// Top-level element of every drawn item, in draw order.
    hits: Vec<(Rect, ElementID)>,
}
impl<'faces> SoftwareSurface<'faces> {
    #[must_use]
    pub fn new(faces: &'faces Faces) -> Self {
        Self {
            faces,
            frame: image::RgbaImage::new(1, 1),
            decorations_visible: true,
            grid: None,
            outlines: Vec::new(),
            hits: Vec::new(),
        }
    }
    pub fn set_grid(&mut self, grid: Option<f32>) {
        self.grid = grid.filter(|grid| grid.is_finite() && *grid >= 1.0);
    }
    /// Replace the selection outlines shown as decorations.
    pub fn set_outlines(&mut self, outlines: impl IntoIterator<Item = Rect>) {
        self.outlines.clear();
        self.outlines.extend(outlines);
    }
    fn draw_image(
        &mut self,
        assets: &Assets,
        source: logoforge_core::repositories::assets::AssetID,
        rect: Rect,
    ) -> Result<(), RenderError> {
        let asset = assets.get(source).ok_or(RenderError::MissingAsset(source))?;
        let [width, height] = asset.size();
        let pixels = image::RgbaImage::from_raw(width, height, asset.rgba().to_vec())
            .ok_or_else(|| RenderError::Surface(format!("image {source} has the wrong length")))?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (target_width, target_height) = (
            rect.width.round().max(1.0) as u32,
            rect.height.round().max(1.0) as u32,
        );
        if target_width <= width && target_height <= height {
            // Shrinking never needs a buffer bigger than the source.
            let scaled = if (target_width, target_height) == (width, height) {
                pixels
            } else {
                image::imageops::resize(
                    &pixels,
                    target_width,
                    target_height,
                    image::imageops::FilterType::Triangle,
                )
            };
            #[allow(clippy::cast_possible_truncation)]
            image::imageops::overlay(
                &mut self.frame,
                &scaled,
                rect.x.round() as i64,
                rect.y.round() as i64,
            );
        } else {
            self.sample_into_frame(&pixels, rect);
        }
        Ok(())
    }
    /// Stretch `pixels` over `rect`, touching only the part of the rect inside the frame.
    fn sample_into_frame(&mut self, pixels: &image::RgbaImage, rect: Rect) {
        use image::Pixel;
        let (frame_width, frame_height) = self.frame.dimensions();
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let visible = |start: f32, end: f32, limit: u32| {
            let from = start.max(0.0).floor();
            let to = end.min(limit as f32).ceil();
            (from < to).then(|| (from as u32)..(to as u32))
        };
        let (Some(columns), Some(rows)) = (
            visible(rect.x, rect.right(), frame_width),
            visible(rect.y, rect.bottom(), frame_height),
        ) else {
            return;
        };
        for y in rows {
            #[allow(clippy::cast_precision_loss)]
            let v = (y as f32 + 0.5 - rect.y) / rect.height;
            if !(0.0..=1.0).contains(&v) {
                continue;
            }
            for x in columns.clone() {
                #[allow(clippy::cast_precision_loss)]
                let u = (x as f32 + 0.5 - rect.x) / rect.width;
                if !(0.0..=1.0).contains(&u) {
                    continue;
                }
                if let Some(sample) = image::imageops::sample_bilinear(pixels, u, v) {
                    self.frame.get_pixel_mut(x, y).blend(&sample);
                }
            }
        }
    }
    /// The frame with decorations composed over it.
    fn decorated(&self) -> image::RgbaImage {
        use image::Pixel;
        let mut frame = self.frame.clone();
        let (width, height) = frame.dimensions();
        let mut plot = |x: i64, y: i64, color: Color| {
            if x >= 0 && y >= 0 && x < i64::from(width) && y < i64::from(height) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                frame
                    .get_pixel_mut(x as u32, y as u32)
                    .blend(&image::Rgba(color.0));
            }
        };
        if let Some(grid) = self.grid {
            #[allow(clippy::cast_possible_truncation)]
            let step = grid.round() as i64;
            for x in (0..i64::from(width)).step_by(step.max(1) as usize) {
                for y in 0..i64::from(height) {
                    plot(x, y, GRID_COLOR);
                }
            }
            for y in (0..i64::from(height)).step_by(step.max(1) as usize) {
                for x in 0..i64::from(width) {
                    plot(x, y, GRID_COLOR);
                }
            }
        }
        for outline in &self.outlines {
            #[allow(clippy::cast_possible_truncation)]
            let (left, top, right, bottom) = (
                outline.x.round() as i64,
                outline.y.round() as i64,
                outline.right().round() as i64 - 1,
                outline.bottom().round() as i64 - 1,
            );
            // Only the stretch inside the frame can show.
            for x in left.max(0)..=right.min(i64::from(width)) {
                plot(x, top, OUTLINE_COLOR);
                plot(x, bottom, OUTLINE_COLOR);
            }
            for y in top.max(0)..=bottom.min(i64::from(height)) {
                plot(left, y, OUTLINE_COLOR);
                plot(right, y, OUTLINE_COLOR);
            }
        }
        frame
    }
}
impl DrawingSurface for SoftwareSurface<'_> {
    fn draw(
        &mut self,
        canvas: &Canvas,
        items: &[DrawItem<'_>],
        assets: &Assets,
    ) -> Result<(), RenderError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (width, height) = (
            canvas.width.round().max(1.0) as u32,
            canvas.height.round().max(1.0) as u32,
        );
        self.frame = image::RgbaImage::from_pixel(width, height, image::Rgba(canvas.background.0));
        self.hits.clear();
        for item in items {
            match item.paint {
                Paint::Text(text) => {
                    let font = self
                        .faces
                        .get(text)
                        .map_err(|_| RenderError::Font(text.font_family.clone()))?;
                    text::draw_text(&font, text, item.rect, &mut self.frame);
                }
                Paint::Image(source) => self.draw_image(assets, source, item.rect)?,
            }
            self.hits.push((item.rect, item.root.clone()));
        }
        Ok(())
    }
    fn element_at(&self, point: [f32; 2]) -> Option<ElementID> {
        self.hits
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(point))
            .map(|(_, id)| id.clone())
    }
    fn set_decorations_visible(&mut self, visible: bool) {
        self.decorations_visible = visible;
    }
    fn decorations_visible(&self) -> bool {
        self.decorations_visible
    }
    fn capture(&mut self) -> Result<RasterImage, RenderError> {
        let decorated;
        let frame = if self.decorations_visible {
            decorated = self.decorated();
            &decorated
        } else {
            &self.frame
        };
        let mut png = std::io::Cursor::new(Vec::new());
        frame
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(RasterImage {
            width: frame.width(),
            height: frame.height(),
            png: png.into_inner(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use logoforge_core::export::{draw_list, rasterize};
    use logoforge_core::repositories::assets::Asset;
    use logoforge_core::{Editor, EditorConfig};

    fn faces() -> Faces {
        Faces::with_database(fontdb::Database::new())
    }
    fn red_square(assets: &Assets) -> (logoforge_core::repositories::assets::AssetID, [u32; 2]) {
        let asset = Asset::from_rgba([40, 40], [255, 0, 0, 255].repeat(40 * 40)).unwrap();
        (assets.insert(asset), [40, 40])
    }
    fn decode(image: &RasterImage) -> image::RgbaImage {
        image::load_from_memory(&image.png).unwrap().into_rgba8()
    }
    #[test]
    fn paints_images_over_background() {
        let faces = faces();
        let assets = Assets::new();
        let mut editor = Editor::new(EditorConfig::default());
        let (source, size) = red_square(&assets);
        // Lands at 100,100, quarter size.
        let image = editor.add_image(source, size);

        let mut surface = SoftwareSurface::new(&faces);
        let captured = rasterize(editor.scene(), &assets, &mut surface).unwrap();
        assert_eq!((captured.width, captured.height), (800, 600));
        let frame = decode(&captured);
        let [r, g, b, _] = frame.get_pixel(105, 105).0;
        assert!(r > 200 && g < 50 && b < 50);
        assert_eq!(frame.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(surface.element_at([105.0, 105.0]), Some(image));
        assert_eq!(surface.element_at([5.0, 5.0]), None);
    }
    #[test]
    fn decorations_only_when_visible() {
        let faces = faces();
        let assets = Assets::new();
        let editor = Editor::new(EditorConfig::default());
        let mut surface = SoftwareSurface::new(&faces);
        surface.set_outlines([Rect::new(10.0, 10.0, 20.0, 20.0)]);
        surface
            .draw(editor.scene().canvas(), &draw_list(editor.scene()), &assets)
            .unwrap();

        let shown = decode(&surface.capture().unwrap());
        assert_ne!(shown.get_pixel(10, 10).0, [255, 255, 255, 255]);
        assert_eq!(shown.get_pixel(15, 15).0, [255, 255, 255, 255]);

        let exported = decode(&rasterize(editor.scene(), &assets, &mut surface).unwrap());
        assert_eq!(exported.get_pixel(10, 10).0, [255, 255, 255, 255]);
        assert!(surface.decorations_visible());
    }
    #[test]
    fn oversized_images_are_clipped() {
        let faces = faces();
        let assets = Assets::new();
        let mut editor = Editor::new(EditorConfig::default());
        let (source, size) = red_square(&assets);
        let image = editor.add_image(source, size);
        editor
            .commit_transform(&image, Rect::new(-10.0, 0.0, 1e9, 1e9))
            .unwrap();

        let mut surface = SoftwareSurface::new(&faces);
        surface.set_outlines([editor.scene().get(&image).unwrap().bounds()]);
        let captured = rasterize(editor.scene(), &assets, &mut surface).unwrap();
        assert_eq!((captured.width, captured.height), (800, 600));
        let frame = decode(&captured);
        for (x, y) in [(0, 0), (400, 300), (799, 599)] {
            let [r, g, b, _] = frame.get_pixel(x, y).0;
            assert!(r > 200 && g < 50 && b < 50);
        }
        // Outline of the same rect, with decorations shown.
        let shown = decode(&surface.capture().unwrap());
        assert_ne!(shown.get_pixel(400, 0).0, frame.get_pixel(400, 0).0);
        assert_eq!(surface.element_at([400.0, 300.0]), Some(image));
    }
    #[test]
    fn missing_pieces_fail() {
        let faces = faces();
        let mut editor = Editor::new(EditorConfig::default());
        let mut surface = SoftwareSurface::new(&faces);

        let (source, size) = red_square(&Assets::new());
        editor.add_image(source, size);
        assert_eq!(
            rasterize(editor.scene(), &Assets::new(), &mut surface),
            Err(RenderError::MissingAsset(source))
        );

        let mut editor = Editor::new(EditorConfig::default());
        editor.add_text("no fonts here");
        assert_eq!(
            rasterize(editor.scene(), &Assets::new(), &mut surface),
            Err(RenderError::Font("Arial".into()))
        );
    }
}
