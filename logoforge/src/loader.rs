//! Decoding image files into [`Asset`]s, and encoding them back out.

use logoforge_core::repositories::assets::{Asset, AssetError};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Decode any format `image` understands into straight RGBA8.
pub fn decode(bytes: &[u8]) -> Result<Asset, LoadError> {
    let image = image::load_from_memory(bytes)?.into_rgba8();
    let size = [image.width(), image.height()];
    Ok(Asset::from_rgba(size, image.into_raw())?)
}

pub fn load_path(path: &std::path::Path) -> Result<Asset, LoadError> {
    let bytes = std::fs::read(path)?;
    let asset = decode(&bytes)?;
    log::debug!(
        "decoded {path:?}: {}x{}",
        asset.size()[0],
        asset.size()[1]
    );
    Ok(asset)
}

pub fn encode_png(asset: &Asset) -> Result<Vec<u8>, LoadError> {
    let [width, height] = asset.size();
    let mut png = std::io::Cursor::new(Vec::new());
    image::write_buffer_with_format(
        &mut png,
        asset.rgba(),
        width,
        height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    Ok(png.into_inner())
}
