//! # Assets
//!
//! Decoded images, shared between every element (and every snapshot) that shows them.
//! Elements only hold an [`AssetID`], so keeping a long history of image-heavy scenes costs
//! the same as keeping a history of text.

use base64::Engine;
use std::sync::Arc;

/// Content hash of an asset's pixels and dimensions. Two loads of the same picture share an ID.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct AssetID([u8; 32]);
impl AssetID {
    /// Hash RGBA8 pixel data of the given size.
    #[must_use]
    pub fn of_pixels(size: [u32; 2], rgba: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&size[0].to_le_bytes());
        hasher.update(&size[1].to_le_bytes());
        hasher.update(rgba);
        Self(*hasher.finalize().as_bytes())
    }
}
impl std::fmt::Display for AssetID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.0))
    }
}
impl std::fmt::Debug for AssetID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AssetID({self})")
    }
}
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetIDParseError {
    #[error("asset id is not valid base64")]
    Encoding,
    #[error("asset id must be 32 bytes")]
    Length,
}
impl std::str::FromStr for AssetID {
    type Err = AssetIDParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| AssetIDParseError::Encoding)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AssetIDParseError::Length)?;
        Ok(Self(bytes))
    }
}
impl serde::Serialize for AssetID {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
impl<'de> serde::Deserialize<'de> for AssetID {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let str =
            <std::borrow::Cow<'de, str> as serde::Deserialize<'de>>::deserialize(deserializer)?;
        str.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("image has zero area")]
    Empty,
    #[error("expected {expected} bytes of RGBA8 data, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// A decoded image. Pixels are straight-alpha RGBA8, row major, no padding.
#[derive(Clone)]
pub struct Asset {
    id: AssetID,
    size: [u32; 2],
    rgba: Arc<[u8]>,
}
impl Asset {
    pub fn from_rgba(size: [u32; 2], rgba: Vec<u8>) -> Result<Self, AssetError> {
        if size[0] == 0 || size[1] == 0 {
            return Err(AssetError::Empty);
        }
        let expected = size[0] as usize * size[1] as usize * 4;
        if rgba.len() != expected {
            return Err(AssetError::SizeMismatch {
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            id: AssetID::of_pixels(size, &rgba),
            size,
            rgba: rgba.into(),
        })
    }
    #[must_use]
    pub fn id(&self) -> AssetID {
        self.id
    }
    /// Natural (unscaled) width and height.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }
    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}
impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Collection of every asset known to the editing session, by ID.
#[derive(Default)]
pub struct Assets {
    // Written rarely (once per loaded image), read on every render.
    assets: parking_lot::RwLock<hashbrown::HashMap<AssetID, Arc<Asset>>>,
}
impl Assets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Insert an asset, returning its ID. Inserting identical pixels twice is a no-op.
    pub fn insert(&self, asset: Asset) -> AssetID {
        let id = asset.id();
        self.assets
            .write()
            .entry(id)
            .or_insert_with(|| {
                log::trace!("new asset {id} ({}x{})", asset.size[0], asset.size[1]);
                Arc::new(asset)
            });
        id
    }
    #[must_use]
    pub fn get(&self, id: AssetID) -> Option<Arc<Asset>> {
        self.assets.read().get(&id).cloned()
    }
    #[must_use]
    pub fn contains(&self, id: AssetID) -> bool {
        self.assets.read().contains_key(&id)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Total bytes of pixel data held.
    #[must_use]
    pub fn resident_bytes(&self) -> usize {
        self.assets.read().values().map(|asset| asset.rgba.len()).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn checker() -> Asset {
        let rgba = [[0u8, 0, 0, 255], [255, 255, 255, 255]]
            .into_iter()
            .cycle()
            .take(4)
            .flatten()
            .collect();
        Asset::from_rgba([2, 2], rgba).unwrap()
    }
    #[test]
    fn content_addressed() {
        let repo = Assets::new();
        let a = repo.insert(checker());
        let b = repo.insert(checker());
        assert_eq!(a, b);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.resident_bytes(), 16);
        assert_eq!(repo.get(a).map(|asset| asset.size()), Some([2, 2]));
    }
    #[test]
    fn size_validated() {
        assert_eq!(
            Asset::from_rgba([2, 2], vec![0; 15]).unwrap_err(),
            AssetError::SizeMismatch {
                expected: 16,
                actual: 15
            }
        );
        assert_eq!(Asset::from_rgba([0, 2], vec![]).unwrap_err(), AssetError::Empty);
    }
    #[test]
    fn id_text_roundtrip() {
        let id = checker().id();
        assert_eq!(id.to_string().parse(), Ok(id));
        assert!("not an id!".parse::<AssetID>().is_err());
    }
}
