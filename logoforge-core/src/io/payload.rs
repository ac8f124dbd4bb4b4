//! # Payload
//!
//! The record handed to a persistence store: a thumbnail, the full element and layer lists, and
//! the owner. Field names follow the store's JSON (`image` for the thumbnail, `userId` for the
//! owner), so the same record can go over HTTP unchanged.
//!
//! Images are embedded as raw RGBA8, keyed by their content hash, so a loaded record never depends
//! on files which happened to be on the saving machine.

use crate::element::{Element, ElementKind};
use crate::layers::{Layer, LayerError, LayerID, LayerRegistry};
use crate::repositories::assets::{Asset, AssetError, AssetID, Assets};
use crate::scene::{Canvas, Scene, SceneError};
use crate::session::OwnerID;

#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedAsset {
    pub id: AssetID,
    pub width: u32,
    pub height: u32,
    #[serde(with = "super::base64_bytes")]
    pub rgba: Vec<u8>,
}
impl EmbeddedAsset {
    #[must_use]
    pub fn from_asset(asset: &Asset) -> Self {
        let [width, height] = asset.size();
        Self {
            id: asset.id(),
            width,
            height,
            rgba: asset.rgba().to_vec(),
        }
    }
    /// Decode, checking the pixels still hash to the recorded ID.
    pub fn into_asset(self) -> Result<Asset, PayloadError> {
        let asset = Asset::from_rgba([self.width, self.height], self.rgba)?;
        if asset.id() != self.id {
            return Err(PayloadError::AssetMismatch {
                expected: self.id,
                actual: asset.id(),
            });
        }
        Ok(asset)
    }
}
impl std::fmt::Debug for EmbeddedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedAsset")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub name: String,
    /// PNG data URL.
    #[serde(rename = "image")]
    pub thumbnail: String,
    pub elements: Vec<Element>,
    /// In draw order, bottom first.
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub active_layer: Option<LayerID>,
    #[serde(default)]
    pub canvas: Canvas,
    #[serde(rename = "userId")]
    pub owner: OwnerID,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub assets: Vec<EmbeddedAsset>,
}

#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Layers(#[from] LayerError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("bad embedded image: {0}")]
    Asset(#[from] AssetError),
    #[error("embedded image claims to be {expected} but hashes to {actual}")]
    AssetMismatch { expected: AssetID, actual: AssetID },
    #[error("image {0} is referenced but not embedded")]
    MissingAsset(AssetID),
}

impl Payload {
    pub fn to_json(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }
    pub fn from_json(json: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(json)?)
    }
    /// Every image asset the elements refer to, including inside groups.
    #[must_use]
    pub fn referenced_assets(elements: &[Element]) -> Vec<AssetID> {
        let mut seen = hashbrown::HashSet::new();
        let mut ordered = Vec::new();
        for element in elements {
            element.visit(&mut |element| match &element.kind {
                ElementKind::Image(image) => {
                    if seen.insert(image.source) {
                        ordered.push(image.source);
                    }
                }
                ElementKind::Text(_) | ElementKind::Group(_) => (),
            });
        }
        ordered
    }
    /// Rebuild the scene, adding the embedded images to `assets`.
    ///
    /// Fails without touching `assets` if the record is inconsistent.
    pub fn into_scene(self, assets: &Assets) -> Result<Scene, PayloadError> {
        let decoded = self
            .assets
            .into_iter()
            .map(EmbeddedAsset::into_asset)
            .collect::<Result<Vec<_>, _>>()?;
        for needed in Self::referenced_assets(&self.elements) {
            let embedded = decoded.iter().any(|asset| asset.id() == needed);
            if !embedded && !assets.contains(needed) {
                return Err(PayloadError::MissingAsset(needed));
            }
        }
        let layers = LayerRegistry::from_layers(self.layers, self.active_layer)?;
        let scene = Scene::from_parts(self.canvas, layers, self.elements)?;
        for asset in decoded {
            assets.insert(asset);
        }
        Ok(scene)
    }
}
