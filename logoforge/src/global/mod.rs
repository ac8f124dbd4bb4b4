//! Global singletons.

pub mod settings;

use logoforge_core::repositories::assets::Assets;

use crate::text::Faces;

/// Get the shared global instance of the asset repository.
pub fn assets() -> &'static Assets {
    static REPO: std::sync::OnceLock<Assets> = std::sync::OnceLock::new();
    REPO.get_or_init(Assets::default)
}

pub fn faces() -> &'static Faces {
    static ONCE: std::sync::OnceLock<Faces> = std::sync::OnceLock::new();
    ONCE.get_or_init(Faces::new_system)
}
