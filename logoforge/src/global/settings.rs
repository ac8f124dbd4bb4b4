use logoforge_core::session::{Credential, OwnerID, Session};
use logoforge_core::{Canvas, EditorConfig};

const DOCUMENTATION: &str = r#"# logoforge settings. You may edit this file, but be aware that formatting and comments will not
# be preserved, and all keys and values are case sensitive.

# grid_size: spacing of the snapping grid, in canvas pixels.
# history_limit: number of undo steps to keep. Leave it out to keep every one.
# ocr_command: program and arguments run to read text out of added images. "{input}" is replaced
#   with the path of a PNG. Leave it out to skip text recognition.
# [gateway]: where saved logos go. kind = "memory" (lost on exit), "directory" (with an optional
#   path), or "http" (with a base_url).
# [account]: owner and token to save as. LOGOFORGE_OWNER and LOGOFORGE_TOKEN take priority.

# Examples:
# ocr_command = ["tesseract", "{input}", "stdout"]
# [gateway]
# kind = "http"
# base_url = "http://localhost:5000"

"#;

pub const OWNER_ENV: &str = "LOGOFORGE_OWNER";
pub const TOKEN_ENV: &str = "LOGOFORGE_TOKEN";

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GatewayChoice {
    /// Kept in this process only.
    #[default]
    Memory,
    /// JSON files on disk, by default under the user's data dir.
    Directory { path: Option<std::path::PathBuf> },
    /// The web backend.
    Http { base_url: String },
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Account {
    pub owner: Option<String>,
    pub token: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub grid_size: f32,
    pub snap: bool,
    pub show_grid: bool,
    pub history_limit: Option<std::num::NonZeroUsize>,
    pub ocr_command: Option<Vec<String>>,
    pub canvas: Canvas,
    pub gateway: GatewayChoice,
    pub account: Account,
    #[serde(skip)]
    failed_to_load: bool,
}
impl Default for Settings {
    fn default() -> Self {
        let editor = EditorConfig::default();
        Self {
            grid_size: editor.grid_size,
            snap: editor.snap,
            show_grid: false,
            history_limit: editor.history_limit,
            ocr_command: None,
            canvas: editor.canvas,
            gateway: GatewayChoice::default(),
            account: Account::default(),
            failed_to_load: false,
        }
    }
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";
    /// Read the user's settings, or defaults if they're unavailable for some reason.
    #[must_use]
    pub fn load() -> Self {
        let mut dir = preferences_dir();
        match dir.as_mut() {
            None => Self::no_path(),
            Some(dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(dir)
            }
        }
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Self> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings : Self = toml::from_str(&string)?;
            Ok(settings)
        };
        match settings {
            Ok(settings) => settings,
            Err(e) => {
                log::debug!("reading {path:?}: {e:#}");
                Self::no_path()
            }
        }
    }
    /// Return true if loading user's settings failed. This can be useful for
    /// displaying a warning.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    #[must_use]
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let string = toml::ser::to_string_pretty(self)?;
        // Prefix some documentation.
        Ok(DOCUMENTATION.to_owned() + &string)
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        // Ignore errors (could already exist). Any real errors will be emitted by file access below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        std::fs::write(preferences, self.to_toml()?)?;
        Ok(())
    }
    #[must_use]
    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            canvas: self.canvas,
            grid_size: self.grid_size,
            snap: self.snap,
            history_limit: self.history_limit,
        }
    }
    /// The signed-in account, from the environment or else from the file.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session_with(|key| std::env::var(key).ok())
    }
    fn session_with(&self, env: impl Fn(&str) -> Option<String>) -> Session {
        let owner = env(OWNER_ENV)
            .or_else(|| self.account.owner.clone())
            .and_then(|owner| match OwnerID::new(owner) {
                Ok(owner) => Some(owner),
                Err(e) => {
                    log::warn!("ignoring account owner: {e}");
                    None
                }
            });
        let credential = env(TOKEN_ENV)
            .or_else(|| self.account.token.clone())
            .filter(|token| !token.is_empty())
            .map(Credential::new);
        Session::new(owner, credential)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn toml_roundtrip() {
        let settings = Settings {
            grid_size: 25.0,
            snap: true,
            history_limit: std::num::NonZeroUsize::new(50),
            ocr_command: Some(vec!["tesseract".into(), "{input}".into(), "stdout".into()]),
            gateway: GatewayChoice::Http {
                base_url: "http://localhost:5000".into(),
            },
            account: Account {
                owner: Some("user-1".into()),
                token: None,
            },
            ..Settings::default()
        };
        let string = settings.to_toml().unwrap();
        // Documentation is comments, so parses fine.
        let parsed: Settings = toml::from_str(&string).unwrap();
        assert_eq!(parsed, settings);
    }
    #[test]
    fn missing_fields_default() {
        let parsed: Settings = toml::from_str("snap = true\n").unwrap();
        assert!(parsed.snap);
        assert_eq!(parsed.grid_size, 20.0);
        assert_eq!(parsed.gateway, GatewayChoice::Memory);
        assert_eq!(parsed.history_limit, None);
    }
    #[test]
    fn unreadable_file_defaults() {
        let settings = Settings::load_or_default(std::path::Path::new("/definitely/not/here.toml"));
        assert!(settings.did_fail_to_load());
        assert_eq!(settings.editor_config(), EditorConfig::default());
    }
    #[test]
    fn environment_overrides_account() {
        let settings = Settings {
            account: Account {
                owner: Some("from-file".into()),
                token: Some("file-token".into()),
            },
            ..Settings::default()
        };
        let session = settings.session_with(|key| (key == OWNER_ENV).then(|| "from-env".to_owned()));
        assert_eq!(session.owner().unwrap().as_str(), "from-env");
        assert_eq!(session.credential().unwrap().secret(), "file-token");

        let anonymous = Settings::default().session_with(|_| None);
        assert!(!anonymous.is_signed_in());
    }
}
