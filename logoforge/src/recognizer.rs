//! Reading text out of images. Best effort: an empty string is a perfectly good answer.

use std::sync::Arc;

use logoforge_core::repositories::assets::Asset;

/// Replaced with the path of the image in an OCR command's arguments.
pub const INPUT_PLACEHOLDER: &str = "{input}";

#[derive(thiserror::Error, Debug)]
pub enum RecognizeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("couldn't write image: {0}")]
    Encode(#[from] crate::loader::LoadError),
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("background task panicked")]
    Panicked,
}

#[async_trait::async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: Arc<Asset>) -> Result<String, RecognizeError>;
    /// False if this recognizer never finds anything, so there's no point asking.
    fn is_active(&self) -> bool {
        true
    }
}

/// Finds no text, ever.
pub struct NoRecognizer;
#[async_trait::async_trait]
impl TextRecognizer for NoRecognizer {
    async fn recognize(&self, _: Arc<Asset>) -> Result<String, RecognizeError> {
        Ok(String::new())
    }
    fn is_active(&self) -> bool {
        false
    }
}

/// Deletes the file when dropped, including when the task using it is aborted.
struct TempFile(std::path::PathBuf);
impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Runs an external OCR program on a PNG of the image and takes its stdout as the text,
/// e.g. `tesseract {input} stdout`.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}
impl CommandRecognizer {
    /// `None` if the command is empty. If no argument is the [`INPUT_PLACEHOLDER`], the image
    /// path is appended.
    #[must_use]
    pub fn new(mut command: Vec<String>) -> Option<Self> {
        if command.is_empty() {
            return None;
        }
        let program = command.remove(0);
        if !command.iter().any(|arg| arg.contains(INPUT_PLACEHOLDER)) {
            command.push(INPUT_PLACEHOLDER.to_owned());
        }
        Some(Self {
            program,
            args: command,
        })
    }
}
#[async_trait::async_trait]
impl TextRecognizer for CommandRecognizer {
    async fn recognize(&self, image: Arc<Asset>) -> Result<String, RecognizeError> {
        let path = std::env::temp_dir().join(format!(
            "{}-ocr-{}.png",
            env!("CARGO_PKG_NAME"),
            image.id()
        ));
        let input = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || -> Result<TempFile, RecognizeError> {
                let png = crate::loader::encode_png(&image)?;
                std::fs::write(&path, png)?;
                Ok(TempFile(path))
            })
            .await
            .map_err(|_| RecognizeError::Panicked)??
        };
        let path = path.to_string_lossy();
        let output = tokio::process::Command::new(&self.program)
            .args(
                self.args
                    .iter()
                    .map(|arg| arg.replace(INPUT_PLACEHOLDER, &path)),
            )
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        drop(input);
        if !output.status.success() {
            return Err(RecognizeError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        log::debug!("{} read {} bytes of text", self.program, text.len());
        Ok(text)
    }
}
