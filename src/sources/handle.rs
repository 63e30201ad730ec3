use std::{fmt, path::PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// De dónde lee el reproductor el audio de una canción
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Archivo ya descargado en disco
    File(PathBuf),
    /// URL que el reproductor resuelve y transmite en vivo
    Stream(String),
}

type Release = Box<dyn FnOnce() + Send>;

/// Exclusive ownership of materialized audio plus the capability that frees it.
///
/// `release` consumes the handle, so a second release cannot be written. A handle
/// that is dropped without being released frees its storage in `Drop`.
pub struct PlayableHandle {
    source: AudioSource,
    release: Option<Release>,
}

impl PlayableHandle {
    /// Handle de streaming: no hay nada que liberar
    pub fn streaming(url: impl Into<String>) -> Self {
        Self {
            source: AudioSource::Stream(url.into()),
            release: None,
        }
    }

    /// Handle ligado a un directorio temporal que se borra al liberarlo
    pub fn temp_file(path: PathBuf, dir: TempDir) -> Self {
        Self::with_release(AudioSource::File(path), move || {
            let location = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("🧹 Directorio temporal eliminado: {}", location.display()),
                Err(e) => warn!(
                    "⚠️ No se pudo eliminar el directorio temporal {}: {}",
                    location.display(),
                    e
                ),
            }
        })
    }

    pub fn with_release<F>(source: AudioSource, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            source,
            release: Some(Box::new(release)),
        }
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    /// Libera el almacenamiento asociado
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for PlayableHandle {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for PlayableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayableHandle")
            .field("source", &self.source)
            .field("released", &self.release.is_none())
            .finish()
    }
}
