//! # Sources Module
//!
//! Turns a user supplied reference (a YouTube link) into track metadata and
//! playable audio.
//!
//! - [`SourceResolver`] is the seam the playback coordinator depends on
//! - [`YtDlpResolver`] implements it on top of the `yt-dlp` executable
//! - [`PlayableHandle`] owns the materialized audio and frees it exactly once
//!
//! Validation never touches the network: [`validate_reference`] only parses the
//! URL and checks the host against a fixed allow-list.

pub mod handle;
pub mod ytdlp;

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use crate::error::{ResolutionError, ValidationError};

pub use handle::{AudioSource, PlayableHandle};
pub use ytdlp::YtDlpResolver;

/// Hosts de YouTube aceptados
const SUPPORTED_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Información de metadata de track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub duration: Option<Duration>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    /// URL canónica del video
    pub webpage_url: String,
}

/// Fuente de audio consumida por el coordinador de reproducción
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Valida la referencia sin acceso a red
    fn validate(&self, reference: &str) -> Result<(), ValidationError> {
        validate_reference(reference).map(|_| ())
    }

    /// Verifica si la referencia es una URL reproducible (sin acceso a red)
    fn is_playable_reference(&self, reference: &str) -> bool {
        self.validate(reference).is_ok()
    }

    /// Obtiene título, autor, duración y URL canónica.
    ///
    /// Playlist links resolve to their first playable entry.
    async fn resolve_metadata(&self, reference: &str) -> Result<TrackMetadata, ResolutionError>;

    /// Produce el audio reproducible. Si falla, no deja almacenamiento temporal.
    async fn materialize(&self, reference: &str) -> Result<PlayableHandle, ResolutionError>;
}

/// Valida que la URL sea de YouTube y esté bien formada
pub fn validate_reference(reference: &str) -> Result<Url, ValidationError> {
    let parsed = Url::parse(reference.trim())
        .map_err(|_| ValidationError::Malformed(reference.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::Malformed(reference.to_string()));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| ValidationError::Malformed(reference.to_string()))?
        .to_lowercase();

    if !SUPPORTED_HOSTS.contains(&host.as_str()) {
        return Err(ValidationError::UnsupportedHost(host));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_allowed_host() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=test",
            "https://youtu.be/dQw4w9WgXcQ",
            "HTTPS://WWW.YOUTUBE.COM/watch?v=dQw4w9WgXcQ",
        ] {
            assert!(validate_reference(url).is_ok(), "{url}");
        }
    }

    #[test]
    fn rejects_other_hosts_and_garbage() {
        assert_eq!(
            validate_reference("https://example.com/video"),
            Err(ValidationError::UnsupportedHost("example.com".into()))
        );
        assert!(matches!(
            validate_reference("not a url"),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate_reference("ftp://youtube.com/watch?v=x"),
            Err(ValidationError::Malformed(_))
        ));
        // Subdominios no listados tampoco pasan
        assert!(validate_reference("https://evil.youtube.com.example.org/watch").is_err());
    }
}
