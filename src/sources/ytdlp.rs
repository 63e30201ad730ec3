use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::{PlayableHandle, SourceResolver, TrackMetadata};
use crate::{
    config::{Config, PlaybackMode},
    error::ResolutionError,
};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
const TEMP_PREFIX: &str = "discord-bot-audio-";

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    /// Solo presente cuando la URL es una playlist
    entries: Option<Vec<Option<YtDlpInfo>>>,
}

/// Resolver basado en el ejecutable `yt-dlp`
pub struct YtDlpResolver {
    program: String,
    mode: PlaybackMode,
    temp_root: PathBuf,
    timeout: Duration,
}

impl YtDlpResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            program: config.ytdlp_path.clone(),
            mode: config.playback_mode,
            temp_root: config.audio_temp_dir.clone(),
            timeout: config.resolve_timeout,
        }
    }

    /// Ejecuta yt-dlp y devuelve stdout; `fail` clasifica el error
    async fn run(
        &self,
        args: &[&str],
        fail: fn(String) -> ResolutionError,
    ) -> Result<String, ResolutionError> {
        debug!("🔧 {} {}", self.program, args.join(" "));

        let mut command = Command::new(&self.program);
        command.args(args).kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| ResolutionError::Timeout(self.timeout))?
            .map_err(|e| fail(format!("Error al ejecutar {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!("yt-dlp error: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn download_into(&self, url: &str, dir: &Path) -> Result<PathBuf, ResolutionError> {
        let template = dir.join("audio.%(ext)s");
        let template = template.to_string_lossy().into_owned();
        let header = format!("user-agent:{USER_AGENT}");

        self.run(
            &[
                "-f",
                "bestaudio/best",
                "-o",
                template.as_str(),
                "--no-playlist",
                "--restrict-filenames",
                "--add-header",
                header.as_str(),
                "--quiet",
                "--no-warnings",
                url,
            ],
            ResolutionError::Download,
        )
        .await?;

        find_audio_file(dir).await
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    async fn resolve_metadata(&self, reference: &str) -> Result<TrackMetadata, ResolutionError> {
        debug!("📊 Obteniendo info de: {}", reference);

        let header = format!("user-agent:{USER_AGENT}");
        let stdout = self
            .run(
                &[
                    "--dump-single-json",
                    "--playlist-items",
                    "1",
                    "--no-check-certificates",
                    "--add-header",
                    header.as_str(),
                    "--quiet",
                    "--no-warnings",
                    reference,
                ],
                ResolutionError::Metadata,
            )
            .await
            .inspect_err(|e| error!("❌ Error obteniendo info de {}: {}", reference, e))?;

        parse_metadata(&stdout, reference)
    }

    async fn materialize(&self, reference: &str) -> Result<PlayableHandle, ResolutionError> {
        if self.mode == PlaybackMode::Stream {
            return Ok(PlayableHandle::streaming(reference));
        }

        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(&self.temp_root)?;

        match self.download_into(reference, dir.path()).await {
            Ok(path) => {
                info!("📥 Audio descargado en {}", path.display());
                Ok(PlayableHandle::temp_file(path, dir))
            }
            Err(e) => {
                // Nada de temporales huérfanos en el camino de error
                let location = dir.path().to_path_buf();
                if let Err(cleanup) = dir.close() {
                    warn!(
                        "⚠️ No se pudo eliminar {}: {}",
                        location.display(),
                        cleanup
                    );
                }
                error!("❌ Error descargando audio de {}: {}", reference, e);
                Err(e)
            }
        }
    }
}

/// Convierte la salida JSON de yt-dlp en metadata del primer video reproducible
fn parse_metadata(json: &str, reference: &str) -> Result<TrackMetadata, ResolutionError> {
    let info: YtDlpInfo = serde_json::from_str(json)
        .map_err(|e| ResolutionError::Metadata(format!("Respuesta de yt-dlp inválida: {e}")))?;

    let entry = match info.entries {
        Some(entries) => entries
            .into_iter()
            .flatten()
            .next()
            .ok_or(ResolutionError::NoPlayableEntry)?,
        None => info,
    };

    Ok(TrackMetadata {
        title: entry.title.unwrap_or_else(|| "Unknown title".to_string()),
        duration: entry.duration.and_then(|d| Duration::try_from_secs_f64(d).ok()),
        author: entry.uploader.or(entry.channel),
        thumbnail: entry.thumbnail,
        webpage_url: entry
            .webpage_url
            .or(entry.original_url)
            .unwrap_or_else(|| reference.to_string()),
    })
}

/// Busca el archivo de audio descargado, ignorando parciales y metadata
async fn find_audio_file(dir: &Path) -> Result<PathBuf, ResolutionError> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".part") || name.ends_with(".info.json") {
            continue;
        }
        return Ok(entry.path());
    }

    Err(ResolutionError::Download(
        "No se descargó ningún archivo de audio".to_string(),
    ))
}
