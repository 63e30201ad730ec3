use anyhow::{Context, Result};
use std::{path::PathBuf, str::FromStr, time::Duration};

/// Cómo se entrega el audio de cada canción al reproductor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Descarga a un directorio temporal antes de reproducir
    Download,
    /// Reproduce directamente desde YouTube sin archivo intermedio
    Stream,
}

impl FromStr for PlaybackMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "download" => Ok(Self::Download),
            "stream" => Ok(Self::Stream),
            other => anyhow::bail!("PLAYBACK_MODE desconocido: {other} (usa 'download' o 'stream')"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo
    pub command_prefix: String,

    // Audio
    pub playback_mode: PlaybackMode,
    pub max_queue_size: usize,

    // Tiempos de espera
    pub voice_connect_timeout: Duration,
    pub resolve_timeout: Duration,

    // Paths
    pub audio_temp_dir: PathBuf,
    pub ytdlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// [`Config::load`] feeds it the process environment; tests feed it a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            // Discord
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN es obligatorio")?,
            application_id: var("DISCORD_CLIENT_ID")
                .context("DISCORD_CLIENT_ID es obligatorio")?
                .parse()
                .context("DISCORD_CLIENT_ID debe ser numérico")?,
            guild_id: var("GUILD_ID").and_then(|s| s.parse().ok()),
            command_prefix: var("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),

            // Audio
            playback_mode: match var("PLAYBACK_MODE") {
                Some(mode) => mode.parse()?,
                None => defaults.playback_mode,
            },
            max_queue_size: match var("MAX_QUEUE_SIZE") {
                Some(size) => size.parse().context("MAX_QUEUE_SIZE inválido")?,
                None => defaults.max_queue_size,
            },

            // Tiempos de espera
            voice_connect_timeout: match var("VOICE_CONNECT_TIMEOUT_SECS") {
                Some(secs) => Duration::from_secs(
                    secs.parse().context("VOICE_CONNECT_TIMEOUT_SECS inválido")?,
                ),
                None => defaults.voice_connect_timeout,
            },
            resolve_timeout: match var("RESOLVE_TIMEOUT_SECS") {
                Some(secs) => {
                    Duration::from_secs(secs.parse().context("RESOLVE_TIMEOUT_SECS inválido")?)
                }
                None => defaults.resolve_timeout,
            },

            // Paths
            audio_temp_dir: var("AUDIO_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.audio_temp_dir),
            ytdlp_path: var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The Discord token must be present
    /// - The command prefix must be non-empty and contain no whitespace
    /// - Timeouts and the queue size must be greater than zero
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN es obligatorio");
        }

        if self.command_prefix.is_empty() || self.command_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("El prefijo de comandos no puede estar vacío ni contener espacios");
        }

        if self.voice_connect_timeout.is_zero() {
            anyhow::bail!("VOICE_CONNECT_TIMEOUT_SECS debe ser mayor que 0");
        }

        if self.resolve_timeout.is_zero() {
            anyhow::bail!("RESOLVE_TIMEOUT_SECS debe ser mayor que 0");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The Discord token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {}), prefix '{}'\n  \
            Audio: modo {:?}, cola máxima {}\n  \
            Timeouts: voz {}s, yt-dlp {}s\n  \
            Paths: temp {}, yt-dlp '{}'",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.command_prefix,
            self.playback_mode,
            self.max_queue_size,
            self.voice_connect_timeout.as_secs(),
            self.resolve_timeout.as_secs(),
            self.audio_temp_dir.display(),
            self.ytdlp_path,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,
            command_prefix: "!".to_string(),

            playback_mode: PlaybackMode::Download,
            max_queue_size: 1000,

            voice_connect_timeout: Duration::from_secs(30),
            resolve_timeout: Duration::from_secs(120),

            audio_temp_dir: std::env::temp_dir(),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}
