//! Error types for the playback core.
//!
//! Resolver and connection errors are returned to the command handlers, which
//! turn them into replies. [`EmissionError`] never leaves the coordinator: it is
//! logged and playback moves on to the next item.

use std::time::Duration;
use thiserror::Error;

/// La referencia no es una URL reproducible
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL mal formada: {0}")]
    Malformed(String),

    #[error("Host no soportado: {0}")]
    UnsupportedHost(String),
}

/// Fallo obteniendo metadata o audio de una referencia
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("URL de YouTube inválida: {0}")]
    Invalid(#[from] ValidationError),

    #[error("No se encontró ningún video reproducible en la URL")]
    NoPlayableEntry,

    #[error("No se pudo obtener la información del video: {0}")]
    Metadata(String),

    #[error("No se pudo descargar el audio: {0}")]
    Download(String),

    #[error("yt-dlp no respondió en {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("La cola está llena (máximo {0} canciones)")]
    QueueFull(usize),

    /// La reproducción se detuvo mientras la canción se estaba cargando
    #[error("La reproducción se detuvo mientras se cargaba la canción")]
    Cancelled,
}

/// Fallo al conectar al canal de voz
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("No se pudo unir al canal de voz en {} segundos", .0.as_secs())]
    Timeout(Duration),

    #[error("Error al conectar al canal de voz: {0}")]
    Failed(String),
}

/// Fallo al iniciar o durante la reproducción de una canción
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmissionError {
    #[error("No hay conexión de voz asociada al reproductor")]
    NotBound,

    #[error("No se pudo iniciar la reproducción: {0}")]
    Start(String),

    #[error("Error durante la reproducción: {0}")]
    Playback(String),
}
