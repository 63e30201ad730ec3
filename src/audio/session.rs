//! Collaborators the playback coordinator drives: the voice gateway that opens
//! connections to a channel, and the audio sink that emits one track at a time.
//!
//! The sink reports what happens to each track through a [`SinkEventSender`]
//! handed to it once, when it is created. Every event is tagged with the
//! [`TrackId`] the coordinator assigned when it started that track.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::fmt;
use tokio::sync::mpsc;

use crate::{
    error::{ConnectionError, EmissionError},
    sources::AudioSource,
};

/// Canal de voz de destino
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub name: String,
}

/// Identificador de cada reproducción iniciada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEventKind {
    /// El audio empezó a sonar
    Playing,
    /// Terminó (natural o por stop)
    Idle,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEvent {
    pub track: TrackId,
    pub kind: SinkEventKind,
}

pub type SinkEventSender = mpsc::UnboundedSender<SinkEvent>;

/// Estado de la sesión de reproducción
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Playing,
}

/// A live (or half-open) link to a voice channel.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn channel(&self) -> &ChannelRef;

    /// Espera a que la conexión esté lista. El llamador aplica el timeout.
    async fn ready(&self) -> Result<(), ConnectionError>;

    async fn destroy(&self);
}

#[async_trait]
pub trait VoiceGateway: Send + Sync + 'static {
    type Connection: VoiceConnection + 'static;

    async fn connect(&self, channel: &ChannelRef) -> Result<Self::Connection, ConnectionError>;
}

/// The single audio-emitting device of a coordinator.
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    type Connection: Send + Sync;

    /// Asocia el reproductor a la conexión de voz
    async fn bind(&self, connection: &Self::Connection);

    async fn unbind(&self);

    /// Empieza a emitir `source`; los eventos posteriores llevan `track`
    async fn play(&self, track: TrackId, source: &AudioSource) -> Result<(), EmissionError>;

    /// Detiene la emisión actual. Debe terminar en un evento `Idle` para esa pista.
    async fn stop(&self);
}
