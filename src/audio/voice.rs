use async_trait::async_trait;
use parking_lot::Mutex;
use songbird::{
    input::{File, Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    audio::{
        coordinator::PlaybackCoordinator,
        session::{
            AudioSink, ChannelRef, SinkEvent, SinkEventKind, SinkEventSender, TrackId,
            VoiceConnection, VoiceGateway,
        },
    },
    error::{ConnectionError, EmissionError},
    sources::AudioSource,
};

/// Coordinador conectado a Discord a través de Songbird
pub type SongbirdCoordinator = PlaybackCoordinator<SongbirdGateway, SongbirdSink>;

pub struct SongbirdGateway {
    manager: Arc<Songbird>,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    type Connection = SongbirdConnection;

    async fn connect(&self, channel: &ChannelRef) -> Result<SongbirdConnection, ConnectionError> {
        let call = self.manager.get_or_insert(channel.guild_id);

        Ok(SongbirdConnection {
            manager: self.manager.clone(),
            channel: channel.clone(),
            call,
        })
    }
}

pub struct SongbirdConnection {
    manager: Arc<Songbird>,
    channel: ChannelRef,
    call: Arc<tokio::sync::Mutex<Call>>,
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    async fn ready(&self) -> Result<(), ConnectionError> {
        // Soltar el lock antes de esperar el handshake
        let join = {
            let mut call = self.call.lock().await;
            call.join(self.channel.channel_id).await
        }
        .map_err(|e| ConnectionError::Failed(e.to_string()))?;

        join.await.map_err(|e| ConnectionError::Failed(e.to_string()))
    }

    async fn destroy(&self) {
        if let Err(e) = self.manager.remove(self.channel.guild_id).await {
            warn!("⚠️ Error al cerrar la conexión de voz en {}: {:?}", self.channel.name, e);
        }
    }
}

/// Reproductor sobre el `Call` de Songbird de la conexión actual
pub struct SongbirdSink {
    events: SinkEventSender,
    http: reqwest::Client,
    ytdlp: &'static str,
    call: Mutex<Option<Arc<tokio::sync::Mutex<Call>>>>,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(events: SinkEventSender) -> Self {
        Self {
            events,
            http: reqwest::Client::new(),
            ytdlp: "yt-dlp",
            call: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    /// Ejecutable de yt-dlp para el modo streaming
    pub fn with_ytdlp(mut self, program: &'static str) -> Self {
        self.ytdlp = program;
        self
    }

    fn input_for(&self, source: &AudioSource) -> Input {
        match source {
            AudioSource::File(path) => File::new(path.clone()).into(),
            AudioSource::Stream(url) => {
                YoutubeDl::new_ytdl_like(self.ytdlp, self.http.clone(), url.clone()).into()
            }
        }
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    type Connection = SongbirdConnection;

    async fn bind(&self, connection: &SongbirdConnection) {
        *self.call.lock() = Some(connection.call.clone());
    }

    async fn unbind(&self) {
        self.call.lock().take();
    }

    async fn play(&self, track: TrackId, source: &AudioSource) -> Result<(), EmissionError> {
        let call = self.call.lock().clone().ok_or(EmissionError::NotBound)?;
        let input = self.input_for(source);

        let handle = call.lock().await.play_input(input);

        for (event, kind) in [
            (TrackEvent::Play, SinkEventKind::Playing),
            (TrackEvent::End, SinkEventKind::Idle),
            (TrackEvent::Error, SinkEventKind::Error(String::new())),
        ] {
            let forwarder = TrackEventForwarder {
                track,
                kind,
                events: self.events.clone(),
            };
            if let Err(e) = handle.add_event(Event::Track(event), forwarder) {
                let _ = handle.stop();
                return Err(EmissionError::Start(format!(
                    "Error al agregar event handler: {}",
                    e
                )));
            }
        }

        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        let current = self.current.lock().take();
        if let Some(handle) = current {
            if let Err(e) = handle.stop() {
                warn!("⚠️ No se pudo detener la pista: {:?}", e);
            }
        }
    }
}

/// Reenvía los eventos de una pista de Songbird al coordinador
struct TrackEventForwarder {
    track: TrackId,
    kind: SinkEventKind,
    events: SinkEventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackEventForwarder {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let kind = match &self.kind {
            SinkEventKind::Error(_) => SinkEventKind::Error(play_error(ctx)),
            other => other.clone(),
        };

        debug!("Evento de Songbird {:?} para la pista {}", kind, self.track);
        if self
            .events
            .send(SinkEvent {
                track: self.track,
                kind,
            })
            .is_err()
        {
            debug!("Coordinador cerrado, evento descartado");
        }

        None
    }
}

fn play_error(ctx: &EventContext<'_>) -> String {
    if let EventContext::Track(tracks) = ctx {
        for (state, _) in tracks.iter() {
            if let PlayMode::Errored(e) = &state.playing {
                return format!("{:?}", e);
            }
        }
    }
    "error desconocido".to_string()
}
