use std::{collections::VecDeque, fmt, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, Mutex},
    time::timeout,
};
use tracing::{debug, error, info, warn};

use crate::{
    audio::session::{
        AudioSink, ChannelRef, SessionState, SinkEvent, SinkEventKind, SinkEventSender, TrackId,
        VoiceConnection, VoiceGateway,
    },
    config::Config,
    error::{ConnectionError, EmissionError, ResolutionError},
    sources::{PlayableHandle, SourceResolver, TrackMetadata},
};

/// Canción aceptada, pendiente o sonando
struct QueueItem {
    reference: String,
    title: String,
    requested_by: String,
    duration: Option<Duration>,
    handle: PlayableHandle,
}

impl QueueItem {
    fn new(
        reference: &str,
        metadata: TrackMetadata,
        requested_by: &str,
        handle: PlayableHandle,
    ) -> Self {
        Self {
            reference: reference.to_string(),
            title: metadata.title,
            requested_by: requested_by.to_string(),
            duration: metadata.duration,
            handle,
        }
    }

    fn entry(&self) -> QueueEntry {
        QueueEntry {
            title: self.title.clone(),
            requested_by: self.requested_by.clone(),
            duration: self.duration,
        }
    }

    fn release(self) {
        debug!("🧹 Liberando audio de: {} ({})", self.title, self.reference);
        self.handle.release();
    }
}

/// Copia de una entrada de la cola para mostrar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub title: String,
    pub requested_by: String,
    pub duration: Option<Duration>,
}

impl fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(duration) = self.duration {
            let whole_secs = Duration::from_secs(duration.as_secs());
            write!(f, " ({})", humantime::format_duration(whole_secs))?;
        }
        Ok(())
    }
}

/// Resultado de agregar una canción
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    NowPlaying { title: String },
    /// `position` cuenta desde 1 y es la longitud de la cola tras insertar
    Queued { title: String, position: usize },
    /// El reproductor rechazó la canción; ya fue liberada
    StartFailed { title: String },
}

impl fmt::Display for EnqueueOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NowPlaying { title } => write!(f, "Reproduciendo ahora: **{title}**"),
            Self::Queued { title, position } => {
                write!(f, "Agregado a la cola: **{title}** (Posición: {position})")
            }
            Self::StartFailed { title } => {
                write!(f, "No se pudo iniciar la reproducción de: **{title}**")
            }
        }
    }
}

struct ActiveItem {
    track: TrackId,
    item: QueueItem,
}

struct CoordinatorState<C> {
    pending: VecDeque<QueueItem>,
    active: Option<ActiveItem>,
    session: SessionState,
    connection: Option<C>,
    /// Se incrementa en cada stop(); invalida resoluciones en curso
    generation: u64,
    last_track: u64,
}

impl<C> Default for CoordinatorState<C> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            active: None,
            session: SessionState::Idle,
            connection: None,
            generation: 0,
            last_track: 0,
        }
    }
}

/// Owns the pending queue, the voice connection and the single playback session.
///
/// Every mutating operation and every sink event runs under one async mutex, so a
/// sink notification never interleaves with `enqueue`, `skip`, `stop` or `leave`.
/// Source resolution happens outside the lock; a generation counter bumped by
/// `stop` tells a finishing `enqueue` that its item must be released instead of
/// queued.
pub struct PlaybackCoordinator<G: VoiceGateway, S> {
    resolver: Arc<dyn SourceResolver>,
    gateway: G,
    sink: S,
    state: Mutex<CoordinatorState<G::Connection>>,
    connect_timeout: Duration,
    max_queue_size: usize,
}

impl<G, S> PlaybackCoordinator<G, S>
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    /// Crea el coordinador y se suscribe a los eventos del reproductor.
    ///
    /// `make_sink` receives the only event sender the sink will ever get. Must be
    /// called inside a tokio runtime: the event pump is spawned here and stops
    /// once the coordinator is dropped.
    pub fn new<F>(
        config: &Config,
        resolver: Arc<dyn SourceResolver>,
        gateway: G,
        make_sink: F,
    ) -> Arc<Self>
    where
        F: FnOnce(SinkEventSender) -> S,
    {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let coordinator = Arc::new(Self {
            resolver,
            gateway,
            sink: make_sink(events_tx),
            state: Mutex::new(CoordinatorState::default()),
            connect_timeout: config.voice_connect_timeout,
            max_queue_size: config.max_queue_size,
        });

        let weak = Arc::downgrade(&coordinator);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(coordinator) = weak.upgrade() else {
                    break;
                };
                coordinator.handle_sink_event(event).await;
            }
            debug!("Canal de eventos del reproductor cerrado");
        });

        coordinator
    }

    /// Une el bot a un canal de voz, cerrando antes la conexión anterior
    pub async fn join_channel(&self, channel: ChannelRef) -> Result<(), ConnectionError> {
        let mut state = self.state.lock().await;

        if let Some(previous) = state.connection.take() {
            info!("🔌 Cerrando conexión anterior en {}", previous.channel().name);
            // La pista actual muere con la conexión; no esperar su evento de fin
            if state.active.is_some() {
                self.sink.stop().await;
                Self::finish_active(&mut state);
            }
            self.sink.unbind().await;
            previous.destroy().await;
        }

        let connection = self.gateway.connect(&channel).await?;

        match timeout(self.connect_timeout, connection.ready()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("❌ Error al unirse a {}: {}", channel.name, e);
                connection.destroy().await;
                return Err(e);
            }
            Err(_) => {
                error!(
                    "⏰ Timeout uniéndose a {} tras {}s",
                    channel.name,
                    self.connect_timeout.as_secs()
                );
                connection.destroy().await;
                return Err(ConnectionError::Timeout(self.connect_timeout));
            }
        }

        self.sink.bind(&connection).await;
        state.connection = Some(connection);

        info!("🔊 Conectado al canal de voz: {}", channel.name);
        if state.active.is_none() && !state.pending.is_empty() {
            self.advance(&mut state).await;
        }
        Ok(())
    }

    /// Resuelve la referencia, la agrega a la cola y arranca si no hay sesión activa
    pub async fn enqueue(
        &self,
        reference: &str,
        requested_by: &str,
    ) -> Result<EnqueueOutcome, ResolutionError> {
        self.resolver.validate(reference)?;

        let generation = self.state.lock().await.generation;

        let metadata = self.resolver.resolve_metadata(reference).await?;
        debug!(
            "📊 Metadata: {} de {} (miniatura: {})",
            metadata.title,
            metadata.author.as_deref().unwrap_or("Desconocido"),
            metadata.thumbnail.as_deref().unwrap_or("-")
        );
        let handle = self.resolver.materialize(&metadata.webpage_url).await?;
        let item = QueueItem::new(reference, metadata, requested_by, handle);

        let mut state = self.state.lock().await;

        if state.generation != generation {
            info!("🗑️ Reproducción detenida mientras se cargaba: {}", item.title);
            item.release();
            return Err(ResolutionError::Cancelled);
        }

        if state.pending.len() >= self.max_queue_size {
            item.release();
            return Err(ResolutionError::QueueFull(self.max_queue_size));
        }

        let title = item.title.clone();
        info!("➕ Agregado a la cola: {} (pedido por {})", title, item.requested_by);
        state.pending.push_back(item);

        if state.active.is_none() {
            self.advance(&mut state).await;
            // Sin activa tras avanzar: la única pendiente era esta y falló al iniciar
            if state.active.is_some() {
                Ok(EnqueueOutcome::NowPlaying { title })
            } else {
                Ok(EnqueueOutcome::StartFailed { title })
            }
        } else {
            Ok(EnqueueOutcome::Queued {
                title,
                position: state.pending.len(),
            })
        }
    }

    /// Detiene la canción actual; el evento `Idle` resultante avanza la cola
    pub async fn skip(&self) {
        let state = self.state.lock().await;

        match &state.active {
            Some(active) => {
                info!("⏭️ Saltando: {}", active.item.title);
                self.sink.stop().await;
            }
            None => debug!("Nada que saltar"),
        }
    }

    /// Vacía la cola, libera todo el audio y detiene la reproducción
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state).await;
    }

    /// `stop()` y además cierra la conexión de voz
    pub async fn leave(&self) {
        let mut state = self.state.lock().await;
        self.stop_locked(&mut state).await;

        if let Some(connection) = state.connection.take() {
            self.sink.unbind().await;
            connection.destroy().await;
            info!("👋 Desconectado del canal de voz: {}", connection.channel().name);
        }
    }

    /// Copia de la cola pendiente en orden FIFO
    pub async fn get_queue(&self) -> Vec<QueueEntry> {
        let state = self.state.lock().await;
        state.pending.iter().map(QueueItem::entry).collect()
    }

    pub async fn now_playing(&self) -> Option<QueueEntry> {
        let state = self.state.lock().await;
        state.active.as_ref().map(|active| active.item.entry())
    }

    pub async fn is_playing(&self) -> bool {
        self.state.lock().await.session == SessionState::Playing
    }

    pub async fn connection(&self) -> Option<ChannelRef> {
        let state = self.state.lock().await;
        state.connection.as_ref().map(|c| c.channel().clone())
    }

    pub fn is_playable_reference(&self, reference: &str) -> bool {
        self.resolver.is_playable_reference(reference)
    }

    async fn handle_sink_event(&self, event: SinkEvent) {
        let mut state = self.state.lock().await;

        let is_current = state
            .active
            .as_ref()
            .is_some_and(|active| active.track == event.track);
        if !is_current {
            debug!("Evento {:?} de la pista {} ignorado (no activa)", event.kind, event.track);
            return;
        }

        match event.kind {
            SinkEventKind::Playing => {
                state.session = SessionState::Playing;
                debug!("▶️ Pista {} sonando", event.track);
            }
            SinkEventKind::Idle => {
                debug!("Pista {} terminada, reproduciendo siguiente...", event.track);
                Self::finish_active(&mut state);
                self.advance(&mut state).await;
            }
            SinkEventKind::Error(message) => {
                warn!("⚠️ {}", EmissionError::Playback(message));
                Self::finish_active(&mut state);
                self.advance(&mut state).await;
            }
        }
    }

    /// Arranca la primera canción pendiente que el reproductor acepte.
    ///
    /// Each failed start removes one item, so the loop runs at most once per item
    /// that was pending on entry and always ends with either an active item or an
    /// empty queue.
    async fn advance(&self, state: &mut CoordinatorState<G::Connection>) {
        let attempts = state.pending.len();

        for _ in 0..attempts {
            let Some(item) = state.pending.pop_front() else {
                break;
            };

            state.last_track += 1;
            let track = TrackId(state.last_track);

            match self.sink.play(track, item.handle.source()).await {
                Ok(()) => {
                    info!("🎵 Reproduciendo: {} (pista {})", item.title, track);
                    state.session = SessionState::Connecting;
                    state.active = Some(ActiveItem { track, item });
                    return;
                }
                Err(e) => {
                    warn!("❌ No se pudo reproducir {}: {}", item.title, e);
                    item.release();
                }
            }
        }

        state.session = SessionState::Idle;
        debug!("📭 Cola vacía, no hay siguiente track");
    }

    fn finish_active(state: &mut CoordinatorState<G::Connection>) {
        if let Some(active) = state.active.take() {
            active.item.release();
        }
        state.session = SessionState::Idle;
    }

    async fn stop_locked(&self, state: &mut CoordinatorState<G::Connection>) {
        state.generation += 1;

        let mut released = 0;
        if let Some(active) = state.active.take() {
            self.sink.stop().await;
            active.item.release();
            released += 1;
        }
        for item in state.pending.drain(..) {
            item.release();
            released += 1;
        }
        state.session = SessionState::Idle;

        if released > 0 {
            info!("⏹️ Reproducción detenida ({} canciones liberadas)", released);
        }
    }
}
