//! Fakes shared by the coordinator and command handler tests.

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::Semaphore;

use crate::{
    audio::{
        coordinator::{EnqueueOutcome, PlaybackCoordinator},
        session::{
            AudioSink, ChannelRef, SinkEvent, SinkEventKind, SinkEventSender, TrackId,
            VoiceConnection, VoiceGateway,
        },
    },
    config::Config,
    error::{ConnectionError, EmissionError, ResolutionError},
    sources::{AudioSource, PlayableHandle, SourceResolver, TrackMetadata},
};

pub(crate) fn url(name: &str) -> String {
    format!("https://www.youtube.com/watch?v={name}")
}

pub(crate) fn channel(id: u64) -> ChannelRef {
    ChannelRef {
        guild_id: GuildId::new(1),
        channel_id: ChannelId::new(id),
        name: format!("canal-{id}"),
    }
}

/// Deja correr la tarea que procesa eventos del reproductor
pub(crate) async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

// ---- resolver ----

#[derive(Default)]
pub(crate) struct FakeResolver {
    pub(crate) releases: Arc<SyncMutex<HashMap<String, usize>>>,
    pub(crate) failing: HashSet<String>,
    pub(crate) gate: Option<Arc<Semaphore>>,
}

impl FakeResolver {
    pub(crate) fn releases_of(releases: &Arc<SyncMutex<HashMap<String, usize>>>, name: &str) -> usize {
        releases.lock().get(&url(name)).copied().unwrap_or(0)
    }

    pub(crate) fn counted_handle(&self, reference: &str) -> PlayableHandle {
        let releases = self.releases.clone();
        let key = reference.to_string();
        PlayableHandle::with_release(AudioSource::Stream(reference.to_string()), move || {
            *releases.lock().entry(key).or_default() += 1;
        })
    }
}

#[async_trait]
impl SourceResolver for FakeResolver {
    async fn resolve_metadata(&self, reference: &str) -> Result<TrackMetadata, ResolutionError> {
        let title = reference.rsplit('=').next().unwrap_or(reference).to_string();
        Ok(TrackMetadata {
            title,
            duration: None,
            author: None,
            thumbnail: None,
            webpage_url: reference.to_string(),
        })
    }

    async fn materialize(&self, reference: &str) -> Result<PlayableHandle, ResolutionError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate cerrado").forget();
        }
        let handle = self.counted_handle(reference);
        if self.failing.contains(reference) {
            // Simula almacenamiento parcial liberado antes de propagar el error
            handle.release();
            return Err(ResolutionError::Download("fallo simulado".into()));
        }
        Ok(handle)
    }
}

// ---- voz ----

#[derive(Clone, Copy, PartialEq)]
pub(crate) enum Readiness {
    Ready,
    Fail,
    Hang,
}

#[derive(Default)]
pub(crate) struct VoiceLog {
    pub(crate) connected: Vec<ChannelRef>,
    pub(crate) destroyed: Vec<ChannelRef>,
}

pub(crate) struct FakeConnection {
    pub(crate) channel: ChannelRef,
    pub(crate) readiness: Readiness,
    pub(crate) log: Arc<SyncMutex<VoiceLog>>,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    async fn ready(&self) -> Result<(), ConnectionError> {
        match self.readiness {
            Readiness::Ready => Ok(()),
            Readiness::Fail => Err(ConnectionError::Failed("rechazado".into())),
            Readiness::Hang => std::future::pending().await,
        }
    }

    async fn destroy(&self) {
        self.log.lock().destroyed.push(self.channel.clone());
    }
}

pub(crate) struct FakeGateway {
    pub(crate) readiness: Readiness,
    pub(crate) log: Arc<SyncMutex<VoiceLog>>,
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    type Connection = FakeConnection;

    async fn connect(&self, channel: &ChannelRef) -> Result<FakeConnection, ConnectionError> {
        self.log.lock().connected.push(channel.clone());
        Ok(FakeConnection {
            channel: channel.clone(),
            readiness: self.readiness,
            log: self.log.clone(),
        })
    }
}

// ---- reproductor ----

#[derive(Default)]
pub(crate) struct SinkLog {
    pub(crate) events: Option<SinkEventSender>,
    pub(crate) played: Vec<(TrackId, AudioSource)>,
    pub(crate) current: Option<TrackId>,
    pub(crate) bound: Option<ChannelRef>,
    pub(crate) stops: usize,
    pub(crate) failing: HashSet<String>,
}

pub(crate) struct FakeSink {
    pub(crate) log: Arc<SyncMutex<SinkLog>>,
}

#[async_trait]
impl AudioSink for FakeSink {
    type Connection = FakeConnection;

    async fn bind(&self, connection: &FakeConnection) {
        self.log.lock().bound = Some(connection.channel.clone());
    }

    async fn unbind(&self) {
        self.log.lock().bound = None;
    }

    async fn play(&self, track: TrackId, source: &AudioSource) -> Result<(), EmissionError> {
        let mut log = self.log.lock();
        if let AudioSource::Stream(reference) = source {
            if log.failing.contains(reference) {
                return Err(EmissionError::Start("formato no soportado".into()));
            }
        }
        log.played.push((track, source.clone()));
        log.current = Some(track);
        if let Some(events) = &log.events {
            let _ = events.send(SinkEvent {
                track,
                kind: SinkEventKind::Playing,
            });
        }
        Ok(())
    }

    async fn stop(&self) {
        let mut log = self.log.lock();
        log.stops += 1;
        if let Some(track) = log.current.take() {
            if let Some(events) = &log.events {
                let _ = events.send(SinkEvent {
                    track,
                    kind: SinkEventKind::Idle,
                });
            }
        }
    }
}

pub(crate) type TestCoordinator = PlaybackCoordinator<FakeGateway, FakeSink>;

pub(crate) struct Harness {
    pub(crate) coordinator: Arc<TestCoordinator>,
    pub(crate) releases: Arc<SyncMutex<HashMap<String, usize>>>,
    pub(crate) sink: Arc<SyncMutex<SinkLog>>,
    pub(crate) voice: Arc<SyncMutex<VoiceLog>>,
}

impl Harness {
    pub(crate) fn with(resolver: FakeResolver, readiness: Readiness, config: Config) -> Self {
        let releases = resolver.releases.clone();
        let sink = Arc::new(SyncMutex::new(SinkLog::default()));
        let voice = Arc::new(SyncMutex::new(VoiceLog::default()));
        let gateway = FakeGateway {
            readiness,
            log: voice.clone(),
        };
        let sink_log = sink.clone();
        let coordinator =
            PlaybackCoordinator::new(&config, Arc::new(resolver), gateway, move |events| {
                sink_log.lock().events = Some(events);
                FakeSink { log: sink_log }
            });
        Self {
            coordinator,
            releases,
            sink,
            voice,
        }
    }

    pub(crate) fn new() -> Self {
        Self::with(FakeResolver::default(), Readiness::Ready, Config::default())
    }

    pub(crate) fn released(&self, name: &str) -> usize {
        FakeResolver::releases_of(&self.releases, name)
    }

    pub(crate) async fn titles(&self) -> Vec<String> {
        self.coordinator
            .get_queue()
            .await
            .into_iter()
            .map(|entry| entry.title)
            .collect()
    }

    pub(crate) async fn playing_title(&self) -> Option<String> {
        self.coordinator.now_playing().await.map(|entry| entry.title)
    }

    pub(crate) fn emit(&self, track: TrackId, kind: SinkEventKind) {
        let log = self.sink.lock();
        log.events
            .as_ref()
            .expect("reproductor sin canal de eventos")
            .send(SinkEvent { track, kind })
            .unwrap();
    }

    pub(crate) fn current_track(&self) -> TrackId {
        self.sink.lock().current.expect("nada sonando")
    }

    pub(crate) async fn enqueue_all(&self, names: &[&str]) -> Vec<EnqueueOutcome> {
        let mut outcomes = Vec::new();
        for name in names {
            outcomes.push(self.coordinator.enqueue(&url(name), "alice#0001").await.unwrap());
        }
        outcomes
    }
}
