//! Command behavior, independent of how the command arrived.
//!
//! Both the prefix and slash paths build an [`Invocation`] and send back the
//! [`Reply`] that [`execute`] produces. Every failure becomes a user-facing reply.

use serenity::builder::CreateEmbed;
use tracing::{error, info};

use crate::{
    audio::{
        coordinator::{EnqueueOutcome, PlaybackCoordinator},
        session::{AudioSink, ChannelRef, VoiceGateway},
    },
    bot::commands::CommandKind,
    ui::embeds,
};

/// Una ejecución de comando ya desacoplada de Discord
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandKind,
    pub args: Vec<String>,
    /// Tag del usuario (`nombre#0001`)
    pub requester: String,
    /// Canal de voz en el que está el usuario, si está en alguno
    pub voice_channel: Option<ChannelRef>,
    pub prefix: String,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Embed(CreateEmbed),
}

/// Respuesta para un nombre que no corresponde a ningún comando
pub fn unknown_command(prefix: &str) -> Reply {
    Reply::Text(format!(
        "❓ Comando desconocido. Usa `{prefix}help` para ver los comandos disponibles."
    ))
}

pub async fn execute<G, S>(coordinator: &PlaybackCoordinator<G, S>, invocation: Invocation) -> Reply
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    info!(
        "📝 Comando {} usado por {}",
        invocation.command.name(),
        invocation.requester
    );

    match invocation.command {
        CommandKind::Play => handle_play(coordinator, invocation).await,
        CommandKind::Join => handle_join(coordinator, invocation).await,
        CommandKind::Skip => handle_skip(coordinator, invocation).await,
        CommandKind::Stop => handle_stop(coordinator, invocation).await,
        CommandKind::Leave => handle_leave(coordinator, invocation).await,
        CommandKind::Queue => handle_queue(coordinator).await,
        CommandKind::Help => Reply::Embed(embeds::create_help_embed(&invocation.prefix)),
    }
}

/// Fallo de una operación, mostrado como embed de error
fn failure(message: String) -> Reply {
    Reply::Embed(embeds::create_error_embed(&message))
}

fn not_in_voice() -> Reply {
    Reply::Text("❌ ¡Necesitas estar en un canal de voz!".to_string())
}

async fn handle_play<G, S>(coordinator: &PlaybackCoordinator<G, S>, invocation: Invocation) -> Reply
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    let Some(channel) = invocation.voice_channel else {
        return Reply::Text(
            "❌ ¡Necesitas estar en un canal de voz para reproducir música!".to_string(),
        );
    };

    let Some(url) = invocation.args.first() else {
        return Reply::Text(format!(
            "❌ ¡Proporciona una URL de YouTube!\nEjemplo: `{}play https://www.youtube.com/watch?v=...`",
            invocation.prefix
        ));
    };

    if !coordinator.is_playable_reference(url) {
        return Reply::Text(
            "❌ ¡URL de YouTube inválida! Proporciona la URL de un video de YouTube.".to_string(),
        );
    }

    if coordinator.connection().await.is_none() {
        info!("🔄 Uniéndose al canal de voz {}", channel.name);
        if let Err(e) = coordinator.join_channel(channel).await {
            error!("Error al unirse al canal de voz: {}", e);
            return failure(format!("No se pudo unir al canal de voz: {e}"));
        }
    }

    match coordinator.enqueue(url, &invocation.requester).await {
        Ok(outcome @ EnqueueOutcome::StartFailed { .. }) => failure(outcome.to_string()),
        Ok(outcome) => Reply::Text(format!("🎵 {outcome}")),
        Err(e) => {
            error!("Error reproduciendo {}: {}", url, e);
            failure(format!("No se pudo reproducir la canción: {e}"))
        }
    }
}

async fn handle_join<G, S>(coordinator: &PlaybackCoordinator<G, S>, invocation: Invocation) -> Reply
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    let Some(channel) = invocation.voice_channel else {
        return Reply::Text("❌ ¡Primero necesitas estar en un canal de voz!".to_string());
    };

    let name = channel.name.clone();
    match coordinator.join_channel(channel).await {
        Ok(()) => Reply::Text(format!("✅ Conectado a **{name}**")),
        Err(e) => {
            error!("Error al unirse al canal de voz: {}", e);
            failure(format!("No se pudo unir al canal de voz: {e}"))
        }
    }
}

async fn handle_skip<G, S>(coordinator: &PlaybackCoordinator<G, S>, invocation: Invocation) -> Reply
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    if invocation.voice_channel.is_none() {
        return not_in_voice();
    }

    if coordinator.now_playing().await.is_none() {
        return Reply::Text("❌ ¡No hay nada sonando!".to_string());
    }

    coordinator.skip().await;
    Reply::Text("⏭️ ¡Saltando a la siguiente canción!".to_string())
}

async fn handle_stop<G, S>(coordinator: &PlaybackCoordinator<G, S>, invocation: Invocation) -> Reply
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    if invocation.voice_channel.is_none() {
        return not_in_voice();
    }

    coordinator.stop().await;
    Reply::Text("⏹️ Reproducción detenida y cola vaciada.".to_string())
}

async fn handle_leave<G, S>(coordinator: &PlaybackCoordinator<G, S>, invocation: Invocation) -> Reply
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    if invocation.voice_channel.is_none() {
        return not_in_voice();
    }

    coordinator.leave().await;
    Reply::Text("👋 ¡Salí del canal de voz!".to_string())
}

async fn handle_queue<G, S>(coordinator: &PlaybackCoordinator<G, S>) -> Reply
where
    G: VoiceGateway,
    S: AudioSink<Connection = G::Connection>,
{
    let current = coordinator.now_playing().await;
    let pending = coordinator.get_queue().await;

    if current.is_none() && pending.is_empty() {
        return Reply::Text("📜 ¡La cola está vacía!".to_string());
    }

    let playing = coordinator.is_playing().await;
    Reply::Embed(embeds::create_queue_embed(current.as_ref(), playing, &pending))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio::testing::*, config::Config};
    use pretty_assertions::assert_eq;

    fn invocation(command: CommandKind, args: &[&str]) -> Invocation {
        Invocation {
            command,
            args: args.iter().map(|a| a.to_string()).collect(),
            requester: "alice#0001".into(),
            voice_channel: Some(channel(7)),
            prefix: "!".into(),
        }
    }

    fn outside_voice(command: CommandKind, args: &[&str]) -> Invocation {
        Invocation {
            voice_channel: None,
            ..invocation(command, args)
        }
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            Reply::Embed(embed) => panic!("se esperaba texto, llegó {embed:?}"),
        }
    }

    /// Descripción de un embed de error
    fn error_description(reply: Reply) -> String {
        let Reply::Embed(embed) = reply else {
            panic!("se esperaba un embed de error, llegó {reply:?}");
        };
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["title"], "❌ Error");
        json["description"].as_str().unwrap().to_string()
    }

    async fn play_reply(h: &Harness, name: &str) -> Reply {
        let url = url(name);
        execute(&h.coordinator, invocation(CommandKind::Play, &[url.as_str()])).await
    }

    async fn play(h: &Harness, name: &str) -> String {
        text(play_reply(h, name).await)
    }

    #[tokio::test]
    async fn play_joins_the_callers_channel_once() {
        let h = Harness::new();

        assert_eq!(play(&h, "uno").await, "🎵 Reproduciendo ahora: **uno**");
        assert_eq!(
            play(&h, "dos").await,
            "🎵 Agregado a la cola: **dos** (Posición: 1)"
        );

        assert_eq!(h.voice.lock().connected, vec![channel(7)]);
        assert_eq!(h.coordinator.connection().await, Some(channel(7)));
    }

    #[tokio::test]
    async fn play_requires_a_voice_channel() {
        let h = Harness::new();
        let url = url("uno");

        let reply = text(execute(&h.coordinator, outside_voice(CommandKind::Play, &[url.as_str()])).await);

        assert!(reply.contains("canal de voz"));
        assert!(h.voice.lock().connected.is_empty());
    }

    #[tokio::test]
    async fn play_without_url_shows_usage_with_prefix() {
        let h = Harness::new();
        let mut call = invocation(CommandKind::Play, &[]);
        call.prefix = "?".into();

        let reply = text(execute(&h.coordinator, call).await);

        assert!(reply.contains("`?play https://www.youtube.com/watch?v=...`"));
    }

    #[tokio::test]
    async fn invalid_url_never_touches_the_coordinator() {
        let h = Harness::new();

        let reply = text(
            execute(
                &h.coordinator,
                invocation(CommandKind::Play, &["https://vimeo.com/123"]),
            )
            .await,
        );

        assert!(reply.contains("inválida"));
        assert!(h.voice.lock().connected.is_empty());
        assert_eq!(h.coordinator.now_playing().await, None);
    }

    #[tokio::test]
    async fn failed_join_is_reported_and_nothing_is_queued() {
        let h = Harness::with(FakeResolver::default(), Readiness::Fail, Config::default());

        let reply = error_description(play_reply(&h, "uno").await);

        assert!(reply.starts_with("No se pudo unir al canal de voz"));
        assert_eq!(h.coordinator.now_playing().await, None);
        assert_eq!(h.released("uno"), 0);
    }

    #[tokio::test]
    async fn resolution_errors_are_reported() {
        let resolver = FakeResolver {
            failing: [url("roto")].into_iter().collect(),
            ..FakeResolver::default()
        };
        let h = Harness::with(resolver, Readiness::Ready, Config::default());

        let reply = error_description(play_reply(&h, "roto").await);

        assert!(reply.starts_with("No se pudo reproducir la canción"));
    }

    #[tokio::test]
    async fn song_the_player_rejects_is_reported_as_an_error() {
        let h = Harness::new();
        h.sink.lock().failing.insert(url("uno"));

        let reply = error_description(play_reply(&h, "uno").await);

        assert_eq!(reply, "No se pudo iniciar la reproducción de: **uno**");
        assert_eq!(h.released("uno"), 1);
    }

    #[tokio::test]
    async fn join_failure_is_an_error_embed() {
        let h = Harness::with(FakeResolver::default(), Readiness::Fail, Config::default());

        let reply = error_description(execute(&h.coordinator, invocation(CommandKind::Join, &[])).await);

        assert!(reply.contains("rechazado"));
        assert_eq!(h.coordinator.connection().await, None);
    }

    #[tokio::test]
    async fn join_names_the_channel() {
        let h = Harness::new();

        let reply = text(execute(&h.coordinator, invocation(CommandKind::Join, &[])).await);

        assert_eq!(reply, "✅ Conectado a **canal-7**");
    }

    #[tokio::test]
    async fn skip_with_nothing_playing() {
        let h = Harness::new();

        let reply = text(execute(&h.coordinator, invocation(CommandKind::Skip, &[])).await);

        assert_eq!(reply, "❌ ¡No hay nada sonando!");
        assert_eq!(h.sink.lock().stops, 0);
    }

    #[tokio::test]
    async fn skip_moves_to_the_next_song() {
        let h = Harness::new();
        play(&h, "uno").await;
        play(&h, "dos").await;

        let reply = text(execute(&h.coordinator, invocation(CommandKind::Skip, &[])).await);
        settle().await;

        assert_eq!(reply, "⏭️ ¡Saltando a la siguiente canción!");
        assert_eq!(h.playing_title().await.as_deref(), Some("dos"));
    }

    #[tokio::test]
    async fn control_commands_require_a_voice_channel() {
        let h = Harness::new();
        play(&h, "uno").await;

        for command in [CommandKind::Skip, CommandKind::Stop, CommandKind::Leave] {
            let reply = text(execute(&h.coordinator, outside_voice(command, &[])).await);
            assert_eq!(reply, "❌ ¡Necesitas estar en un canal de voz!");
        }
        assert_eq!(h.playing_title().await.as_deref(), Some("uno"));
    }

    #[tokio::test]
    async fn stop_and_leave_release_everything() {
        let h = Harness::new();
        play(&h, "uno").await;
        play(&h, "dos").await;

        text(execute(&h.coordinator, invocation(CommandKind::Stop, &[])).await);
        assert_eq!((h.released("uno"), h.released("dos")), (1, 1));

        let reply = text(execute(&h.coordinator, invocation(CommandKind::Leave, &[])).await);
        assert_eq!(reply, "👋 ¡Salí del canal de voz!");
        assert_eq!(h.voice.lock().destroyed, vec![channel(7)]);
        assert_eq!(h.coordinator.connection().await, None);
    }

    #[tokio::test]
    async fn queue_reply_depends_on_content() {
        let h = Harness::new();

        let empty = text(execute(&h.coordinator, invocation(CommandKind::Queue, &[])).await);
        assert_eq!(empty, "📜 ¡La cola está vacía!");

        play(&h, "uno").await;
        let reply = execute(&h.coordinator, invocation(CommandKind::Queue, &[])).await;
        assert!(matches!(reply, Reply::Embed(_)));
    }

    #[tokio::test]
    async fn help_is_an_embed() {
        let h = Harness::new();

        let reply = execute(&h.coordinator, outside_voice(CommandKind::Help, &[])).await;

        assert!(matches!(reply, Reply::Embed(_)));
    }

    #[test]
    fn unknown_command_points_at_help() {
        assert!(text(unknown_command("!")).contains("`!help`"));
    }
}
