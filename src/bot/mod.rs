//! # Bot Module
//!
//! Discord side of the jukebox: turns messages and slash interactions into
//! [`handlers::Invocation`]s for the shared playback coordinator and sends the
//! replies back.
//!
//! - [`commands`]: command table with aliases, prefix parsing, slash definitions
//! - [`handlers`]: what each command does, independent of Discord

use anyhow::Result;
use serenity::{
    all::{
        ActivityData, CommandInteraction, Context, CreateInteractionResponse,
        CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse, EventHandler,
        GuildId, Interaction, Message, Ready, UserId,
    },
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::{session::ChannelRef, voice::SongbirdCoordinator},
    config::Config,
    ui::embeds,
};
use commands::{CommandKind, URL_OPTION};
use handlers::{Invocation, Reply};

const COMMAND_FAILED: &str = "Ocurrió un error al ejecutar ese comando.";

/// Handler de eventos de Discord del bot.
///
/// Holds the coordinator by injection; every guild message and slash command
/// goes through the same instance.
pub struct JukeboxBot {
    config: Arc<Config>,
    coordinator: Arc<SongbirdCoordinator>,
}

impl JukeboxBot {
    pub fn new(config: Arc<Config>, coordinator: Arc<SongbirdCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    /// Registra los comandos slash, por guild si `GUILD_ID` está configurado
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados (pueden tardar hasta una hora en aparecer)");
            }
        }

        Ok(())
    }

    async fn handle_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let Some(parsed) = commands::parse_prefixed(&msg.content, &self.config.command_prefix)
        else {
            return Ok(());
        };
        let Some(guild_id) = msg.guild_id else {
            debug!("Comando {} fuera de un servidor ignorado", parsed.name);
            return Ok(());
        };

        let reply = match CommandKind::from_name(&parsed.name) {
            Some(command) => {
                let invocation = Invocation {
                    command,
                    args: parsed.args,
                    requester: msg.author.tag(),
                    voice_channel: caller_voice_channel(ctx, guild_id, msg.author.id),
                    prefix: self.config.command_prefix.clone(),
                };

                if let Err(e) = msg.channel_id.broadcast_typing(&ctx.http).await {
                    debug!("No se pudo mostrar 'escribiendo': {:?}", e);
                }
                handlers::execute(&self.coordinator, invocation).await
            }
            None => handlers::unknown_command(&self.config.command_prefix),
        };

        let message = match reply {
            Reply::Text(text) => CreateMessage::new().content(text),
            Reply::Embed(embed) => CreateMessage::new().embed(embed),
        };
        msg.channel_id
            .send_message(&ctx.http, message.reference_message(msg))
            .await?;

        Ok(())
    }

    async fn handle_slash(&self, ctx: &Context, command: &CommandInteraction) -> Result<()> {
        let guild_id = command
            .guild_id
            .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

        let Some(kind) = CommandKind::from_name(&command.data.name) else {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Comando no reconocido")
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        };

        // Resolver una canción tarda más que la ventana de 3s de Discord
        command.defer(&ctx.http).await?;

        let args = command
            .data
            .options
            .iter()
            .find(|option| option.name == URL_OPTION)
            .and_then(|option| option.value.as_str())
            .map(|url| vec![url.to_string()])
            .unwrap_or_default();

        let invocation = Invocation {
            command: kind,
            args,
            requester: command.user.tag(),
            voice_channel: caller_voice_channel(ctx, guild_id, command.user.id),
            prefix: self.config.command_prefix.clone(),
        };

        let response = match handlers::execute(&self.coordinator, invocation).await {
            Reply::Text(text) => EditInteractionResponse::new().content(text),
            Reply::Embed(embed) => EditInteractionResponse::new().embed(embed),
        };
        command.edit_response(&ctx.http, response).await?;

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        ctx.set_activity(Some(ActivityData::playing(format!(
            "{}help para ver los comandos",
            self.config.command_prefix
        ))));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = self.handle_message(&ctx, &msg).await {
            error!("Error manejando mensaje: {:?}", e);
            let embed = embeds::create_error_embed(COMMAND_FAILED);
            let _ = msg
                .channel_id
                .send_message(
                    &ctx.http,
                    CreateMessage::new().embed(embed).reference_message(&msg),
                )
                .await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            info!(
                "📝 Comando /{} usado por {}",
                command.data.name, command.user.name
            );
            if let Err(e) = self.handle_slash(&ctx, &command).await {
                error!("Error manejando comando: {:?}", e);
                let _ = command
                    .edit_response(
                        &ctx.http,
                        EditInteractionResponse::new()
                            .embed(embeds::create_error_embed(COMMAND_FAILED)),
                    )
                    .await;
            }
        }
    }
}

/// Canal de voz en el que está el usuario, según la caché
fn caller_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelRef> {
    let Some(guild) = ctx.cache.guild(guild_id) else {
        warn!("⚠️ Guild {} no está en la caché", guild_id);
        return None;
    };

    let channel_id = guild.voice_states.get(&user_id)?.channel_id?;
    let name = guild
        .channels
        .get(&channel_id)
        .map(|channel| channel.name.clone())
        .unwrap_or_else(|| channel_id.to_string());

    Some(ChannelRef {
        guild_id,
        channel_id,
        name,
    })
}
