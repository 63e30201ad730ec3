use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::{Command, CommandOptionType},
        id::GuildId,
    },
    prelude::Context,
};

/// Nombre de la opción de `/play`
pub const URL_OPTION: &str = "url";

/// Comandos que entiende el bot, tanto con prefijo como slash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Play,
    Join,
    Skip,
    Stop,
    Leave,
    Queue,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        Self::Play,
        Self::Join,
        Self::Skip,
        Self::Stop,
        Self::Leave,
        Self::Queue,
        Self::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Join => "join",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Leave => "leave",
            Self::Queue => "queue",
            Self::Help => "help",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Play => &["p"],
            Self::Join => &["j", "connect"],
            Self::Skip => &["next"],
            Self::Stop => &["s"],
            Self::Leave => &["disconnect", "dc"],
            Self::Queue => &["q", "list"],
            Self::Help => &["h", "commands"],
        }
    }

    /// Busca por nombre o alias, sin distinguir mayúsculas
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name || kind.aliases().contains(&name.as_str()))
    }

    fn description(self) -> &'static str {
        match self {
            Self::Play => "Reproduce una canción de YouTube",
            Self::Join => "Conecta el bot a tu canal de voz",
            Self::Skip => "Salta la canción actual",
            Self::Stop => "Detiene la reproducción y limpia la cola",
            Self::Leave => "Desconecta el bot del canal de voz",
            Self::Queue => "Muestra la cola de reproducción",
            Self::Help => "Muestra todos los comandos disponibles",
        }
    }

    fn definition(self) -> CreateCommand {
        let command = CreateCommand::new(self.name()).description(self.description());

        match self {
            Self::Play => command.add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    URL_OPTION,
                    "URL de YouTube a reproducir",
                )
                .required(true),
            ),
            _ => command,
        }
    }
}

/// Mensaje con prefijo ya separado en nombre y argumentos
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedMessage {
    /// En minúsculas
    pub name: String,
    pub args: Vec<String>,
}

/// Extrae el comando de un mensaje; `None` si no empieza con el prefijo
pub fn parse_prefixed(content: &str, prefix: &str) -> Option<PrefixedMessage> {
    let rest = content.strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?.to_lowercase();

    Some(PrefixedMessage {
        name,
        args: tokens.map(str::to_string).collect(),
    })
}

pub fn slash_commands() -> Vec<CreateCommand> {
    CommandKind::ALL.into_iter().map(CommandKind::definition).collect()
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    Command::set_global_commands(&ctx.http, slash_commands()).await?;
    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, slash_commands()).await?;
    Ok(())
}
