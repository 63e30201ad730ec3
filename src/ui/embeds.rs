use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::audio::coordinator::QueueEntry;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Voice Jukebox";

/// Comandos con sus alias, en el orden de la ayuda
const HELP_ENTRIES: &[(&str, &str, &str)] = &[
    ("join", "j", "Une el bot a tu canal de voz"),
    ("play <URL de YouTube>", "p", "Reproduce una canción de YouTube o la agrega a la cola"),
    ("skip", "next", "Salta la canción actual"),
    ("stop", "s", "Detiene la reproducción y limpia la cola"),
    ("queue", "q", "Muestra la cola actual"),
    ("leave", "dc", "Sale del canal de voz"),
    ("help", "h", "Muestra este mensaje de ayuda"),
];

/// Crea un embed para mostrar la cola de reproducción
///
/// `playing` distingue la canción que ya suena de la que todavía está cargando.
pub fn create_queue_embed(
    current: Option<&QueueEntry>,
    playing: bool,
    pending: &[QueueEntry],
) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if let Some(current) = current {
        let status = if playing {
            "▶️ Reproduciendo"
        } else {
            "⏳ Cargando"
        };
        embed = embed.field(
            status,
            format!("**{}**\n*Pedido por: {}*", current, current.requested_by),
            false,
        );
    }

    if !pending.is_empty() {
        embed = embed.description(queue_description(pending));
    }

    embed
        .footer(CreateEmbedFooter::new(format!(
            "Total de canciones: {} • Voice Jukebox",
            pending.len()
        )))
        .timestamp(Timestamp::now())
}

/// Lista numerada de las canciones pendientes
pub fn queue_description(pending: &[QueueEntry]) -> String {
    pending
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "**{}.** {}\n   *Pedido por: {}*",
                i + 1,
                entry,
                entry.requested_by
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Crea un embed de ayuda general
pub fn create_help_embed(prefix: &str) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🤖 Comandos del Bot")
        .description("Estos son todos los comandos disponibles:")
        .color(colors::INFO_BLUE);

    for (name, value) in help_fields(prefix) {
        embed = embed.field(name, value, false);
    }

    embed
        .footer(CreateEmbedFooter::new(format!(
            "Usa los comandos con el prefijo {prefix} o como comandos slash"
        )))
        .timestamp(Timestamp::now())
}

fn help_fields(prefix: &str) -> Vec<(String, String)> {
    HELP_ENTRIES
        .iter()
        .map(|(usage, alias, description)| {
            (
                format!("{prefix}{usage} ({prefix}{alias})"),
                description.to_string(),
            )
        })
        .collect()
}

/// Crea un embed de error
pub fn create_error_embed(description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("❌ Error")
        .description(description)
        .color(colors::ERROR_RED)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}
