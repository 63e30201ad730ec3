//! # Audio Module
//!
//! Queue and playback coordination for the bot.
//!
//! ## Architecture
//!
//! ### [`coordinator`] - Playback Coordinator
//! - Owns the FIFO of pending songs, the voice connection and the single
//!   playback session
//! - Advances to the next song when the current one ends or fails
//! - Releases the audio of every song exactly once
//!
//! ### [`session`] - Collaborators
//! - Traits for the voice gateway, the connection and the audio sink
//! - Sink events tagged with the [`session::TrackId`] they belong to
//!
//! ### [`voice`] - Songbird
//! - Implementations of the collaborator traits on top of Songbird
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # async fn example(coordinator: &SongbirdCoordinator, channel: ChannelRef) -> anyhow::Result<()> {
//! coordinator.join_channel(channel).await?;
//!
//! let outcome = coordinator
//!     .enqueue("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "alice#0001")
//!     .await?;
//! println!("{outcome}");
//!
//! coordinator.skip().await;
//! coordinator.leave().await;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod session;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;
