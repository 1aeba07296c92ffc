//! Tether Discord — OAuth client, guild/role directory, and role scope rules.

pub mod client;
pub mod models;
pub mod oauth;
pub mod roles;

pub use client::DiscordApiClient;
pub use oauth::DiscordOAuth;
