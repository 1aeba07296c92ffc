//! Tether Roblox — OAuth/Cloud client, player datastore, and rank application.

pub mod datastore;
pub mod icons;
pub mod memorystore;
pub mod oauth;
pub mod ranking;
pub mod users;

pub use datastore::{DatastoreClient, PlayerData};
pub use memorystore::MemoryStoreClient;
pub use oauth::RobloxOAuth;
pub use users::RobloxCloudClient;
