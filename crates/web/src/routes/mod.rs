pub mod auth;
pub mod bindings;
pub mod groups;
pub mod ranks;
pub mod roles;
pub mod servers;
