pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod home;
pub mod media;
pub mod pages;
pub mod post;
pub mod profile;
pub mod render;
pub mod router;
pub mod server;
pub mod session;
pub mod state;

pub use config::Config;
pub use server::{build_app, build_server};
pub use state::AppState;
