// Library surface for the page controllers, shared by the binary and the
// headless integration tests. Terminal rendering stays in the binary.
pub mod analytics;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod gate;
pub mod notify;
pub mod page;
pub mod player;
pub mod playlist;
pub mod runtime;
pub mod sim;
pub mod timers;
pub mod typing;
