pub mod logging;
pub mod state;
pub mod types;
pub mod watcher;
