pub mod actions;
pub mod config;
pub mod history;
pub mod reducer;
pub mod state;

pub use actions::*;
pub use config::*;
pub use history::*;
pub use reducer::*;
pub use state::*;
