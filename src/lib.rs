pub mod api;
pub mod browser;
pub mod config;
pub mod directory;
pub mod discovery;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod search;
pub mod stealth;

pub use config::Config;
pub use models::Record;
pub use pipeline::Pipeline;
pub use reconcile::{merge, reconcile};
