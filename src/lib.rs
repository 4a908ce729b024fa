pub mod config;
pub mod error;
pub mod loaders;
pub mod model;
pub mod network;
pub mod poller;
pub mod ui;

pub use error::DashboardError;
pub use model::{Dashboard, Update, ViewMode, ViewState};
