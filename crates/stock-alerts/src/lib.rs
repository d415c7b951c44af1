pub mod db;
pub mod error;
pub mod manager;
pub mod models;
pub mod monitor;

pub use db::AlertDb;
pub use error::AlertError;
pub use manager::AlertManager;
pub use models::*;
pub use monitor::AlertMonitor;
