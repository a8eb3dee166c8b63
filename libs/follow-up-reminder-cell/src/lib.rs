pub mod models;
pub mod services;
pub mod error;
pub mod clock;
pub mod handlers;
pub mod router;

pub use models::*;
pub use error::*;
pub use clock::*;
pub use services::*;
pub use router::create_follow_up_reminder_router;
