pub mod store;
pub mod channels;
pub mod dispatcher;
pub mod scheduler;
pub mod sweep;
pub mod reminder;

pub use store::*;
pub use channels::*;
pub use dispatcher::*;
pub use scheduler::*;
pub use sweep::*;
pub use reminder::*;
