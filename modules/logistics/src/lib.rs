pub mod config;
pub mod consumers;
pub mod contracts;
pub mod dispatcher;
pub mod handlers;
pub mod lifecycle;
pub mod routes;

pub use dispatcher::{DispatchError, Dispatcher};
pub use lifecycle::SubscriptionSet;
