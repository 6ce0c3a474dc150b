//! Built-in pipeline stages.
//!
//! A client runs them in this order, around the user's interceptors:
//!
//! 1. application interceptors
//! 2. [`FollowUpInterceptor`]
//! 3. [`BridgeInterceptor`]
//! 4. [`ConnectInterceptor`]
//! 5. network interceptors
//! 6. [`CallServerInterceptor`]

mod bridge;
mod call_server;
mod connect;
mod follow_up;

pub use bridge::BridgeInterceptor;
pub use call_server::CallServerInterceptor;
pub use connect::ConnectInterceptor;
pub use follow_up::{FollowUpInterceptor, FollowUpRule, retry_after};
