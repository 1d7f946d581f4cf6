//! Action protocol server
//!
//! Line-delimited JSON request/response envelopes dispatched to the
//! [`Engine`](crate::Engine). This is where per-call failures become
//! structured error responses.


pub mod actions;
pub mod errors;
pub mod protocol;
pub mod server;

pub use errors::{ActionError, ActionResult};
pub use protocol::{ActionRequest, ActionResponse, ErrorCode, RequestId, ResponseStatus};
pub use server::{ActionHandler, ActionServer};
