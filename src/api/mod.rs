//! Request/response API and REPL interface.
//!
//! This module is the boundary callers use: JSON-shaped requests in, the
//! updated commit/branch/head view out, and errors as `{ error, kind }`.

mod handle;
mod repl;
mod service;

pub use handle::ServiceHandle;
pub use repl::{Repl, ReplConfig};
pub use service::{ApiError, ApiResult, ErrorBody, Request, Response, Service, ServiceConfig};
