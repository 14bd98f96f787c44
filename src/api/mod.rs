//! Request gateway: every backend call goes through here so that
//! - a currently valid bearer token is always attached
//! - authorization failures get exactly one refresh-and-resend
//! - an unrecoverable session routes to the login surface once

mod error;
mod gateway;
pub mod payload;
mod soft_auth;
mod transport;

pub use error::ApiError;
pub use gateway::{Gateway, Navigator};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
