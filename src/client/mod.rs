//! HTTP access to the trading backend.

pub mod api;
pub mod mock;
pub mod transport;

pub use api::ApiClient;
pub use mock::{MockReply, MockTransport};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
