//! Chat side of raincheck: request admission, reply dispatch and the chat
//! connection.

pub mod bot;
pub mod dispatcher;
pub mod handler;
pub mod throttle;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bot::run;
pub use dispatcher::{Dispatcher, DispatchError, OutboundMessage, ReplyQueue, Visibility};
pub use handler::{HandleOutcome, RequestHandler};
pub use throttle::{Admission, Throttle, ThrottlePolicy};
pub use transport::{ChatEvent, ChatTransport, TransportError};
