//! # Classroom Gateway Crate
//!
//! Network transports for the chat client: [`RpcClient`] speaks the tRPC
//! conventions of the classroom API and implements
//! [`classroom_chats::ChatApi`]; [`WsPushTransport`] subscribes to realtime
//! channels and implements [`classroom_chats::PushTransport`].

pub mod error;
pub mod rpc;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use rpc::RpcClient;
pub use websocket::WsPushTransport;
