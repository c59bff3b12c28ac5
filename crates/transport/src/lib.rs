//! # Transport
//!
//! The client-streaming link between producer and receiver.
//!
//! Responsibilities:
//! - Wire protocol (`codec`): length-delimited bincode frames
//! - `TransportClient`: drains the outbound buffer, reconnects forever
//! - `IngressServer`: accepts sessions, feeds the inbound buffer, acks on end
//!
//! ## Usage Example
//!
//! ```ignore
//! use transport::{IngressServer, TcpTransport, TransportClient};
//!
//! let server = IngressServer::bind("0.0.0.0:50051", inbound, observer.clone()).await?;
//! tokio::spawn(server.serve(cancel.clone()));
//!
//! let client = TransportClient::new("127.0.0.1:50051", TcpTransport::new(), outbound, stop, observer);
//! let exit = client.run().await;
//! ```

pub mod codec;
mod client;
mod error;
mod metrics;
mod server;

pub use client::{
    ClientExit, ClientState, LocalStreamTransport, StreamTransport, TcpTransport,
    TransportClient, DEFAULT_REPLY_TIMEOUT, DEFAULT_RETRY_DELAY,
};
pub use codec::{ClientMessage, ServerMessage, SEND_SENSOR_DATA};
pub use error::{Result, TransportError};
pub use metrics::{ClientMetrics, ClientSnapshot, IngressMetrics, IngressSnapshot};
pub use server::IngressServer;
