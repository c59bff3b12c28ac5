//! Wire protocol for the `SendSensorData` client stream
//!
//! Every message travels in its own length-delimited frame (4-byte big-endian
//! length prefix) with a bincode body.
//!
//! ```text
//! client                         server
//!   Open { "SendSensorData" } ->
//!                             <- Ready | Rejected
//!   Reading(..)               ->   (zero or more)
//!   End                       ->
//!                             <- Ack { ok: true, "All data received" }
//! ```

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use contracts::{Ack, Reading};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::error::TransportError;

/// The only stream method the ingress serves
pub const SEND_SENSOR_DATA: &str = "SendSensorData";

/// Upper bound on a single frame body
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Client → server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Open a stream for `method`
    Open { method: String },
    Reading(Reading),
    /// Clean end of stream; answered by one `Ack`
    End,
}

impl ClientMessage {
    pub fn open() -> Self {
        Self::Open {
            method: SEND_SENSOR_DATA.to_string(),
        }
    }
}

/// Server → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Ready,
    Rejected { reason: String },
    Ack(Ack),
}

/// Length-delimited bincode codec decoding `In` and encoding `Out`
#[derive(Debug)]
pub struct FrameCodec<In, Out> {
    frames: LengthDelimitedCodec,
    _marker: PhantomData<fn(Out) -> In>,
}

/// Codec used by the transport client
pub type ClientCodec = FrameCodec<ServerMessage, ClientMessage>;

/// Codec used by ingress sessions
pub type ServerCodec = FrameCodec<ClientMessage, ServerMessage>;

impl<In, Out> FrameCodec<In, Out> {
    pub fn new() -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LEN)
                .new_codec(),
            _marker: PhantomData,
        }
    }
}

impl<In, Out> Default for FrameCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: DeserializeOwned, Out> Decoder for FrameCodec<In, Out> {
    type Item = In;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<In>, TransportError> {
        match self.frames.decode(src)? {
            Some(frame) => Ok(Some(bincode::deserialize(&frame)?)),
            None => Ok(None),
        }
    }
}

impl<In, Out: Serialize> Encoder<Out> for FrameCodec<In, Out> {
    type Error = TransportError;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), TransportError> {
        let body = bincode::serialize(&item)?;
        self.frames.encode(Bytes::from(body), dst)?;
        Ok(())
    }
}
