//! Framing codecs for the token protocol.
//!
//! One inbound read buffer is one frame: clients send a single command and
//! wait for the reply, so whatever bytes arrive together are one message.
//! Works over any AsyncRead/AsyncWrite (TCP sockets, in-memory duplex).

use std::io;

use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::{Command, RawReply, Reply, Request};

/// Server side: decodes inbound requests, encodes replies.
#[derive(Debug, Default)]
pub struct ServerCodec;

impl Decoder for ServerCodec {
    type Item = Request;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, io::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let frame = src.split();
        Ok(Some(Request::parse(&frame)))
    }
}

impl Encoder<Reply> for ServerCodec {
    type Error = io::Error;

    fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.extend_from_slice(reply.encode().as_bytes());
        Ok(())
    }
}

/// Client side: encodes commands, decodes the numeric reply.
#[derive(Debug, Default)]
pub struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = RawReply;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawReply>, io::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let frame = src.split();
        RawReply::parse(&frame)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Encoder<Command> for ClientCodec {
    type Error = io::Error;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.extend_from_slice(command.token().as_bytes());
        Ok(())
    }
}
