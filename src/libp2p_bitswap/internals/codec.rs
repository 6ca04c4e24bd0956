// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io;

use async_trait::async_trait;
use futures::prelude::*;
use libp2p::{StreamProtocol, request_response};

use crate::libp2p_bitswap::*;

/// `libp2p` request-response codec speaking the `go-bitswap` framing: one
/// varint length prefixed protobuf message per stream.
#[derive(Debug, Clone)]
pub struct BitswapRequestResponseCodec {
    max_message_size: usize,
}

impl BitswapRequestResponseCodec {
    pub fn new(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for BitswapRequestResponseCodec {
    fn default() -> Self {
        Self::new(MAX_BUF_SIZE)
    }
}

#[async_trait]
impl request_response::Codec for BitswapRequestResponseCodec {
    type Protocol = StreamProtocol;
    type Request = Vec<BitswapMessage>;
    type Response = ();

    async fn read_request<T>(&mut self, _: &StreamProtocol, io: &mut T) -> IOResult<Self::Request>
    where
        T: AsyncRead + Unpin + Send,
    {
        let len = unsigned_varint::aio::read_usize(&mut *io)
            .await
            .map_err(map_io_err)?;
        if len > self.max_message_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "bitswap message of {len} bytes exceeds the limit of {} bytes",
                    self.max_message_size
                ),
            ));
        }
        let mut data = vec![0; len];
        io.read_exact(&mut data).await?;

        metrics::inbound_stream_count().inc();
        metrics::inbound_bytes().inc_by(data.len() as _);

        messages_from_bytes(&data)
    }

    /// Just close the outbound stream,
    /// the actual responses will come from new inbound stream
    /// and be received in `read_request`
    async fn read_response<T>(&mut self, _: &StreamProtocol, _: &mut T) -> IOResult<Self::Response>
    where
        T: AsyncRead + Unpin + Send,
    {
        Ok(())
    }

    /// Sending both `bitswap` requests and responses
    async fn write_request<T>(
        &mut self,
        _: &StreamProtocol,
        io: &mut T,
        messages: Self::Request,
    ) -> IOResult<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        let bytes = messages_to_bytes(&messages)?;
        if bytes.len() > self.max_message_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "bitswap message of {} bytes exceeds the limit of {} bytes",
                    bytes.len(),
                    self.max_message_size
                ),
            ));
        }

        metrics::outbound_stream_count().inc();
        metrics::outbound_bytes().inc_by(bytes.len() as _);

        let mut len_buf = unsigned_varint::encode::usize_buffer();
        io.write_all(unsigned_varint::encode::usize(bytes.len(), &mut len_buf))
            .await?;
        io.write_all(&bytes).await?;
        io.flush().await
    }

    // Sending `FIN` header and close the stream
    async fn write_response<T>(
        &mut self,
        _: &StreamProtocol,
        _: &mut T,
        _: Self::Response,
    ) -> IOResult<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        Ok(())
    }
}
