//! Client side of one service session

use anyhow::{anyhow, bail, Result};
use autoupdate_shared::codec::{self, LineDecoder};
use autoupdate_shared::{limits, Request};
#[cfg(unix)]
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

/// Where the service listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    #[cfg(unix)]
    Unix(PathBuf),
    Tcp(String),
}

/// Any duplex byte stream
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// Connected session with the update service
pub struct ServiceConnection {
    reader: ReadHalf<Box<dyn Stream>>,
    writer: WriteHalf<Box<dyn Stream>>,
    decoder: LineDecoder,
    read_buf: Vec<u8>,
}

impl ServiceConnection {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let stream: Box<dyn Stream> = match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => Box::new(
                tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|e| anyhow!("cannot connect to {:?}: {}", path, e))?,
            ),
            Endpoint::Tcp(address) => Box::new(
                tokio::net::TcpStream::connect(address)
                    .await
                    .map_err(|e| anyhow!("cannot connect to {}: {}", address, e))?,
            ),
        };
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: Box<dyn Stream>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer,
            decoder: LineDecoder::new(limits::DEFAULT_MAX_RESPONSE_LEN),
            read_buf: vec![0u8; 4096],
        }
    }

    /// Send one request and wait for its response line
    pub async fn request(&mut self, request: &Request) -> Result<String> {
        let line = request.to_line();
        if line.is_empty() {
            bail!("an empty request ends the session; use disconnect()");
        }
        self.send_line(&line).await?;
        self.recv_line().await
    }

    /// Pull log lines until the end-of-batch sentinel
    pub async fn drain_log(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.request(&Request::NextLogLine).await?;
            if line.is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }

    /// Send the empty request that ends the session
    pub async fn disconnect(mut self) -> Result<()> {
        self.send_line("").await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        // Requests are refused rather than truncated
        if line.len() > limits::DEFAULT_MAX_REQUEST_LEN {
            bail!(
                "request is {} bytes, the service accepts at most {}",
                line.len(),
                limits::DEFAULT_MAX_REQUEST_LEN
            );
        }
        if line.contains(['\n', '\r']) {
            bail!("request must be a single line");
        }

        let encoded = codec::encode_line(line, limits::DEFAULT_MAX_REQUEST_LEN);
        self.writer.write_all(&encoded).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv_line(&mut self) -> Result<String> {
        loop {
            if let Some(line) = self.decoder.decode_next()? {
                return Ok(line);
            }
            match self.reader.read(&mut self.read_buf).await? {
                0 => bail!("service closed the connection"),
                n => self.decoder.extend(&self.read_buf[..n]),
            }
        }
    }
}
