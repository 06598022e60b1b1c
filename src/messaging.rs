//! Native messaging host for the extension.
//!
//! Protocol: each message is prefixed with a 4-byte little-endian uint32 length,
//! followed by UTF-8 JSON of that length. The host answers every request with
//! exactly one response, in order, until the browser closes stdin.

use std::io;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ReformaError, Result};
use crate::protocol::Command;
use crate::session::PageSession;

/// Largest message the browser will send or accept (1 MiB).
pub const MAX_MESSAGE_LEN: usize = 1_048_576;

/// Read one message. Returns `None` when the stream ends cleanly between
/// messages.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Value>> {
    // Read 4-byte little-endian length prefix
    let mut len_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < len_bytes.len() {
        let n = reader.read(&mut len_bytes[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Truncated length prefix",
            ));
        }
        filled += n;
    }
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    serde_json::from_slice(&buf)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write one message and flush it.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Value) -> io::Result<()> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_MESSAGE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }
    let len = payload.len() as u32;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Serve commands for `session` until `reader` reaches end of stream.
/// Returns how many messages were answered.
pub async fn run_host<R, W>(session: &mut PageSession, reader: &mut R, writer: &mut W) -> Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut answered = 0;

    loop {
        let msg = read_message(reader).await.map_err(|e| {
            ReformaError::MessagingError(format!("Failed to read native message: {}", e))
        })?;
        let Some(msg) = msg else {
            break;
        };

        let response = match Command::from_message(&msg) {
            Ok(command) => session.handle(command).await,
            Err(response) => response,
        };

        write_message(writer, &serde_json::to_value(&response)?)
            .await
            .map_err(|e| {
                ReformaError::MessagingError(format!("Failed to write native message: {}", e))
            })?;
        answered += 1;
    }

    tracing::info!("Native messaging host done after {} message(s)", answered);
    Ok(answered)
}

/// Encode a message the way the browser frames it.
pub fn frame(msg: &Value) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(msg)?;
    let mut out = (payload.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reads_framed_messages_then_clean_eof() {
        let mut bytes = frame(&json!({"action": "a"})).unwrap();
        bytes.extend(frame(&json!({"action": "b"})).unwrap());
        let mut reader = bytes.as_slice();

        let first = read_message(&mut reader).await.unwrap();
        let second = read_message(&mut reader).await.unwrap();
        let end = read_message(&mut reader).await.unwrap();

        assert_eq!(first, Some(json!({"action": "a"})));
        assert_eq!(second, Some(json!({"action": "b"})));
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn truncated_prefix_is_an_error() {
        let mut reader: &[u8] = &[1, 0];
        let err = read_message(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let len = (MAX_MESSAGE_LEN as u32 + 1).to_le_bytes();
        let mut reader: &[u8] = &len;
        let err = read_message(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn write_uses_little_endian_prefix() {
        let mut out = Vec::new();
        write_message(&mut out, &json!({"ok": true})).await.unwrap();

        let payload = br#"{"ok":true}"#;
        assert_eq!(&out[..4], &(payload.len() as u32).to_le_bytes());
        assert_eq!(&out[4..], payload);
    }
}
