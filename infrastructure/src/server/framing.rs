//! `Content-Length` framing over any byte stream.
//!
//! Every frame is `Content-Length: N\r\n\r\n` followed by `N` bytes of JSON.
//! Other header lines are tolerated and ignored.

use super::error::{Result, SessionError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest body accepted from a client.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Largest header section accepted in front of one body, separator included.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Read one frame body.
///
/// Returns `Ok(None)` on a clean end of stream between frames, and
/// [`SessionError::TransportClosed`] when the stream ends inside a frame.
/// Header lines are read through a bounded reader, so `line` never grows
/// past [`MAX_HEADER_BYTES`].
pub async fn read_frame<R>(reader: &mut R, line: &mut String) -> Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;
    let mut header_budget = MAX_HEADER_BYTES;

    loop {
        line.clear();
        let bytes_read = (&mut *reader)
            .take(header_budget as u64)
            .read_line(line)
            .await?;
        if bytes_read == header_budget && !line.ends_with('\n') {
            return Err(SessionError::HeaderTooLarge {
                limit: MAX_HEADER_BYTES,
            });
        }
        header_budget -= bytes_read;
        if bytes_read == 0 {
            return if in_headers {
                Err(SessionError::TransportClosed)
            } else {
                Ok(None)
            };
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if content_length.is_some() {
                break;
            }
            continue;
        }

        in_headers = true;
        if let Some(len_str) = trimmed.strip_prefix("Content-Length:") {
            let len = len_str
                .trim()
                .parse::<usize>()
                .map_err(|_| SessionError::InvalidHeader(trimmed.to_string()))?;
            content_length = Some(len);
        }
    }

    let size = content_length.unwrap_or_default();
    if size > MAX_FRAME_BYTES {
        return Err(SessionError::FrameTooLarge {
            size,
            limit: MAX_FRAME_BYTES,
        });
    }

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SessionError::TransportClosed
        } else {
            SessionError::Io(e)
        }
    })?;
    Ok(Some(body))
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}
