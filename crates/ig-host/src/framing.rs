// framing.rs - Native-messaging frames over a byte stream.
//
// Each frame is a 32-bit length in native byte order followed by that many
// bytes of UTF-8 JSON. Frames above MAX_FRAME_LEN are refused in both
// directions; an oversized incoming frame is skipped so the stream stays
// aligned on the next header.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::HostError;

/// Largest frame accepted or sent (1 MiB).
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Read one frame body. `Ok(None)` means clean EOF before a header; EOF
/// partway through the header or body is an error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, HostError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    header[0] = match reader.read_u8().await {
        Ok(byte) => byte,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    reader.read_exact(&mut header[1..]).await?;

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        let mut rest = (&mut *reader).take(len as u64);
        let skipped = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;
        if skipped < len as u64 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        return Err(HostError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Serialize `message` and write it as one frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), HostError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(HostError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let len = u32::try_from(body.len()).map_err(|_| HostError::FrameTooLarge {
        len: body.len(),
        max: MAX_FRAME_LEN,
    })?;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}
