//! Stdio transport: inbound messages from a reader, events to a writer.
//!
//! `json` is one object per line. `protobuf` is a stream of length-delimited
//! envelopes.

use frames::{CodecError, ErrorCode, Event};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::WireFormat;
use crate::host::Host;

/// Varint length prefixes never exceed ten bytes.
const MAX_DELIMITER_LEN: usize = 10;

/// Largest protobuf frame accepted. Longer frames are drained and skipped.
const MAX_FRAME_LEN: usize = 32 * 1024 * 1024;

enum Frame {
    Message(Vec<u8>),
    Oversized(usize),
    Eof,
}

/// Read inbound messages until EOF or until the host stops accepting them.
/// Undecodable messages are logged and skipped.
///
/// # Errors
///
/// Returns an I/O error from the reader.
pub async fn read_inbound<R>(format: WireFormat, reader: R, host: &mut Host) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let decoded = match format {
            WireFormat::Json => {
                let mut raw = Vec::new();
                if reader.read_until(b'\n', &mut raw).await? == 0 {
                    break;
                }
                let Ok(line) = std::str::from_utf8(&raw) else {
                    warn!(len = raw.len(), "ignoring line that is not UTF-8");
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                frames::decode_inbound(line)
            }
            WireFormat::Protobuf => match read_frame(&mut reader).await? {
                Frame::Message(bytes) => frames::decode_inbound_frame(&bytes),
                Frame::Oversized(len) => {
                    warn!(len, max = MAX_FRAME_LEN, "skipping oversized frame");
                    continue;
                }
                Frame::Eof => break,
            },
        };

        match decoded {
            Ok(inbound) => {
                if let Err(e) = host.dispatch(inbound).await {
                    warn!(error = %e, "host stopped accepting input");
                    break;
                }
            }
            Err(e) => skip(&e),
        }
    }
    info!("inbound stream ended");
    Ok(())
}

fn skip(e: &CodecError) {
    warn!(error = %e, code = e.error_code(), "ignoring undecodable message");
}

/// Read one length-delimited frame. Frames over [`MAX_FRAME_LEN`] are
/// consumed without buffering.
async fn read_frame<R>(reader: &mut R) -> std::io::Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = Vec::with_capacity(MAX_DELIMITER_LEN);
    loop {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && prefix.is_empty() => return Ok(Frame::Eof),
            Err(e) => return Err(e),
        };
        prefix.push(byte);
        if byte & 0x80 == 0 {
            break;
        }
        if prefix.len() == MAX_DELIMITER_LEN {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "length prefix too long"));
        }
    }
    let len = prost::decode_length_delimiter(prefix.as_slice())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    if len > MAX_FRAME_LEN {
        let want = len as u64;
        let drained = tokio::io::copy(&mut (&mut *reader).take(want), &mut tokio::io::sink()).await?;
        if drained < want {
            return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream ended inside an oversized frame"));
        }
        return Ok(Frame::Oversized(len));
    }
    let mut bytes = vec![0; len];
    reader.read_exact(&mut bytes).await?;
    Ok(Frame::Message(bytes))
}

/// Write every event until all senders are gone.
///
/// # Errors
///
/// Returns an I/O error from the writer.
pub async fn write_events<W>(format: WireFormat, mut events: mpsc::Receiver<Event>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let encoded = match format {
            WireFormat::Json => frames::encode_event(&event).map(|mut line| {
                line.push('\n');
                line.into_bytes()
            }),
            WireFormat::Protobuf => frames::encode_event_frame(&event),
        };
        match encoded {
            Ok(bytes) => {
                writer.write_all(&bytes).await?;
                writer.flush().await?;
            }
            Err(e) => warn!(error = %e, code = e.error_code(), "dropping unencodable event"),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
