//! Line protocol codec
//!
//! Outbound commands are single text tokens terminated by CR LF. Inbound
//! device output is line-oriented text; every non-empty line becomes a
//! timestamped [`SerialEvent::DataReceived`]. The payload is not interpreted.

use fingerprint_core::{Command, SerialEvent, SerialMessage};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Terminator the firmware expects after every command
pub const LINE_TERMINATOR: &str = "\r\n";

/// Longest line handed to [`decode_bytes`]; longer device output is split
pub const MAX_LINE_LEN: usize = 4096;

/// Timestamp layout, local time with second precision
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Encode a command into the bytes written to the device
pub fn encode(command: &Command) -> Vec<u8> {
    let mut bytes = command.token().into_bytes();
    bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
    bytes
}

/// Decode one raw device line.
///
/// Returns `None` for lines that are empty after trimming.
pub fn decode(raw_line: &str) -> Option<SerialEvent> {
    let message = raw_line.trim();
    if message.is_empty() {
        return None;
    }

    Some(SerialEvent::DataReceived(SerialMessage {
        timestamp: timestamp_now(),
        message: message.to_string(),
    }))
}

/// Decode a raw line that may not be valid UTF-8
pub fn decode_bytes(raw_line: &[u8]) -> Option<SerialEvent> {
    decode(&String::from_utf8_lossy(raw_line))
}

/// Current local time in the format shown by the dashboard log
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Read one line, including its `\n`, into `buf`.
///
/// Stops early once `buf` holds [`MAX_LINE_LEN`] bytes. Returns the number of
/// bytes read; `0` means the device closed the stream.
pub async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();

    loop {
        let (complete, used) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(buf.len());
            }

            let room = MAX_LINE_LEN - buf.len();
            let window = &available[..available.len().min(room)];
            match window.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    buf.extend_from_slice(&window[..=idx]);
                    (true, idx + 1)
                }
                None => {
                    buf.extend_from_slice(window);
                    (buf.len() >= MAX_LINE_LEN, window.len())
                }
            }
        };

        reader.consume(used);

        if complete {
            return Ok(buf.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint_core::FingerprintId;
    use tokio::io::{AsyncWriteExt, BufReader};

    fn strip_terminator(bytes: &[u8]) -> &str {
        let text = std::str::from_utf8(bytes).unwrap();
        assert!(
            text.ends_with("\r\n"),
            "command {:?} must end with CR LF",
            text
        );
        &text[..text.len() - 2]
    }

    #[test]
    fn test_encode_fixed_tokens() {
        assert_eq!(encode(&Command::Register), b"R\r\n");
        assert_eq!(encode(&Command::Verify), b"V\r\n");
        assert_eq!(
            encode(&Command::DeleteOne(FingerprintId::new(14))),
            b"D 14\r\n"
        );
        assert_eq!(encode(&Command::DeleteAll), b"X\r\n");
        assert_eq!(encode(&Command::Stop), b"S\r\n");
    }

    #[test]
    fn test_encode_never_uses_bare_line_feed() {
        let commands = [
            Command::Register,
            Command::Verify,
            Command::DeleteOne(FingerprintId::new(0)),
            Command::DeleteAll,
            Command::Stop,
            Command::raw("PING").unwrap(),
        ];

        for command in &commands {
            let bytes = encode(command);
            let body = strip_terminator(&bytes);
            assert!(!body.contains('\n') && !body.contains('\r'));
            assert_eq!(body, command.token());
        }
    }

    #[test]
    fn test_encode_raw_passthrough() {
        let bytes = encode(&Command::raw("T 5").unwrap());
        assert_eq!(strip_terminator(&bytes), "T 5");
    }

    #[test]
    fn test_decode_blank_lines() {
        assert!(decode("").is_none());
        assert!(decode("   ").is_none());
        assert!(decode("\r").is_none());
        assert!(decode("\t \r\n").is_none());
    }

    #[test]
    fn test_decode_trims_line() {
        match decode("hello\r") {
            Some(SerialEvent::DataReceived(msg)) => {
                assert_eq!(msg.message, "hello");
                assert!(!msg.timestamp.is_empty());
            }
            other => panic!("Expected DataReceived, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_keeps_payload_opaque() {
        match decode("  Huella encontrada ID: 7 | conf=88  \n") {
            Some(SerialEvent::DataReceived(msg)) => {
                assert_eq!(msg.message, "Huella encontrada ID: 7 | conf=88");
            }
            other => panic!("Expected DataReceived, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_bytes_lossy() {
        match decode_bytes(b"ID \xff 3\r\n") {
            Some(SerialEvent::DataReceived(msg)) => {
                assert!(msg.message.starts_with("ID "));
                assert!(msg.message.ends_with(" 3"));
            }
            other => panic!("Expected DataReceived, got {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_shape() {
        // dd/mm/yyyy, HH:MM:SS
        let ts = timestamp_now();
        assert_eq!(ts.len(), 20);
        assert_eq!(&ts[2..3], "/");
        assert_eq!(&ts[5..6], "/");
        assert_eq!(&ts[10..12], ", ");
        assert_eq!(&ts[14..15], ":");
        assert_eq!(&ts[17..18], ":");
    }

    #[tokio::test]
    async fn test_read_line_splits_on_line_feed() {
        let (mut device, host) = tokio::io::duplex(64);
        device.write_all(b"first\r\nsecond\nthird").await.unwrap();
        drop(device);

        let mut reader = BufReader::new(host);
        let mut buf = Vec::new();

        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), 7);
        assert_eq!(buf, b"first\r\n");

        read_line(&mut reader, &mut buf).await.unwrap();
        assert_eq!(buf, b"second\n");

        read_line(&mut reader, &mut buf).await.unwrap();
        assert_eq!(buf, b"third");

        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_line_caps_runaway_lines() {
        let (mut device, host) = tokio::io::duplex(MAX_LINE_LEN * 2);
        let long = vec![b'a'; MAX_LINE_LEN + 10];
        device.write_all(&long).await.unwrap();
        device.write_all(b"\n").await.unwrap();
        drop(device);

        let mut reader = BufReader::new(host);
        let mut buf = Vec::new();

        assert_eq!(
            read_line(&mut reader, &mut buf).await.unwrap(),
            MAX_LINE_LEN
        );
        assert_eq!(read_line(&mut reader, &mut buf).await.unwrap(), 11);
        assert_eq!(buf.last(), Some(&b'\n'));
    }
}
