//! Feeds URLs from a line source into the work queue.

use crate::concurrent::WorkSender;
use crate::error::ProbeError;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Open a URL list for reading.
///
/// Fails before any work starts if the file cannot be opened.
pub async fn open_source<P: AsRef<Path>>(path: P) -> Result<BufReader<File>, ProbeError> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .map_err(|e| ProbeError::file_error(path.to_string_lossy(), e.to_string()))?;
    Ok(BufReader::new(file))
}

/// Push every line after the first into the queue, then close it.
///
/// The first line is a header and is always skipped. Remaining lines are
/// trimmed and enqueued as-is, blank ones included. Lines are read as raw
/// bytes, so an invalid UTF-8 sequence only spoils its own line. `send` waits while the
/// queue is full, which is what throttles reading.
///
/// The queue is closed exactly once, after the last item, because this
/// function owns the only sender. A read error ends production early; what
/// was already enqueued is still processed.
///
/// Returns the number of items enqueued.
pub async fn produce<R>(mut reader: R, queue: WorkSender) -> u64
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut line_no = 0u64;
    let mut enqueued = 0u64;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                line_no += 1;
                if line_no == 1 {
                    continue;
                }
                // bytes that are not UTF-8 become U+FFFD
                let line = String::from_utf8_lossy(&buf);
                if queue.send(line.trim().to_string()).await.is_err() {
                    warn!(line_no, "work queue closed before input was exhausted");
                    break;
                }
                enqueued += 1;
            }
            Err(e) => {
                warn!(line_no = line_no + 1, "failed to read input line: {}", e);
                break;
            }
        }
    }

    queue.close();
    debug!(enqueued, "producer finished");
    enqueued
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrent::work_queue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn drain(rx: crate::concurrent::WorkReceiver) -> Vec<String> {
        let mut items = Vec::new();
        while let Ok(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_skips_header_and_trims() {
        let input: &[u8] = b"url\n  http://a.test  \nhttp://b.test\r\n\thttp://c.test\n";
        let (tx, rx) = work_queue(10);

        let enqueued = produce(input, tx).await;

        assert_eq!(enqueued, 3);
        assert_eq!(
            drain(rx).await,
            vec!["http://a.test", "http://b.test", "http://c.test"]
        );
    }

    #[tokio::test]
    async fn test_blank_lines_are_enqueued() {
        let input: &[u8] = b"header\nhttp://a.test\n\n   \nhttp://b.test\n";
        let (tx, rx) = work_queue(10);

        assert_eq!(produce(input, tx).await, 4);
        assert_eq!(drain(rx).await, vec!["http://a.test", "", "", "http://b.test"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_reading() {
        let input: &[u8] = b"header\nhttp://a.test\nhttp://caf\xe9.test\nhttp://b.test\nhttp://c.test\n";
        let (tx, rx) = work_queue(10);

        assert_eq!(produce(input, tx).await, 4);

        let items = drain(rx).await;
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], "http://a.test");
        assert_eq!(items[1], "http://caf\u{FFFD}.test");
        assert_eq!(&items[2..], ["http://b.test", "http://c.test"]);
    }

    #[tokio::test]
    async fn test_first_line_skipped_even_if_url() {
        let input: &[u8] = b"http://header.test\nhttp://a.test";
        let (tx, rx) = work_queue(10);

        assert_eq!(produce(input, tx).await, 1);
        assert_eq!(drain(rx).await, vec!["http://a.test"]);
    }

    #[tokio::test]
    async fn test_empty_source_closes_queue() {
        let input: &[u8] = b"";
        let (tx, rx) = work_queue(10);

        assert_eq!(produce(input, tx).await, 0);
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_backpressure_with_small_queue() {
        let body: String = std::iter::once("header".to_string())
            .chain((0..50).map(|i| format!("http://host{}.test", i)))
            .collect::<Vec<_>>()
            .join("\n");
        let (tx, rx) = work_queue(2);

        let producer = tokio::spawn(async move { produce(body.as_bytes(), tx).await });
        let items = drain(rx).await;

        assert_eq!(producer.await.unwrap(), 50);
        assert_eq!(items.len(), 50);
        assert_eq!(items[0], "http://host0.test");
        assert_eq!(items[49], "http://host49.test");
    }

    #[tokio::test]
    async fn test_open_source_missing_file() {
        let err = open_source("/definitely/not/here/urls.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::FileError { .. }));
        assert!(err.to_string().contains("/definitely/not/here/urls.txt"));
    }

    #[tokio::test]
    async fn test_open_source_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "urls").unwrap();
        writeln!(file, "http://a.test").unwrap();
        file.flush().unwrap();

        let reader = open_source(file.path()).await.unwrap();
        let (tx, rx) = work_queue(10);
        assert_eq!(produce(reader, tx).await, 1);
        assert_eq!(drain(rx).await, vec!["http://a.test"]);
    }
}
