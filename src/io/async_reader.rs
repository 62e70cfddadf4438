//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reading of journal commands from any async byte source,
//! for the async replay strategy.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - futures' AsyncRead so tokio files plug in through tokio-util's compat layer
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of JournalCommands
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```
//!
//! Rows that fail to parse are logged with `warn!` and left out of the batch.

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::JournalCommand;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Batch reader over an async journal source
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 0,
        }
    }

    /// Read up to `batch_size` valid commands
    ///
    /// Returns an empty batch at end of input. Invalid rows do not count
    /// toward the batch size.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<JournalCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let next = match records.next().await {
                Some(next) => next,
                None => break,
            };
            self.line_num += 1;
            let line = self.line_num + 1;

            match next {
                Ok(csv_record) => match convert_csv_record(csv_record) {
                    Ok(command) => batch.push(command),
                    Err(e) => warn!(line, error = %e, "skipping journal row"),
                },
                Err(e) => warn!(line, error = %e, "CSV parse error"),
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    const HEADER: &str = "type,user,other,group,amount,split,shares,note\n";

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let csv_content = format!("{}user,ann\nuser,bo\nuser,cy\n", HEADER);
        let reader = Cursor::new(csv_content.into_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch[0],
            JournalCommand::RegisterUser {
                username: "cy".into(),
                email: "cy@localhost".into(),
                full_name: "cy".into(),
            }
        );

        assert!(async_reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let reader = Cursor::new(HEADER.as_bytes().to_vec());
        let mut async_reader = AsyncReader::new(reader);

        assert!(async_reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let csv_content = format!(
            "{}refund,ann,,,5.00\nexpense,ann,,flat,,equal,ann\nmember,bo,,flat\n",
            HEADER
        );
        let reader = Cursor::new(csv_content.into_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind(), "member");
    }

    #[tokio::test]
    async fn test_async_reader_rows_may_stop_after_any_column() {
        let csv_content = format!(
            "{}user,ann\nuser,bo,\ngroup,ann,,flat\nexpense,ann,,flat,30.00\nsettle,bo,ann,flat,15.00\n",
            HEADER
        );
        let reader = Cursor::new(csv_content.into_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(10).await;

        let kinds: Vec<&str> = batch.iter().map(JournalCommand::kind).collect();
        assert_eq!(kinds, ["user", "user", "group", "expense", "settle"]);
        assert!(matches!(&batch[4], JournalCommand::Settle { note: None, .. }));
    }

    #[tokio::test]
    async fn test_async_reader_quoted_note() {
        let csv_content = format!(
            "{}settle,bo,ann,flat,12.50,,,\"rent, March\"\n",
            HEADER
        );
        let reader = Cursor::new(csv_content.into_bytes());
        let mut async_reader = AsyncReader::new(reader);

        let batch = async_reader.read_batch(10).await;

        match &batch[0] {
            JournalCommand::Settle { note, .. } => assert_eq!(note.as_deref(), Some("rent, March")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
