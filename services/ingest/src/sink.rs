//! Line-delimited JSON output: one `SCHEMA`, `RECORD` or `STATE` message per line.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use bronto_db::sync::models::SyncState;
use serde::Serialize;

use crate::schema::{ProjectedRecord, RecordSchema};

pub trait RecordSink: Send + Sync {
    fn write_schema(
        &self,
        stream: &str,
        schema: &RecordSchema,
        key_properties: &[&str],
    ) -> io::Result<()>;

    fn write_records(&self, stream: &str, records: &[ProjectedRecord]) -> io::Result<()>;

    fn write_state(&self, state: &SyncState) -> io::Result<()>;
}

impl<T> RecordSink for Arc<T>
where
    T: RecordSink + ?Sized,
{
    fn write_schema(
        &self,
        stream: &str,
        schema: &RecordSchema,
        key_properties: &[&str],
    ) -> io::Result<()> {
        (**self).write_schema(stream, schema, key_properties)
    }

    fn write_records(&self, stream: &str, records: &[ProjectedRecord]) -> io::Result<()> {
        (**self).write_records(stream, records)
    }

    fn write_state(&self, state: &SyncState) -> io::Result<()> {
        (**self).write_state(state)
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
enum Message<'a> {
    Schema {
        stream: &'a str,
        schema: &'a RecordSchema,
        key_properties: &'a [&'a str],
    },
    Record {
        stream: &'a str,
        record: &'a ProjectedRecord,
    },
    State {
        value: &'a SyncState,
    },
}

pub struct SingerWriter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> SingerWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_all(&self, messages: &[Message<'_>]) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("sink lock poisoned"))?;
        for message in messages {
            serde_json::to_writer(&mut *out, message)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}

impl<W: Write + Send> RecordSink for SingerWriter<W> {
    fn write_schema(
        &self,
        stream: &str,
        schema: &RecordSchema,
        key_properties: &[&str],
    ) -> io::Result<()> {
        self.write_all(&[Message::Schema {
            stream,
            schema,
            key_properties,
        }])
    }

    fn write_records(&self, stream: &str, records: &[ProjectedRecord]) -> io::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let messages: Vec<Message<'_>> = records
            .iter()
            .map(|record| Message::Record { stream, record })
            .collect();
        self.write_all(&messages)
    }

    fn write_state(&self, state: &SyncState) -> io::Result<()> {
        self.write_all(&[Message::State { value: state }])
    }
}
