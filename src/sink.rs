//! Record sinks: where enumerated records are handed to the consumer
//!
//! A sink plays the role of the caller-supplied, open-ended collection. Appends
//! may fail (a closed pipe, a serializer error); such a failure is a boundary
//! fault and the enumeration that produced the record must stop.

use serde::Serialize;
use std::io::Write;

use crate::error::SinkError;

/// Open-ended collection that accepts converted records in order
pub trait RecordSink<T> {
    fn append(&mut self, record: T) -> Result<(), SinkError>;
}

impl<T> RecordSink<T> for Vec<T> {
    fn append(&mut self, record: T) -> Result<(), SinkError> {
        self.push(record);
        Ok(())
    }
}

/// Streams every record as one JSON document per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<T: Serialize, W: Write> RecordSink<T> for JsonLinesSink<W> {
    fn append(&mut self, record: T) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::io;

    /// Sink that accepts `capacity` records, then reports a broken pipe
    pub struct FailingSink<T> {
        pub accepted: Vec<T>,
        pub capacity: usize,
    }

    impl<T> FailingSink<T> {
        pub fn new(capacity: usize) -> Self {
            Self {
                accepted: Vec::new(),
                capacity,
            }
        }
    }

    impl<T> RecordSink<T> for FailingSink<T> {
        fn append(&mut self, record: T) -> Result<(), SinkError> {
            if self.accepted.len() >= self.capacity {
                return Err(SinkError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "consumer went away",
                )));
            }
            self.accepted.push(record);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn test_vec_sink_preserves_order() {
        let mut sink: Vec<u32> = Vec::new();
        for i in [3, 1, 2] {
            // Vec::append is an inherent method, so call through the trait
            RecordSink::append(&mut sink, i).unwrap();
        }
        assert_eq!(sink, vec![3, 1, 2]);
    }

    #[test]
    fn test_json_lines_sink_writes_one_line_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.append(Sample { id: 0, name: "a" }).unwrap();
        sink.append(Sample { id: 1, name: "b" }).unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec![r#"{"id":0,"name":"a"}"#, r#"{"id":1,"name":"b"}"#]);
    }
}
