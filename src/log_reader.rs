use std::iter::Chain;

use tracing::trace;

use crate::codec::{self, DecodedRecord, HEADER_SIZE, MAGIC};

/// Sequential reader over a byte region holding concatenated records.
///
/// Records written back to back (by an [`MmapWriter`](crate::MmapWriter) or a
/// plain file sink) need no framing: each one is self-delimiting. The reader
/// decodes one record at a time and advances by the number of bytes it
/// occupied.
///
/// Regions written by a circular writer can hold garbage: zero-filled space
/// that was never written, a record torn by a wrap, or a half-written record at
/// the write head. When the bytes at the current position are not a record,
/// the reader scans forward to the next record magic and continues from there.
/// Bytes skipped this way are counted in [`RecordReader::skipped`].
///
/// # Examples
///
/// ```
/// use ultralog::{codec, Field, Level, RecordReader};
///
/// let mut data = vec![0u8; 128];
/// let n = codec::encode(&mut data, Level::Info, 1, 0, b"ready", &[Field::int("port", 8080)]);
/// data.truncate(n);
///
/// let mut reader = RecordReader::new(&data);
/// let record = reader.read_record().unwrap();
/// assert_eq!(record.message, b"ready");
/// assert!(reader.read_record().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
    skipped: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            skipped: 0,
        }
    }

    /// Reads a circular region whose oldest data starts at `head`.
    ///
    /// `head` is the writer's offset at the time the region was captured: the
    /// bytes from `head` to the end predate the last wrap, the bytes before it
    /// were written since. Records never straddle the end of the region, so
    /// the two halves are read one after the other.
    pub fn circular(data: &'a [u8], head: usize) -> Chain<RecordReader<'a>, RecordReader<'a>> {
        let head = head.min(data.len());
        RecordReader::new(&data[head..]).chain(RecordReader::new(&data[..head]))
    }

    /// Byte offset of the next record.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes skipped so far while looking for a record boundary.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Decodes the next record, skipping over anything that is not one.
    ///
    /// Returns `None` once no further record magic is found.
    pub fn read_record(&mut self) -> Option<DecodedRecord<'a>> {
        loop {
            if self.pos + HEADER_SIZE > self.data.len() {
                self.skip_to(self.data.len());
                return None;
            }

            match codec::decode(&self.data[self.pos..]) {
                Ok(record) => {
                    self.pos += record.encoded_len();
                    return Some(record);
                }
                Err(err) => {
                    trace!(pos = self.pos, error = %err, "resynchronizing record reader");
                    let next = self.find_magic(self.pos + 1).unwrap_or(self.data.len());
                    self.skip_to(next);
                }
            }
        }
    }

    fn skip_to(&mut self, pos: usize) {
        self.skipped += pos - self.pos;
        self.pos = pos;
    }

    fn find_magic(&self, from: usize) -> Option<usize> {
        let magic = MAGIC.to_le_bytes();
        self.data
            .get(from..)?
            .windows(magic.len())
            .position(|w| w == magic)
            .map(|i| from + i)
    }
}

impl<'a> Iterator for RecordReader<'a> {
    type Item = DecodedRecord<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.read_record()
    }
}
