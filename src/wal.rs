use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::Event;

/// Encode one record as `[u32 len][bincode Event][u32 crc32]`, little-endian.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Read exactly `buf.len()` bytes. `Ok(false)` on a clean or torn end of file.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Decode the next record and its size on disk. `None` at end of log or at
/// the first torn/corrupt record. `remaining` bounds the payload allocation.
fn decode_next(reader: &mut impl Read, remaining: u64) -> io::Result<Option<(Event, u64)>> {
    let mut word = [0u8; 4];
    if !read_full(reader, &mut word)? {
        return Ok(None);
    }
    let len = u64::from(u32::from_le_bytes(word));
    if len + 8 > remaining {
        return Ok(None);
    }
    let mut payload = vec![0u8; len as usize];
    if !read_full(reader, &mut payload)? || !read_full(reader, &mut word)? {
        return Ok(None);
    }
    if u32::from_le_bytes(word) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    Ok(bincode::deserialize::<Event>(&payload)
        .ok()
        .map(|event| (event, len + 8)))
}

/// Append-only reservation log. The store's only durable state.
///
/// Every write is appended and fsynced before it is applied in memory, so a
/// replay after a crash yields exactly the acknowledged writes. A torn or
/// corrupt tail is cut off on open, before anything new is appended.
pub struct ReservationLog {
    writer: BufWriter<File>,
    path: PathBuf,
    records: u64,
}

impl ReservationLog {
    /// Replay `path` (missing file = empty log), truncate anything after the
    /// last good record, and open it for appending.
    pub fn open(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let (events, valid_len) = Self::scan(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let on_disk = file.metadata()?.len();
        if on_disk > valid_len {
            warn!(
                path = %path.display(),
                kept = valid_len,
                dropped = on_disk - valid_len,
                "truncating damaged reservation log tail"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        let log = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            records: events.len() as u64,
        };
        Ok((log, events))
    }

    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        Ok(Self::scan(path)?.0)
    }

    /// Decoded events and the byte length of the intact prefix.
    fn scan(path: &Path) -> io::Result<(Vec<Event>, u64)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e),
        };
        let total = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut offset = 0u64;
        while let Some((event, size)) = decode_next(&mut reader, total - offset)? {
            events.push(event);
            offset += size;
        }
        Ok((events, offset))
    }

    /// Append one record and fsync.
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.writer, event)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.records += 1;
        Ok(())
    }

    /// Records in the log, replayed ones included.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Rewrite the log as `events`: write a temp file, fsync, rename over.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("log.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for event in events {
                encode_event(&mut writer, event)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.records = events.len() as u64;
        Ok(())
    }
}
