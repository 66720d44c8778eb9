//! File storage backend
//!
//! Owns the three handles on a box's directory: a positional read handle,
//! an append-only write handle, and the advisory lock on `<name>.lock`.
//!
//! ## Crash pivot
//! Compaction writes a full replacement into `<name>.hivec`, then renames it
//! over `<name>.hive`. On open:
//! - both files present → compaction died before the rename; the old
//!   `.hive` is the source of truth, the `.hivec` is deleted
//! - only `.hivec` present → compaction finished but the rename's unlink
//!   half was lost; the `.hivec` is renamed into place
//! - neither present → a fresh empty `.hive` is created

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::frame_io;
use crate::codec::{TypeRegistry, Value};
use crate::crypto::BoxCipher;
use crate::error::{CofferError, Result};
use crate::frame::codec::{decode_frame, encode_frame};
use crate::frame::Frame;
use crate::keystore::Keystore;

struct WriteHandle {
    file: File,
    /// End of the last fully-committed frame
    offset: u64,
}

/// Append-only file storage for one box
pub struct StorageBackend {
    name: String,
    path: PathBuf,
    compact_path: PathBuf,
    lock_path: PathBuf,
    cipher: Option<BoxCipher>,
    read: Mutex<File>,
    write: Mutex<WriteHandle>,
    /// Held for the lifetime of the backend; dropping releases the lock
    lock_file: File,
}

impl StorageBackend {
    /// Open (or create) the box file, resolving a crashed compaction first
    /// and taking the exclusive lock.
    pub fn open(dir: &Path, name: &str, cipher: Option<BoxCipher>) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let path = dir.join(format!("{}.hive", name));
        let compact_path = dir.join(format!("{}.hivec", name));
        let lock_path = dir.join(format!("{}.lock", name));

        if path.exists() {
            if compact_path.exists() {
                // Interrupted before rename: the old file wins
                fs::remove_file(&compact_path)?;
            }
        } else if compact_path.exists() {
            // Interrupted after the new file was complete: it wins
            fs::rename(&compact_path, &path)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        lock_file.try_lock_exclusive().map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                CofferError::BoxLocked(name.to_string())
            } else {
                CofferError::Io(e)
            }
        })?;

        let write_file = OpenOptions::new().create(true).append(true).open(&path)?;
        let offset = write_file.metadata()?.len();
        let read_file = File::open(&path)?;

        Ok(Self {
            name: name.to_string(),
            path,
            compact_path,
            lock_path,
            cipher,
            read: Mutex::new(read_file),
            write: Mutex::new(WriteHandle {
                file: write_file,
                offset,
            }),
            lock_file,
        })
    }

    /// Scan the file into `keystore` and resolve a torn tail.
    ///
    /// With `crash_recovery` the file is truncated back to the last valid
    /// frame; without it a torn tail fails with `CorruptBox`.
    pub fn initialize(
        &self,
        registry: &TypeRegistry,
        keystore: &mut Keystore,
        lazy: bool,
        crash_recovery: bool,
    ) -> Result<()> {
        let mut write = self.write.lock();
        let recovered = {
            let mut read = self.read.lock();
            if lazy {
                frame_io::keys_from_file(&mut read, registry, self.cipher.as_ref(), keystore)?
            } else {
                frame_io::frames_from_file(&mut read, registry, self.cipher.as_ref(), keystore)?
            }
        };

        if recovered >= 0 {
            if !crash_recovery {
                return Err(CofferError::CorruptBox(recovered as u64));
            }
            warn!(
                box_name = %self.name,
                offset = recovered,
                "truncating corrupted box tail"
            );
            write.file.set_len(recovered as u64)?;
            write.offset = recovered as u64;
        }
        Ok(())
    }

    /// Read and decode the value of one frame at its known position
    pub fn read_value(&self, registry: &TypeRegistry, offset: u64, length: u32) -> Result<Value> {
        let mut buf = vec![0u8; length as usize];
        {
            let mut read = self.read.lock();
            read.seek(SeekFrom::Start(offset))?;
            read.read_exact(&mut buf)?;
        }
        let frame = decode_frame(&buf, registry, self.cipher.as_ref(), false, offset)?;
        frame.value.ok_or_else(|| {
            CofferError::CorruptFrame("expected a value, found a tombstone".to_string())
        })
    }

    /// Append a batch of frames as one write.
    ///
    /// All-or-nothing: on failure the file is rolled back to its previous
    /// length and no frame is stamped. On success each frame carries its
    /// assigned offset and length.
    pub fn write_frames(&self, registry: &TypeRegistry, frames: &mut [Frame]) -> Result<()> {
        let mut buf = Vec::new();
        let mut lengths = Vec::with_capacity(frames.len());
        for frame in frames.iter() {
            lengths.push(encode_frame(frame, registry, self.cipher.as_ref(), &mut buf)?);
        }

        let mut write = self.write.lock();
        if let Err(e) = write.file.write_all(&buf) {
            // A partial frame must not survive the failed append
            let _ = write.file.set_len(write.offset);
            return Err(e.into());
        }

        let mut offset = write.offset;
        for (frame, length) in frames.iter_mut().zip(lengths) {
            frame.offset = offset;
            frame.length = length;
            offset += length as u64;
        }
        write.offset = offset;
        Ok(())
    }

    /// Rewrite the file keeping only `frames`, then reopen on the new file.
    ///
    /// Frames are copied in their on-disk order through a buffered pair of
    /// handles; afterwards each frame's offset reflects its new position.
    pub fn compact(&self, frames: &mut [Frame]) -> Result<()> {
        frames.sort_by_key(|frame| frame.offset);

        let mut write = self.write.lock();
        let mut read = self.read.lock();

        let compact_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.compact_path)?;
        let mut writer = BufWriter::new(compact_file);

        read.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&mut *read);

        let mut new_offsets = Vec::with_capacity(frames.len());
        let mut new_offset: u64 = 0;
        for frame in frames.iter() {
            reader.seek(SeekFrom::Start(frame.offset))?;
            let mut section = (&mut reader).take(frame.length as u64);
            let copied = io::copy(&mut section, &mut writer)?;
            if copied != frame.length as u64 {
                return Err(CofferError::CorruptFrame(format!(
                    "short read at offset {} during compaction",
                    frame.offset
                )));
            }
            new_offsets.push(new_offset);
            new_offset += frame.length as u64;
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&self.compact_path, &self.path)?;
        *read = File::open(&self.path)?;
        write.file = OpenOptions::new().append(true).open(&self.path)?;
        write.offset = new_offset;

        for (frame, offset) in frames.iter_mut().zip(new_offsets) {
            frame.offset = offset;
        }

        debug!(
            box_name = %self.name,
            frames = frames.len(),
            bytes = new_offset,
            "compacted box file"
        );
        Ok(())
    }

    /// Truncate the file to zero length
    pub fn clear(&self) -> Result<()> {
        let mut write = self.write.lock();
        let _read = self.read.lock(); // exclude readers while the file shrinks
        write.file.set_len(0)?;
        write.offset = 0;
        Ok(())
    }

    /// Flush appended frames to physical disk
    pub fn flush(&self) -> Result<()> {
        self.write.lock().file.sync_all()?;
        Ok(())
    }

    /// End of the committed log
    pub fn write_offset(&self) -> u64 {
        self.write.lock().offset
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync and close; the advisory lock is released on drop
    pub fn close(self) -> Result<()> {
        self.write.lock().file.sync_all()?;
        Ok(())
    }

    /// Close, then remove the box file and its lock file
    pub fn delete_from_disk(self) -> Result<()> {
        let Self {
            path,
            compact_path,
            lock_path,
            read,
            write,
            lock_file,
            ..
        } = self;
        drop(read);
        drop(write);
        drop(lock_file);

        fs::remove_file(&path)?;
        if compact_path.exists() {
            fs::remove_file(&compact_path)?;
        }
        fs::remove_file(&lock_path)?;
        Ok(())
    }
}
