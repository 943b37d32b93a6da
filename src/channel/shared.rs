use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

use super::frame::{max_payload_size, FrameSlot, PixelBuffer, PixelFormat};
use crate::error::VcamError;

// Segment header, little-endian, fixed offsets. The payload follows at
// HEADER_LEN and is sized for one maximum-resolution frame.
//
//   0  magic           u64
//   8  attach_count    u32   processes currently mapping the segment
//   12 version         u32   seqlock generation, odd while a write is in flight
//   16 sequence        u64   bumped once per publish, 0 = nothing published
//   24 timestamp_nanos i64
//   32 width           u32
//   36 height          u32
//   40 pixel_format    u32
//   44 payload_len     u32
//   48 reserved        16 bytes
const MAGIC: u64 = u64::from_le_bytes(*b"VCAMFRM1");
const OFF_MAGIC: usize = 0;
const OFF_ATTACH: usize = 8;
const OFF_VERSION: usize = 12;
const OFF_SEQUENCE: usize = 16;
const OFF_TIMESTAMP: usize = 24;
const OFF_WIDTH: usize = 32;
const OFF_HEIGHT: usize = 36;
const OFF_FORMAT: usize = 40;
const OFF_PAYLOAD_LEN: usize = 44;
pub const HEADER_LEN: usize = 64;

// Spins before a writer reclaims a generation left odd by a dead writer,
// and retries before a reader gives up and serves nothing.
const WRITE_RECLAIM_SPINS: u32 = 4096;
const READ_RETRIES: u32 = 4096;

/// Cross-process single-slot frame mailbox.
///
/// One producer publishes the latest frame; any number of readers snapshot
/// it at their own rate. The slot lives in a file-backed shared mapping so
/// it outlives any individual host connection. Consistency is a seqlock on
/// the in-segment version word: the writer holds it odd for the duration of
/// a publish, readers discard any snapshot taken across a generation change.
/// Readers never hold the word, so a process dying mid-read cannot wedge the
/// segment, and a process dying mid-write only costs readers a bounded retry
/// loop before they fall back to their cached frame.
pub struct FrameChannel {
    name: String,
    path: PathBuf,
    // Raw base pointer captured once; `_map` keeps the mapping alive.
    ptr: *mut u8,
    _map: MmapMut,
}

// All mutation is versioned by the in-segment seqlock word; the raw pointer
// is only an artifact of writing through a shared mapping.
unsafe impl Send for FrameChannel {}
unsafe impl Sync for FrameChannel {}

impl FrameChannel {
    /// Open the named segment, creating it sized for the maximum supported
    /// frame if no producer or reader has created it yet.
    pub fn open_or_create(name: &str) -> Result<Self, VcamError> {
        Self::open_or_create_in(std::env::temp_dir(), name)
    }

    /// Same as `open_or_create` with an explicit directory (tests use this
    /// to keep segments out of the real temp dir).
    pub fn open_or_create_in(dir: impl AsRef<Path>, name: &str) -> Result<Self, VcamError> {
        let path = dir.as_ref().join(format!("{name}.vcamseg"));
        let total = HEADER_LEN + max_payload_size();

        let map_err = |source: std::io::Error| VcamError::ChannelUnavailable {
            name: name.to_string(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(map_err)?;

        let created = file.metadata().map_err(map_err)?.len() == 0;
        if created {
            file.set_len(total as u64).map_err(map_err)?;
        }

        let mut map = unsafe { MmapMut::map_mut(&file) }.map_err(map_err)?;
        let ptr = map.as_mut_ptr();

        // Validate before constructing Self: Drop decrements the attach
        // count, which must only happen after the increment below.
        if created {
            // Fresh segment: stamp the magic; everything else is already zero.
            unsafe { (ptr.add(OFF_MAGIC) as *mut u64).write(MAGIC) };
            debug!(name, path = %path.display(), "created frame channel segment");
        } else if unsafe { (ptr.add(OFF_MAGIC) as *const u64).read() } != MAGIC {
            return Err(VcamError::ChannelUnavailable {
                name: name.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "segment exists but magic does not match",
                ),
            });
        } else {
            debug!(name, "attached to existing frame channel segment");
        }

        let channel = Self {
            name: name.to_string(),
            path,
            ptr,
            _map: map,
        };
        channel.attach_count_word().fetch_add(1, Ordering::AcqRel);
        Ok(channel)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Processes currently attached to the segment (including this one).
    pub fn attach_count(&self) -> u32 {
        self.attach_count_word().load(Ordering::Acquire)
    }

    /// Current publish sequence without taking the lock. 0 means nothing
    /// has ever been published.
    pub fn sequence(&self) -> u64 {
        self.sequence_word().load(Ordering::Acquire)
    }

    /// Copy `frame` into the shared slot and bump the sequence.
    ///
    /// Never blocks on readers; succeeds whether or not anyone is attached.
    /// The generation is held odd only for the header and payload copy.
    pub fn publish(&self, frame: &PixelBuffer, timestamp_nanos: i64) -> Result<u64, VcamError> {
        if frame.data.len() > max_payload_size() {
            return Err(VcamError::ChannelUnavailable {
                name: self.name.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("frame payload {} exceeds segment capacity", frame.data.len()),
                ),
            });
        }

        let generation = self.begin_write();
        unsafe {
            (self.ptr.add(OFF_TIMESTAMP) as *mut i64).write(timestamp_nanos);
            (self.ptr.add(OFF_WIDTH) as *mut u32).write(frame.width);
            (self.ptr.add(OFF_HEIGHT) as *mut u32).write(frame.height);
            (self.ptr.add(OFF_FORMAT) as *mut u32).write(frame.format.to_wire());
            (self.ptr.add(OFF_PAYLOAD_LEN) as *mut u32).write(frame.data.len() as u32);
            std::ptr::copy_nonoverlapping(
                frame.data.as_ptr(),
                self.ptr.add(HEADER_LEN),
                frame.data.len(),
            );
        }
        let seq = self.sequence_word().fetch_add(1, Ordering::AcqRel) + 1;
        self.end_write(generation);
        Ok(seq)
    }

    /// Snapshot the slot if it holds something newer than `last_seen`.
    ///
    /// `None` is not an error: it means no frame has ever been published, or
    /// the slot still holds the frame the caller already saw, or the writer
    /// is stalled mid-publish. Callers repeat their previous frame to keep
    /// cadence. Never blocks: the retry loop is bounded.
    pub fn try_read(&self, last_seen: u64) -> Option<FrameSlot> {
        let word = self.version_word();

        for attempt in 1..=READ_RETRIES {
            let before = word.load(Ordering::Acquire);
            if before & 1 == 1 {
                // write in flight
                if attempt % 1024 == 0 {
                    std::thread::yield_now();
                } else {
                    std::hint::spin_loop();
                }
                continue;
            }

            let seq = self.sequence_word().load(Ordering::Acquire);
            if seq == 0 || seq == last_seen {
                return None;
            }

            let timestamp_nanos = unsafe { (self.ptr.add(OFF_TIMESTAMP) as *const i64).read() };
            let width = self.read_u32(OFF_WIDTH);
            let height = self.read_u32(OFF_HEIGHT);
            let format_tag = self.read_u32(OFF_FORMAT);
            let payload_len = self.read_u32(OFF_PAYLOAD_LEN) as usize;

            let mut payload = vec![0u8; payload_len.min(max_payload_size())];
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.ptr.add(HEADER_LEN) as *const u8,
                    payload.as_mut_ptr(),
                    payload.len(),
                );
            }

            std::sync::atomic::fence(Ordering::Acquire);
            if word.load(Ordering::Relaxed) != before {
                // overwritten mid-copy, snapshot is torn
                continue;
            }

            // the snapshot is consistent, so an unknown tag is real data
            match PixelFormat::from_wire(format_tag) {
                Some(format) => {
                    return Some(FrameSlot {
                        sequence: seq,
                        timestamp_nanos,
                        width,
                        height,
                        format,
                        payload,
                    });
                }
                None => {
                    warn!(name = %self.name, tag = format_tag, "slot holds unknown pixel format tag");
                    return None;
                }
            }
        }

        warn!(name = %self.name, "frame slot unreadable, writer stalled mid-publish");
        None
    }

    /// Flip the generation odd, waiting out a concurrent publish. A
    /// generation left odd past the spin bound belongs to a writer that died
    /// mid-publish; the slot is torn either way, so the write is taken over.
    fn begin_write(&self) -> u32 {
        let word = self.version_word();
        let mut spins = 0u32;
        loop {
            let v = word.load(Ordering::Acquire);
            if v & 1 == 0 {
                if word
                    .compare_exchange_weak(v, v.wrapping_add(1), Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    return v.wrapping_add(1);
                }
            } else if spins >= WRITE_RECLAIM_SPINS {
                warn!(name = %self.name, "reclaiming frame slot from an abandoned publish");
                if word
                    .compare_exchange(v, v.wrapping_add(2), Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    return v.wrapping_add(2);
                }
            }
            spins += 1;
            if spins % 1024 == 0 {
                std::thread::yield_now();
            } else {
                std::hint::spin_loop();
            }
        }
    }

    fn end_write(&self, generation: u32) {
        self.version_word()
            .store(generation.wrapping_add(1), Ordering::Release);
    }

    fn attach_count_word(&self) -> &AtomicU32 {
        unsafe { &*(self.ptr.add(OFF_ATTACH) as *const AtomicU32) }
    }

    fn version_word(&self) -> &AtomicU32 {
        unsafe { &*(self.ptr.add(OFF_VERSION) as *const AtomicU32) }
    }

    fn sequence_word(&self) -> &AtomicU64 {
        unsafe { &*(self.ptr.add(OFF_SEQUENCE) as *const AtomicU64) }
    }

    fn read_u32(&self, offset: usize) -> u32 {
        unsafe { (self.ptr.add(offset) as *const u32).read() }
    }
}

impl Drop for FrameChannel {
    fn drop(&mut self) {
        let previous = self.attach_count_word().fetch_sub(1, Ordering::AcqRel);
        if previous == 1 {
            // Last detacher removes the backing file. Not atomic with
            // open_or_create: an attach landing between the decrement and
            // the unlink keeps the old inode alive while later openers map
            // a fresh file, splitting producer and reader until both
            // reattach.
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to unlink frame channel segment");
            } else {
                debug!(name = %self.name, "last detach, unlinked frame channel segment");
            }
        }
    }
}
