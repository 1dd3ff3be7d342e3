use std::hash::{Hash, Hasher};
use std::sync::Arc;

use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::{Canvas, Fps};
use crate::timeline::clip::{ClipDescriptor, Placement};

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;
const FORMAT_VERSION: u8 = 1;

/// Canonical, order-independent key over one timeline snapshot.
///
/// Carries the canonical byte encoding next to its 128-bit digest. Hashing uses the digest only;
/// equality falls back to the bytes, so two distinct timelines never compare equal even if their
/// digests collide.
#[derive(Clone, Debug)]
pub struct TimelineFingerprint {
    /// High 64 bits of the xxh3-128 digest.
    pub hi: u64,
    /// Low 64 bits of the xxh3-128 digest.
    pub lo: u64,
    bytes: Arc<[u8]>,
}

impl TimelineFingerprint {
    /// Canonical encoding the digest was computed from.
    pub fn canonical_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Digest as 32 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        format!("{:016x}{:016x}", self.hi, self.lo)
    }
}

impl PartialEq for TimelineFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.hi == other.hi && self.lo == other.lo && self.bytes == other.bytes
    }
}

impl Eq for TimelineFingerprint {}

impl Hash for TimelineFingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hi.hash(state);
        self.lo.hash(state);
    }
}

/// Fingerprint a timeline and report each clip's position in the canonical order.
///
/// Clip order does not change the fingerprint: clips are encoded individually and sorted by
/// `(id, source path, encoding)` before being joined.
///
/// `ranks[i]` is the canonical rank of `clips[i]`; clips with identical encodings share a rank.
/// The fingerprint fixes the canonical order, so within one fingerprint a sequence of ranks
/// identifies a paint order exactly.
pub(crate) fn fingerprint_with_ranks(
    canvas: Canvas,
    fps: Fps,
    total_frames: u64,
    clips: &[ClipDescriptor],
) -> (TimelineFingerprint, Vec<u32>) {
    let mut encoded: Vec<((&str, &str, Vec<u8>), usize)> = clips
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let mut w = CanonicalWriter::default();
            write_clip(&mut w, c);
            ((c.id.as_str(), c.source_path.as_str(), w.buf), i)
        })
        .collect();
    encoded.sort();

    let mut ranks = vec![0u32; clips.len()];
    let mut rank = 0u32;
    for (pos, (key, i)) in encoded.iter().enumerate() {
        if pos > 0 && encoded[pos - 1].0 != *key {
            rank += 1;
        }
        ranks[*i] = rank;
    }

    let mut w = CanonicalWriter::default();
    w.write_u8(FORMAT_VERSION);
    w.write_u32(canvas.width);
    w.write_u32(canvas.height);
    w.write_f64(fps.as_f64());
    w.write_u64(total_frames);
    w.write_u64(encoded.len() as u64);
    for ((_, _, bytes), _) in &encoded {
        w.write_u64(bytes.len() as u64);
        w.write_bytes(bytes);
    }
    (w.finish(), ranks)
}

#[derive(Default)]
struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    fn write_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        // -0.0 and 0.0 place a clip identically.
        let v = if v == 0.0 { 0.0 } else { v };
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn write_opt_f64(&mut self, v: Option<f64>) {
        match v {
            Some(v) => {
                self.write_u8(1);
                self.write_f64(v);
            }
            None => self.write_u8(0),
        }
    }

    fn write_opt_i64(&mut self, v: Option<i64>) {
        match v {
            Some(v) => {
                self.write_u8(1);
                self.write_i64(v);
            }
            None => self.write_u8(0),
        }
    }

    fn finish(self) -> TimelineFingerprint {
        let mut h = Xxh3::with_seed(XXH3_SEED);
        h.update(&self.buf);
        let v = h.digest128();
        TimelineFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
            bytes: self.buf.into(),
        }
    }
}

fn write_clip(w: &mut CanonicalWriter, c: &ClipDescriptor) {
    w.write_str(&c.id);
    w.write_str(&c.source_path);
    w.write_i64(c.track_start_ms);
    w.write_i64(c.track_end_ms);
    w.write_i64(c.source_start_ms);
    w.write_opt_i64(c.source_end_ms);
    w.write_u64(c.track_range.start.0);
    w.write_u64(c.track_range.end.0);
    w.write_u64(c.source_start_frame);
    write_placement(w, &c.placement);
    w.write_u8(c.flip.tag());
}

fn write_placement(w: &mut CanonicalWriter, p: &Placement) {
    w.write_opt_f64(p.left);
    w.write_opt_f64(p.top);
    w.write_opt_f64(p.width);
    w.write_opt_f64(p.height);
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/fingerprint.rs"]
mod tests;
