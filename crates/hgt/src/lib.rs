//! HGT1: internal dependency-free global heightmap format.
//!
//! - Equirectangular grid, row 0 at the north pole, column 0 at -180°.
//! - One printable ASCII character per sample, `'#'..='~'` mapping linearly to [0, 1].
//! - Runs are compressed with a three-character escape.
//!
//! File layout (text):
//!   line 0 : "HGT1 <width> <height>"
//!   ..     : payload, line breaks allowed anywhere
//!
//! Payload alphabet:
//!   '#'..='~'        one sample, height = (c - '#') / ('~' - '#')
//!   '!' <c> <n>      run of `c`, length = 2 + ('~' - n), so '~' = 2 ... '#' = 93
//!
//! The escape only ever encodes a sample character; '!' and '"' never appear as samples.

use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

pub const HGT_MAGIC: &str = "HGT1";

/// Lowest sample character (height 0.0).
pub const START: u8 = b'#';
/// Highest sample character (height 1.0).
pub const END: u8 = b'~';
/// Run escape marker.
pub const ESCAPE: u8 = b'!';

/// Shortest run an escape can express.
pub const MIN_RUN: usize = 2;
/// Longest run an escape can express.
pub const MAX_RUN: usize = MIN_RUN + (END - START) as usize;

/// Runs shorter than this are cheaper to write out literally.
const ENCODE_MIN_RUN: usize = 4;

/// A decoded heightmap grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    pub width: usize,
    pub height: usize,
    /// Row-major samples in [0, 1], indexed `row * width + col`.
    pub data: Vec<f32>,
}

#[cold]
fn bad(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

#[inline]
fn is_sample(c: u8) -> bool {
    (START..=END).contains(&c)
}

/// Maps a sample character to its height.
#[inline]
pub fn sample_to_height(c: u8) -> f32 {
    (c.saturating_sub(START)) as f32 / (END - START) as f32
}

/// Quantizes a height in [0, 1] to the nearest sample character.
#[inline]
pub fn height_to_sample(h: f32) -> u8 {
    let h = if h.is_finite() { h.clamp(0.0, 1.0) } else { 0.0 };
    START + (h * (END - START) as f32).round() as u8
}

/// Expands run escapes, returning one sample character per grid cell.
///
/// ASCII whitespace is skipped so payloads may be wrapped.
pub fn expand_rle(encoded: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::<u8>::with_capacity(encoded.len());
    let mut it = encoded.iter().copied().filter(|c| !c.is_ascii_whitespace());

    while let Some(c) = it.next() {
        if c == ESCAPE {
            let value = it.next().ok_or_else(|| bad("run escape truncated"))?;
            let count = it.next().ok_or_else(|| bad("run escape truncated"))?;

            if !is_sample(value) || !is_sample(count) {
                return Err(bad("run escape holds a non-sample character"));
            }

            let run = MIN_RUN + (END - count) as usize;
            out.resize(out.len() + run, value);
        } else if is_sample(c) {
            out.push(c);
        } else {
            return Err(bad("character outside the sample alphabet"));
        }
    }

    Ok(out)
}

/// Compresses sample characters into the escaped payload form.
pub fn compress_rle(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::<u8>::with_capacity(raw.len() / 2);

    let mut i = 0usize;
    while i < raw.len() {
        let value = raw[i];
        let mut run_length = 1usize;

        while i + run_length < raw.len() && raw[i + run_length] == value {
            run_length += 1;
        }
        i += run_length;

        let mut left = run_length;
        while left > 0 {
            if left >= ENCODE_MIN_RUN {
                let k = left.min(MAX_RUN);
                out.push(ESCAPE);
                out.push(value);
                out.push(END - (k - MIN_RUN) as u8);
                left -= k;
            } else {
                out.extend(std::iter::repeat(value).take(left));
                left = 0;
            }
        }
    }

    out
}

/// Decodes an escaped payload directly to heights.
pub fn decode_heights(encoded: &str) -> io::Result<Vec<f32>> {
    Ok(expand_rle(encoded.as_bytes())?
        .into_iter()
        .map(sample_to_height)
        .collect())
}

/// Quantizes and compresses heights into an escaped payload.
pub fn encode_heights(heights: &[f32]) -> String {
    let raw: Vec<u8> = heights.iter().map(|&h| height_to_sample(h)).collect();
    // Only ASCII is ever emitted.
    String::from_utf8(compress_rle(&raw)).unwrap_or_default()
}

impl Heightmap {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> io::Result<Self> {
        if width == 0 || height == 0 {
            return Err(bad("heightmap dimensions must be non-zero"));
        }
        let cells = width
            .checked_mul(height)
            .ok_or_else(|| bad("heightmap dimensions overflow"))?;
        if data.len() != cells {
            return Err(bad("heightmap sample count does not match dimensions"));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A grid with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            data: vec![value.clamp(0.0, 1.0); width.max(1) * height.max(1)],
        }
    }

    /// Builds a grid from a `(row, col) -> height` function.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col).clamp(0.0, 1.0));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Decodes an escaped payload of a known grid size.
    pub fn decode(width: usize, height: usize, encoded: &str) -> io::Result<Self> {
        Self::new(width, height, decode_heights(encoded)?)
    }

    pub fn encode(&self) -> String {
        encode_heights(&self.data)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row.min(self.height - 1) * self.width + col.min(self.width - 1)]
    }

    /// Nearest grid cell `(row, col)` for a UV coordinate.
    pub fn cell(&self, u: f64, v: f64) -> (usize, usize) {
        let col = ((u * self.width as f64).floor() as i64).rem_euclid(self.width as i64) as usize;
        let row = ((v * self.height as f64).floor() as i64).clamp(0, self.height as i64 - 1) as usize;
        (row, col)
    }

    /// Bilinear sample at a UV coordinate; `u` wraps, `v` clamps.
    pub fn sample(&self, u: f64, v: f64) -> f32 {
        let x = u * self.width as f64 - 0.5;
        let y = (v * self.height as f64 - 0.5).clamp(0.0, (self.height - 1) as f64);

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = (x - x0) as f32;
        let fy = (y - y0) as f32;

        let w = self.width as i64;
        let c0 = (x0 as i64).rem_euclid(w) as usize;
        let c1 = (x0 as i64 + 1).rem_euclid(w) as usize;
        let r0 = y0 as usize;
        let r1 = (r0 + 1).min(self.height - 1);

        let top = self.get(r0, c0) * (1.0 - fx) + self.get(r0, c1) * fx;
        let bottom = self.get(r1, c0) * (1.0 - fx) + self.get(r1, c1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Parse HGT1 from a contiguous byte slice.
pub fn parse_hgt_bytes(bytes: &[u8]) -> io::Result<Heightmap> {
    let split = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| bad("missing HGT1 header line"))?;
    let header = std::str::from_utf8(&bytes[..split]).map_err(|_| bad("header is not UTF-8"))?;

    let mut fields = header.split_whitespace();
    if fields.next() != Some(HGT_MAGIC) {
        return Err(bad("bad HGT1 magic"));
    }
    let width: usize = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad("bad HGT1 width"))?;
    let height: usize = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad("bad HGT1 height"))?;

    let samples = expand_rle(&bytes[split + 1..])?;
    Heightmap::new(
        width,
        height,
        samples.into_iter().map(sample_to_height).collect(),
    )
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Heightmap> {
    let file = File::open(path)?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    parse_hgt_bytes(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Heightmap> {
    let bytes = std::fs::read(path)?;
    parse_hgt_bytes(&bytes)
}

/// Writes the header and the payload, wrapped at `line_width` characters.
pub fn write_file<P: AsRef<Path>>(path: P, map: &Heightmap, line_width: usize) -> io::Result<()> {
    let mut file = io::BufWriter::new(File::create(path)?);
    writeln!(file, "{} {} {}", HGT_MAGIC, map.width, map.height)?;

    let payload = map.encode();
    // Escapes may straddle a line break; the reader skips whitespace.
    for chunk in payload.as_bytes().chunks(line_width.max(1)) {
        file.write_all(chunk)?;
        file.write_all(b"\n")?;
    }

    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_pair_expands_to_four_zero_samples() {
        let heights = decode_heights("!#~!#~").unwrap();
        assert_eq!(heights, vec![0.0; 4]);
    }

    #[test]
    fn run_length_counts_down_from_end() {
        assert_eq!(expand_rle(b"!a}").unwrap(), b"aaa".to_vec());
        assert_eq!(expand_rle(b"!a#").unwrap().len(), MAX_RUN);
    }

    #[test]
    fn sample_characters_span_unit_range() {
        assert_eq!(sample_to_height(START), 0.0);
        assert_eq!(sample_to_height(END), 1.0);
        assert_eq!(height_to_sample(1.0), END);
        assert_eq!(height_to_sample(-3.0), START);
        assert_eq!(height_to_sample(f32::NAN), START);
    }

    #[test]
    fn compressed_runs_expand_to_original_characters() {
        let mut raw = Vec::new();
        raw.extend(std::iter::repeat(b'#').take(250));
        raw.extend_from_slice(b"abc");
        raw.extend(std::iter::repeat(b'~').take(5));
        raw.extend_from_slice(b"zz");

        let packed = compress_rle(&raw);
        assert!(packed.len() < raw.len());
        assert_eq!(expand_rle(&packed).unwrap(), raw);
    }

    #[test]
    fn canonical_escapes_survive_reencoding() {
        let text = b"!#{ab!~#c";
        let raw = expand_rle(text).unwrap();
        assert_eq!(compress_rle(&raw), text.to_vec());
    }

    #[test]
    fn whitespace_is_ignored_and_junk_rejected() {
        assert_eq!(expand_rle(b"ab\n!c~\r\n").unwrap(), b"abcc".to_vec());
        assert!(expand_rle(b"ab\x01").is_err());
        assert!(expand_rle(b"!a").is_err());
        assert!(expand_rle(b"!\"~").is_err());
    }

    #[test]
    fn bilinear_sampling_wraps_longitude() {
        // Left column full height, right column zero; the seam averages them.
        let map = Heightmap::from_fn(2, 1, |_, col| if col == 0 { 1.0 } else { 0.0 });
        assert!((map.sample(0.25, 0.5) - 1.0).abs() < 1e-6);
        assert!((map.sample(0.75, 0.5)).abs() < 1e-6);
        assert!((map.sample(0.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((map.sample(1.0, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn cell_lookup_clamps_rows_and_wraps_columns() {
        let map = Heightmap::filled(4, 2, 0.0);
        assert_eq!(map.cell(0.0, 0.0), (0, 0));
        assert_eq!(map.cell(1.0, 1.0), (1, 0));
        assert_eq!(map.cell(-0.1, 0.6), (1, 3));
    }

    #[test]
    fn parse_reads_header_and_payload() {
        let map = parse_hgt_bytes(b"HGT1 3 2\n!~~\n#~~#\n").unwrap();
        assert_eq!((map.width, map.height), (3, 2));
        assert_eq!(map.data, vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0]);

        assert!(parse_hgt_bytes(b"HGT2 3 2\n######\n").is_err());
        assert!(parse_hgt_bytes(b"HGT1 3 2\n####\n").is_err());
    }

    #[test]
    fn oversized_header_is_rejected() {
        let header = format!("HGT1 {} {}\n####\n", usize::MAX, 2);
        let err = parse_hgt_bytes(header.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn file_round_trip_keeps_quantized_heights() {
        let map = Heightmap::from_fn(16, 8, |row, col| if row > 3 && col % 5 == 0 { 0.5 } else { 0.0 });
        let path = std::env::temp_dir().join(format!("hgt-test-{}.hgt", std::process::id()));

        write_file(&path, &map, 7).unwrap();
        let back = read_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((back.width, back.height), (16, 8));
        for (a, b) in map.data.iter().zip(&back.data) {
            assert!((a - b).abs() <= 0.5 / (END - START) as f32 + 1e-6);
        }
    }
}
