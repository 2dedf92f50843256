//! JPEG encoder profile recovery
//!
//! Reads the quantization and frame headers of an encoded JPEG to recover
//! what the original encoder used: an IJG-style quality estimate from the
//! luminance table, and the chroma subsampling factors.

/// Encoder settings recovered from a JPEG stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegProfile {
    /// Estimated IJG quality (1–100), if a luminance table was found
    pub quality: Option<u8>,
    /// Chroma block size in luma pixels, e.g. (2, 2) for 4:2:0.
    /// `None` for grayscale streams.
    pub chroma_sampling: Option<(u8, u8)>,
}

// IJG standard luminance table (Annex K), natural order
const STD_LUMINANCE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

// Natural-order index of each zigzag position
const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const DQT: u8 = 0xDB;

/// Scan the stream headers. Returns `None` if the data is not a JPEG.
pub fn read_profile(data: &[u8]) -> Option<JpegProfile> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
        return None;
    }

    let mut profile = JpegProfile {
        quality: None,
        chroma_sampling: None,
    };
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return Some(profile);
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            // fill byte
            pos += 1;
            continue;
        }
        if marker == EOI || marker == SOS {
            break;
        }
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }

        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > data.len() {
            break;
        }
        let segment = &data[pos + 4..pos + 2 + length];

        match marker {
            DQT if profile.quality.is_none() => {
                profile.quality = luminance_table(segment).map(|t| estimate_quality(&t));
            }
            // Baseline, extended and progressive frame headers
            0xC0..=0xC2 => {
                profile.chroma_sampling = chroma_sampling(segment);
            }
            _ => {}
        }

        pos += 2 + length;
    }

    Some(profile)
}

/// Table 0 from a DQT segment, zigzag order
fn luminance_table(segment: &[u8]) -> Option<[u16; 64]> {
    let mut pos = 0;
    while pos < segment.len() {
        let precision = segment[pos] >> 4;
        let id = segment[pos] & 0x0F;
        let entry_size = if precision == 0 { 1 } else { 2 };
        let end = pos + 1 + 64 * entry_size;
        if end > segment.len() {
            return None;
        }

        if id == 0 {
            let mut table = [0u16; 64];
            for (i, value) in table.iter_mut().enumerate() {
                let at = pos + 1 + i * entry_size;
                *value = if entry_size == 1 {
                    segment[at] as u16
                } else {
                    u16::from_be_bytes([segment[at], segment[at + 1]])
                };
            }
            return Some(table);
        }
        pos = end;
    }
    None
}

/// Invert the IJG quality scaling applied to the standard table
fn estimate_quality(table: &[u16; 64]) -> u8 {
    let scale: f64 = table
        .iter()
        .zip(ZIGZAG.iter())
        .map(|(q, natural)| *q as f64 * 100.0 / STD_LUMINANCE[*natural] as f64)
        .sum::<f64>()
        / 64.0;

    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };
    quality.round().clamp(1.0, 100.0) as u8
}

fn chroma_sampling(frame: &[u8]) -> Option<(u8, u8)> {
    // precision(1) height(2) width(2) components(1), then 3 bytes per component
    let components = *frame.get(5)? as usize;
    if components < 3 || frame.len() < 6 + components * 3 {
        return None;
    }

    let luma = frame[7];
    let chroma = frame[10];
    let (luma_h, luma_v) = (luma >> 4, luma & 0x0F);
    let (chroma_h, chroma_v) = (chroma >> 4, chroma & 0x0F);
    if chroma_h == 0 || chroma_v == 0 {
        return None;
    }
    Some((
        (luma_h / chroma_h).max(1),
        (luma_v / chroma_v).max(1),
    ))
}
