//! Minimal RIFF/AVI muxer for MJPEG streams.
//!
//! Each frame chunk is a complete JPEG, so the container carries no codec
//! state: one `00dc` chunk per segment plus a keyframe index. Layout:
//!
//! ```text
//! RIFF 'AVI '
//!   LIST 'hdrl'
//!     'avih' (main header)
//!     LIST 'strl'
//!       'strh' (stream header, fcc MJPG)
//!       'strf' (BITMAPINFOHEADER)
//!   LIST 'movi'
//!     '00dc' <jpeg> ...
//!   'idx1'
//! ```

use std::io::{self, Write};

const AVIF_HASINDEX: u32 = 0x0000_0010;
const AVIIF_KEYFRAME: u32 = 0x0000_0010;

/// avih + nested strl, fixed because there is exactly one video stream.
const HDRL_LIST_SIZE: u32 = 4 + (8 + 56) + (8 + STRL_LIST_SIZE);
const STRL_LIST_SIZE: u32 = 4 + (8 + 56) + (8 + 40);

/// Write a complete MJPEG AVI file from ordered JPEG segments.
pub fn write_mjpeg<W: Write>(
    out: &mut W,
    width: u32,
    height: u32,
    fps: u32,
    segments: &[Vec<u8>],
) -> io::Result<()> {
    let fps = fps.max(1);
    let frames = segments.len() as u32;
    let max_segment = segments.iter().map(|s| s.len()).max().unwrap_or(0) as u32;

    let padded: Vec<u32> = segments.iter().map(|s| (s.len() as u32 + 1) & !1).collect();
    let movi_payload: u32 = padded.iter().map(|&p| 8 + p).sum();
    let movi_list_size = 4 + movi_payload;
    let idx_size = 16 * frames;

    let riff_size = 4 + (8 + HDRL_LIST_SIZE) + (8 + movi_list_size) + (8 + idx_size);

    let mut buf: Vec<u8> = Vec::with_capacity(riff_size as usize + 8);

    // --- RIFF header ---
    buf.extend_from_slice(b"RIFF");
    push_u32(&mut buf, riff_size);
    buf.extend_from_slice(b"AVI ");

    // --- hdrl ---
    buf.extend_from_slice(b"LIST");
    push_u32(&mut buf, HDRL_LIST_SIZE);
    buf.extend_from_slice(b"hdrl");

    // avih: main AVI header
    buf.extend_from_slice(b"avih");
    push_u32(&mut buf, 56);
    push_u32(&mut buf, 1_000_000 / fps); // microseconds per frame
    push_u32(&mut buf, fps * max_segment); // max bytes per second
    push_u32(&mut buf, 0); // padding granularity
    push_u32(&mut buf, AVIF_HASINDEX);
    push_u32(&mut buf, frames);
    push_u32(&mut buf, 0); // initial frames
    push_u32(&mut buf, 1); // streams
    push_u32(&mut buf, max_segment); // suggested buffer size
    push_u32(&mut buf, width);
    push_u32(&mut buf, height);
    for _ in 0..4 {
        push_u32(&mut buf, 0); // reserved
    }

    // strl: the single video stream
    buf.extend_from_slice(b"LIST");
    push_u32(&mut buf, STRL_LIST_SIZE);
    buf.extend_from_slice(b"strl");

    // strh: stream header
    buf.extend_from_slice(b"strh");
    push_u32(&mut buf, 56);
    buf.extend_from_slice(b"vids");
    buf.extend_from_slice(b"MJPG");
    push_u32(&mut buf, 0); // flags
    push_u16(&mut buf, 0); // priority
    push_u16(&mut buf, 0); // language
    push_u32(&mut buf, 0); // initial frames
    push_u32(&mut buf, 1); // scale
    push_u32(&mut buf, fps); // rate (rate/scale = fps)
    push_u32(&mut buf, 0); // start
    push_u32(&mut buf, frames); // length in frames
    push_u32(&mut buf, max_segment); // suggested buffer size
    push_u32(&mut buf, u32::MAX); // quality: default
    push_u32(&mut buf, 0); // sample size: varies per chunk
    push_u16(&mut buf, 0); // rcFrame left
    push_u16(&mut buf, 0); // rcFrame top
    push_u16(&mut buf, width as u16); // rcFrame right
    push_u16(&mut buf, height as u16); // rcFrame bottom

    // strf: BITMAPINFOHEADER
    buf.extend_from_slice(b"strf");
    push_u32(&mut buf, 40);
    push_u32(&mut buf, 40); // biSize
    push_u32(&mut buf, width);
    push_u32(&mut buf, height);
    push_u16(&mut buf, 1); // planes
    push_u16(&mut buf, 24); // bit count
    buf.extend_from_slice(b"MJPG");
    push_u32(&mut buf, width * height * 3); // biSizeImage
    push_u32(&mut buf, 0); // x pels per meter
    push_u32(&mut buf, 0); // y pels per meter
    push_u32(&mut buf, 0); // colors used
    push_u32(&mut buf, 0); // colors important

    // --- movi ---
    buf.extend_from_slice(b"LIST");
    push_u32(&mut buf, movi_list_size);
    buf.extend_from_slice(b"movi");

    // Chunk offsets for idx1 are relative to the 'movi' fourcc.
    let mut offsets = Vec::with_capacity(segments.len());
    let mut offset: u32 = 4;
    for (segment, &pad) in segments.iter().zip(padded.iter()) {
        offsets.push(offset);
        buf.extend_from_slice(b"00dc");
        push_u32(&mut buf, segment.len() as u32);
        buf.extend_from_slice(segment);
        if pad != segment.len() as u32 {
            buf.push(0);
        }
        offset += 8 + pad;
    }

    // --- idx1 ---
    buf.extend_from_slice(b"idx1");
    push_u32(&mut buf, idx_size);
    for (segment, &chunk_offset) in segments.iter().zip(offsets.iter()) {
        buf.extend_from_slice(b"00dc");
        push_u32(&mut buf, AVIIF_KEYFRAME);
        push_u32(&mut buf, chunk_offset);
        push_u32(&mut buf, segment.len() as u32);
    }

    out.write_all(&buf)
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}
