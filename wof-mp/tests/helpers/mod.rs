//! Test helpers for wof-mp integration tests
//!
//! - Payload builders (silent WAV via hound, minimal H.264 MP4, image and
//!   garbage bytes)
//! - Pool construction over a private temp directory
//! - Stub backends: gated preparation, failing stop, call counting

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use wof_mp::media::{
    ContainerFormat, MediaBackend, PlaybackPolicy, PlaybackSession, PreparedSession,
    SymphoniaBackend,
};
use wof_mp::{Error, MediaPlayerPool, PoolConfig, Result};

const TEST_SAMPLE_RATE: u32 = 44100;

/// Silent stereo 16-bit WAV
pub fn wav_bytes(duration_ms: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = TEST_SAMPLE_RATE * duration_ms / 1000;
        for _ in 0..frames * 2 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Short playable payload
pub fn clip() -> Vec<u8> {
    wav_bytes(100)
}

/// Generated MP4 timing: timescale 1000, 100 ticks per sample
const MP4_TIMESCALE: u32 = 1000;
const MP4_SAMPLE_DELTA: u32 = 100;
const MP4_SAMPLE_SIZE: u32 = 16;

fn be16(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

fn be32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&be32(payload.len() as u32 + 8));
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

fn mp4_full_box(kind: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let header = (u32::from(version) << 24) | (flags & 0x00FF_FFFF);
    mp4_box(kind, &[&be32(header)[..], payload].concat())
}

const UNITY_MATRIX: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

fn matrix() -> Vec<u8> {
    UNITY_MATRIX.iter().flat_map(|v| be32(*v)).collect()
}

fn avc1_sample_entry(width: u16, height: u16) -> Vec<u8> {
    let sps: [u8; 9] = [0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x05, 0x07, 0xE8, 0x40];
    let pps: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];
    let avcc = [
        &[0x01, 0x42, 0xC0, 0x1E, 0xFF, 0xE1][..],
        &be16(sps.len() as u16),
        &sps,
        &[0x01],
        &be16(pps.len() as u16),
        &pps,
    ]
    .concat();

    let payload = [
        &[0u8; 6][..], // reserved
        &be16(1),      // data_reference_index
        &[0u8; 16],    // pre_defined + reserved
        &be16(width),
        &be16(height),
        &be32(0x0048_0000), // 72 dpi
        &be32(0x0048_0000),
        &be32(0),
        &be16(1),   // frame_count
        &[0u8; 32], // compressorname
        &be16(0x0018),
        &be16(0xFFFF),
        &mp4_box(b"avcC", &avcc),
    ]
    .concat();
    mp4_box(b"avc1", &payload)
}

fn mp4_moov(samples: u32, chunk_offset: u32) -> Vec<u8> {
    let duration = samples * MP4_SAMPLE_DELTA;

    let mvhd = mp4_full_box(
        b"mvhd",
        0,
        0,
        &[
            &be32(0)[..],
            &be32(0),
            &be32(MP4_TIMESCALE),
            &be32(duration),
            &be32(0x0001_0000), // rate 1.0
            &be16(0x0100),      // volume 1.0
            &[0u8; 10],
            &matrix(),
            &[0u8; 24],
            &be32(2), // next_track_ID
        ]
        .concat(),
    );

    let tkhd = mp4_full_box(
        b"tkhd",
        0,
        0x0000_0003,
        &[
            &be32(0)[..],
            &be32(0),
            &be32(1), // track_ID
            &be32(0),
            &be32(duration),
            &[0u8; 8],
            &be16(0), // layer
            &be16(0), // alternate_group
            &be16(0), // volume (video)
            &be16(0),
            &matrix(),
            &be32(320 << 16),
            &be32(240 << 16),
        ]
        .concat(),
    );

    let mdhd = mp4_full_box(
        b"mdhd",
        0,
        0,
        &[
            &be32(0)[..],
            &be32(0),
            &be32(MP4_TIMESCALE),
            &be32(duration),
            &be16(0x55C4), // "und"
            &be16(0),
        ]
        .concat(),
    );

    let hdlr = mp4_full_box(
        b"hdlr",
        0,
        0,
        &[&be32(0)[..], b"vide", &[0u8; 12], b"VideoHandler\0"].concat(),
    );

    let vmhd = mp4_full_box(b"vmhd", 0, 1, &[0u8; 8]);
    let dinf = mp4_box(
        b"dinf",
        &mp4_full_box(
            b"dref",
            0,
            0,
            &[&be32(1)[..], &mp4_full_box(b"url ", 0, 1, &[])].concat(),
        ),
    );

    let stsd = mp4_full_box(
        b"stsd",
        0,
        0,
        &[&be32(1)[..], &avc1_sample_entry(320, 240)].concat(),
    );
    let stts = mp4_full_box(
        b"stts",
        0,
        0,
        &[be32(1), be32(samples), be32(MP4_SAMPLE_DELTA)].concat(),
    );
    let stsc = mp4_full_box(
        b"stsc",
        0,
        0,
        &[be32(1), be32(1), be32(samples), be32(1)].concat(),
    );
    let stsz = mp4_full_box(
        b"stsz",
        0,
        0,
        &[be32(MP4_SAMPLE_SIZE), be32(samples)].concat(),
    );
    let stco = mp4_full_box(b"stco", 0, 0, &[be32(1), be32(chunk_offset)].concat());

    let stbl = mp4_box(b"stbl", &[stsd, stts, stsc, stsz, stco].concat());
    let minf = mp4_box(b"minf", &[vmhd, dinf, stbl].concat());
    let mdia = mp4_box(b"mdia", &[mdhd, hdlr, minf].concat());
    let trak = mp4_box(b"trak", &[tkhd, mdia].concat());
    mp4_box(b"moov", &[mvhd, trak].concat())
}

/// Video-only MP4 (ftyp, moov, mdat) with one H.264 track
///
/// Each sample is a length-prefixed IDR-type NAL of zeros; the samples are
/// never decoded, only the container structure has to be valid.
pub fn mp4_video_bytes(samples: u32) -> Vec<u8> {
    let ftyp = mp4_box(
        b"ftyp",
        &[&b"isom"[..], &be32(0x200), b"isom", b"iso2", b"avc1", b"mp41"].concat(),
    );

    let mut sample = be32(MP4_SAMPLE_SIZE - 4).to_vec();
    sample.push(0x65);
    sample.resize(MP4_SAMPLE_SIZE as usize, 0);
    let mdat_payload: Vec<u8> = (0..samples).flat_map(|_| sample.clone()).collect();

    // moov length does not depend on the offset value
    let moov_len = mp4_moov(samples, 0).len();
    let chunk_offset = (ftyp.len() + moov_len + 8) as u32;
    let moov = mp4_moov(samples, chunk_offset);

    [ftyp, moov, mp4_box(b"mdat", &mdat_payload)].concat()
}

/// One-second video clip
pub fn video_clip() -> Vec<u8> {
    mp4_video_bytes(MP4_TIMESCALE / MP4_SAMPLE_DELTA)
}

pub fn png_bytes() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR".to_vec();
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}

pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    bytes.extend_from_slice(b"JFIF\x00");
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}

/// Recognisable container header over an unparseable body
pub fn broken_mp4_bytes() -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x18ftypisom\x00\x00\x02\x00isomiso2".to_vec();
    bytes.extend_from_slice(b"this is not a movie atom");
    bytes
}

pub fn garbage_bytes() -> Vec<u8> {
    b"definitely not media, just some text".to_vec()
}

pub fn test_config(dir: &Path, capacity: usize) -> PoolConfig {
    PoolConfig {
        capacity,
        temp_dir: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

/// Pool over a fresh temp dir; keep the `TempDir` alive for the test
pub fn test_pool(capacity: usize) -> (MediaPlayerPool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = MediaPlayerPool::new(test_config(dir.path(), capacity)).unwrap();
    (pool, dir)
}

pub fn pool_with_backend(
    capacity: usize,
    backend: Arc<dyn MediaBackend>,
) -> (MediaPlayerPool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), capacity);
    let pool = MediaPlayerPool::with_backend(config, backend).unwrap();
    (pool, dir)
}

/// Number of files currently in `dir`
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

/// Poll `check` (real time) until it holds or a few seconds pass
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Symphonia backend that counts `prepare` calls
#[derive(Default)]
pub struct CountingBackend {
    inner: SymphoniaBackend,
    calls: AtomicUsize,
}

impl CountingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MediaBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn prepare(&self, path: &Path, format: ContainerFormat) -> Result<PreparedSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.prepare(path, format)
    }
}

/// Backend whose `prepare` blocks until the test opens the gate
pub struct GatedBackend {
    inner: SymphoniaBackend,
    gate: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
}

impl GatedBackend {
    pub fn new() -> (Arc<Self>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let backend = Arc::new(Self {
            inner: SymphoniaBackend::new(),
            gate: Mutex::new(rx),
            calls: AtomicUsize::new(0),
        });
        (backend, tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MediaBackend for GatedBackend {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn prepare(&self, path: &Path, format: ContainerFormat) -> Result<PreparedSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let opened = self
            .gate
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10));
        if opened.is_err() {
            return Err(Error::MediaCreation("gate never opened".to_string()));
        }
        self.inner.prepare(path, format)
    }
}

/// Backend whose sessions fail to stop
#[derive(Default)]
pub struct StubbornStopBackend {
    inner: SymphoniaBackend,
}

struct StubbornSession {
    inner: Box<dyn PlaybackSession>,
}

impl PlaybackSession for StubbornSession {
    fn play(&mut self, policy: &PlaybackPolicy) -> Result<()> {
        self.inner.play(policy)
    }

    fn pause(&mut self) -> Result<()> {
        self.inner.pause()
    }

    fn stop(&mut self) -> Result<()> {
        Err(Error::Internal("decoder refused to stop".to_string()))
    }

    fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }
}

impl MediaBackend for StubbornStopBackend {
    fn name(&self) -> &'static str {
        "stubborn-stop"
    }

    fn prepare(&self, path: &Path, format: ContainerFormat) -> Result<PreparedSession> {
        let prepared = self.inner.prepare(path, format)?;
        Ok(PreparedSession {
            session: Box::new(StubbornSession {
                inner: prepared.session,
            }),
            info: prepared.info,
        })
    }
}
