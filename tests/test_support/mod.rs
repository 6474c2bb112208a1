#![allow(dead_code)]
// Lives in a folder so cargo does not run it as a test of its own.
// Builds the small files the integration tests decode, in memory, so the
// tests need no assets.
use vgmdec::{Config, MemorySource, Stream};

/// 16-bit samples where every sample holds its frame index plus its channel
/// times 1000, so rendered output shows exactly which frame was played.
pub fn ramp(frames: usize, channels: u16) -> Vec<i16> {
    (0..frames)
        .flat_map(|f| (0..channels).map(move |c| (f as i32 + c as i32 * 1000) as i16))
        .collect()
}

pub fn i16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut c = id.to_vec();
    c.extend_from_slice(&(body.len() as u32).to_le_bytes());
    c.extend_from_slice(body);
    if body.len() % 2 == 1 {
        c.push(0);
    }
    c
}

#[derive(Debug, Clone)]
pub struct WavBuilder {
    tag: u16,
    channels: u16,
    sample_rate: u32,
    bits: u16,
    block_align: u16,
    data: Vec<u8>,
    fact: Option<u32>,
    /// start, inclusive end, play count
    smpl: Option<(u32, u32, u32)>,
    name: Option<String>,
    streamed: bool,
}

impl WavBuilder {
    pub fn pcm16(channels: u16, sample_rate: u32, samples: &[i16]) -> Self {
        Self {
            tag: 1,
            channels,
            sample_rate,
            bits: 16,
            block_align: channels * 2,
            data: i16_bytes(samples),
            fact: None,
            smpl: None,
            name: None,
            streamed: false,
        }
    }

    pub fn float(channels: u16, sample_rate: u32, samples: &[f32]) -> Self {
        Self {
            tag: 3,
            bits: 32,
            block_align: channels * 4,
            data: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
            ..Self::pcm16(channels, sample_rate, &[])
        }
    }

    /// IMA ADPCM blocks of `block_align` bytes, silent except for the predictor.
    pub fn ima(channels: u16, sample_rate: u32, block_align: u16, blocks: usize) -> Self {
        let mut data = Vec::new();
        for b in 0..blocks {
            let mut block = vec![0u8; block_align as usize];
            for c in 0..channels as usize {
                let predictor = (b as i16) * 100 + c as i16;
                block[c * 4..c * 4 + 2].copy_from_slice(&predictor.to_le_bytes());
            }
            data.extend(block);
        }
        Self {
            tag: 0x11,
            bits: 4,
            block_align,
            data,
            ..Self::pcm16(channels, sample_rate, &[])
        }
    }

    pub fn with_fact(mut self, frames: u32) -> Self {
        self.fact = Some(frames);
        self
    }

    /// Sampler loop over `[start, end)` frames.
    pub fn with_loop(mut self, start: u32, end: u32, play_count: u32) -> Self {
        self.smpl = Some((start, end - 1, play_count));
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Writes `0xFFFFFFFF` sizes, as a writer that cannot seek back does.
    pub fn streamed(mut self) -> Self {
        self.streamed = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut fmt = Vec::new();
        fmt.extend_from_slice(&self.tag.to_le_bytes());
        fmt.extend_from_slice(&self.channels.to_le_bytes());
        fmt.extend_from_slice(&self.sample_rate.to_le_bytes());
        fmt.extend_from_slice(&(self.sample_rate * self.block_align as u32).to_le_bytes());
        fmt.extend_from_slice(&self.block_align.to_le_bytes());
        fmt.extend_from_slice(&self.bits.to_le_bytes());

        let mut body = b"WAVE".to_vec();
        body.extend(chunk(b"fmt ", &fmt));
        if let Some(frames) = self.fact {
            body.extend(chunk(b"fact", &frames.to_le_bytes()));
        }
        if let Some((start, end, play_count)) = self.smpl {
            let mut smpl = vec![0u8; 36];
            smpl[28..32].copy_from_slice(&1u32.to_le_bytes());
            let mut record = vec![0u8; 24];
            record[8..12].copy_from_slice(&start.to_le_bytes());
            record[12..16].copy_from_slice(&end.to_le_bytes());
            record[20..24].copy_from_slice(&play_count.to_le_bytes());
            smpl.extend(record);
            body.extend(chunk(b"smpl", &smpl));
        }
        if let Some(name) = &self.name {
            let mut info = b"INFO".to_vec();
            let mut text = name.as_bytes().to_vec();
            text.push(0);
            info.extend(chunk(b"INAM", &text));
            body.extend(chunk(b"LIST", &info));
        }
        let mut data = chunk(b"data", &self.data);
        if self.streamed {
            data[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        }
        body.extend(data);

        let mut file = b"RIFF".to_vec();
        let riff_size = if self.streamed {
            u32::MAX
        } else {
            body.len() as u32
        };
        file.extend_from_slice(&riff_size.to_le_bytes());
        file.extend(body);
        file
    }
}

const ADX_DATA_OFFSET: usize = 0x40;
const ADX_FRAME_SIZE: usize = 18;

/// A type 3, version 3 ADX stream with pseudo-random nibbles.
pub fn adx(channels: u8, sample_rate: u32, frames: u32, loop_points: Option<(u32, u32)>) -> Vec<u8> {
    let mut h = vec![0u8; ADX_DATA_OFFSET];
    h[0..2].copy_from_slice(&0x8000u16.to_be_bytes());
    h[2..4].copy_from_slice(&((ADX_DATA_OFFSET - 4) as u16).to_be_bytes());
    h[4] = 3;
    h[5] = ADX_FRAME_SIZE as u8;
    h[6] = 4;
    h[7] = channels;
    h[8..12].copy_from_slice(&sample_rate.to_be_bytes());
    h[12..16].copy_from_slice(&frames.to_be_bytes());
    h[16..18].copy_from_slice(&500u16.to_be_bytes());
    h[18] = 3;
    if let Some((start, end)) = loop_points {
        h[0x16..0x18].copy_from_slice(&1u16.to_be_bytes());
        h[0x18..0x1c].copy_from_slice(&1u32.to_be_bytes());
        h[0x1c..0x20].copy_from_slice(&start.to_be_bytes());
        h[0x24..0x28].copy_from_slice(&end.to_be_bytes());
    }
    h[ADX_DATA_OFFSET - 6..].copy_from_slice(b"(c)CRI");

    let mut seed = 0x1234_5678u32;
    let blocks = (frames as usize).div_ceil(32);
    for _ in 0..blocks * channels as usize {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let scale = 0x0100 + (seed >> 24) as u16;
        h.extend_from_slice(&scale.to_be_bytes());
        for _ in 0..ADX_FRAME_SIZE - 2 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            h.push((seed >> 16) as u8);
        }
    }
    h
}

/// An AFS archive holding `entries`, with a name table.
pub fn afs(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let count = entries.len();
    let header = 8 + count * 8 + 8;
    let mut offsets = Vec::new();
    let mut pos = header.next_multiple_of(0x10);
    for (_, data) in entries {
        offsets.push(pos);
        pos = (pos + data.len()).next_multiple_of(0x10);
    }
    let names_offset = pos;

    let mut file = vec![0u8; names_offset + count * 0x30];
    file[0..4].copy_from_slice(b"AFS\0");
    file[4..8].copy_from_slice(&(count as u32).to_le_bytes());
    for (i, ((name, data), offset)) in entries.iter().zip(&offsets).enumerate() {
        let entry = 8 + i * 8;
        file[entry..entry + 4].copy_from_slice(&(*offset as u32).to_le_bytes());
        file[entry + 4..entry + 8].copy_from_slice(&(data.len() as u32).to_le_bytes());
        file[*offset..*offset + data.len()].copy_from_slice(data);
        let record = names_offset + i * 0x30;
        file[record..record + name.len()].copy_from_slice(name.as_bytes());
    }
    let pointer = 8 + count * 8;
    file[pointer..pointer + 4].copy_from_slice(&(names_offset as u32).to_le_bytes());
    file[pointer + 4..pointer + 8].copy_from_slice(&((count * 0x30) as u32).to_le_bytes());
    file
}

pub fn memory(name: &str, bytes: Vec<u8>) -> MemorySource {
    MemorySource::new(name, bytes)
}

pub fn open(name: &str, bytes: Vec<u8>, config: &Config) -> Stream {
    Stream::open(memory(name, bytes), 0, config).unwrap()
}

/// Renders the whole stream as bytes.
pub fn render_all(stream: &mut Stream) -> Vec<u8> {
    let mut out = Vec::new();
    while !stream.done() {
        let batch = stream.render().unwrap();
        assert!(!batch.is_empty(), "render stalled before the end");
        out.extend_from_slice(batch);
    }
    out
}

/// Renders the whole stream as normalized samples.
pub fn render_all_samples(stream: &mut Stream) -> Vec<f32> {
    let mut out = Vec::new();
    while !stream.done() {
        out.extend_from_slice(stream.render_samples().unwrap());
    }
    out
}

pub fn no_fade(loop_count: f64) -> Config {
    Config {
        loop_count,
        ignore_fade: true,
        ..Config::default()
    }
}
