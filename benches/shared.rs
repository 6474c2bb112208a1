use vgmdec::{Config, MemorySource, Stream};

pub const RATE: u32 = 44_100;
const SECONDS: u32 = 10;

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut c = id.to_vec();
    c.extend_from_slice(&(body.len() as u32).to_le_bytes());
    c.extend_from_slice(body);
    c
}

/// Ten seconds of a stereo 440 Hz tone as 16-bit WAV.
pub fn tone_wav() -> Vec<u8> {
    let mut data = Vec::new();
    for n in 0..RATE * SECONDS {
        let phase = n as f32 * 440.0 * std::f32::consts::TAU / RATE as f32;
        let s = (phase.sin() * 0.5 * i16::MAX as f32) as i16;
        data.extend_from_slice(&s.to_le_bytes());
        data.extend_from_slice(&s.to_le_bytes());
    }
    let mut fmt = Vec::new();
    fmt.extend_from_slice(&1u16.to_le_bytes());
    fmt.extend_from_slice(&2u16.to_le_bytes());
    fmt.extend_from_slice(&RATE.to_le_bytes());
    fmt.extend_from_slice(&(RATE * 4).to_le_bytes());
    fmt.extend_from_slice(&4u16.to_le_bytes());
    fmt.extend_from_slice(&16u16.to_le_bytes());

    let mut body = b"WAVE".to_vec();
    body.extend(chunk(b"fmt ", &fmt));
    body.extend(chunk(b"data", &data));
    let mut file = b"RIFF".to_vec();
    file.extend_from_slice(&(body.len() as u32).to_le_bytes());
    file.extend(body);
    file
}

/// Ten seconds of stereo ADX with noise nibbles, looping over its second half.
pub fn noise_adx() -> Vec<u8> {
    let frames = RATE * SECONDS;
    let mut h = vec![0u8; 0x40];
    h[0..2].copy_from_slice(&0x8000u16.to_be_bytes());
    h[2..4].copy_from_slice(&0x3cu16.to_be_bytes());
    h[4] = 3;
    h[5] = 18;
    h[6] = 4;
    h[7] = 2;
    h[8..12].copy_from_slice(&RATE.to_be_bytes());
    h[12..16].copy_from_slice(&frames.to_be_bytes());
    h[16..18].copy_from_slice(&500u16.to_be_bytes());
    h[18] = 3;
    h[0x18..0x1c].copy_from_slice(&1u32.to_be_bytes());
    h[0x1c..0x20].copy_from_slice(&(frames / 2).to_be_bytes());
    h[0x24..0x28].copy_from_slice(&frames.to_be_bytes());
    h[0x3a..].copy_from_slice(b"(c)CRI");

    let mut seed = 0x2545_f491u32;
    for _ in 0..frames.div_ceil(32) * 2 {
        h.extend_from_slice(&0x0200u16.to_be_bytes());
        for _ in 0..16 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            h.push(seed as u8);
        }
    }
    h
}

pub fn open(name: &str, bytes: Vec<u8>, config: &Config) -> Stream {
    Stream::open(MemorySource::new(name, bytes), 0, config)
        .expect("bench fixtures are well formed")
}
