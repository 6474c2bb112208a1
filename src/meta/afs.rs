//! CRI AFS archives. Every entry is an ADX stream and counts as one subsong.

use crate::error::{Error, Result};
use crate::io::{ByteSource, ByteSourceExt, SubSource};

use super::{adx, select_subsong, Probed};

const FORMAT: &str = "CRI AFS";
const NAME_RECORD_SIZE: u64 = 0x30;
const NAME_SIZE: usize = 32;

pub(crate) fn sniff(src: &mut dyn ByteSource) -> bool {
    src.has_id(0, b"AFS\0")
}

/// Decodes a fixed-size, NUL padded name field.
fn fixed_name(field: &[u8; NAME_SIZE]) -> Option<String> {
    let len = field.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
    let name = String::from_utf8_lossy(&field[..len]).trim().to_owned();
    (!name.is_empty()).then_some(name)
}

fn entry_name(src: &mut dyn ByteSource, count: u64, index: u64) -> Result<Option<String>> {
    let pointer = 8 + count * 8;
    if pointer + 8 > src.size() {
        return Ok(None);
    }
    let table = src.read_u32_le(pointer)? as u64;
    if table == 0 || table + count * NAME_RECORD_SIZE > src.size() {
        return Ok(None);
    }
    let mut field = [0u8; NAME_SIZE];
    src.read_at(table + index * NAME_RECORD_SIZE, &mut field)?;
    Ok(fixed_name(&field))
}

pub(crate) fn parse(src: &mut dyn ByteSource, subsong: u32) -> Result<Probed> {
    let count = src.read_u32_le(4)?;
    if count == 0 || 8 + count as u64 * 8 > src.size() {
        return Err(Error::corrupt(FORMAT, format!("bad entry count {count}")));
    }
    let subsong_index = select_subsong(subsong, count)?;
    let index = subsong_index as u64 - 1;

    let offset = src.read_u32_le(8 + index * 8)? as u64;
    let size = src.read_u32_le(12 + index * 8)? as u64;
    if size == 0 || offset + size > src.size() {
        return Err(Error::corrupt(
            FORMAT,
            format!("entry {subsong_index} at {offset:#x}+{size:#x} is outside the archive"),
        ));
    }
    let stream_name = entry_name(src, count as u64, index)?;

    let name = format!("{}#{subsong_index}", src.name());
    let mut member = SubSource::new(&mut *src, offset, size, name)?;
    if !adx::sniff(&mut member) {
        return Err(Error::corrupt(
            FORMAT,
            format!("entry {subsong_index} is not an ADX stream"),
        ));
    }
    let mut probed = adx::parse(&mut member, 0)?;
    probed.info.subsong_index = subsong_index;
    probed.info.subsong_count = count;
    probed.info.meta_name = "CRI AFS archive";
    probed.info.stream_name = stream_name;
    probed.window = Some((offset, size));
    Ok(probed)
}
