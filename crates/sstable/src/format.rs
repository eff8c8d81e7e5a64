use anyhow::{bail, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

/// Magic identifying an SSTable, stored in the final 4 bytes ("LSMT").
pub const SSTABLE_MAGIC: u32 = 0x4C53_4D54;

/// Footer size: index_offset (8) + index_count (4) + bloom_offset (8) +
/// bloom_size (4) + magic (4).
pub const FOOTER_BYTES: u64 = 28;

/// Parsed footer fields. Section boundaries are reconstructed from these
/// alone: the index spans `[index_offset, bloom_offset)` and the data
/// section is everything before `index_offset`.
#[derive(Debug, Clone, Copy)]
pub struct Footer {
    pub index_offset: u64,
    pub index_count: u32,
    pub bloom_offset: u64,
    pub bloom_size: u32,
}

/// Writes the footer, magic last.
pub fn write_footer<W: Write>(w: &mut W, footer: &Footer) -> std::io::Result<()> {
    w.write_u64::<LittleEndian>(footer.index_offset)?;
    w.write_u32::<LittleEndian>(footer.index_count)?;
    w.write_u64::<LittleEndian>(footer.bloom_offset)?;
    w.write_u32::<LittleEndian>(footer.bloom_size)?;
    w.write_u32::<LittleEndian>(SSTABLE_MAGIC)?;
    Ok(())
}

/// Reads and validates the footer from the tail of a file of `filesize`
/// bytes. The caller has already checked `filesize >= FOOTER_BYTES`.
pub fn read_footer<R: Read + Seek>(r: &mut R, filesize: u64) -> Result<Footer> {
    r.seek(SeekFrom::Start(filesize - FOOTER_BYTES))?;
    let index_offset = r.read_u64::<LittleEndian>()?;
    let index_count = r.read_u32::<LittleEndian>()?;
    let bloom_offset = r.read_u64::<LittleEndian>()?;
    let bloom_size = r.read_u32::<LittleEndian>()?;
    let magic = r.read_u32::<LittleEndian>()?;

    if magic != SSTABLE_MAGIC {
        bail!("sstable bad magic: {:#010x}", magic);
    }

    let footer_start = filesize - FOOTER_BYTES;
    if index_offset > bloom_offset
        || bloom_offset > footer_start
        || bloom_offset + bloom_size as u64 > footer_start
    {
        bail!(
            "sstable sections out of bounds: index at {}, bloom at {}+{}, footer at {}",
            index_offset,
            bloom_offset,
            bloom_size,
            footer_start
        );
    }

    Ok(Footer {
        index_offset,
        index_count,
        bloom_offset,
        bloom_size,
    })
}
