// ABOUTME: Lists entry names of zip/jar archives by reading the central directory.
// ABOUTME: Only names are read; entry data is never decompressed.

use bytes::Buf;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const EOCD_MIN_LEN: usize = 22;
const CENTRAL_HEADER_LEN: usize = 46;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

/// Reason an archive could not be listed.
pub type ArchiveFault = &'static str;

/// Entry names in central directory order.
pub fn list_entries(data: &[u8]) -> Result<Vec<String>, ArchiveFault> {
    let eocd = find_end_of_central_directory(data).ok_or("missing end of central directory")?;

    let mut record = &data[eocd + 4..];
    if record.remaining() < EOCD_MIN_LEN - 4 {
        return Err("truncated end of central directory");
    }
    record.advance(6); // disk numbers, entries on this disk
    let total_entries = record.get_u16_le() as usize;
    let directory_size = record.get_u32_le() as usize;
    let directory_offset = record.get_u32_le() as usize;

    if directory_offset == u32::MAX as usize || total_entries == u16::MAX as usize {
        return Err("zip64 archives are not supported");
    }
    let end = directory_offset
        .checked_add(directory_size)
        .filter(|end| *end <= eocd)
        .ok_or("central directory out of bounds")?;

    let mut directory = &data[directory_offset..end];
    let mut names = Vec::with_capacity(total_entries);
    for _ in 0..total_entries {
        if directory.remaining() < CENTRAL_HEADER_LEN {
            return Err("truncated central directory entry");
        }
        if directory.get_u32_le() != CENTRAL_HEADER_SIGNATURE {
            return Err("bad central directory signature");
        }
        directory.advance(24); // versions, flags, method, times, crc, sizes
        let name_len = directory.get_u16_le() as usize;
        let extra_len = directory.get_u16_le() as usize;
        let comment_len = directory.get_u16_le() as usize;
        directory.advance(12); // disk start, attributes, local header offset

        if directory.remaining() < name_len + extra_len + comment_len {
            return Err("truncated central directory entry");
        }
        names.push(String::from_utf8_lossy(&directory[..name_len]).into_owned());
        directory.advance(name_len + extra_len + comment_len);
    }
    Ok(names)
}

fn find_end_of_central_directory(data: &[u8]) -> Option<usize> {
    if data.len() < EOCD_MIN_LEN {
        return None;
    }
    let last = data.len() - EOCD_MIN_LEN;
    let first = last.saturating_sub(MAX_COMMENT_LEN);
    (first..=last)
        .rev()
        .find(|&i| (&data[i..i + 4]).get_u32_le() == EOCD_SIGNATURE)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bytes::BufMut;

    /// Build a stored (uncompressed) zip containing empty files with the given names.
    pub(crate) fn zip_with(names: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::new();
        for name in names {
            offsets.push(out.len() as u32);
            out.put_u32_le(0x0403_4b50);
            out.put_u16_le(20);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u16_le(name.len() as u16);
            out.put_u16_le(0);
            out.put_slice(name.as_bytes());
        }
        let directory_offset = out.len() as u32;
        for (name, offset) in names.iter().zip(&offsets) {
            out.put_u32_le(CENTRAL_HEADER_SIGNATURE);
            out.put_u16_le(20);
            out.put_u16_le(20);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u32_le(0);
            out.put_u16_le(name.len() as u16);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u16_le(0);
            out.put_u32_le(0);
            out.put_u32_le(*offset);
            out.put_slice(name.as_bytes());
        }
        let directory_size = out.len() as u32 - directory_offset;
        out.put_u32_le(EOCD_SIGNATURE);
        out.put_u16_le(0);
        out.put_u16_le(0);
        out.put_u16_le(names.len() as u16);
        out.put_u16_le(names.len() as u16);
        out.put_u32_le(directory_size);
        out.put_u32_le(directory_offset);
        out.put_u16_le(0);
        out
    }

    #[test]
    fn lists_entries_in_order() {
        let data = zip_with(&["META-INF/MANIFEST.MF", "src/main/docker/Dockerfile"]);
        assert_eq!(
            list_entries(&data).unwrap(),
            vec!["META-INF/MANIFEST.MF", "src/main/docker/Dockerfile"]
        );
    }

    #[test]
    fn empty_archive_has_no_entries() {
        assert!(list_entries(&zip_with(&[])).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_archives() {
        assert!(list_entries(b"definitely not a zip file at all").is_err());
        assert!(list_entries(b"").is_err());
    }

    #[test]
    fn rejects_truncated_directory() {
        let mut data = zip_with(&["a.txt"]);
        // Point the directory past the end record.
        let len = data.len();
        data[len - 6..len - 2].copy_from_slice(&(len as u32).to_le_bytes());
        assert!(list_entries(&data).is_err());
    }
}
