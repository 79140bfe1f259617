//! WAV body checks for synthesized audio.
//!
//! Pure functions — no I/O, no async runtime.

/// Size written by streaming encoders that don't know the final length.
const SIZE_SENTINEL: u32 = 0xFFFF_FFFF;

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

fn write_u32(buf: &mut [u8], pos: usize, value: u32) {
    buf[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
}

/// Check that `wav` is a RIFF/WAVE body with a `data` chunk, and patch the
/// RIFF and `data` sizes when a streaming encoder left them unknown or
/// overstated. Browsers refuse to decode clips with such sizes.
pub fn normalize_wav(mut wav: Vec<u8>) -> Result<Vec<u8>, &'static str> {
    if wav.len() < 12 || &wav[0..4] != b"RIFF" || &wav[8..12] != b"WAVE" {
        return Err("not a RIFF/WAVE body");
    }

    let riff_size = (wav.len() - 8) as u32;
    if read_u32(&wav, 4) != riff_size {
        write_u32(&mut wav, 4, riff_size);
    }

    let mut pos = 12;
    while pos + 8 <= wav.len() {
        let size = read_u32(&wav, pos + 4);

        if &wav[pos..pos + 4] == b"data" {
            let actual = (wav.len() - pos - 8) as u32;
            if size == SIZE_SENTINEL || size > actual {
                write_u32(&mut wav, pos + 4, actual);
            }
            return Ok(wav);
        }

        if size == SIZE_SENTINEL {
            return Err("chunk of unknown size before data");
        }
        // Chunks are padded to an even length.
        pos += 8 + size as usize + (size as usize & 1);
    }

    Err("data chunk not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit mono PCM WAV with `n` zero samples.
    fn wav(n: usize) -> Vec<u8> {
        let data_len = (n * 2) as u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_len).to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&48_000u32.to_le_bytes());
        buf.extend_from_slice(&96_000u32.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());
        buf.resize(44 + n * 2, 0);
        buf
    }

    #[test]
    fn well_formed_body_unchanged() {
        let original = wav(100);
        assert_eq!(normalize_wav(original.clone()).unwrap(), original);
    }

    #[test]
    fn patches_sentinel_sizes() {
        let mut streamed = wav(100);
        streamed[4..8].copy_from_slice(&SIZE_SENTINEL.to_le_bytes());
        streamed[40..44].copy_from_slice(&SIZE_SENTINEL.to_le_bytes());

        let fixed = normalize_wav(streamed).unwrap();
        assert_eq!(fixed, wav(100));
    }

    #[test]
    fn rejects_non_wav() {
        assert!(normalize_wav(b"ID3\x04 not audio".to_vec()).is_err());
        assert!(normalize_wav(Vec::new()).is_err());
    }

    #[test]
    fn rejects_missing_data_chunk() {
        let mut header_only = wav(0);
        header_only.truncate(36);
        assert_eq!(normalize_wav(header_only), Err("data chunk not found"));
    }
}
