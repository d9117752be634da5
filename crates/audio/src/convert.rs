//! Sample-Konvertierung zwischen Wire-Format und Pipeline-Format
//!
//! Auf dem Wire sind Samples 16-bit signed little-endian (mono); in der
//! Pipeline normalisierte `f32` in `[-1, 1]`.

/// Konvertiert rohe PCM-Bytes (i16 LE) in normalisierte f32-Samples
///
/// Ein einzelnes ueberzaehliges Byte am Ende wird ignoriert.
pub fn bytes_zu_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|paar| i16::from_le_bytes([paar[0], paar[1]]) as f32 / 32767.0)
        .collect()
}

/// Konvertiert normalisierte f32-Samples in rohe PCM-Bytes (i16 LE)
///
/// Samples ausserhalb `[-1, 1]` werden hart begrenzt.
pub fn samples_zu_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let wert = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        bytes.extend_from_slice(&wert.to_le_bytes());
    }
    bytes
}
