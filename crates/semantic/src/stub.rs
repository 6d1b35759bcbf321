use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;

const STUB_WORDS: [&str; 16] = [
    "the", "quiet", "river", "runs", "past", "an", "old", "mill", "where", "children", "once",
    "played", "under", "bright", "summer", "skies",
];

/// Deterministic stand-in embedding for offline development.
///
/// Sinusoids seeded from a hash of the text, so equal text gives equal vectors.
pub(crate) fn make_stub_embedding(text: &str, dim: usize, normalize: bool) -> Vec<f32> {
    let h = hash64(text.as_bytes());
    let mut v: Vec<f32> = (0..dim)
        .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001 + idx as f32).sin())
        .collect();
    if normalize {
        l2_normalize_in_place(&mut v);
    }
    v
}

/// Deterministic stand-in inversion: a short sentence picked from the
/// embedding's bit pattern.
pub(crate) fn make_stub_sentence(embedding: &[f32]) -> String {
    let bytes: Vec<u8> = embedding.iter().flat_map(|x| x.to_le_bytes()).collect();
    let mut h = hash64(&bytes);
    let len = 5 + (h % 4) as usize;
    let mut words = Vec::with_capacity(len);
    for _ in 0..len {
        words.push(STUB_WORDS[(h & 0xF) as usize]);
        h = h.rotate_right(4);
    }
    let mut sentence = words.join(" ");
    if let Some(first) = sentence.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    sentence.push('.');
    sentence
}
