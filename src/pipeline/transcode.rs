//! Lossy WinAnsi transcoding and Helvetica metrics for the PDF export.
//!
//! The export uses the standard (non-embedded) Helvetica font with
//! `WinAnsiEncoding`, which every PDF reader ships. That keeps the output
//! small and deterministic but limits it to the CP-1252 repertoire. Anything
//! outside it becomes exactly one [`PLACEHOLDER`] byte: the report is never
//! rejected because the model answered with a CJK party name or an emoji.

/// Byte emitted for characters WinAnsi cannot represent.
pub const PLACEHOLDER: u8 = b'?';

/// Map one character to its WinAnsi byte, if it has one.
///
/// Tabs become spaces. Other control characters have no glyph and map to
/// `None`, like any character outside the encoding.
pub fn encode_char(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x09 => Some(b' '),
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => cp1252_special(c),
    }
}

/// Transcode text into WinAnsi bytes, one byte per character.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| encode_char(c).unwrap_or(PLACEHOLDER))
        .collect()
}

/// The CP-1252 characters living in `0x80..=0x9F`.
fn cp1252_special(c: char) -> Option<u8> {
    let b = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(b)
}

/// Helvetica advance widths per WinAnsi byte, in 1/1000 em (from the AFM).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 256] = [
    278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278,
    278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278, 278,
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 350,
    556, 350, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350,
    350, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 350, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// Width of one encoded byte in 1/1000 em.
pub fn glyph_width(b: u8) -> u32 {
    u32::from(HELVETICA_WIDTHS[usize::from(b)])
}

/// Width of an encoded string in 1/1000 em.
pub fn text_width(bytes: &[u8]) -> u32 {
    bytes.iter().map(|&b| glyph_width(b)).sum()
}
