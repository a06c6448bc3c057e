//! Windows-1252 (ANSI) and code page 437 (OEM) conversion.
//!
//! The lower half of both code pages is ASCII and passes through. Upper-half
//! characters without a counterpart in the target code page become `?`, so
//! conversions never change the length.

use ek_core::ports::TextCodecPort;

const REPLACEMENT: u8 = b'?';

/// Code page 437, bytes 0x80..=0xFF.
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

/// Windows-1252, bytes 0x80..=0x9F. 0xA0..=0xFF match Latin-1.
const CP1252_C1: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
    Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
];

fn decode_1252(byte: u8) -> Option<char> {
    match byte {
        0x00..=0x7F | 0xA0..=0xFF => Some(char::from(byte)),
        _ => CP1252_C1[usize::from(byte - 0x80)],
    }
}

fn encode_1252(c: char) -> Option<u8> {
    match u32::from(c) {
        code @ (0x00..=0x7F | 0xA0..=0xFF) => u8::try_from(code).ok(),
        _ => CP1252_C1
            .iter()
            .position(|candidate| *candidate == Some(c))
            .and_then(|index| u8::try_from(0x80 + index).ok()),
    }
}

fn decode_437(byte: u8) -> char {
    if byte < 0x80 {
        char::from(byte)
    } else {
        CP437_HIGH[usize::from(byte - 0x80)]
    }
}

fn encode_437(c: char) -> Option<u8> {
    if c.is_ascii() {
        return u8::try_from(c).ok();
    }
    CP437_HIGH
        .iter()
        .position(|candidate| *candidate == c)
        .and_then(|index| u8::try_from(0x80 + index).ok())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CodePageCodec;

impl CodePageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl TextCodecPort for CodePageCodec {
    fn ansi_to_oem(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .map(|&byte| decode_1252(byte).and_then(encode_437).unwrap_or(REPLACEMENT))
            .collect()
    }

    fn oem_to_ansi(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .map(|&byte| encode_1252(decode_437(byte)).unwrap_or(REPLACEMENT))
            .collect()
    }
}
