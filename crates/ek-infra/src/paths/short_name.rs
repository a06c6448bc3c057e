//! 8.3 short names.
//!
//! Names that already fit the 8.3 pattern are only upper-cased. Longer
//! names are shortened to up to four characters of the base name, a `~`,
//! three hash characters and the first three characters of the extension.
//! The hash is computed on the lower-cased name, so every spelling of a
//! name maps to the same short name.

const HASH_CHARS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn is_dos_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'()-@^_`{}~".contains(c)
}

fn dos_chars(part: &str) -> impl Iterator<Item = char> + '_ {
    part.chars()
        .filter(|c| is_dos_char(*c))
        .map(|c| c.to_ascii_uppercase())
}

/// Whether `name` is a valid 8.3 name in any letter case.
pub fn is_short_name(name: &str) -> bool {
    let (base, ext) = match name.split_once('.') {
        Some((base, ext)) => (base, Some(ext)),
        None => (name, None),
    };
    let base_ok = (1..=8).contains(&base.len()) && base.chars().all(is_dos_char);
    let ext_ok = ext.map_or(true, |ext| ext.len() <= 3 && ext.chars().all(is_dos_char));
    base_ok && ext_ok
}

/// DOS spelling of a single native path component.
pub fn short_name(name: &str) -> String {
    if is_short_name(name) {
        return name.to_ascii_uppercase();
    }

    let (base, ext) = match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base, ext),
        _ => (name, ""),
    };
    let hash = name
        .chars()
        .flat_map(char::to_lowercase)
        .fold(0u32, |hash, c| (hash << 3) ^ (hash >> 5) ^ u32::from(c));

    let mut short: String = dos_chars(base).take(4).collect();
    if short.is_empty() {
        short.push('_');
    }
    short.push('~');
    for shift in [10, 5, 0] {
        short.push(char::from(HASH_CHARS[((hash >> shift) % 36) as usize]));
    }

    let ext: String = dos_chars(ext).take(3).collect();
    if !ext.is_empty() {
        short.push('.');
        short.push_str(&ext);
    }
    short
}
