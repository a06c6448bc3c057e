//! Clipboard format records and the format registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::GlobalHandle;

pub type FormatId = u16;

pub const CF_TEXT: FormatId = 1;
pub const CF_BITMAP: FormatId = 2;
pub const CF_METAFILEPICT: FormatId = 3;
pub const CF_SYLK: FormatId = 4;
pub const CF_DIF: FormatId = 5;
pub const CF_TIFF: FormatId = 6;
pub const CF_OEMTEXT: FormatId = 7;
pub const CF_DIB: FormatId = 8;
pub const CF_PALETTE: FormatId = 9;
pub const CF_PENDATA: FormatId = 10;
pub const CF_RIFF: FormatId = 11;
pub const CF_WAVE: FormatId = 12;
pub const CF_OWNERDISPLAY: FormatId = 0x0080;
pub const CF_DSPTEXT: FormatId = 0x0081;
pub const CF_DSPBITMAP: FormatId = 0x0082;
pub const CF_DSPMETAFILEPICT: FormatId = 0x0083;
pub const CF_GDIOBJFIRST: FormatId = 0x0300;
pub const CF_GDIOBJLAST: FormatId = 0x03FF;
/// First id handed out by [`FormatRegistry::register`].
pub const CF_REGFORMATBASE: FormatId = 0xC000;

/// Built-in formats in enumeration order.
const BUILTIN_FORMATS: [(FormatId, &str); 16] = [
    (CF_TEXT, "Text"),
    (CF_BITMAP, "Bitmap"),
    (CF_METAFILEPICT, "MetaFile Picture"),
    (CF_SYLK, "Sylk"),
    (CF_DIF, "DIF"),
    (CF_TIFF, "TIFF"),
    (CF_OEMTEXT, "OEM Text"),
    (CF_DIB, "DIB"),
    (CF_PALETTE, "Palette"),
    (CF_PENDATA, "PenData"),
    (CF_RIFF, "RIFF"),
    (CF_WAVE, "Wave"),
    (CF_OWNERDISPLAY, "Owner Display"),
    (CF_DSPTEXT, "DSPText"),
    (CF_DSPMETAFILEPICT, "DSPMetaFile Picture"),
    (CF_DSPBITMAP, "DSPBitmap"),
];

pub fn is_text_format(id: FormatId) -> bool {
    id == CF_TEXT || id == CF_OEMTEXT
}

/// The other text variant, `None` for non-text formats.
pub fn text_sibling(id: FormatId) -> Option<FormatId> {
    match id {
        CF_TEXT => Some(CF_OEMTEXT),
        CF_OEMTEXT => Some(CF_TEXT),
        _ => None,
    }
}

pub fn is_gdi_format(id: FormatId) -> bool {
    (CF_GDIOBJFIRST..=CF_GDIOBJLAST).contains(&id)
}

/// Display label of a built-in format.
pub fn builtin_label(id: FormatId) -> Option<&'static str> {
    BUILTIN_FORMATS
        .iter()
        .find(|(builtin, _)| *builtin == id)
        .map(|(_, label)| *label)
}

/// One clipboard format and its data.
///
/// `data_present` without `data` is a promise: the owner renders the data
/// when somebody asks for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipFormat {
    pub id: FormatId,
    pub ref_count: u16,
    pub data_present: bool,
    pub data: Option<GlobalHandle>,
    /// Set for registered formats only.
    pub name: Option<String>,
}

impl ClipFormat {
    fn builtin(id: FormatId) -> Self {
        Self {
            id,
            ref_count: 1,
            data_present: false,
            data: None,
            name: None,
        }
    }

    pub fn is_promise(&self) -> bool {
        self.data_present && self.data.is_none()
    }

    /// Holds something `empty` has to clear.
    pub fn is_occupied(&self) -> bool {
        self.data_present || self.data.is_some()
    }
}

/// Ordered format records with constant-time lookup by id.
///
/// Records are never removed, so indices stay valid and enumeration follows
/// insertion order: built-ins first, then registered formats.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    records: Vec<ClipFormat>,
    index: HashMap<FormatId, usize>,
    next_registered: Option<FormatId>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            records: Vec::with_capacity(BUILTIN_FORMATS.len()),
            index: HashMap::new(),
            next_registered: Some(CF_REGFORMATBASE),
        };
        for (id, _) in BUILTIN_FORMATS {
            registry.push(ClipFormat::builtin(id));
        }
        registry
    }

    fn push(&mut self, record: ClipFormat) {
        self.index.insert(record.id, self.records.len());
        self.records.push(record);
    }

    /// Register a named format, or take another reference on an existing
    /// registration. Returns 0 for an empty name or when ids run out.
    pub fn register(&mut self, name: &str) -> FormatId {
        if name.is_empty() {
            return 0;
        }
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|record| record.name.as_deref() == Some(name))
        {
            existing.ref_count = existing.ref_count.saturating_add(1);
            return existing.id;
        }

        let Some(id) = self.next_registered else {
            tracing::warn!(name, "registered clipboard format ids exhausted");
            return 0;
        };
        self.next_registered = id.checked_add(1);
        self.push(ClipFormat {
            id,
            ref_count: 1,
            data_present: false,
            data: None,
            name: Some(name.to_string()),
        });
        tracing::debug!(name, id = format_args!("{id:#06x}"), "registered clipboard format");
        id
    }

    /// Record for a private GDI object format, created on first use.
    /// Returns `false` for ids outside the GDI range.
    pub fn ensure_gdi(&mut self, id: FormatId) -> bool {
        if !is_gdi_format(id) {
            return false;
        }
        if !self.index.contains_key(&id) {
            self.push(ClipFormat::builtin(id));
        }
        true
    }

    pub fn get(&self, id: FormatId) -> Option<&ClipFormat> {
        self.index.get(&id).map(|&position| &self.records[position])
    }

    pub fn get_mut(&mut self, id: FormatId) -> Option<&mut ClipFormat> {
        let position = *self.index.get(&id)?;
        self.records.get_mut(position)
    }

    pub fn position(&self, id: FormatId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn is_present(&self, id: FormatId) -> bool {
        self.get(id).is_some_and(|record| record.data_present)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClipFormat> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClipFormat> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered name of `id`. Built-in formats have none.
    pub fn name(&self, id: FormatId) -> Option<&str> {
        self.get(id)
            .filter(|record| record.id >= CF_REGFORMATBASE)
            .and_then(|record| record.name.as_deref())
    }
}
