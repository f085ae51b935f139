//! Font metrics for centring text: base-14 width tables and embedded TTF/OTF faces.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CardError, Result};

pub const FIRST_CHAR: u8 = 32;
pub const LAST_CHAR: u8 = 255;
/// Entries in a `/Widths` array spanning `FIRST_CHAR..=LAST_CHAR`.
pub const WIDTH_SLOTS: usize = (LAST_CHAR - FIRST_CHAR) as usize + 1;

/// Font reference handed to [`Surface::centered_text`](super::Surface::centered_text).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FontHandle {
    Standard(StandardFont),
    /// Registered under this name via [`Surface::register_font`](super::Surface::register_font).
    Embedded(String),
}

/// Base-14 fonts used for card headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Advance width of `ch` in 1/1000 em, WinAnsi text characters only.
    pub fn width(self, ch: char) -> Option<u16> {
        let (ascii, latin1) = match self {
            StandardFont::Helvetica => (&HELVETICA_WIDTHS, &HELVETICA_LATIN1_WIDTHS),
            StandardFont::HelveticaBold => (&HELVETICA_BOLD_WIDTHS, &HELVETICA_BOLD_LATIN1_WIDTHS),
        };
        match winansi_code(ch)? {
            code @ 0x20..=0x7E => Some(ascii[usize::from(code - 0x20)]),
            code => Some(latin1[usize::from(code - 0xA0)]),
        }
    }

    pub fn text_width(self, text: &str, size: f32) -> Result<f32> {
        let mut units = 0u32;
        for ch in text.chars() {
            units += self.width(ch).ok_or_else(|| CardError::Unencodable {
                ch,
                font: self.base_name().to_string(),
            })? as u32;
        }
        Ok(units as f32 * size / 1000.0)
    }
}

/// WinAnsi byte for `ch`. Printable ASCII and 0xA0..=0xFF map straight from
/// Unicode; the 0x7F..=0x9F block is never drawn.
pub fn winansi_code(ch: char) -> Option<u8> {
    match u32::from(ch) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(code).ok(),
        _ => None,
    }
}

/// Encode `text` as single-byte WinAnsi codes.
pub fn encode_winansi(text: &str, font: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|ch| {
            winansi_code(ch).ok_or_else(|| CardError::Unencodable {
                ch,
                font: font.to_string(),
            })
        })
        .collect()
}

/// A TrueType or CFF-flavoured OpenType font to embed in the document.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    pub name: String,
    pub path: PathBuf,
    pub data: Vec<u8>,
    /// CFF outlines (`OTTO` signature) rather than `glyf`.
    pub cff: bool,
    pub monospaced: bool,
    /// Advance widths for codes `FIRST_CHAR..=LAST_CHAR` in 1/1000 em; `None` if
    /// the code is not drawn or the glyph is missing.
    pub widths: Vec<Option<u16>>,
    pub ascent: i32,
    pub descent: i32,
    pub cap_height: i32,
    pub bbox: [i32; 4],
}

impl EmbeddedFont {
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CardError::FontNotFound(path.to_path_buf())
            } else {
                CardError::io(path, source)
            }
        })?;
        Self::from_data(name, path, data)
    }

    pub fn from_data(name: &str, path: &Path, data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| CardError::Font {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let upem = f32::from(face.units_per_em().max(1));
        let scale = |v: i32| (v as f32 * 1000.0 / upem).round() as i32;

        let mut widths = Vec::with_capacity(WIDTH_SLOTS);
        for code in FIRST_CHAR..=LAST_CHAR {
            let advance = winansi_code(char::from(code))
                .and_then(|_| face.glyph_index(char::from(code)))
                .and_then(|gid| face.glyph_hor_advance(gid));
            let width = match advance {
                Some(adv) => Some(u16::try_from(scale(i32::from(adv))).map_err(|_| CardError::Font {
                    path: path.to_path_buf(),
                    message: format!("advance width of code {code} does not fit 1/1000 em units"),
                })?),
                None => None,
            };
            widths.push(width);
        }

        let bb = face.global_bounding_box();
        let ascent = scale(i32::from(face.ascender()));
        let cap_height = face
            .capital_height()
            .map(|h| scale(i32::from(h)))
            .unwrap_or(ascent);

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            cff: data.starts_with(b"OTTO"),
            monospaced: face.is_monospaced(),
            widths,
            ascent,
            descent: scale(i32::from(face.descender())),
            cap_height,
            bbox: [
                scale(i32::from(bb.x_min)),
                scale(i32::from(bb.y_min)),
                scale(i32::from(bb.x_max)),
                scale(i32::from(bb.y_max)),
            ],
            data,
        })
    }

    pub fn width(&self, ch: char) -> Option<u16> {
        let code = winansi_code(ch)?;
        self.widths
            .get(usize::from(code - FIRST_CHAR))
            .copied()
            .flatten()
    }

    pub fn text_width(&self, text: &str, size: f32) -> Result<f32> {
        let mut units = 0u32;
        for ch in text.chars() {
            units += self.width(ch).ok_or_else(|| CardError::Unencodable {
                ch,
                font: self.name.clone(),
            })? as u32;
        }
        Ok(units as f32 * size / 1000.0)
    }
}

// Adobe AFM advance widths, codes 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

// Codes 160..=255.
#[rustfmt::skip]
const HELVETICA_LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];
