#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use cardmaker::{ArtifactFormat, BarcodeRenderer, CardError, RenderOptions, Result, ToolPaths};

/// Writes a small Zint-looking SVG (or a real PNG) and records every call.
#[derive(Default)]
pub struct StubRenderer {
    pub calls: RefCell<Vec<(String, PathBuf, RenderOptions)>>,
    pub fail_with: Option<String>,
}

impl StubRenderer {
    pub fn failing(stderr: &str) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_with: Some(stderr.to_string()),
        }
    }

    pub fn data_seen(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(d, _, _)| d.clone()).collect()
    }
}

impl BarcodeRenderer for StubRenderer {
    fn name(&self) -> &str {
        "stub"
    }

    fn render(&self, data: &str, output: &Path, options: &RenderOptions) -> Result<()> {
        self.calls
            .borrow_mut()
            .push((data.to_string(), output.to_path_buf(), options.clone()));
        if let Some(stderr) = &self.fail_with {
            return Err(CardError::RendererFailed {
                data: data.to_string(),
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            });
        }
        match options.format {
            ArtifactFormat::Svg => fs::write(output, zint_style_svg(data)).map_err(|e| CardError::Io {
                path: output.to_path_buf(),
                source: e,
            }),
            ArtifactFormat::Png => {
                let scale = options.scale.unwrap_or(1.0).max(1.0) as u32;
                let img = image::GrayImage::from_pixel(20 * scale, 10 * scale, image::Luma([255u8]));
                img.save(output).map_err(|e| CardError::Artifact {
                    path: output.to_path_buf(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// One bar per input character on a white background.
pub fn zint_style_svg(data: &str) -> String {
    let width = data.len() * 4 + 4;
    let mut bars = String::new();
    for i in 0..data.len() {
        bars.push_str(&format!("M{} 0h2v20h-2Z", 2 + i * 4));
    }
    format!(
        r##"<?xml version="1.0" standalone="no"?>
<svg width="{width}" height="20" version="1.1" xmlns="http://www.w3.org/2000/svg">
 <desc>Zint Generated Symbol</desc>
 <g id="barcode" fill="#000000">
  <rect x="0" y="0" width="{width}" height="20" fill="#FFFFFF"/>
  <path d="{bars}"/>
 </g>
</svg>
"##
    )
}

/// Minimal TrueType face: two glyphs, every printable ASCII code mapped to
/// glyph 1 with a 600/1000 em advance.
pub fn fixed_pitch_font() -> Vec<u8> {
    font_with_metrics(1000, 600)
}

/// Same face with a chosen units-per-em and glyph advance.
pub fn font_with_metrics(units_per_em: u16, advance: u16) -> Vec<u8> {
    fn be16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_be_bytes());
    }
    fn be32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    let mut cmap = Vec::new();
    be16(&mut cmap, 0); // version
    be16(&mut cmap, 1); // subtables
    be16(&mut cmap, 3); // Windows
    be16(&mut cmap, 1); // Unicode BMP
    be32(&mut cmap, 12);
    be16(&mut cmap, 6); // trimmed table mapping
    be16(&mut cmap, 10 + 95 * 2);
    be16(&mut cmap, 0);
    be16(&mut cmap, 32);
    be16(&mut cmap, 95);
    for _ in 0..95 {
        be16(&mut cmap, 1);
    }

    let mut head = Vec::new();
    be32(&mut head, 0x0001_0000);
    be32(&mut head, 0x0001_0000);
    be32(&mut head, 0);
    be32(&mut head, 0x5F0F_3CF5);
    be16(&mut head, 0);
    be16(&mut head, units_per_em);
    head.extend_from_slice(&[0; 16]); // created, modified
    for v in [0i16, -200, 600, 800] {
        be16(&mut head, v as u16);
    }
    be16(&mut head, 0); // mac style
    be16(&mut head, 8);
    be16(&mut head, 2);
    be16(&mut head, 0); // short loca
    be16(&mut head, 0);

    let mut hhea = Vec::new();
    be32(&mut hhea, 0x0001_0000);
    be16(&mut hhea, 800);
    be16(&mut hhea, (-200i16) as u16);
    be16(&mut hhea, 0);
    be16(&mut hhea, advance);
    hhea.extend_from_slice(&[0; 20]);
    be16(&mut hhea, 0); // metric data format
    be16(&mut hhea, 2); // h-metrics

    let mut hmtx = Vec::new();
    for _ in 0..2 {
        be16(&mut hmtx, advance);
        be16(&mut hmtx, 0);
    }

    let mut maxp = Vec::new();
    be32(&mut maxp, 0x0000_5000);
    be16(&mut maxp, 2);

    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"maxp", maxp),
    ];

    let mut out = Vec::new();
    be32(&mut out, 0x0001_0000);
    be16(&mut out, tables.len() as u16);
    be16(&mut out, 64);
    be16(&mut out, 2);
    be16(&mut out, 16);

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        out.extend_from_slice(*tag);
        be32(&mut out, 0);
        be32(&mut out, offset as u32);
        be32(&mut out, data.len() as u32);
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    out.extend_from_slice(&body);
    out
}

/// Temp workspace with a font on disk and paths pointing into it.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub paths: ToolPaths,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("assets/fonts/OCR-B.ttf");
        fs::create_dir_all(font.parent().unwrap()).unwrap();
        fs::write(&font, fixed_pitch_font()).unwrap();
        let paths = ToolPaths {
            font,
            output_dir: dir.path().join("out"),
            cache_dir: dir.path().join(".gen_barcodes"),
        };
        Self { dir, paths }
    }

    pub fn cache_entries(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.paths.cache_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
