//! Single-page PDF surface built directly on `lopdf` objects.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

use super::Surface;
use super::fonts::{self, EmbeddedFont, FontHandle, StandardFont};
use super::graphic::{Segment, VectorGraphic};
use crate::error::{CardError, Result};
use crate::geometry::PageSize;

/// Control-point distance for a quarter circle drawn with one cubic.
const KAPPA: f32 = 0.552_284_8;
const PRODUCER: &str = concat!("cardmaker ", env!("CARGO_PKG_VERSION"));

/// Accumulates one page of drawing and writes it out on [`PdfSurface::save`].
pub struct PdfSurface {
    page: PageSize,
    ops: Vec<Operation>,
    line_width: Option<f32>,
    standard: Vec<StandardFont>,
    embedded: Vec<EmbeddedFont>,
    graphics: Vec<(PathBuf, VectorGraphic)>,
    title: Option<String>,
}

impl PdfSurface {
    pub fn new(page: PageSize) -> Self {
        Self {
            page,
            ops: Vec::new(),
            line_width: None,
            standard: Vec::new(),
            embedded: Vec::new(),
            graphics: Vec::new(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn page_size(&self) -> PageSize {
        self.page
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// Number of distinct vector artifacts placed so far.
    pub fn graphic_count(&self) -> usize {
        self.graphics.len()
    }

    pub fn embedded_fonts(&self) -> &[EmbeddedFont] {
        &self.embedded
    }

    /// Add an already-parsed font. Idempotent by name.
    pub fn add_font(&mut self, font: EmbeddedFont) -> FontHandle {
        let handle = FontHandle::Embedded(font.name.clone());
        if !self.embedded.iter().any(|f| f.name == font.name) {
            self.embedded.push(font);
        }
        handle
    }

    /// Width of `text` in a font this surface can draw, without emitting anything.
    pub fn measure(&self, font: &FontHandle, text: &str, size: f32) -> Result<f32> {
        match font {
            FontHandle::Standard(std_font) => std_font.text_width(text, size),
            FontHandle::Embedded(name) => self
                .embedded
                .iter()
                .find(|f| &f.name == name)
                .ok_or_else(|| CardError::UnknownFont(name.clone()))?
                .text_width(text, size),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn font_resource(&mut self, font: &FontHandle) -> Result<(String, FontMetrics<'_>)> {
        match font {
            FontHandle::Standard(std_font) => {
                if !self.standard.contains(std_font) {
                    self.standard.push(*std_font);
                }
                Ok((standard_resource(*std_font).to_string(), FontMetrics::Standard(*std_font)))
            }
            FontHandle::Embedded(name) => {
                let idx = self
                    .embedded
                    .iter()
                    .position(|f| &f.name == name)
                    .ok_or_else(|| CardError::UnknownFont(name.clone()))?;
                Ok((format!("E{}", idx + 1), FontMetrics::Embedded(&self.embedded[idx])))
            }
        }
    }

    fn graphic_index(&mut self, artifact: &Path) -> Result<usize> {
        if let Some(idx) = self.graphics.iter().position(|(p, _)| p == artifact) {
            return Ok(idx);
        }
        let graphic = VectorGraphic::load(artifact)?;
        debug!(
            path = %artifact.display(),
            shapes = graphic.shapes.len(),
            "loaded vector artifact"
        );
        self.graphics.push((artifact.to_path_buf(), graphic));
        Ok(self.graphics.len() - 1)
    }

    /// Seal the page and write the document to `path`.
    pub fn save(self, path: &Path) -> Result<PathBuf> {
        let mut doc = self.into_document()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CardError::DirectoryUnusable {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|e| CardError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        doc.save_to(&mut writer).map_err(|e| CardError::io(path, e))?;
        writer.flush().map_err(|e| CardError::io(path, e))?;
        Ok(path.to_path_buf())
    }

    /// Build the in-memory document without touching the filesystem.
    pub fn into_document(self) -> Result<Document> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut font_dict = Dictionary::new();
        for std_font in &self.standard {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => std_font.base_name(),
                "Encoding" => "WinAnsiEncoding",
            });
            font_dict.set(standard_resource(*std_font), id);
        }
        for (idx, font) in self.embedded.iter().enumerate() {
            let id = embed_font(&mut doc, font);
            font_dict.set(format!("E{}", idx + 1), id);
        }

        let mut xobjects = Dictionary::new();
        for (idx, (_, graphic)) in self.graphics.iter().enumerate() {
            let id = doc.add_object(form_xobject(graphic)?);
            xobjects.set(format!("B{}", idx + 1), id);
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => font_dict,
            "XObject" => xobjects,
        });

        let content = Content {
            operations: self.ops,
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), self.page.width.into(), self.page.height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
        };
        if let Some(title) = &self.title {
            info.set("Title", text_string(title));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        doc.compress();
        Ok(doc)
    }
}

enum FontMetrics<'a> {
    Standard(StandardFont),
    Embedded(&'a EmbeddedFont),
}

impl FontMetrics<'_> {
    fn text_width(&self, text: &str, size: f32) -> Result<f32> {
        match self {
            FontMetrics::Standard(f) => f.text_width(text, size),
            FontMetrics::Embedded(f) => f.text_width(text, size),
        }
    }

    fn name(&self) -> &str {
        match self {
            FontMetrics::Standard(f) => f.base_name(),
            FontMetrics::Embedded(f) => &f.name,
        }
    }
}

/// PDF text string: literal for ASCII, UTF-16BE with a byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn standard_resource(font: StandardFont) -> &'static str {
    match font {
        StandardFont::Helvetica => "FH",
        StandardFont::HelveticaBold => "FHB",
    }
}

fn embed_font(doc: &mut Document, font: &EmbeddedFont) -> ObjectId {
    let (file_key, file_stream, subtype) = if font.cff {
        (
            "FontFile3",
            Stream::new(dictionary! { "Subtype" => "OpenType" }, font.data.clone()),
            "Type1",
        )
    } else {
        (
            "FontFile2",
            Stream::new(
                dictionary! { "Length1" => font.data.len() as i64 },
                font.data.clone(),
            ),
            "TrueType",
        )
    };
    let file_id = doc.add_object(file_stream);

    // Nonsymbolic, plus FixedPitch when the face says so.
    let flags: i64 = if font.monospaced { 32 | 1 } else { 32 };
    let base_font = Object::Name(font.name.as_bytes().to_vec());
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_font.clone(),
        "Flags" => flags,
        "FontBBox" => font.bbox.iter().map(|v| Object::Integer(i64::from(*v))).collect::<Vec<_>>(),
        "ItalicAngle" => 0i64,
        "Ascent" => i64::from(font.ascent),
        "Descent" => i64::from(font.descent),
        "CapHeight" => i64::from(font.cap_height),
        "StemV" => 80i64,
        file_key => file_id,
    });

    let widths: Vec<Object> = font
        .widths
        .iter()
        .map(|w| Object::Integer(i64::from(w.unwrap_or(0))))
        .collect();
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => subtype,
        "BaseFont" => base_font,
        "FirstChar" => i64::from(fonts::FIRST_CHAR),
        "LastChar" => i64::from(fonts::LAST_CHAR),
        "Widths" => widths,
        "FontDescriptor" => descriptor_id,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Wrap a graphic as a Form XObject with a `[0 0 w h]` bounding box, y flipped to PDF space.
fn form_xobject(graphic: &VectorGraphic) -> Result<Stream> {
    let mut ops = vec![Operation::new(
        "cm",
        vec![1.into(), 0.into(), 0.into(), (-1).into(), 0.into(), graphic.height.into()],
    )];
    for shape in &graphic.shapes {
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            shape.transform.iter().map(|v| Object::Real(*v)).collect(),
        ));
        ops.push(Operation::new(
            "rg",
            shape.rgb.iter().map(|v| Object::Real(*v)).collect(),
        ));
        for seg in &shape.segments {
            ops.push(match *seg {
                Segment::MoveTo(x, y) => Operation::new("m", vec![x.into(), y.into()]),
                Segment::LineTo(x, y) => Operation::new("l", vec![x.into(), y.into()]),
                Segment::CubicTo(x1, y1, x2, y2, x, y) => Operation::new(
                    "c",
                    vec![x1.into(), y1.into(), x2.into(), y2.into(), x.into(), y.into()],
                ),
                Segment::Close => Operation::new("h", vec![]),
            });
        }
        ops.push(Operation::new(if shape.even_odd { "f*" } else { "f" }, vec![]));
        ops.push(Operation::new("Q", vec![]));
    }
    let body = Content { operations: ops }.encode()?;
    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), graphic.width.into(), graphic.height.into()],
            "Resources" => Dictionary::new(),
        },
        body,
    ))
}

impl Surface for PdfSurface {
    fn register_font(&mut self, name: &str, path: &Path) -> Result<FontHandle> {
        if self.embedded.iter().any(|f| f.name == name) {
            return Ok(FontHandle::Embedded(name.to_string()));
        }
        let font = EmbeddedFont::load(name, path)?;
        debug!(name, path = %path.display(), monospaced = font.monospaced, "registered font");
        Ok(self.add_font(font))
    }

    fn set_line_width(&mut self, width: f32) {
        if self.line_width != Some(width) {
            self.op("w", vec![width.into()]);
            self.line_width = Some(width);
        }
    }

    fn rounded_rect(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32) {
        let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
        let k = r * KAPPA;
        let (x1, y1) = (x + width, y + height);
        self.op("m", vec![(x + r).into(), y.into()]);
        self.op("l", vec![(x1 - r).into(), y.into()]);
        self.op(
            "c",
            vec![(x1 - r + k).into(), y.into(), x1.into(), (y + r - k).into(), x1.into(), (y + r).into()],
        );
        self.op("l", vec![x1.into(), (y1 - r).into()]);
        self.op(
            "c",
            vec![x1.into(), (y1 - r + k).into(), (x1 - r + k).into(), y1.into(), (x1 - r).into(), y1.into()],
        );
        self.op("l", vec![(x + r).into(), y1.into()]);
        self.op(
            "c",
            vec![(x + r - k).into(), y1.into(), x.into(), (y1 - r + k).into(), x.into(), (y1 - r).into()],
        );
        self.op("l", vec![x.into(), (y + r).into()]);
        self.op(
            "c",
            vec![x.into(), (y + r - k).into(), (x + r - k).into(), y.into(), (x + r).into(), y.into()],
        );
        self.op("h", vec![]);
        self.op("S", vec![]);
    }

    fn circle(&mut self, cx: f32, cy: f32, radius: f32) {
        let r = radius;
        let k = r * KAPPA;
        self.op("m", vec![(cx + r).into(), cy.into()]);
        self.op(
            "c",
            vec![(cx + r).into(), (cy + k).into(), (cx + k).into(), (cy + r).into(), cx.into(), (cy + r).into()],
        );
        self.op(
            "c",
            vec![(cx - k).into(), (cy + r).into(), (cx - r).into(), (cy + k).into(), (cx - r).into(), cy.into()],
        );
        self.op(
            "c",
            vec![(cx - r).into(), (cy - k).into(), (cx - k).into(), (cy - r).into(), cx.into(), (cy - r).into()],
        );
        self.op(
            "c",
            vec![(cx + k).into(), (cy - r).into(), (cx + r).into(), (cy - k).into(), (cx + r).into(), cy.into()],
        );
        self.op("h", vec![]);
        self.op("S", vec![]);
    }

    fn centered_text(
        &mut self,
        font: &FontHandle,
        size: f32,
        cx: f32,
        baseline: f32,
        text: &str,
    ) -> Result<()> {
        let (resource, width, bytes) = {
            let (resource, metrics) = self.font_resource(font)?;
            let width = metrics.text_width(text, size)?;
            let bytes = fonts::encode_winansi(text, metrics.name())?;
            (resource, width, bytes)
        };
        self.op("BT", vec![]);
        self.op("Tf", vec![Object::Name(resource.into_bytes()), size.into()]);
        self.op("Td", vec![(cx - width / 2.0).into(), baseline.into()]);
        self.op("Tj", vec![Object::string_literal(bytes)]);
        self.op("ET", vec![]);
        Ok(())
    }

    fn place_graphic(
        &mut self,
        artifact: &Path,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        let idx = self.graphic_index(artifact)?;
        let graphic = &self.graphics[idx].1;
        let sx = width / graphic.width;
        let sy = height / graphic.height;
        self.op("q", vec![]);
        self.op("cm", vec![sx.into(), 0.into(), 0.into(), sy.into(), x.into(), y.into()]);
        self.op("Do", vec![Object::Name(format!("B{}", idx + 1).into_bytes())]);
        self.op("Q", vec![]);
        Ok(())
    }
}
