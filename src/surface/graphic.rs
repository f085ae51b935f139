//! Vector artifacts flattened into filled paths the PDF backend can replay.

use std::fs;
use std::path::Path;

use tracing::debug;
use usvg::tiny_skia_path::PathSegment;

use crate::error::{CardError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CubicTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// One filled outline in the graphic's own (y-down) coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledShape {
    pub rgb: [f32; 3],
    pub even_odd: bool,
    /// Absolute transform `[a b c d e f]` from the source document.
    pub transform: [f32; 6],
    pub segments: Vec<Segment>,
}

/// A parsed barcode artifact: intrinsic size plus its filled shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorGraphic {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<FilledShape>,
}

impl VectorGraphic {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| CardError::io(path, e))?;
        Self::from_svg_data(&data).map_err(|message| CardError::Artifact {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_svg_data(data: &[u8]) -> std::result::Result<Self, String> {
        let tree = usvg::Tree::from_data(data, &usvg::Options::default()).map_err(|e| e.to_string())?;
        let size = tree.size();
        if size.width() <= 0.0 || size.height() <= 0.0 {
            return Err("artifact has an empty canvas".to_string());
        }
        let mut shapes = Vec::new();
        collect(tree.root(), &mut shapes);
        Ok(Self {
            width: size.width(),
            height: size.height(),
            shapes,
        })
    }
}

fn collect(group: &usvg::Group, out: &mut Vec<FilledShape>) {
    for node in group.children() {
        match node {
            usvg::Node::Group(child) => collect(child, out),
            usvg::Node::Path(path) => {
                if !path.is_visible() {
                    continue;
                }
                let Some(fill) = path.fill() else {
                    continue;
                };
                let rgb = match fill.paint() {
                    usvg::Paint::Color(c) => [
                        f32::from(c.red) / 255.0,
                        f32::from(c.green) / 255.0,
                        f32::from(c.blue) / 255.0,
                    ],
                    _ => {
                        debug!("skipping non-solid fill in artifact");
                        continue;
                    }
                };
                let ts = path.abs_transform();
                out.push(FilledShape {
                    rgb,
                    even_odd: matches!(fill.rule(), usvg::FillRule::EvenOdd),
                    transform: [ts.sx, ts.ky, ts.kx, ts.sy, ts.tx, ts.ty],
                    segments: flatten(path.data()),
                });
            }
            _ => debug!("skipping non-path node in artifact"),
        }
    }
}

/// Convert to move/line/cubic, raising quadratics to cubics.
fn flatten(path: &usvg::tiny_skia_path::Path) -> Vec<Segment> {
    let mut out = Vec::new();
    let (mut cx, mut cy) = (0.0f32, 0.0f32);
    let (mut sx, mut sy) = (0.0f32, 0.0f32);
    for seg in path.segments() {
        match seg {
            PathSegment::MoveTo(p) => {
                out.push(Segment::MoveTo(p.x, p.y));
                (cx, cy, sx, sy) = (p.x, p.y, p.x, p.y);
            }
            PathSegment::LineTo(p) => {
                out.push(Segment::LineTo(p.x, p.y));
                (cx, cy) = (p.x, p.y);
            }
            PathSegment::QuadTo(q, p) => {
                let c1 = (cx + 2.0 / 3.0 * (q.x - cx), cy + 2.0 / 3.0 * (q.y - cy));
                let c2 = (p.x + 2.0 / 3.0 * (q.x - p.x), p.y + 2.0 / 3.0 * (q.y - p.y));
                out.push(Segment::CubicTo(c1.0, c1.1, c2.0, c2.1, p.x, p.y));
                (cx, cy) = (p.x, p.y);
            }
            PathSegment::CubicTo(c1, c2, p) => {
                out.push(Segment::CubicTo(c1.x, c1.y, c2.x, c2.y, p.x, p.y));
                (cx, cy) = (p.x, p.y);
            }
            PathSegment::Close => {
                out.push(Segment::Close);
                (cx, cy) = (sx, sy);
            }
        }
    }
    out
}
