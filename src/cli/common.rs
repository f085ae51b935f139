//! Shared clap helper types for the CLI.

use cardmaker::ReportKind;
use clap::ValueEnum;

/// Report selector; older underscore names remain accepted as aliases.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportArg {
    #[value(name = "raw-vector", alias = "barcode_svg")]
    RawVector,
    #[value(name = "raw-raster", alias = "barcode_png")]
    RawRaster,
    #[value(name = "single-card-letter", alias = "ymca_letter_1up")]
    SingleCardLetter,
    #[value(name = "single-card-cardsize", alias = "ymca_cr80_1up")]
    SingleCardCardsize,
    #[value(name = "six-card-letter", alias = "ymca_letter_6up")]
    SixCardLetter,
    #[value(name = "six-card-letter-mixed", alias = "ymca_letter_6up_mixed")]
    SixCardLetterMixed,
}

impl From<ReportArg> for ReportKind {
    fn from(value: ReportArg) -> ReportKind {
        match value {
            ReportArg::RawVector => ReportKind::RawVector,
            ReportArg::RawRaster => ReportKind::RawRaster,
            ReportArg::SingleCardLetter => ReportKind::SingleCardLetter,
            ReportArg::SingleCardCardsize => ReportKind::SingleCardCardsize,
            ReportArg::SixCardLetter => ReportKind::SixCardLetter,
            ReportArg::SixCardLetterMixed => ReportKind::SixCardLetterMixed,
        }
    }
}
