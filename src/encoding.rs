use thiserror::Error;

/// Code 39 symbol alphabet. A symbol's position is its Mod-43 value.
pub const CODE39_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Start/stop sentinel; never part of the checksum sum.
const SENTINEL: char = '*';
const PLUS_PREFIX: char = '+';
const MAX_FILENAME_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("character '{ch}' (U+{code:04X}) at position {position} is not in the Code 39 alphabet")]
    InvalidSymbol { ch: char, code: u32, position: usize },
    #[error("barcode data is empty")]
    Empty,
}

/// Position of `ch` in [`CODE39_ALPHABET`], if any.
pub fn symbol_value(ch: char) -> Option<usize> {
    CODE39_ALPHABET.chars().position(|c| c == ch)
}

/// Mod-43 check symbol over `data`.
///
/// `*` sentinels are dropped before summing. Every remaining character must
/// be an (upper-case) alphabet symbol; the first one that is not is reported
/// with its zero-based position in `data`.
pub fn checksum_symbol(data: &str) -> Result<char, EncodeError> {
    let mut sum = 0usize;
    for (position, ch) in data.chars().enumerate() {
        if ch == SENTINEL {
            continue;
        }
        sum += symbol_value(ch).ok_or(EncodeError::InvalidSymbol {
            ch,
            code: ch as u32,
            position,
        })?;
    }
    let idx = sum % CODE39_ALPHABET.len();
    Ok(CODE39_ALPHABET.as_bytes()[idx] as char)
}

/// What gets encoded into the bars versus what gets printed under them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeSpec {
    pub raw: String,
    pub checksum: bool,
    pub plus: bool,
    /// Data handed to the renderer.
    pub encoded: String,
    /// Human-readable bottom line. Never carries the `+` prefix.
    pub display: String,
}

impl BarcodeSpec {
    /// Normalize `raw` and derive the encoded/display pair.
    ///
    /// The `+` prefix takes part in the checksum (it is a real Code 39
    /// symbol in the bars) but is left off the printed text.
    pub fn new(raw: &str, checksum: bool, plus: bool) -> Result<Self, EncodeError> {
        let data = raw.trim().to_uppercase();
        if data.is_empty() {
            return Err(EncodeError::Empty);
        }
        if let Some((position, ch)) = data.chars().enumerate().find(|(_, c)| symbol_value(*c).is_none()) {
            return Err(EncodeError::InvalidSymbol {
                ch,
                code: ch as u32,
                position,
            });
        }

        let mut encoded = String::with_capacity(data.len() + 2);
        if plus {
            encoded.push(PLUS_PREFIX);
        }
        encoded.push_str(&data);
        let mut display = data;

        if checksum {
            let check = checksum_symbol(&encoded)?;
            encoded.push(check);
            display.push(check);
        }

        Ok(Self {
            raw: raw.to_string(),
            checksum,
            plus,
            encoded,
            display,
        })
    }

    /// Tag used in output filenames.
    pub fn variant_tag(&self) -> &'static str {
        if self.checksum { "chk" } else { "plain" }
    }
}

/// Reduce `s` to a filesystem-safe name.
///
/// Runs of characters outside `[A-Za-z0-9._-]` collapse to one `_` and the
/// result is capped at 120 characters. Distinct inputs may collide.
pub fn safe_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for ch in s.trim().chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    // Only ASCII survives, so byte length equals char count.
    out.truncate(MAX_FILENAME_LEN);
    out
}
