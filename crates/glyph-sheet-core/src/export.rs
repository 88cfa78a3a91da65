use crate::error::{GlyphSheetError, Result};
use crate::model::{FontInfo, Glyph};
use serde_json::{Value, json};

/// Render the BMFont text description of a glyph set.
///
/// Lines: `info`, `common`, `page`, `chars count=N`, then one `char` line per
/// glyph in the given order. `xadvance` includes `info.tracking` and is
/// clamped at 0; unidentified glyphs get `id=-1`.
pub fn to_fnt_text(glyphs: &[Glyph], info: &FontInfo, atlas_width: u32, atlas_height: u32) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "info face=\"{}\" size={} bold={} italic={} charset=\"\" unicode=1 stretchH=100 smooth=1 aa=1 padding=0,0,0,0 spacing=1,1\n",
        quote_safe(&info.face),
        info.size,
        info.bold as u8,
        info.italic as u8,
    ));
    s.push_str(&format!(
        "common lineHeight={} base={} scaleW={} scaleH={} pages=1 packed=0\n",
        info.line_height, info.base, atlas_width, atlas_height
    ));
    s.push_str(&format!("page id=0 file=\"{}\"\n", quote_safe(&info.page_file)));
    s.push_str(&format!("chars count={}\n", glyphs.len()));
    for g in glyphs {
        let xadvance = (g.xadvance as i64 + info.tracking as i64).max(0);
        s.push_str(&format!(
            "char id={} x={} y={} width={} height={} xoffset={} yoffset={} xadvance={} page=0 chnl=15\n",
            g.code_point(),
            g.x,
            g.y,
            g.width,
            g.height,
            g.xoffset,
            g.yoffset,
            xadvance,
        ));
    }
    s
}

fn quote_safe(s: &str) -> String {
    s.replace('"', "'")
}

/// Font read back from BMFont text.
#[derive(Debug, Clone)]
pub struct ParsedFont {
    pub info: FontInfo,
    pub scale_w: u32,
    pub scale_h: u32,
    /// Glyphs in file order; ids are their line order (0, 1, ...).
    pub glyphs: Vec<Glyph>,
}

/// Parse BMFont text (`info`, `common`, `page` and `char` lines).
///
/// Unknown tags are skipped. `char` lines need `id x y width height`;
/// offsets default to 0 and `xadvance` to `width + 1`.
pub fn parse_fnt_text(text: &str) -> Result<ParsedFont> {
    let mut info = FontInfo::default();
    let mut scale_w = 0u32;
    let mut scale_h = 0u32;
    let mut glyphs: Vec<Glyph> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (tag, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let pairs = parse_pairs(rest);
        let field = Fields { line: line_no, pairs: &pairs };
        match tag {
            "info" => {
                if let Some(face) = field.get("face") {
                    info.face = face.to_string();
                }
                if let Some(size) = field.opt_i64("size")? {
                    info.size = size.unsigned_abs() as u32;
                }
                info.bold = field.opt_i64("bold")?.unwrap_or(0) != 0;
                info.italic = field.opt_i64("italic")?.unwrap_or(0) != 0;
            }
            "common" => {
                info.line_height = field.opt_u32("lineHeight")?.unwrap_or(0);
                info.base = field.opt_u32("base")?.unwrap_or(0);
                scale_w = field.opt_u32("scaleW")?.unwrap_or(0);
                scale_h = field.opt_u32("scaleH")?.unwrap_or(0);
            }
            "page" => {
                if let Some(file) = field.get("file") {
                    info.page_file = file.to_string();
                }
            }
            "char" => {
                let id = field.req_i64("id")?;
                let character = if id < 0 {
                    None
                } else {
                    let ch = u32::try_from(id).ok().and_then(char::from_u32);
                    if ch.is_none() {
                        return Err(field.error(format!("id {} is not a valid code point", id)));
                    }
                    ch
                };
                let width = field.req_u32("width")?;
                let glyph = Glyph {
                    id: glyphs.len() as u32,
                    character,
                    x: field.req_u32("x")?,
                    y: field.req_u32("y")?,
                    width,
                    height: field.req_u32("height")?,
                    xoffset: field.opt_i32("xoffset")?.unwrap_or(0),
                    yoffset: field.opt_i32("yoffset")?.unwrap_or(0),
                    xadvance: field.opt_i32("xadvance")?.unwrap_or(width as i32 + 1),
                };
                glyphs.push(glyph);
            }
            _ => {}
        }
    }
    Ok(ParsedFont {
        info,
        scale_w,
        scale_h,
        glyphs,
    })
}

/// Splits `key=value key="quoted value"` into pairs.
fn parse_pairs(rest: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = rest.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    value.push(c);
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        out.push((key, value));
    }
    out
}

struct Fields<'a> {
    line: usize,
    pairs: &'a [(String, String)],
}

impl Fields<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn error(&self, message: String) -> GlyphSheetError {
        GlyphSheetError::Parse {
            line: self.line,
            message,
        }
    }

    fn opt_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.error(format!("{}={:?} is not an integer", key, v))),
        }
    }

    fn opt_i32(&self, key: &str) -> Result<Option<i32>> {
        match self.opt_i64(key)? {
            None => Ok(None),
            Some(v) => i32::try_from(v)
                .map(Some)
                .map_err(|_| self.error(format!("{}={} is out of range", key, v))),
        }
    }

    fn opt_u32(&self, key: &str) -> Result<Option<u32>> {
        match self.opt_i64(key)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| self.error(format!("{}={} must be a non-negative integer", key, v))),
        }
    }

    fn req_i64(&self, key: &str) -> Result<i64> {
        self.opt_i64(key)?
            .ok_or_else(|| self.error(format!("missing field {}", key)))
    }

    fn req_u32(&self, key: &str) -> Result<u32> {
        self.opt_u32(key)?
            .ok_or_else(|| self.error(format!("missing field {}", key)))
    }
}

/// Serialize the glyph set as `{ info, common, glyphs }`.
/// Each glyph carries its code point (`id`) next to the model fields.
pub fn to_json(glyphs: &[Glyph], info: &FontInfo, atlas_width: u32, atlas_height: u32) -> Value {
    let glyphs_val: Vec<Value> = glyphs
        .iter()
        .map(|g| {
            json!({
                "id": g.id,
                "codePoint": g.code_point(),
                "character": g.character,
                "x": g.x,
                "y": g.y,
                "width": g.width,
                "height": g.height,
                "xoffset": g.xoffset,
                "yoffset": g.yoffset,
                "xadvance": g.xadvance,
            })
        })
        .collect();
    json!({
        "info": info,
        "common": {
            "lineHeight": info.line_height,
            "base": info.base,
            "scaleW": atlas_width,
            "scaleH": atlas_height,
            "pages": 1,
        },
        "glyphs": glyphs_val,
    })
}

/// Read a glyph list from `to_json` output or from a bare JSON array of glyphs.
pub fn glyphs_from_json(value: &Value) -> Result<Vec<Glyph>> {
    let list = match value {
        Value::Object(map) => map
            .get("glyphs")
            .ok_or_else(|| GlyphSheetError::InvalidInput("JSON object has no \"glyphs\" field".into()))?,
        other => other,
    };
    Ok(serde_json::from_value(list.clone())?)
}
