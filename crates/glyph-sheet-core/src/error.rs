use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlyphSheetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Glyph {id} ({x},{y} {width}x{height}) lies outside the {image_width}x{image_height} sheet")]
    GlyphOutOfBounds {
        id: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("Nothing to pack")]
    Empty,
    #[error("Cannot allocate a {width}x{height} drawing surface")]
    Surface { width: u64, height: u64 },
    #[error("Identification failed: {0}")]
    Identify(String),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, GlyphSheetError>;
