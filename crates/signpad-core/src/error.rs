use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignpadError {
    #[error("Failed to parse PDF: {0}")]
    PdfParse(String),

    #[error("Failed to write PDF: {0}")]
    PdfWrite(String),

    #[error("Page {0} not found")]
    PageNotFound(u32),

    #[error("Invalid encoded payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid signature raster: {0}")]
    InvalidRaster(String),

    #[error("No signature captured")]
    NoSignature,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Unknown document: {0}")]
    UnknownDocument(String),
}

