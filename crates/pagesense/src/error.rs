#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No text blocks could be extracted from the PDF")]
    NoTextBlocks,

    #[error("Path does not exist or is not a PDF: {0}")]
    NotAPdf(String),

    #[error("Uploaded file must be a PDF (got {0})")]
    InvalidContentType(String),

    #[error("Missing multipart field: {0}")]
    MissingField(String),

    #[error("output_dir must be provided when save_json=true")]
    MissingOutputDir,

    #[error(transparent)]
    Backend(#[from] pdf::PdfError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
