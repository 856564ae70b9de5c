use crate::{Attachment, StudyError, StudyResult};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

impl Attachment {
    #[must_use]
    pub fn text(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    /// Encode raw image bytes as an attachment.
    #[must_use]
    pub fn image(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: BASE64_STANDARD.encode(bytes),
        }
    }

    /// Attach text already extracted from a PDF, one entry per page.
    pub fn pdf_text<I, S>(name: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text: String = pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| format!("[Page {}]\n{}\n\n", index + 1, page.as_ref()))
            .collect();

        Self {
            name: name.into(),
            mime_type: "application/pdf".to_string(),
            content: text.trim().to_string(),
        }
    }

    /// Whether the content is text the tutor should read as context.
    #[must_use]
    pub fn is_text_like(&self) -> bool {
        self.mime_type == "application/pdf"
            || self.mime_type.starts_with("text/")
            || self.name.ends_with(".md")
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

fn image_mime_type(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[derive(Debug, Error)]
enum PdfError {
    #[error(transparent)]
    Parse(#[from] lopdf::Error),
    #[error("document is password protected")]
    Encrypted,
    #[error("document has no pages")]
    Empty,
}

/// Text of every page in order, one entry per page.
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, PdfError> {
    let document = lopdf::Document::load_mem(bytes)?;
    if document.is_encrypted() {
        return Err(PdfError::Encrypted);
    }

    let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
    if page_numbers.is_empty() {
        return Err(PdfError::Empty);
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        pages.push(document.extract_text(&[page_number])?);
    }
    Ok(pages)
}

/// Read a `.txt`/`.md` file as text, a `.pdf` as its page text, or an image
/// file as base64.
pub async fn load_attachment(path: impl AsRef<Path>) -> StudyResult<Attachment> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let read_error = |source| StudyError::Attachment {
        name: name.clone(),
        source,
    };

    match extension.as_str() {
        "txt" | "md" => {
            let content = tokio::fs::read_to_string(path).await.map_err(read_error)?;
            let mime_type = if extension == "md" {
                "text/markdown"
            } else {
                "text/plain"
            };
            Ok(Attachment::text(name, mime_type, content))
        }
        "pdf" => {
            let bytes = tokio::fs::read(path).await.map_err(read_error)?;
            match extract_pdf_pages(&bytes) {
                Ok(pages) => Ok(Attachment::pdf_text(name, pages)),
                Err(error) => {
                    warn!(name = %name, error = %error, "pdf extraction failed");
                    Err(StudyError::UnreadablePdf(name))
                }
            }
        }
        other => match image_mime_type(other) {
            Some(mime_type) => {
                let bytes = tokio::fs::read(path).await.map_err(read_error)?;
                Ok(Attachment::image(name, mime_type, &bytes))
            }
            None => Err(StudyError::validation(format!(
                "Unsupported attachment type: {name}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{
        content::{Content, Operation},
        dictionary, Object, Stream,
    };

    /// A minimal PDF with one Courier text line per page.
    fn pdf_fixture(pages: &[&str]) -> Vec<u8> {
        let mut document = lopdf::Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let kids: Vec<Object> = pages
            .iter()
            .map(|text| {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 24.into()]),
                        Operation::new("Td", vec![72.into(), 700.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id = document
                    .add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                document
                    .add_object(dictionary! {
                        "Type" => "Page",
                        "Parent" => pages_id,
                        "Contents" => content_id,
                    })
                    .into()
            })
            .collect();

        let count = i64::try_from(kids.len()).unwrap();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn pdf_pages_are_labelled() {
        let attachment = Attachment::pdf_text("lecture.pdf", ["Intro", "Cells divide"]);
        assert_eq!(attachment.content, "[Page 1]\nIntro\n\n[Page 2]\nCells divide");
        assert!(attachment.is_text_like());
        assert!(!attachment.is_image());
    }

    #[test]
    fn markdown_is_text_like_by_name() {
        let attachment = Attachment::text("notes.md", "application/octet-stream", "# Notes");
        assert!(attachment.is_text_like());
    }

    #[tokio::test]
    async fn loads_text_and_images_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        let image = dir.path().join("graph.PNG");
        tokio::fs::write(&notes, "# Derivatives").await.unwrap();
        tokio::fs::write(&image, b"ABC").await.unwrap();

        let attachment = load_attachment(&notes).await.unwrap();
        assert_eq!(attachment.mime_type, "text/markdown");
        assert_eq!(attachment.content, "# Derivatives");

        let attachment = load_attachment(&image).await.unwrap();
        assert_eq!(attachment.name, "graph.PNG");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.content, "QUJD");
    }

    #[tokio::test]
    async fn loads_pdf_pages_as_labelled_text() {
        let dir = tempfile::tempdir().unwrap();
        let lecture = dir.path().join("lecture.pdf");
        tokio::fs::write(&lecture, pdf_fixture(&["Mitosis", "Meiosis"]))
            .await
            .unwrap();

        let attachment = load_attachment(&lecture).await.unwrap();
        assert_eq!(attachment.name, "lecture.pdf");
        assert_eq!(attachment.mime_type, "application/pdf");
        assert!(attachment.is_text_like());

        let content = &attachment.content;
        assert!(content.starts_with("[Page 1]\n"));
        let second = content.find("[Page 2]\n").unwrap();
        assert!(content[..second].contains("Mitosis"));
        assert!(content[second..].contains("Meiosis"));
    }

    #[tokio::test]
    async fn broken_pdf_is_reported_as_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("scan.pdf");
        tokio::fs::write(&broken, b"%PDF-1.4\nthis is not a pdf body")
            .await
            .unwrap();

        let error = load_attachment(&broken).await.unwrap_err();
        assert!(matches!(error, StudyError::UnreadablePdf(ref name) if name == "scan.pdf"));
        assert_eq!(
            error.to_string(),
            "Failed to read PDF. Make sure it's not password protected."
        );
    }

    #[tokio::test]
    async fn rejects_unknown_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();

        let error = load_attachment(dir.path().join("slides.pptx")).await.unwrap_err();
        assert!(matches!(error, StudyError::Validation(_)));

        let error = load_attachment(dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(error, StudyError::Attachment { .. }));
    }
}
