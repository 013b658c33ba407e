//! Turn a file on disk into article text.
//!
//! Plain text and markdown are read as-is, HTML is flattened with
//! `html2text`, and EPUB spines are walked chapter by chapter.

use anyhow::{Context, Result, bail};
use epub::doc::EpubDoc;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Wide enough that html2text never hard-wraps a paragraph.
const HTML_WIDTH: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedArticle {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Text,
    Html,
    Epub,
}

pub fn load_article(path: &Path) -> Result<LoadedArticle> {
    let text = match source_kind(path) {
        Some(SourceKind::Text) => {
            info!(path = %path.display(), "Loading plain text article");
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        Some(SourceKind::Html) => {
            info!(path = %path.display(), "Loading HTML article");
            let html = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            html_to_text(&html)
        }
        Some(SourceKind::Epub) => load_epub(path)?,
        None => bail!(
            "Unsupported article format: {} (expected .txt, .md, .html or .epub)",
            path.display()
        ),
    };

    if text.trim().is_empty() {
        bail!("No textual content found in {}", path.display());
    }

    Ok(LoadedArticle {
        title: title_for(path),
        text,
    })
}

fn load_epub(path: &Path) -> Result<String> {
    info!(path = %path.display(), "Loading EPUB article");
    let mut doc =
        EpubDoc::new(path).with_context(|| format!("Failed to open EPUB at {}", path.display()))?;

    let mut combined = String::new();
    let mut chapters = 0usize;
    while let Some((chapter, _mime)) = doc.get_current_str() {
        chapters += 1;
        let plain = html_to_text(&chapter);
        if !plain.trim().is_empty() {
            if !combined.is_empty() {
                combined.push_str("\n\n");
            }
            combined.push_str(plain.trim());
        }
        debug!(chapter = chapters, added_chars = plain.len(), "Parsed chapter");

        if !doc.go_next() {
            break;
        }
    }

    info!(chapters, total_chars = combined.len(), "Finished loading EPUB");
    Ok(combined)
}

fn html_to_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), HTML_WIDTH) {
        Ok(clean) => clean,
        Err(err) => {
            warn!("html2text failed; keeping raw markup: {err}");
            html.to_string()
        }
    }
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "md" | "markdown" => Some(SourceKind::Text),
        "html" | "htm" | "xhtml" => Some(SourceKind::Html),
        "epub" => Some(SourceKind::Epub),
        _ => None,
    }
}

fn title_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.replace(['_', '-'], " "))
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_plain_text_with_title_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("el_gato-negro.txt");
        fs::write(&path, "Hola, mundo.").unwrap();

        let article = load_article(&path).unwrap();
        assert_eq!(article.title, "el gato negro");
        assert_eq!(article.text, "Hola, mundo.");
    }

    #[test]
    fn flattens_html() {
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        write!(file, "<html><body><p>Hola <b>mundo</b></p></body></html>").unwrap();
        let article = load_article(file.path()).unwrap();
        assert!(article.text.contains("Hola"));
        assert!(article.text.contains("mundo"));
        assert!(!article.text.contains("<p>"));
    }

    #[test]
    fn rejects_unknown_and_empty_sources() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("book.pdf");
        fs::write(&pdf, "%PDF").unwrap();
        assert!(load_article(&pdf).is_err());

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "  \n").unwrap();
        assert!(load_article(&empty).is_err());
    }
}
