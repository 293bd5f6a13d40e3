use crate::domain::document::DocumentKind;
use crate::domain::error::{AppError, Result};

/// Plain text of an uploaded document, trimmed. Empty when the file has no
/// text layer (for example a scanned PDF).
pub(super) fn extract_text(kind: DocumentKind, bytes: &[u8]) -> Result<String> {
    let text = match kind {
        DocumentKind::Pdf => extract_pdf(bytes)?,
        DocumentKind::Docx => extract_docx(bytes)?,
        DocumentKind::Xml | DocumentKind::Markdown | DocumentKind::Text => decode_text(bytes),
    };
    Ok(text.trim().to_string())
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| AppError::IngestionError(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    // Extract text per page so page breaks survive as blank lines
    for (page_number, _) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(page_text) => {
                let trimmed = page_text.trim();
                if !trimmed.is_empty() {
                    pages.push(trimmed.to_string());
                }
            }
            Err(e) => {
                tracing::warn!(page_number, error = %e, "Skipping unreadable PDF page");
            }
        }
    }

    Ok(pages.join("\n\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| AppError::IngestionError(format!("Failed to parse DOCX file: {}", e)))?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                let text = paragraph_text(paragraph);
                if !text.trim().is_empty() {
                    lines.push(text);
                }
            }
            docx_rs::DocumentChild::Table(table) => table_lines(table, &mut lines),
            _ => {}
        }
    }
    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut buffer = String::new();
    for child in &paragraph.children {
        paragraph_child_text(child, &mut buffer);
    }
    buffer
}

fn paragraph_child_text(child: &docx_rs::ParagraphChild, buffer: &mut String) {
    match child {
        docx_rs::ParagraphChild::Run(run) => run_text(run, buffer),
        docx_rs::ParagraphChild::Hyperlink(link) => {
            for link_child in &link.children {
                paragraph_child_text(link_child, buffer);
            }
        }
        docx_rs::ParagraphChild::Insert(insert) => {
            for insert_child in &insert.children {
                if let docx_rs::InsertChild::Run(run) = insert_child {
                    run_text(run, buffer);
                }
            }
        }
        _ => {}
    }
}

fn run_text(run: &docx_rs::Run, buffer: &mut String) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(text) => buffer.push_str(&text.text),
            docx_rs::RunChild::Tab(_) => buffer.push('\t'),
            docx_rs::RunChild::Break(_) => buffer.push('\n'),
            _ => {}
        }
    }
}

/// Requirement tables become one `cell | cell` line per row.
fn table_lines(table: &docx_rs::Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row;
        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell;
            let mut parts = Vec::new();
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(paragraph) => {
                        let text = paragraph_text(paragraph);
                        if !text.trim().is_empty() {
                            parts.push(text);
                        }
                    }
                    docx_rs::TableCellContent::Table(nested) => {
                        let mut nested_lines = Vec::new();
                        table_lines(nested, &mut nested_lines);
                        if !nested_lines.is_empty() {
                            parts.push(nested_lines.join(" "));
                        }
                    }
                    _ => {}
                }
            }
            let text = parts.join(" ");
            if !text.trim().is_empty() {
                cells.push(text);
            }
        }
        if !cells.is_empty() {
            lines.push(cells.join(" | "));
        }
    }
}

/// BOM-sniffed decode; BOM-less input is UTF-8, falling back to Windows-1252.
fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}
