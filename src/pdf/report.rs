//! Two-page diagnosis report: findings first, the source document text and disclaimer after.

use super::PdfError;
use super::layout::{Align, Font, PAGE_HEIGHT, PAGE_WIDTH, PageWriter};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use time::OffsetDateTime;
use time::macros::format_description;

const TITLE: &str = "Medical Diagnosis Report";
const DISCLAIMER: [&str; 2] = [
    "DISCLAIMER: This AI-generated diagnosis is for informational purposes only",
    "and should not replace professional medical advice.",
];

/// Everything printed on a diagnosis report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportInput {
    /// Diagnosed condition.
    pub disease: String,
    /// Confidence in `0.0..=1.0`; printed as a whole percentage.
    pub confidence: f64,
    /// Severity label, printed capitalized.
    pub severity: String,
    /// Recommended treatment text.
    pub treatment: String,
    /// Precautions, one bullet each.
    pub precautions: Vec<String>,
    /// Optional free-form notes.
    pub additional_info: Option<String>,
    /// Text extracted from the source document.
    pub extracted_text: String,
    /// Optional patient name for the header.
    pub patient_name: Option<String>,
    /// Timestamp printed under the title.
    pub generated_at: OffsetDateTime,
}

/// Render the report to PDF bytes.
pub fn render_report(input: &ReportInput) -> Result<Vec<u8>, PdfError> {
    let mut writer = PageWriter::new();
    write_findings(&mut writer, input)?;
    writer.new_page();
    write_source_text(&mut writer, input);

    let pages = writer.finish();
    let page_count = pages.len();
    let bytes = assemble(pages)?;
    tracing::info!(pages = page_count, bytes = bytes.len(), "Diagnosis report rendered");
    Ok(bytes)
}

fn write_findings(writer: &mut PageWriter, input: &ReportInput) -> Result<(), PdfError> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let generated = input
        .generated_at
        .format(format)
        .map_err(|error| PdfError::Render(error.to_string()))?;

    writer.line(TITLE, Font::Bold, 16.0, Align::Center);
    writer.line(
        &format!("Generated on: {generated}"),
        Font::Regular,
        10.0,
        Align::Right,
    );
    if let Some(patient) = input.patient_name.as_deref().map(str::trim)
        && !patient.is_empty()
    {
        section(writer, "Patient:", patient);
    }

    let percent = (input.confidence * 100.0).trunc() as i64;
    section(
        writer,
        "Diagnosis:",
        &format!("{} (Confidence: {percent}%)", input.disease),
    );
    section(writer, "Severity:", &capitalize(&input.severity));
    section(writer, "Recommended Treatment:", &input.treatment);

    writer.line("Precautions:", Font::Bold, 12.0, Align::Left);
    for precaution in &input.precautions {
        writer.paragraph(&format!("• {precaution}"), Font::Regular, 12.0);
    }

    if let Some(info) = input.additional_info.as_deref()
        && !info.trim().is_empty()
    {
        writer.gap(6.0);
        section(writer, "Additional Information:", info);
    }
    Ok(())
}

fn write_source_text(writer: &mut PageWriter, input: &ReportInput) {
    writer.line("Extracted Text from Report:", Font::Bold, 12.0, Align::Left);
    writer.paragraph(&input.extracted_text, Font::Regular, 10.0);
    writer.gap(8.0);
    for line in DISCLAIMER {
        writer.line(line, Font::Italic, 8.0, Align::Left);
    }
}

fn section(writer: &mut PageWriter, heading: &str, body: &str) {
    writer.line(heading, Font::Bold, 12.0, Align::Left);
    writer.paragraph(body, Font::Regular, 12.0);
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|error| PdfError::Render(error.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|error| PdfError::Render(error.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
impl ReportInput {
    pub(crate) fn sample() -> Self {
        Self {
            disease: "Community-acquired pneumonia".to_string(),
            confidence: 0.89,
            severity: "moderate".to_string(),
            treatment: "Empiric amoxicillin for five days; reassess at 48 hours.".to_string(),
            precautions: vec![
                "Follow up with your healthcare provider".to_string(),
                "Take medications as prescribed".to_string(),
            ],
            additional_info: Some("Repeat chest radiograph in six weeks.".to_string()),
            extracted_text: "Chief complaint: productive cough and fever for 3 days.".to_string(),
            patient_name: Some("Jane Doe".to_string()),
            generated_at: time::macros::datetime!(2024-03-01 09:30:00 UTC),
        }
    }
}
