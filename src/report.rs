use crate::models::{Label, TextDetection};

/// Everything a report can reference, by relative file name
pub struct ReportInput<'a> {
    pub labels: &'a [Label],
    pub texts: &'a [TextDetection],
    pub annotated_image: Option<&'a str>,
    pub final_image: Option<&'a str>,
    pub crops: Vec<&'a str>,
}

pub trait ReportAssembler: Send + Sync {
    fn assemble(&self, input: &ReportInput<'_>) -> String;
}

/// One text element per line; line breaks inside an element become spaces
pub fn text_listing(texts: &[TextDetection]) -> String {
    let mut listing = String::new();
    for text in texts {
        listing.extend(text.text.chars().map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c }));
        listing.push('\n');
    }
    listing
}

/// Minimal static HTML page: label names, extracted text, then the images
#[derive(Debug, Clone, Default)]
pub struct HtmlReport;

impl ReportAssembler for HtmlReport {
    fn assemble(&self, input: &ReportInput<'_>) -> String {
        let mut body = String::new();

        body.push_str("<h3>Analyzed following labels from the image: </h3>\n");
        for label in input.labels {
            body.push_str(&format!("<p>{}</p>\n", escape_html(&label.name)));
        }

        body.push_str("<h3>Text Content Extracted from the image: </h3>\n");
        for text in input.texts {
            body.push_str(&format!("<p>{}</p>\n", escape_html(&text.text)));
        }

        for src in [input.annotated_image, input.final_image].into_iter().flatten() {
            body.push_str(&format!("<img src=\"./{}\">\n", escape_html(src)));
        }
        for src in &input.crops {
            body.push_str(&format!("<img src=\"./{}\">\n", escape_html(src)));
        }

        format!("<html>\n<head></head>\n<body>\n{}</body>\n</html>\n", body)
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::geometry::NormalizedPolygon;
    use crate::models::TextKind;

    fn text(s: &str) -> TextDetection {
        TextDetection {
            text: s.to_string(),
            kind: TextKind::Line,
            id: None,
            parent_id: None,
            confidence: 90.0,
            polygon: NormalizedPolygon::default(),
        }
    }

    #[test]
    fn listing_has_one_line_per_text() {
        assert_eq!(text_listing(&[text("OPEN"), text("24 HOURS")]), "OPEN\n24 HOURS\n");
        assert_eq!(text_listing(&[]), "");
    }

    #[test]
    fn embedded_line_breaks_stay_on_one_line() {
        let listing = text_listing(&[text("EXIT\nONLY"), text("A\r\nB")]);
        assert_eq!(listing, "EXIT ONLY\nA  B\n");
        assert_eq!(listing.lines().count(), 2);
    }

    #[test]
    fn report_references_every_artifact_in_order() {
        let labels = vec![Label::new("Cat", 99.0), Label::new("Indoors", 80.0)];
        let texts = vec![text("<b>HI</b>")];
        let html = HtmlReport.assemble(&ReportInput {
            labels: &labels,
            texts: &texts,
            annotated_image: Some("analyzed_image.jpg"),
            final_image: Some("final_analyzed_image.jpg"),
            crops: vec!["element0.jpg", "element1.jpg"],
        });

        assert!(html.contains("<p>Cat</p>"));
        assert!(html.contains("<p>Indoors</p>"));
        assert!(html.contains("<p>&lt;b&gt;HI&lt;/b&gt;</p>"));
        let first = html.find("./element0.jpg").unwrap();
        let second = html.find("./element1.jpg").unwrap();
        assert!(first < second);
        assert!(html.contains("./analyzed_image.jpg"));
        assert!(html.contains("./final_analyzed_image.jpg"));
    }
}
