use rvoip_sip_core::types::mime::Mime;

/// A minimal PIDF (Presence Information Data Format, RFC 3863) document:
/// just enough to drive SUBSCRIBE/NOTIFY end-to-end in [`crate::tuim::TuIM`]
/// (SPEC_FULL.md §4 "good enough to drive NOTIFY/SUBSCRIBE ... carried
/// over because the original exercises it end-to-end"). This stack
/// carries presence as an opaque body everywhere except here; `Pidf` does
/// not attempt to model the rest of the RFC 3863 schema (tuples, devices,
/// timestamps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pidf {
    pub entity: String,
    pub open: bool,
    pub note: Option<String>,
}

impl Pidf {
    pub fn new(entity: impl Into<String>, open: bool) -> Self {
        Pidf { entity: entity.into(), open, note: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn mime() -> Mime {
        Mime::new("application", "pidf+xml")
    }

    /// Render the document body. Not a general XML writer — this only
    /// ever needs to produce the shape [`Self::parse`] reads back.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!("<presence xmlns=\"urn:ietf:params:xml:ns:pidf\" entity=\"{}\">\n", escape(&self.entity)));
        out.push_str("  <tuple id=\"t0\">\n");
        out.push_str(&format!("    <status><basic>{}</basic></status>\n", if self.open { "open" } else { "closed" }));
        if let Some(note) = &self.note {
            out.push_str(&format!("    <note>{}</note>\n", escape(note)));
        }
        out.push_str("  </tuple>\n");
        out.push_str("</presence>\n");
        out
    }

    /// Parse the fields this stack cares about out of a PIDF document,
    /// without a full XML parser: the entity attribute, the `<basic>`
    /// open/closed marker, and an optional `<note>`. Malformed or
    /// unrecognised documents fail rather than guessing.
    pub fn parse(body: &[u8]) -> Result<Pidf, String> {
        let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
        let entity = extract_attr(text, "entity").ok_or_else(|| "PIDF document missing entity attribute".to_string())?;
        let basic = extract_tag(text, "basic").ok_or_else(|| "PIDF document missing <basic> status".to_string())?;
        let open = match basic.as_str() {
            "open" => true,
            "closed" => false,
            other => return Err(format!("unrecognised <basic> value: {other}")),
        };
        let note = extract_tag(text, "note");
        Ok(Pidf { entity, open, note })
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn extract_attr(text: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let start = text.find(&needle)? + needle.len();
    let end = text[start..].find('"')? + start;
    Some(text[start..end].to_string())
}

fn extract_tag(text: &str, name: &str) -> Option<String> {
    let open_tag = format!("<{name}>");
    let close_tag = format!("</{name}>");
    let start = text.find(&open_tag)? + open_tag.len();
    let end = text[start..].find(&close_tag)? + start;
    Some(text[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_open_with_note() {
        let pidf = Pidf::new("sip:alice@example.com", true).with_note("At the beach");
        let parsed = Pidf::parse(pidf.to_xml().as_bytes()).unwrap();
        assert_eq!(parsed, pidf);
    }

    #[test]
    fn parses_closed_with_no_note() {
        let pidf = Pidf::new("sip:bob@example.com", false);
        let parsed = Pidf::parse(pidf.to_xml().as_bytes()).unwrap();
        assert!(!parsed.open);
        assert_eq!(parsed.note, None);
    }

    #[test]
    fn rejects_unrecognised_basic_value() {
        let bad = b"<presence entity=\"sip:a@b\"><tuple><status><basic>maybe</basic></status></tuple></presence>";
        assert!(Pidf::parse(bad).is_err());
    }
}
