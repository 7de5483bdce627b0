use crate::elements::error::{IdentifierMismatch, SourceError};
use crate::elements::types::OrbitalElementSet;

pub struct ParsedElements {
    pub elements: OrbitalElementSet,
    pub mismatch: Option<IdentifierMismatch>,
}

/// Parse a source payload into an element set for `catalog_id`.
///
/// Blank lines are ignored. The first block made of either two lines
/// (`"1 "`, `"2 "`) or a name followed by those two lines is used. The
/// catalog number embedded in line 1 is compared with the requested one; a
/// difference is reported in [`ParsedElements::mismatch`] and the payload is
/// still accepted.
pub fn parse_element_set(content: &str, catalog_id: u32) -> Result<ParsedElements, SourceError> {
    let (name, line1, line2) = find_block(content).ok_or_else(|| {
        SourceError::InvalidFormat(format!(
            "expected two TLE lines, got {:?}",
            first_line(content)
        ))
    })?;

    let embedded = embedded_catalog_id(&line1)?;

    // Rejects bad checksums and malformed fields.
    let decoded = sgp4::Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())?;
    if decoded.norad_id != embedded as u64 {
        return Err(SourceError::InvalidFormat(format!(
            "line 1 carries catalog id {} but elements decode to {}",
            embedded, decoded.norad_id
        )));
    }

    let mismatch = (embedded != catalog_id).then_some(IdentifierMismatch {
        requested: catalog_id,
        embedded,
    });

    let name = name.unwrap_or_else(|| format!("NORAD {}", embedded));

    Ok(ParsedElements {
        elements: OrbitalElementSet {
            name,
            catalog_id: embedded,
            line1,
            line2,
        },
        mismatch,
    })
}

fn find_block(content: &str) -> Option<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut i = 0;
    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            return Some((None, lines[i].to_string(), lines[i + 1].to_string()));
        }
        if i + 2 < lines.len() && lines[i + 1].starts_with("1 ") && lines[i + 2].starts_with("2 ")
        {
            // 3LE files prefix the name line with "0 "
            let name = lines[i].strip_prefix("0 ").unwrap_or(lines[i]).trim();
            return Some((
                Some(name.to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
        }
        i += 1;
    }
    None
}

fn embedded_catalog_id(line1: &str) -> Result<u32, SourceError> {
    line1
        .get(2..7)
        .map(str::trim)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SourceError::InvalidFormat(format!("no catalog id in {:?}", line1)))
}

fn first_line(content: &str) -> &str {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const ISS_NAME: &str = "ISS (ZARYA)";
    pub const ISS_LINE1: &str =
        "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
    pub const ISS_LINE2: &str =
        "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    pub fn iss_payload() -> String {
        format!("{}\n{}\n{}\n", ISS_NAME, ISS_LINE1, ISS_LINE2)
    }

    #[test]
    fn parses_three_line_block() {
        let parsed = parse_element_set(&iss_payload(), 25544).unwrap();
        assert_eq!(parsed.elements.name, ISS_NAME);
        assert_eq!(parsed.elements.catalog_id, 25544);
        assert_eq!(parsed.elements.line1, ISS_LINE1);
        assert!(parsed.mismatch.is_none());
    }

    #[test]
    fn parses_two_lines_with_blank_padding() {
        let payload = format!("\n\n  {}  \n\n{}\n\n", ISS_LINE1, ISS_LINE2);
        let parsed = parse_element_set(&payload, 25544).unwrap();
        assert_eq!(parsed.elements.name, "NORAD 25544");
        assert_eq!(parsed.elements.line2, ISS_LINE2);
    }

    #[test]
    fn strips_3le_name_prefix() {
        let payload = format!("0 ISS (ZARYA)\n{}\n{}", ISS_LINE1, ISS_LINE2);
        let parsed = parse_element_set(&payload, 25544).unwrap();
        assert_eq!(parsed.elements.name, ISS_NAME);
    }

    #[test]
    fn mismatched_catalog_id_is_a_warning() {
        let parsed = parse_element_set(&iss_payload(), 99999).unwrap();
        assert_eq!(
            parsed.mismatch,
            Some(IdentifierMismatch {
                requested: 99999,
                embedded: 25544
            })
        );
        assert_eq!(parsed.elements.catalog_id, 25544);
    }

    #[test]
    fn rejects_payload_without_tle_lines() {
        let err = parse_element_set("No GP data found", 25544).err().unwrap();
        assert!(matches!(err, SourceError::InvalidFormat(_)));
    }

    #[test]
    fn rejects_swapped_line_prefixes() {
        let payload = format!("{}\n{}", ISS_LINE2, ISS_LINE1);
        assert!(parse_element_set(&payload, 25544).is_err());
    }
}
