//! Tests for serialization format names

use crate::schema::Format;

// =============================================================================
// Format::from_name tests
// =============================================================================

#[test]
fn test_format_from_name_dynamic() {
    assert_eq!(Format::from_name("json"), Some(Format::Dynamic));
    assert_eq!(Format::from_name("dynamic"), Some(Format::Dynamic));
}

#[test]
fn test_format_from_name_full() {
    assert_eq!(Format::from_name("pb"), Some(Format::Full));
    assert_eq!(Format::from_name("full"), Some(Format::Full));
}

#[test]
fn test_format_from_name_compact() {
    assert_eq!(Format::from_name("spb"), Some(Format::Compact));
    assert_eq!(Format::from_name("compact"), Some(Format::Compact));
}

#[test]
fn test_format_from_name_is_exact() {
    assert_eq!(Format::from_name("JSON"), None);
    assert_eq!(Format::from_name(" pb"), None);
    assert_eq!(Format::from_name(""), None);
}

// =============================================================================
// Round trip between names and variants
// =============================================================================

#[test]
fn test_every_name_parses() {
    for name in Format::NAMES {
        assert!(name.parse::<Format>().is_ok(), "{name} should parse");
    }
}

#[test]
fn test_canonical_name() {
    for format in [Format::Dynamic, Format::Full, Format::Compact] {
        assert_eq!(Format::from_name(format.as_str()), Some(format));
        assert_eq!(format.to_string(), format.as_str());
    }
}

#[test]
fn test_is_binary() {
    assert!(!Format::Dynamic.is_binary());
    assert!(Format::Full.is_binary());
    assert!(Format::Compact.is_binary());
}
