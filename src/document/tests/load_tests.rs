//! Tests for loading legacy and damaged documents.

use crate::document::{Document, DocumentError, Repair};
use crate::geometry::Point;
use crate::model::{Constraint, EditError, Region};

/// A document as written by the very first app versions.
const LEGACY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xia>
  <title>Cathedral</title>
  <author>Jane</author>
  <details>
    <detail tag="100" zoom="true" title="Rose window" path="10;10 50;10 30;40">The big one</detail>
  </details>
</xia>"#;

#[test]
fn test_load_legacy_document() {
    let (doc, repairs) = Document::from_xml_str_with_repairs(LEGACY_XML).unwrap();

    assert!(repairs.contains(&Repair::MigratedAuthor));
    assert_eq!(doc.title, "Cathedral");
    assert_eq!(doc.creator, "Jane");
    assert_eq!(doc.rights, "");
    assert!(!doc.is_read_only());
    assert_eq!(doc.readonly.code, "1234");
    assert!(doc.show_details);

    let region = doc.region(100).unwrap();
    assert_eq!(region.constraint(), Constraint::Polygon);
    assert!(!region.locked);
    assert!(region.zoom);
    assert_eq!(region.title, "Rose window");
    assert_eq!(region.description, "The big one");
    assert_eq!(
        region.points(),
        &[
            Point::new(10.0, 10.0),
            Point::new(50.0, 10.0),
            Point::new(30.0, 40.0)
        ]
    );
}

#[test]
fn test_bad_coordinates_are_set_aside() {
    let xml = r#"<xia><details show="true">
        <detail tag="100" path="1;1 5;1 3;4"/>
        <detail tag="101" path="1;1 oops;1 3;4">kept</detail>
    </details></xia>"#;
    let doc = Document::from_xml_str(xml).unwrap();

    assert_eq!(doc.region_count(), 1);
    assert_eq!(doc.rejected().len(), 1);
    let rejected = &doc.rejected()[0];
    assert_eq!(rejected.tag, Some(101));
    assert!(rejected.reason.contains("oops"));

    // Never reuse the tag of a set-aside detail
    assert_eq!(doc.next_tag().unwrap(), 102);

    // Written back unchanged
    let saved = doc.to_xml_string().unwrap();
    assert!(saved.contains("1;1 oops;1 3;4"));
}

#[test]
fn test_small_regions_are_dropped() {
    let xml = r#"<xia><details show="true">
        <detail tag="100" path="1;1 5;1"/>
        <detail tag="101" path=""/>
    </details></xia>"#;
    let doc = Document::from_xml_str(xml).unwrap();
    assert_eq!(doc.region_count(), 0);
    assert!(doc.rejected().is_empty());
    assert_eq!(doc.next_tag().unwrap(), 100);
}

#[test]
fn test_invalid_details_rejected() {
    let xml = r#"<xia><details show="true">
        <detail tag="100" path="1;1 5;1 3;4"/>
        <detail tag="100" path="2;2 6;2 4;5"/>
        <detail tag="abc" path="1;1 5;1 3;4"/>
        <detail tag="102" constraint="circle" path="1;1 5;1 3;4"/>
        <detail tag="103" constraint="rectangle" path="1;1 5;1 5;5"/>
        <detail tag="0" path="1;1 5;1 3;4"/>
        <detail tag="4294967295" path="1;1 5;1 3;4"/>
    </details></xia>"#;
    let doc = Document::from_xml_str(xml).unwrap();

    assert_eq!(doc.region_count(), 1);
    assert_eq!(doc.region(100).unwrap().point(0), Some(Point::new(1.0, 1.0)));

    let tags: Vec<_> = doc.rejected().iter().map(|r| r.tag).collect();
    assert_eq!(tags, vec![Some(100), None, Some(102), Some(103), None, None]);
    assert!(doc.rejected()[5].reason.contains("out of range"));
    assert_eq!(doc.next_tag().unwrap(), 104);
}

#[test]
fn test_tag_space_exhausted() {
    let mut doc = Document::blank();
    let last = Region::with_points(
        u32::MAX,
        Constraint::Polygon,
        vec![Point::new(1.0, 1.0), Point::new(5.0, 1.0), Point::new(3.0, 4.0)],
    )
    .unwrap();
    doc.insert_region(last);

    assert!(matches!(doc.next_tag(), Err(EditError::InvalidOperation { .. })));
}

#[test]
fn test_read_only_flag() {
    let xml = r#"<xia><readonly code="0042">true</readonly></xia>"#;
    let doc = Document::from_xml_str(xml).unwrap();
    assert!(doc.is_read_only());
    assert_eq!(doc.readonly.code, "0042");
}

#[test]
fn test_show_details_false() {
    let doc = Document::from_xml_str(r#"<xia><details show="false"/></xia>"#).unwrap();
    assert!(!doc.show_details);
}

#[test]
fn test_broken_files() {
    assert!(matches!(
        Document::from_xml_str("<xia><title>"),
        Err(DocumentError::Malformed { .. }) | Err(DocumentError::Xml(_))
    ));
    assert!(matches!(
        Document::from_xml_str("<annotation/>"),
        Err(DocumentError::Malformed { .. })
    ));
    assert!(Document::from_xml_str("").is_err());
}

#[test]
fn test_next_tag() {
    let doc = Document::blank();
    assert_eq!(doc.next_tag().unwrap(), 100);

    let xml = r#"<xia><details show="true">
        <detail tag="7" path="1;1 5;1 3;4"/>
        <detail tag="250" path="1;1 5;1 3;4"/>
    </details></xia>"#;
    let doc = Document::from_xml_str(xml).unwrap();
    assert_eq!(doc.next_tag().unwrap(), 251);
}
