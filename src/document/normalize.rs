//! Repair pass that brings documents written by older app versions up to the
//! current schema.
//!
//! The pass works on the raw element tree so unknown content survives, and it
//! is idempotent: a second run on its own output reports no repairs.

use std::fmt;

use crate::constants::DEFAULT_READONLY_CODE;

use super::error::DocumentError;
use super::xml::XmlElement;

/// Name of the root element.
pub const ROOT: &str = "xia";

/// Top-level text fields backfilled when missing.
const TEXT_FIELDS: [&str; 4] = ["title", "creator", "rights", "description"];

/// One change made by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// A missing element was created
    AddedElement(String),
    /// A missing attribute was added to an element
    AddedAttribute { element: String, attribute: String },
    /// An unusable value was replaced with its default
    ResetValue { element: String, value: String },
    /// Legacy `author` was renamed to `creator`
    MigratedAuthor,
    /// A `detail` lacked `locked` or `constraint`
    DetailDefaults { tag: String, attribute: String },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::AddedElement(name) => write!(f, "added <{}>", name),
            Repair::AddedAttribute { element, attribute } => {
                write!(f, "added {}@{}", element, attribute)
            }
            Repair::ResetValue { element, value } => {
                write!(f, "reset <{}> value {:?}", element, value)
            }
            Repair::MigratedAuthor => write!(f, "migrated <author> to <creator>"),
            Repair::DetailDefaults { tag, attribute } => {
                write!(f, "detail {} defaulted {}", tag, attribute)
            }
        }
    }
}

fn is_bool(value: &str) -> bool {
    matches!(value, "true" | "false")
}

/// Repair `root` in place and return the list of changes made.
pub fn normalize(root: &mut XmlElement) -> Result<Vec<Repair>, DocumentError> {
    if root.name != ROOT {
        return Err(DocumentError::malformed(format!(
            "root element is <{}>, expected <{}>",
            root.name, ROOT
        )));
    }

    let mut repairs = Vec::new();
    repair_readonly(root, &mut repairs);
    repair_image(root, &mut repairs);
    repair_details(root, &mut repairs);
    repair_text_fields(root, &mut repairs);

    for repair in &repairs {
        log::debug!("Normalize: {}", repair);
    }
    Ok(repairs)
}

fn repair_readonly(root: &mut XmlElement, repairs: &mut Vec<Repair>) {
    match root.child_mut("readonly") {
        Some(readonly) => {
            let value = readonly.text.trim();
            if !is_bool(value) {
                repairs.push(Repair::ResetValue {
                    element: "readonly".to_string(),
                    value: readonly.text.clone(),
                });
                readonly.text = "false".to_string();
            } else if value.len() != readonly.text.len() {
                readonly.text = value.to_string();
            }
        }
        None => {
            root.children.push(
                XmlElement::new("readonly")
                    .with_attr("code", DEFAULT_READONLY_CODE)
                    .with_text("false"),
            );
            repairs.push(Repair::AddedElement("readonly".to_string()));
        }
    }
}

fn repair_image(root: &mut XmlElement, repairs: &mut Vec<Repair>) {
    match root.child_mut("image") {
        Some(image) => {
            for attribute in ["title", "desctription"] {
                if image.attr(attribute).is_none() {
                    image.set_attr(attribute, "");
                    repairs.push(Repair::AddedAttribute {
                        element: "image".to_string(),
                        attribute: attribute.to_string(),
                    });
                }
            }
        }
        None => {
            root.children.push(
                XmlElement::new("image")
                    .with_attr("title", "")
                    .with_attr("desctription", ""),
            );
            repairs.push(Repair::AddedElement("image".to_string()));
        }
    }
}

fn repair_details(root: &mut XmlElement, repairs: &mut Vec<Repair>) {
    let details = match root.child_mut("details") {
        Some(details) => details,
        None => {
            root.children
                .push(XmlElement::new("details").with_attr("show", "true"));
            repairs.push(Repair::AddedElement("details".to_string()));
            return;
        }
    };

    match details.attr("show") {
        Some(show) if is_bool(show) => {}
        Some(show) => {
            repairs.push(Repair::ResetValue {
                element: "details".to_string(),
                value: show.to_string(),
            });
            details.set_attr("show", "true");
        }
        None => {
            details.set_attr("show", "true");
            repairs.push(Repair::AddedAttribute {
                element: "details".to_string(),
                attribute: "show".to_string(),
            });
        }
    }

    for detail in details.children_named_mut("detail") {
        let tag = detail.attr("tag").unwrap_or("?").to_string();
        for (attribute, default) in [("locked", "false"), ("constraint", "polygon")] {
            if detail.attr(attribute).is_none() {
                detail.set_attr(attribute, default);
                repairs.push(Repair::DetailDefaults {
                    tag: tag.clone(),
                    attribute: attribute.to_string(),
                });
            }
        }
    }
}

fn repair_text_fields(root: &mut XmlElement, repairs: &mut Vec<Repair>) {
    if root.child("creator").is_none() {
        if let Some(author) = root.child("author") {
            let creator = XmlElement::new("creator").with_text(author.text.clone());
            root.remove_children("author");
            root.children.push(creator);
            repairs.push(Repair::MigratedAuthor);
        }
    }

    for field in TEXT_FIELDS {
        if root.child(field).is_none() {
            root.children.push(XmlElement::new(field));
            repairs.push(Repair::AddedElement(field.to_string()));
        }
    }
}
