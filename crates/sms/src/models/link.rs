//! Links between SMS records and business records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SmsError;

/// An existing link annotation as reported by the backend
///
/// The backend may report any doctype here (inbound messages get linked
/// automatically), so this is deliberately looser than [`LinkTarget`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLink {
    pub doctype: String,
    pub name: String,
}

impl RecordLink {
    pub fn new(doctype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            doctype: doctype.into(),
            name: name.into(),
        }
    }

    /// Build a link from the optional wire pair, requiring both halves
    pub fn from_parts(doctype: Option<String>, name: Option<String>) -> Option<Self> {
        match (doctype, name) {
            (Some(doctype), Some(name)) if !doctype.is_empty() && !name.is_empty() => {
                Some(Self { doctype, name })
            }
            _ => None,
        }
    }

    /// Display label, e.g. "Customer: CUST-001"
    pub fn label(&self) -> String {
        format!("{}: {}", self.doctype, self.name)
    }
}

impl From<LinkTarget> for RecordLink {
    fn from(target: LinkTarget) -> Self {
        Self {
            doctype: target.record_type.as_str().to_string(),
            name: target.name,
        }
    }
}

/// Record types a conversation or message can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Opportunity,
    Lead,
    Project,
    Customer,
    Contact,
}

impl RecordType {
    /// All accepted targets, in the order offered to the user
    pub const ALL: [RecordType; 5] = [
        RecordType::Opportunity,
        RecordType::Lead,
        RecordType::Project,
        RecordType::Customer,
        RecordType::Contact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Opportunity => "Opportunity",
            RecordType::Lead => "Lead",
            RecordType::Project => "Project",
            RecordType::Customer => "Customer",
            RecordType::Contact => "Contact",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = SmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SmsError::invalid_input(format!("Invalid target doctype: {s}")))
    }
}

/// A user-chosen attach target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub record_type: RecordType,
    pub name: String,
}

impl LinkTarget {
    /// Both fields are required; the name is trimmed
    pub fn new(record_type: RecordType, name: impl Into<String>) -> Result<Self, SmsError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(SmsError::invalid_input("Record is required"));
        }
        Ok(Self { record_type, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parse() {
        assert_eq!("Customer".parse::<RecordType>().unwrap(), RecordType::Customer);
        assert_eq!(" lead ".parse::<RecordType>().unwrap(), RecordType::Lead);
        let err = "Invoice".parse::<RecordType>().unwrap_err();
        assert_eq!(err.user_message(), "Invalid target doctype: Invoice");
    }

    #[test]
    fn test_link_target_requires_name() {
        assert!(LinkTarget::new(RecordType::Project, "  ").is_err());
        let target = LinkTarget::new(RecordType::Project, " PROJ-0007 ").unwrap();
        assert_eq!(target.name, "PROJ-0007");
    }

    #[test]
    fn test_record_link_from_parts() {
        assert!(RecordLink::from_parts(Some("Lead".into()), None).is_none());
        assert!(RecordLink::from_parts(Some(String::new()), Some("L-1".into())).is_none());
        let link = RecordLink::from_parts(Some("Lead".into()), Some("L-1".into())).unwrap();
        assert_eq!(link.label(), "Lead: L-1");
    }
}
