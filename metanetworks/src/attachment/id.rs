use std::fmt;
use std::str::FromStr;

use super::AttachmentError;

/// Separator between parent and element in an attachment ID. Not escaped.
pub const SEPARATOR: char = '_';

/// Composite handle `"<parent_id>_<element_id>"` for an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentId {
    pub parent_id: String,
    pub element_id: String,
}

impl AttachmentId {
    /// Build an ID that is guaranteed to parse back into the same pair.
    pub fn new(
        parent_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> Result<Self, AttachmentError> {
        let parent_id = parent_id.into();
        let element_id = element_id.into();

        for (name, value) in [("parent id", &parent_id), ("network element id", &element_id)] {
            if value.is_empty() {
                return Err(AttachmentError::InvalidArgument(format!(
                    "{} must not be empty",
                    name
                )));
            }
            if value.contains(SEPARATOR) {
                return Err(AttachmentError::MalformedIdentifier(format!(
                    "{} {:?} contains the separator {:?}",
                    name, value, SEPARATOR
                )));
            }
        }

        Ok(Self {
            parent_id,
            element_id,
        })
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.parent_id, SEPARATOR, self.element_id)
    }
}

impl FromStr for AttachmentId {
    type Err = AttachmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        match parts.as_slice() {
            [parent, element] if !parent.is_empty() && !element.is_empty() => Ok(Self {
                parent_id: parent.to_string(),
                element_id: element.to_string(),
            }),
            _ => Err(AttachmentError::MalformedIdentifier(format!(
                "expected <parent_id>{}<network_element_id>, got {:?}",
                SEPARATOR, s
            ))),
        }
    }
}
