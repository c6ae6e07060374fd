//! Items handed to a curation task.

use crate::batch::DEFAULT_OWNER;
use crate::core::ScanRequest;

/// An item and its attachments, in the order they are to be scanned.
#[derive(Debug, Default)]
pub struct CurationItem {
    /// Persistent handle of the item; `None` while it sits in a workflow.
    pub handle: Option<String>,
    /// Byte sources to scan.
    pub attachments: Vec<ScanRequest>,
}

impl CurationItem {
    /// Creates an item with a handle and no attachments.
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: Some(handle.into()),
            attachments: Vec::new(),
        }
    }

    /// Creates an item that has no handle yet.
    pub fn in_workflow() -> Self {
        Self::default()
    }

    /// Appends an attachment.
    pub fn with_attachment(mut self, request: ScanRequest) -> Self {
        self.attachments.push(request);
        self
    }

    /// Name used for the item in reports.
    pub fn owner(&self) -> &str {
        self.handle.as_deref().unwrap_or(DEFAULT_OWNER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_falls_back_for_workflow_items() {
        assert_eq!(CurationItem::new("123456789/42").owner(), "123456789/42");
        assert_eq!(CurationItem::in_workflow().owner(), "in workflow");
    }
}
