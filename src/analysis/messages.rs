//! Problems found while applying project data to an analysis.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::OffsetFmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// A label sits on a byte that does not start a line
    HiddenLabel,
    InvalidOffsetOrLength,
    InvalidDescriptor,
    /// A second label for an offset that already has one
    DuplicateLabel,
}

/// What the analyzer did about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    None,
    LabelIgnored,
    FormatDescriptorIgnored,
}

macro_rules! display_as_debug {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Debug::fmt(self, f)
                }
            }
        )*
    };
}

display_as_debug!(Severity, MessageType, Resolution);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub severity: Severity,
    pub offset: usize,
    pub msg_type: MessageType,
    /// Free-form detail: the label, the descriptor, the conflicting lengths
    pub context: String,
    pub resolution: Resolution,
}

impl MessageEntry {
    pub fn new(
        severity: Severity,
        offset: usize,
        msg_type: MessageType,
        context: impl Into<String>,
        resolution: Resolution,
    ) -> Self {
        Self {
            severity,
            offset,
            msg_type,
            context: context.into(),
            resolution,
        }
    }
}

impl fmt::Display for MessageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}({}): {}",
            self.severity,
            OffsetFmt(self.offset),
            self.msg_type,
            self.context,
            self.resolution
        )
    }
}

/// Ordered collection of [`MessageEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageList {
    entries: Vec<MessageEntry>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: MessageEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageEntry> {
        self.entries.iter()
    }

    /// Most severe first, then by offset.
    pub fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| b.severity.cmp(&a.severity).then(a.offset.cmp(&b.offset)));
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }
}

impl<'a> IntoIterator for &'a MessageList {
    type Item = &'a MessageEntry;
    type IntoIter = std::slice::Iter<'a, MessageEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(severity: Severity, offset: usize) -> MessageEntry {
        MessageEntry::new(
            severity,
            offset,
            MessageType::InvalidDescriptor,
            "x",
            Resolution::FormatDescriptorIgnored,
        )
    }

    #[test]
    fn test_sort_severity_then_offset() {
        let mut list = MessageList::new();
        list.add(entry(Severity::Info, 1));
        list.add(entry(Severity::Error, 9));
        list.add(entry(Severity::Warning, 5));
        list.add(entry(Severity::Error, 2));
        list.sort();
        let order: Vec<_> = list.iter().map(|e| (e.severity, e.offset)).collect();
        assert_eq!(
            order,
            vec![
                (Severity::Error, 2),
                (Severity::Error, 9),
                (Severity::Warning, 5),
                (Severity::Info, 1)
            ]
        );
        assert_eq!(list.count_by_severity(Severity::Error), 2);
    }

    #[test]
    fn test_display() {
        let e = MessageEntry::new(
            Severity::Warning,
            0x12,
            MessageType::HiddenLabel,
            "FOO",
            Resolution::LabelIgnored,
        );
        assert_eq!(e.to_string(), "Warning +000012 HiddenLabel(FOO): LabelIgnored");
    }

    #[test]
    fn test_serde_names() {
        let e = entry(Severity::Error, 3);
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"Error\""));
        assert!(json.contains("\"FormatDescriptorIgnored\""));
        let back: MessageEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
