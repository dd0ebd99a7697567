//! Multi-field validation error accumulator.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::error::EntityValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    is_field: bool,
    messages: Vec<String>,
}

/// Collects validation errors so that one response can report every problem.
///
/// Field errors are grouped by field name. Errors that belong to no field are
/// keyed by their own message. Entries keep insertion order and a message is
/// never stored twice under the same key.
///
/// A notification is a plain value: validation steps return or fold one,
/// they never share a mutable instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    entries: Vec<Entry>,
}

impl Notification {
    /// Creates an empty notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message`, under `field` when given.
    pub fn add_error(&mut self, message: impl Into<String>, field: Option<&str>) {
        let message = message.into();
        match field {
            Some(field) => {
                let entry = self.entry_mut(field, true);
                if !entry.messages.contains(&message) {
                    entry.messages.push(message);
                }
            }
            None => {
                self.entry_mut(&message, false);
            }
        }
    }

    /// Builder form of [`Notification::add_error`].
    pub fn with_error(mut self, message: impl Into<String>, field: Option<&str>) -> Self {
        self.add_error(message, field);
        self
    }

    /// Replaces the messages stored for `field`.
    ///
    /// Without a field each message becomes its own non-field entry.
    pub fn set_error<I, S>(&mut self, messages: I, field: Option<&str>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match field {
            Some(field) => {
                let entry = self.entry_mut(field, true);
                entry.messages.clear();
                for message in messages {
                    let message = message.into();
                    if !entry.messages.contains(&message) {
                        entry.messages.push(message);
                    }
                }
            }
            None => {
                for message in messages {
                    self.add_error(message, None);
                }
            }
        }
    }

    /// Merges every error of `other` into `self` without duplicating messages.
    pub fn copy_errors(&mut self, other: &Notification) {
        for entry in &other.entries {
            if entry.is_field {
                for message in &entry.messages {
                    self.add_error(message.clone(), Some(&entry.key));
                }
            } else {
                self.add_error(entry.key.clone(), None);
            }
        }
    }

    /// Builder form of [`Notification::copy_errors`].
    pub fn merge(mut self, other: &Notification) -> Self {
        self.copy_errors(other);
        self
    }

    /// Returns true if any error has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Returns the messages recorded for `field`.
    pub fn field_errors(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.is_field && e.key == field)
            .map(|e| e.messages.as_slice())
    }

    /// Iterates `(key, messages)` pairs in insertion order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.messages.as_slice()))
    }

    /// Total number of messages across all keys.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.messages.len()).sum()
    }

    /// Returns true when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turns the notification into an error if it holds any message.
    pub fn into_result<T>(self, value: T) -> Result<T, EntityValidationError> {
        if self.has_errors() {
            Err(EntityValidationError::new(self))
        } else {
            Ok(value)
        }
    }

    fn entry_mut(&mut self, key: &str, is_field: bool) -> &mut Entry {
        let index = match self
            .entries
            .iter()
            .position(|e| e.is_field == is_field && e.key == key)
        {
            Some(index) => index,
            None => {
                self.entries.push(Entry {
                    key: key.to_string(),
                    is_field,
                    messages: if is_field {
                        Vec::new()
                    } else {
                        vec![key.to_string()]
                    },
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            for message in &entry.messages {
                if !first {
                    write!(f, "; ")?;
                }
                first = false;
                if entry.is_field {
                    write!(f, "{}: {}", entry.key, message)?;
                } else {
                    write!(f, "{message}")?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum EntryJson<'a> {
    Message(&'a str),
    Field(BTreeMap<&'a str, &'a [String]>),
}

/// Renders as a JSON array: non-field errors as strings, field errors as
/// `{ "field": ["message", ...] }` objects.
impl Serialize for Notification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<EntryJson<'_>> = self
            .entries
            .iter()
            .map(|e| {
                if e.is_field {
                    EntryJson::Field(BTreeMap::from([(e.key.as_str(), e.messages.as_slice())]))
                } else {
                    EntryJson::Message(e.key.as_str())
                }
            })
            .collect();
        entries.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_notification_is_empty() {
        let notification = Notification::new();
        assert!(!notification.has_errors());
        assert!(notification.is_empty());
        assert_eq!(notification.len(), 0);
    }

    #[test]
    fn field_errors_are_grouped_without_duplicates() {
        let mut notification = Notification::new();
        notification.add_error("title is too long", Some("title"));
        notification.add_error("title is too long", Some("title"));
        notification.add_error("title must not be empty", Some("title"));

        assert_eq!(
            notification.field_errors("title").unwrap(),
            ["title is too long", "title must not be empty"]
        );
        assert_eq!(notification.len(), 2);
    }

    #[test]
    fn non_field_errors_are_keyed_by_message() {
        let notification = Notification::new()
            .with_error("something broke", None)
            .with_error("something broke", None);

        let errors: Vec<_> = notification.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "something broke");
        assert!(notification.field_errors("something broke").is_none());
    }

    #[test]
    fn set_error_replaces_field_messages() {
        let mut notification = Notification::new().with_error("old", Some("name"));
        notification.set_error(["new", "newer"], Some("name"));
        assert_eq!(notification.field_errors("name").unwrap(), ["new", "newer"]);
    }

    #[test]
    fn copy_errors_merges_without_duplication() {
        let mut target = Notification::new().with_error("bad id", Some("category_ids"));
        let source = Notification::new()
            .with_error("bad id", Some("category_ids"))
            .with_error("other id", Some("category_ids"))
            .with_error("too long", Some("title"))
            .with_error("general", None);

        target.copy_errors(&source);

        assert_eq!(
            target.field_errors("category_ids").unwrap(),
            ["bad id", "other id"]
        );
        assert_eq!(target.field_errors("title").unwrap(), ["too long"]);
        assert_eq!(target.len(), 4);
    }

    #[test]
    fn into_result_fails_only_with_errors() {
        assert_eq!(Notification::new().into_result(5).unwrap(), 5);

        let err = Notification::new()
            .with_error("required", Some("title"))
            .into_result(5)
            .unwrap_err();
        assert_eq!(err.notification().field_errors("title").unwrap(), ["required"]);
    }

    #[test]
    fn serializes_field_and_plain_entries() {
        let notification = Notification::new()
            .with_error("required", Some("title"))
            .with_error("general failure", None);

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "title": ["required"] }, "general failure"])
        );
    }

    #[test]
    fn display_joins_messages() {
        let notification = Notification::new()
            .with_error("required", Some("title"))
            .with_error("general", None);
        assert_eq!(notification.to_string(), "title: required; general");
    }
}
