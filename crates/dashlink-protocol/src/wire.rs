//! The raw text layer: `COMMAND;key=value;key=value`.
//!
//! A [`WireMessage`] is the parsed-but-untyped form of one datagram. It
//! borrows from the datagram text and lives only for the duration of a
//! decode. The typed conversion (and all validation) happens in the
//! codec.

use std::collections::HashMap;
use std::fmt::{Display, Write};
use std::str::FromStr;

use crate::ProtocolError;

/// Separates the command from the fields and fields from each other.
pub(crate) const FIELD_DELIMITER: char = ';';
/// Separates a key from its value.
pub(crate) const KEY_VALUE_DELIMITER: char = '=';

/// One datagram split into its command token and `key=value` fields.
#[derive(Debug)]
pub(crate) struct WireMessage<'a> {
    pub(crate) command: &'a str,
    fields: HashMap<&'a str, &'a str>,
}

impl<'a> WireMessage<'a> {
    /// Splits `text` into a command and a field map.
    ///
    /// Segments without a `=` are ignored, and when a key repeats the
    /// first occurrence wins. No escaping exists: a value simply ends at
    /// the next `;` or at the end of the text.
    pub(crate) fn parse(text: &'a str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let mut segments = text.split(FIELD_DELIMITER);
        let command = segments.next().unwrap_or_default().trim();

        let mut fields = HashMap::new();
        for segment in segments {
            if let Some((key, value)) = segment.split_once(KEY_VALUE_DELIMITER) {
                fields.entry(key.trim()).or_insert(value.trim());
            }
        }

        Ok(Self { command, fields })
    }

    /// Looks up a required field and parses it as `T`.
    pub(crate) fn require<T: FromStr>(
        &self,
        command: &'static str,
        key: &'static str,
    ) -> Result<T, ProtocolError> {
        let raw = self
            .fields
            .get(key)
            .ok_or(ProtocolError::MissingField { command, key })?;
        raw.parse().map_err(|_| ProtocolError::InvalidField {
            command,
            key,
            value: (*raw).to_string(),
        })
    }

    /// Like [`require`](Self::require) for coordinates and sizes: the
    /// value must also be finite.
    pub(crate) fn require_finite(
        &self,
        command: &'static str,
        key: &'static str,
    ) -> Result<f32, ProtocolError> {
        let value: f32 = self.require(command, key)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ProtocolError::InvalidField {
                command,
                key,
                value: value.to_string(),
            })
        }
    }
}

/// Builds an outgoing message by plain concatenation.
pub(crate) struct WireWriter {
    buf: String,
}

impl WireWriter {
    pub(crate) fn new(command: &str) -> Self {
        Self {
            buf: command.to_string(),
        }
    }

    pub(crate) fn field(mut self, key: &str, value: impl Display) -> Self {
        // Writing into a String cannot fail.
        let _ = write!(
            self.buf,
            "{FIELD_DELIMITER}{key}{KEY_VALUE_DELIMITER}{value}"
        );
        self
    }

    pub(crate) fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_only() {
        let msg = WireMessage::parse("START").unwrap();
        assert_eq!(msg.command, "START");
    }

    #[test]
    fn test_parse_fields_in_any_order() {
        let msg = WireMessage::parse("STATE;y=40;duck=1;x=140.0;id=2").unwrap();
        assert_eq!(msg.command, "STATE");
        assert_eq!(msg.require::<u8>("STATE", "id").unwrap(), 2);
        assert_eq!(msg.require::<f32>("STATE", "x").unwrap(), 140.0);
    }

    #[test]
    fn test_parse_trims_surrounding_whitespace() {
        let msg = WireMessage::parse("  COUNT;players=2\n").unwrap();
        assert_eq!(msg.command, "COUNT");
        assert_eq!(msg.require::<u32>("COUNT", "players").unwrap(), 2);
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert_eq!(WireMessage::parse("   ").unwrap_err(), ProtocolError::Empty);
    }

    #[test]
    fn test_first_duplicate_key_wins() {
        let msg = WireMessage::parse("ASSIGN;id=1;id=2").unwrap();
        assert_eq!(msg.require::<u8>("ASSIGN", "id").unwrap(), 1);
    }

    #[test]
    fn test_segment_without_equals_is_ignored() {
        let msg = WireMessage::parse("COUNT;garbage;players=3").unwrap();
        assert_eq!(msg.require::<u32>("COUNT", "players").unwrap(), 3);
    }

    #[test]
    fn test_require_missing_key() {
        let msg = WireMessage::parse("ASSIGN").unwrap();
        assert_eq!(
            msg.require::<u8>("ASSIGN", "id").unwrap_err(),
            ProtocolError::MissingField {
                command: "ASSIGN",
                key: "id"
            }
        );
    }

    #[test]
    fn test_require_finite_rejects_nan() {
        let msg = WireMessage::parse("STATE;x=NaN").unwrap();
        assert!(matches!(
            msg.require_finite("STATE", "x"),
            Err(ProtocolError::InvalidField { key: "x", .. })
        ));
    }

    #[test]
    fn test_writer_concatenates_fields() {
        let text = WireWriter::new("OBST")
            .field("x", 800)
            .field("t", 0)
            .finish();
        assert_eq!(text, "OBST;x=800;t=0");
    }
}
