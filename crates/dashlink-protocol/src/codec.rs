//! Codec trait and the text implementation used on the wire.
//!
//! A "codec" (coder/decoder) converts between [`Message`] values and the
//! raw bytes of one datagram. The session and client layers only see the
//! [`Codec`] trait, so the text format stays in this file.

use dashlink_transport::MAX_DATAGRAM_SIZE;

use crate::wire::{WireMessage, WireWriter};
use crate::{Message, ObstacleKind, ObstacleState, PlayerId, PlayerState, ProtocolError};

/// Converts messages to datagram payloads and back.
///
/// `Send + Sync + 'static` because the codec is shared between the
/// receiving task and the consumer's sending thread.
pub trait Codec: Send + Sync + 'static {
    /// Encodes one message into a datagram payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::TooLarge`] if the payload would not fit
    /// in one datagram.
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError>;

    /// Decodes one datagram payload.
    ///
    /// Decoding is all-or-nothing: either every required field is present
    /// and valid, or an error is returned and nothing is produced.
    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError>;
}

// ---------------------------------------------------------------------------
// TextCodec
// ---------------------------------------------------------------------------

/// The `COMMAND;key=value` text codec.
///
/// ## Example
///
/// ```rust
/// use dashlink_protocol::{Codec, Message, PlayerId, PlayerState, TextCodec};
///
/// let codec = TextCodec;
/// let state = PlayerState::new(PlayerId(2), 140.5, 40.0, true);
///
/// let bytes = codec.encode(&Message::State(state)).unwrap();
/// assert_eq!(bytes, b"STATE;id=2;x=140.5;y=40;duck=1");
///
/// let decoded = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, Message::State(state));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    fn render(message: &Message) -> String {
        let writer = WireWriter::new(message.command());
        match message {
            Message::Join | Message::Ready | Message::Start => writer.finish(),
            Message::Assign { id } => writer.field("id", id.0).finish(),
            Message::Count { players } => writer.field("players", players).finish(),
            Message::State(state) => writer
                .field("id", state.player_id.0)
                .field("x", state.x)
                .field("y", state.y)
                .field("duck", u8::from(state.ducking))
                .finish(),
            Message::Obstacle(obstacle) => writer
                .field("x", obstacle.x)
                .field("y", obstacle.y)
                .field("w", obstacle.width)
                .field("h", obstacle.height)
                .field("t", obstacle.kind.wire_tag())
                .finish(),
        }
    }

    fn parse(wire: &WireMessage<'_>) -> Result<Message, ProtocolError> {
        match wire.command {
            "JOIN" => Ok(Message::Join),
            "READY" => Ok(Message::Ready),
            "START" => Ok(Message::Start),
            "ASSIGN" => {
                let raw: u8 = wire.require("ASSIGN", "id")?;
                if raw == 0 || raw > PlayerId::MAX {
                    return Err(invalid("ASSIGN", "id", raw));
                }
                Ok(Message::Assign { id: PlayerId(raw) })
            }
            "COUNT" => Ok(Message::Count {
                players: wire.require("COUNT", "players")?,
            }),
            "STATE" => {
                let raw_id: u8 = wire.require("STATE", "id")?;
                if raw_id > PlayerId::MAX {
                    return Err(invalid("STATE", "id", raw_id));
                }
                let x = wire.require_finite("STATE", "x")?;
                let y = wire.require_finite("STATE", "y")?;
                let duck: u8 = wire.require("STATE", "duck")?;
                let ducking = match duck {
                    0 => false,
                    1 => true,
                    other => return Err(invalid("STATE", "duck", other)),
                };
                Ok(Message::State(PlayerState::new(PlayerId(raw_id), x, y, ducking)))
            }
            "OBST" => {
                let x = wire.require_finite("OBST", "x")?;
                let y = wire.require_finite("OBST", "y")?;
                let width = wire.require_finite("OBST", "w")?;
                let height = wire.require_finite("OBST", "h")?;
                let tag: u8 = wire.require("OBST", "t")?;
                let kind = ObstacleKind::from_wire_tag(tag)
                    .ok_or_else(|| invalid("OBST", "t", tag))?;
                Ok(Message::Obstacle(ObstacleState {
                    x,
                    y,
                    width,
                    height,
                    kind,
                }))
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

fn invalid(command: &'static str, key: &'static str, value: impl ToString) -> ProtocolError {
    ProtocolError::InvalidField {
        command,
        key,
        value: value.to_string(),
    }
}

impl Codec for TextCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let text = Self::render(message);
        if text.len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::TooLarge {
                len: text.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }
        Ok(text.into_bytes())
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let text = std::str::from_utf8(data).map_err(|_| ProtocolError::NotUtf8)?;
        let wire = WireMessage::parse(text)?;
        Self::parse(&wire)
    }
}
