use crate::types::constants::BINARY_FRAME_SENTINEL;
use tokio_tungstenite::tungstenite::Message;

/// What the read loop should do with one frame from the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Deliver to `on_message` as-is
    Text(String),

    /// Non-text payload, delivered as [`BINARY_FRAME_SENTINEL`]
    Binary(usize),

    /// Hub started the close handshake
    Close { code: Option<u16>, reason: String },

    /// Ping, pong or raw frame; handled by the transport
    Control,
}

impl InboundFrame {
    pub fn from_message(message: Message) -> Self {
        match message {
            Message::Text(text) => Self::Text(text.as_str().to_owned()),
            Message::Binary(data) => Self::Binary(data.len()),
            Message::Close(frame) => match frame {
                Some(close_frame) => Self::Close {
                    code: Some(u16::from(close_frame.code)),
                    reason: close_frame.reason.as_str().to_owned(),
                },
                None => Self::Close {
                    code: None,
                    reason: String::new(),
                },
            },
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Self::Control,
        }
    }

    /// Text handed to `on_message`, if this frame is one consumers see
    pub fn delivered_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => Some(BINARY_FRAME_SENTINEL),
            Self::Close { .. } | Self::Control => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn test_text_frame_passes_through_untouched() {
        let frame = InboundFrame::from_message(Message::Text(r#"{"hz":4.2}"#.into()));
        assert_eq!(frame.delivered_text(), Some(r#"{"hz":4.2}"#));
    }

    #[test]
    fn test_binary_frame_reports_sentinel() {
        let frame = InboundFrame::from_message(Message::Binary(vec![1u8, 2, 3].into()));
        assert_eq!(frame, InboundFrame::Binary(3));
        assert_eq!(frame.delivered_text(), Some("[binary]"));
    }

    #[test]
    fn test_close_frame_keeps_code_and_reason() {
        let frame = InboundFrame::from_message(Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "hub sleeping".into(),
        })));
        assert_eq!(
            frame,
            InboundFrame::Close {
                code: Some(1001),
                reason: "hub sleeping".to_string()
            }
        );
        assert_eq!(frame.delivered_text(), None);
    }

    #[test]
    fn test_control_frames_are_not_delivered() {
        let ping = InboundFrame::from_message(Message::Ping(vec![0u8].into()));
        let pong = InboundFrame::from_message(Message::Pong(Vec::<u8>::new().into()));
        assert_eq!(ping, InboundFrame::Control);
        assert_eq!(pong.delivered_text(), None);
    }
}
