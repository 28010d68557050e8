//! Queue message types.

use serde::{Deserialize, Serialize};

use crate::error::{QueueError, QueueResult};

/// Wire payload produced by the upload path and consumed by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUploadedMessage {
    /// Identifier of the record written at intake time
    pub video_id: String,
    /// Storage object key under which the original upload lives
    pub filename: String,
    /// Free-text discriminator; decoded and logged, not branched on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl VideoUploadedMessage {
    /// Create a new message.
    pub fn new(video_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            filename: filename.into(),
            event_type: None,
        }
    }

    /// Set the event type.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Decode and validate a JSON message body.
    ///
    /// Both `video_id` and `filename` are required for the pipeline to
    /// proceed; a body missing either is a validation failure, not a
    /// pipeline failure.
    pub fn decode(body: &str) -> QueueResult<Self> {
        let message: Self = serde_json::from_str(body)?;
        message.validate()?;
        Ok(message)
    }

    /// Check the required fields.
    pub fn validate(&self) -> QueueResult<()> {
        if self.video_id.trim().is_empty() {
            return Err(QueueError::invalid_message("video_id is required"));
        }
        if self.filename.trim().is_empty() {
            return Err(QueueError::invalid_message("filename is required"));
        }
        Ok(())
    }

    /// Encode to the JSON wire form.
    pub fn encode(&self) -> QueueResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One unit of work handed to the worker.
///
/// Carries the raw body (decoded by the handler, not the queue), the
/// stream id that doubles as the delete handle, and the delivery count
/// attribute for redelivery observability.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream entry id; required to ack the message
    pub message_id: String,
    /// Raw JSON body
    pub body: String,
    /// How many times this message has been delivered (1 = first delivery)
    pub delivery_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_valid_message() {
        let message =
            VideoUploadedMessage::decode(r#"{"video_id":"v1","filename":"a.mp4"}"#).unwrap();
        assert_eq!(message.video_id, "v1");
        assert_eq!(message.filename, "a.mp4");
        assert_eq!(message.event_type, None);
    }

    #[test]
    fn decode_keeps_event_type() {
        let message = VideoUploadedMessage::decode(
            r#"{"video_id":"v1","filename":"a.mp4","event_type":"video_uploaded"}"#,
        )
        .unwrap();
        assert_eq!(message.event_type.as_deref(), Some("video_uploaded"));
    }

    #[test]
    fn decode_rejects_missing_video_id() {
        let err = VideoUploadedMessage::decode(r#"{"filename":"a.mp4"}"#).unwrap_err();
        assert!(matches!(err, QueueError::Json(_)));
    }

    #[test]
    fn decode_rejects_empty_fields() {
        let err =
            VideoUploadedMessage::decode(r#"{"video_id":"","filename":"a.mp4"}"#).unwrap_err();
        assert!(matches!(err, QueueError::InvalidMessage(_)));

        let err =
            VideoUploadedMessage::decode(r#"{"video_id":"v1","filename":"  "}"#).unwrap_err();
        assert!(matches!(err, QueueError::InvalidMessage(_)));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(VideoUploadedMessage::decode("not json").is_err());
    }

    #[test]
    fn encode_round_trips() {
        let message = VideoUploadedMessage::new("v1", "a.mp4").with_event_type("video_uploaded");
        let body = message.encode().unwrap();
        assert_eq!(VideoUploadedMessage::decode(&body).unwrap(), message);
    }
}
