//! Attribute-value marshaling for the video record shape.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};

use vidpipe_models::{VideoId, VideoRecord, VideoStatus};

use crate::error::{MetadataError, MetadataResult};

/// Marshal a record into a DynamoDB item.
pub fn to_item(record: &VideoRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();

    item.insert(
        "video_id".to_string(),
        AttributeValue::S(record.video_id.to_string()),
    );
    item.insert("title".to_string(), AttributeValue::S(record.title.clone()));
    item.insert(
        "description".to_string(),
        AttributeValue::S(record.description.clone()),
    );
    item.insert("url".to_string(), AttributeValue::S(record.url.clone()));
    item.insert(
        "tags".to_string(),
        AttributeValue::L(
            record
                .tags
                .iter()
                .map(|t| AttributeValue::S(t.clone()))
                .collect(),
        ),
    );
    item.insert(
        "upload_date".to_string(),
        AttributeValue::S(record.upload_date.to_rfc3339()),
    );
    item.insert(
        "status".to_string(),
        AttributeValue::S(record.status.as_str().to_string()),
    );

    if let Some(ref metadata) = record.metadata {
        let map = metadata
            .iter()
            .map(|(k, v)| (k.clone(), AttributeValue::S(v.clone())))
            .collect();
        item.insert("metadata".to_string(), AttributeValue::M(map));
    }

    item
}

/// Unmarshal a DynamoDB item into a record.
pub fn from_item(item: &HashMap<String, AttributeValue>) -> MetadataResult<VideoRecord> {
    let video_id = string_attr(item, "video_id")?;
    let upload_date = string_attr(item, "upload_date")?;
    let upload_date = DateTime::parse_from_rfc3339(&upload_date)
        .map_err(|e| MetadataError::marshal(format!("bad upload_date: {}", e)))?
        .with_timezone(&Utc);

    let tags = match item.get("tags") {
        Some(AttributeValue::L(list)) => list
            .iter()
            .filter_map(|v| v.as_s().ok().cloned())
            .collect(),
        _ => Vec::new(),
    };

    let metadata = match item.get("metadata") {
        Some(AttributeValue::M(map)) => Some(
            map.iter()
                .filter_map(|(k, v)| v.as_s().ok().map(|s| (k.clone(), s.clone())))
                .collect::<HashMap<_, _>>(),
        ),
        _ => None,
    };

    // Records written before the status field existed default to "uploaded".
    let status = item
        .get("status")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| VideoStatus::parse(s))
        .unwrap_or_default();

    Ok(VideoRecord {
        video_id: VideoId::from_string(video_id),
        title: string_attr(item, "title")?,
        description: string_attr(item, "description").unwrap_or_default(),
        url: string_attr(item, "url")?,
        tags,
        upload_date,
        metadata,
        status,
    })
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> MetadataResult<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| MetadataError::marshal(format!("missing string attribute '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> VideoRecord {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "upload-api".to_string());

        VideoRecord {
            video_id: VideoId::from_string("v1"),
            title: "clip.mp4".to_string(),
            description: "Transcoded and processed: outdoor sports".to_string(),
            url: "https://videos.s3.amazonaws.com/v1-clip.mp4".to_string(),
            tags: vec!["transcoded".to_string(), "ai-processed".to_string()],
            upload_date: Utc::now(),
            metadata: Some(metadata),
            status: VideoStatus::Processed,
        }
    }

    #[test]
    fn record_round_trips_through_item() {
        let record = sample_record();
        let item = to_item(&record);
        let decoded = from_item(&item).unwrap();

        assert_eq!(decoded.video_id, record.video_id);
        assert_eq!(decoded.title, record.title);
        assert_eq!(decoded.tags, record.tags);
        assert_eq!(decoded.status, record.status);
        assert_eq!(decoded.metadata, record.metadata);
        // RFC 3339 keeps sub-second precision
        assert_eq!(decoded.upload_date, record.upload_date);
    }

    #[test]
    fn missing_status_defaults_to_uploaded() {
        let record = sample_record();
        let mut item = to_item(&record);
        item.remove("status");

        let decoded = from_item(&item).unwrap();
        assert_eq!(decoded.status, VideoStatus::Uploaded);
    }

    #[test]
    fn missing_key_is_a_marshal_error() {
        let record = sample_record();
        let mut item = to_item(&record);
        item.remove("video_id");

        assert!(matches!(
            from_item(&item),
            Err(MetadataError::Marshal(_))
        ));
    }
}
