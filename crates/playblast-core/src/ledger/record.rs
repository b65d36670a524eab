//! Record layouts for the preview and publish ledgers.
//!
//! Preview line: `tag=number=note=user=artifact_path=classification`
//!
//! Publish line: `publish_tag=source_artifact_path=source_number=source_note=
//! source_tag=publish_artifact_path=publish_user=timestamp=classification`

use serde::{Deserialize, Serialize};

use super::DELIMITER;
use crate::error::{PlayblastError, Result};
use crate::version::{VersionKind, VersionTag};

/// A type that occupies exactly one ledger line.
pub trait LedgerRecord: Sized {
    /// Number of delimited fields in a well-formed line.
    const FIELD_COUNT: usize;

    /// Named fields in on-disk order.
    fn fields(&self) -> Vec<(&'static str, String)>;

    /// Rebuild a record from exactly [`Self::FIELD_COUNT`] fields.
    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String>;
}

/// Metadata written when a preview version is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRecord {
    pub version_tag: String,
    pub version_number: u32,
    pub note: String,
    pub user: String,
    pub artifact_path: String,
    pub classification: String,
}

impl LedgerRecord for PreviewRecord {
    const FIELD_COUNT: usize = 6;

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("version_tag", self.version_tag.clone()),
            ("version_number", self.version_number.to_string()),
            ("note", self.note.clone()),
            ("user", self.user.clone()),
            ("artifact_path", self.artifact_path.clone()),
            ("classification", self.classification.clone()),
        ]
    }

    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        let tag = parse_tag(fields[0], VersionKind::Preview)?;
        let version_number = parse_number(fields[1])?;
        if tag.number() != version_number {
            return Err(format!(
                "tag {} does not match version number {version_number}",
                fields[0]
            ));
        }
        Ok(Self {
            version_tag: fields[0].to_string(),
            version_number,
            note: fields[2].to_string(),
            user: fields[3].to_string(),
            artifact_path: fields[4].to_string(),
            classification: fields[5].trim_end().to_string(),
        })
    }
}

/// Metadata written when a preview is promoted into the publish tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub publish_tag: String,
    pub source_artifact_path: String,
    pub source_version_number: u32,
    pub source_note: String,
    pub source_version_tag: String,
    pub publish_artifact_path: String,
    pub publish_user: String,
    pub publish_timestamp: String,
    pub classification: String,
}

impl PublishRecord {
    /// One-line description used by history listings.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} by {} on {}",
            self.source_version_tag, self.classification, self.publish_user, self.publish_timestamp
        )
    }

    pub fn publish_number(&self) -> Option<u32> {
        self.publish_tag
            .parse::<VersionTag>()
            .ok()
            .map(|tag| tag.number())
    }
}

impl LedgerRecord for PublishRecord {
    const FIELD_COUNT: usize = 9;

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("publish_tag", self.publish_tag.clone()),
            ("source_artifact_path", self.source_artifact_path.clone()),
            ("source_version_number", self.source_version_number.to_string()),
            ("source_note", self.source_note.clone()),
            ("source_version_tag", self.source_version_tag.clone()),
            ("publish_artifact_path", self.publish_artifact_path.clone()),
            ("publish_user", self.publish_user.clone()),
            ("publish_timestamp", self.publish_timestamp.clone()),
            ("classification", self.classification.clone()),
        ]
    }

    fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
        parse_tag(fields[0], VersionKind::Publish)?;
        parse_tag(fields[4], VersionKind::Preview)?;
        Ok(Self {
            publish_tag: fields[0].to_string(),
            source_artifact_path: fields[1].to_string(),
            source_version_number: parse_number(fields[2])?,
            source_note: fields[3].to_string(),
            source_version_tag: fields[4].to_string(),
            publish_artifact_path: fields[5].to_string(),
            publish_user: fields[6].to_string(),
            publish_timestamp: fields[7].to_string(),
            classification: fields[8].trim_end().to_string(),
        })
    }
}

fn parse_tag(raw: &str, kind: VersionKind) -> std::result::Result<VersionTag, String> {
    let tag = raw
        .parse::<VersionTag>()
        .map_err(|_| format!("bad version tag {raw:?}"))?;
    if tag.kind() != kind {
        return Err(format!("expected a {} tag, got {raw:?}", kind.prefix()));
    }
    Ok(tag)
}

fn parse_number(raw: &str) -> std::result::Result<u32, String> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| format!("bad version number {raw:?}"))
}

/// Encode `record` as a single line, without the leading newline.
pub fn encode_record<R: LedgerRecord>(record: &R) -> Result<String> {
    let mut out = Vec::with_capacity(R::FIELD_COUNT);
    for (name, value) in record.fields() {
        if value.contains(DELIMITER) || value.contains(&['\n', '\r'][..]) {
            return Err(PlayblastError::InvalidRecordField { field: name, value });
        }
        out.push(value);
    }
    Ok(out.join(&DELIMITER.to_string()))
}

/// Parse one ledger line into a record.
pub fn parse_record<R: LedgerRecord>(line: &str) -> std::result::Result<R, String> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let fields: Vec<&str> = line.split(DELIMITER).collect();
    if fields.len() != R::FIELD_COUNT {
        return Err(format!(
            "expected {} fields, found {}",
            R::FIELD_COUNT,
            fields.len()
        ));
    }
    R::from_fields(&fields)
}

/// First preview record carrying `number`; earliest append wins on duplicates.
pub fn find_by_version_number(records: &[PreviewRecord], number: u32) -> Option<&PreviewRecord> {
    records.iter().find(|r| r.version_number == number)
}

/// First publish record whose tag is `v<number>`.
pub fn find_by_publish_number(records: &[PublishRecord], number: u32) -> Option<&PublishRecord> {
    records.iter().find(|r| r.publish_number() == Some(number))
}

/// Replace characters that would break the line format.
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            DELIMITER => '-',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(n: u32, note: &str) -> PreviewRecord {
        PreviewRecord {
            version_tag: format!("p{n:03}"),
            version_number: n,
            note: note.to_string(),
            user: "alice".to_string(),
            artifact_path: format!("/shots/preview/fx/alice/p{n:03}/scene_p{n:03}.$F3.png"),
            classification: "fx".to_string(),
        }
    }

    #[test]
    fn preview_line_layout() {
        let line = encode_record(&preview(3, "smoke pass")).unwrap();
        assert_eq!(
            line,
            "p003=3=smoke pass=alice=/shots/preview/fx/alice/p003/scene_p003.$F3.png=fx"
        );
    }

    #[test]
    fn preview_parse_tolerates_trailing_newline() {
        let rec: PreviewRecord =
            parse_record("p001=1==bob=/tmp/p001/x_p001.$F3.png=dust\n").unwrap();
        assert_eq!(rec.version_number, 1);
        assert_eq!(rec.note, "");
        assert_eq!(rec.classification, "dust");
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let err = parse_record::<PreviewRecord>("p001=1=note=alice=/tmp/x").unwrap_err();
        assert!(err.contains("expected 6 fields"));
    }

    #[test]
    fn mismatched_tag_and_number_is_rejected() {
        assert!(parse_record::<PreviewRecord>("p002=3=n=u=/p=fx").is_err());
        assert!(parse_record::<PreviewRecord>("v002=2=n=u=/p=fx").is_err());
        assert!(parse_record::<PreviewRecord>("p002=two=n=u=/p=fx").is_err());
    }

    #[test]
    fn delimiter_in_note_is_refused() {
        match encode_record(&preview(1, "a=b")) {
            Err(PlayblastError::InvalidRecordField { field, .. }) => assert_eq!(field, "note"),
            other => panic!("expected InvalidRecordField, got {other:?}"),
        }
    }

    #[test]
    fn sanitize_strips_delimiter_and_newlines() {
        assert_eq!(sanitize_field("fix=1\nretime\r"), "fix-1 retime");
    }

    #[test]
    fn publish_line_layout_and_summary() {
        let rec = PublishRecord {
            publish_tag: "v002".to_string(),
            source_artifact_path: "/p/p003/s_p003.$F3.png".to_string(),
            source_version_number: 3,
            source_note: "final".to_string(),
            source_version_tag: "p003".to_string(),
            publish_artifact_path: "/pub/v002/s_p003.$F3.png".to_string(),
            publish_user: "carol".to_string(),
            publish_timestamp: "Tue, 16 Sep 2014 10:00:00".to_string(),
            classification: "fx".to_string(),
        };
        let line = encode_record(&rec).unwrap();
        assert_eq!(
            line,
            "v002=/p/p003/s_p003.$F3.png=3=final=p003=/pub/v002/s_p003.$F3.png=carol=Tue, 16 Sep 2014 10:00:00=fx"
        );
        let parsed: PublishRecord = parse_record(&line).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(parsed.publish_number(), Some(2));
        assert_eq!(
            parsed.summary(),
            "p003 of fx by carol on Tue, 16 Sep 2014 10:00:00"
        );
    }

    #[test]
    fn find_prefers_earliest_duplicate() {
        let records = vec![preview(1, "a"), preview(2, "first"), preview(2, "second")];
        let found = find_by_version_number(&records, 2).unwrap();
        assert_eq!(found.note, "first");
        assert!(find_by_version_number(&records, 9).is_none());
    }
}
