//! Reading video lists from CSV exports.
//!
//! Required column: `title`. Optional: `duration`, `video_id`, `youtube_link`.
//! Header names are matched case-insensitively.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use study_core::duration::parse_clock_duration;
use study_core::links::watch_url;
use study_core::model::{PlaylistItem, generated_external_id};

use crate::error::ImportError;

const DEFAULT_DURATION: &str = "00:00";

/// One usable data row. `row` counts data rows from 1, header excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvVideoRow {
    pub row: usize,
    pub item: PlaylistItem,
}

/// Outcome of an import: how many videos were stored and the rows that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub errors: Vec<String>,
}

struct Columns {
    title: usize,
    duration: Option<usize>,
    video_id: Option<usize>,
    link: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |name: &str| names.iter().position(|n| n == name);
        Ok(Self {
            title: find("title").ok_or(ImportError::MissingTitleColumn)?,
            duration: find("duration"),
            video_id: find("video_id"),
            link: find("youtube_link"),
        })
    }
}

fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| record.get(i)).unwrap_or_default().trim()
}

/// Parse CSV text into rows ready to store.
///
/// Blank titles are skipped silently; rows the CSV reader cannot decode are
/// reported as `"Row N: <reason>"` and parsing continues.
///
/// # Errors
///
/// Fails only when the header row is unreadable or has no `title` column.
pub fn parse_video_csv<R: Read>(input: R) -> Result<(Vec<CsvVideoRow>, Vec<String>), ImportError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);
    let columns = Columns::from_headers(reader.headers()?)?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                errors.push(format!("Row {row}: {err}"));
                continue;
            }
        };

        let title = field(&record, Some(columns.title));
        if title.is_empty() {
            continue;
        }
        let duration = match field(&record, columns.duration) {
            "" => DEFAULT_DURATION,
            raw => raw,
        };
        let external_id = match field(&record, columns.video_id) {
            "" => generated_external_id(),
            id => id.to_owned(),
        };
        let url = match field(&record, columns.link) {
            "" => watch_url(&external_id),
            link => link.to_owned(),
        };

        rows.push(CsvVideoRow {
            row,
            item: PlaylistItem {
                title: title.to_owned(),
                external_id,
                url,
                duration_seconds: parse_clock_duration(duration),
            },
        });
    }
    Ok((rows, errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_required_and_optional_columns() {
        let data = "\u{feff} Title ,Duration,VIDEO_ID,youtube_link\n\
                    Intro,12:30,abc,\n\
                    Deep dive,1:02:03,,https://example.com/v\n\
                    ,05:00,zzz,\n\
                    Loose,10 mins,,\n";
        let (rows, errors) = parse_video_csv(data.as_bytes()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[0].item.duration_seconds, 750);
        assert_eq!(rows[0].item.url, "https://www.youtube.com/watch?v=abc");

        assert_eq!(rows[1].item.duration_seconds, 3723);
        assert!(rows[1].item.external_id.starts_with("csv-"));
        assert_eq!(rows[1].item.url, "https://example.com/v");

        assert_eq!(rows[2].row, 4);
        assert_eq!(rows[2].item.duration_seconds, 600);
    }

    #[test]
    fn missing_duration_column_defaults_to_zero() {
        let (rows, _) = parse_video_csv("title\nOnly a title\n".as_bytes()).unwrap();
        assert_eq!(rows[0].item.duration_seconds, 0);
        assert_eq!(rows[0].item.external_id.len(), "csv-".len() + 8);
    }

    #[test]
    fn missing_title_column_is_rejected() {
        let err = parse_video_csv("name,duration\nx,1:00\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingTitleColumn));
    }

    #[test]
    fn undecodable_rows_are_reported_and_skipped() {
        let mut data = b"title,duration\nGood,1:00\n".to_vec();
        data.extend_from_slice(b"\xff\xfe,2:00\nAlso good,3:00\n");
        let (rows, errors) = parse_video_csv(data.as_slice()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Row 2:"));
    }
}
