use std::path::PathBuf;

use crate::error::{Error, Result, Side};
use crate::recordings::{dvr_filename, RecordingSet};

/// A `START:END` spec as typed; `None` means "up to the first/last recording".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

/// Inclusive range with both bounds resolved against a [`RecordingSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: u32,
    pub end: u32,
}

impl SelectionRange {
    pub fn indices(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

pub fn parse_range(s: &str) -> Result<RangeSpec> {
    let mut parts = s.split(':');
    let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::InvalidRange(s.to_string()));
    };

    Ok(RangeSpec {
        start: parse_bound(start, Side::Start)?,
        end: parse_bound(end, Side::End)?,
    })
}

fn parse_bound(raw: &str, side: Side) -> Result<Option<u32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| Error::InvalidBound {
            side,
            value: trimmed.to_string(),
        })
}

impl RangeSpec {
    /// Substitutes open bounds with the smallest/largest available index.
    pub fn resolve(&self, recordings: &RecordingSet) -> Result<SelectionRange> {
        let first = recordings.keys().next().copied();
        let last = recordings.keys().next_back().copied();

        let start = self.start.or(first).ok_or(Error::NoRecordings)?;
        let end = self.end.or(last).ok_or(Error::NoRecordings)?;
        if start > end {
            return Err(Error::EmptyRange { start, end });
        }
        Ok(SelectionRange { start, end })
    }
}

/// Resolves `spec` and returns the recordings it covers in index order.
///
/// Every index in the range has to be present; otherwise the error names
/// each missing file so the user can go find it.
pub fn select_recordings(
    spec_text: &str,
    spec: &RangeSpec,
    recordings: &RecordingSet,
) -> Result<Vec<PathBuf>> {
    let range = spec.resolve(recordings)?;

    let missing: Vec<String> = range
        .indices()
        .filter(|idx| !recordings.contains_key(idx))
        .map(dvr_filename)
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingFiles {
            range: spec_text.to_string(),
            missing,
        });
    }

    Ok(recordings
        .range(range.indices())
        .map(|(_, path)| path.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn set(indices: impl IntoIterator<Item = u32>) -> RecordingSet {
        indices
            .into_iter()
            .map(|idx| (idx, PathBuf::from(format!("/dvr/{}", dvr_filename(idx)))))
            .collect()
    }

    fn resolve(text: &str, recordings: &RecordingSet) -> Result<SelectionRange> {
        parse_range(text)?.resolve(recordings)
    }

    #[test]
    fn parses_bounds_with_whitespace() {
        assert_eq!(
            parse_range(" 3 : 12 ").unwrap(),
            RangeSpec {
                start: Some(3),
                end: Some(12)
            }
        );
        assert_eq!(
            parse_range(":").unwrap(),
            RangeSpec {
                start: None,
                end: None
            }
        );
    }

    #[test]
    fn open_bounds_resolve_to_available_extremes() {
        let recordings = set(1..=10);
        assert_eq!(
            resolve("5:", &recordings).unwrap(),
            SelectionRange { start: 5, end: 10 }
        );
        assert_eq!(
            resolve(":3", &recordings).unwrap(),
            SelectionRange { start: 1, end: 3 }
        );
        assert_eq!(
            resolve(":", &recordings).unwrap(),
            SelectionRange { start: 1, end: 10 }
        );
        assert_eq!(resolve(":", &recordings).unwrap().indices().count(), 10);
    }

    #[test]
    fn rejects_wrong_separator_count() {
        for text in ["3:5:7", "35", "", "::"] {
            let err = parse_range(text).unwrap_err();
            assert!(matches!(err, Error::InvalidRange(_)), "{text}: {err}");
            assert_eq!(err.kind(), ErrorKind::Format);
        }
    }

    #[test]
    fn rejects_non_integer_bounds_naming_the_side() {
        let err = parse_range("a:5").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBound {
                side: Side::Start,
                ..
            }
        ));
        let err = parse_range("1:x").unwrap_err();
        assert!(matches!(err, Error::InvalidBound { side: Side::End, .. }));
    }

    #[test]
    fn bounds_outside_u32_are_invalid() {
        // Recording indices come from PICTnnnn names, so they are never negative.
        let err = parse_range("-1:4").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBound {
                side: Side::Start,
                ..
            }
        ));
        assert_eq!(err.to_string(), "invalid start index '-1'");

        let err = parse_range("99999999999:5").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBound {
                side: Side::Start,
                ..
            }
        ));
        let err = parse_range("1:4294967296").unwrap_err();
        assert!(matches!(err, Error::InvalidBound { side: Side::End, .. }));

        assert_eq!(
            parse_range("0:4294967295").unwrap(),
            RangeSpec {
                start: Some(0),
                end: Some(u32::MAX)
            }
        );
    }

    #[test]
    fn reports_every_missing_file_in_order() {
        let recordings = set([1, 2, 4, 5]);
        let spec = parse_range("1:5").unwrap();
        match select_recordings("1:5", &spec, &recordings).unwrap_err() {
            Error::MissingFiles { range, missing } => {
                assert_eq!(range, "1:5");
                assert_eq!(missing, vec!["PICT0003.AVI".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let spec = parse_range("0:7").unwrap();
        match select_recordings("0:7", &spec, &recordings).unwrap_err() {
            Error::MissingFiles { missing, .. } => assert_eq!(
                missing,
                vec!["PICT0000.AVI", "PICT0003.AVI", "PICT0006.AVI", "PICT0007.AVI"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn selects_paths_in_index_order() {
        let recordings = set([9, 10, 11, 12]);
        let spec = parse_range("10:").unwrap();
        let paths = select_recordings("10:", &spec, &recordings).unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/dvr/PICT0010.AVI"),
                PathBuf::from("/dvr/PICT0011.AVI"),
                PathBuf::from("/dvr/PICT0012.AVI"),
            ]
        );
    }

    #[test]
    fn empty_or_inverted_ranges_fail() {
        let recordings = set([4, 5]);
        assert!(matches!(
            resolve("5:4", &recordings).unwrap_err(),
            Error::EmptyRange { start: 5, end: 4 }
        ));
        assert!(matches!(
            resolve(":", &RecordingSet::new()).unwrap_err(),
            Error::NoRecordings
        ));
    }
}
