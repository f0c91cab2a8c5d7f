//! The note score grammar the piano controller understands.
//!
//! A score is a sequence of timed events separated by `.`. Each event is a comma-separated
//! group of note indices struck together, followed by `/` and a duration in milliseconds:
//! `1,5/200.3/100` plays notes 1 and 5 for 200 ms, then note 3 for 100 ms. Scores are validated
//! when a song is submitted so the device never receives garbage.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotesError {
    #[error("A score must contain at least one event")]
    Empty,
    #[error("Event {0} has no notes")]
    EmptyGroup(usize),
    #[error("Event {0} has no duration")]
    MissingDuration(usize),
    #[error("Invalid note index in event {0}: {1}")]
    BadNote(usize, String),
    #[error("Invalid duration in event {0}: {1}")]
    BadDuration(usize, String),
}

/// One group of simultaneous notes and how long to hold them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub notes: Vec<u8>,
    pub duration_ms: u32,
}

pub fn parse_score(score: &str) -> Result<Vec<NoteEvent>, NotesError> {
    let trimmed = score.trim();
    if trimmed.is_empty() {
        return Err(NotesError::Empty);
    }
    trimmed
        .split('.')
        .enumerate()
        .map(|(i, event)| {
            let (group, duration) =
                event.split_once('/').ok_or_else(|| NotesError::MissingDuration(i))?;
            if group.trim().is_empty() {
                return Err(NotesError::EmptyGroup(i));
            }
            let duration_ms = duration
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| NotesError::BadDuration(i, duration.to_string()))?;
            let notes = group
                .split(',')
                .map(|n| {
                    n.trim().parse::<u8>().map_err(|_| NotesError::BadNote(i, n.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(NoteEvent { notes, duration_ms })
        })
        .collect()
}

/// Cheap pre-flight check used by the song-submission path.
pub fn validate_score(score: &str) -> Result<(), NotesError> {
    parse_score(score).map(|_| ())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_chords_and_single_notes() {
        let events = parse_score("1,5/200.3/100").unwrap();
        assert_eq!(
            events,
            vec![
                NoteEvent { notes: vec![1, 5], duration_ms: 200 },
                NoteEvent { notes: vec![3], duration_ms: 100 },
            ]
        );
    }

    #[test]
    fn tolerates_whitespace() {
        let events = parse_score(" 1 , 2 / 150 ").unwrap();
        assert_eq!(events, vec![NoteEvent { notes: vec![1, 2], duration_ms: 150 }]);
    }

    #[test]
    fn rejects_empty_scores() {
        assert_eq!(parse_score(""), Err(NotesError::Empty));
        assert_eq!(parse_score("   "), Err(NotesError::Empty));
    }

    #[test]
    fn rejects_missing_or_bad_durations() {
        assert_eq!(parse_score("1,5"), Err(NotesError::MissingDuration(0)));
        assert_eq!(parse_score("1/0"), Err(NotesError::BadDuration(0, "0".to_string())));
        assert_eq!(parse_score("1/abc"), Err(NotesError::BadDuration(0, "abc".to_string())));
        assert_eq!(parse_score("1/100.2/"), Err(NotesError::BadDuration(1, "".to_string())));
    }

    #[test]
    fn rejects_bad_groups() {
        assert_eq!(parse_score("/100"), Err(NotesError::EmptyGroup(0)));
        assert_eq!(parse_score("1,x/100"), Err(NotesError::BadNote(0, "x".to_string())));
        assert_eq!(parse_score("999/100"), Err(NotesError::BadNote(0, "999".to_string())));
    }

    #[test]
    fn validate_is_just_parse() {
        assert!(validate_score("1/100").is_ok());
        assert!(validate_score("nonsense").is_err());
    }
}
