use thiserror::Error;

use crate::duration::format_clock;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChunkError {
    #[error("chunk interval must be at least one minute")]
    ZeroInterval,
}

/// A planned chunk before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: u32,
    pub start_seconds: u32,
    pub end_seconds: u32,
    pub title: String,
}

/// Splits a video into contiguous `[start, min(start + interval, duration))` chunks,
/// numbered from 1.
///
/// A zero-length video yields no chunks.
///
/// # Errors
///
/// Returns `ChunkError::ZeroInterval` when `interval_minutes` is 0.
pub fn split_into_chunks(
    video_title: &str,
    duration_seconds: u32,
    interval_minutes: u32,
) -> Result<Vec<ChunkPlan>, ChunkError> {
    if interval_minutes == 0 {
        return Err(ChunkError::ZeroInterval);
    }
    let interval = interval_minutes.saturating_mul(60);

    let mut chunks = Vec::new();
    let mut start = 0_u32;
    let mut index = 1_u32;
    while start < duration_seconds {
        let end = start.saturating_add(interval).min(duration_seconds);
        chunks.push(ChunkPlan {
            index,
            start_seconds: start,
            end_seconds: end,
            title: format!(
                "{video_title} (Part {index}: {} - {})",
                format_clock(start),
                format_clock(end)
            ),
        });
        start = end;
        index += 1;
    }
    Ok(chunks)
}

/// Which planned chunks lie entirely inside already-watched ranges.
///
/// Used when re-splitting so that time logged for the old units is not counted again
/// through the new ones. Ranges are half-open `[start, end)` and may overlap.
#[must_use]
pub fn covered_by_watched(plan: &[ChunkPlan], watched: &[(u32, u32)]) -> Vec<bool> {
    let mut ranges: Vec<(u32, u32)> = watched.iter().copied().filter(|(s, e)| s < e).collect();
    ranges.sort_unstable();
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    plan.iter()
        .map(|chunk| {
            merged
                .iter()
                .any(|&(start, end)| start <= chunk.start_seconds && chunk.end_seconds <= end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_with_short_tail() {
        let chunks = split_into_chunks("Graphs", 3000, 20).unwrap();
        let ranges: Vec<(u32, u32)> = chunks
            .iter()
            .map(|c| (c.start_seconds, c.end_seconds))
            .collect();
        assert_eq!(ranges, vec![(0, 1200), (1200, 2400), (2400, 3000)]);
        assert_eq!(chunks[2].index, 3);
        assert_eq!(chunks[2].title, "Graphs (Part 3: 40:00 - 50:00)");
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let chunks = split_into_chunks("Trees", 2400, 20).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].end_seconds, 2400);
    }

    #[test]
    fn empty_video_and_zero_interval() {
        assert!(split_into_chunks("Empty", 0, 10).unwrap().is_empty());
        assert_eq!(
            split_into_chunks("Any", 100, 0).unwrap_err(),
            ChunkError::ZeroInterval
        );
    }

    #[test]
    fn chunks_cover_whole_video() {
        let chunks = split_into_chunks("Long", 7261, 7).unwrap();
        let covered: u32 = chunks.iter().map(|c| c.end_seconds - c.start_seconds).sum();
        assert_eq!(covered, 7261);
        assert!(chunks.windows(2).all(|w| w[0].end_seconds == w[1].start_seconds));
    }

    #[test]
    fn coverage_merges_adjacent_ranges() {
        let plan = split_into_chunks("Heaps", 3000, 10).unwrap();
        // Old 20-minute split with its first two parts watched.
        let flags = covered_by_watched(&plan, &[(1200, 2400), (0, 1200)]);
        assert_eq!(flags, vec![true, true, true, true, false]);

        let whole = covered_by_watched(&plan, &[(0, 3000)]);
        assert!(whole.iter().all(|&w| w));
        assert!(covered_by_watched(&plan, &[]).iter().all(|&w| !w));
    }

    #[test]
    fn partially_covered_chunk_stays_unwatched() {
        let plan = split_into_chunks("Heaps", 1800, 20).unwrap();
        assert_eq!(covered_by_watched(&plan, &[(0, 900)]), vec![false, false]);
    }
}
