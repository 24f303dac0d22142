//! Weighted average over the five-point rating scale.

use agora_channels::RATING_OPTIONS;

/// Number of ranks on the scale.
pub const RATING_SCALE: usize = RATING_OPTIONS.len();

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingScore {
    /// `Σ rank·count / Σ count`, unrounded.
    pub average: f64,
    pub total: u32,
}

/// Score per-option voter counts, option `i` being rank `i + 1`.
///
/// Counts past the fifth option are ignored. Returns `None` when nobody voted.
pub fn score(counts: &[u32]) -> Option<RatingScore> {
    let ranked = counts.iter().take(RATING_SCALE).map(|&c| u64::from(c));
    let (total, weighted) = ranked
        .enumerate()
        .fold((0u64, 0u64), |(total, weighted), (i, c)| {
            (total + c, weighted + (i as u64 + 1) * c)
        });
    if total == 0 {
        return None;
    }
    Some(RatingScore {
        average: weighted as f64 / total as f64,
        total: u32::try_from(total).unwrap_or(u32::MAX),
    })
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_votes_average_three() {
        let s = score(&[0, 1, 2, 1, 0]).unwrap();
        assert_eq!(s.total, 4);
        assert_eq!(s.average, 3.0);
    }

    #[test]
    fn no_votes_has_no_score() {
        assert_eq!(score(&[0, 0, 0, 0, 0]), None);
        assert_eq!(score(&[]), None);
    }

    #[test]
    fn average_stays_on_the_scale() {
        // Every vector with 0..=3 votes per option.
        for n in 0..4u32.pow(5) {
            let counts: Vec<u32> = (0..5).map(|i| (n / 4u32.pow(i)) % 4).collect();
            match score(&counts) {
                None => assert!(counts.iter().all(|&c| c == 0)),
                Some(s) => {
                    assert!((1.0..=5.0).contains(&s.average), "{counts:?} -> {}", s.average);
                    assert_eq!(s.total, counts.iter().sum::<u32>());
                }
            }
        }
    }

    #[test]
    fn extremes_hit_the_bounds() {
        assert_eq!(score(&[9, 0, 0, 0, 0]).unwrap().average, 1.0);
        assert_eq!(score(&[0, 0, 0, 0, 9]).unwrap().average, 5.0);
    }

    #[test]
    fn rounds_to_two_places() {
        let s = score(&[1, 1, 1, 0, 0]).unwrap();
        assert_eq!(round2(s.average), 2.0);
        let s = score(&[0, 0, 1, 1, 1]).unwrap();
        assert_eq!(round2(s.average), 4.0);
        assert_eq!(round2(10.0 / 3.0), 3.33);
    }
}
