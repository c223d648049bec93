//! Frame-range mini-grammar
//!
//! Accepts comma-separated items, each a single frame (`7`) or an
//! inclusive range (`1-5`). A descending range (`10-8`) plays the
//! frames in reverse. `"1-5,7,10-8"` expands to
//! `1 2 3 4 5 7 10 9 8`.

use marrow_core::{Error, Result};

/// Expand a range expression into an explicit frame list
pub fn parse_frame_range(input: &str) -> Result<Vec<i32>> {
    let invalid = |message: &str| Error::InvalidFrameRange {
        input: input.to_string(),
        message: message.to_string(),
    };

    let mut frames = Vec::new();
    for item in input.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(invalid("empty item"));
        }
        match item.split_once('-') {
            None => frames.push(parse_number(item).ok_or_else(|| invalid("expected a frame number"))?),
            Some((start, end)) => {
                let start = parse_number(start.trim())
                    .ok_or_else(|| invalid("expected a number before '-'"))?;
                let end = parse_number(end.trim())
                    .ok_or_else(|| invalid("expected a number after '-'"))?;
                if start <= end {
                    frames.extend(start..=end);
                } else {
                    frames.extend((end..=start).rev());
                }
            }
        }
    }
    Ok(frames)
}

fn parse_number(text: &str) -> Option<i32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// The default frame list: every whole frame in `[start, end]`
pub fn full_range(start: f64, end: f64) -> Vec<i32> {
    let start = start.floor() as i32;
    let end = end.floor() as i32;
    if start <= end { (start..=end).collect() } else { vec![start] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mixed_items_and_reversed_range() {
        assert_eq!(
            parse_frame_range("1-5,7,10-8").unwrap(),
            vec![1, 2, 3, 4, 5, 7, 10, 9, 8]
        );
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(parse_frame_range(" 3 , 5 - 6 ").unwrap(), vec![3, 5, 6]);
    }

    #[test]
    fn test_single_frame_and_degenerate_range() {
        assert_eq!(parse_frame_range("4").unwrap(), vec![4]);
        assert_eq!(parse_frame_range("4-4").unwrap(), vec![4]);
    }

    #[test]
    fn test_garbage_rejected() {
        for bad in ["", "a", "1-", "-5", "1-2-3", "1,,2", "1;5"] {
            let err = parse_frame_range(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidFrameRange { .. }), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_full_range() {
        assert_eq!(full_range(0.0, 3.0), vec![0, 1, 2, 3]);
        assert_eq!(full_range(2.5, 2.9), vec![2]);
    }

    proptest! {
        #[test]
        fn parse_covers_both_endpoints(a in 0i32..500, b in 0i32..500) {
            let frames = parse_frame_range(&format!("{a}-{b}")).unwrap();
            prop_assert_eq!(frames.len(), (a - b).unsigned_abs() as usize + 1);
            prop_assert_eq!(*frames.first().unwrap(), a);
            prop_assert_eq!(*frames.last().unwrap(), b);
        }
    }
}
