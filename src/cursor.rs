//! Page cursor translation.
//!
//! Every provider hands back a `meta.next_cursor` that must be re-submitted
//! verbatim to the *same* provider. Underneath, three encodings coexist:
//!
//! - token cursors (graph API): opaque, passed through untouched
//! - offset cursors (citation registry, preprint feed, paper graph): a
//!   non-negative integer rendered as a string
//! - page cursors (web-scale engine): a 1-based page number
//!
//! `"*"` or an absent cursor always means "first page".

/// Cursor value meaning "start from the beginning".
pub const FIRST_PAGE: &str = "*";

/// Parse the leading decimal integer of `raw`, ignoring leading whitespace.
///
/// Trailing garbage is ignored (`"15abc"` is 15). Returns `None` when there are
/// no digits, the number is negative, or it does not fit.
fn leading_integer(raw: &str) -> Option<u64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    if digits.is_empty() {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    if negative && value > 0 {
        return None;
    }
    Some(value)
}

fn is_first_page(cursor: Option<&str>) -> bool {
    match cursor {
        None => true,
        Some(c) => c.trim().is_empty() || c == FIRST_PAGE,
    }
}

/// Offset encoded by an offset-based cursor. Never negative; junk parses as 0.
pub fn offset_from_cursor(cursor: Option<&str>) -> u64 {
    if is_first_page(cursor) {
        return 0;
    }
    cursor.and_then(leading_integer).unwrap_or(0)
}

/// Page number encoded by a page-based cursor (1-based).
pub fn page_from_cursor(cursor: Option<&str>) -> u32 {
    if is_first_page(cursor) {
        return 1;
    }
    cursor
        .and_then(leading_integer)
        .and_then(|p| u32::try_from(p).ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Cursor for the page following `offset`, or `None` at the end.
///
/// A page that returned nothing is always the end.
pub fn next_offset_cursor(offset: u64, returned: usize, total: u64) -> Option<String> {
    if returned == 0 {
        return None;
    }
    let next = offset.saturating_add(returned as u64);
    (next < total).then(|| next.to_string())
}

/// Cursor for the page after `page` on the web-scale engine.
///
/// Advances whenever the page had any items, even on the true last page; the
/// engine reports no reliable total, so the end is only seen as an empty page.
pub fn next_page_cursor(page: u32, returned: usize) -> Option<String> {
    (returned > 0).then(|| page.saturating_add(1).to_string())
}

/// Approximate total for the web-scale engine, which reports none.
///
/// `num × page` when the engine echoed its page size, else `items × page`.
/// A heuristic only; never treat it as an authoritative count.
pub fn approximate_engine_total(reported_num: Option<u64>, page: u32, returned: usize) -> u64 {
    let page = u64::from(page);
    match reported_num {
        Some(num) => num.saturating_mul(page),
        None => (returned as u64).saturating_mul(page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_from_cursor() {
        assert_eq!(offset_from_cursor(None), 0);
        assert_eq!(offset_from_cursor(Some("*")), 0);
        assert_eq!(offset_from_cursor(Some("15")), 15);
        assert_eq!(offset_from_cursor(Some("abc")), 0);
        assert_eq!(offset_from_cursor(Some("-20")), 0);
        assert_eq!(offset_from_cursor(Some("  30")), 30);
        assert_eq!(offset_from_cursor(Some("25xyz")), 25);
        assert_eq!(offset_from_cursor(Some("")), 0);
    }

    #[test]
    fn test_page_from_cursor() {
        assert_eq!(page_from_cursor(None), 1);
        assert_eq!(page_from_cursor(Some("*")), 1);
        assert_eq!(page_from_cursor(Some("3")), 3);
        assert_eq!(page_from_cursor(Some("0")), 1);
        assert_eq!(page_from_cursor(Some("next")), 1);
    }

    #[test]
    fn test_next_offset_cursor() {
        assert_eq!(next_offset_cursor(0, 10, 25).as_deref(), Some("10"));
        assert_eq!(next_offset_cursor(20, 5, 25), None);
        assert_eq!(next_offset_cursor(20, 10, 25), None);
        // empty page ends pagination even when the total claims more
        assert_eq!(next_offset_cursor(0, 0, 100), None);
    }

    #[test]
    fn test_offset_cursors_are_contiguous() {
        let total = 23u64;
        let page = 10usize;
        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let offset = offset_from_cursor(cursor.as_deref());
            let returned = page.min((total - offset) as usize);
            seen.extend(offset..offset + returned as u64);
            cursor = next_offset_cursor(offset, returned, total);
            if cursor.is_none() {
                break;
            }
        }
        assert_eq!(seen, (0..total).collect::<Vec<_>>());
    }

    #[test]
    fn test_next_page_cursor_keeps_advancing_while_items_arrive() {
        assert_eq!(next_page_cursor(1, 10).as_deref(), Some("2"));
        assert_eq!(next_page_cursor(7, 1).as_deref(), Some("8"));
        assert_eq!(next_page_cursor(8, 0), None);
    }

    #[test]
    fn test_approximate_engine_total() {
        assert_eq!(approximate_engine_total(Some(10), 3, 4), 30);
        assert_eq!(approximate_engine_total(None, 3, 4), 12);
        assert_eq!(approximate_engine_total(None, 2, 0), 0);
    }
}
