//! List and Counter Encoding
//!
//! Byte formats shared by every backend that has to emulate lists or
//! counters on top of plain values. A list is its elements joined with
//! [`LIST_DELIMITER`]; a counter is the decimal rendering of an `i64`.
//!
//! Elements containing the delimiter are not escaped and will split into
//! several elements on the next decode. The format is kept for wire
//! compatibility with data already stored by other clients.

/// Separator between encoded list elements.
pub const LIST_DELIMITER: char = ',';

// == Lists ==
/// Splits a stored value into list elements.
///
/// An empty value is the empty list, not a list holding one empty string.
pub fn decode_list(raw: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(raw);
    if text.is_empty() {
        return Vec::new();
    }
    text.split(LIST_DELIMITER).map(str::to_string).collect()
}

/// Joins list elements into their stored form.
pub fn encode_list(values: &[String]) -> Vec<u8> {
    let mut delimiter = [0u8; 4];
    values
        .join(LIST_DELIMITER.encode_utf8(&mut delimiter))
        .into_bytes()
}

/// Normalizes an inclusive `[start, end]` range over a list of `len` items.
///
/// Negative indices count from the end (-1 is the last element) and are
/// clamped at zero; `end` is clamped to the last element. Returns `None`
/// when the resulting range is empty.
pub fn range_bounds(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let length = len as i64;

    let mut start = start;
    let mut end = end;
    if start < 0 {
        start = (length + start).max(0);
    }
    if end < 0 {
        end = (length + end).max(0);
    }
    if end >= length {
        end = length - 1;
    }
    if start > end {
        return None;
    }

    Some((start as usize, end as usize))
}

/// Returns the inclusive slice `[start, end]` of `values`.
pub fn slice_range(values: &[String], start: i64, end: i64) -> Vec<String> {
    match range_bounds(values.len(), start, end) {
        Some((from, to)) => values[from..=to].to_vec(),
        None => Vec::new(),
    }
}

/// Removes occurrences of `target` from `values`.
///
/// `count > 0` removes the first `count` matches from the head, `count < 0`
/// removes the last `|count|` matches from the tail and `count == 0` removes
/// every match. The order of the remaining elements is preserved.
pub fn remove_matches(values: Vec<String>, count: i64, target: &str) -> Vec<String> {
    if count == 0 {
        return values.into_iter().filter(|v| v != target).collect();
    }

    let limit = count.unsigned_abs();
    let mut removed = 0u64;
    let mut keep = |value: &String| {
        if value == target && removed < limit {
            removed += 1;
            false
        } else {
            true
        }
    };

    if count > 0 {
        values.into_iter().filter(|v| keep(v)).collect()
    } else {
        let mut kept: Vec<String> = values.into_iter().rev().filter(|v| keep(v)).collect();
        kept.reverse();
        kept
    }
}

// == Counters ==
/// Parses a stored counter. Corrupt or non-numeric bytes count as zero.
pub fn decode_counter(raw: &[u8]) -> i64 {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// Renders a counter in its stored decimal form.
pub fn encode_counter(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}
