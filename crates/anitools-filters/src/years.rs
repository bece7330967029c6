//! Season-year range shorthand.
//!
//! Typing `2010-2015` into the year picker offers a synthetic `2010-2015`
//! entry; typing `2010-` offers `2010-<y>` for every known year after 2010.
//! Anything without a dash shows the cached years unchanged.

use anitools_core::WhitelistEntry;

/// Whitelist to show for `input`, given the years the backend reported.
pub fn expand(input: &str, cached: &[WhitelistEntry]) -> Vec<WhitelistEntry> {
    let input = input.trim();
    let Some((start, end)) = input.split_once('-') else {
        return cached.to_vec();
    };
    let Ok(start) = start.trim().parse::<i64>() else {
        return cached.to_vec();
    };

    let mut entries = cached.to_vec();
    let end = end.trim();
    if end.is_empty() {
        entries.extend(
            cached
                .iter()
                .filter_map(|entry| entry.value.parse::<i64>().ok())
                .filter(|year| *year > start)
                .map(|year| WhitelistEntry::plain(format!("{}-{}", start, year))),
        );
    } else if let Ok(end) = end.parse::<i64>() {
        if start < end {
            entries.push(WhitelistEntry::plain(format!("{}-{}", start, end)));
        }
    }
    entries
}
