use std::collections::HashSet;
use std::ops::Range;

/// Working window over a link list of length `len`.
///
/// `start_index` is clamped into the list; `max_links == 0` means "to the
/// end". An empty list always yields an empty window.
pub fn select_window(len: usize, start_index: usize, max_links: usize) -> Range<usize> {
    if len == 0 {
        return 0..0;
    }
    let start = start_index.min(len - 1);
    let end = if max_links > 0 {
        start.saturating_add(max_links).min(len)
    } else {
        len
    };
    start..end
}

/// Splits `items` into contiguous batches of at most `batch_size`
/// (a size of zero is treated as one).
pub fn partition<T>(items: &[T], batch_size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(batch_size.max(1))
}

pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

/// Drops exact-duplicate links, keeping the first occurrence of each.
pub fn dedup_links<I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://x/{i}")).collect()
    }

    #[test]
    fn partition_reconstructs_the_list() {
        for len in 0..12 {
            for batch_size in 1..6 {
                let items = links(len);
                let batches: Vec<&[String]> = partition(&items, batch_size).collect();

                assert_eq!(batches.len(), batch_count(len, batch_size));
                assert_eq!(batches.len(), (len + batch_size - 1) / batch_size);
                assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= batch_size));
                assert_eq!(batches.concat(), items);
            }
        }
    }

    #[test]
    fn zero_batch_size_behaves_like_one() {
        let items = links(3);
        assert_eq!(partition(&items, 0).count(), 3);
        assert_eq!(batch_count(3, 0), 3);
    }

    #[test]
    fn window_clamps_to_list() {
        assert_eq!(select_window(10, 0, 0), 0..10);
        assert_eq!(select_window(10, 4, 3), 4..7);
        assert_eq!(select_window(10, 8, 5), 8..10);
        assert_eq!(select_window(10, 25, 0), 9..10);
        assert_eq!(select_window(0, 3, 2), 0..0);
        assert_eq!(select_window(5, 2, usize::MAX), 2..5);
    }

    #[test]
    fn dedup_is_idempotent() {
        let raw = vec![
            "http://x/1".to_string(),
            "http://x/2".to_string(),
            "http://x/1".to_string(),
            "http://x/3".to_string(),
            "http://x/2".to_string(),
        ];
        let once = dedup_links(raw);
        let twice = dedup_links(once.clone());

        assert_eq!(once, vec!["http://x/1", "http://x/2", "http://x/3"]);
        assert_eq!(once, twice);
    }
}
