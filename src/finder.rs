/// Searches byte spans for the boundary delimiter `\r\n--{boundary}`.
///
/// Both lookup tables are built once per parse from the full delimiter, so
/// repeated bytes inside the delimiter are accounted for.
#[derive(Debug)]
pub(crate) struct BoundaryFinder {
    needle: Vec<u8>,
    skip: [usize; 256],
    // Positions of each byte value inside the needle, ascending.
    occurrences: Vec<Vec<usize>>,
}

impl BoundaryFinder {
    pub(crate) fn new(needle: Vec<u8>) -> BoundaryFinder {
        let len = needle.len();

        let mut skip = [len; 256];
        for (i, &b) in needle.iter().enumerate().take(len.saturating_sub(1)) {
            skip[b as usize] = len - 1 - i;
        }

        let mut occurrences = vec![Vec::new(); 256];
        for (i, &b) in needle.iter().enumerate() {
            occurrences[b as usize].push(i);
        }

        BoundaryFinder {
            needle,
            skip,
            occurrences,
        }
    }

    /// Returns the start index of the first delimiter in `haystack`.
    ///
    /// Boyer-Moore-Horspool: compare right to left from a candidate end, then
    /// shift by the skip entry of the haystack byte under the candidate end.
    pub(crate) fn find(&self, haystack: &[u8]) -> Option<usize> {
        let n = self.needle.len();
        if n == 0 {
            return Some(0);
        }

        let mut pos = 0;
        while pos + n <= haystack.len() {
            let mut i = n - 1;
            while haystack[pos + i] == self.needle[i] {
                if i == 0 {
                    return Some(pos);
                }
                i -= 1;
            }
            pos += self.skip[haystack[pos + n - 1] as usize];
        }

        None
    }

    /// Length of the longest proper prefix of the delimiter that `haystack`
    /// ends with.
    ///
    /// Only meaningful after [`find`](Self::find) came back empty. Those
    /// trailing bytes might be the start of a delimiter split across chunks,
    /// so they must be withheld until more input arrives.
    pub(crate) fn ambiguous_suffix_len(&self, haystack: &[u8]) -> usize {
        let last = match haystack.last() {
            Some(&b) => b,
            None => return 0,
        };

        let max_idx = self.needle.len().saturating_sub(1);

        for &idx in self.occurrences[last as usize].iter().rev() {
            // A full match would have been reported by `find`.
            if idx >= max_idx || idx >= haystack.len() {
                continue;
            }

            let start = haystack.len() - 1 - idx;
            if haystack[start..] == self.needle[..=idx] {
                return idx + 1;
            }
        }

        0
    }
}
