/*!
 * Candidate space generation
 *
 * The password space is every fixed-length string over an alphabet.
 * It is split into partitions by prefix so workers can search disjoint
 * slices without coordinating:
 * - Lexicographic order following the alphabet's listed order
 * - Lazy suffix enumeration with a reusable buffer (no per-candidate state
 *   beyond an odometer)
 * - Random access by index for fixtures and resumption
 */

use crate::error::ConfigError;

/// Lowercase letters followed by digits
pub const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Password length searched by default
pub const DEFAULT_LENGTH: usize = 6;

/// Prefix length used to split the space into partitions
pub const DEFAULT_PREFIX_LENGTH: usize = 2;

/// Ordered, duplicate-free set of ASCII symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<u8>,
}

impl Alphabet {
    pub fn new(charset: &str) -> Result<Self, ConfigError> {
        if charset.is_empty() {
            return Err(ConfigError::EmptyCharset);
        }

        let mut symbols = Vec::with_capacity(charset.len());
        for ch in charset.chars() {
            if !ch.is_ascii() {
                return Err(ConfigError::NonAsciiCharset(ch));
            }
            let byte = ch as u8;
            if symbols.contains(&byte) {
                return Err(ConfigError::DuplicateSymbol(ch));
            }
            symbols.push(byte);
        }

        Ok(Self { symbols })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    #[inline]
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are accepted in `new`
        std::str::from_utf8(&self.symbols).unwrap_or_default()
    }

    /// Number of candidates of `length` symbols, `None` on overflow
    pub fn space_size(&self, length: usize) -> Option<u64> {
        let length = u32::try_from(length).ok()?;
        (self.symbols.len() as u64).checked_pow(length)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_CHARSET.as_bytes().to_vec(),
        }
    }
}

/// A disjoint slice of the candidate space identified by its prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    prefix: Vec<u8>,
    suffix_length: usize,
}

impl Partition {
    pub fn new(prefix: impl Into<Vec<u8>>, suffix_length: usize) -> Self {
        Self {
            prefix: prefix.into(),
            suffix_length,
        }
    }

    #[inline]
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Prefix as text, for logs and progress events
    pub fn label(&self) -> String {
        String::from_utf8_lossy(&self.prefix).into_owned()
    }

    #[inline]
    pub fn suffix_length(&self) -> usize {
        self.suffix_length
    }

    /// Number of candidates in this partition
    pub fn size(&self, alphabet: &Alphabet) -> u64 {
        alphabet.space_size(self.suffix_length).unwrap_or(u64::MAX)
    }

    /// Fresh cursor over this partition's candidates
    pub fn candidates<'a>(&'a self, alphabet: &'a Alphabet) -> Candidates<'a> {
        Candidates::new(alphabet, &self.prefix, self.suffix_length)
    }

    /// Candidate at `index` within this partition's order
    pub fn candidate_at(&self, alphabet: &Alphabet, mut index: u64) -> Option<String> {
        if index >= self.size(alphabet) {
            return None;
        }

        let base = alphabet.len() as u64;
        let mut buffer = self.prefix.clone();
        buffer.resize(self.prefix.len() + self.suffix_length, 0);

        for slot in buffer[self.prefix.len()..].iter_mut().rev() {
            *slot = alphabet.symbols()[(index % base) as usize];
            index /= base;
        }

        Some(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Odometer over `prefix + suffix` where the suffix walks the alphabet
///
/// `advance` hands out a borrowed view of the internal buffer so the hot
/// loop never allocates. The `Iterator` impl allocates one `String` per
/// candidate and is meant for tests and small spaces.
pub struct Candidates<'a> {
    symbols: &'a [u8],
    prefix_len: usize,
    buffer: Vec<u8>,
    digits: Vec<usize>,
    started: bool,
    exhausted: bool,
}

impl<'a> Candidates<'a> {
    pub fn new(alphabet: &'a Alphabet, prefix: &[u8], suffix_length: usize) -> Self {
        let symbols = alphabet.symbols();
        let mut buffer = Vec::with_capacity(prefix.len() + suffix_length);
        buffer.extend_from_slice(prefix);
        buffer.extend(std::iter::repeat(symbols.first().copied().unwrap_or(b'?')).take(suffix_length));

        Self {
            symbols,
            prefix_len: prefix.len(),
            buffer,
            digits: vec![0; suffix_length],
            started: false,
            exhausted: symbols.is_empty(),
        }
    }

    /// Move to the next candidate and return it
    #[inline]
    pub fn advance(&mut self) -> Option<&[u8]> {
        if self.exhausted {
            return None;
        }

        if !self.started {
            self.started = true;
            return Some(&self.buffer);
        }

        let mut pos = self.digits.len();
        loop {
            if pos == 0 {
                self.exhausted = true;
                return None;
            }
            pos -= 1;

            self.digits[pos] += 1;
            if self.digits[pos] < self.symbols.len() {
                self.buffer[self.prefix_len + pos] = self.symbols[self.digits[pos]];
                return Some(&self.buffer);
            }

            // carry
            self.digits[pos] = 0;
            self.buffer[self.prefix_len + pos] = self.symbols[0];
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.advance()
            .map(|candidate| String::from_utf8_lossy(candidate).into_owned())
    }
}

/// Lazy cursor over the partitions of a space, in lexicographic order
///
/// Holds one prefix odometer; partitions are built as they are pulled.
pub struct PartitionCursor<'a> {
    prefixes: Candidates<'a>,
    suffix_length: usize,
    total: u64,
}

impl PartitionCursor<'_> {
    /// Number of partitions the cursor yields from the start
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Iterator for PartitionCursor<'_> {
    type Item = Partition;

    fn next(&mut self) -> Option<Partition> {
        let suffix_length = self.suffix_length;
        self.prefixes
            .advance()
            .map(|prefix| Partition::new(prefix.to_vec(), suffix_length))
    }
}

/// Partition cursor for candidates of `total_length` split by `prefix_length`
pub fn partition_cursor(
    alphabet: &Alphabet,
    total_length: usize,
    prefix_length: usize,
) -> Result<PartitionCursor<'_>, ConfigError> {
    if total_length == 0 {
        return Err(ConfigError::ZeroLength);
    }
    if prefix_length > total_length {
        return Err(ConfigError::PrefixTooLong {
            prefix: prefix_length,
            length: total_length,
        });
    }
    if alphabet.space_size(total_length).is_none() {
        return Err(ConfigError::SpaceTooLarge {
            symbols: alphabet.len(),
            length: total_length,
        });
    }

    Ok(PartitionCursor {
        prefixes: Candidates::new(alphabet, &[], prefix_length),
        suffix_length: total_length - prefix_length,
        total: alphabet.space_size(prefix_length).unwrap_or(u64::MAX),
    })
}

/// Split the space of `total_length` candidates by prefixes of `prefix_length`
///
/// Partitions come out in lexicographic order and together cover every
/// candidate exactly once. Materializes all of them; the coordinator pulls
/// from [`partition_cursor`] instead.
pub fn partitions(
    alphabet: &Alphabet,
    total_length: usize,
    prefix_length: usize,
) -> Result<Vec<Partition>, ConfigError> {
    Ok(partition_cursor(alphabet, total_length, prefix_length)?.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_alphabet() {
        let alphabet = Alphabet::default();
        assert_eq!(alphabet.len(), 36);
        assert_eq!(alphabet.space_size(DEFAULT_LENGTH), Some(2_176_782_336));
    }

    #[test]
    fn test_alphabet_rejects_bad_charsets() {
        assert_eq!(Alphabet::new(""), Err(ConfigError::EmptyCharset));
        assert_eq!(Alphabet::new("aba"), Err(ConfigError::DuplicateSymbol('a')));
        assert_eq!(Alphabet::new("aé"), Err(ConfigError::NonAsciiCharset('é')));
    }

    #[test]
    fn test_two_symbol_partitions() {
        let alphabet = Alphabet::new("ab").unwrap();
        let parts = partitions(&alphabet, 3, 2).unwrap();

        let prefixes: Vec<String> = parts.iter().map(Partition::label).collect();
        assert_eq!(prefixes, vec!["aa", "ab", "ba", "bb"]);

        let all: Vec<String> = parts.iter().flat_map(|p| p.candidates(&alphabet)).collect();
        assert_eq!(
            all,
            vec!["aaa", "aab", "aba", "abb", "baa", "bab", "bba", "bbb"]
        );
    }

    #[test]
    fn test_partitions_exhaustive_and_disjoint() {
        let alphabet = Alphabet::new("xyz0").unwrap();
        for length in 1..=4 {
            for prefix in 0..=length {
                let parts = partitions(&alphabet, length, prefix).unwrap();
                let expected = alphabet.space_size(length).unwrap() as usize;

                let mut seen = HashSet::new();
                let mut count = 0;
                for part in &parts {
                    for candidate in part.candidates(&alphabet) {
                        assert_eq!(candidate.len(), length);
                        assert!(seen.insert(candidate), "duplicate candidate");
                        count += 1;
                    }
                }
                assert_eq!(count, expected, "length {} prefix {}", length, prefix);
                assert_eq!(parts.len() as u64, alphabet.space_size(prefix).unwrap());
            }
        }
    }

    #[test]
    fn test_zero_prefix_single_partition() {
        let alphabet = Alphabet::new("01").unwrap();
        let parts = partitions(&alphabet, 2, 0).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].candidates(&alphabet).count(), 4);
    }

    #[test]
    fn test_full_prefix_yields_single_candidate() {
        let alphabet = Alphabet::new("01").unwrap();
        let parts = partitions(&alphabet, 2, 2).unwrap();
        assert_eq!(parts.len(), 4);
        for part in &parts {
            let candidates: Vec<_> = part.candidates(&alphabet).collect();
            assert_eq!(candidates, vec![part.label()]);
        }
    }

    #[test]
    fn test_candidate_at_matches_cursor_order() {
        let alphabet = Alphabet::default();
        let part = Partition::new(b"q7".to_vec(), 2);
        for (index, candidate) in part.candidates(&alphabet).enumerate() {
            assert_eq!(part.candidate_at(&alphabet, index as u64), Some(candidate));
        }
        assert_eq!(part.candidate_at(&alphabet, 36 * 36), None);
    }

    #[test]
    fn test_cursor_is_restartable() {
        let alphabet = Alphabet::new("abc").unwrap();
        let part = Partition::new(b"c".to_vec(), 2);
        let first: Vec<_> = part.candidates(&alphabet).collect();
        let second: Vec<_> = part.candidates(&alphabet).collect();
        assert_eq!(first, second);
        assert_eq!(first.first().map(String::as_str), Some("caa"));
        assert_eq!(first.last().map(String::as_str), Some("ccc"));
    }

    #[test]
    fn test_partition_cursor_is_lazy() {
        let alphabet = Alphabet::default();
        let mut cursor = partition_cursor(&alphabet, 6, 6).unwrap();
        assert_eq!(cursor.total(), 2_176_782_336);

        let first: Vec<_> = cursor.by_ref().take(3).map(|p| p.label()).collect();
        assert_eq!(first, vec!["aaaaaa", "aaaaab", "aaaaac"]);
        assert_eq!(cursor.next().map(|p| p.suffix_length()), Some(0));
    }

    #[test]
    fn test_cursor_matches_partitions() {
        let alphabet = Alphabet::new("xyz").unwrap();
        let cursor = partition_cursor(&alphabet, 4, 2).unwrap();
        assert_eq!(cursor.total(), 9);
        assert_eq!(cursor.collect::<Vec<_>>(), partitions(&alphabet, 4, 2).unwrap());
    }

    #[test]
    fn test_invalid_shapes() {
        let alphabet = Alphabet::default();
        assert_eq!(partitions(&alphabet, 0, 0), Err(ConfigError::ZeroLength));
        assert_eq!(
            partitions(&alphabet, 3, 4),
            Err(ConfigError::PrefixTooLong { prefix: 4, length: 3 })
        );
        assert!(matches!(
            partitions(&alphabet, 64, 1),
            Err(ConfigError::SpaceTooLarge { .. })
        ));
    }
}
