/// Whether an open `scan` element at MS level `open_level` must be closed before a
/// scan at `new_level` is opened.
///
/// A scan nests inside the open scan only when its MS level is strictly greater.
/// Merge results stand alone and close everything still open.
pub fn should_close_before(new_level: u8, is_merge_result: bool, open_level: u8) -> bool {
    is_merge_result || new_level <= open_level
}

/// The MS levels of the `scan` elements currently open in an mzXML document,
/// innermost last
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanNesting {
    open_levels: Vec<u8>,
}

impl ScanNesting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new scan, returning how many open scans must be closed first
    pub fn enter(&mut self, ms_level: u8, is_merge_result: bool) -> usize {
        let mut to_close = 0;
        while let Some(top) = self.open_levels.last() {
            if should_close_before(ms_level, is_merge_result, *top) {
                self.open_levels.pop();
                to_close += 1;
            } else {
                break;
            }
        }
        self.open_levels.push(ms_level);
        to_close
    }

    /// Forget every open scan, returning how many need closing
    pub fn drain(&mut self) -> usize {
        let n = self.open_levels.len();
        self.open_levels.clear();
        n
    }

    pub fn depth(&self) -> usize {
        self.open_levels.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_policy() {
        assert!(!should_close_before(2, false, 1));
        assert!(should_close_before(1, false, 1));
        assert!(should_close_before(2, false, 2));
        assert!(should_close_before(1, false, 3));
        assert!(should_close_before(3, true, 1));
    }

    #[test]
    fn test_nesting_sequence() {
        let mut nesting = ScanNesting::new();
        // MS1, MS2, MS3, MS2, MS1
        assert_eq!(nesting.enter(1, false), 0);
        assert_eq!(nesting.enter(2, false), 0);
        assert_eq!(nesting.enter(3, false), 0);
        assert_eq!(nesting.depth(), 3);
        assert_eq!(nesting.enter(2, false), 2);
        assert_eq!(nesting.depth(), 2);
        assert_eq!(nesting.enter(1, false), 2);
        assert_eq!(nesting.depth(), 1);
        // A merged MS2 does not nest in the MS1
        assert_eq!(nesting.enter(2, true), 1);
        assert_eq!(nesting.drain(), 1);
        assert_eq!(nesting.depth(), 0);
    }
}
