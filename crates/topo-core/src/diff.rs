//! Unified diff rendering
//!
//! Line-based longest-common-subsequence diff of two canonical texts,
//! written as unified-diff hunks. Removed lines appear in the order of the
//! original text and added lines in the order of the candidate text.

use std::io::{self, Write};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Kind of a diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    /// Present on both sides
    Equal,
    /// Only in the original
    Delete,
    /// Only in the candidate
    Insert,
}

/// One line of an edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffLine<'a> {
    /// Kind of change
    pub change: LineChange,
    /// Line content without terminator
    pub text: &'a str,
}

/// Totals of a rendered diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Lines only in the candidate
    pub added: usize,
    /// Lines only in the original
    pub removed: usize,
    /// Number of hunks written
    pub hunks: usize,
}

impl DiffStats {
    /// Check if no line differs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Edit script turning `before` into `after`
///
/// Longest common subsequence by Hirschberg's divide and conquer, so memory
/// stays linear in the number of lines.
#[must_use]
pub fn diff_lines<'a>(before: &[&'a str], after: &[&'a str]) -> Vec<DiffLine<'a>> {
    let prefix = before
        .iter()
        .zip(after)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = before[prefix..]
        .iter()
        .rev()
        .zip(after[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut script = Vec::with_capacity(before.len().max(after.len()));
    push_all(&mut script, LineChange::Equal, &before[..prefix]);
    hirschberg(
        &before[prefix..before.len() - suffix],
        &after[prefix..after.len() - suffix],
        &mut script,
    );
    push_all(&mut script, LineChange::Equal, &before[before.len() - suffix..]);
    script
}

fn push_all<'a>(script: &mut Vec<DiffLine<'a>>, change: LineChange, lines: &[&'a str]) {
    script.extend(lines.iter().map(|&text| DiffLine { change, text }));
}

fn hirschberg<'a>(old: &[&'a str], new: &[&'a str], script: &mut Vec<DiffLine<'a>>) {
    if old.is_empty() {
        push_all(script, LineChange::Insert, new);
        return;
    }
    if new.is_empty() {
        push_all(script, LineChange::Delete, old);
        return;
    }
    if old.len() == 1 {
        match new.iter().position(|line| *line == old[0]) {
            Some(k) => {
                push_all(script, LineChange::Insert, &new[..k]);
                push_all(script, LineChange::Equal, &old[..1]);
                push_all(script, LineChange::Insert, &new[k + 1..]);
            }
            None => {
                push_all(script, LineChange::Delete, old);
                push_all(script, LineChange::Insert, new);
            }
        }
        return;
    }

    let mid = old.len() / 2;
    let forward = lcs_lengths(old[..mid].iter(), new.iter(), new.len());
    let backward = lcs_lengths(old[mid..].iter().rev(), new.iter().rev(), new.len());

    // forward[k]: LCS of old[..mid] and new[..k]
    // backward[m - k]: LCS of old[mid..] and new[k..]
    let m = new.len();
    let split = (0..=m)
        .max_by_key(|&k| (forward[k] + backward[m - k], std::cmp::Reverse(k)))
        .unwrap_or(0);

    hirschberg(&old[..mid], &new[..split], script);
    hirschberg(&old[mid..], &new[split..], script);
}

/// Last row of the LCS table of `a` against every prefix of `b`
fn lcs_lengths<'s, 'a: 's, A, B>(a: A, b: B, len: usize) -> Vec<u32>
where
    A: Iterator<Item = &'s &'a str>,
    B: Iterator<Item = &'s &'a str> + Clone,
{
    let mut prev = vec![0u32; len + 1];
    let mut cur = vec![0u32; len + 1];
    for x in a {
        for (j, y) in b.clone().enumerate() {
            cur[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev
}

/// Writes unified diffs to a sink
#[derive(Debug, Clone)]
pub struct DiffPresenter {
    context: usize,
    color: bool,
    old_label: String,
    new_label: String,
}

impl Default for DiffPresenter {
    fn default() -> Self {
        Self {
            context: 3,
            color: false,
            old_label: "current".to_string(),
            new_label: "candidate".to_string(),
        }
    }
}

impl DiffPresenter {
    /// Create presenter with 3 context lines and no colour
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unchanged lines shown around each change
    #[inline]
    #[must_use]
    pub fn with_context(mut self, lines: usize) -> Self {
        self.context = lines;
        self
    }

    /// Enable ANSI colours
    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Labels for the `---` and `+++` header lines
    #[inline]
    #[must_use]
    pub fn with_labels(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_label = old.into();
        self.new_label = new.into();
        self
    }

    /// Render the diff of `original` against `candidate` into `out`
    ///
    /// # Errors
    /// Returns the sink's I/O error.
    pub fn render<W: Write + ?Sized>(
        &self,
        original: &str,
        candidate: &str,
        out: &mut W,
    ) -> io::Result<DiffStats> {
        let before: Vec<&str> = original.lines().collect();
        let after: Vec<&str> = candidate.lines().collect();
        let script = diff_lines(&before, &after);

        let mut stats = DiffStats::default();
        for line in &script {
            match line.change {
                LineChange::Insert => stats.added += 1,
                LineChange::Delete => stats.removed += 1,
                LineChange::Equal => {}
            }
        }

        self.paint(out, BOLD, &format!("--- {}", self.old_label))?;
        self.paint(out, BOLD, &format!("+++ {}", self.new_label))?;

        if stats.is_empty() {
            if original != candidate {
                writeln!(out, "(only whitespace or line endings differ)")?;
            }
            return Ok(stats);
        }

        for (start, end) in self.hunk_ranges(&script) {
            stats.hunks += 1;
            self.write_hunk(&script, start, end, out)?;
        }
        Ok(stats)
    }

    /// Script index ranges of hunks, each padded by the context size and
    /// merged when they touch
    fn hunk_ranges(&self, script: &[DiffLine<'_>]) -> Vec<(usize, usize)> {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for (idx, line) in script.iter().enumerate() {
            if line.change == LineChange::Equal {
                continue;
            }
            let start = idx.saturating_sub(self.context);
            let end = (idx + self.context + 1).min(script.len());
            match ranges.last_mut() {
                Some(last) if start <= last.1 => last.1 = end,
                _ => ranges.push((start, end)),
            }
        }
        ranges
    }

    fn write_hunk<W: Write + ?Sized>(
        &self,
        script: &[DiffLine<'_>],
        start: usize,
        end: usize,
        out: &mut W,
    ) -> io::Result<()> {
        let old_before = script[..start]
            .iter()
            .filter(|l| l.change != LineChange::Insert)
            .count();
        let new_before = script[..start]
            .iter()
            .filter(|l| l.change != LineChange::Delete)
            .count();
        let hunk = &script[start..end];
        let old_count = hunk.iter().filter(|l| l.change != LineChange::Insert).count();
        let new_count = hunk.iter().filter(|l| l.change != LineChange::Delete).count();

        // Empty ranges point at the line before, as in GNU diff
        let old_start = if old_count == 0 { old_before } else { old_before + 1 };
        let new_start = if new_count == 0 { new_before } else { new_before + 1 };

        self.paint(
            out,
            CYAN,
            &format!("@@ -{old_start},{old_count} +{new_start},{new_count} @@"),
        )?;
        for line in hunk {
            match line.change {
                LineChange::Equal => writeln!(out, " {}", line.text)?,
                LineChange::Delete => self.paint(out, RED, &format!("-{}", line.text))?,
                LineChange::Insert => self.paint(out, GREEN, &format!("+{}", line.text))?,
            }
        }
        Ok(())
    }

    fn paint<W: Write + ?Sized>(&self, out: &mut W, style: &str, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(out, "{style}{text}{RESET}")
        } else {
            writeln!(out, "{text}")
        }
    }
}
