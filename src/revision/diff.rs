// MIT License
// Copyright (c) 2024 Graham King

//! Line-based side-by-side diff for comparing revisions

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Equal,
    Added,
    Removed,
    Changed,
}

/// One row of the side-by-side view. The side without a line is `None`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DiffRow {
    pub status: DiffStatus,
    pub left: Option<String>,
    pub right: Option<String>,
}

impl DiffRow {
    fn new(status: DiffStatus, left: Option<&str>, right: Option<&str>) -> DiffRow {
        DiffRow {
            status,
            left: left.map(str::to_string),
            right: right.map(str::to_string),
        }
    }

    /// Both sides as escaped HTML, with the differing part wrapped in
    /// `<del>` on the left and `<ins>` on the right
    pub fn marked_html(&self) -> (String, String) {
        let left = self.left.as_deref().unwrap_or("");
        let right = self.right.as_deref().unwrap_or("");
        match self.status {
            DiffStatus::Equal => (escape(left), escape(right)),
            DiffStatus::Removed => (format!("<del>{}</del>", escape(left)), String::new()),
            DiffStatus::Added => (String::new(), format!("<ins>{}</ins>", escape(right))),
            DiffStatus::Changed => {
                let (prefix, suffix) = common_affixes(left, right);
                let mark = |s: &str, tag: &str| {
                    format!(
                        "{}<{tag}>{}</{tag}>{}",
                        escape(&s[..prefix]),
                        escape(&s[prefix..s.len() - suffix]),
                        escape(&s[s.len() - suffix..]),
                    )
                };
                (mark(left, "del"), mark(right, "ins"))
            }
        }
    }
}

/// Compare two texts line by line.
///
/// Removed lines directly followed by added lines are paired up as
/// `Changed` rows, the leftovers of the longer run are padded with `None` on
/// the other side.
pub fn diff(old: &str, new: &str) -> Vec<DiffRow> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let m = old_lines.len();
    let n = new_lines.len();

    // lcs[i][j] = longest common subsequence of old[i..] and new[j..]
    let mut lcs = vec![vec![0u32; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            lcs[i][j] = if old_lines[i] == new_lines[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut rows = Vec::with_capacity(m.max(n));
    let mut removed: Vec<&str> = Vec::new();
    let mut added: Vec<&str> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < m || j < n {
        if i < m && j < n && old_lines[i] == new_lines[j] {
            flush(&mut rows, &mut removed, &mut added);
            rows.push(DiffRow::new(DiffStatus::Equal, Some(old_lines[i]), Some(new_lines[j])));
            i += 1;
            j += 1;
        } else if i < m && (j == n || lcs[i + 1][j] >= lcs[i][j + 1]) {
            removed.push(old_lines[i]);
            i += 1;
        } else {
            added.push(new_lines[j]);
            j += 1;
        }
    }
    flush(&mut rows, &mut removed, &mut added);
    rows
}

fn flush<'a>(rows: &mut Vec<DiffRow>, removed: &mut Vec<&'a str>, added: &mut Vec<&'a str>) {
    let pairs = removed.len().max(added.len());
    for k in 0..pairs {
        let left = removed.get(k).copied();
        let right = added.get(k).copied();
        let status = match (left, right) {
            (Some(_), Some(_)) => DiffStatus::Changed,
            (Some(_), None) => DiffStatus::Removed,
            _ => DiffStatus::Added,
        };
        rows.push(DiffRow::new(status, left, right));
    }
    removed.clear();
    added.clear();
}

// Byte lengths of the shared prefix and suffix, on char boundaries, not overlapping
fn common_affixes(a: &str, b: &str) -> (usize, usize) {
    let prefix: usize = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum();
    let max_suffix = (a.len() - prefix).min(b.len() - prefix);
    let suffix: usize = a[prefix..]
        .chars()
        .rev()
        .zip(b[prefix..].chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .scan(0, |acc, len| {
            *acc += len;
            Some(*acc)
        })
        .take_while(|total| *total <= max_suffix)
        .last()
        .unwrap_or(0);
    (prefix, suffix)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(rows: &[DiffRow]) -> Vec<DiffStatus> {
        rows.iter().map(|r| r.status).collect()
    }

    #[test]
    fn identical_texts_are_all_equal() {
        let text = "a\nb\nc";
        let rows = diff(text, text);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.status == DiffStatus::Equal));
        assert_eq!(rows, diff(text, text));
    }

    #[test]
    fn added_and_removed_lines_are_padded() {
        let rows = diff("a\nb", "a\nb\nc");
        assert_eq!(statuses(&rows), [DiffStatus::Equal, DiffStatus::Equal, DiffStatus::Added]);
        assert_eq!(rows[2].left, None);
        assert_eq!(rows[2].right.as_deref(), Some("c"));

        let rows = diff("a\nb\nc", "a");
        assert_eq!(statuses(&rows), [DiffStatus::Equal, DiffStatus::Removed, DiffStatus::Removed]);
        assert_eq!(rows[1].right, None);
    }

    #[test]
    fn replaced_lines_pair_up_as_changed() {
        let rows = diff("keep\nold one\nold two\nend", "keep\nnew one\nend");
        assert_eq!(
            statuses(&rows),
            [DiffStatus::Equal, DiffStatus::Changed, DiffStatus::Removed, DiffStatus::Equal]
        );
        assert_eq!(rows[1].left.as_deref(), Some("old one"));
        assert_eq!(rows[1].right.as_deref(), Some("new one"));
        assert_eq!(rows[2].left.as_deref(), Some("old two"));
    }

    #[test]
    fn empty_sides() {
        assert!(diff("", "").is_empty());
        assert_eq!(statuses(&diff("", "x")), [DiffStatus::Added]);
        assert_eq!(statuses(&diff("x", "")), [DiffStatus::Removed]);
    }

    #[test]
    fn changed_rows_mark_only_the_difference() {
        let rows = diff("the cat sat", "the dog sat");
        let (left, right) = rows[0].marked_html();
        assert_eq!(left, "the <del>cat</del> sat");
        assert_eq!(right, "the <ins>dog</ins> sat");
    }

    #[test]
    fn markers_escape_html_and_handle_overlap() {
        let row = DiffRow::new(DiffStatus::Changed, Some("a<b"), Some("a<b<b"));
        let (left, right) = row.marked_html();
        assert_eq!(left, "a&lt;b<del></del>");
        assert_eq!(right, "a&lt;b<ins>&lt;b</ins>");

        let row = DiffRow::new(DiffStatus::Removed, Some("x & y"), None);
        assert_eq!(row.marked_html(), ("<del>x &amp; y</del>".to_string(), String::new()));
    }
}
