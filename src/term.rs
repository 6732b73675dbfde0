// MIT License
// Copyright (c) 2024 Graham King

use std::io::{self, Write};

const DEFAULT_WIDTH: usize = 80;

#[repr(C)]
struct Winsize {
    ws_row: u16,
    ws_col: u16,
    ws_xpixel: u16,
    ws_ypixel: u16,
}

/// Columns of the terminal on stdout, 80 when it isn't a terminal
pub fn width() -> usize {
    let mut winsize: Winsize = unsafe { std::mem::zeroed() };
    let fd = 1; // standard output
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) } == -1 || winsize.ws_col == 0 {
        return DEFAULT_WIDTH;
    }
    winsize.ws_col as usize
}

/// `left` then `right` flush to the right edge, `left` cut short to fit
pub fn row(out: &mut impl Write, width: usize, left: &str, right: &str) -> io::Result<()> {
    let room = width.saturating_sub(right.chars().count() + 1);
    let left = truncate(left, room);
    let spaces = " ".repeat(width.saturating_sub(left.chars().count() + right.chars().count()).max(1));
    writeln!(out, "{left}{spaces}{right}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut cut: String = s.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_fits_width() {
        let mut out = vec![];
        row(&mut out, 20, "A very long article title", "[12]").unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(line.trim_end_matches('\n').chars().count(), 20);
        assert!(line.starts_with("A very long ar…"));
        assert!(line.trim_end().ends_with("[12]"));
    }

    #[test]
    fn short_row_is_padded() {
        let mut out = vec![];
        row(&mut out, 12, "Hi", "3").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hi         3\n");
    }
}
