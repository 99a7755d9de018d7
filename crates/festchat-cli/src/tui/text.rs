//! Text utilities for TUI rendering.

use unicode_width::UnicodeWidthChar;

/// Word-wrap text to a display width, prefixing every line with `indent`.
///
/// Breaks at spaces where possible and hard-splits words longer than the
/// effective width. Width is measured in terminal columns, not chars.
pub fn wrap_indented(text: &str, width: usize, indent: &str) -> Vec<String> {
    let indent_width: usize = indent.chars().filter_map(UnicodeWidthChar::width).sum();
    let effective = width.saturating_sub(indent_width);
    if effective == 0 {
        return vec![format!("{indent}{text}")];
    }

    let mut lines = Vec::new();
    for source_line in text.lines() {
        if source_line.is_empty() {
            lines.push(indent.to_owned());
            continue;
        }

        let mut line = String::new();
        let mut line_width = 0;
        for word in source_line.split(' ') {
            let word_width: usize = word.chars().filter_map(UnicodeWidthChar::width).sum();
            let sep = usize::from(!line.is_empty());

            if line_width + sep + word_width <= effective {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += sep + word_width;
                continue;
            }

            if !line.is_empty() {
                lines.push(format!("{indent}{line}"));
                line.clear();
                line_width = 0;
            }

            if word_width <= effective {
                line.push_str(word);
                line_width = word_width;
            } else {
                // Hard-split an overlong word.
                for ch in word.chars() {
                    let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1);
                    if line_width + ch_width > effective && !line.is_empty() {
                        lines.push(format!("{indent}{line}"));
                        line.clear();
                        line_width = 0;
                    }
                    line.push(ch);
                    line_width += ch_width;
                }
            }
        }
        if !line.is_empty() {
            lines.push(format!("{indent}{line}"));
        }
    }

    if lines.is_empty() {
        lines.push(indent.to_owned());
    }
    lines
}
