use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a line in terminal cells.
pub fn line_width(line: &Line<'_>) -> usize {
    line.spans
        .iter()
        .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
        .sum()
}

/// Right-pads `line` with spaces up to `width` cells.
pub fn pad_line(mut line: Line<'static>, width: usize) -> Line<'static> {
    let current = line_width(&line);
    if current < width {
        line.spans.push(Span::raw(" ".repeat(width - current)));
    }
    line
}

/// Wrap spans to the provided width while preserving styles and word
/// boundaries. Words longer than `MAX_UNBREAKABLE_LENGTH` (or the width) are
/// hard-broken. Always returns at least one (possibly empty) line.
pub fn wrap_spans(spans: &[Span<'static>], max_width: usize) -> Vec<Line<'static>> {
    const MAX_UNBREAKABLE_LENGTH: usize = 30;
    let max_width = max_width.max(1);
    if spans.is_empty() {
        return vec![Line::default()];
    }
    let mut wrapped_lines: Vec<Vec<Span<'static>>> = Vec::new();
    let mut current_line: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;
    let parts: Vec<(String, Style)> = spans
        .iter()
        .map(|s| (s.content.to_string(), s.style))
        .collect();
    for (mut text, style) in parts {
        while !text.is_empty() {
            let mut chars_to_fit = 0usize;
            let mut width_so_far = 0usize;
            let mut last_break_pos: Option<usize> = None;
            for (char_pos, ch) in text.char_indices() {
                let cw = ch.width().unwrap_or(0);
                if current_width + width_so_far + cw <= max_width {
                    width_so_far += cw;
                    chars_to_fit = char_pos + ch.len_utf8();
                    if ch.is_whitespace() {
                        last_break_pos = Some(char_pos + ch.len_utf8());
                    }
                } else {
                    if ch.is_whitespace() {
                        last_break_pos = Some(char_pos);
                    }
                    break;
                }
            }
            if chars_to_fit == 0 {
                if !current_line.is_empty() {
                    wrapped_lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                    continue;
                }
                let next_word_end = text.find(char::is_whitespace).unwrap_or(text.len());
                let next_word = &text[..next_word_end];
                let ww = UnicodeWidthStr::width(next_word);
                if ww <= MAX_UNBREAKABLE_LENGTH.min(max_width) && next_word_end > 0 {
                    current_line.push(Span::styled(next_word.to_string(), style));
                    current_width += ww;
                    text = text[next_word_end..].to_string();
                    continue;
                }
                // Hard break the very long token.
                let mut forced_width = 0usize;
                let mut forced_end = 0usize;
                for (char_pos, ch) in text.char_indices() {
                    let cw = ch.width().unwrap_or(0);
                    if forced_width + cw > max_width && forced_end > 0 {
                        break;
                    }
                    forced_width += cw;
                    forced_end = char_pos + ch.len_utf8();
                }
                current_line.push(Span::styled(text[..forced_end].to_string(), style));
                current_width = forced_width;
                text = text[forced_end..].to_string();
                if !text.is_empty() {
                    wrapped_lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
            } else if chars_to_fit >= text.len() {
                current_line.push(Span::styled(text.clone(), style));
                current_width += width_so_far;
                break;
            } else {
                let break_pos = match last_break_pos {
                    Some(pos) => pos,
                    None if current_width > 0 => {
                        // Start the word on the next line instead of splitting it.
                        wrapped_lines.push(std::mem::take(&mut current_line));
                        current_width = 0;
                        continue;
                    }
                    None => chars_to_fit,
                };
                let left = text[..break_pos].trim_end();
                if !left.is_empty() {
                    let left_width = UnicodeWidthStr::width(left);
                    current_line.push(Span::styled(left.to_string(), style));
                    current_width += left_width;
                }
                text = text[break_pos..].trim_start().to_string();
                if !text.is_empty() {
                    wrapped_lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
            }
        }
    }
    if !current_line.is_empty() {
        wrapped_lines.push(current_line);
    }
    if wrapped_lines.is_empty() {
        return vec![Line::default()];
    }
    wrapped_lines.into_iter().map(Line::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line<'static>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn wrap_splits_at_spaces() {
        let wrapped = wrap_spans(&[Span::raw("word boundary test")], 6);
        assert_eq!(texts(&wrapped), vec!["word", "bounda", "ry", "test"]);
    }

    #[test]
    fn wrap_keeps_styles_across_spans() {
        let bold = Style::default().add_modifier(ratatui::style::Modifier::BOLD);
        let spans = vec![Span::styled("Monthly ", bold), Span::raw("payment due")];
        let wrapped = wrap_spans(&spans, 12);
        assert_eq!(texts(&wrapped), vec!["Monthly ", "payment due"]);
        assert_eq!(wrapped[0].spans[0].style, bold);
        for line in &wrapped {
            assert!(line_width(line) <= 12);
        }
    }

    #[test]
    fn wide_characters_count_double() {
        let wrapped = wrap_spans(&[Span::raw("안녕하세요")], 4);
        assert_eq!(texts(&wrapped), vec!["안녕", "하세", "요"]);
    }

    #[test]
    fn pad_line_fills_to_width() {
        let padded = pad_line(Line::from("ab"), 5);
        assert_eq!(line_width(&padded), 5);
        let untouched = pad_line(Line::from("abcdef"), 3);
        assert_eq!(line_width(&untouched), 6);
    }
}
