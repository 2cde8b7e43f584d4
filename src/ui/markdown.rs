//! Narrative text to styled lines.
//!
//! Markdown goes through `pulldown-cmark`; the plain path keeps the text
//! literal and only wraps it.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::ui::theme::Theme;
use crate::ui::wrap::wrap_spans;

#[derive(Clone, Copy, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

pub fn render_markdown(content: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    MarkdownRenderer::new(theme, width).render(content)
}

pub fn render_plain(content: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    content
        .lines()
        .flat_map(|line| {
            wrap_spans(
                &[Span::styled(line.to_string(), theme.assistant_text_style)],
                width,
            )
        })
        .collect()
}

/// Markdown when `markdown` is set, literal text otherwise.
pub fn render_narrative(
    content: &str,
    theme: &Theme,
    width: usize,
    markdown: bool,
) -> Vec<Line<'static>> {
    if markdown {
        render_markdown(content, theme, width)
    } else {
        render_plain(content, theme, width)
    }
}

struct MarkdownRenderer<'a> {
    theme: &'a Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    current_spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    list_stack: Vec<ListKind>,
    /// Marker of a list item whose first line has not been flushed yet.
    pending_marker: Option<Span<'static>>,
    /// Width of the marker on the current list item, for continuation lines.
    item_marker_width: usize,
    quote_depth: usize,
    link_stack: Vec<String>,
    code_block: Option<String>,
}

impl<'a> MarkdownRenderer<'a> {
    fn new(theme: &'a Theme, width: usize) -> Self {
        Self {
            theme,
            width: width.max(8),
            lines: Vec::new(),
            current_spans: Vec::new(),
            style_stack: vec![theme.assistant_text_style],
            list_stack: Vec::new(),
            pending_marker: None,
            item_marker_width: 0,
            quote_depth: 0,
            link_stack: Vec::new(),
            code_block: None,
        }
    }

    fn render(mut self, content: &str) -> Vec<Line<'static>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        for event in Parser::new_ext(content, options) {
            match event {
                Event::Start(tag) => self.start_tag(tag),
                Event::End(tag_end) => self.end_tag(tag_end),
                Event::Text(text) => {
                    if let Some(buffer) = self.code_block.as_mut() {
                        buffer.push_str(&text);
                    } else {
                        let style = self.current_style();
                        self.current_spans.push(Span::styled(text.into_string(), style));
                    }
                }
                Event::Code(code) => {
                    self.current_spans
                        .push(Span::styled(code.into_string(), self.theme.md_code_style));
                }
                Event::SoftBreak => {
                    let style = self.current_style();
                    self.current_spans.push(Span::styled(" ", style));
                }
                Event::HardBreak => self.flush_current_spans(),
                Event::Rule => {
                    self.flush_current_spans();
                    self.lines.push(Line::from(Span::styled(
                        "─".repeat(self.width),
                        self.theme.border_style,
                    )));
                    self.push_blank_line();
                }
                Event::TaskListMarker(checked) => {
                    let marker = if checked { "[x] " } else { "[ ] " };
                    self.current_spans
                        .push(Span::styled(marker, self.theme.md_list_marker_style));
                }
                Event::Html(html) | Event::InlineHtml(html) => {
                    let style = self.current_style();
                    self.current_spans
                        .push(Span::styled(html.trim_end().to_string(), style));
                }
                _ => {}
            }
        }
        self.flush_current_spans();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.flush_current_spans();
                self.style_stack.push(self.theme.md_heading_style);
            }
            Tag::BlockQuote(_) => {
                self.flush_current_spans();
                self.quote_depth += 1;
                self.style_stack.push(self.theme.md_quote_style);
            }
            Tag::List(start) => {
                self.flush_current_spans();
                self.list_stack.push(match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Unordered,
                });
            }
            Tag::Item => {
                self.flush_current_spans();
                let marker = match self.list_stack.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let cur = *n;
                        *n += 1;
                        format!("{cur}. ")
                    }
                    _ => "- ".to_string(),
                };
                self.item_marker_width = marker.width();
                self.pending_marker = Some(Span::styled(marker, self.theme.md_list_marker_style));
            }
            Tag::CodeBlock(kind) => {
                self.flush_current_spans();
                if let CodeBlockKind::Fenced(lang) = &kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            format!("  {lang}"),
                            self.theme.system_text_style,
                        )));
                    }
                }
                self.code_block = Some(String::new());
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } => {
                self.style_stack.push(self.theme.md_link_style);
                self.link_stack.push(dest_url.into_string());
            }
            Tag::Image { dest_url, .. } => {
                self.style_stack.push(self.theme.md_link_style);
                self.link_stack.push(dest_url.into_string());
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph => {
                self.flush_current_spans();
                if self.list_stack.is_empty() {
                    self.push_blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.style_stack.pop();
                self.flush_current_spans();
                self.push_blank_line();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_current_spans();
                self.style_stack.pop();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.push_blank_line();
                }
            }
            TagEnd::List(_) => {
                self.flush_current_spans();
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.item_marker_width = 0;
                    self.push_blank_line();
                }
            }
            TagEnd::Item => self.flush_current_spans(),
            TagEnd::CodeBlock => self.finalize_code_block(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.style_stack.pop();
            }
            TagEnd::Link | TagEnd::Image => {
                self.style_stack.pop();
                if let Some(url) = self.link_stack.pop() {
                    let shown: String = self
                        .current_spans
                        .iter()
                        .map(|s| s.content.as_ref())
                        .collect();
                    if !url.is_empty() && !shown.ends_with(url.as_str()) {
                        self.current_spans.push(Span::styled(
                            format!(" <{url}>"),
                            self.theme.system_text_style,
                        ));
                    }
                }
            }
            TagEnd::TableCell => {
                self.current_spans
                    .push(Span::styled(" │ ", self.theme.border_style));
            }
            TagEnd::TableHead | TagEnd::TableRow => self.flush_current_spans(),
            TagEnd::Table => {
                self.flush_current_spans();
                self.push_blank_line();
            }
            _ => {}
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.current_style().add_modifier(modifier);
        self.style_stack.push(style);
    }

    fn prefix(&self, continuation: bool) -> Vec<Span<'static>> {
        let mut prefix = Vec::new();
        if self.quote_depth > 0 {
            prefix.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                self.theme.md_quote_style,
            ));
        }
        let depth = self.list_stack.len().saturating_sub(1);
        let mut indent = depth * 2;
        if continuation && !self.list_stack.is_empty() {
            indent += self.item_marker_width;
        }
        if indent > 0 {
            prefix.push(Span::raw(" ".repeat(indent)));
        }
        prefix
    }

    fn flush_current_spans(&mut self) {
        let marker = self.pending_marker.take();
        if self.current_spans.is_empty() {
            if let Some(marker) = marker {
                let mut line = self.prefix(false);
                line.push(marker);
                self.lines.push(Line::from(line));
            }
            return;
        }
        let spans = std::mem::take(&mut self.current_spans);
        let mut first_prefix = self.prefix(false);
        first_prefix.extend(marker);
        let rest_prefix = self.prefix(true);
        let prefix_width = rest_prefix
            .iter()
            .map(|s| s.content.width())
            .sum::<usize>();
        let available = self.width.saturating_sub(prefix_width).max(8);
        for (i, line) in wrap_spans(&spans, available).into_iter().enumerate() {
            let mut out = if i == 0 {
                first_prefix.clone()
            } else {
                rest_prefix.clone()
            };
            out.extend(line.spans);
            self.lines.push(Line::from(out));
        }
    }

    fn finalize_code_block(&mut self) {
        let Some(code) = self.code_block.take() else {
            return;
        };
        let prefix = self.prefix(true);
        for raw in code.trim_end_matches('\n').split('\n') {
            let mut spans = prefix.clone();
            spans.push(Span::styled(
                format!("  {}", raw.replace('\t', "    ")),
                self.theme.md_code_style,
            ));
            self.lines.push(Line::from(spans));
        }
        self.push_blank_line();
    }

    fn push_blank_line(&mut self) {
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }
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
    fn paragraphs_are_separated_by_one_blank_line() {
        let theme = Theme::dark();
        let lines = render_markdown("First para.\n\nSecond para.", &theme, 80);
        assert_eq!(texts(&lines), vec!["First para.", "", "Second para."]);
    }

    #[test]
    fn heading_and_emphasis_are_styled() {
        let theme = Theme::dark();
        let lines = render_markdown("# Rates\n\nThis is **bold**.", &theme, 80);
        assert_eq!(lines[0].spans[0].style, theme.md_heading_style);
        let bold = lines[2]
            .spans
            .iter()
            .find(|s| s.content == "bold")
            .expect("bold span");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn lists_get_markers_and_hanging_indent() {
        let theme = Theme::dark();
        let lines = render_markdown("- alpha beta gamma\n- delta\n\n1. one\n2. two", &theme, 12);
        let text = texts(&lines);
        assert_eq!(text[0], "- alpha beta");
        assert_eq!(text[1], "  gamma");
        assert_eq!(text[2], "- delta");
        assert!(text.contains(&"1. one".to_string()));
        assert!(text.contains(&"2. two".to_string()));
    }

    #[test]
    fn code_blocks_keep_their_lines() {
        let theme = Theme::dark();
        let lines = render_markdown("```\nlet x = 1;\n\nlet y = 2;\n```", &theme, 80);
        assert_eq!(texts(&lines), vec!["  let x = 1;", "  ", "  let y = 2;"]);
    }

    #[test]
    fn links_show_their_target() {
        let theme = Theme::dark();
        let lines = render_markdown("See [docs](https://a2ui.org).", &theme, 80);
        assert_eq!(texts(&lines), vec!["See docs <https://a2ui.org>."]);
    }

    #[test]
    fn plain_mode_keeps_markup_literal() {
        let theme = Theme::dark();
        let lines = render_narrative("**not bold**", &theme, 80, false);
        assert_eq!(texts(&lines), vec!["**not bold**"]);
    }
}
