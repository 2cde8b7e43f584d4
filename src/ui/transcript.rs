//! Line-oriented terminal output for one session.
//!
//! Streaming narrative text is written as it arrives. With markdown enabled
//! only complete paragraphs are rendered; the rest waits for the next
//! paragraph break or for the buffer to close. A surface arriving mid-text
//! first flushes whatever text came before it.

use std::io::{self, Write};
use std::path::PathBuf;

use ratatui::crossterm::queue;
use ratatui::crossterm::style::{
    Attribute as CAttribute, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::warn;

use crate::core::resolver::{Control, RenderTree};
use crate::core::router::{RenderError, RenderSink, TextBufferId};
use crate::core::surface::SurfaceView;
use crate::ui::chart::{AreaPlotter, ChartPlotter};
use crate::ui::markdown::{render_markdown, render_narrative};
use crate::ui::theme::Theme;
use crate::ui::widget::{plain_text, WidgetLayout};
use crate::utils::logging::TranscriptLog;

pub const DEFAULT_WIDTH: usize = 80;

const CODE_FENCE: &str = "```";
const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct TranscriptOptions {
    pub theme: Theme,
    pub markdown: bool,
    pub width: usize,
    /// Emit colour and attribute escapes.
    pub styled: bool,
}

impl Default for TranscriptOptions {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            markdown: true,
            width: DEFAULT_WIDTH,
            styled: false,
        }
    }
}

#[derive(Debug)]
struct OpenBuffer {
    id: TextBufferId,
    contents: String,
    /// Byte offset of the first character not yet written.
    committed: usize,
    wrote_block: bool,
}

pub struct Transcript<W: Write> {
    out: W,
    options: TranscriptOptions,
    plotter: Box<dyn ChartPlotter + Send>,
    log: TranscriptLog,
    latest: Option<RenderTree>,
    open: Option<OpenBuffer>,
    at_line_start: bool,
}

impl<W: Write> Transcript<W> {
    pub fn new(out: W, options: TranscriptOptions) -> Self {
        Self::with_plotter(out, options, Box::new(AreaPlotter))
    }

    pub fn with_plotter(
        out: W,
        options: TranscriptOptions,
        plotter: Box<dyn ChartPlotter + Send>,
    ) -> Self {
        Self {
            out,
            options,
            plotter,
            log: TranscriptLog::new(),
            latest: None,
            open: None,
            at_line_start: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn set_width(&mut self, width: usize) {
        self.options.width = width;
    }

    pub fn set_log_file(&mut self, path: impl Into<PathBuf>) -> io::Result<String> {
        self.log.set_log_file(path)
    }

    pub fn toggle_log(&mut self) -> Result<String, String> {
        self.log.toggle()
    }

    pub fn log_status(&self) -> String {
        self.log.status()
    }

    /// Records a prompt in the transcript log; the terminal already shows it.
    pub fn user_prompt(&mut self, prompt: &str) {
        if let Err(err) = self.log.log_user(prompt) {
            warn!(error = %err, "failed to write transcript log");
        }
    }

    /// Informational line from the client itself, never logged.
    pub fn system(&mut self, message: &str) {
        self.ensure_line_start();
        let style = self.options.theme.system_text_style;
        let lines: Vec<Line<'static>> = message
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), style)))
            .collect();
        self.write_lines(&lines);
    }

    /// Buttons of the latest surface, in the order they are numbered.
    pub fn buttons(&self) -> Vec<Control> {
        self.controls(|control| matches!(control, Control::Button { .. }))
    }

    /// Text fields of the latest surface, in the order they are numbered.
    pub fn fields(&self) -> Vec<Control> {
        self.controls(|control| matches!(control, Control::Field { .. }))
    }

    fn controls(&self, keep: impl Fn(&Control) -> bool) -> Vec<Control> {
        self.latest
            .as_ref()
            .map(|tree| tree.controls().into_iter().filter(|c| keep(c)).collect())
            .unwrap_or_default()
    }

    /// Closes a buffer the server never finalized with `done`.
    pub fn finish_turn(&mut self) {
        if let Some(open) = &self.open {
            let id = open.id;
            self.close_text(id);
        }
    }

    fn ensure_line_start(&mut self) {
        if !self.at_line_start {
            self.write_raw("\n");
        }
    }

    fn write_raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = self.options.theme.assistant_text_style;
        if let Err(err) = self.write_span(text, style).and_then(|_| self.out.flush()) {
            warn!(error = %err, "failed to write to terminal");
        }
        self.at_line_start = text.ends_with('\n');
    }

    fn write_lines(&mut self, lines: &[Line<'_>]) {
        let result = lines
            .iter()
            .try_for_each(|line| self.write_line(line))
            .and_then(|_| self.out.flush());
        if let Err(err) = result {
            warn!(error = %err, "failed to write to terminal");
        }
        self.at_line_start = true;
    }

    fn write_line(&mut self, line: &Line<'_>) -> io::Result<()> {
        for span in &line.spans {
            let style = line.style.patch(span.style);
            self.write_span(span.content.as_ref(), style)?;
        }
        self.out.write_all(b"\n")
    }

    fn write_span(&mut self, text: &str, style: Style) -> io::Result<()> {
        if !self.options.styled || style == Style::default() {
            return self.out.write_all(text.as_bytes());
        }
        if let Some(fg) = style.fg {
            queue!(self.out, SetForegroundColor(fg.into()))?;
        }
        if let Some(bg) = style.bg {
            queue!(self.out, SetBackgroundColor(bg.into()))?;
        }
        for (modifier, attribute) in [
            (Modifier::BOLD, CAttribute::Bold),
            (Modifier::DIM, CAttribute::Dim),
            (Modifier::ITALIC, CAttribute::Italic),
            (Modifier::UNDERLINED, CAttribute::Underlined),
            (Modifier::REVERSED, CAttribute::Reverse),
            (Modifier::CROSSED_OUT, CAttribute::CrossedOut),
        ] {
            if style.add_modifier.contains(modifier) {
                queue!(self.out, SetAttribute(attribute))?;
            }
        }
        queue!(
            self.out,
            Print(text),
            SetAttribute(CAttribute::Reset),
            ResetColor
        )
    }

    fn write_block(&mut self, markdown: &str, separate: bool) {
        if markdown.trim().is_empty() {
            return;
        }
        let lines = render_markdown(markdown, &self.options.theme, self.options.width);
        if separate {
            self.write_lines(&[Line::default()]);
        }
        self.write_lines(&lines);
    }

    /// Writes complete markdown paragraphs of the open buffer; with `all`
    /// everything still pending is written.
    fn commit_open(&mut self, all: bool) {
        let Some(mut open) = self.open.take() else {
            return;
        };
        if self.options.markdown {
            let end = if all {
                Some(open.contents.len())
            } else {
                paragraph_commit_point(&open.contents, open.committed)
            };
            if let Some(end) = end {
                let block = open.contents[open.committed..end].to_string();
                if !block.trim().is_empty() {
                    self.write_block(&block, open.wrote_block);
                    open.wrote_block = true;
                }
                open.committed = end;
            }
        } else {
            let pending = open.contents[open.committed..].to_string();
            self.write_raw(&pending);
            open.committed = open.contents.len();
        }
        self.open = Some(open);
    }
}

/// End of the last paragraph break after `from` that is not inside a code
/// fence, if any.
fn paragraph_commit_point(contents: &str, from: usize) -> Option<usize> {
    let pending = contents.get(from..)?;
    pending
        .match_indices(PARAGRAPH_BREAK)
        .map(|(offset, _)| from + offset)
        .filter(|&at| contents[..at].matches(CODE_FENCE).count() % 2 == 0)
        .last()
        .map(|at| at + PARAGRAPH_BREAK.len())
}

impl<W: Write> RenderSink for Transcript<W> {
    fn render_surface(&mut self, view: SurfaceView) -> Result<(), RenderError> {
        self.commit_open(true);
        self.ensure_line_start();
        match view {
            SurfaceView::Raw(json) => {
                let style = self.options.theme.raw_payload_style;
                let lines: Vec<Line<'static>> = json
                    .lines()
                    .map(|line| Line::from(Span::styled(line.to_string(), style)))
                    .collect();
                self.write_lines(&lines);
                if let Err(err) = self.log.log_message(&json) {
                    warn!(error = %err, "failed to write transcript log");
                }
            }
            SurfaceView::Tree(tree) => {
                let lines = WidgetLayout::new(&tree, &self.options.theme, self.plotter.as_ref())
                    .render(self.options.width)?;
                self.write_lines(&lines);
                if let Err(err) = self.log.log_message(&plain_text(&lines)) {
                    warn!(error = %err, "failed to write transcript log");
                }
                self.latest = Some(tree);
            }
        }
        self.write_lines(&[Line::default()]);
        Ok(())
    }

    fn render_text(&mut self, buffer: TextBufferId, contents: &str) {
        if self.open.as_ref().is_none_or(|open| open.id != buffer) {
            self.finish_turn();
            self.ensure_line_start();
            self.open = Some(OpenBuffer {
                id: buffer,
                contents: String::new(),
                committed: 0,
                wrote_block: false,
            });
        }
        if let Some(open) = self.open.as_mut() {
            open.contents.clear();
            open.contents.push_str(contents);
            open.committed = open.committed.min(open.contents.len());
        }
        self.commit_open(false);
    }

    fn close_text(&mut self, buffer: TextBufferId) {
        if self.open.as_ref().is_none_or(|open| open.id != buffer) {
            return;
        }
        self.commit_open(true);
        if let Some(open) = self.open.take() {
            if let Err(err) = self.log.log_message(&open.contents) {
                warn!(error = %err, "failed to write transcript log");
            }
        }
        self.ensure_line_start();
        self.write_lines(&[Line::default()]);
    }

    fn render_message(&mut self, text: &str) {
        self.finish_turn();
        self.ensure_line_start();
        let lines = render_narrative(
            text,
            &self.options.theme,
            self.options.width,
            self.options.markdown,
        );
        self.write_lines(&lines);
        self.write_lines(&[Line::default()]);
        if let Err(err) = self.log.log_message(text) {
            warn!(error = %err, "failed to write transcript log");
        }
    }

    fn render_error(&mut self, message: &str) {
        self.ensure_line_start();
        let style = self.options.theme.error_text_style;
        self.write_lines(&[Line::from(Span::styled(message.to_string(), style))]);
        if let Err(err) = self.log.log_error(message) {
            warn!(error = %err, "failed to write transcript log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_store::DataStore;
    use crate::core::resolver::ChartSpec;
    use crate::core::surface::apply;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn transcript(markdown: bool) -> Transcript<Vec<u8>> {
        Transcript::new(
            Vec::new(),
            TranscriptOptions {
                theme: Theme::monochrome(),
                markdown,
                width: 40,
                styled: false,
            },
        )
    }

    fn output(transcript: Transcript<Vec<u8>>) -> String {
        String::from_utf8(transcript.into_inner()).expect("utf8 output")
    }

    fn surface(components: Value, root: &str, store: &mut DataStore) -> SurfaceView {
        let data = json!({
            "surfaceUpdate": {"components": components},
            "beginRendering": {"root": root}
        });
        apply(&data, store).expect("payload")
    }

    fn loan_surface(store: &mut DataStore) -> SurfaceView {
        surface(
            json!([
                {"id": "root", "component": {"Column": {"children": {"explicitList": ["rate", "go"]}}}},
                {"id": "rate", "component": {"TextField": {"label": {"literalString": "Rate"}, "text": {"path": "/loan/rate"}}}},
                {"id": "go", "component": {"Button": {"child": "go-label", "action": {"name": "calculateLoan"}}}},
                {"id": "go-label", "component": {"Text": {"text": {"literalString": "Calculate"}}}}
            ]),
            "root",
            store,
        )
    }

    #[test]
    fn plain_mode_writes_deltas_as_they_arrive() {
        let mut t = transcript(false);
        let id = TextBufferId(1);
        t.render_text(id, "Hel");
        t.render_text(id, "Hello");
        t.close_text(id);
        assert_eq!(output(t), "Hello\n\n");
    }

    #[test]
    fn markdown_mode_commits_whole_paragraphs() {
        let mut t = transcript(true);
        let id = TextBufferId(1);
        t.render_text(id, "First para\n\nSec");
        t.render_text(id, "First para\n\nSecond");
        t.close_text(id);
        assert_eq!(output(t), "First para\n\nSecond\n\n");
    }

    #[test]
    fn open_code_fence_holds_back_paragraph_breaks() {
        assert_eq!(paragraph_commit_point("```\ncode\n\nmore", 0), None);
        assert_eq!(paragraph_commit_point("a\n\n```\nx\n\ny", 0), Some(3));
        assert_eq!(paragraph_commit_point("a\n\nb\n\nc", 3), Some(6));
    }

    #[test]
    fn surface_flushes_pending_text_first() {
        let mut t = transcript(true);
        let mut store = DataStore::new();
        t.render_text(TextBufferId(1), "Intro");
        let view = surface(
            json!([{"id": "w", "component": {"Text": {"text": {"literalString": "Widget"}}}}]),
            "w",
            &mut store,
        );
        t.render_surface(view).unwrap();
        t.render_text(TextBufferId(1), "Intro\n\nOutro");
        t.close_text(TextBufferId(1));
        let out = output(t);
        let intro = out.find("Intro").expect("intro");
        let widget = out.find("Widget").expect("widget");
        let outro = out.find("Outro").expect("outro");
        assert!(intro < widget && widget < outro);
        assert_eq!(out.matches("Intro").count(), 1);
    }

    #[test]
    fn narrower_width_rewraps_later_output() {
        let mut t = transcript(true);
        t.render_message("alpha beta gamma delta");
        t.set_width(10);
        t.render_message("alpha beta gamma delta");
        let out = output(t);
        let lines: Vec<&str> = out.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines[0], "alpha beta gamma delta");
        assert!(lines.len() > 2, "{out:?}");
        assert!(lines[1..].iter().all(|l| l.chars().count() <= 10), "{out:?}");
    }

    #[test]
    fn raw_surface_prints_payload_json() {
        let mut t = transcript(true);
        t.render_surface(SurfaceView::Raw("{\n  \"x\": 1\n}".into()))
            .unwrap();
        assert_eq!(output(t), "{\n  \"x\": 1\n}\n\n");
    }

    #[test]
    fn controls_come_from_latest_surface() {
        let mut t = transcript(true);
        let mut store = DataStore::new();
        assert!(t.buttons().is_empty());
        t.render_surface(loan_surface(&mut store)).unwrap();

        let buttons = t.buttons();
        assert_eq!(buttons.len(), 1);
        assert!(matches!(
            &buttons[0],
            Control::Button { label, action: Some(action), .. }
                if label == "Calculate" && action.name == "calculateLoan"
        ));
        let fields = t.fields();
        assert!(matches!(
            &fields[0],
            Control::Field { label, binding: Some(path), .. }
                if label == "Rate" && path == "/loan/rate"
        ));
        let out = output(t);
        assert!(out.contains("[1] Rate: ____"));
        assert!(out.contains("[1]  Calculate"));
    }

    struct FailingPlotter;

    impl ChartPlotter for FailingPlotter {
        fn plot(
            &self,
            _spec: &ChartSpec,
            _width: usize,
            _theme: &Theme,
        ) -> Result<Vec<Line<'static>>, RenderError> {
            Err(RenderError::Chart {
                message: "no canvas".into(),
            })
        }
    }

    #[test]
    fn failed_surface_keeps_previous_controls() {
        let mut t = Transcript::with_plotter(
            Vec::new(),
            TranscriptOptions::default(),
            Box::new(FailingPlotter),
        );
        let mut store = DataStore::new();
        t.render_surface(loan_surface(&mut store)).unwrap();
        let chart = surface(
            json!([{"id": "c", "component": {"Chart": {"data": [
                {"time": "a", "value": 1}, {"time": "b", "value": 2}
            ]}}}]),
            "c",
            &mut store,
        );
        assert!(t.render_surface(chart).is_err());
        assert_eq!(t.buttons().len(), 1);
    }

    #[test]
    fn transcript_log_records_prompts_text_and_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.log");
        let mut t = transcript(false);
        t.set_log_file(&path).unwrap();

        t.user_prompt("hi");
        t.render_text(TextBufferId(1), "Hello there");
        t.close_text(TextBufferId(1));
        t.render_error("[System Error: Failed to render UI components. boom]");

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("You: hi\n"));
        assert!(log.contains("Hello there\n"));
        assert!(log.contains("## [System Error: Failed to render UI components. boom]"));
    }

    #[test]
    fn finish_turn_closes_an_unfinished_buffer() {
        let mut t = transcript(true);
        t.render_text(TextBufferId(3), "cut off");
        t.finish_turn();
        t.finish_turn();
        assert_eq!(output(t), "cut off\n\n");
    }

    #[test]
    fn styled_output_emits_escapes() {
        let mut t = Transcript::new(
            Vec::new(),
            TranscriptOptions {
                styled: true,
                ..TranscriptOptions::default()
            },
        );
        t.render_error("boom");
        let out = output(t);
        assert!(out.contains("\u{1b}["));
        assert!(out.contains("boom"));
    }
}
