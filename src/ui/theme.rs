use ratatui::style::{Color, Modifier, Style};

use crate::core::resolver::{StyleOverrides, TextRole};

pub const THEME_NAMES: [&str; 3] = ["dark", "light", "monochrome"];

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    /// False for monochrome: component and chart colours are ignored.
    pub colors: bool,

    // Transcript
    pub user_prefix_style: Style,
    pub assistant_text_style: Style,
    pub system_text_style: Style,
    pub error_text_style: Style,
    pub raw_payload_style: Style,

    // Markdown
    pub md_heading_style: Style,
    pub md_code_style: Style,
    pub md_quote_style: Style,
    pub md_link_style: Style,
    pub md_list_marker_style: Style,

    // Widgets
    pub heading_style: Style,
    pub caption_style: Style,
    pub link_style: Style,
    pub news_title_style: Style,
    pub news_meta_style: Style,
    pub header_title_style: Style,
    pub header_subtitle_style: Style,
    pub field_label_style: Style,
    pub field_value_style: Style,
    pub button_style: Style,
    pub control_index_style: Style,
    pub border_style: Style,
    pub placeholder_style: Style,
    pub chart_axis_style: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Theme {
            name: "dark",
            colors: true,
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(Color::White),
            system_text_style: Style::default().fg(Color::DarkGray),
            error_text_style: Style::default().fg(Color::LightRed),
            raw_payload_style: Style::default().fg(Color::Gray),

            md_heading_style: Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
            md_code_style: Style::default().fg(Color::LightYellow),
            md_quote_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            md_link_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
            md_list_marker_style: Style::default().fg(Color::Cyan),

            heading_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            caption_style: Style::default().fg(Color::Gray),
            link_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
            news_title_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            news_meta_style: Style::default().fg(Color::Gray),
            header_title_style: Style::default()
                .fg(Color::Rgb(0x8B, 0x73, 0x55))
                .add_modifier(Modifier::BOLD),
            header_subtitle_style: Style::default().fg(Color::Gray),
            field_label_style: Style::default().fg(Color::Gray),
            field_value_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::UNDERLINED),
            button_style: Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(0x4A, 0x5D, 0x4A)),
            control_index_style: Style::default().fg(Color::DarkGray),
            border_style: Style::default().fg(Color::DarkGray),
            placeholder_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            chart_axis_style: Style::default().fg(Color::DarkGray),
        }
    }

    pub fn light() -> Self {
        Theme {
            name: "light",
            colors: true,
            user_prefix_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(Color::Black),
            system_text_style: Style::default().fg(Color::Gray),
            error_text_style: Style::default().fg(Color::Red),
            raw_payload_style: Style::default().fg(Color::DarkGray),

            md_heading_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            md_code_style: Style::default().fg(Color::Magenta),
            md_quote_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            md_link_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            md_list_marker_style: Style::default().fg(Color::Blue),

            heading_style: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            caption_style: Style::default().fg(Color::DarkGray),
            link_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            news_title_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            news_meta_style: Style::default().fg(Color::DarkGray),
            header_title_style: Style::default()
                .fg(Color::Rgb(0x8B, 0x73, 0x55))
                .add_modifier(Modifier::BOLD),
            header_subtitle_style: Style::default().fg(Color::DarkGray),
            field_label_style: Style::default().fg(Color::DarkGray),
            field_value_style: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::UNDERLINED),
            button_style: Style::default()
                .fg(Color::White)
                .bg(Color::Rgb(0x4A, 0x5D, 0x4A)),
            control_index_style: Style::default().fg(Color::Gray),
            border_style: Style::default().fg(Color::Gray),
            placeholder_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            chart_axis_style: Style::default().fg(Color::Gray),
        }
    }

    /// Modifiers only; no colour escapes at all.
    pub fn monochrome() -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().add_modifier(Modifier::DIM);
        let underlined = Style::default().add_modifier(Modifier::UNDERLINED);
        Theme {
            name: "monochrome",
            colors: false,
            user_prefix_style: bold,
            assistant_text_style: Style::default(),
            system_text_style: dim,
            error_text_style: bold,
            raw_payload_style: Style::default(),

            md_heading_style: bold,
            md_code_style: Style::default(),
            md_quote_style: Style::default().add_modifier(Modifier::ITALIC),
            md_link_style: underlined,
            md_list_marker_style: Style::default(),

            heading_style: bold,
            caption_style: dim,
            link_style: underlined,
            news_title_style: bold.add_modifier(Modifier::UNDERLINED),
            news_meta_style: dim,
            header_title_style: bold,
            header_subtitle_style: dim,
            field_label_style: Style::default(),
            field_value_style: underlined,
            button_style: Style::default().add_modifier(Modifier::REVERSED),
            control_index_style: dim,
            border_style: Style::default(),
            placeholder_style: dim,
            chart_axis_style: Style::default(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dark" | "default" => Some(Self::dark()),
            "light" => Some(Self::light()),
            "monochrome" | "mono" | "plain" => Some(Self::monochrome()),
            _ => None,
        }
    }

    pub fn text_style(&self, role: &TextRole) -> Style {
        match role {
            TextRole::Body | TextRole::Custom(_) => self.assistant_text_style,
            TextRole::Heading(1) => self.heading_style.add_modifier(Modifier::UNDERLINED),
            TextRole::Heading(3) if self.colors => {
                self.heading_style.fg(Color::Rgb(0x8B, 0x5A, 0x5A))
            }
            TextRole::Heading(_) => self.heading_style,
            TextRole::Caption => self.caption_style,
            TextRole::Link => self.link_style,
            TextRole::NewsTitle => self.news_title_style,
            TextRole::NewsPublisher => self.news_meta_style.add_modifier(Modifier::BOLD),
            TextRole::NewsDate => self.news_meta_style,
            TextRole::HeaderTitle => self.header_title_style,
            TextRole::HeaderSubtitle => self.header_subtitle_style,
        }
    }

    /// Applies the subset of CSS-like overrides a terminal can show.
    pub fn apply_overrides(&self, mut style: Style, overrides: &StyleOverrides) -> Style {
        for (key, value) in overrides {
            let value = value.trim().to_ascii_lowercase();
            match key.as_str() {
                "color" if self.colors => {
                    if let Some(color) = parse_color(&value) {
                        style = style.fg(color);
                    }
                }
                "fontWeight" => {
                    let heavy = value == "bold"
                        || value == "bolder"
                        || value.parse::<u16>().is_ok_and(|w| w >= 600);
                    if heavy {
                        style = style.add_modifier(Modifier::BOLD);
                    } else if value == "normal" || value == "lighter" {
                        style = style.remove_modifier(Modifier::BOLD);
                    }
                }
                "fontStyle" => match value.as_str() {
                    "italic" | "oblique" => style = style.add_modifier(Modifier::ITALIC),
                    "normal" => style = style.remove_modifier(Modifier::ITALIC),
                    _ => {}
                },
                "textDecoration" => {
                    if value.contains("underline") {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                    if value.contains("line-through") {
                        style = style.add_modifier(Modifier::CROSSED_OUT);
                    }
                    if value == "none" {
                        style = style
                            .remove_modifier(Modifier::UNDERLINED)
                            .remove_modifier(Modifier::CROSSED_OUT);
                    }
                }
                _ => {}
            }
        }
        style
    }

    /// Foreground for a chart series; `None` when colours are disabled or
    /// the value does not parse.
    pub fn series_color(&self, value: &str) -> Option<Color> {
        if self.colors {
            parse_color(value)
        } else {
            None
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// `#rgb`, `#rrggbb`, `rgb(r, g, b)` or a basic colour name.
pub fn parse_color(s: &str) -> Option<Color> {
    let lower = s.trim().to_ascii_lowercase();
    if let Some(c) = parse_hex_color(&lower) {
        return Some(c);
    }
    if let Some(c) = parse_rgb_func(&lower) {
        return Some(c);
    }
    match lower.as_str() {
        "black" => Some(Color::Black),
        "white" => Some(Color::White),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" | "dark-gray" => Some(Color::DarkGray),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "blue" => Some(Color::Blue),
        "cyan" => Some(Color::Cyan),
        "magenta" => Some(Color::Magenta),
        "yellow" => Some(Color::Yellow),
        "orange" => Some(Color::Rgb(0xFF, 0xA5, 0x00)),
        "purple" => Some(Color::Rgb(0x80, 0x00, 0x80)),
        _ => None,
    }
}

fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

fn parse_rgb_func(s: &str) -> Option<Color> {
    let content = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<_> = content
        .split([',', ' '])
        .filter(|t| !t.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u16>().ok()?;
    let g = parts[1].parse::<u16>().ok()?;
    let b = parts[2].parse::<u16>().ok()?;
    Some(Color::Rgb(
        r.min(255) as u8,
        g.min(255) as u8,
        b.min(255) as u8,
    ))
}
