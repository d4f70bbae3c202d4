//! Display sinks: a console frame printer and desktop notifications.
//!
//! Text is laid out for a small fixed-size screen before it reaches a sink:
//! wrapped to a per-line character budget, then capped to the number of
//! lines that fit.

use std::io::Write;

use notify_rust::Notification;
use tracing::{debug, warn};

use crate::config::DisplayConfig;
use crate::error::HardwareError;

/// Laid-out screen contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub lines: Vec<String>,
}

impl Frame {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Turns free text into a `Frame` for a given screen geometry.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub chars_per_line: usize,
    pub max_lines: usize,
}

impl Layout {
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            chars_per_line: config.chars_per_line.max(1),
            max_lines: config.max_lines(),
        }
    }

    pub fn frame(&self, text: &str) -> Frame {
        let mut lines = Vec::new();
        for paragraph in text.lines() {
            lines.extend(wrap_text(paragraph, self.chars_per_line));
        }
        lines.truncate(self.max_lines);
        Frame { lines }
    }
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Where frames end up.
pub trait DisplaySink: Send {
    fn render(&mut self, frame: &Frame) -> Result<(), HardwareError>;
    fn clear(&mut self) -> Result<(), HardwareError>;
}

/// Draws frames as a box on stdout, sized like the panel.
pub struct ConsoleDisplay {
    width: usize,
}

impl ConsoleDisplay {
    pub fn new(layout: &Layout) -> Self {
        Self {
            width: layout.chars_per_line,
        }
    }
}

impl DisplaySink for ConsoleDisplay {
    fn render(&mut self, frame: &Frame) -> Result<(), HardwareError> {
        draw_box(&mut std::io::stdout().lock(), frame, self.width)
            .map_err(|e| HardwareError::Display(e.to_string()))
    }

    fn clear(&mut self) -> Result<(), HardwareError> {
        debug!("Console display cleared");
        Ok(())
    }
}

fn draw_box(out: &mut impl Write, frame: &Frame, width: usize) -> std::io::Result<()> {
    let border = format!("+{}+", "-".repeat(width));
    writeln!(out, "{border}")?;
    for line in &frame.lines {
        writeln!(out, "|{line:<width$}|")?;
    }
    writeln!(out, "{border}")?;
    out.flush()
}

/// Desktop notifications via notify-rust (D-Bus). Handy off-device.
pub struct NotifyDisplay {
    timeout_ms: i32,
}

impl NotifyDisplay {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            timeout_ms: i32::try_from(hold_ms.max(1000)).unwrap_or(i32::MAX),
        }
    }
}

impl DisplaySink for NotifyDisplay {
    fn render(&mut self, frame: &Frame) -> Result<(), HardwareError> {
        let mut lines = frame.lines.iter();
        let summary = lines.next().cloned().unwrap_or_default();
        let body = lines.cloned().collect::<Vec<_>>().join("\n");

        debug!("Notification: {summary}");

        // A missing notification daemon should not end the session.
        if let Err(e) = Notification::new()
            .summary(&summary)
            .body(&body)
            .icon("audio-speakers")
            .timeout(self.timeout_ms)
            .show()
        {
            warn!("Failed to show notification: {e}");
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_on_words() {
        let lines = wrap_text("Scientists discover a new species of frog in Peru", 20);
        assert_eq!(lines, vec!["Scientists discover", "a new species of", "frog in Peru"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap_text("a supercalifragilisticexpialidocious day", 10);
        assert_eq!(lines, vec!["a", "supercalif", "ragilistic", "expialidoc", "ious day"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_text("   ", 20).is_empty());
    }

    #[test]
    fn test_layout_honours_newlines_and_caps_lines() {
        let layout = Layout {
            chars_per_line: 20,
            max_lines: 5,
        };
        assert_eq!(layout.frame("Set your age:\n7").lines, vec!["Set your age:", "7"]);

        let long = "word ".repeat(60);
        assert_eq!(layout.frame(&long).lines.len(), 5);
    }

    #[test]
    fn test_layout_from_panel_geometry() {
        let layout = Layout::from_config(&DisplayConfig::default());
        assert_eq!(layout.max_lines, 5);
        assert_eq!(layout.chars_per_line, 20);
    }

    #[test]
    fn test_console_box_pads_lines() {
        let frame = Layout {
            chars_per_line: 6,
            max_lines: 5,
        }
        .frame("Hi\nthere");
        let mut out = Vec::new();
        draw_box(&mut out, &frame, 6).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "+------+\n|Hi    |\n|there |\n+------+\n"
        );
    }
}
