//! Shared textual event rendering
//!
//! One event, one line. Control characters are escaped so files stay
//! greppable and line-oriented tools keep working.

use std::fmt::Write as FmtWrite;

use scribe_event::LogEvent;

/// Render an event as a single escaped line (without the newline)
pub fn render_line(event: &LogEvent) -> String {
    let data = event.data();
    let mut line = String::with_capacity(64 + data.text.len());

    let _ = write!(
        &mut line,
        "{} [{}] {} ",
        data.log_time.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        data.level,
        data.monitor_id,
    );
    escape_into(&mut line, &data.text);

    if let Some(exception) = &data.exception {
        line.push_str(" | exception: ");
        escape_into(&mut line, &exception.message);
        if let Some(detail) = &exception.detail {
            line.push_str(" | ");
            escape_into(&mut line, detail);
        }
    }

    line
}

fn escape_into(line: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\n' => line.push_str("\\n"),
            '\r' => line.push_str("\\r"),
            '\t' => line.push_str("\\t"),
            '\\' => line.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(line, "\\x{:02x}", c as u32);
            }
            c => line.push(c),
        }
    }
}
