//! Optional decorative rendering.
//!
//! "Holographic mode" draws a wireframe box per poll. It is a pluggable
//! renderer: the app holds an `Option<Box<dyn VisualPlugin>>` and works
//! unchanged when none is installed.

use crate::types::Poll;

pub trait VisualPlugin: Send {
    fn name(&self) -> &str;
    /// Produce a decorative rendering of the current poll list.
    fn render(&self, polls: &[Poll]) -> String;
}

/// Built-in plugin: one ASCII wireframe box per poll.
pub struct WireframePlugin;

impl VisualPlugin for WireframePlugin {
    fn name(&self) -> &str {
        "wireframe"
    }

    fn render(&self, polls: &[Poll]) -> String {
        let mut out = String::new();
        for poll in polls {
            let label = truncate(&poll.question, 14);
            out.push_str("  +--------+\n");
            out.push_str(" /        /|\n");
            out.push_str("+--------+ |\n");
            out.push_str(&format!("| #{:<4}  | +\n", poll.id));
            out.push_str("|        |/\n");
            out.push_str("+--------+\n");
            out.push_str(&format!("{label}\n\n"));
        }
        out
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(id: u64, question: &str) -> Poll {
        serde_json::from_str(&format!(
            r#"{{"id":{id},"question":"{question}","options":{{}},"active":true,"expiresAt":"2026-09-01T12:00:00Z"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_one_box_per_poll() {
        let polls = vec![poll(1, "A?"), poll(2, "B?")];
        let out = WireframePlugin.render(&polls);
        assert_eq!(out.matches("|/\n").count(), 2);
        assert!(out.contains("#1"));
        assert!(out.contains("#2"));
    }

    #[test]
    fn test_empty_poll_list_renders_nothing() {
        assert!(WireframePlugin.render(&[]).is_empty());
    }

    #[test]
    fn test_long_question_truncated() {
        let polls = vec![poll(1, "a very very long poll question indeed")];
        let out = WireframePlugin.render(&polls);
        assert!(out.contains('…'));
    }
}
