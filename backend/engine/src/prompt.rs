//! Composite prompt construction and the context budget policy.

/// Marker inserted where text was cut to fit the budget.
pub const ELISION_MARKER: &str = "[...]";

/// How much source and transcript is resent each turn.
///
/// The default is unbounded: the full source and the full transcript go out
/// with every prompt. Limits are in characters and only shape the outgoing
/// prompt; the stored transcript is never trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextBudget {
    pub max_transcript_chars: Option<usize>,
    pub max_source_chars: Option<usize>,
}

impl ContextBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_transcript_chars.is_none() && self.max_source_chars.is_none()
    }

    /// Keep the head of the source.
    pub fn fit_source<'a>(&self, source: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_source_chars {
            Some(limit) if source.chars().count() > limit => {
                let head: String = source.chars().take(limit).collect();
                format!("{head}\n{ELISION_MARKER}").into()
            }
            _ => source.into(),
        }
    }

    /// Keep the tail of the transcript, where the latest replies live.
    pub fn fit_transcript<'a>(&self, transcript: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_transcript_chars {
            Some(limit) => {
                let total = transcript.chars().count();
                if total <= limit {
                    return transcript.into();
                }
                let tail: String = transcript.chars().skip(total - limit).collect();
                format!("{ELISION_MARKER}\n{tail}").into()
            }
            None => transcript.into(),
        }
    }
}

/// Build the single instruction sent to the model.
pub fn build_prompt(source: &str, transcript: &str, prompt: &str, budget: &ContextBudget) -> String {
    format!(
        "You are an AI model tasked with providing coding advice to a developer. \
         The developer will ask you questions based on the following code context: {source}. \
         Previous conversation: {transcript}. User's prompt: {prompt}",
        source = budget.fit_source(source),
        transcript = budget.fit_transcript(transcript),
        prompt = prompt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_prompt_contains_everything() {
        let prompt = build_prompt("def f(): pass", "\nfirst reply", "explain this file", &ContextBudget::unbounded());
        assert_eq!(
            prompt,
            "You are an AI model tasked with providing coding advice to a developer. \
             The developer will ask you questions based on the following code context: def f(): pass. \
             Previous conversation: \nfirst reply. User's prompt: explain this file"
        );
    }

    #[test]
    fn source_keeps_head() {
        let budget = ContextBudget {
            max_source_chars: Some(4),
            ..Default::default()
        };
        assert_eq!(budget.fit_source("abcdefgh"), "abcd\n[...]");
        assert_eq!(budget.fit_source("abc"), "abc");
    }

    #[test]
    fn transcript_keeps_tail() {
        let budget = ContextBudget {
            max_transcript_chars: Some(6),
            ..Default::default()
        };
        assert_eq!(budget.fit_transcript("\nold\nnewest"), "[...]\nnewest");
        assert_eq!(budget.fit_transcript("\nshort"), "\nshort");
    }

    #[test]
    fn cuts_on_char_boundaries() {
        let budget = ContextBudget {
            max_transcript_chars: Some(2),
            max_source_chars: Some(2),
        };
        assert_eq!(budget.fit_source("日本語"), "日本\n[...]");
        assert_eq!(budget.fit_transcript("日本語"), "[...]\n本語");
    }

    #[test]
    fn zero_budget_leaves_only_marker() {
        let budget = ContextBudget {
            max_transcript_chars: Some(0),
            max_source_chars: Some(0),
        };
        assert_eq!(budget.fit_transcript("abc"), "[...]\n");
        assert_eq!(budget.fit_transcript(""), "");
        assert!(!budget.is_unbounded());
    }
}
