use serde::Serialize;

/// Append-only, newline-joined log of prior replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    text: String,
    replies: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new transcript with `reply` appended: `old + "\n" + reply`.
    pub fn appended(&self, reply: &str) -> Self {
        let mut text = String::with_capacity(self.text.len() + 1 + reply.len());
        text.push_str(&self.text);
        text.push('\n');
        text.push_str(reply);
        Self {
            text,
            replies: self.replies + 1,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of replies appended so far.
    pub fn replies(&self) -> usize {
        self.replies
    }

    pub fn is_empty(&self) -> bool {
        self.replies == 0
    }
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
