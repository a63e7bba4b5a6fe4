//! Reply generation behind a swappable strategy.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::domain::Mode;

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn reply(&self, mode: Mode, user_text: &str) -> Result<String>;
}

const GENERAL_REPLIES: &[&str] = &[
    "Great question! Let me think about this...",
    "That is an interesting topic. Here is what I think about it...",
    "Thanks for asking! I am happy to help with this.",
    "A good moment to reflect. Let me share my thoughts...",
];

const CODING_REPLIES: &[&str] = &[
    "```python\n# Here is an example that should help:\ndef example_function():\n    return 'Hello, World!'\n```\n\nThis code shows a basic approach to the problem.",
    "For this task I recommend the following approach:\n\n1. Pin down the requirements first\n2. Pick suitable tools\n3. Write clean, readable code",
    "```javascript\n// A JavaScript example:\nconst solution = (input) => {\n    return input.map(item => item * 2);\n};\n```",
];

const CREATIVE_REPLIES: &[&str] = &[
    "What a wonderful creative idea! Let me develop the theme further...",
    "Creativity is a remarkable human ability. Here are a few ideas for your request...",
    "I love your creative approach! Let's make something special...",
];

const ANALYSIS_REPLIES: &[&str] = &[
    "Having analysed the information provided, I see these key points:\n\n📊 **Main findings:**\n• The data shows a clear trend\n• Several factors need to be considered\n• Further research is recommended",
    "Based on the analysis, I can draw the following conclusions:\n\n🔍 **The analysis shows:**\n• Positive dynamics\n• Areas for improvement\n• Strategic recommendations",
];

/// Picks a canned reply for the mode, ignoring what the user wrote.
pub struct CannedResponder {
    rng: Mutex<StdRng>,
}

impl CannedResponder {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Same seed, same sequence of replies.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn replies_for(mode: Mode) -> &'static [&'static str] {
        match mode {
            Mode::General => GENERAL_REPLIES,
            Mode::Coding => CODING_REPLIES,
            Mode::Creative => CREATIVE_REPLIES,
            Mode::Analysis => ANALYSIS_REPLIES,
        }
    }

    pub fn pick(&self, mode: Mode) -> Result<&'static str> {
        let replies = Self::replies_for(mode);
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| anyhow!("reply rng lock poisoned"))?;
        Ok(replies[rng.gen_range(0..replies.len())])
    }
}

impl Default for CannedResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseGenerator for CannedResponder {
    async fn reply(&self, mode: Mode, _user_text: &str) -> Result<String> {
        self.pick(mode).map(str::to_string)
    }
}
