//! PreAnalysis value type (spec §3, §4.1). Produced by the `preanalyzer`
//! module; pure data here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub line_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreAnalysis {
    pub estimated_input_tokens: u32,
    pub code_blocks: Vec<CodeBlock>,
    pub matched_keywords: Vec<String>,
    pub conversation_turns: u32,
    pub department_hint: Option<String>,
    pub parse_warnings: Vec<String>,
}

impl PreAnalysis {
    pub fn has_code(&self) -> bool {
        !self.code_blocks.is_empty()
    }

    pub fn code_line_total(&self) -> usize {
        self.code_blocks.iter().map(|b| b.line_count).sum()
    }

    pub fn has_keyword(&self, kw: &str) -> bool {
        self.matched_keywords.iter().any(|k| k == kw)
    }
}
