//! Redundancy agent: finds repeated content within and across sections.
//!
//! Grounded on `redundancy_agent_app/redundancy_analyzer.py` (analyzer
//! prompt and cross-section repetition policy) and
//! `redundancy_agent_app/redundancy_modifier.py` (modifier prompt and
//! heading-stripping cleanup).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agents::{SectionAnalyzer, SectionModifier, parse_instruction_array, whole_document_blob};
use crate::core::instruction::ModificationInstruction;
use crate::core::record::RecordStatus;
use crate::core::section::ParsedDocument;
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};

const ANALYSIS_PROMPT: &str = r#"你是文档冗余分析专家。任务：找出文档中所有重复、冗余的内容并提出修改建议。

# 分析范围
只分析正文段落，忽略：图片、表格、代码块等非正文内容。

# 冗余类型
1. 跨章节重复：不同章节说了相同的话
2. 章节内重复：同一章节反复说同样的事

# 输出格式
只返回JSON数组，无其他文字：

```json
[{"subtitle": "章节名", "suggestion": "具体修改建议..."}]
```

对于跨章节重复，请为每个涉及的章节分别生成一条建议，每个章节一条独立记录。

请仔细检查每个章节，找出所有重复内容，只返回JSON结果。"#;

/// Analyzer half of the redundancy agent. One call over the whole document,
/// per spec §4.4.
pub struct RedundancyAnalyzer {
    temperature: f32,
    max_tokens: u32,
}

impl RedundancyAnalyzer {
    /// Builds an analyzer with the given sampling parameters.
    #[must_use]
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

#[async_trait]
impl SectionAnalyzer for RedundancyAnalyzer {
    async fn analyze(&self, document: &ParsedDocument, llm: &dyn LlmClient, cancel: &CancellationToken) -> Result<Vec<ModificationInstruction>, LlmError> {
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        let blob = whole_document_blob(document);
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(format!("{ANALYSIS_PROMPT}\n\n待分析文档：\n{blob}"))],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = llm.complete(request, cancel).await?;
        Ok(parse_instruction_array(document, &response))
    }
}

/// Modifier half: rewrites one section per a redundancy suggestion.
pub struct RedundancyModifier {
    temperature: f32,
    max_tokens: u32,
}

impl RedundancyModifier {
    /// Builds a modifier with the given sampling parameters.
    #[must_use]
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

#[async_trait]
impl SectionModifier for RedundancyModifier {
    fn record_status(&self) -> RecordStatus {
        RecordStatus::Modified
    }

    async fn modify(
        &self,
        _h1: &str,
        subtitle: &str,
        original_content: &str,
        suggestion: &str,
        llm: &dyn LlmClient,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let prompt = format!(
            "你是文档优化专家。请严格按照建议修改以下内容。\n\n\
             【章节】：{subtitle}\n【原始内容】：\n{original_content}\n\n【修改建议】：\n{suggestion}\n\n\
             【关键要求】：\n\
             - 如果建议要求删除某句话，必须完全删除\n\
             - 如果建议要求保留某内容，必须保留\n\
             - 如果建议要求合并重复内容，请精炼表述\n\
             - 保持Markdown格式，不要添加标题行（标题已经存在）\n\n\
             请直接输出修改后的Markdown内容："
        );
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = llm.complete(request, cancel).await?;
        Ok(strip_leading_heading(response.trim()))
    }
}

/// Drops a leading Markdown heading line the model echoed back despite
/// being told not to, per `redundancy_modifier.py::modify_section`'s
/// post-hoc cleanup.
fn strip_leading_heading(content: &str) -> String {
    match content.split_once('\n') {
        Some((first, rest)) if first.trim_start().starts_with('#') => rest.trim_start().to_string(),
        _ => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_heading_line() {
        assert_eq!(strip_leading_heading("## H2\nbody text"), "body text");
    }

    #[test]
    fn leaves_content_without_heading_untouched() {
        assert_eq!(strip_leading_heading("body text"), "body text");
    }
}
