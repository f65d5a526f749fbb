//! Table agent: finds prose that would read better as a Markdown table.
//!
//! Grounded on `table_agent_app/table_analyzer.py` (analyzer prompt,
//! construction/staffing/building-data table triggers) and
//! `table_agent_app/table_modifier.py` (modifier prompt and fence/heading
//! cleanup). The analyzer's JSON shape uses `section_title`/
//! `table_opportunity` rather than `subtitle`/`suggestion`, so it cannot
//! reuse [`super::parse_instruction_array`] and gets its own parser here.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::agents::{SectionModifier, resolve_h1_for_subtitle, whole_document_blob};
use crate::agents::SectionAnalyzer;
use crate::core::instruction::ModificationInstruction;
use crate::core::record::RecordStatus;
use crate::core::section::ParsedDocument;
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::llm::json::parse_structured_content;

const ANALYSIS_PROMPT: &str = r#"你是表格化分析专家。任务：找出文档中适合转换为表格的结构化内容。

# 分析范围
只分析正文段落，忽略：图片、已有表格、代码块。

# 适合表格化的内容特征
- 施工/建设数据（材料清单、工程量、进度安排）
- 人员配置数据（岗位、人数、职责）
- 任何带有并列项目、数值对比、分类列举的段落

# 输出格式
只返回JSON数组，无其他文字：

```json
[{"section_title": "章节名", "table_opportunity": "具体表格化建议..."}]
```

请仔细检查每个章节，找出所有适合表格化的内容，只返回JSON结果。"#;

#[derive(Deserialize)]
struct RawTableOpportunity {
    section_title: String,
    table_opportunity: String,
}

/// Parses `[{"section_title":..., "table_opportunity":...}]` into
/// directives, resolving `h1` by locating `section_title` in `document`.
fn parse_table_opportunities(document: &ParsedDocument, raw: &str) -> Vec<ModificationInstruction> {
    let parsed: Vec<RawTableOpportunity> = parse_structured_content(raw).unwrap_or_default();
    parsed
        .into_iter()
        .filter_map(|r| {
            let h1 = resolve_h1_for_subtitle(document, &r.section_title)?;
            ModificationInstruction::new(h1, r.section_title, r.table_opportunity)
        })
        .collect()
}

/// Analyzer half of the table agent.
pub struct TableAnalyzer {
    temperature: f32,
    max_tokens: u32,
}

impl TableAnalyzer {
    /// Builds an analyzer with the given sampling parameters.
    #[must_use]
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

#[async_trait]
impl SectionAnalyzer for TableAnalyzer {
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
        Ok(parse_table_opportunities(document, &response))
    }
}

/// Modifier half: converts one section's prose into a Markdown table.
pub struct TableModifier {
    temperature: f32,
    max_tokens: u32,
}

impl TableModifier {
    /// Builds a modifier with the given sampling parameters.
    #[must_use]
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

#[async_trait]
impl SectionModifier for TableModifier {
    fn record_status(&self) -> RecordStatus {
        RecordStatus::TableOptimized
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
            "你是表格化排版专家。请将以下内容中适合表格化的部分转换为Markdown表格。\n\n\
             【章节】：{subtitle}\n【原始内容】：\n{original_content}\n\n【表格化建议】：\n{suggestion}\n\n\
             【关键要求】：\n\
             - 将结构化描述转换为带表头和分隔行（|---|---|）的Markdown表格\n\
             - 非结构化的叙述性文字保持原样，不要强行表格化\n\
             - 不要使用代码块包裹表格\n\
             - 不要添加标题行（标题已经存在）\n\n\
             请直接输出转换后的Markdown内容："
        );
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = llm.complete(request, cancel).await?;
        Ok(clean_response(&response))
    }
}

/// Strips a leading ` ```markdown`/``` ``` fence pair and a leading
/// heading line, mirroring `table_modifier.py::apply_table_optimization`'s
/// post-processing.
fn clean_response(response: &str) -> String {
    let content = crate::llm::json::strip_markdown_fences(response.trim()).unwrap_or_else(|| response.trim().to_string());
    match content.split_once('\n') {
        Some((first, rest)) if first.trim_start().starts_with('#') => rest.trim_start().to_string(),
        _ => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_opportunity_shape() {
        let mut doc = ParsedDocument::new();
        doc.insert("H1".to_string(), "人员配置".to_string(), "body".to_string());
        let raw = r#"[{"section_title": "人员配置", "table_opportunity": "转换为表格"}]"#;
        let instructions = parse_table_opportunities(&doc, raw);
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].subtitle, "人员配置");
        assert_eq!(instructions[0].suggestion, "转换为表格");
    }

    #[test]
    fn cleans_fenced_heading_prefixed_response() {
        let response = "```markdown\n## 人员配置\n| a | b |\n|---|---|\n| 1 | 2 |\n```";
        let cleaned = clean_response(response);
        assert!(cleaned.starts_with("| a | b |"));
    }
}
