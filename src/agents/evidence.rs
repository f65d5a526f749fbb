//! Evidence agent: flags unsupported claims, searches for sources, then
//! folds the sources it finds back into the surrounding prose.
//!
//! Grounded on `web_agent_app/evidence_detector.py::_detect_unsupported_claims`
//! (claim-detection prompt and JSON shape; `claim_type`/`confidence` are
//! hardcoded there rather than LLM-classified, mirrored here) and
//! `_enhance_content_with_evidence` (rewrite-prompt style), adapted to
//! spec §4.7's per-claim call contract rather than the original's
//! per-section batch.
//!
//! Claims don't carry a `(h1, suggestion)` shape, so this agent does not
//! implement [`super::SectionAnalyzer`]/[`super::SectionModifier`]; it
//! exposes its own detection and pipeline functions instead.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agents::{ProgressHook, resolve_h1_for_subtitle};
use crate::core::claim::{ClaimType, EvidenceResult, UnsupportedClaim};
use crate::core::record::{RecordStatus, SectionRecord, UnifiedSections};
use crate::core::section::ParsedDocument;
use crate::error::LlmError;
use crate::llm::json::parse_structured_content;
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};

/// Hardcoded confidence assigned to every detected claim, mirroring the
/// original detector's `confidence_level = 0.8` (not LLM-determined).
const DETECTED_CLAIM_CONFIDENCE: f64 = 0.8;

const DETECTION_PROMPT: &str = r#"你是事实核查专家。任务：找出文档中缺乏依据支撑的事实性论断。

# 分析范围
只分析正文段落，忽略：图片、表格、代码块。

# 需要标记的论断类型
- 未注明来源的统计数字或百分比
- 未经证实的因果关系断言
- 笼统的"研究表明""数据显示"类陈述且未给出出处

# 输出格式
只返回一个JSON对象，无其他文字：

```json
{"unsupported_claims": [{"claim_text": "论断原文", "context": "论断所在段落的上下文", "search_keywords": ["关键词1", "关键词2", "关键词3"], "section_title": "所在章节名"}]}
```"#;

#[derive(Deserialize)]
struct RawClaim {
    claim_text: String,
    context: String,
    search_keywords: Vec<String>,
    section_title: String,
}

#[derive(Deserialize, Default)]
struct RawClaims {
    #[serde(default)]
    unsupported_claims: Vec<RawClaim>,
}

/// Detects unsupported claims across the whole document in one LLM call.
pub struct EvidenceAnalyzer {
    temperature: f32,
    max_tokens: u32,
}

impl EvidenceAnalyzer {
    /// Builds an analyzer with the given sampling parameters.
    #[must_use]
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }

    /// Runs claim detection over `document`, dropping claims whose
    /// `section_title` doesn't resolve to any H1 in `document`.
    pub async fn detect_claims(&self, document: &ParsedDocument, llm: &dyn LlmClient, cancel: &CancellationToken) -> Result<Vec<UnsupportedClaim>, LlmError> {
        if cancel.is_cancelled() {
            return Ok(Vec::new());
        }
        let blob = crate::agents::whole_document_blob(document);
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(format!("{DETECTION_PROMPT}\n\n待分析文档：\n{blob}"))],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = llm.complete(request, cancel).await?;
        let raw: RawClaims = parse_structured_content(&response).unwrap_or_default();

        Ok(raw
            .unsupported_claims
            .into_iter()
            .enumerate()
            .filter(|(_, c)| resolve_h1_for_subtitle(document, &c.section_title).is_some())
            .map(|(position, c)| UnsupportedClaim {
                claim_id: Uuid::new_v4().to_string(),
                claim_text: c.claim_text,
                section_title: c.section_title,
                claim_type: ClaimType::Factual,
                confidence: DETECTED_CLAIM_CONFIDENCE,
                context: c.context,
                search_keywords: c.search_keywords,
                original_position: position,
            })
            .collect())
    }
}

/// Folds one claim's evidence into its section's surrounding prose.
pub struct EvidenceModifier {
    temperature: f32,
    max_tokens: u32,
}

impl EvidenceModifier {
    /// Builds a modifier with the given sampling parameters.
    #[must_use]
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }

    async fn rewrite(&self, content: &str, claim: &UnsupportedClaim, evidence: &EvidenceResult, llm: &dyn LlmClient, cancel: &CancellationToken) -> Result<String, LlmError> {
        let sources_text = evidence
            .sources
            .iter()
            .map(|s| format!("- {}（{}）：{}", s.title, s.domain, s.snippet))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "你是内容增强专家。以下章节中有一处论断缺乏依据支撑，请结合搜索到的证据将其自然地融入正文。\n\n\
             【章节内容】：\n{content}\n\n【缺乏支撑的论断】：{}\n\n【搜索到的证据】：\n{sources_text}\n\n\
             【关键要求】：\n\
             - 只增强与该论断相关的表述，其余内容保持不变\n\
             - 新增内容用加粗标记（**新增内容**）\n\
             - 引用具体数据、案例或政策时标明来源\n\
             - 保持文风严谨客观，与原文一致\n\
             - 不要删除原有信息\n\
             - 不要添加标题行（标题已经存在）\n\n\
             请直接输出增强后的Markdown内容：",
            claim.claim_text
        );
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = llm.complete(request, cancel).await?;
        let trimmed = response.trim();
        if trimmed.len() < 50 {
            return Ok(content.to_string());
        }
        Ok(match trimmed.split_once('\n') {
            Some((first, rest)) if first.trim_start().starts_with('#') => rest.trim_start().to_string(),
            _ => trimmed.to_string(),
        })
    }
}

/// Runs the full evidence pipeline over already-searched claims: chains
/// same-section claims sequentially (so each sees the previous rewrite's
/// output, mirroring [`super::run_modification_pipeline`]'s same-subtitle
/// chaining), does one LLM call per claim that has at least one source
/// (status `enhanced`), and short-circuits zero-source claims straight to
/// `no_evidence` with no call, per spec §4.7.
pub async fn run_evidence_pipeline(
    document: &ParsedDocument,
    claims: &[UnsupportedClaim],
    evidence: &[EvidenceResult],
    modifier: &Arc<EvidenceModifier>,
    llm: &Arc<dyn LlmClient>,
    concurrency: usize,
    cancel: &CancellationToken,
    on_progress: Option<ProgressHook>,
) -> UnifiedSections {
    let mut unified = UnifiedSections::new();
    for (h1, sections) in &document.h1s {
        let mut inner = IndexMap::new();
        for (key, content) in sections {
            inner.insert(key.clone(), SectionRecord::unchanged(content.clone()));
        }
        unified.h1s.insert(h1.clone(), inner);
    }

    let evidence_by_claim: HashMap<&str, &EvidenceResult> = evidence.iter().map(|e| (e.claim_id.as_str(), e)).collect();

    let mut grouped: IndexMap<(String, String), Vec<(UnsupportedClaim, Option<EvidenceResult>)>> = IndexMap::new();
    for claim in claims {
        let Some(h1) = resolve_h1_for_subtitle(document, &claim.section_title) else {
            continue;
        };
        let result = evidence_by_claim.get(claim.claim_id.as_str()).map(|r| (*r).clone());
        grouped.entry((h1, claim.section_title.clone())).or_default().push((claim.clone(), result));
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = tokio::task::JoinSet::new();
    let total = grouped.len();

    for ((h1, subtitle), mut chain) in grouped {
        let Some(original_content) = document.section(&h1, &subtitle).map(str::to_string) else {
            continue;
        };
        chain.sort_by_key(|(claim, _)| claim.original_position);
        let semaphore = Arc::clone(&semaphore);
        let modifier = Arc::clone(modifier);
        let llm = Arc::clone(llm);
        let cancel = cancel.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire().await.ok();
            let mut content = original_content.clone();
            let mut enhanced = false;
            let mut claim_texts = Vec::new();
            let mut failure = None;

            for (claim, result) in &chain {
                if cancel.is_cancelled() {
                    break;
                }
                let Some(result) = result else { continue };
                if result.sources.is_empty() {
                    continue;
                }
                match modifier.rewrite(&content, claim, result, llm.as_ref(), &cancel).await {
                    Ok(rewritten) => {
                        content = rewritten;
                        enhanced = true;
                        claim_texts.push(claim.claim_text.clone());
                    }
                    Err(err) => {
                        failure = Some(err.to_string());
                        break;
                    }
                }
            }

            (h1, subtitle, original_content, claim_texts.join("; "), content, enhanced, failure)
        });
    }

    let mut outcomes = Vec::new();
    let mut completed = 0usize;
    while let Some(joined) = set.join_next().await {
        if let Ok(outcome) = joined {
            outcomes.push(outcome);
        }
        completed += 1;
        if let Some(hook) = &on_progress {
            hook(completed, total);
        }
    }

    for (h1, subtitle, original_content, suggestion, content, enhanced, failure) in outcomes {
        let record = match failure {
            Some(error) => SectionRecord::failed(original_content, suggestion, error),
            None if enhanced => SectionRecord::modified(original_content, suggestion, content, RecordStatus::Enhanced),
            None => SectionRecord::modified(original_content.clone(), suggestion, original_content, RecordStatus::NoEvidence),
        };
        if let Some(inner) = unified.h1s.get_mut(&h1) {
            inner.insert(subtitle, record);
        }
    }

    unified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::claim::{EvidenceStatus, SourceRef};

    fn claim(id: &str, section_title: &str, position: usize) -> UnsupportedClaim {
        UnsupportedClaim {
            claim_id: id.to_string(),
            claim_text: "claim text".to_string(),
            section_title: section_title.to_string(),
            claim_type: ClaimType::Factual,
            confidence: DETECTED_CLAIM_CONFIDENCE,
            context: "context".to_string(),
            search_keywords: vec!["a".to_string()],
            original_position: position,
        }
    }

    fn source() -> SourceRef {
        SourceRef {
            title: "t".to_string(),
            url: "https://example.com".to_string(),
            snippet: "s".to_string(),
            domain: "example.com".to_string(),
            relevance: 0.8,
            authority: 0.8,
        }
    }

    #[tokio::test]
    async fn zero_hit_claim_short_circuits_without_llm_call() {
        let mut doc = ParsedDocument::new();
        doc.insert("H1".to_string(), "H2".to_string(), "body".to_string());
        let claims = vec![claim("c1", "H2", 0)];
        let results = vec![EvidenceResult {
            claim_id: "c1".to_string(),
            claim_text: "claim text".to_string(),
            section_title: "H2".to_string(),
            search_query: "q".to_string(),
            sources: Vec::new(),
            confidence: 0.0,
            status: EvidenceStatus::Failed,
        }];
        let modifier = Arc::new(EvidenceModifier::new(0.2, 2000));
        let llm: Arc<dyn LlmClient> = Arc::new(crate::llm::FakeLlmClient::new(vec![]));
        let cancel = CancellationToken::new();
        let unified = run_evidence_pipeline(&doc, &claims, &results, &modifier, &llm, 2, &cancel, None).await;
        let record = unified.h1s.get("H1").unwrap().get("H2").unwrap();
        assert_eq!(record.status, RecordStatus::NoEvidence);
        assert_eq!(record.regenerated_content, "body");
    }

    #[tokio::test]
    async fn claim_with_hits_triggers_one_rewrite_call() {
        let mut doc = ParsedDocument::new();
        doc.insert("H1".to_string(), "H2".to_string(), "body".to_string());
        let claims = vec![claim("c1", "H2", 0)];
        let results = vec![EvidenceResult {
            claim_id: "c1".to_string(),
            claim_text: "claim text".to_string(),
            section_title: "H2".to_string(),
            search_query: "q".to_string(),
            sources: vec![source()],
            confidence: 0.8,
            status: EvidenceStatus::Success,
        }];
        let modifier = Arc::new(EvidenceModifier::new(0.2, 2000));
        let llm: Arc<dyn LlmClient> = Arc::new(crate::llm::FakeLlmClient::new(vec![
            "this is a long enough rewritten body with evidence folded in".to_string(),
        ]));
        let cancel = CancellationToken::new();
        let unified = run_evidence_pipeline(&doc, &claims, &results, &modifier, &llm, 2, &cancel, None).await;
        let record = unified.h1s.get("H1").unwrap().get("H2").unwrap();
        assert_eq!(record.status, RecordStatus::Enhanced);
        assert!(record.regenerated_content.contains("rewritten body"));
    }
}
