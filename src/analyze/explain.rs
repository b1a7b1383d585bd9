// src/analyze/explain.rs
//! Explanation composer: four short narrative fields derived from the final verdict.
//!
//! `positive`/`negative` for non-FAKE verdicts come from category template pools picked by an
//! injected, seedable RNG; an optional completion provider may replace either field when it
//! returns a long enough answer. `neutral` is always deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

use crate::analyze::ai_adapter::DynCompletion;
use crate::analyze::correction::{CorrectedVerdict, FinalLabel};
use crate::analyze::forensic::ForensicReport;
use crate::config::ExplanationConfig;
use crate::fact_check::{FactCheckVerdict, FactStatus};
use crate::gate::is_title_case;
use crate::text::{count_hits, truncate_chars};

const FAKE_POSITIVE: &str = "N/A - Content classified as fake news";
const MAX_ENTITIES: usize = 5;
/// Texts this short never trigger a completion call.
const MIN_TEXT_FOR_COMPLETION: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicCategory {
    Political,
    Economic,
    Social,
    Technology,
    General,
}

impl TopicCategory {
    /// Bucket iteration order; ties resolve to the earlier bucket.
    pub const BUCKETS: [TopicCategory; 4] = [Self::Political, Self::Economic, Self::Social, Self::Technology];

    pub fn name(self) -> &'static str {
        match self {
            Self::Political => "political",
            Self::Economic => "economic",
            Self::Social => "social",
            Self::Technology => "technology",
            Self::General => "general",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Political => &[
                "president",
                "senator",
                "congress",
                "government",
                "minister",
                "parliament",
                "election",
                "vote",
                "policy",
                "law",
            ],
            Self::Economic => &[
                "economy",
                "market",
                "stock",
                "price",
                "inflation",
                "gdp",
                "company",
                "business",
                "financial",
                "bank",
            ],
            Self::Social => &["health", "education", "crime", "community", "social", "public", "people", "citizen"],
            Self::Technology => &["technology", "digital", "internet", "ai", "computer", "software", "data", "cyber"],
            Self::General => &[],
        }
    }

    fn positive_templates(self) -> &'static [&'static str] {
        match self {
            Self::Political => &[
                "This news may indicate progress in democratic processes and governance.",
                "Political developments can lead to improved policies and public representation.",
                "Such political events often reflect active civic engagement.",
            ],
            Self::Economic => &[
                "Economic news often signals market opportunities and growth potential.",
                "Such developments may benefit businesses and employment prospects.",
                "Economic changes can lead to improved financial conditions for many.",
            ],
            Self::Social => &[
                "This news highlights important social issues requiring public attention.",
                "Social developments often lead to positive community changes.",
                "Such events may drive awareness and social progress.",
            ],
            Self::Technology => &[
                "Technological developments typically drive innovation and progress.",
                "Such tech news often represents advancement in human capabilities.",
                "Technology stories frequently highlight problem-solving potential.",
            ],
            Self::General => &[
                "This news provides important information for public awareness.",
                "Such reporting contributes to an informed society.",
                "News coverage helps people stay connected to current events.",
            ],
        }
    }

    fn negative_templates(self) -> &'static [&'static str] {
        match self {
            Self::Political => &[
                "Political reporting can be framed to favor one side; compare coverage across outlets.",
                "Policy announcements often change before they take effect.",
                "Early political coverage may omit opposing viewpoints.",
            ],
            Self::Economic => &[
                "Economic figures are often revised after initial reports.",
                "Market-related news can prompt hasty financial decisions.",
                "Economic forecasts in news coverage carry significant uncertainty.",
            ],
            Self::Social => &[
                "Social issues are often reported without full statistical context.",
                "Individual stories may not represent broader trends.",
                "Emotional framing can overshadow the underlying facts.",
            ],
            Self::Technology => &[
                "Technology announcements frequently overstate near-term impact.",
                "Claims about new technology may lack independent testing.",
                "Technical details are often simplified in news coverage.",
            ],
            Self::General => &[
                "As with all news, it's important to consider multiple perspectives and verify information through additional sources.",
                "Initial reports can be incomplete and may be updated later.",
                "Headlines may not capture the full nuance of the story.",
            ],
        }
    }
}

/// Concern keyword groups checked for non-FAKE negatives, with their phrases.
const CONCERNS: [(&[&str], &str); 4] = [
    (
        &["crisis", "emergency", "disaster", "threat"],
        "may involve serious public safety concerns",
    ),
    (
        &["conflict", "war", "violence", "attack"],
        "involves conflict or violence that affects communities",
    ),
    (
        &["corruption", "scandal", "fraud", "illegal"],
        "involves legal or ethical issues requiring investigation",
    ),
    (
        &["recession", "unemployment", "inflation", "debt"],
        "may have negative economic implications",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub positive: String,
    pub negative: String,
    pub neutral: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicProfile {
    pub counts: Vec<(TopicCategory, usize)>,
    pub primary_category: TopicCategory,
    pub entities: Vec<String>,
}

/// Topic bucket counts, primary category and naive capitalized-span entities.
pub fn extract_topics(text: &str) -> TopicProfile {
    let lower = text.to_lowercase();
    let counts: Vec<(TopicCategory, usize)> = TopicCategory::BUCKETS
        .iter()
        .map(|&c| (c, count_hits(&lower, c.keywords())))
        .collect();

    let mut primary = TopicCategory::General;
    let mut best = 0;
    for &(cat, n) in &counts {
        if n > best {
            best = n;
            primary = cat;
        }
    }

    TopicProfile {
        counts,
        primary_category: primary,
        entities: extract_entities(text),
    }
}

/// Runs of title-case tokens starting with a token longer than 2 characters; spans do not
/// overlap. Trailing punctuation is dropped. At most 5.
pub fn extract_entities(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < words.len() && out.len() < MAX_ENTITIES {
        if is_title_case(words[i]) && words[i].chars().count() > 2 {
            let mut j = i + 1;
            while j < words.len() && is_title_case(words[j]) {
                j += 1;
            }
            let span = words[i..j].join(" ");
            let span = span.trim_end_matches([',', '.', ';', ':', '!', '?']).to_string();
            if !span.is_empty() {
                out.push(span);
            }
            i = j;
        } else {
            i += 1;
        }
    }
    out
}

pub struct ExplanationComposer {
    cfg: ExplanationConfig,
    completion: DynCompletion,
    rng: Mutex<StdRng>,
}

impl ExplanationComposer {
    pub fn new(cfg: ExplanationConfig, completion: DynCompletion) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            cfg,
            completion,
            rng: Mutex::new(rng),
        }
    }

    pub async fn compose(
        &self,
        text: &str,
        verdict: &CorrectedVerdict,
        forensic: &ForensicReport,
        fact: &FactCheckVerdict,
    ) -> Explanation {
        self.compose_inner(text, verdict, forensic, fact, true).await
    }

    /// Same output shape without consulting the completion provider.
    pub async fn compose_templates_only(
        &self,
        text: &str,
        verdict: &CorrectedVerdict,
        forensic: &ForensicReport,
        fact: &FactCheckVerdict,
    ) -> Explanation {
        self.compose_inner(text, verdict, forensic, fact, false).await
    }

    async fn compose_inner(
        &self,
        text: &str,
        verdict: &CorrectedVerdict,
        forensic: &ForensicReport,
        fact: &FactCheckVerdict,
        use_completion: bool,
    ) -> Explanation {
        let topics = extract_topics(text);
        let neutral = neutral_context(&topics, fact.status);

        if verdict.label == FinalLabel::Fake {
            return Explanation {
                positive: FAKE_POSITIVE.to_string(),
                negative: fake_reasons(verdict, forensic, fact),
                neutral,
                context: format!(
                    "Analysis based on ML classification, forensic checks, and fact verification. \
                     Primary category: {}. Key entities: {}.",
                    topics.primary_category.name(),
                    key_entities(&topics)
                ),
            };
        }

        let snippet = truncate_chars(text, self.cfg.prompt_chars());
        let positive = match self
            .completion_for(use_completion, text, &format!("Identify positive aspects of this news: {snippet}"))
            .await
        {
            Some(c) => c,
            None => self.pick(topics.primary_category.positive_templates()),
        };
        let negative = match self
            .completion_for(use_completion, text, &format!("Identify potential risks or concerns from this news: {snippet}"))
            .await
        {
            Some(c) => c,
            None => concerns(text).unwrap_or_else(|| self.pick(topics.primary_category.negative_templates())),
        };

        let lead = match verdict.label {
            FinalLabel::Unverified => "This appears to be recent news that has not yet been verified.",
            FinalLabel::Unknown => "The classifier could not reach a confident verdict on this content.",
            _ => "This appears to be legitimate news content.",
        };
        Explanation {
            positive,
            negative,
            neutral,
            context: format!(
                "{lead} Primary category: {}. Verification status: {}. Key entities: {}.",
                topics.primary_category.name(),
                fact.status.as_str(),
                key_entities(&topics)
            ),
        }
    }

    /// One best-effort completion; short or missing output is `None`.
    async fn completion_for(&self, enabled: bool, text: &str, prompt: &str) -> Option<String> {
        if !enabled || text.chars().count() <= MIN_TEXT_FOR_COMPLETION {
            return None;
        }
        let out = self.completion.complete(prompt).await?;
        let out = out.trim().to_string();
        if out.chars().count() >= self.cfg.min_completion_chars() {
            Some(out)
        } else {
            debug!(target: "ai", provider = self.completion.provider_name(), "completion too short, using template");
            None
        }
    }

    fn pick(&self, pool: &[&str]) -> String {
        if pool.is_empty() {
            return String::new();
        }
        let idx = match self.rng.lock() {
            Ok(mut rng) => rng.random_range(0..pool.len()),
            Err(_) => 0,
        };
        pool[idx].to_string()
    }
}

fn fake_reasons(verdict: &CorrectedVerdict, forensic: &ForensicReport, fact: &FactCheckVerdict) -> String {
    let mut reasons = Vec::new();
    if verdict.confidence > 0.8 {
        reasons.push(format!(
            "Machine learning model classified this as fake with {:.1}% confidence",
            verdict.confidence * 100.0
        ));
    }
    if !forensic.red_flags().is_empty() {
        let phrases: Vec<&str> = forensic.red_flags().iter().map(|f| f.description()).collect();
        reasons.push(format!("Forensic analysis detected: {}", phrases.join(", ")));
    }
    match fact.status {
        FactStatus::NotFound => reasons.push("No supporting evidence found in trusted news sources".to_string()),
        FactStatus::Conflicting => reasons.push("Conflicting information found in reliable sources".to_string()),
        _ => {}
    }
    let fired: Vec<&str> = forensic
        .content_analysis
        .fired_categories()
        .into_iter()
        .map(|c| c.name())
        .collect();
    if !fired.is_empty() {
        reasons.push(format!("Contains sensational language patterns: {}", fired.join(", ")));
    }

    if reasons.is_empty() {
        "This content shows patterns typical of fake news, though specific indicators may vary.".to_string()
    } else {
        format!("This content is likely fake because: {}.", reasons.join("; "))
    }
}

fn neutral_context(topics: &TopicProfile, status: FactStatus) -> String {
    let mut points = vec![match status {
        FactStatus::Supported => "This information has been corroborated by trusted news sources".to_string(),
        FactStatus::PartiallySupported => {
            "Related reporting exists in trusted sources, though details may differ".to_string()
        }
        FactStatus::UnverifiedRecent => "This appears to be recent news that is still being verified".to_string(),
        FactStatus::NotFound => {
            "This claim has not been independently verified by major news outlets".to_string()
        }
        FactStatus::Conflicting => "Trusted sources report on this topic differently".to_string(),
    }];
    if !topics.entities.is_empty() {
        let main: Vec<&str> = topics.entities.iter().take(2).map(String::as_str).collect();
        points.push(format!("Key entities mentioned: {}", main.join(", ")));
    }
    if topics.primary_category != TopicCategory::General {
        points.push(format!("This falls under {} news category", topics.primary_category.name()));
    }
    points.join(". ")
}

fn key_entities(topics: &TopicProfile) -> String {
    if topics.entities.is_empty() {
        "None identified".to_string()
    } else {
        topics.entities.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
    }
}

fn concerns(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let hits: Vec<&str> = CONCERNS
        .iter()
        .filter(|(words, _)| count_hits(&lower, words) > 0)
        .map(|(_, phrase)| *phrase)
        .collect();
    if hits.is_empty() {
        None
    } else {
        Some(format!("Potential concerns: This news {}.", hits.join(", and ")))
    }
}
