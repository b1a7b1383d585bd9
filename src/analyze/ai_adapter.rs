//! Completion adapter: optional generative text for explanations.
//!
//! Capability-gated strategy: a disabled provider (always `None`) is the default; a real
//! provider is wrapped with a file cache and a per-day call limit. Every failure is `None`,
//! and the caller falls back to templates.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ai::AiConfig;

/// Completions are cut to this many characters.
pub const MAX_COMPLETION_CHARS: usize = 300;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// What the explanation composer talks to.
pub trait TextCompletionProvider: Send + Sync {
    /// Best-effort completion; `None` on any failure, limit or empty output.
    fn complete<'a>(&'a self, prompt: &'a str) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynCompletion = Arc<dyn TextCompletionProvider>;

/// Factory: build a provider according to config and environment.
///
/// * `AI_TEST_MODE=mock` → deterministic mock behind the caching wrapper.
/// * `enabled == false` or unknown provider → disabled.
/// * `openai` → OpenAI chat completions behind the caching wrapper.
pub fn build_completion_provider(config: &AiConfig, cache_dir: &Path) -> DynCompletion {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider {
            fixed: "Coverage of this topic is ongoing (mock).".to_string(),
        };
        return Arc::new(CachingClient::new(mock, cache_dir.to_path_buf(), config.daily_limit));
    }

    if !config.enabled {
        return Arc::new(DisabledProvider);
    }

    match config.provider.as_str() {
        "openai" => match OpenAiProvider::new(
            &config.api_key,
            &config.model,
            Duration::from_millis(config.timeout_ms),
        ) {
            Ok(provider) => Arc::new(CachingClient::new(provider, cache_dir.to_path_buf(), config.daily_limit)),
            Err(e) => {
                warn!(target: "ai", error = %e, "could not build openai client, generation disabled");
                Arc::new(DisabledProvider)
            }
        },
        other => {
            warn!(target: "ai", provider = other, "unsupported completion provider, generation disabled");
            Arc::new(DisabledProvider)
        }
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider doing the real call; shared by production and tests behind `CachingClient`.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(&'a self, prompt: &'a str) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("fake-news-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let sys = "You comment on news texts. Return ONE or TWO short sentences, neutral tone, plain ASCII, no emojis, no lists. Output only the sentences.";
            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: sys,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: 0.2,
                max_tokens: 120,
            };

            let resp = match self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(target: "ai", service = "completion", error = %e, "completion request failed");
                    return None;
                }
            };
            if !resp.status().is_success() {
                warn!(target: "ai", service = "completion", status = %resp.status(), "completion request rejected");
                return None;
            }
            let body: Resp = resp.json().await.ok()?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.as_str())
                .unwrap_or("");
            let cleaned = sanitize_completion(content);
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned)
            }
        })
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always `None`; the default when generation is off.
pub struct DisabledProvider;

impl TextCompletionProvider for DisabledProvider {
    fn complete<'a>(&'a self, _prompt: &'a str) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed answer for every prompt.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl Provider for MockProvider {
    fn fetch<'a>(&'a self, _prompt: &'a str) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Some(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Records every prompt; answers with `reply` (or `None`). Uncached.
#[derive(Default)]
pub struct RecordingProvider {
    pub reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingProvider {
    pub fn replying(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl TextCompletionProvider for RecordingProvider {
    fn complete<'a>(&'a self, prompt: &'a str) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        if let Ok(mut g) = self.prompts.lock() {
            g.push(prompt.to_string());
        }
        let out = self.reply.clone();
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Mutex<DailyCounter>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            debug!(target: "ai", error = %e, dir = %cache_dir.display(), "completion cache dir unavailable");
        }
        let counter = Mutex::new(load_daily_counter(&cache_dir).unwrap_or_default());
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Real calls made today.
    pub fn calls_today(&self) -> u32 {
        self.counter.lock().map(|g| g.count).unwrap_or(0)
    }

    async fn complete_impl(&self, prompt: &str) -> Option<String> {
        // 1) Cache lookup; hits never count against the limit.
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            return Some(hit.text);
        }

        // 2) Daily limit.
        {
            let mut g = self.counter.lock().ok()?;
            if g.is_expired() {
                g.reset_to_today();
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit_max {
                debug!(target: "ai", limit = self.daily_limit_max, "daily completion limit reached");
                return None;
            }
        }

        // 3) Real call.
        let fresh = sanitize_completion(&self.inner.fetch(prompt).await?);
        if fresh.is_empty() {
            return None;
        }
        if let Err(e) = write_cache_file(&self.cache_dir, &key, &CachedCompletion { text: fresh.clone() }) {
            debug!(target: "ai", error = %e, "completion cache write failed");
        }
        if let Ok(mut g) = self.counter.lock() {
            g.count = g.count.saturating_add(1);
            let _ = save_daily_counter(&self.cache_dir, &g);
        }
        Some(fresh)
    }
}

impl<P: Provider> TextCompletionProvider for CachingClient<P> {
    fn complete<'a>(&'a self, prompt: &'a str) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.complete_impl(prompt))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CachedCompletion {
    text: String,
}

fn cache_key(prompt: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().take(12).map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedCompletion> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedCompletion) -> io::Result<()> {
    write_json_atomic(&cache_path(dir, key), value)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    write_json_atomic(&counter_path(dir), dc)
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// ASCII-only, single line, at most `MAX_COMPLETION_CHARS`, whitespace collapsed.
pub fn sanitize_completion(input: &str) -> String {
    let mut out = String::with_capacity(MAX_COMPLETION_CHARS);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => ' ',
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.len() >= MAX_COMPLETION_CHARS {
            break;
        }
    }
    out.trim().to_string()
}
