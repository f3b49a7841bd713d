//! Narration scripts, thumbnail titles and upload metadata from one article.
//!
//! Three prompts are sent per article, each parsed by a tolerant line-based
//! parser:
//!
//! | Prompt | Expected reply | Parser |
//! |--------|----------------|--------|
//! | Script | `[INTRO]` / `[BODY]` / `[CONCLUSION]` sections | [`parse_script`] |
//! | Thumbnail titles | numbered list | [`parse_numbered_titles`] |
//! | Metadata | `VIDEO_TITLE:` / `DESCRIPTION:` / `TAGS:` lines | [`parse_video_details`] |

use crate::api::{AskAsync, LlmClient, Prompt, PromptKind};
use crate::error::{PipelineError, Result};
use crate::models::{Article, Script, ScriptPackage, VideoDetails};
use crate::utils::truncate_chars;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};

/// A section tag at the start of a line, with any markdown emphasis or
/// heading marks around it. Text may follow the tag on the same line.
static SECTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t]*[*_#>]*[ \t]*\[(intro|body|conclusion)\][ \t]*[*_:]*").unwrap());

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:\d{1,2}\s*[.)]|[-*•])\s*(.+)$").unwrap());

/// Generates the script stage artifacts with the configured LLM.
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    client: LlmClient,
    title_count: usize,
}

impl ScriptGenerator {
    pub fn new(client: LlmClient, title_count: usize) -> Self {
        Self { client, title_count }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.name()
    }

    /// Script plus thumbnail title candidates.
    #[instrument(level = "info", skip_all, fields(title = %article.title, provider = self.client.name()))]
    pub async fn generate_script(&self, article: &Article) -> Result<Script> {
        let reply = self.client.ask(&script_prompt(article)).await?;
        let (intro, body, conclusion) = parse_script(&reply);
        if body.trim().is_empty() {
            return Err(PipelineError::MalformedResponse {
                provider: self.client.name().to_string(),
                reason: "script reply has no body text".to_string(),
            });
        }
        let thumbnail_title_candidates = self.generate_thumbnail_titles(article).await?;
        info!(
            chars = intro.chars().count() + body.chars().count() + conclusion.chars().count(),
            titles = thumbnail_title_candidates.len(),
            "Generated script"
        );
        Ok(Script {
            intro,
            body,
            conclusion,
            thumbnail_title_candidates,
        })
    }

    pub async fn generate_thumbnail_titles(&self, article: &Article) -> Result<Vec<String>> {
        let reply = self.client.ask(&titles_prompt(article, self.title_count)).await?;
        Ok(parse_numbered_titles(&reply, self.title_count))
    }

    pub async fn generate_video_details(&self, article: &Article, script: &Script) -> Result<VideoDetails> {
        let reply = self.client.ask(&metadata_prompt(article, script)).await?;
        Ok(parse_video_details(&reply, article))
    }

    /// Everything the script stage produces for one article.
    pub async fn generate_package(&self, article: &Article) -> Result<ScriptPackage> {
        let script = self.generate_script(article).await?;
        let details = self.generate_video_details(article, &script).await?;
        Ok(ScriptPackage {
            article: article.clone(),
            script,
            details,
            provider: self.client.name().to_string(),
            generated_at: Utc::now(),
        })
    }
}

fn script_prompt(article: &Article) -> Prompt {
    let text = format!(
        "You are a senior writer for a YouTube news channel whose viewers are mostly in their 40s to 60s.\n\
         Write an 8-10 minute narration script based on the news article below.\n\n\
         [Article]\n\
         Title: {title}\n\
         Content: {content}\n\n\
         [Structure]\n\
         Mark each section with its tag on a line of its own:\n\
         [INTRO] about 30 seconds, open with a strong hook.\n\
         [BODY] about 7 minutes, explain the story plainly, unpack technical terms, keep viewers engaged.\n\
         [CONCLUSION] about 30 seconds, summarize, ask viewers to subscribe, like and turn on notifications, tease the next video.\n\n\
         [Tone]\n\
         Respectful and polite, fact-driven rather than emotional.\n\n\
         Output only the script.",
        title = article.title,
        content = truncate_chars(article.prompt_text(), 4000),
    );
    Prompt {
        kind: PromptKind::Script,
        subject: article.title.clone(),
        text,
    }
}

fn titles_prompt(article: &Article, count: usize) -> Prompt {
    let text = format!(
        "Write {count} punchy YouTube thumbnail captions for the news headline below.\n\n\
         Headline: {title}\n\n\
         Requirements:\n\
         1. At most 15 characters each\n\
         2. Provoke surprise or curiosity\n\
         3. Mix styles: questions, numbers, shock, reversal\n\n\
         Output one caption per line, numbered like `1. caption`.",
        title = article.title,
    );
    Prompt {
        kind: PromptKind::ThumbnailTitles,
        subject: article.title.clone(),
        text,
    }
}

fn metadata_prompt(article: &Article, script: &Script) -> Prompt {
    let text = format!(
        "Create YouTube metadata for a video based on this news story and script.\n\n\
         Headline: {title}\n\
         Script: {script}...\n\n\
         Answer in exactly this format:\n\
         VIDEO_TITLE: [video title, at most 60 characters]\n\
         DESCRIPTION: [about 200 characters, include the news source]\n\
         TAGS: [10 related tags, comma separated]",
        title = article.title,
        script = truncate_chars(&script.narration(), 500),
    );
    Prompt {
        kind: PromptKind::Metadata,
        subject: article.title.clone(),
        text,
    }
}

/// Split a reply into `(intro, body, conclusion)`.
///
/// Section tags (`[INTRO]`, `[BODY]`, `[CONCLUSION]`) are matched
/// case-insensitively at the start of a line, also when wrapped in markdown
/// (`**[INTRO]**`, `## [BODY]`). A section runs from the end of its tag to the
/// next tag, so text on the tag's own line belongs to it. Without tags the
/// reply is split into blank-line separated paragraphs: first is the intro,
/// last the conclusion, the rest the body. Replies with fewer than three
/// paragraphs go entirely into the body.
///
/// # Arguments
///
/// * `reply` - Raw LLM reply to the script prompt.
///
/// # Returns
///
/// `(intro, body, conclusion)`, each trimmed. Any of them may be empty.
///
/// # Examples
///
/// ```ignore
/// let (intro, body, conclusion) = parse_script("**[INTRO]** Hi.\n**[BODY]** News.\n**[CONCLUSION]** Bye.");
/// assert_eq!((intro.as_str(), body.as_str(), conclusion.as_str()), ("Hi.", "News.", "Bye."));
/// ```
pub fn parse_script(reply: &str) -> (String, String, String) {
    let markers: Vec<_> = SECTION_MARKER.captures_iter(reply).collect();
    if !markers.is_empty() {
        let mut sections = [String::new(), String::new(), String::new()];
        for (i, caps) in markers.iter().enumerate() {
            let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(reply.len());
            let slot = match caps[1].to_lowercase().as_str() {
                "intro" => 0,
                "body" => 1,
                _ => 2,
            };
            let text = reply[whole..end].trim();
            if !text.is_empty() {
                if !sections[slot].is_empty() {
                    sections[slot].push_str("\n\n");
                }
                sections[slot].push_str(text);
            }
        }
        // text before the first tag is treated as part of the intro
        let preamble = reply[..markers[0].get(0).map(|m| m.start()).unwrap_or(0)].trim();
        if !preamble.is_empty() && sections[0].is_empty() {
            sections[0] = preamble.to_string();
        }
        let [intro, body, conclusion] = sections;
        return (intro, body, conclusion);
    }

    let paragraphs: Vec<&str> = reply
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.len() < 3 {
        return (String::new(), paragraphs.join("\n\n"), String::new());
    }
    let last = paragraphs.len() - 1;
    (
        paragraphs[0].to_string(),
        paragraphs[1..last].join("\n\n"),
        paragraphs[last].to_string(),
    )
}

/// Numbered (`1. foo`, `2) bar`) or bulleted (`- foo`, `* bar`, `• baz`)
/// lines with the list marker, quotes and emphasis removed.
pub fn parse_numbered_titles(reply: &str, count: usize) -> Vec<String> {
    reply
        .lines()
        .filter_map(|line| LIST_ITEM.captures(line))
        .map(|caps| {
            caps[1]
                .trim()
                .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '*'))
                .trim()
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .take(count)
        .collect()
}

/// Parse `VIDEO_TITLE:` / `DESCRIPTION:` / `TAGS:` lines.
///
/// Missing fields fall back to the headline, the summary with its link, and
/// the search keyword.
pub fn parse_video_details(reply: &str, article: &Article) -> VideoDetails {
    let mut title = None;
    let mut description = None;
    let mut tags = None;
    for line in reply.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("VIDEO_TITLE:") {
            title = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("DESCRIPTION:") {
            description = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("TAGS:") {
            tags = Some(
                rest.split(',')
                    .map(|t| t.trim().trim_start_matches('#').to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>(),
            );
        }
    }

    VideoDetails {
        title: title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| article.title.clone()),
        description: description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("{}\n\nSource: {}", article.description, article.url)),
        tags: tags
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| vec![article.keyword.clone()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockClient;
    use crate::models::fixtures::article;

    #[test]
    fn test_parse_script_with_markers() {
        let reply = "[INTRO]\nHook line.\n\n[Body]\nFirst part.\n\nSecond part.\n[CONCLUSION]\nSubscribe!";
        let (intro, body, conclusion) = parse_script(reply);
        assert_eq!(intro, "Hook line.");
        assert_eq!(body, "First part.\n\nSecond part.");
        assert_eq!(conclusion, "Subscribe!");
    }

    #[test]
    fn test_parse_script_preamble_becomes_intro() {
        let reply = "Good evening.\n[BODY]\nStory.\n[CONCLUSION]\nBye.";
        let (intro, body, conclusion) = parse_script(reply);
        assert_eq!(intro, "Good evening.");
        assert_eq!(body, "Story.");
        assert_eq!(conclusion, "Bye.");
    }

    #[test]
    fn test_parse_script_bold_tags_with_inline_text() {
        let reply = "**[INTRO]** Hello viewers.\n\n**[BODY]** The story.\n\n**[CONCLUSION]** Bye.";
        let (intro, body, conclusion) = parse_script(reply);
        assert_eq!(intro, "Hello viewers.");
        assert_eq!(body, "The story.");
        assert_eq!(conclusion, "Bye.");
    }

    #[test]
    fn test_parse_script_plain_tags_with_inline_text() {
        let reply = "[INTRO] Hello viewers.\n[BODY] The story.\nMore detail.\n[CONCLUSION] Bye.";
        let (intro, body, conclusion) = parse_script(reply);
        assert_eq!(intro, "Hello viewers.");
        assert_eq!(body, "The story.\nMore detail.");
        assert_eq!(conclusion, "Bye.");
    }

    #[test]
    fn test_parse_script_heading_tags() {
        let reply = "## [Intro]\nHook.\n\n### [BODY]:\nStory.\n\n__[conclusion]__\nBye.";
        let (intro, body, conclusion) = parse_script(reply);
        assert_eq!(intro, "Hook.");
        assert_eq!(body, "Story.");
        assert_eq!(conclusion, "Bye.");
    }

    #[test]
    fn test_parse_script_paragraph_fallback() {
        let reply = "Opening.\n\nMiddle one.\n\nMiddle two.\n\nClosing.";
        let (intro, body, conclusion) = parse_script(reply);
        assert_eq!(intro, "Opening.");
        assert_eq!(body, "Middle one.\n\nMiddle two.");
        assert_eq!(conclusion, "Closing.");
    }

    #[test]
    fn test_parse_script_short_reply_is_all_body() {
        let (intro, body, conclusion) = parse_script("Just one paragraph.");
        assert_eq!(intro, "");
        assert_eq!(body, "Just one paragraph.");
        assert_eq!(conclusion, "");
    }

    #[test]
    fn test_parse_numbered_titles() {
        let reply = "Here you go:\n1. \"Is this real?\"\n2) It finally happened\n\n3.   \n10. Last one\nno number";
        let titles = parse_numbered_titles(reply, 10);
        assert_eq!(titles, vec!["Is this real?", "It finally happened", "Last one"]);
        assert_eq!(parse_numbered_titles(reply, 1), vec!["Is this real?"]);
    }

    #[test]
    fn test_parse_bulleted_titles() {
        let reply = "- Is this real?\n- It happened\n* Shock!\n• **Reversal**";
        assert_eq!(
            parse_numbered_titles(reply, 10),
            vec!["Is this real?", "It happened", "Shock!", "Reversal"]
        );
    }

    #[test]
    fn test_parse_video_details() {
        let a = article("Chip plant", "https://example.com/1", 1.0);
        let reply = "VIDEO_TITLE: Big chip news\nDESCRIPTION: All about chips.\nTAGS: chips, #semis , economy,";
        let details = parse_video_details(reply, &a);
        assert_eq!(details.title, "Big chip news");
        assert_eq!(details.description, "All about chips.");
        assert_eq!(details.tags, vec!["chips", "semis", "economy"]);
    }

    #[test]
    fn test_parse_video_details_fallbacks() {
        let a = article("Chip plant", "https://example.com/1", 1.0);
        let details = parse_video_details("nothing useful", &a);
        assert_eq!(details.title, "Chip plant");
        assert!(details.description.contains("https://example.com/1"));
        assert_eq!(details.tags, vec!["AI"]);
    }

    #[tokio::test]
    async fn test_mock_script_is_deterministic_and_complete() {
        let generator = ScriptGenerator::new(LlmClient::Mock(MockClient), 10);
        let a = article("Coupang expands dawn delivery", "https://example.com/2", 2.5);

        let first = generator.generate_script(&a).await.unwrap();
        let second = generator.generate_script(&a).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.intro.trim().is_empty());
        assert!(!first.body.trim().is_empty());
        assert!(!first.conclusion.trim().is_empty());
        assert_eq!(first.thumbnail_title_candidates.len(), 10);
        assert_eq!(first.best_thumbnail_title(), Some("Is this for real?"));
    }

    #[tokio::test]
    async fn test_mock_package_has_details() {
        let generator = ScriptGenerator::new(LlmClient::Mock(MockClient), 3);
        let a = article("Coupang expands dawn delivery", "https://example.com/2", 2.5);
        let package = generator.generate_package(&a).await.unwrap();
        assert_eq!(package.provider, "Mock");
        assert_eq!(package.article, a);
        assert_eq!(package.script.thumbnail_title_candidates.len(), 3);
        assert_eq!(package.details.title, "Coupang expands dawn delivery | Explained");
        assert_eq!(package.details.tags.len(), 5);
    }
}
