use std::sync::LazyLock;

use anyhow::Context as _;
use regex::Regex;

use crate::generate::TextGenerator;
use crate::validate::SUMMARY_MAX_CHARS;

const TITLE_PREVIEW_CHARS: usize = 500;

static TAGS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<tags>(.*?)</tags>").expect("valid tags regex"));
static LEADING_HASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#+\s*").expect("valid heading marker regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub title: String,
    pub content: String,
    pub summary: String,
    /// Comma-separated tag list; may be empty.
    pub tags: String,
}

/// Prompts for the rewrite calls. `brand_context` is appended to the system
/// prompt when set.
#[derive(Debug, Clone, Default)]
pub struct RewritePrompts {
    pub brand_context: Option<String>,
}

impl RewritePrompts {
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::from(
            "You are an experienced technical content writer. Write in a conversational but \
             professional voice, keep technical facts accurate, and prefer short scannable \
             paragraphs. Always answer in markdown (# for headings, - for bullets, 1. for steps).",
        );
        if let Some(context) = self
            .brand_context
            .as_deref()
            .map(str::trim)
            .filter(|context| !context.is_empty())
        {
            prompt.push_str("\n\nCompany context:\n");
            prompt.push_str(context);
        }
        prompt
    }

    pub fn content_prompt(&self, body: &str) -> String {
        format!(
            "Rewrite the following article so it reads naturally and engagingly while keeping \
             every technical detail. Use markdown headings, bullet points and numbered lists \
             where they help.\n\n\
             At the very end, list 2 to 10 relevant tags in exactly this format:\n\
             <tags>TagOne,TagTwo,TagThree</tags>\n\n\
             Original content:\n{body}\n\n\
             Return only the rewritten markdown followed by the tags."
        )
    }

    pub fn title_prompt(&self, title: &str, body: &str) -> String {
        let preview: String = body.chars().take(TITLE_PREVIEW_CHARS).collect();
        format!(
            "Write a clearer, more engaging title for this article.\n\n\
             Original title: {title}\n\n\
             Article preview:\n{preview}...\n\n\
             Return only the title as plain text, without markdown, # symbols or quotes."
        )
    }

    pub fn summary_prompt(&self, content: &str) -> String {
        format!(
            "Write a meta description of at most {SUMMARY_MAX_CHARS} characters for this \
             article.\n\nArticle content:\n{content}\n\n\
             Return only the summary text."
        )
    }
}

pub async fn rewrite_record(
    generator: &dyn TextGenerator,
    prompts: &RewritePrompts,
    title: &str,
    body: &str,
) -> anyhow::Result<Rewrite> {
    let system = prompts.system_prompt();
    let content_prompt = prompts.content_prompt(body);
    let title_prompt = prompts.title_prompt(title, body);

    let (raw_content, raw_title) = tokio::try_join!(
        async {
            generator
                .generate(&content_prompt, &system)
                .await
                .context("rewrite content")
        },
        async {
            generator
                .generate(&title_prompt, &system)
                .await
                .context("rewrite title")
        },
    )?;

    let tags = extract_tags(&raw_content);
    let content = remove_tag_blocks(&raw_content);
    if content.is_empty() {
        anyhow::bail!("rewritten content is empty");
    }
    let title = clean_title(&raw_title);
    if title.is_empty() {
        anyhow::bail!("rewritten title is empty");
    }

    let summary = generator
        .generate(&prompts.summary_prompt(&content), &system)
        .await
        .context("generate summary")?;
    let summary = truncate_chars(summary.trim(), SUMMARY_MAX_CHARS);

    Ok(Rewrite {
        title,
        content,
        summary,
        tags,
    })
}

pub fn extract_tags(text: &str) -> String {
    TAGS_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .unwrap_or_default()
}

pub fn remove_tag_blocks(text: &str) -> String {
    TAGS_BLOCK.replace_all(text, "").trim().to_owned()
}

pub fn clean_title(raw: &str) -> String {
    LEADING_HASHES.replace(raw.trim(), "").trim().to_owned()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    #[tokio::test]
    async fn rewrite_extracts_tags_and_cleans_title() {
        let generator = ScriptedGenerator {
            content: "## Better\nBody text\n<tags>Molding, Plastics</tags>\n".to_owned(),
            title: "# A Much Better Title".to_owned(),
            summary: "x".repeat(200),
            ..ScriptedGenerator::default()
        };

        let rewrite = rewrite_record(&generator, &RewritePrompts::default(), "Old", "<p>Old body</p>")
            .await
            .unwrap();

        assert_eq!(rewrite.title, "A Much Better Title");
        assert_eq!(rewrite.content, "## Better\nBody text");
        assert_eq!(rewrite.tags, "Molding, Plastics");
        assert_eq!(rewrite.summary.chars().count(), SUMMARY_MAX_CHARS);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("## Better\nBody text"));
        assert!(!prompts[2].contains("<tags>"));
    }

    #[tokio::test]
    async fn service_failure_surfaces_as_error() {
        let generator = ScriptedGenerator {
            fail: true,
            ..ScriptedGenerator::default()
        };
        let err = rewrite_record(&generator, &RewritePrompts::default(), "t", "b")
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("rate limited"));
    }

    #[test]
    fn only_first_tag_block_is_extracted_but_all_are_removed() {
        let text = "Intro <tags>a,b</tags> middle <tags>c</tags>";
        assert_eq!(extract_tags(text), "a,b");
        assert_eq!(remove_tag_blocks(text), "Intro  middle");
        assert_eq!(extract_tags("no tags here"), "");
    }

    #[test]
    fn brand_context_is_appended_to_system_prompt() {
        let prompts = RewritePrompts {
            brand_context: Some("We sell machines.".to_owned()),
        };
        assert!(prompts.system_prompt().ends_with("We sell machines."));
        assert!(!RewritePrompts::default().system_prompt().contains("Company context"));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("\u{e9}t\u{e9}", 2), "\u{e9}t");
    }
}
