use crate::formats::LegacyRecord;

pub const TITLE_MIN_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 60;
pub const BODY_MIN_CHARS: usize = 300;
pub const SUMMARY_MAX_CHARS: usize = 160;
pub const TAGS_MIN: usize = 2;
pub const TAGS_MAX: usize = 10;

pub fn validate_record(record: &LegacyRecord) -> Vec<String> {
    let mut problems = Vec::new();
    if record.title.trim().is_empty() {
        problems.push("title is required".to_owned());
    }
    if record.body.trim().is_empty() {
        problems.push("body is required".to_owned());
    }
    if record.slug.trim().is_empty() {
        problems.push("slug is required".to_owned());
    }
    if record.effective_date().is_none() {
        problems.push("a modified or published date is required".to_owned());
    }
    problems
}

/// Advisory content-quality findings. Summary and tag checks only apply
/// when those values are present.
pub fn seo_warnings(title: &str, body: &str, summary: Option<&str>, tags: Option<&str>) -> Vec<String> {
    let mut warnings = Vec::new();

    let title_len = title.chars().count();
    if title_len < TITLE_MIN_CHARS {
        warnings.push(format!(
            "title too short ({title_len} < {TITLE_MIN_CHARS} characters)"
        ));
    }
    if title_len > TITLE_MAX_CHARS {
        warnings.push(format!(
            "title too long ({title_len} > {TITLE_MAX_CHARS} characters)"
        ));
    }

    let body_len = body.chars().count();
    if body_len < BODY_MIN_CHARS {
        warnings.push(format!(
            "body too short ({body_len} < {BODY_MIN_CHARS} characters)"
        ));
    }

    if let Some(summary) = summary.filter(|s| !s.is_empty()) {
        let summary_len = summary.chars().count();
        if summary_len > SUMMARY_MAX_CHARS {
            warnings.push(format!(
                "summary too long ({summary_len} > {SUMMARY_MAX_CHARS} characters)"
            ));
        }
    }

    if let Some(tags) = tags.filter(|t| !t.trim().is_empty()) {
        let count = tags.split(',').count();
        if count < TAGS_MIN {
            warnings.push(format!("too few tags ({count} < {TAGS_MIN})"));
        }
        if count > TAGS_MAX {
            warnings.push(format!("too many tags ({count} > {TAGS_MAX})"));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LegacyRecord {
        LegacyRecord {
            id: 1,
            title: "Title".to_owned(),
            body: "<p>Body</p>".to_owned(),
            featured_media: None,
            published_at: Some("2024-01-01T00:00:00".to_owned()),
            modified_at: None,
            slug: "title".to_owned(),
        }
    }

    #[test]
    fn complete_record_is_valid() {
        assert!(validate_record(&record()).is_empty());
    }

    #[test]
    fn each_missing_field_is_reported() {
        let invalid = LegacyRecord {
            title: "  ".to_owned(),
            body: String::new(),
            slug: String::new(),
            published_at: None,
            modified_at: None,
            ..record()
        };
        assert_eq!(validate_record(&invalid).len(), 4);
    }

    #[test]
    fn modified_date_alone_is_enough() {
        let only_modified = LegacyRecord {
            published_at: None,
            modified_at: Some("2024-02-01T00:00:00".to_owned()),
            ..record()
        };
        assert!(validate_record(&only_modified).is_empty());
    }

    #[test]
    fn seo_checks_flag_each_bound() {
        let body = "x".repeat(BODY_MIN_CHARS);
        assert!(seo_warnings("A good enough title", &body, Some("short"), Some("a,b")).is_empty());

        let warnings = seo_warnings("Short", "tiny", Some(&"s".repeat(161)), Some("only"));
        assert_eq!(warnings.len(), 4, "{warnings:?}");

        let many = (0..11).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        let warnings = seo_warnings(&"t".repeat(61), &body, None, Some(&many));
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("title too long"));
        assert!(warnings[1].contains("too many tags"));
    }

    #[test]
    fn absent_summary_and_tags_are_not_checked() {
        let body = "x".repeat(BODY_MIN_CHARS);
        assert!(seo_warnings("A good enough title", &body, None, Some("")).is_empty());
    }
}
