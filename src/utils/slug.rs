use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid")
});

static VALID_SLUG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid")
});

const MAX_SLUG_LEN: usize = 80;

/// 从标题生成 slug：小写，非字母数字的连续片段折叠为一个连字符
pub fn generate_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string();

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        // 尽量在单词边界截断
        if let Some(cut) = slug.rfind('-').filter(|cut| *cut > MAX_SLUG_LEN / 2) {
            slug.truncate(cut);
        }
        slug = slug.trim_end_matches('-').to_string();
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// 与已有 slug 冲突时追加数字后缀
pub fn make_slug_unique(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|slug| slug == base) {
        return base.to_string();
    }

    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{}-{}", base, uuid::Uuid::new_v4().simple()))
}

pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LEN && VALID_SLUG.is_match(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("Rust: Ownership & Borrowing!"), "rust-ownership-borrowing");
        assert_eq!(generate_slug("  --Spaces--  "), "spaces");
        assert_eq!(generate_slug(""), "untitled");
        assert_eq!(generate_slug("!!!"), "untitled");
    }

    #[test]
    fn long_titles_are_cut_at_a_word_boundary() {
        let title = "word ".repeat(40);
        let slug = generate_slug(&title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert!(is_valid_slug(&slug));
    }

    #[test]
    fn test_make_slug_unique() {
        let taken = vec!["hello-world".to_string(), "hello-world-2".to_string()];
        assert_eq!(make_slug_unique("hello-world", &taken), "hello-world-3");
        assert_eq!(make_slug_unique("fresh", &taken), "fresh");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("hello-world-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-hello"));
        assert!(!is_valid_slug("hello--world"));
        assert!(!is_valid_slug("Hello"));
    }
}
