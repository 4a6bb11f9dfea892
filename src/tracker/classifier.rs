//! Rule-based sample classification.
//!
//! Assigns a category by matching wildcard patterns against the sample's
//! domain, app name, and window title (in that order, first match wins),
//! and pulls editor context (file, language, project) out of the title.

use crate::types::{Classification, Sample};

/// Assigns category and context fields to a sample.
pub trait Classifier: Send + Sync {
    fn classify(&self, sample: &Sample) -> Classification;
}

/// Which sample field a rule pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    App,
    Title,
    Domain,
}

/// A single classification rule.
#[derive(Debug, Clone)]
pub struct ClassifierRule {
    /// Field the pattern applies to.
    pub field: RuleField,

    /// Wildcard pattern: `*` matches any run of characters, `?` exactly one.
    pub pattern: String,

    /// Category assigned when the pattern matches.
    pub category: String,
}

impl ClassifierRule {
    pub fn new(field: RuleField, pattern: &str, category: &str) -> Self {
        Self {
            field,
            pattern: pattern.to_string(),
            category: category.to_string(),
        }
    }
}

/// Classifier backed by an ordered rule list.
pub struct PatternClassifier {
    rules: Vec<ClassifierRule>,
}

impl PatternClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// A starter rule set covering common apps and sites.
    pub fn with_default_rules() -> Self {
        use RuleField::*;
        let rules = vec![
            ClassifierRule::new(Domain, "*github*", "development"),
            ClassifierRule::new(Domain, "*gitlab*", "development"),
            ClassifierRule::new(Domain, "*stackoverflow*", "development"),
            ClassifierRule::new(Domain, "*docs.rs*", "development"),
            ClassifierRule::new(Domain, "*youtube*", "entertainment"),
            ClassifierRule::new(Domain, "*netflix*", "entertainment"),
            ClassifierRule::new(Domain, "*twitch*", "entertainment"),
            ClassifierRule::new(App, "*code*", "development"),
            ClassifierRule::new(App, "*intellij*", "development"),
            ClassifierRule::new(App, "*pycharm*", "development"),
            ClassifierRule::new(App, "*terminal*", "development"),
            ClassifierRule::new(App, "*iterm*", "development"),
            ClassifierRule::new(App, "*alacritty*", "development"),
            ClassifierRule::new(App, "*chrome*", "browsing"),
            ClassifierRule::new(App, "*firefox*", "browsing"),
            ClassifierRule::new(App, "*safari*", "browsing"),
            ClassifierRule::new(App, "*edge*", "browsing"),
            ClassifierRule::new(App, "*slack*", "communication"),
            ClassifierRule::new(App, "*discord*", "communication"),
            ClassifierRule::new(App, "*teams*", "communication"),
            ClassifierRule::new(App, "*zoom*", "meetings"),
            ClassifierRule::new(App, "*spotify*", "entertainment"),
            ClassifierRule::new(App, "*figma*", "design"),
            ClassifierRule::new(App, "*notion*", "writing"),
            ClassifierRule::new(App, "*obsidian*", "writing"),
        ];
        Self::new(rules)
    }

    fn match_field(&self, field: RuleField, text: &str) -> Option<String> {
        let text_lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.field == field && pattern_matches(&rule.pattern.to_lowercase(), &text_lower)
            })
            .map(|rule| rule.category.clone())
    }
}

impl Classifier for PatternClassifier {
    fn classify(&self, sample: &Sample) -> Classification {
        let mut class = Classification::default();

        if let Some(url) = &sample.url {
            class.domain = extract_domain(url);
        }

        if let Some(domain) = class.domain.clone() {
            class.category = self.match_field(RuleField::Domain, &domain);
        }
        if class.category.is_none() {
            class.category = self.match_field(RuleField::App, &sample.app_name);
        }
        if class.category.is_none() {
            class.category = self.match_field(RuleField::Title, &sample.window_title);
        }

        if let Some((file_name, project)) = parse_editor_title(&sample.window_title) {
            class.file_type = file_extension(&file_name);
            class.language = class
                .file_type
                .as_deref()
                .and_then(language_for)
                .map(str::to_string);
            class.file_name = Some(file_name);
            class.project_name = project;
        }

        class
    }
}

/// Matches a pattern with wildcards against a string.
/// `*` matches zero or more characters, `?` exactly one.
fn pattern_matches(pattern: &str, text: &str) -> bool {
    fn match_helper(
        mut p: std::iter::Peekable<std::str::Chars>,
        mut t: std::iter::Peekable<std::str::Chars>,
    ) -> bool {
        loop {
            match (p.next(), t.peek()) {
                (Some('*'), _) => {
                    while p.peek() == Some(&'*') {
                        p.next();
                    }
                    if p.peek().is_none() {
                        return true;
                    }
                    loop {
                        if match_helper(p.clone(), t.clone()) {
                            return true;
                        }
                        if t.next().is_none() {
                            return false;
                        }
                    }
                }
                (Some('?'), Some(_)) => {
                    t.next();
                }
                (Some(pc), Some(&tc)) if pc == tc => {
                    t.next();
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }

    match_helper(pattern.chars().peekable(), text.chars().peekable())
}

/// Pulls the host out of a URL, without scheme, port, or `www.` prefix.
fn extract_domain(url: &str) -> Option<String> {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let host = rest
        .split(&['/', '?', '#'][..])
        .next()
        .and_then(|h| h.split(':').next())
        .unwrap_or("");
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Parses editor-style titles like `main.rs - focusmon - Visual Studio Code`
/// into a file name and, when present, the project segment.
fn parse_editor_title(title: &str) -> Option<(String, Option<String>)> {
    let segments: Vec<&str> = title.split(" - ").map(str::trim).collect();
    let first = segments.first()?.trim_start_matches("● ").trim();

    // A lone dot-separated token is taken as a file name.
    let looks_like_file = first.contains('.')
        && !first.contains(' ')
        && !first.starts_with('.')
        && !first.ends_with('.');
    if !looks_like_file {
        return None;
    }

    let project = if segments.len() >= 3 {
        Some(segments[1].to_string())
    } else {
        None
    };
    Some((first.to_string(), project))
}

fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

fn language_for(extension: &str) -> Option<&'static str> {
    let language = match extension {
        "rs" => "Rust",
        "py" => "Python",
        "js" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "go" => "Go",
        "java" => "Java",
        "c" | "h" => "C",
        "cpp" | "cc" | "hpp" => "C++",
        "rb" => "Ruby",
        "md" => "Markdown",
        "html" => "HTML",
        "css" => "CSS",
        "json" => "JSON",
        "toml" => "TOML",
        "yaml" | "yml" => "YAML",
        "sql" => "SQL",
        "sh" => "Shell",
        _ => return None,
    };
    Some(language)
}
