use crate::types::TaskType;

const BUG_FIX_KEYWORDS: &[&str] = &["fix", "bug", "hotfix"];
const DOCS_KEYWORDS: &[&str] = &["doc", "readme"];
const TEST_KEYWORDS: &[&str] = &["test", "spec"];
const REFACTOR_KEYWORDS: &[&str] = &["refactor", "cleanup", "chore", "lint", "perf"];
const FEATURE_KEYWORDS: &[&str] = &["feature", "feat", "implement", "add"];

const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "rst", "adoc", "txt"];
const SOURCE_ROOTS: &[&str] = &["src", "lib", "app", "crates", "packages"];

const CONF_ALL_DOC_FILES: f64 = 0.9;
const CONF_MOSTLY_TEST_FILES: f64 = 0.85;
const CONF_STRONG_KEYWORD: f64 = 0.8;
const CONF_WEAK_KEYWORD: f64 = 0.75;
const CONF_SOURCE_FALLBACK: f64 = 0.5;
const CONF_UNKNOWN: f64 = 0.2;

/// Outcome of task classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub task_type: TaskType,
    pub confidence: f64,
    pub reason: String,
}

/// Precomputed signals a rule predicate looks at.
struct RuleContext {
    text: String,
    files: Vec<String>,
}

impl RuleContext {
    fn new(text: &str, files: &[String]) -> Self {
        Self {
            text: text.to_lowercase(),
            files: files.to_vec(),
        }
    }

    fn mentions(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| self.text.contains(kw))
    }

    fn all_doc_files(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|f| is_doc_file(f))
    }

    fn mostly_test_files(&self) -> bool {
        !self.files.is_empty()
            && self.files.iter().filter(|f| is_test_file(f)).count() * 2 > self.files.len()
    }

    fn any_source_root_file(&self) -> bool {
        self.files.iter().any(|f| {
            f.split_once('/')
                .map(|(root, _)| SOURCE_ROOTS.contains(&root))
                .unwrap_or(false)
        })
    }
}

struct Rule {
    task_type: TaskType,
    confidence: f64,
    reason: &'static str,
    applies: fn(&RuleContext) -> bool,
}

/// Ordered rule chain, first match wins.
///
/// File-shape rules come before keyword rules so a docs-only change stays
/// docs even when the message says "fix typo".
pub struct TaskClassifier {
    rules: Vec<Rule>,
}

impl TaskClassifier {
    pub fn new() -> Self {
        let rules = vec![
            Rule {
                task_type: TaskType::Docs,
                confidence: CONF_ALL_DOC_FILES,
                reason: "all changed files are documentation",
                applies: |ctx| ctx.all_doc_files(),
            },
            Rule {
                task_type: TaskType::Test,
                confidence: CONF_MOSTLY_TEST_FILES,
                reason: "majority of changed files are tests",
                applies: |ctx| ctx.mostly_test_files(),
            },
            Rule {
                task_type: TaskType::BugFix,
                confidence: CONF_STRONG_KEYWORD,
                reason: "bug-fix keyword in description",
                applies: |ctx| ctx.mentions(BUG_FIX_KEYWORDS),
            },
            Rule {
                task_type: TaskType::Docs,
                confidence: CONF_STRONG_KEYWORD,
                reason: "documentation keyword in description",
                applies: |ctx| ctx.mentions(DOCS_KEYWORDS),
            },
            Rule {
                task_type: TaskType::Test,
                confidence: CONF_STRONG_KEYWORD,
                reason: "test keyword in description",
                applies: |ctx| ctx.mentions(TEST_KEYWORDS),
            },
            Rule {
                task_type: TaskType::Refactor,
                confidence: CONF_WEAK_KEYWORD,
                reason: "refactor keyword in description",
                applies: |ctx| ctx.mentions(REFACTOR_KEYWORDS),
            },
            Rule {
                task_type: TaskType::Feature,
                confidence: CONF_WEAK_KEYWORD,
                reason: "feature keyword in description",
                applies: |ctx| ctx.mentions(FEATURE_KEYWORDS),
            },
            Rule {
                task_type: TaskType::Feature,
                confidence: CONF_SOURCE_FALLBACK,
                reason: "changed files live under a source root",
                applies: |ctx| ctx.any_source_root_file(),
            },
        ];
        Self { rules }
    }

    pub fn classify(&self, text: &str, files: &[String]) -> Classification {
        let ctx = RuleContext::new(text, files);
        for rule in &self.rules {
            if (rule.applies)(&ctx) {
                return Classification {
                    task_type: rule.task_type,
                    confidence: rule.confidence,
                    reason: rule.reason.to_string(),
                };
            }
        }
        Classification {
            task_type: TaskType::Unknown,
            confidence: CONF_UNKNOWN,
            reason: "no classification rule matched".to_string(),
        }
    }
}

impl Default for TaskClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn is_doc_file(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.split('.').next().unwrap_or(name);
    if stem.eq_ignore_ascii_case("readme") {
        return true;
    }
    path.rsplit_once('.')
        .map(|(_, ext)| DOC_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
        .unwrap_or(false)
}

fn is_test_file(path: &str) -> bool {
    let lowered = path.to_lowercase();
    let name = lowered.rsplit('/').next().unwrap_or(&lowered);

    lowered.split('/').any(|c| {
        matches!(c, "test" | "tests" | "__tests__" | "spec" | "specs")
    }) || name.contains(".test.")
        || name.contains(".spec.")
        || name.starts_with("test_")
        || name
            .rsplit_once('.')
            .map(|(stem, _)| stem.ends_with("_test") || stem.ends_with("_spec"))
            .unwrap_or(false)
}
