use crate::signals::{
    activation_for_age_days, count_exports, count_imports, reference_weight, shannon_entropy,
    unix_now_ms, SignalSet, DOC_LINK_WEIGHT, PATH_MENTION_WEIGHT,
};
use crate::types::{DependencyEdge, DependencyGraph, EdgeSignals, FileNode};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Extensions tried when a code reference omits one.
pub const RESOLVE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "py", "rs", "go", "java", "json", "md",
];

/// Prose-like files that get the document-link discovery pass.
const PROSE_EXTENSIONS: &[&str] = &["md", "mdx", "rst", "adoc", "txt"];

// Code reference specifiers. Extraction only, nothing parsed semantically.
static RE_FROM_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:import|export)\s[^'";]*?from\s+['"]([^'"]+)['"]"#).expect("from specifier")
});
static RE_BARE_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s+['"]([^'"]+)['"]"#).expect("bare import"));
static RE_REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("require"));

// Markdown-style link target: [label](target)
static RE_DOC_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").expect("doc link"));

/// One collaborator-supplied file for graph construction.
///
/// `content: None` marks an unreadable file; it still gets a node with
/// default signals (entropy 0, activation 0).
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: String,
    pub content: Option<String>,
    pub modified_ms: u64,
}

/// Builds the dependency graph from scanned files.
pub struct GraphBuilder {
    signals: SignalSet,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            signals: SignalSet::new(),
        }
    }

    pub fn with_signals(signals: SignalSet) -> Self {
        Self { signals }
    }

    /// Build a graph from scratch.
    pub fn build(&self, files: &[ScannedFile]) -> DependencyGraph {
        self.build_at(files, unix_now_ms())
    }

    /// Build with an explicit "now" for deterministic activation.
    pub fn build_at(&self, files: &[ScannedFile], now_ms: u64) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        // Phase 1: one node per file.
        for file in files {
            graph.insert_node(self.make_node(file, now_ms));
        }

        // Phase 2: discovery passes per file, against the full node set.
        let mention_re = mention_regex(&graph.top_level_dirs());
        for file in files {
            if let Some(content) = &file.content {
                self.discover(&mut graph, &file.path, content, mention_re.as_ref());
            }
        }

        log::info!(
            "Built dependency graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }

    /// Replace one node whole and re-discover its outgoing edges.
    ///
    /// Externally supplied signals (change frequency, goal distance) survive
    /// the replacement; everything derived from content is recomputed.
    pub fn update_file(&self, graph: &mut DependencyGraph, file: &ScannedFile) {
        self.update_file_at(graph, file, unix_now_ms());
    }

    pub fn update_file_at(&self, graph: &mut DependencyGraph, file: &ScannedFile, now_ms: u64) {
        let mut node = self.make_node(file, now_ms);
        if let Some(old) = graph.node(&file.path) {
            node.change_frequency = old.change_frequency;
            node.goal_distance = old.goal_distance;
        }
        graph.insert_node(node);
        graph.clear_outgoing(&file.path);

        if let Some(content) = &file.content {
            let mention_re = mention_regex(&graph.top_level_dirs());
            self.discover(graph, &file.path, content, mention_re.as_ref());
        }
    }

    fn make_node(&self, file: &ScannedFile, now_ms: u64) -> FileNode {
        let mut node = FileNode::new(file.path.clone());
        node.last_modified_ms = file.modified_ms;

        match &file.content {
            Some(content) => {
                let age_days = now_ms.saturating_sub(file.modified_ms) as f64 / 86_400_000.0;
                node.entropy = shannon_entropy(content);
                node.activation_level = activation_for_age_days(age_days);
                node.import_count = count_imports(content);
                node.export_count = count_exports(content);
            }
            None => {
                log::warn!("Unreadable file {}, keeping default signals", file.path);
            }
        }

        node
    }

    /// Run the three discovery passes for one file.
    ///
    /// Pass order fixes edge precedence: a code reference claims the (from,
    /// to) pair before the weaker document-link and path-mention passes see
    /// it. Targets that do not resolve to a known node are dropped silently.
    fn discover(
        &self,
        graph: &mut DependencyGraph,
        path: &str,
        content: &str,
        mention_re: Option<&Regex>,
    ) {
        self.discover_code_references(graph, path, content);
        if is_prose_file(path) {
            discover_doc_links(graph, path, content);
        }
        if let Some(re) = mention_re {
            discover_path_mentions(graph, path, content, re);
        }
    }

    fn discover_code_references(&self, graph: &mut DependencyGraph, path: &str, content: &str) {
        let dir = parent_dir(path);
        for spec in extract_code_specifiers(content) {
            if !(spec.starts_with("./") || spec.starts_with("../")) {
                continue;
            }
            let Some(base) = resolve_relative(dir, &spec) else {
                continue;
            };
            let Some(target) = probe_known_node(graph, &base) else {
                continue;
            };
            if target == path {
                continue;
            }
            let signals = self.signals.code_reference_signals(path, &target);
            let edge = DependencyEdge {
                weight: reference_weight(&signals),
                signals,
            };
            graph.add_edge(path, &target, edge);
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_doc_links(graph: &mut DependencyGraph, path: &str, content: &str) {
    let dir = parent_dir(path);
    for cap in RE_DOC_LINK.captures_iter(content) {
        let raw = &cap[1];
        if raw.contains("://") || raw.starts_with("mailto:") {
            continue;
        }
        let Some(target) = raw.split('#').next().filter(|t| !t.is_empty()) else {
            continue;
        };

        let resolved = if let Some(root_relative) = target.strip_prefix('/') {
            Some(root_relative.to_string())
        } else {
            resolve_relative(dir, target)
        };

        let candidate = resolved
            .filter(|r| graph.contains(r))
            // Fallback: some documents write project-relative targets without
            // a leading slash regardless of their own location.
            .or_else(|| graph.contains(target).then(|| target.to_string()));

        if let Some(to) = candidate {
            if to != path {
                graph.add_edge(
                    path,
                    &to,
                    DependencyEdge {
                        weight: DOC_LINK_WEIGHT,
                        signals: EdgeSignals::default(),
                    },
                );
            }
        }
    }
}

fn discover_path_mentions(graph: &mut DependencyGraph, path: &str, content: &str, re: &Regex) {
    for cap in re.captures_iter(content) {
        let candidate = &cap[1];
        if candidate == path || !graph.contains(candidate) {
            continue;
        }
        graph.add_edge(
            path,
            candidate,
            DependencyEdge {
                weight: PATH_MENTION_WEIGHT,
                signals: EdgeSignals::default(),
            },
        );
    }
}

fn extract_code_specifiers(content: &str) -> Vec<String> {
    let mut specs = Vec::new();
    for re in [&*RE_FROM_SPEC, &*RE_BARE_IMPORT, &*RE_REQUIRE] {
        for cap in re.captures_iter(content) {
            specs.push(cap[1].to_string());
        }
    }
    specs
}

/// Project-relative path strings under the graph's known top-level
/// directories, matched even outside explicit link syntax.
fn mention_regex(top_dirs: &BTreeSet<String>) -> Option<Regex> {
    if top_dirs.is_empty() {
        return None;
    }
    let alternatives = top_dirs
        .iter()
        .map(|d| regex::escape(d))
        .collect::<Vec<_>>()
        .join("|");
    // The prefix class keeps URL path segments (".../com/src/x") from
    // counting as project-relative mentions.
    let pattern = format!(
        r#"(?m)(?:^|[\s"'`(\[{{=,;:])((?:{alternatives})/[A-Za-z0-9_\-./]*[A-Za-z0-9_])"#
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Failed to compile path-mention pattern: {e}");
            None
        }
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn is_prose_file(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| PROSE_EXTENSIONS.iter().any(|p| ext.eq_ignore_ascii_case(p)))
        .unwrap_or(false)
}

/// Lexically resolve `spec` against `base_dir`. Returns None when the
/// traversal escapes the project root.
fn resolve_relative(base_dir: &str, spec: &str) -> Option<String> {
    let mut parts: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };

    for component in spec.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Try `base` as-is, then with each known extension.
fn probe_known_node(graph: &DependencyGraph, base: &str) -> Option<String> {
    if graph.contains(base) {
        return Some(base.to_string());
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = format!("{base}.{ext}");
        if graph.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}
