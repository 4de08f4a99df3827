//! Renderer: summary, ASCII tree, and concatenated content emission with
//! deterministic ordering.

use crate::types::{Content, Digest, FsNode, IngestionQuery, RepoKind};

/// Length of the record separator line: 48 `=` characters, chosen so a
/// common tokenizer emits two tokens for it.
pub const SEPARATOR_LEN: usize = 48;

/// Renders `tree` into the three digest outputs.
pub fn render(tree: &FsNode, query: &IngestionQuery) -> Digest {
    let summary = render_summary(tree, query);
    let tree_text = render_tree(tree, query);
    let content = render_content(tree);
    Digest {
        summary,
        tree: tree_text,
        content,
    }
}

fn sep() -> String {
    "=".repeat(SEPARATOR_LEN)
}

fn render_summary(tree: &FsNode, query: &IngestionQuery) -> String {
    let mut lines = Vec::new();

    if let (Some(owner), Some(repo)) = (&query.owner, &query.repo) {
        lines.push(format!("Repository: {owner}/{repo}"));
    }
    if let Some(branch) = &query.branch
        && branch != "main"
    {
        lines.push(format!("Branch: {branch}"));
    }
    if let Some(tag) = &query.tag {
        lines.push(format!("Tag: {tag}"));
    }
    if let Some(commit) = &query.commit {
        lines.push(format!("Commit: {}", &commit[..commit.len().min(7)]));
    }
    if query.kind == RepoKind::Tree && query.subpath != "/" {
        lines.push(format!("Subpath: {}", query.subpath));
    }
    if query.kind == RepoKind::Blob {
        if let FsNode::File { name, .. } = tree {
            lines.push(format!("File: {name}"));
        }
        if let FsNode::File {
            content: Content::Text { body },
            ..
        } = tree
        {
            lines.push(format!("Lines: {}", body.lines().count()));
        }
    }
    if query.kind == RepoKind::Tree || !query.is_remote() {
        lines.push(format!("Files analyzed: {}", tree.file_count()));
    }
    lines.push(format!("Estimated tokens: {}", estimate_tokens(tree)));

    lines.push(String::new());
    lines.join("\n")
}

/// Whole-string-length ÷ 4 heuristic with SI suffixes.
fn estimate_tokens(tree: &FsNode) -> String {
    let total_chars = total_content_chars(tree);
    let tokens = (total_chars / 4).max(1);
    format_token_count(tokens)
}

fn total_content_chars(node: &FsNode) -> usize {
    match node {
        FsNode::File { content, .. } => match content {
            Content::Text { body } => body.len(),
            Content::Notebook { script } => script.len(),
            _ => 0,
        },
        FsNode::Directory { children, .. } => children.iter().map(total_content_chars).sum(),
        FsNode::Symlink { .. } => 0,
    }
}

fn format_token_count(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}k", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn render_tree(root: &FsNode, query: &IngestionQuery) -> String {
    let root_name = if query.is_remote() {
        query.repo.clone().unwrap_or_else(|| root.name().to_string())
    } else {
        root.name().to_string()
    };
    let mut out = format!("{root_name}/\n");
    if let FsNode::Directory { children, .. } = root {
        render_children(children, "", &mut out);
    }
    out
}

fn render_children(children: &[FsNode], prefix: &str, out: &mut String) {
    let last_index = children.len().saturating_sub(1);
    for (i, child) in children.iter().enumerate() {
        let is_last = i == last_index;
        let connector = if is_last { "└── " } else { "├── " };
        let is_dir = matches!(child, FsNode::Directory { .. });
        let suffix = if is_dir { "/" } else { "" };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(child.name());
        out.push_str(suffix);
        out.push('\n');

        if let FsNode::Directory { children, .. } = child {
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            render_children(children, &child_prefix, out);
        }
    }
}

fn render_content(root: &FsNode) -> String {
    let mut out = String::new();
    render_content_node(root, &mut out);
    out
}

fn render_content_node(node: &FsNode, out: &mut String) {
    match node {
        FsNode::Directory { children, .. } => {
            for child in children {
                render_content_node(child, out);
            }
        }
        FsNode::File {
            relative_path,
            content,
            ..
        } => {
            let kind = "FILE";
            let body = body_for(content);
            out.push_str(&sep());
            out.push('\n');
            out.push_str(&format!("{kind}: {}\n", relative_path.display()));
            out.push_str(&sep());
            out.push('\n');
            out.push_str(&body);
            out.push_str("\n\n");
        }
        FsNode::Symlink {
            relative_path,
            target,
            ..
        } => {
            out.push_str(&sep());
            out.push('\n');
            out.push_str(&format!("SYMLINK: {} -> {}\n", relative_path.display(), target.display()));
            out.push_str(&sep());
            out.push('\n');
            out.push_str("\n\n");
        }
    }
}

fn body_for(content: &Content) -> String {
    match content {
        Content::Text { body } => body.clone(),
        Content::Binary => "[Binary file]".to_string(),
        Content::Empty => "[Empty file]".to_string(),
        Content::Notebook { script } => script.clone(),
        Content::UnreadableError => "Error reading file".to_string(),
    }
}
