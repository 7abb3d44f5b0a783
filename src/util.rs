use std::io::Write;
use std::path::Path;

/// Convert a display name to a URL-safe kebab-case slug.
///
/// Example: "Mumbai Cricket Academy" → "mumbai-cricket-academy"
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// The part of an email address before the `@`.
///
/// Example: "virat.k@example.com" → "virat.k"
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Single-character avatar glyph for a name: its first alphanumeric character, uppercased.
pub fn avatar_glyph(name: &str) -> String {
    name.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// Deterministic backend username for a principal without one.
///
/// Slug of the preferred name joined with `_`, suffixed with the last four
/// characters of the uid so two users named alike don't collide.
pub fn generate_username(name: &str, uid: &str) -> String {
    let base = slugify(name).replace('-', "_");
    let base = if base.is_empty() { "player".to_string() } else { base };
    let suffix: String = uid
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<String>()
        .to_lowercase();
    if suffix.is_empty() {
        base
    } else {
        format!("{}_{}", base, suffix)
    }
}

/// Parse comma-separated form input: split on comma, trim, drop empty segments.
///
/// `"a, b,  c"` → `["a", "b", "c"]`
pub fn parse_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render a list back into the comma-separated form accepted by [`parse_list`].
pub fn join_list(items: &[String]) -> String {
    items.join(", ")
}

/// Write `content` to `path` through a sibling temp file and rename.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
