//! Package path utilities
//!
//! Package names are relative, forward-slash separated and compared without
//! regard to ASCII case.

use crate::entry::PackageEntry;

/// Image extensions a texture reference may carry
const IMAGE_EXTENSIONS: [&str; 2] = ["tga", "jpg"];

/// How a package entry matched a requested texture name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureMatch {
    /// Entry path minus extension equals the requested name
    Exact,
    /// Entry path starts with the requested name
    Prefix,
}

/// Normalize a package-relative name
/// - Converts backslashes to forward slashes
/// - Removes redundant separators and leading slashes
/// - Resolves . and .. components
pub fn normalize_name(name: &str) -> String {
    let name = name.replace('\\', "/");

    let mut components = Vec::new();
    for component in name.trim().split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                components.pop();
            }
            _ => components.push(component),
        }
    }

    components.join("/")
}

/// Normalize a package entry name for use as an output path
///
/// Returns `None` for names that are absolute, carry a drive or stream
/// prefix (`:`), or contain a `..` component, before any normalization.
pub fn safe_relative_name(name: &str) -> Option<String> {
    let name = name.replace('\\', "/");
    if name.starts_with('/') {
        return None;
    }
    if name.split('/').any(|c| c == ".." || c.contains(':')) {
        return None;
    }

    let normalized = normalize_name(&name);
    (!normalized.is_empty()).then_some(normalized)
}

/// Get filename from path
pub fn filename(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    path.rfind('/').map_or(path, |pos| &path[pos + 1..])
}

/// Get parent directory of a path
pub fn parent(path: &str) -> Option<&str> {
    let path = path.trim_end_matches('/');
    path.rfind('/').map(|pos| &path[..pos])
}

/// Get file extension from path
pub fn get_extension(path: &str) -> Option<&str> {
    let filename = filename(path);

    if let Some(pos) = filename.rfind('.') {
        if pos > 0 && pos < filename.len() - 1 {
            return Some(&filename[pos + 1..]);
        }
    }

    None
}

/// Drop a trailing `.tga` / `.jpg` from a texture reference
pub fn strip_image_extension(name: &str) -> &str {
    match get_extension(name) {
        Some(ext) if IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) => {
            &name[..name.len() - ext.len() - 1]
        }
        _ => name,
    }
}

/// Turn a texture reference into the key used for package lookups
pub fn texture_key(name: &str) -> String {
    strip_image_extension(&normalize_name(name)).to_string()
}

/// Check how `path` matches a texture key (as built by `texture_key`)
pub fn match_texture(key: &str, path: &str) -> Option<TextureMatch> {
    if key.is_empty() || !path.is_char_boundary(key.len()) {
        return None;
    }

    let (head, rest) = path.split_at(key.len());
    if !head.eq_ignore_ascii_case(key) {
        return None;
    }

    let is_exact = rest.is_empty() || (rest.starts_with('.') && !rest[1..].contains(['.', '/']));
    Some(if is_exact { TextureMatch::Exact } else { TextureMatch::Prefix })
}

/// Pick the entry for a texture reference: an exact stem match wins,
/// otherwise the first entry that starts with the name.
pub fn best_texture_match<'a, I>(name: &str, entries: I) -> Option<(&'a PackageEntry, TextureMatch)>
where
    I: IntoIterator<Item = &'a PackageEntry>,
{
    let key = texture_key(name);
    let mut first_prefix = None;

    for entry in entries {
        match match_texture(&key, &entry.name) {
            Some(TextureMatch::Exact) => return Some((entry, TextureMatch::Exact)),
            Some(TextureMatch::Prefix) if first_prefix.is_none() => {
                first_prefix = Some((entry, TextureMatch::Prefix));
            }
            _ => {}
        }
    }

    first_prefix
}

/// Check if path matches a glob pattern, ignoring case
/// Supports * (any chars) and ? (single char)
pub fn glob_match(pattern: &str, path: &str) -> bool {
    glob_match_impl(
        pattern.to_ascii_lowercase().as_bytes(),
        path.to_ascii_lowercase().as_bytes(),
    )
}

fn glob_match_impl(pattern: &[u8], text: &[u8]) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    star_p = Some(p);
                    star_t = t;
                    p += 1;
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                c if c == text[t] => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }
        }

        // Mismatch - backtrack to last star if any
        match star_p {
            Some(sp) => {
                p = sp + 1;
                star_t += 1;
                t = star_t;
            }
            None => return false,
        }
    }

    // Match remaining stars
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }

    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> PackageEntry {
        PackageEntry::new(name, 0)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("textures/base"), "textures/base");
        assert_eq!(normalize_name("/textures/base"), "textures/base");
        assert_eq!(normalize_name("textures\\base"), "textures/base");
        assert_eq!(normalize_name("textures//base"), "textures/base");
        assert_eq!(normalize_name("textures/./sfx/../base"), "textures/base");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_safe_relative_name() {
        assert_eq!(safe_relative_name("textures/base/wall.tga").as_deref(), Some("textures/base/wall.tga"));
        assert_eq!(safe_relative_name("textures\\.\\base//wall.tga").as_deref(), Some("textures/base/wall.tga"));
        assert_eq!(safe_relative_name("textures/wall/../../../evil.jpg"), None);
        assert_eq!(safe_relative_name("textures\\..\\evil.jpg"), None);
        assert_eq!(safe_relative_name("/etc/evil.jpg"), None);
        assert_eq!(safe_relative_name("\\evil.jpg"), None);
        assert_eq!(safe_relative_name("C:/evil.jpg"), None);
        assert_eq!(safe_relative_name("./."), None);
    }

    #[test]
    fn test_filename_and_parent() {
        assert_eq!(filename("textures/base/wall.tga"), "wall.tga");
        assert_eq!(filename("wall.tga"), "wall.tga");
        assert_eq!(parent("textures/base/wall.tga"), Some("textures/base"));
        assert_eq!(parent("wall.tga"), None);
    }

    #[test]
    fn test_get_extension() {
        assert_eq!(get_extension("textures/wall.TGA"), Some("TGA"));
        assert_eq!(get_extension("no_extension"), None);
        assert_eq!(get_extension(".hidden"), None);
    }

    #[test]
    fn test_strip_image_extension() {
        assert_eq!(strip_image_extension("textures/base/wall.tga"), "textures/base/wall");
        assert_eq!(strip_image_extension("textures/base/wall.JPG"), "textures/base/wall");
        assert_eq!(strip_image_extension("textures/base/wall.png"), "textures/base/wall.png");
        assert_eq!(strip_image_extension("textures/base/wall"), "textures/base/wall");
    }

    #[test]
    fn test_match_texture() {
        assert_eq!(match_texture("textures/wall", "textures/wall.tga"), Some(TextureMatch::Exact));
        assert_eq!(match_texture("textures/wall", "Textures/Wall.JPG"), Some(TextureMatch::Exact));
        assert_eq!(match_texture("textures/wall", "textures/wall_dark.tga"), Some(TextureMatch::Prefix));
        assert_eq!(match_texture("textures/wall", "textures/wall.old.tga"), Some(TextureMatch::Prefix));
        assert_eq!(match_texture("textures/wall", "textures/floor.tga"), None);
        assert_eq!(match_texture("textures/wall", "wall.tga"), None);
        assert_eq!(match_texture("", "wall.tga"), None);
    }

    #[test]
    fn test_best_match_prefers_exact() {
        let entries = vec![entry("textures/wall_dark.tga"), entry("textures/wall.jpg")];

        let (found, kind) = best_texture_match("textures/wall", &entries).unwrap();
        assert_eq!(found.name, "textures/wall.jpg");
        assert_eq!(kind, TextureMatch::Exact);
    }

    #[test]
    fn test_best_match_falls_back_to_first_prefix() {
        let entries = vec![entry("textures/a.tga"), entry("textures/wall_b.tga"), entry("textures/wall_c.tga")];

        let (found, kind) = best_texture_match("textures\\wall.tga", &entries).unwrap();
        assert_eq!(found.name, "textures/wall_b.tga");
        assert_eq!(kind, TextureMatch::Prefix);

        assert!(best_texture_match("textures/floor", &entries).is_none());
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.tga", "wall.tga"));
        assert!(glob_match("wall.???", "wall.jpg"));
        assert!(glob_match("textures/*/wall*", "Textures/Base/WALL_dark.tga"));
        assert!(glob_match("**/wall.tga", "textures/base/wall.tga"));
        assert!(!glob_match("*.tga", "wall.jpg"));
    }
}
