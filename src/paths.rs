/// Normalizes a path for storage and comparison: backslashes become forward
/// slashes, runs of separators collapse to one, and a trailing separator is
/// stripped (except for the bare root). Display casing is preserved.
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut last_was_sep = false;
    for ch in path.chars() {
        let is_sep = ch == '/' || ch == '\\';
        if is_sep {
            if !last_was_sep {
                normalized.push('/');
            }
        } else {
            normalized.push(ch);
        }
        last_was_sep = is_sep;
    }
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }
    normalized
}

/// Case-folded identity key. Two paths with the same key refer to the same
/// entry; an empty input yields an empty key, which never matches a stored
/// entry.
pub fn identity_key(path: &str) -> String {
    normalize(path).to_lowercase()
}

/// Lowercased extension of the final path component, if any.
pub fn extension(path: &str) -> Option<String> {
    let name = normalize(path);
    let file_name = name.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separator_runs() {
        assert_eq!(normalize("/foo//bar///baz"), "/foo/bar/baz");
    }

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(normalize("/foo/bar/"), "/foo/bar");
        assert_eq!(normalize("/foo/bar///"), "/foo/bar");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize("C:\\Users\\test"), "C:/Users/test");
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(identity_key(""), "");
    }

    #[test]
    fn identity_key_case_folds() {
        assert_eq!(identity_key("/Shots/IMG.PNG"), identity_key("/shots/img.png"));
        assert_ne!(identity_key("/shots/a.png"), identity_key("/shots/b.png"));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension("/a/shot.PNG").as_deref(), Some("png"));
        assert_eq!(extension("/a/archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension("/a/noext"), None);
        assert_eq!(extension("/a/.hidden"), None);
    }
}
