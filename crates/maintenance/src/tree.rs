//! Materialized-path helpers
//!
//! A page's path is the concatenation of one 4-character base-36 step per
//! ancestor level, root first: the root is `0001`, its second child
//! `00010002`. Depth equals the number of steps.

use crate::errors::{TreeError, TreeResult};

/// Characters per path step
pub const STEP_LEN: usize = 4;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Largest value a single step can hold (`ZZZZ`)
const MAX_STEP: u32 = 36 * 36 * 36 * 36 - 1;

/// Encode a step value as 4 base-36 digits
pub fn encode_step(mut value: u32) -> TreeResult<String> {
    if value == 0 || value > MAX_STEP {
        return Err(TreeError::InvalidPath(format!("step {}", value)));
    }

    let mut digits = [b'0'; STEP_LEN];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(value % 36) as usize];
        value /= 36;
    }

    Ok(digits.iter().map(|&b| b as char).collect())
}

/// Decode one 4-character step
pub fn decode_step(step: &str) -> TreeResult<u32> {
    if step.len() != STEP_LEN {
        return Err(TreeError::InvalidPath(step.to_string()));
    }

    step.chars().try_fold(0u32, |acc, c| {
        c.to_digit(36)
            .filter(|_| !c.is_ascii_lowercase())
            .map(|d| acc * 36 + d)
            .ok_or_else(|| TreeError::InvalidPath(step.to_string()))
    })
}

/// Number of steps in a path
pub fn depth_of(path: &str) -> i32 {
    (path.len() / STEP_LEN) as i32
}

/// Path of the parent, `None` for the root
pub fn parent_path(path: &str) -> Option<&str> {
    (path.len() > STEP_LEN).then(|| &path[..path.len() - STEP_LEN])
}

/// Whether `path` lies strictly below `ancestor`
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len() && path.starts_with(ancestor)
}

/// Path for a new last child, given the current last child (if any)
pub fn next_child_path(parent: &str, last_child: Option<&str>) -> TreeResult<String> {
    let next = match last_child {
        Some(last) => {
            let step = last
                .get(parent.len()..)
                .filter(|s| last.starts_with(parent) && s.len() == STEP_LEN)
                .ok_or_else(|| TreeError::InvalidPath(last.to_string()))?;
            decode_step(step)? + 1
        }
        None => 1,
    };

    if next > MAX_STEP {
        return Err(TreeError::PathOverflow(parent.to_string()));
    }

    Ok(format!("{}{}", parent, encode_step(next)?))
}

/// Replace the `old_prefix` of `path` with `new_prefix`
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> String {
    format!("{}{}", new_prefix, &path[old_prefix.len()..])
}

/// URL slug from a title: lowercase ASCII alphanumerics joined by single dashes
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("page");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_encoding() {
        assert_eq!(encode_step(1).unwrap(), "0001");
        assert_eq!(encode_step(36).unwrap(), "0010");
        assert_eq!(encode_step(MAX_STEP).unwrap(), "ZZZZ");
        assert!(encode_step(0).is_err());

        assert_eq!(decode_step("0010").unwrap(), 36);
        assert_eq!(decode_step("ZZZZ").unwrap(), MAX_STEP);
        assert!(decode_step("00a1").is_err());
        assert!(decode_step("001").is_err());
    }

    #[test]
    fn test_path_navigation() {
        assert_eq!(depth_of("0001"), 1);
        assert_eq!(depth_of("000100020003"), 3);
        assert_eq!(parent_path("00010002"), Some("0001"));
        assert_eq!(parent_path("0001"), None);
        assert!(is_descendant("000100020001", "00010002"));
        assert!(!is_descendant("00010002", "00010002"));
        assert!(!is_descendant("00010003", "00010002"));
    }

    #[test]
    fn test_next_child_path() {
        assert_eq!(next_child_path("0001", None).unwrap(), "00010001");
        assert_eq!(next_child_path("0001", Some("00010009")).unwrap(), "0001000A");
        assert_eq!(next_child_path("0001", Some("0001000Z")).unwrap(), "00010010");
        assert!(matches!(
            next_child_path("0001", Some("0001ZZZZ")),
            Err(TreeError::PathOverflow(_))
        ));
        assert!(next_child_path("0001", Some("00020001")).is_err());
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("000100020005", "00010002", "00010007"), "000100070005");
        assert_eq!(rebase("00010002", "00010002", "000100030001"), "000100030001");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Services"), "services");
        assert_eq!(slugify("  Roof & Gutter Repair!! "), "roof-gutter-repair");
        assert_eq!(slugify("Árbol"), "rbol");
        assert_eq!(slugify("--"), "page");
    }
}
