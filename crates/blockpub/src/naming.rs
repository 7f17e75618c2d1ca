//! Block identity derivation and validation.
//!
//! A block's display name is the trimmed input; the published name is the
//! registry-safe slug derived from it. Both are fixed at publish time.

use anyhow::{Result, bail};

/// The two names a block is known by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIdentity {
    /// Human-facing name, as entered (trimmed).
    pub display_name: String,
    /// Lowercase hyphenated slug used by the registry.
    pub published_name: String,
}

/// Derive the display and published names from the user-supplied name.
pub fn derive_identity(name: &str) -> Result<BlockIdentity> {
    let display_name = name.trim();
    if display_name.is_empty() {
        bail!("block name is empty");
    }

    let published_name = slugify(display_name);
    if published_name.is_empty() {
        bail!("block name {display_name:?} contains no usable characters");
    }

    Ok(BlockIdentity {
        display_name: display_name.to_string(),
        published_name,
    })
}

/// Check that the chosen category is one the registry offers.
pub fn validate_category(category: &str, category_set: &[String]) -> Result<()> {
    if category_set.iter().any(|c| c == category) {
        return Ok(());
    }
    bail!(
        "unknown category {category:?} (expected one of: {})",
        category_set.join(", ")
    );
}

/// Lowercase, alphanumerics kept, everything else collapsed to single
/// hyphens, no leading or trailing hyphen.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
