//! Slug derivation for remote stack ids.
//!
//! The remote derives a stack's id from its name: lowercase alphanumerics,
//! with every other run of characters collapsed to a single dash. We apply
//! the same derivation locally so the update and read paths can address a
//! stack before its id was ever reported back.

const MAX_SLUG_LEN: usize = 256;

pub fn safe_slug(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
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
    slug.truncate(MAX_SLUG_LEN);
    slug
}
