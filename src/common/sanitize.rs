//! Whitelist filtering for text that ends up inside shell-bound or URL-bound strings.
//!
//! Commands are run from argument vectors, so most values never meet a shell.
//! The exceptions (the detached self-update script, remote URLs, notification
//! text, and package names crossing backend boundaries) go through [`sanitize`]
//! first. Disallowed characters are dropped, never escaped.

/// Characters that are never allowed, whatever the context.
pub const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '$', '`', '(', ')', '<', '>', '\n', '\r', '\t', '\\', '"', '\'',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeContext {
    /// Package names and app ids: alnum and `- _ . + /`
    Package,
    /// Filesystem paths: alnum, `/ . - _` and space
    Path,
    /// Human readable text for notifications
    Message,
    /// Config values such as branch names or `6m`
    Config,
}

impl SanitizeContext {
    fn allows(self, c: char) -> bool {
        if SHELL_METACHARACTERS.contains(&c) {
            return false;
        }
        match self {
            Self::Package => c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '/'),
            Self::Path => c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | ' '),
            Self::Message => true,
            Self::Config => c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '),
        }
    }
}

/// Keep only the characters `context` allows.
pub fn sanitize(input: &str, context: SanitizeContext) -> String {
    input.chars().filter(|&c| context.allows(c)).collect()
}
