//! Version Shim.
//!
//! Maps `(engine version, native code, message)` to a stable [`ErrorKind`].
//! Engine releases word the same failure differently, and older releases
//! sometimes use a different code altogether; the rule table absorbs that so
//! nothing above it branches on the engine version.
//!
//! New engine versions are handled by adding rules. The kind set never grows.

use std::sync::OnceLock;

use regex::Regex;

use crate::engine::{codes, EngineVersion};
use crate::error::{ErrorKind, ErrorRecord};

/// Half-open range of engine versions a rule applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<EngineVersion>,
    pub max_exclusive: Option<EngineVersion>,
}

impl VersionRange {
    pub const ANY: VersionRange = VersionRange {
        min: None,
        max_exclusive: None,
    };

    pub const fn from_major(major: u32) -> Self {
        Self {
            min: Some(EngineVersion::new(major, 0, 0)),
            max_exclusive: None,
        }
    }

    /// Every release of one major version. The last representable major
    /// has no upper bound.
    pub const fn major(major: u32) -> Self {
        Self {
            min: Some(EngineVersion::new(major, 0, 0)),
            max_exclusive: match major.checked_add(1) {
                Some(next) => Some(EngineVersion::new(next, 0, 0)),
                None => None,
            },
        }
    }

    pub const fn before_major(major: u32) -> Self {
        Self {
            min: None,
            max_exclusive: Some(EngineVersion::new(major, 0, 0)),
        }
    }

    pub fn contains(&self, version: EngineVersion) -> bool {
        self.min.is_none_or(|min| version >= min)
            && self.max_exclusive.is_none_or(|max| version < max)
    }
}

/// One mapping rule. All present conditions must hold.
#[derive(Clone, Debug)]
pub struct ShimRule {
    pub versions: VersionRange,
    /// Native codes the rule applies to. Empty matches any code.
    pub codes: Vec<i32>,
    /// Pattern searched in the cleaned message.
    pub pattern: Option<Regex>,
    pub kind: ErrorKind,
}

impl ShimRule {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            versions: VersionRange::ANY,
            codes: Vec::new(),
            pattern: None,
            kind,
        }
    }

    pub fn versions(mut self, versions: VersionRange) -> Self {
        self.versions = versions;
        self
    }

    pub fn code(mut self, code: i32) -> Self {
        self.codes.push(code);
        self
    }

    /// Restricts the rule to messages matching `pattern`.
    pub fn pattern(self, pattern: &str) -> Result<Self, regex::Error> {
        Ok(self.matching(Regex::new(pattern)?))
    }

    /// Restricts the rule to messages matching an already compiled regex.
    pub fn matching(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Built-in rules only; their patterns are literals.
    fn literal(self, pattern: &'static str) -> Self {
        self.matching(Regex::new(pattern).expect("valid built-in pattern"))
    }

    fn matches(&self, version: EngineVersion, code: i32, message: &str) -> bool {
        self.versions.contains(version)
            && (self.codes.is_empty() || self.codes.contains(&code))
            && self.pattern.as_ref().is_none_or(|re| re.is_match(message))
    }
}

/// The built-in rule table, in match order.
pub fn default_rules() -> Vec<ShimRule> {
    vec![
        ShimRule::new(ErrorKind::Aborted).code(codes::USER_INTERRUPT),
        // 3.x: "{path}: No such file or directory"
        ShimRule::new(ErrorKind::NotFound)
            .versions(VersionRange::from_major(3))
            .code(codes::OPEN_FAILED)
            .literal(r"No such file or directory"),
        // 2.x: "`{path}' does not exist in the file system, and is not recognized as ..."
        ShimRule::new(ErrorKind::NotFound)
            .versions(VersionRange::major(2))
            .code(codes::OPEN_FAILED)
            .literal(r"does not exist in the file system"),
        // 1.x reported missing files as plain I/O errors.
        ShimRule::new(ErrorKind::NotFound)
            .versions(VersionRange::before_major(2))
            .code(codes::FILE_IO)
            .literal(r"No such file"),
        ShimRule::new(ErrorKind::UnsupportedFormat)
            .code(codes::OPEN_FAILED)
            .literal(r"not recognized as a supported (file format|dataset name)"),
        ShimRule::new(ErrorKind::NotFound)
            .code(codes::HTTP_RESPONSE)
            .literal(r"\b404\b"),
        ShimRule::new(ErrorKind::NotFound)
            .code(codes::AWS_BUCKET_NOT_FOUND)
            .code(codes::AWS_OBJECT_NOT_FOUND),
        ShimRule::new(ErrorKind::InvalidArgument)
            .code(codes::ILLEGAL_ARG)
            .code(codes::OBJECT_NULL),
    ]
}

fn error_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ERROR \d+:\s*").expect("valid regex"))
}

/// Strips the `ERROR n:` prefix some engine builds add and trims whitespace.
pub fn clean_message(message: &str) -> String {
    error_prefix_regex().replace(message.trim(), "").trim().to_string()
}

/// Rule-driven native error normalizer.
#[derive(Clone, Debug)]
pub struct VersionShim {
    rules: Vec<ShimRule>,
}

impl Default for VersionShim {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl VersionShim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule that takes precedence over the built-in table.
    pub fn with_rule(mut self, rule: ShimRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn rules(&self) -> &[ShimRule] {
        &self.rules
    }

    /// Classifies one native failure.
    ///
    /// The record keeps the raw code whatever the kind, and its message is the
    /// cleaned native message.
    pub fn normalize(&self, code: i32, message: &str, version: EngineVersion) -> ErrorRecord {
        let message = clean_message(message);
        let kind = self
            .rules
            .iter()
            .find(|rule| rule.matches(version, code, &message))
            .map(|rule| rule.kind)
            .unwrap_or(ErrorKind::NativeFailure);

        let message = if message.is_empty() {
            format!("native error {} ({})", code, codes::name(code))
        } else {
            message
        };
        ErrorRecord::new(kind, message).with_native_code(code)
    }
}
