//! Route policy: an ordered, immutable table of `(method, path pattern) → access`.
//!
//! Evaluation is first-match-wins in declaration order. Anything not matched
//! falls through to the default rule, which always requires a role.

use serde::Serialize;

use crate::Role;
use crate::config::ConfigError;

/// What a matched route requires from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "roles")]
pub enum Access {
    /// No token needed, none is parsed.
    Public,
    /// Any verified, unexpired token, whatever its roles.
    Authenticated,
    /// A verified token holding at least one of these roles.
    AnyRole(Vec<Role>),
}

/// HTTP method selector of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    Any,
    Exact(String),
}

impl MethodMatcher {
    /// Parse `*` (any method) or a method token such as `GET`.
    ///
    /// Tokens are upper-cased; request methods are compared case-sensitively.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let s = s.trim();
        if s == "*" {
            return Ok(Self::Any);
        }
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidMethod(s.to_string()));
        }
        Ok(Self::Exact(s.to_ascii_uppercase()))
    }

    pub fn matches(&self, method: &str) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Exact(m) => m == method,
        }
    }
}

impl core::fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MethodMatcher::Any => f.write_str("*"),
            MethodMatcher::Exact(m) => f.write_str(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`: exactly one segment.
    One,
    /// `**`: zero or more segments.
    Rest,
}

/// Ant-style path pattern with whole-segment `*` and `**` wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |why: &str| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: why.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "*" => Ok(Segment::One),
                "**" => Ok(Segment::Rest),
                s if s.contains('*') => Err(invalid("wildcards must span a whole segment")),
                s => Ok(Segment::Literal(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a normalized request path. Empty segments (`//`, trailing `/`)
    /// are ignored.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match_segments(&self.segments, &parts)
    }
}

/// Single pass over the pattern; `reachable[j]` means the segments seen so
/// far match `path[..j]`. Linear in pattern length times path length, however
/// many `**` the pattern holds.
fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    let mut reachable = vec![false; path.len() + 1];
    reachable[0] = true;

    for segment in pattern {
        let mut next = vec![false; path.len() + 1];
        match segment {
            Segment::Rest => {
                let mut seen = false;
                for (slot, &ok) in next.iter_mut().zip(&reachable) {
                    seen |= ok;
                    *slot = seen;
                }
            }
            Segment::One => {
                for j in 1..=path.len() {
                    next[j] = reachable[j - 1];
                }
            }
            Segment::Literal(lit) => {
                for j in 1..=path.len() {
                    next[j] = reachable[j - 1] && path[j - 1] == lit.as_str();
                }
            }
        }
        reachable = next;
    }

    reachable[path.len()]
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub method: MethodMatcher,
    pub pattern: PathPattern,
    pub access: Access,
}

impl Rule {
    pub fn new(method: MethodMatcher, pattern: PathPattern, access: Access) -> Self {
        Self {
            method,
            pattern,
            access,
        }
    }

    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.method.matches(method) && self.pattern.matches(path)
    }
}

impl core::fmt::Display for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.method, self.pattern.as_str())
    }
}

/// Where the effective rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum RuleSource {
    /// Position in the declared rule list.
    Declared(usize),
    /// Nothing matched; the fail-closed default applies.
    Default,
}

/// Result of a rule lookup.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRule<'a> {
    pub rule: &'a Rule,
    pub source: RuleSource,
}

/// Ordered rule table plus the fail-closed default.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<Rule>,
    default_rule: Rule,
}

impl RoutePolicy {
    /// Build a policy. Unmatched requests require one of `default_roles`;
    /// an empty set denies them outright.
    pub fn new(rules: Vec<Rule>, default_roles: Vec<Role>) -> Self {
        let default_rule = Rule {
            method: MethodMatcher::Any,
            pattern: PathPattern {
                raw: "/**".to_string(),
                segments: vec![Segment::Rest],
            },
            access: Access::AnyRole(default_roles),
        };

        Self {
            rules,
            default_rule,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn default_rule(&self) -> &Rule {
        &self.default_rule
    }

    /// First declared rule matching `(method, path)`, else the default.
    pub fn resolve(&self, method: &str, path: &str) -> ResolvedRule<'_> {
        self.rules
            .iter()
            .position(|r| r.matches(method, path))
            .map(|idx| ResolvedRule {
                rule: &self.rules[idx],
                source: RuleSource::Declared(idx),
            })
            .unwrap_or(ResolvedRule {
                rule: &self.default_rule,
                source: RuleSource::Default,
            })
    }
}
