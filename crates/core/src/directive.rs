//! Comment directive parsing.
//!
//! Declarations opt into wiring through comment lines of the form
//! `<prefix>:<kind> …`, e.g. `weft:provider weak multi require=NewCache`.
//! The prefix token is a configuration value; everything after it follows
//! a small whitespace-separated grammar per kind.

use std::time::Duration;

use weft_model::Pos;

use crate::errors::Error;

/// Default directive prefix.
pub const DEFAULT_PREFIX: &str = "weft";

/// A parsed, validated directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Provider(ProviderDirective),
    Config(ConfigDirective),
    Api(ApiDirective),
    Cron(CronDirective),
    Subscribe,
    Middleware(MiddlewareDirective),
}

impl Directive {
    /// Short kind name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Provider(_) => "provider",
            Directive::Config(_) => "config",
            Directive::Api(_) => "api",
            Directive::Cron(_) => "cron",
            Directive::Subscribe => "subscribe",
            Directive::Middleware(_) => "middleware",
        }
    }
}

/// `provider [weak] [multi] [require=Name,…]…`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderDirective {
    pub weak: bool,
    pub multi: bool,
    /// Same-package function names accumulated across `require=` options.
    pub require: Vec<String>,
}

/// `config [prefix=STRING]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDirective {
    pub prefix: Option<String>,
}

/// `middleware [label…]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiddlewareDirective {
    pub labels: Vec<String>,
}

/// `cron <number><unit>` with unit one of `s m h d w`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronDirective {
    pub schedule: Duration,
    /// The schedule exactly as written, for diagnostics and emission.
    pub raw: String,
}

/// `api [METHOD] [HOST]/path… [label[=value]…]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDirective {
    pub pattern: ApiPattern,
    pub labels: Vec<Label>,
}

/// A label attached to an API or middleware directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: Option<String>,
}

/// One path segment of an API pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Wildcard { name: String, remainder: bool },
}

/// Method, host and path of an API directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPattern {
    /// Empty means any method.
    pub method: String,
    /// Empty means any host.
    pub host: String,
    pub segments: Vec<Segment>,
    pub trailing_slash: bool,
}

impl ApiPattern {
    /// Wildcard names in path order.
    pub fn wildcards(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Wildcard { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// The pattern in the host mux's registration form:
    /// `[METHOD ]HOST/path/{name}[...]`, with the trailing `/` preserved
    /// iff the directive wrote one.
    pub fn pattern_string(&self) -> String {
        let mut out = String::new();
        if !self.method.is_empty() {
            out.push_str(&self.method);
            out.push(' ');
        }
        out.push_str(&self.host);
        if self.segments.is_empty() {
            out.push('/');
            return out;
        }
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Wildcard { name, remainder } => {
                    out.push('{');
                    out.push_str(name);
                    if *remainder {
                        out.push_str("...");
                    }
                    out.push('}');
                }
            }
        }
        if self.trailing_slash {
            out.push('/');
        }
        out
    }
}

/// Parses directive comment lines.
#[derive(Debug, Clone)]
pub struct DirectiveParser {
    prefix: String,
}

impl Default for DirectiveParser {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl DirectiveParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Strip comment markers and return the directive payload if the line
    /// is one, i.e. starts with `<prefix>:`.
    fn payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        let trimmed = line.trim_start();
        let trimmed = trimmed.strip_prefix("//").unwrap_or(trimmed).trim_start();
        let rest = trimmed.strip_prefix(self.prefix.as_str())?;
        rest.strip_prefix(':')
    }

    /// True iff `line` would parse as a directive of this parser's prefix.
    pub fn matches(&self, line: &str) -> bool {
        self.payload(line).is_some()
    }

    /// Parse one comment line. Returns `Ok(None)` for non-directive
    /// lines, the parsed directive otherwise.
    pub fn parse(&self, line: &str, pos: &Pos) -> Result<Option<Directive>, Error> {
        let Some(payload) = self.payload(line) else {
            return Ok(None);
        };
        let payload = payload.trim();
        let (kind, rest) = match payload.split_once(char::is_whitespace) {
            Some((kind, rest)) => (kind, rest.trim()),
            None => (payload, ""),
        };
        if kind.is_empty() {
            return Err(Error::DirectiveSyntax {
                pos: pos.clone(),
                reason: "missing directive kind".to_string(),
            });
        }
        let directive = match kind {
            "provider" => Directive::Provider(parse_provider(rest, pos)?),
            "config" => Directive::Config(parse_config(rest, pos)?),
            "api" => Directive::Api(parse_api(rest, pos)?),
            "cron" => Directive::Cron(parse_cron(rest, pos)?),
            "subscribe" => {
                if !rest.is_empty() {
                    return Err(Error::DirectiveInvalid {
                        pos: pos.clone(),
                        reason: format!("subscribe takes no options, found {rest:?}"),
                    });
                }
                Directive::Subscribe
            }
            "middleware" => Directive::Middleware(parse_middleware(rest, pos)?),
            other => {
                return Err(Error::DirectiveSyntax {
                    pos: pos.clone(),
                    reason: format!("unknown directive kind {other:?}"),
                })
            }
        };
        Ok(Some(directive))
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_provider(rest: &str, pos: &Pos) -> Result<ProviderDirective, Error> {
    let mut directive = ProviderDirective::default();
    for token in rest.split_whitespace() {
        if token == "weak" {
            directive.weak = true;
        } else if token == "multi" {
            directive.multi = true;
        } else if let Some(targets) = token.strip_prefix("require=") {
            for target in targets.split(',') {
                let target = target.trim();
                if target.is_empty() {
                    return Err(Error::DirectiveInvalid {
                        pos: pos.clone(),
                        reason: "empty require target".to_string(),
                    });
                }
                if !is_ident(target) {
                    return Err(Error::DirectiveInvalid {
                        pos: pos.clone(),
                        reason: format!(
                            "require target {target:?} must be a function name in the same package"
                        ),
                    });
                }
                directive.require.push(target.to_string());
            }
        } else {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: format!("unknown provider option {token:?}"),
            });
        }
    }
    Ok(directive)
}

fn parse_config(rest: &str, pos: &Pos) -> Result<ConfigDirective, Error> {
    let mut directive = ConfigDirective::default();
    for token in rest.split_whitespace() {
        if let Some(value) = token.strip_prefix("prefix=") {
            let value = value.trim_matches('"');
            directive.prefix = Some(value.to_string());
        } else {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: format!("unknown config option {token:?}"),
            });
        }
    }
    Ok(directive)
}

fn parse_middleware(rest: &str, pos: &Pos) -> Result<MiddlewareDirective, Error> {
    let mut directive = MiddlewareDirective::default();
    for token in rest.split_whitespace() {
        if !is_ident(token) {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: format!("middleware label {token:?} is not an identifier"),
            });
        }
        directive.labels.push(token.to_string());
    }
    Ok(directive)
}

fn parse_cron(rest: &str, pos: &Pos) -> Result<CronDirective, Error> {
    let raw = rest.trim();
    let last = raw.char_indices().last();
    let Some((unit_at, unit)) = last.filter(|_| !raw.contains(char::is_whitespace)) else {
        return Err(Error::DirectiveInvalid {
            pos: pos.clone(),
            reason: format!("cron expects a single schedule such as 30s or 5m, found {raw:?}"),
        });
    };
    let n: u64 = raw[..unit_at].parse().map_err(|_| Error::DirectiveInvalid {
        pos: pos.clone(),
        reason: format!("cron schedule {raw:?} has no leading number"),
    })?;
    let secs = match unit {
        's' => n,
        'm' => n * 60,
        'h' => n * 3600,
        'd' => n * 86_400,
        'w' => n * 604_800,
        other => {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: format!("cron unit {other:?} must be one of s, m, h, d, w"),
            })
        }
    };
    Ok(CronDirective {
        schedule: Duration::from_secs(secs),
        raw: raw.to_string(),
    })
}

const METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

fn parse_api(rest: &str, pos: &Pos) -> Result<ApiDirective, Error> {
    let mut tokens = rest.split_whitespace().peekable();

    let mut method = String::new();
    if let Some(token) = tokens.peek() {
        if METHODS.contains(token) {
            method = tokens.next().unwrap_or_default().to_string();
        }
    }

    let Some(pattern_token) = tokens.next() else {
        return Err(Error::DirectiveInvalid {
            pos: pos.clone(),
            reason: "api directive is missing a path".to_string(),
        });
    };
    if pattern_token.contains("://") {
        return Err(Error::DirectiveInvalid {
            pos: pos.clone(),
            reason: format!("api pattern {pattern_token:?} must not carry a URL scheme"),
        });
    }
    let Some(slash) = pattern_token.find('/') else {
        return Err(Error::DirectiveInvalid {
            pos: pos.clone(),
            reason: format!("api pattern {pattern_token:?} is missing a path"),
        });
    };
    let host = pattern_token[..slash].to_string();
    let path = &pattern_token[slash..];
    let (segments, trailing_slash) = parse_path(path, pos)?;

    let mut labels = Vec::new();
    for token in tokens {
        let (name, value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value.trim_matches('"').to_string())),
            None => (token, None),
        };
        if !is_ident(name) {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: format!("api label {name:?} is not an identifier"),
            });
        }
        labels.push(Label {
            name: name.to_string(),
            value,
        });
    }

    Ok(ApiDirective {
        pattern: ApiPattern {
            method,
            host,
            segments,
            trailing_slash,
        },
        labels,
    })
}

fn parse_path(path: &str, pos: &Pos) -> Result<(Vec<Segment>, bool), Error> {
    if path == "/" {
        return Ok((Vec::new(), false));
    }
    let trailing_slash = path.ends_with('/');
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    let mut segments = Vec::new();
    for part in trimmed.split('/') {
        if part.is_empty() {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: format!("api path {path:?} contains an empty segment"),
            });
        }
        if let Some(prev) = segments.last() {
            if matches!(prev, Segment::Wildcard { remainder: true, .. }) {
                return Err(Error::DirectiveInvalid {
                    pos: pos.clone(),
                    reason: "catch-all wildcard must be the last path segment".to_string(),
                });
            }
        }
        if part.starts_with('{') || part.ends_with('}') {
            let inner = part
                .strip_prefix('{')
                .and_then(|p| p.strip_suffix('}'))
                .ok_or_else(|| Error::DirectiveInvalid {
                    pos: pos.clone(),
                    reason: format!("wildcard {part:?} must span the whole segment"),
                })?;
            let (name, remainder) = match inner.strip_suffix("...") {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if !is_ident(name) {
                return Err(Error::DirectiveInvalid {
                    pos: pos.clone(),
                    reason: format!("wildcard name {name:?} is not an identifier"),
                });
            }
            segments.push(Segment::Wildcard {
                name: name.to_string(),
                remainder,
            });
        } else if part.contains('{') || part.contains('}') {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: format!("wildcard {part:?} must span the whole segment"),
            });
        } else {
            segments.push(Segment::Literal(part.to_string()));
        }
    }
    if trailing_slash {
        if let Some(Segment::Wildcard { remainder: true, .. }) = segments.last() {
            return Err(Error::DirectiveInvalid {
                pos: pos.clone(),
                reason: "catch-all wildcard must be the last path segment".to_string(),
            });
        }
    }
    Ok((segments, trailing_slash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Directive>, Error> {
        DirectiveParser::default().parse(line, &Pos::new("app/app.src", 1, 1))
    }

    fn parse_ok(line: &str) -> Directive {
        parse(line).unwrap().expect("expected a directive")
    }

    #[test]
    fn test_non_directive_lines_are_skipped() {
        assert_eq!(parse("// plain comment").unwrap(), None);
        assert_eq!(parse("// weftish: not ours").unwrap(), None);
        assert!(DirectiveParser::new("other")
            .parse("//other:provider", &Pos::default())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_provider_options() {
        let Directive::Provider(p) = parse_ok("//weft:provider weak multi require=NewA,NewB")
        else {
            panic!("wrong kind")
        };
        assert!(p.weak);
        assert!(p.multi);
        assert_eq!(p.require, ["NewA", "NewB"]);
    }

    #[test]
    fn test_provider_rejects_unknown_option() {
        assert!(matches!(
            parse("//weft:provider lazy"),
            Err(Error::DirectiveInvalid { .. })
        ));
        assert!(matches!(
            parse("//weft:provider require=pkg.NewA"),
            Err(Error::DirectiveInvalid { .. })
        ));
    }

    #[test]
    fn test_config_prefix() {
        let Directive::Config(c) = parse_ok(r#"//weft:config prefix="db_${type}_""#) else {
            panic!("wrong kind")
        };
        assert_eq!(c.prefix.as_deref(), Some("db_${type}_"));
        let Directive::Config(c) = parse_ok("//weft:config") else {
            panic!("wrong kind")
        };
        assert_eq!(c.prefix, None);
    }

    #[test]
    fn test_cron_schedules() {
        for (raw, secs) in [("30s", 30), ("5m", 300), ("2h", 7200), ("1d", 86_400), ("1w", 604_800)]
        {
            let Directive::Cron(c) = parse_ok(&format!("//weft:cron {raw}")) else {
                panic!("wrong kind")
            };
            assert_eq!(c.schedule, Duration::from_secs(secs));
            assert_eq!(c.raw, raw);
        }
        assert!(parse("//weft:cron").is_err());
        assert!(parse("//weft:cron 5x").is_err());
        assert!(parse("//weft:cron fast").is_err());
    }

    #[test]
    fn test_api_full_form() {
        let Directive::Api(api) =
            parse_ok("//weft:api GET example.com/users/{id}/files/{path...} authenticated role=admin")
        else {
            panic!("wrong kind")
        };
        assert_eq!(api.pattern.method, "GET");
        assert_eq!(api.pattern.host, "example.com");
        assert_eq!(api.pattern.wildcards(), ["id", "path"]);
        assert_eq!(
            api.pattern.pattern_string(),
            "GET example.com/users/{id}/files/{path...}"
        );
        assert_eq!(api.labels.len(), 2);
        assert_eq!(api.labels[1].value.as_deref(), Some("admin"));
    }

    #[test]
    fn test_api_root_and_trailing_slash() {
        let Directive::Api(api) = parse_ok("//weft:api /") else {
            panic!("wrong kind")
        };
        assert_eq!(api.pattern.pattern_string(), "/");

        let Directive::Api(api) = parse_ok("//weft:api POST /users/") else {
            panic!("wrong kind")
        };
        assert!(api.pattern.trailing_slash);
        assert_eq!(api.pattern.pattern_string(), "POST /users/");
    }

    #[test]
    fn test_api_rejects_malformed_paths() {
        assert!(parse("//weft:api GET").is_err());
        assert!(parse("//weft:api https://example.com/x").is_err());
        assert!(parse("//weft:api /a//b").is_err());
        assert!(parse("//weft:api /a{id}").is_err());
        assert!(parse("//weft:api /{files...}/tail").is_err());
        assert!(parse("//weft:api /{files...}/").is_err());
        assert!(parse("//weft:api /{}").is_err());
    }

    #[test]
    fn test_subscribe_takes_no_options() {
        assert_eq!(parse_ok("//weft:subscribe"), Directive::Subscribe);
        assert!(parse("//weft:subscribe now").is_err());
    }

    #[test]
    fn test_middleware_labels() {
        let Directive::Middleware(mw) = parse_ok("//weft:middleware authenticated admin") else {
            panic!("wrong kind")
        };
        assert_eq!(mw.labels, ["authenticated", "admin"]);
        assert!(parse("//weft:middleware bad-label!").is_err());
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            parse("//weft:gadget"),
            Err(Error::DirectiveSyntax { .. })
        ));
    }
}
