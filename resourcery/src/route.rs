//! Route patterns for a resource prefix.
//!
//! Every prefix expands to the same five patterns, matched in a fixed
//! precedence order. The templates also drive outbound URL generation, so
//! generated URLs and the matcher never disagree.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;

use crate::error::RoutingError;

/// Characters escaped in generated path segments.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// One route pattern of a resource prefix.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    /// The symbolic name, e.g. `widget.show`.
    name: String,

    /// The printable path template, e.g. `/widget/{id}`.
    template: String,

    /// The compiled matcher.
    regex: Regex,

    /// The action forced by the pattern, overriding method-based resolution.
    action: Option<&'static str>,
}

impl RoutePattern {
    fn new(name: String, template: String, pattern: String, action: Option<&'static str>) -> Self {
        let regex = Regex::new(&pattern).expect("route pattern must compile");

        Self {
            name,
            template,
            regex,
            action,
        }
    }

    /// The symbolic name of the pattern.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The printable path template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The action the pattern forces, if any.
    pub fn forced_action(&self) -> Option<&'static str> {
        self.action
    }
}

/// The outcome of matching a path against a [`RouteSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The symbolic name of the matched pattern.
    pub name: String,

    /// The decoded id segment, when one was captured.
    pub id: Option<String>,

    /// The action segment, captured or pattern-forced.
    pub action: Option<String>,
}

/// The ordered pattern set of one resource prefix.
#[derive(Debug, Clone)]
pub struct RouteSet {
    prefix: String,
    patterns: Vec<RoutePattern>,
}

impl RouteSet {
    /// Build the pattern set for a prefix.
    ///
    /// The fixed `new` and `edit` patterns are ordered before the
    /// id-capturing ones, so `/{prefix}/new` is never mistaken for an id
    /// named `new`. Patterns are anchored on both ends: a prefix that is a
    /// strict textual prefix of another never cross-matches.
    pub fn for_prefix(prefix: &str) -> Result<Self, RoutingError> {
        let prefix = prefix.trim_matches('/');

        if prefix.is_empty() {
            return Err(RoutingError::MissingPrefix);
        }

        let escaped = regex::escape(prefix);
        let patterns = vec![
            RoutePattern::new(
                format!("{prefix}.index"),
                format!("/{prefix}"),
                format!("^/{escaped}$"),
                None,
            ),
            RoutePattern::new(
                format!("{prefix}.new"),
                format!("/{prefix}/new"),
                format!("^/{escaped}/new$"),
                Some("new"),
            ),
            RoutePattern::new(
                format!("{prefix}.show"),
                format!("/{prefix}/{{id}}"),
                format!("^/{escaped}/(?P<id>[^/]+)$"),
                None,
            ),
            RoutePattern::new(
                format!("{prefix}.edit"),
                format!("/{prefix}/{{id}}/edit"),
                format!("^/{escaped}/(?P<id>[^/]+)/edit$"),
                Some("edit"),
            ),
            RoutePattern::new(
                format!("{prefix}.action"),
                format!("/{prefix}/{{id}}/{{action}}"),
                format!("^/{escaped}/(?P<id>[^/]+)/(?P<action>[^/]*)$"),
                None,
            ),
        ];

        Ok(Self {
            prefix: prefix.to_owned(),
            patterns,
        })
    }

    /// The resource prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The patterns, in precedence order.
    pub fn patterns(&self) -> &[RoutePattern] {
        &self.patterns
    }

    /// Match a path against the patterns; the first match wins.
    ///
    /// Captured segments are percent-decoded and empty segments normalize to
    /// absent.
    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        for pattern in &self.patterns {
            if let Some(captures) = pattern.regex.captures(path) {
                let id = captures
                    .name("id")
                    .map(|capture| decode_segment(capture.as_str()))
                    .filter(|id| !id.is_empty());
                let action = pattern
                    .forced_action()
                    .map(str::to_owned)
                    .or_else(|| {
                        captures
                            .name("action")
                            .map(|capture| decode_segment(capture.as_str()))
                    })
                    .filter(|action| !action.is_empty());

                return Some(RouteMatch {
                    name: pattern.name.clone(),
                    id,
                    action,
                });
            }
        }

        None
    }

    /// Build the outbound URL for an action.
    ///
    /// Produced paths match the patterns of this set, with the id segment
    /// percent-encoded.
    pub fn url_for(&self, action: &str, id: Option<&str>) -> Result<String, RoutingError> {
        let prefix = &self.prefix;

        match action {
            "index" => Ok(format!("/{prefix}")),
            "new" => Ok(format!("/{prefix}/new")),
            "show" => {
                let id = self.require_id(action, id)?;

                Ok(format!("/{prefix}/{}", encode_segment(id)))
            }
            "edit" => {
                let id = self.require_id(action, id)?;

                Ok(format!("/{prefix}/{}/edit", encode_segment(id)))
            }
            other => {
                let id = self.require_id(other, id)?;

                Ok(format!(
                    "/{prefix}/{}/{}",
                    encode_segment(id),
                    encode_segment(other)
                ))
            }
        }
    }

    /// The symbolic route name for an action, e.g. `widget.show`.
    pub fn name_for(&self, action: &str) -> String {
        format!("{}.{}", self.prefix, action)
    }

    fn require_id<'i>(&self, action: &str, id: Option<&'i str>) -> Result<&'i str, RoutingError> {
        id.ok_or_else(|| RoutingError::MissingId {
            action: action.to_owned(),
        })
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> RouteSet {
        RouteSet::for_prefix("widget").expect("pattern set must build")
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        assert_eq!(
            RouteSet::for_prefix("/").unwrap_err(),
            RoutingError::MissingPrefix
        );
    }

    #[test]
    fn test_collection_and_member_paths() {
        let routes = routes();

        let index = routes.matches("/widget").unwrap();
        assert_eq!(index.name, "widget.index");
        assert_eq!(index.id, None);
        assert_eq!(index.action, None);

        let show = routes.matches("/widget/42").unwrap();
        assert_eq!(show.name, "widget.show");
        assert_eq!(show.id.as_deref(), Some("42"));
        assert_eq!(show.action, None);
    }

    #[test]
    fn test_new_is_not_an_id() {
        let matched = routes().matches("/widget/new").unwrap();

        assert_eq!(matched.name, "widget.new");
        assert_eq!(matched.id, None);
        assert_eq!(matched.action.as_deref(), Some("new"));
    }

    #[test]
    fn test_edit_is_not_a_generic_action() {
        let matched = routes().matches("/widget/42/edit").unwrap();

        assert_eq!(matched.name, "widget.edit");
        assert_eq!(matched.id.as_deref(), Some("42"));
        assert_eq!(matched.action.as_deref(), Some("edit"));
    }

    #[test]
    fn test_generic_action_route() {
        let matched = routes().matches("/widget/42/archive").unwrap();

        assert_eq!(matched.name, "widget.action");
        assert_eq!(matched.id.as_deref(), Some("42"));
        assert_eq!(matched.action.as_deref(), Some("archive"));
    }

    #[test]
    fn test_empty_action_segment_normalizes_to_absent() {
        let matched = routes().matches("/widget/42/").unwrap();

        assert_eq!(matched.id.as_deref(), Some("42"));
        assert_eq!(matched.action, None);
    }

    #[test]
    fn test_prefixes_match_on_segment_boundaries() {
        let routes = routes();

        assert!(routes.matches("/anotherwidget").is_none());
        assert!(routes.matches("/anotherwidget/42").is_none());
        assert!(routes.matches("/widgets").is_none());
        assert!(routes.matches("/widget/42/edit/extra").is_none());
    }

    #[test]
    fn test_url_for_round_trips() {
        let routes = routes();

        for (action, id) in [
            ("index", None),
            ("new", None),
            ("show", Some("42")),
            ("edit", Some("42")),
            ("archive", Some("42")),
        ] {
            let url = routes.url_for(action, id).unwrap();
            let matched = routes.matches(&url).unwrap();

            assert_eq!(matched.id.as_deref(), id, "for action `{action}`");
            assert_eq!(matched.action.as_deref().unwrap_or(action), action);
        }
    }

    #[test]
    fn test_url_for_encodes_the_id_segment() {
        let routes = routes();

        let url = routes.url_for("show", Some("a b/c")).unwrap();
        assert_eq!(url, "/widget/a%20b%2Fc");

        let matched = routes.matches(&url).unwrap();
        assert_eq!(matched.id.as_deref(), Some("a b/c"));
    }

    #[test]
    fn test_url_for_requires_an_id_for_member_routes() {
        assert_eq!(
            routes().url_for("show", None).unwrap_err(),
            RoutingError::MissingId {
                action: "show".to_owned()
            }
        );
    }

    #[test]
    fn test_symbolic_names() {
        assert_eq!(routes().name_for("index"), "widget.index");
        assert_eq!(routes().name_for("edit"), "widget.edit");
    }
}
