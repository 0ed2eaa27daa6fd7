//! Minimal path matcher used to dispatch requests to route handlers.
//!
//! Patterns are slash-separated; literal segments must match exactly and
//! `:name` segments bind exactly one non-empty path segment.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Parameters captured while matching a path against a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: Vec<(String, String)>,
}

impl Params {
    /// Get a captured parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of distinct parameters captured.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn bind(&mut self, name: &str, value: &str) {
        if self.get(name).is_none() {
            self.values.push((name.to_owned(), value.to_owned()));
        }
    }
}

/// A parsed route pattern, i.e. `/:thing_id/properties/:property_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a route pattern.
    pub fn parse(pattern: &str) -> RoutePattern {
        let segments = split(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_owned()),
                _ => Segment::Literal(s.to_owned()),
            })
            .collect();

        RoutePattern { segments }
    }

    /// Number of `:name` placeholders in this pattern.
    pub fn placeholders(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Param(_)))
            .count()
    }

    /// Match a path against this pattern.
    ///
    /// Returns the captured parameters, or None if the path does not match.
    /// A pattern that names the same placeholder twice never matches.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => params.bind(name, part),
                _ => return None,
            }
        }

        if params.len() != self.placeholders() {
            return None;
        }

        Some(params)
    }
}

/// Ordered table of route patterns, mounted under a base path.
pub struct Router<H> {
    base_path: String,
    routes: Vec<(RoutePattern, H)>,
}

impl<H> Router<H> {
    /// Create an empty router.
    ///
    /// base_path -- path prefix all routes are mounted under, i.e. /things
    pub fn new(base_path: &str) -> Router<H> {
        Router {
            base_path: split(base_path).collect::<Vec<_>>().join("/"),
            routes: Vec::new(),
        }
    }

    /// Get the normalized base path, i.e. `/things`, or an empty string.
    pub fn base_path(&self) -> String {
        if self.base_path.is_empty() {
            String::new()
        } else {
            format!("/{}", self.base_path)
        }
    }

    /// Register a handler for a pattern. Earlier routes win.
    pub fn add(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.routes.push((RoutePattern::parse(pattern), handler));
        self
    }

    /// Find the handler for a request path.
    pub fn resolve(&self, path: &str) -> Option<(&H, Params)> {
        let path = self.strip_base(path)?;

        self.routes
            .iter()
            .find_map(|(pattern, handler)| pattern.matches(path).map(|p| (handler, p)))
    }

    fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.base_path.is_empty() {
            return Some(path);
        }

        let rest = path
            .trim_start_matches('/')
            .strip_prefix(self.base_path.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_matches('/');
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}
