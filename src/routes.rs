use std::fmt;
use std::str::FromStr;

use crate::error::FolioError;

/// The site's views, addressed by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Resume,
    Writing,
    Podcast,
    Connect,
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Resume, Route::Writing, Route::Podcast, Route::Connect];

    pub fn path(self) -> &'static str {
        match self {
            Route::Resume => "/",
            Route::Writing => "/writing",
            Route::Podcast => "/podcast",
            Route::Connect => "/connect",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Route::Resume => "resume",
            Route::Writing => "writing",
            Route::Podcast => "podcast",
            Route::Connect => "connect",
        }
    }

    /// Resolve a path. Accepts hash-router form (`#/writing`) and a
    /// trailing slash.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.trim();
        let path = path.strip_prefix('#').unwrap_or(path);
        let path = path.trim_end_matches('/');
        let path = if path.is_empty() { "/" } else { path };

        Route::ALL.into_iter().find(|route| route.path() == path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Route {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::from_path(s).ok_or_else(|| FolioError::Config(format!("no route for path '{}'", s)))
    }
}

/// One entry of the site navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavLink {
    Internal(Route),
    External { name: &'static str, url: String },
}

impl NavLink {
    pub fn name(&self) -> &str {
        match self {
            NavLink::Internal(route) => route.name(),
            NavLink::External { name, .. } => *name,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            NavLink::Internal(route) => route.path(),
            NavLink::External { url, .. } => url.as_str(),
        }
    }
}

/// Navigation in display order; the notes link is external and only shown
/// when configured.
pub fn nav_links(notes_url: Option<&str>) -> Vec<NavLink> {
    let mut links = vec![NavLink::Internal(Route::Resume), NavLink::Internal(Route::Writing)];
    if let Some(url) = notes_url {
        links.push(NavLink::External {
            name: "notes",
            url: url.to_string(),
        });
    }
    links.push(NavLink::Internal(Route::Podcast));
    links.push(NavLink::Internal(Route::Connect));
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_hash_and_trailing_slash() {
        assert_eq!(Route::from_path("/"), Some(Route::Resume));
        assert_eq!(Route::from_path(""), Some(Route::Resume));
        assert_eq!(Route::from_path("#/"), Some(Route::Resume));
        assert_eq!(Route::from_path("/writing"), Some(Route::Writing));
        assert_eq!(Route::from_path("#/podcast/"), Some(Route::Podcast));
        assert_eq!(Route::from_path(" /connect "), Some(Route::Connect));
    }

    #[test]
    fn unknown_path_is_an_error() {
        assert_eq!(Route::from_path("/principles"), None);
        assert!("/admin".parse::<Route>().is_err());
    }

    #[test]
    fn every_route_round_trips_through_its_path() {
        for route in Route::ALL {
            assert_eq!(route.path().parse::<Route>().unwrap(), route);
        }
    }

    #[test]
    fn nav_includes_notes_only_when_configured() {
        let names: Vec<String> = nav_links(Some("https://notes.example.com"))
            .iter()
            .map(|link| link.name().to_string())
            .collect();
        assert_eq!(names, vec!["resume", "writing", "notes", "podcast", "connect"]);
        assert_eq!(nav_links(None).len(), 4);
    }
}
