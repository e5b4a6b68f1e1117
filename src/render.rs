//! Terminal rendering of the site's views.
//!
//! Renderers take records plus ephemeral [`ViewState`] and return text. They
//! never change the records they are given.

use std::collections::{BTreeSet, HashSet};
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::cache::ListState;
use crate::date::week_label;
use crate::models::{Article, Episode, Listed};
use crate::profile::Profile;
use crate::routes::{NavLink, nav_links};

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</p>|<br\s*/?>|</li>|</h[1-6]>").expect("static regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("static regex"));

/// UI-only state for one list view.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub query: String,
    /// Links of expanded cards.
    pub expanded: HashSet<String>,
    pub expand_all: bool,
    pub show_share: bool,
}

impl ViewState {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn is_expanded(&self, link: &str) -> bool {
        self.expand_all || self.expanded.contains(link)
    }

    pub fn toggle(&mut self, link: &str) {
        if !self.expanded.remove(link) {
            self.expanded.insert(link.to_string());
        }
    }
}

/// Items whose title contains `query`, ignoring case. A blank query keeps
/// everything.
pub fn filter_by_title<'a, T: Listed>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| item.title().to_lowercase().contains(&needle))
        .collect()
}

pub fn no_results_message(query: &str) -> String {
    format!("No results for \"{}\"", query.trim())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub twitter: String,
    pub linkedin: String,
}

/// Share-intent URLs for one post. Opening them is left to the caller.
pub fn share_links(title: &str, link: &str, handle: Option<&str>) -> ShareLinks {
    let text = match handle {
        Some(handle) => format!("{} by @{}", title, handle),
        None => title.to_string(),
    };
    let twitter = Url::parse_with_params("https://twitter.com/intent/tweet", &[("url", link), ("text", text.as_str())])
        .map(String::from)
        .unwrap_or_default();
    let linkedin = Url::parse_with_params(
        "https://www.linkedin.com/shareArticle",
        &[("mini", "true"), ("url", link), ("title", title)],
    )
    .map(String::from)
    .unwrap_or_default();
    ShareLinks { twitter, linkedin }
}

/// Plain text from an HTML fragment: tags dropped, common entities decoded,
/// block ends turned into line breaks.
pub fn strip_html(html: &str) -> String {
    let text = BLOCK_END.replace_all(html, "\n");
    let text = TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&");
    let text = SPACES.replace_all(&text, " ");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_nav(notes_url: Option<&str>) -> String {
    nav_links(notes_url)
        .iter()
        .map(|link| match link {
            NavLink::Internal(route) => format!("{} ({})", route.name(), route.path()),
            NavLink::External { name, url } => format!("{} ({}) ↗", name, url),
        })
        .collect::<Vec<_>>()
        .join("  ·  ")
}

fn header(out: &mut String, title: &str, blurb: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    if !blurb.is_empty() {
        let _ = writeln!(out, "{}", blurb);
    }
    let _ = writeln!(out);
}

/// Loading, error and empty handling shared by both list views. Returns the
/// items to draw, or `None` when a status line was written instead.
fn list_body<'a, T: Listed>(
    out: &mut String,
    state: &'a ListState<T>,
    view: &ViewState,
    loading_line: &str,
    empty_line: &str,
) -> Option<Vec<&'a T>> {
    if let Some(error) = &state.error {
        let _ = writeln!(out, "An Error Occurred");
        let _ = writeln!(out, "{}", error);
        return None;
    }
    if state.loading && state.items.is_empty() {
        let _ = writeln!(out, "{}", loading_line);
        return None;
    }
    if state.items.is_empty() {
        let _ = writeln!(out, "{}", empty_line);
        return None;
    }

    let visible = filter_by_title(&state.items, &view.query);
    if visible.is_empty() {
        let _ = writeln!(out, "{}", no_results_message(&view.query));
        return None;
    }
    Some(visible)
}

pub fn render_article(out: &mut String, article: &Article, view: &ViewState, handle: Option<&str>) {
    let _ = writeln!(out, "• {}", article.title);
    if let Some(label) = week_label(&article.pub_date) {
        let _ = writeln!(out, "  {}", label);
    }
    let _ = writeln!(out, "  {}", article.link);
    if view.show_share {
        let share = share_links(&article.title, &article.link, handle);
        let _ = writeln!(out, "  share on Twitter:  {}", share.twitter);
        let _ = writeln!(out, "  share on LinkedIn: {}", share.linkedin);
    }
}

pub fn render_writing(state: &ListState<Article>, view: &ViewState, profile: &Profile) -> String {
    let mut out = String::new();
    header(&mut out, "Writing", &profile.writing_blurb);

    if let Some(articles) = list_body(
        &mut out,
        state,
        view,
        "Loading latest articles...",
        "No articles found.",
    ) {
        for article in articles {
            render_article(&mut out, article, view, profile.twitter_handle.as_deref());
            let _ = writeln!(out);
        }
    }
    out
}

pub fn render_episode(out: &mut String, episode: &Episode, view: &ViewState) {
    let _ = writeln!(out, "• {}", episode.title);
    if let Some(label) = week_label(&episode.pub_date) {
        let _ = writeln!(out, "  {}", label);
    }
    let _ = writeln!(out, "  listen: {}", episode.audio_url);
    if !episode.link.is_empty() {
        let _ = writeln!(out, "  {}", episode.link);
    }
    if view.is_expanded(&episode.link) {
        for line in strip_html(&episode.description).lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
}

pub fn render_podcast(state: &ListState<Episode>, view: &ViewState, profile: &Profile) -> String {
    let mut out = String::new();
    header(&mut out, "Podcast", &profile.podcast.blurb);
    for show in &profile.podcast.shows {
        let _ = writeln!(out, "{}: {}", show.name, show.url);
    }
    let _ = writeln!(out);

    if let Some(episodes) = list_body(
        &mut out,
        state,
        view,
        "Loading latest episodes...",
        "No episodes found.",
    ) {
        for episode in episodes {
            render_episode(&mut out, episode, view);
            let _ = writeln!(out);
        }
    }
    out
}

/// Resume highlighting: a company lights up the skills its roles used, a
/// selected skill lights up the roles that used it.
#[derive(Debug, Clone, Default)]
pub struct ResumeView {
    pub highlight_company: Option<String>,
    pub selected_skill: Option<String>,
}

pub fn render_resume(profile: &Profile, view: &ResumeView) -> String {
    let mut out = String::new();
    header(&mut out, &profile.headline, "");
    for paragraph in &profile.intro {
        let _ = writeln!(out, "{}\n", paragraph);
    }
    let _ = writeln!(out, "> {}\n", profile.call_to_action);

    let highlighted: BTreeSet<String> = view
        .highlight_company
        .as_deref()
        .map(|company| profile.skills_for_company(company))
        .unwrap_or_default();

    let _ = writeln!(out, "Skills & Expertise");
    for skill in profile.sorted_skills() {
        let marker = if highlighted.contains(&skill.id) { "*" } else { "-" };
        let _ = writeln!(out, "  {} {} [{}]", marker, skill.name, skill.id);
    }
    let _ = writeln!(out);

    let selected = view.selected_skill.as_deref();
    if let Some(id) = selected {
        match profile.skill(id) {
            Some(skill) => {
                let _ = writeln!(out, "{}", skill.name);
                let _ = writeln!(out, "  {}\n", skill.description);
            }
            None => {
                let _ = writeln!(out, "Unknown skill '{}'\n", id);
            }
        }
    }

    let _ = writeln!(out, "Leadership Principles");
    for principle in &profile.principles {
        let _ = writeln!(out, "  {}", principle.title);
        let _ = writeln!(out, "    {}", principle.description);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Work Experience");
    for company in &profile.work {
        match &company.subtitle {
            Some(subtitle) => {
                let _ = writeln!(out, "  {} {}", company.company, subtitle);
            }
            None => {
                let _ = writeln!(out, "  {}", company.company);
            }
        }
        if !company.total_duration.is_empty() {
            let _ = writeln!(out, "  {}", company.total_duration);
        }
        for role in &company.roles {
            let uses_selected = selected.is_some_and(|id| role.skills.iter().any(|s| s == id));
            let marker = if uses_selected { "›" } else { "|" };
            let _ = writeln!(out, "  {} {}", marker, role.title);
            if role.location.is_empty() {
                let _ = writeln!(out, "    {}", role.duration);
            } else {
                let _ = writeln!(out, "    {} · {}", role.duration, role.location);
            }
            if !role.description.is_empty() {
                let _ = writeln!(out, "    {}", role.description);
            }
        }
        let _ = writeln!(out);
    }

    if !profile.certifications.is_empty() {
        let _ = writeln!(out, "Certifications");
        for cert in &profile.certifications {
            match &cert.link {
                Some(link) => {
                    let _ = writeln!(out, "  - {} ({})", cert.name, link);
                }
                None => {
                    let _ = writeln!(out, "  - {}", cert.name);
                }
            }
        }
    }
    out
}

pub fn render_connect(profile: &Profile) -> String {
    let mut out = String::new();
    header(&mut out, "Let's Connect", &profile.connect.headline);
    for link in &profile.connect.links {
        let _ = writeln!(out, "→ {}", link.title);
        let _ = writeln!(out, "  {}", link.description);
        let _ = writeln!(out, "  {}\n", link.url);
    }
    out
}
