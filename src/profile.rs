use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

const BUILTIN_PROFILE: &str = include_str!("profile.yaml");

/// Static biography data behind the resume, connect and podcast pages and
/// the assistant's context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub headline: String,
    /// Handle credited in share text, without the leading `@`.
    #[serde(default)]
    pub twitter_handle: Option<String>,
    pub intro: Vec<String>,
    pub call_to_action: String,
    pub skill_categories: Vec<SkillCategory>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub principles: Vec<Principle>,
    pub work: Vec<Company>,
    #[serde(default)]
    pub writing_blurb: String,
    pub podcast: PodcastShow,
    pub connect: ConnectPage,
    #[serde(default)]
    pub notes_url: Option<String>,
    #[serde(default)]
    pub example_prompts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCategory {
    pub category: String,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principle {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub company: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub total_duration: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub title: String,
    pub duration: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub current: bool,
    /// Ids into the skill catalogue.
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastShow {
    pub blurb: String,
    pub shows: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectPage {
    pub headline: String,
    pub links: Vec<ConnectLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectLink {
    pub title: String,
    pub description: String,
    pub url: String,
}

impl Profile {
    /// The profile compiled into the binary.
    pub fn builtin() -> Result<Self> {
        serde_yaml::from_str(BUILTIN_PROFILE).context("built-in profile is not valid YAML")
    }

    /// Load a profile from a YAML file.
    pub fn load_yaml(path: &str) -> Result<Self> {
        info!("Loading profile from YAML file: {}", path);

        if !Path::new(path).exists() {
            anyhow::bail!("Profile file not found: {}", path);
        }

        let contents = fs::read_to_string(path)?;
        let profile: Profile =
            serde_yaml::from_str(&contents).with_context(|| format!("invalid profile YAML in {}", path))?;

        debug!(
            "Loaded profile for {} with {} skills and {} companies",
            profile.name,
            profile.skills().count(),
            profile.work.len()
        );
        Ok(profile)
    }

    /// Load from `path` when given, otherwise use the built-in profile.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load_yaml(path),
            None => Self::builtin(),
        }
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.skill_categories.iter().flat_map(|category| category.skills.iter())
    }

    /// Every skill across categories, ordered by name.
    pub fn sorted_skills(&self) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self.skills().collect();
        skills.sort_by_key(|skill| skill.name.to_lowercase());
        skills
    }

    pub fn skill(&self, id: &str) -> Option<&Skill> {
        self.skills().find(|skill| skill.id == id)
    }

    /// Skill ids referenced by any role at companies whose name contains
    /// `company` (case-insensitive).
    pub fn skills_for_company(&self, company: &str) -> BTreeSet<String> {
        let needle = company.to_lowercase();
        self.work
            .iter()
            .filter(|entry| entry.company.to_lowercase().contains(&needle))
            .flat_map(|entry| entry.roles.iter())
            .flat_map(|role| role.skills.iter().cloned())
            .collect()
    }
}
