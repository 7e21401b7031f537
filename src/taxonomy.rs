//! Keyword taxonomy and boolean query builder.
//!
//! Selected terms inside a category are OR-ed and wrapped in parentheses;
//! categories (and any extra free text) are AND-ed together. Terms are
//! inserted verbatim: a trailing `*` is boolean-search wildcard syntax.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keyword category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Technology,
    Human,
    Competency,
}

impl CategoryId {
    /// Order in which categories are emitted into a query.
    pub const ORDER: [CategoryId; 3] = [
        CategoryId::Technology,
        CategoryId::Human,
        CategoryId::Competency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryId::Technology => "technology",
            CategoryId::Human => "human",
            CategoryId::Competency => "competency",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryId {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        CategoryId::ORDER
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SearchError::MalformedInput(format!("Unknown keyword category '{}'", s)))
    }
}

/// A labelled list of search terms.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub id: CategoryId,
    pub label: &'static str,
    pub terms: &'static [&'static str],
}

pub static CATEGORIES: [Category; 3] = [
    Category {
        id: CategoryId::Technology,
        label: "Technology (MASS & Autonomy)",
        terms: &[
            "Maritime Autonomous Surface Ship*",
            "Autonomous Ship*",
            "Autonomous vessel*",
            "Unmanned Ship*",
            "Remote Ship*",
            "smart ship*",
            "Autonomous shipping",
            "Remotely Operated Ship",
            "Autonomous merchant ship*",
            "Remote Operation Centre*",
            "Remote Operating Centre",
            "Remote control Centre*",
            "shore control centre",
            "Onshore operation centre",
        ],
    },
    Category {
        id: CategoryId::Human,
        label: "Human dimension",
        terms: &[
            "Human Element*",
            "Human Factor*",
            "Seafarer*",
            "E-farer",
            "non-seafarer*",
            "Crew",
            "Operator*",
            "remote operator*",
            "master*",
            "navigator*",
            "Trust in autonomy",
            "onboard personnel",
            "ship personnel",
            "human oversight",
            "human intervention",
            "mariner*",
            "Human-Machine Interaction",
            "Dynamic human-machine system",
            "Human-Machine teaming",
            "Human-Machine cooperation",
        ],
    },
    Category {
        id: CategoryId::Competency,
        label: "Competencies & Policy",
        terms: &[
            "Competenc*",
            "Skill*",
            "Conceptual Framework*",
            "Framework Develop*",
            "Qualification*",
            "Proficienc*",
            "barrier*",
            "challenge*",
            "obstacle*",
            "Training",
            "Education",
            "Responsibilities",
            "barriers",
            "challenges",
            "Workload",
            "Cognitive Load",
            "Situational Awareness",
            "Decision Making",
            "curriculum development",
            "training programs",
            "guidelines",
            "standards",
            "Regulatory",
            "IMO",
            "Policy",
            "STCW",
        ],
    },
];

/// Shipboard role offered next to the keyword lists.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Role {
    pub id: u32,
    pub name: &'static str,
}

pub static ROLES: [Role; 14] = [
    Role { id: 1, name: "Captain" },
    Role { id: 2, name: "Chief Officer" },
    Role { id: 3, name: "Second Officer (Navigator)" },
    Role { id: 4, name: "Third Officer" },
    Role { id: 5, name: "Deck Cadet" },
    Role { id: 6, name: "Chief Engineer" },
    Role { id: 7, name: "Second Engineer" },
    Role { id: 8, name: "Third Engineer" },
    Role { id: 9, name: "Fourth Engineer" },
    Role { id: 10, name: "Engine Cadet" },
    Role { id: 11, name: "Electro-Technical Officer" },
    Role { id: 12, name: "Chief Electrician" },
    Role { id: 13, name: "Radio Officer" },
    Role { id: 14, name: "Safety Officer" },
];

/// Look up a category by id.
pub fn category(id: CategoryId) -> &'static Category {
    match id {
        CategoryId::Technology => &CATEGORIES[0],
        CategoryId::Human => &CATEGORIES[1],
        CategoryId::Competency => &CATEGORIES[2],
    }
}

/// Terms the user ticked, per category, in the order they were ticked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    #[serde(default)]
    pub technology: Vec<String>,
    #[serde(default)]
    pub human: Vec<String>,
    #[serde(default)]
    pub competency: Vec<String>,
}

impl Selections {
    pub fn terms(&self, id: CategoryId) -> &[String] {
        match id {
            CategoryId::Technology => &self.technology,
            CategoryId::Human => &self.human,
            CategoryId::Competency => &self.competency,
        }
    }

    fn terms_mut(&mut self, id: CategoryId) -> &mut Vec<String> {
        match id {
            CategoryId::Technology => &mut self.technology,
            CategoryId::Human => &mut self.human,
            CategoryId::Competency => &mut self.competency,
        }
    }

    /// Tick a term. Ticking twice keeps the first position.
    pub fn select(&mut self, id: CategoryId, term: impl Into<String>) {
        let term = term.into();
        let terms = self.terms_mut(id);
        if !terms.contains(&term) {
            terms.push(term);
        }
    }

    /// Untick a term.
    pub fn deselect(&mut self, id: CategoryId, term: &str) {
        self.terms_mut(id).retain(|t| t != term);
    }

    pub fn is_empty(&self) -> bool {
        CategoryId::ORDER.iter().all(|id| self.terms(*id).is_empty())
    }
}

/// Build the boolean query string for a set of selections plus optional free text.
///
/// Returns an empty string when nothing is selected and `extra` is blank.
pub fn build_query(selections: &Selections, extra: Option<&str>) -> String {
    let mut parts: Vec<String> = CategoryId::ORDER
        .iter()
        .map(|id| selections.terms(*id))
        .filter(|terms| !terms.is_empty())
        .map(|terms| format!("({})", terms.join(" OR ")))
        .collect();

    if let Some(extra) = extra.map(str::trim).filter(|e| !e.is_empty()) {
        parts.push(format!("({})", extra));
    }

    parts.join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selection_builds_empty_query() {
        assert_eq!(build_query(&Selections::default(), None), "");
        assert_eq!(build_query(&Selections::default(), Some("   ")), "");
    }

    #[test]
    fn test_categories_emit_in_fixed_order() {
        let mut sel = Selections::default();
        // tick competency first; output order must not follow tick order
        sel.select(CategoryId::Competency, "Training");
        sel.select(CategoryId::Technology, "Autonomous Ship*");
        sel.select(CategoryId::Technology, "smart ship*");
        assert_eq!(
            build_query(&sel, None),
            "(Autonomous Ship* OR smart ship*) AND (Training)"
        );
    }

    #[test]
    fn test_extra_text_is_trimmed_and_appended_last() {
        let mut sel = Selections::default();
        sel.select(CategoryId::Human, "Crew");
        assert_eq!(build_query(&sel, Some("  remote pilotage ")), "(Crew) AND (remote pilotage)");
        assert_eq!(build_query(&Selections::default(), Some("transformers")), "(transformers)");
    }

    #[test]
    fn test_one_group_per_non_empty_category() {
        let mut sel = Selections::default();
        for cat in &CATEGORIES {
            sel.select(cat.id, cat.terms[0]);
            sel.select(cat.id, cat.terms[1]);
        }
        let query = build_query(&sel, None);
        let groups: Vec<&str> = query.split(" AND ").collect();
        assert_eq!(groups.len(), 3);
        for (group, cat) in groups.iter().zip(CATEGORIES.iter()) {
            assert_eq!(*group, format!("({} OR {})", cat.terms[0], cat.terms[1]));
        }
    }

    #[test]
    fn test_select_and_deselect() {
        let mut sel = Selections::default();
        sel.select(CategoryId::Human, "Crew");
        sel.select(CategoryId::Human, "master*");
        sel.select(CategoryId::Human, "Crew");
        assert_eq!(sel.terms(CategoryId::Human), ["Crew", "master*"]);
        sel.deselect(CategoryId::Human, "Crew");
        assert_eq!(sel.terms(CategoryId::Human), ["master*"]);
        sel.deselect(CategoryId::Human, "master*");
        assert!(sel.is_empty());
    }

    #[test]
    fn test_category_lookup_matches_table() {
        for id in CategoryId::ORDER {
            assert_eq!(category(id).id, id);
            assert_eq!(id.as_str().parse::<CategoryId>().expect("parse"), id);
        }
        assert!("weather".parse::<CategoryId>().is_err());
    }
}
