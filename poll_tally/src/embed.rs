//! Polls embedded in news articles, and the editing of published polls.

use log::{debug, warn};

use crate::config::*;
use crate::records::{PollGroup, RecordKind, RecordType};
use crate::store::{ContentStore, StoreError};

pub const EMBED_PREFIX: &str = "BOP POLL ";

/// A reference to one poll of a poll group: `BOP POLL Spring 2024 #3`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PollEmbed {
    /// The slug of the poll group (`spring-2024`).
    pub slug: String,
    /// Position of the poll in the group, starting from 0.
    pub index: usize,
    /// The caption shown above the chart (`Spring 2024 #3`).
    pub tag: String,
}

impl PollEmbed {
    pub fn caption(&self) -> String {
        format!("BOP POLL {}", self.tag.to_uppercase())
    }
}

/// Parses an embed line. The last word is the 1-based poll number, prefixed with `#`.
pub fn parse_embed(line: &str) -> Option<PollEmbed> {
    if !line.starts_with(EMBED_PREFIX) {
        return None;
    }
    let parts: Vec<&str> = line.split(' ').collect();
    // BOP, POLL, at least one word of title, the number.
    if parts.len() < 4 {
        warn!("parse_embed: incomplete poll reference {:?}", line);
        return None;
    }
    let number_s = parts[parts.len() - 1];
    let number: usize = match number_s.strip_prefix('#').and_then(|s| s.parse().ok()) {
        Some(n) if n >= 1 => n,
        _ => {
            warn!("parse_embed: invalid poll number {:?} in {:?}", number_s, line);
            return None;
        }
    };
    let slug = parts[2..parts.len() - 1].join("-").to_lowercase();
    Some(PollEmbed {
        slug,
        index: number - 1,
        tag: parts[2..].join(" "),
    })
}

pub fn resolve_embed<'a>(embed: &PollEmbed, group: &'a PollGroup) -> Option<&'a PollDefinition> {
    let res = group.data.get(embed.index);
    if res.is_none() {
        warn!(
            "resolve_embed: group {:?} has {} polls, no poll #{}",
            embed.slug,
            group.data.len(),
            embed.index + 1
        );
    }
    res
}

/// Loads the poll group named by the embed and picks the poll.
pub fn load_embed<S: ContentStore + ?Sized>(
    store: &S,
    embed: &PollEmbed,
) -> Result<PollDefinition, StoreError> {
    let obj = store.find_by_slug(RecordKind::PollGroup, &embed.slug)?;
    let group = PollGroup::from_stored(&obj)?;
    resolve_embed(embed, &group.record)
        .cloned()
        .ok_or_else(|| StoreError::NotFound(embed.caption()))
}

/// A line of the body of an article.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ArticleLine {
    Text(String),
    Poll(PollEmbed),
}

/// Splits the body of an article into lines. Pilcrows left by the text editor are removed.
pub fn article_lines(content: &str) -> Vec<ArticleLine> {
    content
        .split('\n')
        .map(|line| match parse_embed(line) {
            Some(embed) => ArticleLine::Poll(embed),
            None => ArticleLine::Text(line.replace("Â¶", "")),
        })
        .collect()
}

// ********* Editing **********

impl PollDefinition {
    /// A new poll, as added from the editor.
    pub fn placeholder() -> PollDefinition {
        PollDefinition {
            question: "New Poll".to_string(),
            results: vec![PollResult {
                option: "Option 1".to_string(),
                value: 0,
            }],
            chart: ChartKind::default(),
        }
    }

    /// Adds an option with no votes at the end.
    pub fn add_option(&mut self) {
        let option = format!("Option {}", self.results.len() + 1);
        self.results.push(PollResult { option, value: 0 });
    }

    pub fn remove_option(&mut self, index: usize) -> Option<PollResult> {
        if index < self.results.len() {
            Some(self.results.remove(index))
        } else {
            None
        }
    }

    /// Moves an option to another position. Out of range positions leave the poll unchanged.
    pub fn move_option(&mut self, from: usize, to: usize) -> bool {
        if from >= self.results.len() || to >= self.results.len() {
            debug!("move_option: {} -> {} out of range", from, to);
            return false;
        }
        let moved = self.results.remove(from);
        self.results.insert(to, moved);
        true
    }

    pub fn rename_option(&mut self, index: usize, option: &str) -> bool {
        match self.results.get_mut(index) {
            Some(r) => {
                r.option = option.to_string();
                true
            }
            None => false,
        }
    }

    /// Sets the count from the text of the editor. Anything that is not a count becomes 0.
    pub fn set_value(&mut self, index: usize, value: &str) -> bool {
        match self.results.get_mut(index) {
            Some(r) => {
                r.value = leading_count(value);
                true
            }
            None => false,
        }
    }
}

// "12 votes" -> 12, like parseInt.
fn leading_count(s: &str) -> u64 {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

impl PollGroup {
    pub fn add_poll(&mut self) {
        self.data.push(PollDefinition::placeholder());
    }

    pub fn remove_poll(&mut self, index: usize) -> Option<PollDefinition> {
        if index < self.data.len() {
            Some(self.data.remove(index))
        } else {
            None
        }
    }
}
