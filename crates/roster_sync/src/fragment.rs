//! Extraction of roster rows from the HTML fragments served by the member and
//! candidate endpoints.
//!
//! Member rows are `<li class="list-student">` items carrying a remove control
//! (`class="icon-removeUser" id="<enrollment id>"`) plus `studentName` and
//! `studentRole` elements. Candidate rows are `<li>` items containing an
//! `<input class="add-user" data-user_id=.. data-enrollment_role=..
//! data-enrollment_type=..>` checkbox.

use std::collections::HashMap;

use regex::Regex;
use shared::domain::{CandidateUser, EnrollmentId, SectionMember, UserId};
use tracing::warn;

use crate::error::Result;

const MEMBER_ROW_CLASS: &str = "list-student";
const REMOVE_CONTROL_CLASS: &str = "icon-removeUser";
const NAME_CLASS: &str = "studentName";
const ROLE_CLASS: &str = "studentRole";
const CANDIDATE_INPUT_CLASS: &str = "add-user";

struct Tag {
    name: String,
    attrs: HashMap<String, String>,
    end: usize,
}

impl Tag {
    fn has_class(&self, class: &str) -> bool {
        has_class(&self.attrs, class)
    }
}

fn has_class(attrs: &HashMap<String, String>, class: &str) -> bool {
    attrs
        .get("class")
        .map(|value| value.split_whitespace().any(|token| token == class))
        .unwrap_or(false)
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[derive(Debug)]
pub struct FragmentParser {
    item: Regex,
    tag: Regex,
    attr: Regex,
    markup: Regex,
}

impl FragmentParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            item: Regex::new(r"(?is)<li\b([^>]*)>(.*?)</li\s*>")?,
            tag: Regex::new(r"(?s)<([A-Za-z][A-Za-z0-9]*)\b([^>]*)>")?,
            attr: Regex::new(
                r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#,
            )?,
            markup: Regex::new(r"(?s)<[^>]*>")?,
        })
    }

    pub fn parse_members(&self, html: &str) -> Vec<SectionMember> {
        let mut members = Vec::new();
        for (item_attrs, body) in self.items(html) {
            if !has_class(&item_attrs, MEMBER_ROW_CLASS) {
                continue;
            }
            let tags = self.tags(body);

            let enrollment_id = tags
                .iter()
                .find(|tag| tag.has_class(REMOVE_CONTROL_CLASS))
                .and_then(|tag| tag.attrs.get("id"))
                .and_then(|raw| match raw.parse::<EnrollmentId>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        warn!(raw = %raw, "fragment: member remove control has a non-numeric id");
                        None
                    }
                });

            let display_name = self
                .class_text(body, &tags, NAME_CLASS)
                .or_else(|| item_attrs.get("data-name").map(|raw| self.clean(raw)))
                .unwrap_or_else(|| self.clean(body));
            let role = self
                .class_text(body, &tags, ROLE_CLASS)
                .or_else(|| item_attrs.get("data-role").map(|raw| self.clean(raw)))
                .unwrap_or_default();

            members.push(SectionMember {
                enrollment_id,
                display_name,
                role,
                enrollment_type: item_attrs.get("data-enrollment_type").cloned(),
            });
        }
        members
    }

    pub fn parse_candidates(&self, html: &str) -> Vec<CandidateUser> {
        let mut candidates = Vec::new();
        for (_, body) in self.items(html) {
            let tags = self.tags(body);
            let Some(input) = tags
                .iter()
                .find(|tag| tag.name == "input" && tag.has_class(CANDIDATE_INPUT_CLASS))
            else {
                continue;
            };

            let Some(user_id) = input
                .attrs
                .get("data-user_id")
                .and_then(|raw| raw.parse::<UserId>().ok())
            else {
                warn!(
                    raw = ?input.attrs.get("data-user_id"),
                    "fragment: skipping candidate row without a usable user id"
                );
                continue;
            };

            let display_name = input
                .attrs
                .get("data-name")
                .map(|raw| self.clean(raw))
                .or_else(|| self.class_text(body, &tags, NAME_CLASS))
                .unwrap_or_else(|| self.clean(body));

            candidates.push(CandidateUser {
                user_id,
                display_name,
                enrollment_role: input
                    .attrs
                    .get("data-enrollment_role")
                    .cloned()
                    .unwrap_or_default(),
                enrollment_type: input
                    .attrs
                    .get("data-enrollment_type")
                    .cloned()
                    .unwrap_or_default(),
            });
        }
        candidates
    }

    fn items<'h>(&self, html: &'h str) -> Vec<(HashMap<String, String>, &'h str)> {
        self.item
            .captures_iter(html)
            .filter_map(|caps| {
                let attrs = self.attributes(caps.get(1)?.as_str());
                Some((attrs, caps.get(2)?.as_str()))
            })
            .collect()
    }

    fn tags(&self, body: &str) -> Vec<Tag> {
        self.tag
            .captures_iter(body)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(Tag {
                    name: caps.get(1)?.as_str().to_ascii_lowercase(),
                    attrs: self.attributes(caps.get(2).map_or("", |m| m.as_str())),
                    end: whole.end(),
                })
            })
            .collect()
    }

    fn attributes(&self, raw: &str) -> HashMap<String, String> {
        self.attr
            .captures_iter(raw)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().to_ascii_lowercase();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map_or("", |m| m.as_str());
                Some((name, decode_entities(value)))
            })
            .collect()
    }

    /// Text content of the first element carrying `class`, up to its closing tag.
    fn class_text(&self, body: &str, tags: &[Tag], class: &str) -> Option<String> {
        let tag = tags.iter().find(|tag| tag.has_class(class))?;
        let rest = &body[tag.end..];
        let closing = format!("</{}", tag.name);
        let stop = rest
            .to_ascii_lowercase()
            .find(&closing)
            .unwrap_or(rest.len());
        let text = self.clean(&rest[..stop]);
        (!text.is_empty()).then_some(text)
    }

    fn clean(&self, raw: &str) -> String {
        let stripped = self.markup.replace_all(raw, " ");
        decode_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
