//! Import merge: folds an externally parsed resume into a profile draft without losing
//! anything the user already entered.
//!
//! - List sections append incoming entries whose natural key is not already present.
//! - Set sections (skill categories, languages, interests) take the union.
//! - Scalars and contact fields are filled only where the draft is empty.
//!
//! The merge is pure and idempotent: merging the same payload twice changes nothing.

use crate::models::profile::{
    Address, Certification, Contact, Education, Profile, Project, TechnicalSkills,
    WorkExperience,
};

/// Human-meaningful identity of a list entry, used instead of a surrogate id.
/// Single-field keys leave the second slot empty.
pub trait NaturalKey {
    fn natural_key(&self) -> (Option<&str>, Option<&str>);
}

impl NaturalKey for Education {
    fn natural_key(&self) -> (Option<&str>, Option<&str>) {
        (self.degree.as_deref(), self.university.as_deref())
    }
}

impl NaturalKey for WorkExperience {
    fn natural_key(&self) -> (Option<&str>, Option<&str>) {
        (self.job_title.as_deref(), self.company_name.as_deref())
    }
}

impl NaturalKey for Project {
    fn natural_key(&self) -> (Option<&str>, Option<&str>) {
        (self.project_title.as_deref(), None)
    }
}

impl NaturalKey for Certification {
    fn natural_key(&self) -> (Option<&str>, Option<&str>) {
        (
            self.course_name.as_deref(),
            self.issuing_organization.as_deref(),
        )
    }
}

/// Merges `incoming` into a copy of `draft`.
pub fn merge_profile(draft: &Profile, incoming: &Profile) -> Profile {
    let mut merged = draft.clone();

    merged.education = merge_entries(&draft.education, &incoming.education);
    merged.work_experience = merge_entries(&draft.work_experience, &incoming.work_experience);
    merged.projects = merge_entries(&draft.projects, &incoming.projects);
    merged.certifications_courses =
        merge_entries(&draft.certifications_courses, &incoming.certifications_courses);

    if let Some(skills) = &incoming.technical_skills {
        merged.technical_skills = Some(merge_technical_skills(
            draft.technical_skills.as_ref(),
            skills,
        ));
    }
    merged.languages_known = merge_set(&draft.languages_known, &incoming.languages_known);
    merged.interests = merge_set(&draft.interests, &incoming.interests);

    fill_if_empty(&mut merged.name, &incoming.name);
    fill_if_empty(&mut merged.gender, &incoming.gender);
    fill_if_empty(&mut merged.dob, &incoming.dob);
    fill_if_empty(&mut merged.career_objective, &incoming.career_objective);

    if let Some(contact) = &incoming.contact {
        merged.contact = Some(merge_contact(draft.contact.as_ref(), contact));
    }

    merged
}

/// Existing entries first, in order; then incoming entries whose key is new.
/// Keys are compared against the draft only.
fn merge_entries<T>(existing: &Option<Vec<T>>, incoming: &Option<Vec<T>>) -> Option<Vec<T>>
where
    T: NaturalKey + Clone,
{
    let incoming = match incoming {
        Some(items) if !items.is_empty() => items,
        _ => return existing.clone(),
    };
    let current = existing.as_deref().unwrap_or_default();

    let mut merged = current.to_vec();
    merged.extend(
        incoming
            .iter()
            .filter(|candidate| {
                !current
                    .iter()
                    .any(|entry| entry.natural_key() == candidate.natural_key())
            })
            .cloned(),
    );
    Some(merged)
}

fn merge_set(existing: &Option<Vec<String>>, incoming: &Option<Vec<String>>) -> Option<Vec<String>> {
    match incoming {
        Some(items) if !items.is_empty() => Some(union(existing.as_deref(), items)),
        _ => existing.clone(),
    }
}

fn union(existing: Option<&[String]>, incoming: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in existing.unwrap_or_default().iter().chain(incoming) {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

fn merge_technical_skills(
    existing: Option<&TechnicalSkills>,
    incoming: &TechnicalSkills,
) -> TechnicalSkills {
    let base = existing.cloned().unwrap_or_default();
    let category = |current: &Option<Vec<String>>, new: &Option<Vec<String>>| {
        let merged = union(current.as_deref(), new.as_deref().unwrap_or_default());
        if merged.is_empty() {
            current.clone()
        } else {
            Some(merged)
        }
    };

    TechnicalSkills {
        programming_languages: category(
            &base.programming_languages,
            &incoming.programming_languages,
        ),
        frameworks_libraries: category(&base.frameworks_libraries, &incoming.frameworks_libraries),
        tools_softwares: category(&base.tools_softwares, &incoming.tools_softwares),
        cloud_platforms: category(&base.cloud_platforms, &incoming.cloud_platforms),
        databases: category(&base.databases, &incoming.databases),
        extra: base.extra,
    }
}

fn merge_contact(existing: Option<&Contact>, incoming: &Contact) -> Contact {
    let mut contact = existing.cloned().unwrap_or_default();

    fill_if_empty(&mut contact.email, &incoming.email);
    fill_if_empty(&mut contact.phone, &incoming.phone);
    fill_if_empty(&mut contact.linkedin, &incoming.linkedin);
    fill_if_empty(&mut contact.github, &incoming.github);
    fill_if_empty(&mut contact.portfolio, &incoming.portfolio);

    if let Some(incoming_address) = &incoming.address {
        let mut address: Address = contact.address.take().unwrap_or_default();
        fill_if_empty(&mut address.city, &incoming_address.city);
        fill_if_empty(&mut address.state, &incoming_address.state);
        fill_if_empty(&mut address.country, &incoming_address.country);
        contact.address = Some(address);
    }

    contact
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn fill_if_empty(target: &mut Option<String>, incoming: &Option<String>) {
    if is_blank(target) && !is_blank(incoming) {
        *target = incoming.clone();
    }
}
