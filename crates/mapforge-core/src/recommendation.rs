//! Similar-project ranking.
//!
//! Candidates come from the database pre-filtered (published, not the
//! target itself, visibility applied); scoring is pure so it can be
//! exercised without a database.

use crate::project::Project;

/// Affinity score between two projects. Campaign is the strongest
/// signal, then organisation and country, then shared mapping types and
/// matching difficulty.
pub fn similarity_score(target: &Project, candidate: &Project) -> u32 {
    let mut score = 0;
    if target.campaign.is_some() && target.campaign == candidate.campaign {
        score += 3;
    }
    if target.organisation_id.is_some() && target.organisation_id == candidate.organisation_id {
        score += 2;
    }
    if target.country.is_some() && target.country == candidate.country {
        score += 2;
    }
    score += target
        .mapping_types
        .iter()
        .filter(|t| candidate.mapping_types.contains(t))
        .count() as u32;
    if target.difficulty == candidate.difficulty {
        score += 1;
    }
    score
}

/// Rank candidates by descending similarity, ties broken by freshest
/// activity, and keep the top `limit`.
pub fn rank_similar(target: &Project, mut candidates: Vec<Project>, limit: usize) -> Vec<Project> {
    candidates.sort_by(|a, b| {
        similarity_score(target, b)
            .cmp(&similarity_score(target, a))
            .then(b.last_updated.cmp(&a.last_updated))
    });
    candidates.truncate(limit);
    candidates
}
