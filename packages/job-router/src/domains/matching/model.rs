//! Pure scoring function for routing a job to a candidate company (C4).
//!
//! No I/O: callers fetch companies and build `JobRequirements` themselves, then
//! ask `find_matching_companies` to rank them. Keeping this free of repositories
//! is what makes the hard-miss and monotonicity properties trivially testable.

use std::collections::HashMap;

use crate::common::CompanyId;
use crate::domains::companies::{Company, SkillLevel};

const HARD_MISS_PENALTY: f64 = 2.0;
const PRIMARY_SKILL_BONUS: f64 = 1.5;
const ACTIVE_BONUS: f64 = 0.5;
const PROVIDER_SET_BONUS: f64 = 0.3;

/// What a job needs, independent of any particular candidate company.
#[derive(Debug, Clone)]
pub struct JobRequirements {
    pub required_skills: Vec<String>,
    pub skill_levels: HashMap<String, SkillLevel>,
    pub category: Option<String>,
}

/// A candidate company paired with the score it earned against one job's requirements.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyMatch {
    pub company_id: CompanyId,
    pub score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// `company_value + 0.5*(company_value - required_value)` at or above requirement,
/// `0.5*company_value` below it.
fn skill_level_score(required: SkillLevel, company: SkillLevel) -> f64 {
    let required_value = required.value();
    let company_value = company.value();
    if company_value >= required_value {
        company_value + 0.5 * (company_value - required_value)
    } else {
        0.5 * company_value
    }
}

fn score_one(requirements: &JobRequirements, company: &Company) -> CompanyMatch {
    let mut score = 0.0;
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for (skill, required_level) in &requirements.skill_levels {
        match company.skill_level(skill) {
            Some(company_level) => {
                score += skill_level_score(*required_level, company_level);
                matched.push(skill.clone());
            }
            None => {
                missing.push(skill.clone());
                if requirements.required_skills.contains(skill) {
                    score -= HARD_MISS_PENALTY;
                }
            }
        }
    }

    for primary in company.primary_skill_names() {
        if requirements.required_skills.iter().any(|s| s == primary) {
            score += PRIMARY_SKILL_BONUS;
        }
    }

    if company.is_active {
        score += ACTIVE_BONUS;
    }
    // `provider_type` is a required (non-Option) field on Company in this implementation,
    // so "set and non-null" is always true once a company row exists.
    score += PROVIDER_SET_BONUS;

    CompanyMatch {
        company_id: company.id,
        score: score.max(0.0),
        matched_skills: matched,
        missing_skills: missing,
    }
}

/// Score every candidate and return the top `max_results`, descending by score,
/// ties broken by input order (a stable sort preserves this). A candidate whose
/// score nets to zero or below (e.g. a hard-missed required skill outweighing
/// every bonus) is not a match at all and is excluded, not just ranked last.
pub fn find_matching_companies(
    requirements: &JobRequirements,
    candidates: &[Company],
    max_results: usize,
) -> Vec<CompanyMatch> {
    let mut matches: Vec<CompanyMatch> = candidates
        .iter()
        .map(|c| score_one(requirements, c))
        .filter(|m| m.score > 0.0)
        .collect();
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(max_results);
    matches
}

/// Single best match, excluding `requesting_company_id` from consideration.
pub fn find_matching_company(
    requirements: &JobRequirements,
    candidates: &[Company],
    requesting_company_id: CompanyId,
) -> Option<CompanyMatch> {
    let filtered: Vec<Company> = candidates
        .iter()
        .filter(|c| c.id != requesting_company_id)
        .cloned()
        .collect();
    find_matching_companies(requirements, &filtered, 1).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::companies::{CompanySkill, ProviderType};

    fn company(skills: Vec<(&str, SkillLevel, bool)>) -> Company {
        Company::builder()
            .name("Test Co".to_string())
            .provider_type(ProviderType::Mock)
            .skills(
                skills
                    .into_iter()
                    .map(|(name, level, is_primary)| CompanySkill {
                        company_id: CompanyId::new(),
                        skill_name: name.to_string(),
                        level,
                        is_primary,
                    })
                    .collect(),
            )
            .build()
    }

    fn requirements(skills: Vec<(&str, SkillLevel)>) -> JobRequirements {
        let required_skills = skills.iter().map(|(s, _)| s.to_string()).collect();
        let skill_levels = skills
            .into_iter()
            .map(|(s, l)| (s.to_string(), l))
            .collect();
        JobRequirements {
            required_skills,
            skill_levels,
            category: None,
        }
    }

    #[test]
    fn exact_skill_match_scores_company_value() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Intermediate)]);
        let co = company(vec![("plumbing", SkillLevel::Intermediate, false)]);
        let m = &find_matching_companies(&reqs, &[co], 10)[0];
        // 2.0 (exact) + 0.5 (active) + 0.3 (provider set) = 2.8
        assert!((m.score - 2.8).abs() < 1e-9);
        assert_eq!(m.matched_skills, vec!["plumbing".to_string()]);
    }

    #[test]
    fn exceeding_required_level_scores_higher_than_exact() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Basic)]);
        let basic = company(vec![("plumbing", SkillLevel::Basic, false)]);
        let expert = company(vec![("plumbing", SkillLevel::Expert, false)]);
        let basic_score = find_matching_companies(&reqs, &[basic], 10)[0].score;
        let expert_score = find_matching_companies(&reqs, &[expert], 10)[0].score;
        assert!(expert_score > basic_score);
    }

    #[test]
    fn below_required_level_scores_half_company_value() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Expert)]);
        let co = company(vec![("plumbing", SkillLevel::Basic, false)]);
        let m = &find_matching_companies(&reqs, &[co], 10)[0];
        // 0.5*1.0 + 0.5 + 0.3 = 1.3
        assert!((m.score - 1.3).abs() < 1e-9);
    }

    #[test]
    fn missing_required_skill_applies_hard_miss_penalty() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Basic)]);
        let co = company(vec![]);
        // -2.0 + 0.5 + 0.3 = -1.2, clamped to 0 — a zero-score company is not a match.
        assert!(find_matching_companies(&reqs, &[co], 10).is_empty());
    }

    #[test]
    fn primary_skill_bonus_applies_once_per_required_primary_skill() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Basic)]);
        let co = company(vec![("plumbing", SkillLevel::Basic, true)]);
        let m = &find_matching_companies(&reqs, &[co], 10)[0];
        // 1.0 (exact) + 1.5 (primary) + 0.5 + 0.3 = 3.3
        assert!((m.score - 3.3).abs() < 1e-9);
    }

    #[test]
    fn inactive_company_forfeits_active_bonus() {
        let reqs = requirements(vec![]);
        let mut co = company(vec![]);
        co.is_active = false;
        let m = &find_matching_companies(&reqs, &[co], 10)[0];
        // 0.3 only
        assert!((m.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn results_sorted_descending_by_score() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Expert)]);
        let weak = company(vec![("plumbing", SkillLevel::Basic, false)]);
        let strong = company(vec![("plumbing", SkillLevel::Expert, false)]);
        let results = find_matching_companies(&reqs, &[weak, strong], 10);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn max_results_truncates() {
        let reqs = requirements(vec![]);
        let companies: Vec<Company> = (0..5).map(|_| company(vec![])).collect();
        assert_eq!(find_matching_companies(&reqs, &companies, 2).len(), 2);
    }

    #[test]
    fn find_matching_company_excludes_requesting_company() {
        let reqs = requirements(vec![]);
        let requester = company(vec![]);
        let other = company(vec![]);
        let requester_id = requester.id;
        let best = find_matching_company(&reqs, &[requester, other.clone()], requester_id);
        assert_eq!(best.unwrap().company_id, other.id);
    }

    #[test]
    fn raising_skill_level_never_decreases_score() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Basic)]);
        let basic = company(vec![("plumbing", SkillLevel::Basic, false)]);
        let intermediate = company(vec![("plumbing", SkillLevel::Intermediate, false)]);
        let expert = company(vec![("plumbing", SkillLevel::Expert, false)]);
        let s_basic = find_matching_companies(&reqs, &[basic], 10)[0].score;
        let s_mid = find_matching_companies(&reqs, &[intermediate], 10)[0].score;
        let s_expert = find_matching_companies(&reqs, &[expert], 10)[0].score;
        assert!(s_mid >= s_basic);
        assert!(s_expert >= s_mid);
    }

    #[test]
    fn company_acquiring_a_previously_missing_skill_never_decreases_score() {
        let reqs = requirements(vec![("plumbing", SkillLevel::Basic)]);
        let without = company(vec![]);
        let with = company(vec![("plumbing", SkillLevel::Basic, false)]);
        let s_without = find_matching_companies(&reqs, &[without], 10)[0].score;
        let s_with = find_matching_companies(&reqs, &[with], 10)[0].score;
        assert!(s_with >= s_without);
    }
}
