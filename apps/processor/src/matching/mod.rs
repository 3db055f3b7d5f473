//! Matching Engine — scores parsed candidate data against a job posting's
//! requirements.
//!
//! `calculate_match` is a pure function: no I/O, no randomness, and the
//! only clock read is the `analyzed_at` stamp. Re-running it on the same
//! inputs replaces the previous result wholesale with identical scores.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::models::job::{JobLevel, JobRequirements};
use crate::models::resume::{EducationEntry, ParsedCandidateData};

// Weights are compile-time constants so historical results stay
// comparable; a business change here is a code change, not a parameter.
const SKILLS_WEIGHT: f64 = 0.5;
const EXPERIENCE_WEIGHT: f64 = 0.3;
const EDUCATION_WEIGHT: f64 = 0.2;

const EXCELLENT_THRESHOLD: u32 = 85;
const HIGH_THRESHOLD: u32 = 70;
const MEDIUM_THRESHOLD: u32 = 50;

// ────────────────────────────────────────────────────────────────────────────
// Output data model
// ────────────────────────────────────────────────────────────────────────────

/// Coarse screening bucket derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchPriority {
    Low,
    Medium,
    High,
    Excellent,
}

/// Proficiency inferred from the candidate's own wording next to a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    None,
    Intermediate,
    Advanced,
    Expert,
}

impl Proficiency {
    fn points(&self) -> u32 {
        match self {
            Proficiency::None => 0,
            Proficiency::Intermediate => 60,
            Proficiency::Advanced => 80,
            Proficiency::Expert => 100,
        }
    }
}

/// Per-required-skill verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    pub skill: String,
    pub matched: bool,
    pub proficiency: Proficiency,
    pub score: u32,
}

/// Full match report, persisted as the résumé's `ai_analysis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub score: u32,
    pub priority: MatchPriority,
    pub skills_match: Vec<SkillMatch>,
    pub skills_score: u32,
    pub skills_match_percentage: u32,
    pub experience_score: u32,
    pub education_score: u32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendation: String,
    pub summary: String,
    pub analyzed_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Skill normalization and aliases
// ────────────────────────────────────────────────────────────────────────────

/// Uppercases, trims, strips punctuation except `+`/`#`, collapses
/// whitespace. "Node.js " and "NODE JS" normalize identically up to the
/// removed dot.
pub fn normalize_skill(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for c in raw.trim().chars() {
        let c = if c.is_whitespace() { ' ' } else { c };
        if c == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else if c.is_alphanumeric() || c == '+' || c == '#' {
            for upper in c.to_uppercase() {
                out.push(upper);
            }
            last_was_space = false;
        }
        // Other punctuation is dropped entirely (NODE.JS → NODEJS).
    }
    out.trim().to_string()
}

// Alias groups in normalized form; the first entry is canonical.
const ALIAS_GROUPS: &[&[&str]] = &[
    &["JAVASCRIPT", "JS", "ECMASCRIPT", "ES6", "ES2015"],
    &["TYPESCRIPT", "TS"],
    &["NODEJS", "NODE", "NODE JS"],
    &["REACT", "REACTJS", "REACT JS"],
    &["VUE", "VUEJS", "VUE JS"],
    &["ANGULAR", "ANGULARJS"],
    &["NEXTJS", "NEXT JS"],
    &["KUBERNETES", "K8S", "KUBE"],
    &["DOCKER", "CONTAINERIZATION"],
    &["POSTGRESQL", "POSTGRES", "PG"],
    &["MYSQL", "MARIADB"],
    &["MONGODB", "MONGO"],
    &["ELASTICSEARCH", "ELASTIC SEARCH"],
    &["AWS", "AMAZON WEB SERVICES"],
    &["GCP", "GOOGLE CLOUD", "GOOGLE CLOUD PLATFORM"],
    &["AZURE", "MICROSOFT AZURE"],
    &["C#", "CSHARP", "C SHARP"],
    &["C++", "CPP", "CPLUSPLUS"],
    &["GOLANG", "GO LANG"],
    &["PYTHON", "PYTHON3"],
    &["SPRING", "SPRING BOOT", "SPRINGBOOT"],
    &["EXPRESS", "EXPRESSJS", "EXPRESS JS"],
    &["DOTNET", "NET CORE", "ASPNET"],
    &["CICD", "CONTINUOUS INTEGRATION"],
];

static ALIAS_TO_CANONICAL: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for group in ALIAS_GROUPS {
        let canonical = group[0];
        for alias in group.iter() {
            map.insert(*alias, canonical);
        }
    }
    map
});

fn canonical_skill(normalized: &str) -> &str {
    ALIAS_TO_CANONICAL
        .get(normalized)
        .copied()
        .unwrap_or(normalized)
}

/// Whether a normalized candidate skill satisfies a normalized required
/// skill: identical, substring/superstring, or same alias group.
fn skill_satisfies(required: &str, candidate: &str) -> bool {
    if required.is_empty() || candidate.is_empty() {
        return false;
    }
    if required == candidate
        || required.contains(candidate)
        || candidate.contains(required)
    {
        return true;
    }
    canonical_skill(required) == canonical_skill(candidate)
}

fn infer_proficiency(raw_skill: &str) -> Proficiency {
    let lower = raw_skill.to_lowercase();
    const EXPERT: &[&str] = &["expert", "chuyên gia", "chuyên sâu"];
    const ADVANCED: &[&str] = &["advanced", "proficient", "thành thạo"];

    if EXPERT.iter().any(|kw| lower.contains(kw)) {
        Proficiency::Expert
    } else if ADVANCED.iter().any(|kw| lower.contains(kw)) {
        Proficiency::Advanced
    } else {
        Proficiency::Intermediate
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Component scores
// ────────────────────────────────────────────────────────────────────────────

struct SkillsOutcome {
    matches: Vec<SkillMatch>,
    score: u32,
    percentage: u32,
}

fn score_skills(required: &[String], candidate_skills: &[String]) -> SkillsOutcome {
    if required.is_empty() {
        return SkillsOutcome {
            matches: vec![],
            score: 0,
            percentage: 0,
        };
    }

    let normalized_candidates: Vec<(String, &String)> = candidate_skills
        .iter()
        .map(|raw| (normalize_skill(raw), raw))
        .collect();

    let mut matches = Vec::with_capacity(required.len());
    let mut total_points = 0u32;
    let mut matched_count = 0u32;

    for req in required {
        let req_norm = normalize_skill(req);
        let hit = normalized_candidates
            .iter()
            .find(|(cand_norm, _)| skill_satisfies(&req_norm, cand_norm));

        match hit {
            Some((_, raw)) => {
                let proficiency = infer_proficiency(raw);
                let points = proficiency.points();
                total_points += points;
                matched_count += 1;
                matches.push(SkillMatch {
                    skill: req.clone(),
                    matched: true,
                    proficiency,
                    score: points,
                });
            }
            None => matches.push(SkillMatch {
                skill: req.clone(),
                matched: false,
                proficiency: Proficiency::None,
                score: 0,
            }),
        }
    }

    let denominator = (required.len() as f64) * 100.0;
    let score = ((total_points as f64) / denominator * 100.0).round() as u32;
    let percentage =
        ((matched_count as f64) / (required.len() as f64) * 100.0).round() as u32;

    SkillsOutcome {
        matches,
        score,
        percentage,
    }
}

struct ExperienceBand {
    min: f64,
    ideal: f64,
    max: f64,
}

fn experience_band(level: JobLevel) -> Option<ExperienceBand> {
    let (min, ideal, max) = match level {
        JobLevel::Intern => (0.0, 0.5, 1.0),
        JobLevel::Junior => (1.0, 2.0, 4.0),
        JobLevel::MidLevel => (3.0, 5.0, 8.0),
        JobLevel::Senior => (5.0, 7.0, 12.0),
        JobLevel::Lead => (7.0, 10.0, 15.0),
        JobLevel::Manager => (8.0, 12.0, 20.0),
        JobLevel::Unknown => return None,
    };
    Some(ExperienceBand { min, ideal, max })
}

/// Band scoring: ramp to 50 below the minimum, interpolate 50→100 up to
/// the ideal, flat 100 to the maximum, then a small overqualification
/// penalty floored at 85. Unknown levels score a flat 50, a documented
/// fallback rather than a real assessment.
fn score_experience(years: f64, level: JobLevel) -> u32 {
    let Some(band) = experience_band(level) else {
        return 50;
    };
    let years = years.max(0.0);

    if years < band.min {
        ((years / band.min) * 50.0).round().min(50.0) as u32
    } else if years <= band.ideal {
        (50.0 + (years - band.min) / (band.ideal - band.min) * 50.0).round() as u32
    } else if years <= band.max {
        100
    } else {
        let penalty = ((years - band.max) * 2.0).min(15.0);
        (100.0 - penalty).round() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Degree {
    None,
    Bachelor,
    Master,
    Phd,
}

fn detect_degree(entry: &EducationEntry) -> Degree {
    let haystack = format!("{} {}", entry.degree, entry.major).to_lowercase();
    const PHD: &[&str] = &["phd", "ph.d", "doctorate", "doctor of", "tiến sĩ"];
    const MASTER: &[&str] = &["master", "msc", "m.s", "mba", "thạc sĩ"];
    const BACHELOR: &[&str] = &["bachelor", "bsc", "b.s", "beng", "cử nhân", "kỹ sư"];

    if PHD.iter().any(|kw| haystack.contains(kw)) {
        Degree::Phd
    } else if MASTER.iter().any(|kw| haystack.contains(kw)) {
        Degree::Master
    } else if BACHELOR.iter().any(|kw| haystack.contains(kw)) {
        Degree::Bachelor
    } else {
        Degree::None
    }
}

/// Fixed lookup keyed by (level, highest degree). An empty education list
/// is a neutral 50, distinct from "entries present but no recognizable
/// degree", which uses the no-degree column.
fn score_education(education: &[EducationEntry], level: JobLevel) -> u32 {
    if education.is_empty() {
        return 50;
    }
    let highest = education
        .iter()
        .map(detect_degree)
        .max()
        .unwrap_or(Degree::None);

    let row: [u32; 4] = match level {
        JobLevel::Intern => [70, 90, 100, 100],
        JobLevel::Junior => [60, 90, 100, 100],
        JobLevel::MidLevel => [50, 85, 95, 100],
        JobLevel::Senior => [40, 80, 90, 100],
        JobLevel::Lead | JobLevel::Manager => [40, 75, 90, 100],
        JobLevel::Unknown => [50, 75, 85, 95],
    };
    match highest {
        Degree::None => row[0],
        Degree::Bachelor => row[1],
        Degree::Master => row[2],
        Degree::Phd => row[3],
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Insights
// ────────────────────────────────────────────────────────────────────────────

fn priority_for(score: u32) -> MatchPriority {
    if score >= EXCELLENT_THRESHOLD {
        MatchPriority::Excellent
    } else if score >= HIGH_THRESHOLD {
        MatchPriority::High
    } else if score >= MEDIUM_THRESHOLD {
        MatchPriority::Medium
    } else {
        MatchPriority::Low
    }
}

fn build_strengths(
    skills: &SkillsOutcome,
    experience_score: u32,
    education_score: u32,
) -> Vec<String> {
    let mut strengths = Vec::new();

    let matched = skills.matches.iter().filter(|m| m.matched).count();
    if skills.score >= 80 {
        strengths.push(format!(
            "Strong skill alignment: {matched} of {} required skills covered",
            skills.matches.len()
        ));
    }
    let experts: Vec<&str> = skills
        .matches
        .iter()
        .filter(|m| m.proficiency == Proficiency::Expert)
        .map(|m| m.skill.as_str())
        .collect();
    if !experts.is_empty() {
        strengths.push(format!("Expert-level: {}", experts.join(", ")));
    }
    if experience_score >= 80 {
        strengths.push("Experience fits the role's seniority band".to_string());
    }
    if education_score >= 90 {
        strengths.push("Education exceeds the role's expectations".to_string());
    }
    strengths
}

fn build_weaknesses(
    skills: &SkillsOutcome,
    experience_score: u32,
    years: Option<f64>,
    education: &[EducationEntry],
) -> Vec<String> {
    let mut weaknesses = Vec::new();

    let missing: Vec<&str> = skills
        .matches
        .iter()
        .filter(|m| !m.matched)
        .take(5)
        .map(|m| m.skill.as_str())
        .collect();
    if !missing.is_empty() {
        weaknesses.push(format!("Missing required skills: {}", missing.join(", ")));
    }
    if years.is_none() {
        weaknesses.push("Years of experience could not be determined from the résumé".to_string());
    } else if experience_score < 50 {
        weaknesses.push("Experience is below the role's minimum band".to_string());
    }
    if education.is_empty() {
        weaknesses.push("No education history listed".to_string());
    }
    weaknesses
}

fn build_recommendation(priority: MatchPriority) -> String {
    match priority {
        MatchPriority::Excellent => {
            "Excellent match. Fast-track this candidate to an interview.".to_string()
        }
        MatchPriority::High => {
            "Strong match. Schedule a screening interview.".to_string()
        }
        MatchPriority::Medium => {
            "Partial match. Review the gaps before proceeding.".to_string()
        }
        MatchPriority::Low => {
            "Weak match. Consider only if the pipeline is thin.".to_string()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

pub fn calculate_match(
    candidate: &ParsedCandidateData,
    requirements: &JobRequirements,
) -> MatchResult {
    let skills = score_skills(&requirements.required_skills, &candidate.skills);

    // Missing years score as zero and surface as a weakness rather than
    // silently passing.
    let years = candidate.years_of_experience;
    let experience_score = score_experience(years.unwrap_or(0.0), requirements.level);
    let education_score = score_education(&candidate.education, requirements.level);

    let weighted = (skills.score as f64) * SKILLS_WEIGHT
        + (experience_score as f64) * EXPERIENCE_WEIGHT
        + (education_score as f64) * EDUCATION_WEIGHT;
    let score = weighted.clamp(0.0, 100.0).round() as u32;
    let priority = priority_for(score);

    let matched = skills.matches.iter().filter(|m| m.matched).count();
    let summary = format!(
        "Matched {matched}/{} required skills ({}%); overall score {score}/100 ({priority:?})",
        skills.matches.len(),
        skills.percentage
    );

    MatchResult {
        score,
        priority,
        strengths: build_strengths(&skills, experience_score, education_score),
        weaknesses: build_weaknesses(&skills, experience_score, years, &candidate.education),
        recommendation: build_recommendation(priority),
        summary,
        skills_score: skills.score,
        skills_match_percentage: skills.percentage,
        experience_score,
        education_score,
        skills_match: skills.matches,
        analyzed_at: Utc::now(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(skills: &[&str], years: Option<f64>) -> ParsedCandidateData {
        ParsedCandidateData {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience: vec![],
            education: vec![],
            summary: None,
            years_of_experience: years,
        }
    }

    fn requirements(skills: &[&str], level: JobLevel) -> JobRequirements {
        JobRequirements {
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            level,
        }
    }

    fn education(degree: &str) -> EducationEntry {
        EducationEntry {
            school: "HUST".to_string(),
            degree: degree.to_string(),
            major: "Computer Science".to_string(),
            duration_text: "2015 - 2019".to_string(),
            gpa: None,
        }
    }

    #[test]
    fn test_normalize_uppercases_and_strips_punctuation() {
        assert_eq!(normalize_skill("  node.js "), "NODEJS");
        assert_eq!(normalize_skill("C++"), "C++");
        assert_eq!(normalize_skill("c#"), "C#");
        assert_eq!(normalize_skill("spring   boot"), "SPRING BOOT");
    }

    #[test]
    fn test_alias_table_matches_node_and_mongo() {
        // Spec scenario: ["NodeJS","MongoDB"] vs ["Node", "nodejs", "mongo"].
        let result = calculate_match(
            &candidate(&["Node", "nodejs", "mongo"], Some(3.0)),
            &requirements(&["NodeJS", "MongoDB"], JobLevel::MidLevel),
        );
        assert_eq!(result.skills_match_percentage, 100);
        assert!(result.skills_match.iter().all(|m| m.matched));
        assert!(result
            .skills_match
            .iter()
            .all(|m| m.proficiency == Proficiency::Intermediate));
        assert_eq!(result.skills_score, 60);
    }

    #[test]
    fn test_kubernetes_k8s_alias() {
        let out = score_skills(
            &["Kubernetes".to_string()],
            &["k8s".to_string()],
        );
        assert!(out.matches[0].matched);
    }

    #[test]
    fn test_substring_match_both_directions() {
        let out = score_skills(
            &["PostgreSQL".to_string(), "React Native".to_string()],
            &["postgre".to_string(), "react".to_string()],
        );
        assert!(out.matches.iter().all(|m| m.matched));
    }

    #[test]
    fn test_proficiency_keywords_raise_points() {
        let out = score_skills(
            &["Kubernetes".to_string(), "Rust".to_string(), "Go".to_string()],
            &[
                "expert in Kubernetes".to_string(),
                "advanced Rust".to_string(),
                "Go".to_string(),
            ],
        );
        assert_eq!(out.matches[0].proficiency, Proficiency::Expert);
        assert_eq!(out.matches[1].proficiency, Proficiency::Advanced);
        assert_eq!(out.matches[2].proficiency, Proficiency::Intermediate);
        // (100 + 80 + 60) / 300 * 100 = 80
        assert_eq!(out.score, 80);
    }

    #[test]
    fn test_no_required_skills_scores_zero() {
        let out = score_skills(&[], &["Rust".to_string()]);
        assert_eq!(out.score, 0);
        assert_eq!(out.percentage, 0);
        assert!(out.matches.is_empty());
    }

    #[test]
    fn test_adding_matching_skill_never_lowers_percentage() {
        let cand: Vec<String> = vec!["Rust".to_string(), "Go".to_string()];
        let base = score_skills(&["Rust".to_string()], &cand);
        let more = score_skills(&["Rust".to_string(), "Go".to_string()], &cand);
        assert!(more.percentage >= base.percentage);
    }

    #[test]
    fn test_experience_senior_band_scenario() {
        // Spec scenario: SENIOR {5,7,12}, 6 years → 75.
        assert_eq!(score_experience(6.0, JobLevel::Senior), 75);
    }

    #[test]
    fn test_experience_below_minimum_ramps_to_fifty() {
        // 2.5 of 5 minimum years → 25.
        assert_eq!(score_experience(2.5, JobLevel::Senior), 25);
        assert_eq!(score_experience(5.0, JobLevel::Senior), 50);
    }

    #[test]
    fn test_experience_plateau_and_overqualification_penalty() {
        assert_eq!(score_experience(7.0, JobLevel::Senior), 100);
        assert_eq!(score_experience(12.0, JobLevel::Senior), 100);
        // 2 years over max → 4 point penalty.
        assert_eq!(score_experience(14.0, JobLevel::Senior), 96);
        // Penalty floors at 85 no matter how far over.
        assert_eq!(score_experience(40.0, JobLevel::Senior), 85);
    }

    #[test]
    fn test_experience_unknown_level_is_flat_fifty() {
        assert_eq!(score_experience(0.0, JobLevel::Unknown), 50);
        assert_eq!(score_experience(25.0, JobLevel::Unknown), 50);
    }

    #[test]
    fn test_education_empty_is_neutral_fifty() {
        assert_eq!(score_education(&[], JobLevel::Senior), 50);
    }

    #[test]
    fn test_education_degree_ladder() {
        let bachelor = score_education(&[education("Bachelor of Science")], JobLevel::Senior);
        let master = score_education(&[education("Master of Science")], JobLevel::Senior);
        let phd = score_education(&[education("PhD")], JobLevel::Senior);
        assert!(bachelor < master && master < phd);
        assert_eq!(phd, 100);
    }

    #[test]
    fn test_education_vietnamese_tokens() {
        assert_eq!(
            score_education(&[education("Kỹ sư phần mềm")], JobLevel::Senior),
            score_education(&[education("Bachelor of Engineering")], JobLevel::Senior),
        );
        assert_eq!(
            score_education(&[education("Thạc sĩ")], JobLevel::Senior),
            score_education(&[education("Master")], JobLevel::Senior),
        );
    }

    #[test]
    fn test_education_highest_degree_wins() {
        let entries = vec![education("Bachelor"), education("Tiến sĩ")];
        assert_eq!(score_education(&entries, JobLevel::Senior), 100);
    }

    #[test]
    fn test_total_score_weight_conservation() {
        // All skills matched at intermediate (60), 6 years senior (75),
        // bachelor for senior (80): 60*0.5 + 75*0.3 + 80*0.2 = 68.5 → 69.
        let mut cand = candidate(&["Rust", "PostgreSQL"], Some(6.0));
        cand.education = vec![education("Bachelor of Science")];
        let result = calculate_match(
            &cand,
            &requirements(&["Rust", "PostgreSQL"], JobLevel::Senior),
        );
        assert_eq!(result.skills_score, 60);
        assert_eq!(result.experience_score, 75);
        assert_eq!(result.education_score, 80);
        assert_eq!(result.score, 69);
        assert_eq!(result.priority, MatchPriority::Medium);
    }

    #[test]
    fn test_score_bounds_over_adversarial_inputs() {
        let cases = [
            (candidate(&[], None), requirements(&[], JobLevel::Unknown)),
            (
                candidate(&["expert everything"], Some(1000.0)),
                requirements(&["everything"], JobLevel::Intern),
            ),
            (
                candidate(&[], Some(-3.0)),
                requirements(&["Rust"], JobLevel::Senior),
            ),
        ];
        for (cand, req) in &cases {
            let result = calculate_match(cand, req);
            assert!(result.score <= 100);
            assert!(result.skills_match_percentage <= 100);
            assert!(result.experience_score <= 100);
            assert!(result.education_score <= 100);
        }
    }

    #[test]
    fn test_priority_thresholds_resolve_ties_upward() {
        assert_eq!(priority_for(85), MatchPriority::Excellent);
        assert_eq!(priority_for(84), MatchPriority::High);
        assert_eq!(priority_for(70), MatchPriority::High);
        assert_eq!(priority_for(69), MatchPriority::Medium);
        assert_eq!(priority_for(50), MatchPriority::Medium);
        assert_eq!(priority_for(49), MatchPriority::Low);
    }

    #[test]
    fn test_missing_years_is_a_weakness_not_a_crash() {
        let result = calculate_match(
            &candidate(&["Rust"], None),
            &requirements(&["Rust"], JobLevel::Senior),
        );
        assert_eq!(result.experience_score, 0);
        assert!(result
            .weaknesses
            .iter()
            .any(|w| w.contains("could not be determined")));
    }

    #[test]
    fn test_unmatched_skills_listed_in_weaknesses() {
        let result = calculate_match(
            &candidate(&["Rust"], Some(6.0)),
            &requirements(&["Rust", "Kafka", "Terraform"], JobLevel::Senior),
        );
        let missing = result
            .weaknesses
            .iter()
            .find(|w| w.starts_with("Missing required skills"))
            .expect("missing-skills weakness");
        assert!(missing.contains("Kafka"));
        assert!(missing.contains("Terraform"));
    }

    #[test]
    fn test_recommendation_follows_priority() {
        assert!(build_recommendation(MatchPriority::Excellent).contains("Fast-track"));
        assert!(build_recommendation(MatchPriority::Low).contains("Weak match"));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = calculate_match(
            &candidate(&["Rust"], Some(6.0)),
            &requirements(&["Rust"], JobLevel::Senior),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("skillsMatchPercentage").is_some());
        assert!(json.get("analyzedAt").is_some());
        assert_eq!(json["skillsMatch"][0]["proficiency"], "intermediate");
    }
}
