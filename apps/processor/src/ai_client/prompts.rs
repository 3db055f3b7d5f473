//! Prompts for the candidate-data extraction call.

pub const EXTRACT_SYSTEM: &str = "\
You are a résumé parsing engine for a recruitment platform. You read the \
plain text of a candidate's résumé (English or Vietnamese) and return only \
a single JSON object, no prose and no markdown. Dates, GPA values, and \
durations are copied as written; you never invent data that is not in the \
text.";

pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract structured candidate data from the résumé text below.

Return a JSON object with exactly these keys:
- "skills": array of strings. Every technology, tool, language, or framework the candidate lists. Keep proficiency words that appear next to a skill (e.g. "expert in Kubernetes").
- "experience": array of objects {"company", "position", "durationText", "description"}, in the order they appear.
- "education": array of objects {"school", "degree", "major", "durationText", "gpa"}. "gpa" is a number or null.
- "summary": one or two sentences describing the candidate, or null.
- "yearsOfExperience": total professional years as a number, or null if it cannot be determined.

Résumé text:
{resume_text}"#;
