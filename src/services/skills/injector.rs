//! Skill Injection
//!
//! Formats matched skills into a context block an agent can prepend to its
//! prompt.

use skillmart_core::SkillMatch;

/// Render matched skills as a Markdown section.
///
/// Produces a formatted section like:
///
/// ```text
/// ## Active Skills
///
/// The following skills apply to this task:
///
/// ### refactoring-ui
/// *Plugin: ui-polish | Score: 0.83*
///
/// {skill body, truncated to max_content_lines}
///
/// ---
/// ```
pub fn inject_skills(matches: &[SkillMatch], max_content_lines: usize) -> String {
    if matches.is_empty() {
        return String::new();
    }

    let mut output = String::new();
    output.push_str("## Active Skills\n\n");
    output.push_str("The following skills apply to this task:\n");

    for (i, m) in matches.iter().enumerate() {
        output.push_str(&format!("\n### {}\n", m.skill.skill_id()));
        output.push_str(&format!("*Plugin: {} | Score: {:.2}*\n\n", m.plugin, m.score));
        if !m.skill.allowed_tools().is_empty() {
            let tools: Vec<&str> = m.skill.allowed_tools().iter().map(String::as_str).collect();
            output.push_str(&format!("Allowed tools: {}\n\n", tools.join(", ")));
        }
        output.push_str(&truncate_body(m.skill.body(), max_content_lines));

        if i < matches.len() - 1 {
            output.push_str("\n\n---\n");
        } else {
            output.push('\n');
        }
    }

    output
}

/// Truncate body text to max_lines, appending a truncation notice if needed.
fn truncate_body(body: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = body.lines().collect();
    if lines.len() <= max_lines {
        body.trim_end().to_string()
    } else {
        let truncated: String = lines[..max_lines].join("\n");
        format!(
            "{}\n\n*... (truncated, {} more lines)*",
            truncated,
            lines.len() - max_lines
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillmart_core::SkillDescriptor;

    fn make_match(id: &str, plugin: &str, body: &str) -> SkillMatch {
        SkillMatch {
            plugin: plugin.to_string(),
            score: 0.75,
            specificity: 3,
            installed_at: 0,
            skill: SkillDescriptor::new(id, "desc", vec!["Read".to_string()], body).unwrap(),
        }
    }

    #[test]
    fn test_inject_empty() {
        assert_eq!(inject_skills(&[], 10), "");
    }

    #[test]
    fn test_inject_formats_each_skill() {
        let matches = vec![
            make_match("refactoring-ui", "ui-polish", "Use a spacing scale."),
            make_match("tailwind", "css-tips", "Prefer utilities."),
        ];
        let out = inject_skills(&matches, 10);
        assert!(out.starts_with("## Active Skills"));
        assert!(out.contains("### refactoring-ui"));
        assert!(out.contains("*Plugin: ui-polish | Score: 0.75*"));
        assert!(out.contains("Allowed tools: Read"));
        assert!(out.contains("Prefer utilities."));
        assert_eq!(out.matches("---").count(), 1);
    }

    #[test]
    fn test_truncate_body() {
        let body = (1..=5).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let out = truncate_body(&body, 2);
        assert!(out.starts_with("line 1\nline 2"));
        assert!(out.contains("3 more lines"));
        assert_eq!(truncate_body(&body, 10), body);
    }
}
