//! Prompt templates for TubeQA.
//!
//! Prompts can be customized by placing a `qa.toml` file in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder pattern"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub qa: QaPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for transcript-grounded question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QaPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a specialized assistant that ONLY answers questions based on the transcripts of the provided YouTube videos.

Rules you must follow:
1. You have NO knowledge beyond the transcript excerpts given to you.
2. Only state information that is EXPLICITLY present in the excerpts.
3. If the excerpts do not contain the answer, respond with EXACTLY: "I don't have that information in the video content."
4. Never use general knowledge, outside sources, or your own opinions.
5. Do not interpret beyond what is directly stated in the videos."#
                .to_string(),
            user: r#"Transcript excerpts:

{{context}}

Question: {{question}}

Answer using only the transcript excerpts above."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let qa_path = custom_path.join("qa.toml");
            if qa_path.exists() {
                let content = std::fs::read_to_string(&qa_path)?;
                prompts.qa = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in a single pass over the template, so text
    /// inserted for one variable is never expanded again. Unknown placeholders
    /// are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.qa.system.contains("ONLY"));
        assert!(prompts.qa.user.contains("{{context}}"));
        assert!(prompts.qa.user.contains("{{question}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_substituted_text_is_not_expanded_again() {
        let template = "Context: {{context}}\nQuestion: {{question}}";
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "What does {{context}} mean?".to_string());
        vars.insert("context".to_string(), "He typed {{question}} on screen.".to_string());

        let expected =
            "Context: He typed {{question}} on screen.\nQuestion: What does {{context}} mean?";
        for _ in 0..20 {
            assert_eq!(Prompts::render(template, &vars), expected);
        }
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let vars = HashMap::from([("name".to_string(), "Alice".to_string())]);
        assert_eq!(Prompts::render("{{name}} {{missing}}", &vars), "Alice {{missing}}");
    }

    #[test]
    fn test_call_variables_override_config_variables() {
        let mut config_vars = HashMap::new();
        config_vars.insert("channel".to_string(), "Science Hour".to_string());
        config_vars.insert("question".to_string(), "ignored".to_string());
        let prompts = Prompts::load(None, Some(&config_vars)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Why?".to_string());

        let rendered = prompts.render_with_custom("{{channel}}: {{question}}", &vars);
        assert_eq!(rendered, "Science Hour: Why?");
    }

    #[test]
    fn test_custom_dir_overrides_qa_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("qa.toml"),
            "system = \"Be brief.\"\nuser = \"{{question}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.qa.system, "Be brief.");
        assert_eq!(prompts.qa.user, "{{question}}");
    }
}
