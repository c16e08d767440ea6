use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CreationMetadata, Terminal};

/// Substrings that mark a terminal name as agent-originated
pub const AGENT_PATTERNS: &[&str] = &[
    "copilot",
    "agent",
    "@workspace",
    "@terminal",
    "github copilot",
    "ai assistant",
    "chat participant",
];

/// Names (exact or prefix) of standard interactive shells
pub const SHELL_EXCLUSIONS: &[&str] = &["zsh", "bash", "cmd", "powershell", "fish", "sh"];

/// Creation environment variables that force an agent verdict
pub const AGENT_ENV_FLAGS: &[&str] = &["COPILOT_AGENT", "GITHUB_COPILOT", "AI_ASSISTANT"];

/// Pattern tables used by the classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPatterns {
    /// Matched as substrings of the normalized name
    pub agent: Vec<String>,
    /// Matched as the whole normalized name or its prefix
    pub shell_exclusions: Vec<String>,
    /// Environment variable names checked for a non-empty value
    pub env_flags: Vec<String>,
}

impl Default for ClassificationPatterns {
    fn default() -> Self {
        Self {
            agent: AGENT_PATTERNS.iter().map(|s| s.to_string()).collect(),
            shell_exclusions: SHELL_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            env_flags: AGENT_ENV_FLAGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Decides whether a terminal was created by an AI coding agent.
///
/// Shell exclusions are an equals-or-prefix test while agent patterns are a
/// substring test. An exclusion on either name wins over everything else.
#[derive(Debug, Clone)]
pub struct TerminalClassifier {
    patterns: ClassificationPatterns,
}

impl TerminalClassifier {
    pub fn new(patterns: ClassificationPatterns) -> Self {
        let lower = |v: Vec<String>| -> Vec<String> {
            v.into_iter().map(|p| p.to_lowercase()).collect()
        };
        Self {
            patterns: ClassificationPatterns {
                agent: lower(patterns.agent),
                shell_exclusions: lower(patterns.shell_exclusions),
                env_flags: patterns.env_flags,
            },
        }
    }

    pub fn patterns(&self) -> &ClassificationPatterns {
        &self.patterns
    }

    /// Classify the terminal's current name and creation metadata
    pub fn classify_terminal(&self, terminal: &Terminal) -> bool {
        self.classify(&terminal.name(), terminal.creation_metadata())
    }

    pub fn classify(&self, name: &str, metadata: Option<&CreationMetadata>) -> bool {
        if self.is_standard_shell(name) {
            debug!(name, "standard shell excluded");
            return false;
        }

        let mut is_agent = self.matches_agent_pattern(name);

        if let Some(meta) = metadata {
            if let Some(override_name) = meta.name.as_deref() {
                if self.is_standard_shell(override_name) {
                    debug!(name, override_name, "standard shell excluded by creation name");
                    return false;
                }
                is_agent |= self.matches_agent_pattern(override_name);
            }

            if let Some(env) = &meta.env {
                let flagged = self
                    .patterns
                    .env_flags
                    .iter()
                    .find(|flag| env.get(flag.as_str()).is_some_and(|v| !v.is_empty()));
                if let Some(flag) = flagged {
                    debug!(name, flag = flag.as_str(), "agent environment flag present");
                    is_agent = true;
                }
            }
        }

        debug!(name, is_agent, "terminal classified");
        is_agent
    }

    fn is_standard_shell(&self, name: &str) -> bool {
        let normalized = normalize(name);
        self.patterns
            .shell_exclusions
            .iter()
            .any(|shell| normalized.starts_with(shell.as_str()))
    }

    fn matches_agent_pattern(&self, name: &str) -> bool {
        let normalized = normalize(name);
        self.patterns
            .agent
            .iter()
            .any(|pattern| normalized.contains(pattern.as_str()))
    }
}

impl Default for TerminalClassifier {
    fn default() -> Self {
        Self::new(ClassificationPatterns::default())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> bool {
        TerminalClassifier::default().classify(name, None)
    }

    #[test]
    fn test_shells_are_excluded() {
        for shell in SHELL_EXCLUSIONS {
            assert!(!classify(shell), "{shell} should be excluded");
        }
        assert!(!classify("bash-3.2"));
        assert!(!classify("  ZSH  "));
        assert!(!classify("PowerShell Agent"));
    }

    #[test]
    fn test_exclusion_is_prefix_not_substring() {
        // "sh" and "bash" appear inside the name but not at its start
        assert!(classify("Copilot bash agent"));
        // but any name that starts with an exclusion is a shell
        assert!(!classify("bash-copilot"));
    }

    #[test]
    fn test_exclusion_beats_env_flag() {
        let meta = CreationMetadata::with_env([("COPILOT_AGENT", "1")]);
        assert!(!TerminalClassifier::default().classify("zsh", Some(&meta)));
    }

    #[test]
    fn test_agent_patterns_match_as_substrings() {
        for pattern in AGENT_PATTERNS {
            let name = format!("My {pattern} terminal");
            assert!(classify(&name), "{name} should match");
        }
        assert!(classify("GitHub Copilot Chat"));
    }

    #[test]
    fn test_empty_and_plain_names() {
        assert!(!classify(""));
        assert!(!classify("   "));
        assert!(!classify("Terminal 1"));
        assert!(!classify("node"));
    }

    #[test]
    fn test_env_flag_overrides_plain_name() {
        let classifier = TerminalClassifier::default();
        for flag in AGENT_ENV_FLAGS {
            let meta = CreationMetadata::with_env([(*flag, "1")]);
            assert!(classifier.classify("Terminal 1", Some(&meta)));
        }
    }

    #[test]
    fn test_empty_env_flag_is_not_truthy() {
        let meta = CreationMetadata::with_env([("COPILOT_AGENT", ""), ("PATH", "/usr/bin")]);
        assert!(!TerminalClassifier::default().classify("Terminal 1", Some(&meta)));
    }

    #[test]
    fn test_override_name_exclusion_wins() {
        let meta = CreationMetadata::with_name("bash");
        assert!(!TerminalClassifier::default().classify("copilot chat", Some(&meta)));
    }

    #[test]
    fn test_override_name_can_match() {
        let meta = CreationMetadata::with_name("@workspace helper");
        assert!(TerminalClassifier::default().classify("Terminal 2", Some(&meta)));
    }

    #[test]
    fn test_custom_patterns_are_lowercased() {
        let classifier = TerminalClassifier::new(ClassificationPatterns {
            agent: vec!["Claude".to_string()],
            shell_exclusions: vec!["NU".to_string()],
            env_flags: vec!["CLAUDECODE".to_string()],
        });
        assert!(classifier.classify("claude session", None));
        assert!(!classifier.classify("nu", None));
        assert!(!classifier.classify("copilot", None));

        let meta = CreationMetadata::with_env([("CLAUDECODE", "1")]);
        assert!(classifier.classify("Terminal", Some(&meta)));
    }

    #[test]
    fn test_classify_terminal_reads_current_name() {
        let (terminal, _pid) =
            Terminal::new(crate::terminal::SessionId::next(), "Terminal 1", None);
        let classifier = TerminalClassifier::default();
        assert!(!classifier.classify_terminal(&terminal));
        terminal.set_name("Copilot");
        assert!(classifier.classify_terminal(&terminal));
    }
}
