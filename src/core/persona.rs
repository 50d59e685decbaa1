use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::config::{Config, PersonaEntry};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: u64,
    pub name: String,
    pub personality: String,
    pub instructions: String,
}

impl Persona {
    /// System prompt that layers this persona onto the base assistant
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}. {}",
            self.name, self.personality, self.instructions
        )
        .trim_end()
        .to_string()
    }
}

const BUILTIN_PERSONAS: &[(&str, &str, &str)] = &[
    (
        "Creative Writer",
        "A creative and imaginative writer who loves storytelling",
        "Help users with creative writing, storytelling, and imaginative content.",
    ),
    (
        "Code Assistant",
        "A helpful programming expert",
        "Assist with coding questions, debugging, and software development.",
    ),
    (
        "Study Buddy",
        "An encouraging and patient tutor",
        "Help explain complex topics in simple terms and provide study assistance.",
    ),
    (
        "Business Advisor",
        "A strategic business consultant with years of experience",
        "Provide business advice, strategy recommendations, and market insights.",
    ),
    (
        "Health & Wellness Coach",
        "A supportive and knowledgeable wellness expert",
        "Offer guidance on fitness, nutrition, and general wellness topics.",
    ),
];

/// Manages persona state and operations. Personas live only for the
/// lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct PersonaManager {
    personas: Vec<Persona>,
    active_persona: Option<u64>,
}

impl PersonaManager {
    /// Create a manager seeded with the built-in personas (unless disabled)
    /// followed by any personas defined in configuration
    pub fn load_personas(config: &Config) -> Self {
        let mut manager = PersonaManager::default();

        if config.builtin_personas.unwrap_or(true) {
            for (index, (name, personality, instructions)) in BUILTIN_PERSONAS.iter().enumerate()
            {
                manager.personas.push(Persona {
                    id: index as u64 + 1,
                    name: name.to_string(),
                    personality: personality.to_string(),
                    instructions: instructions.to_string(),
                });
            }
        }

        for PersonaEntry {
            name,
            personality,
            instructions,
        } in &config.personas
        {
            if manager.create_persona(name, personality, instructions).is_none() {
                tracing::warn!(
                    name = %name,
                    "skipping configured persona without name or personality"
                );
            }
        }

        manager
    }

    /// Get the list of available personas
    pub fn list_personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn find_persona_by_id(&self, id: u64) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Look a persona up by numeric id or by name (case-insensitive)
    pub fn find_persona(&self, key: &str) -> Option<&Persona> {
        let key = key.trim();
        key.parse::<u64>()
            .ok()
            .and_then(|id| self.find_persona_by_id(id))
            .or_else(|| {
                self.personas
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(key))
            })
    }

    /// Add a user-defined persona. Returns the new persona's id, or `None`
    /// when the name or personality is blank.
    pub fn create_persona(
        &mut self,
        name: &str,
        personality: &str,
        instructions: &str,
    ) -> Option<u64> {
        if name.trim().is_empty() || personality.trim().is_empty() {
            return None;
        }

        let id = self.next_id();
        self.personas.push(Persona {
            id,
            name: name.to_string(),
            personality: personality.to_string(),
            instructions: instructions.to_string(),
        });
        Some(id)
    }

    // Millisecond timestamps, bumped past the largest id in use so that
    // personas created within the same millisecond stay distinct.
    fn next_id(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let floor = self
            .personas
            .iter()
            .map(|p| p.id)
            .max()
            .map_or(0, |max| max + 1);
        now.max(floor)
    }

    pub fn set_active_persona(&mut self, key: &str) -> Result<(), String> {
        match self.find_persona(key) {
            Some(persona) => {
                self.active_persona = Some(persona.id);
                Ok(())
            }
            None => {
                let available: Vec<String> = self
                    .personas
                    .iter()
                    .map(|p| format!("{} ({})", p.name, p.id))
                    .collect();
                Err(format!(
                    "Persona '{}' not found. Available personas: {}",
                    key,
                    available.join(", ")
                ))
            }
        }
    }

    pub fn clear_active_persona(&mut self) {
        self.active_persona = None;
    }

    pub fn get_active_persona(&self) -> Option<&Persona> {
        self.active_persona
            .and_then(|id| self.find_persona_by_id(id))
    }

    /// The system message for the next request
    pub fn system_prompt(&self) -> String {
        match self.get_active_persona() {
            Some(persona) => persona.system_prompt(),
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn create_test_config() -> Config {
        Config {
            personas: vec![PersonaEntry {
                name: "Pirate".to_string(),
                personality: "A salty sea captain".to_string(),
                instructions: "Answer like a pirate.".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_and_configured_personas_load() {
        let manager = PersonaManager::load_personas(&create_test_config());

        assert_eq!(manager.list_personas().len(), BUILTIN_PERSONAS.len() + 1);
        assert_eq!(manager.find_persona_by_id(2).unwrap().name, "Code Assistant");
        assert!(manager.find_persona("pirate").is_some());
    }

    #[test]
    fn test_builtin_personas_can_be_disabled() {
        let config = Config {
            builtin_personas: Some(false),
            ..Default::default()
        };
        let manager = PersonaManager::load_personas(&config);
        assert!(manager.list_personas().is_empty());
    }

    #[test]
    fn test_blank_persona_is_rejected() {
        let mut manager = PersonaManager::load_personas(&Config::default());
        let before = manager.list_personas().to_vec();

        assert_eq!(manager.create_persona("", "kind", "help"), None);
        assert_eq!(manager.create_persona("   ", "kind", "help"), None);
        assert_eq!(manager.create_persona("Name", " \t", "help"), None);

        assert_eq!(manager.list_personas(), before.as_slice());
    }

    #[test]
    fn test_created_personas_get_unique_ids() {
        let mut manager = PersonaManager::load_personas(&Config::default());

        for index in 0..20 {
            let before = manager.list_personas().len();
            let existing: HashSet<u64> = manager.list_personas().iter().map(|p| p.id).collect();

            let id = manager
                .create_persona(&format!("Bot {index}"), "curious", "")
                .expect("valid persona is created");

            assert_eq!(manager.list_personas().len(), before + 1);
            assert!(!existing.contains(&id));
        }
    }

    #[test]
    fn test_persona_activation_and_deactivation() {
        let mut manager = PersonaManager::load_personas(&Config::default());
        assert!(manager.get_active_persona().is_none());

        manager.set_active_persona("Study Buddy").unwrap();
        assert_eq!(manager.get_active_persona().unwrap().id, 3);

        manager.set_active_persona("1").unwrap();
        assert_eq!(manager.get_active_persona().unwrap().name, "Creative Writer");

        manager.clear_active_persona();
        assert!(manager.get_active_persona().is_none());
    }

    #[test]
    fn test_invalid_persona_reports_available() {
        let mut manager = PersonaManager::load_personas(&Config::default());
        let err = manager.set_active_persona("ghost").unwrap_err();
        assert!(err.contains("ghost"));
        assert!(err.contains("Code Assistant (2)"));
        assert!(manager.get_active_persona().is_none());
    }

    #[test]
    fn test_system_prompt_uses_active_persona() {
        let mut manager = PersonaManager::load_personas(&create_test_config());
        assert_eq!(manager.system_prompt(), DEFAULT_SYSTEM_PROMPT);

        manager.set_active_persona("Pirate").unwrap();
        assert_eq!(
            manager.system_prompt(),
            "You are Pirate. A salty sea captain. Answer like a pirate."
        );
    }

    #[test]
    fn test_system_prompt_without_instructions_has_no_trailing_space() {
        let mut manager = PersonaManager::default();
        let id = manager.create_persona("Echo", "Repeats things", "").unwrap();
        manager.set_active_persona(&id.to_string()).unwrap();
        assert_eq!(manager.system_prompt(), "You are Echo. Repeats things.");
    }
}
