use crate::core::config::data::Config;

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  default-model: {}", self.default_model_id());
        match &self.default_persona {
            Some(persona) => println!("  default-persona: {persona}"),
            None => println!("  default-persona: (unset)"),
        }
        println!("  usage: {}", self.usage_meter().status_line());
        match self.builtin_personas.unwrap_or(true) {
            true => println!("  builtin-personas: on"),
            false => println!("  builtin-personas: off"),
        }
        if self.personas.is_empty() {
            println!("  personas: (none set)");
        } else {
            println!("  personas:");
            for persona in &self.personas {
                println!("    {}: {}", persona.name, persona.personality);
            }
        }

        let routing = &self.routing;
        println!(
            "  routing.base-url: {}",
            routing.base_url.as_deref().unwrap_or("(default)")
        );
        println!(
            "  routing.path-prefix: {}",
            routing.path_prefix.as_deref().unwrap_or("(default)")
        );
        println!(
            "  routing.project-id: {}",
            routing.project_id.as_deref().unwrap_or("(default)")
        );
        println!(
            "  routing.project-group-id: {}",
            routing.project_group_id.as_deref().unwrap_or("(default)")
        );
    }
}
