use crate::core::persona::Persona;
use std::error::Error;

pub fn render_persona_list(personas: &[Persona], active: Option<u64>) -> String {
    if personas.is_empty() {
        return "  No personas available.".to_string();
    }

    personas
        .iter()
        .map(|persona| {
            let marker = if active == Some(persona.id) { "*" } else { "•" };
            let mut line = format!(
                "  {} {} ({})\n      {}",
                marker, persona.name, persona.id, persona.personality
            );
            if !persona.instructions.is_empty() {
                line.push_str(&format!("\n      {}", persona.instructions));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn list_personas(personas: &[Persona], active: Option<u64>) -> Result<(), Box<dyn Error>> {
    println!("Available personas:\n");
    println!("{}", render_persona_list(personas, active));
    println!("\n💡 Use a persona with:");
    println!("   aihub -b <id|name>");
    Ok(())
}
